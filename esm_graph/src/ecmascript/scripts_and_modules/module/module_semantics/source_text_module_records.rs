// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records)

use ahash::AHashSet;
use oxc_allocator::Allocator;
use oxc_ast::ast;
use oxc_diagnostics::OxcDiagnostic;
use oxc_ecmascript::BoundNames;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use tracing::debug;

use super::{
    Module, ModuleHeapData, ModuleKind,
    abstract_module_records::{BindingName, ModuleError, ResolveSet, ResolvedBinding},
    cyclic_module_records::CyclicModuleRecord,
    get_imported_module,
};
use crate::{
    ecmascript::{
        builtins::module::get_module_namespace,
        execution::{Agent, JsResult, environments::ModuleEnvironment},
        scripts_and_modules::script::HostDefined,
        syntax_directed_operations::{
            ContainsAwait, module_lexically_scoped_declarations, module_var_declared_names,
        },
        types::{JsString, Value},
    },
    heap::CreateHeapData,
};

const DEFAULT: &str = "default";
const STAR_DEFAULT: &str = "*default*";

/// ## [ImportEntry Record Fields](https://tc39.es/ecma262/#table-importentry-record-fields)
///
/// ### Examples
///
/// ```javascript
/// import v from "mod";
/// import * as ns from "mod";
/// import { x as v } from "mod";
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntryRecord {
    /// ### \[\[ModuleRequest\]\]
    ///
    /// String value of the ModuleSpecifier of the ImportDeclaration.
    pub module_request: JsString,
    /// ### \[\[ImportName\]\]
    ///
    /// The name under which the desired binding is exported by the module
    /// identified by \[\[ModuleRequest\]\]. None indicates that the import
    /// request is for the target module's namespace object.
    pub import_name: Option<JsString>,
    /// ### \[\[LocalName\]\]
    ///
    /// The name that is used to locally access the imported value from
    /// within the importing module.
    pub local_name: JsString,
}

/// ## [ExportEntry Record Fields](https://tc39.es/ecma262/#table-exportentry-records)
///
/// This struct is used for local export declarations.
///
/// ### Examples
///
/// ```javascript
/// export { x };
/// export var x;
/// export function x() {}
/// export default 42;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExportEntryRecord {
    /// ### \[\[ExportName\]\]
    pub export_name: JsString,
    /// ### \[\[LocalName\]\]
    pub local_name: JsString,
}

/// ## [ExportEntry Record Fields](https://tc39.es/ecma262/#table-exportentry-records)
///
/// This struct is used for re-export declarations.
///
/// ### Examples
///
/// ```javascript
/// export * as ns from "mod";
/// export { x } from "mod";
/// export { v as x } from "mod";
/// import { v } from "mod"; export { v as x };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectExportEntryRecord {
    /// ### \[\[ExportName\]\]
    pub export_name: JsString,
    /// ### \[\[ModuleRequest\]\]
    pub module_request: JsString,
    /// ### \[\[ImportName\]\]
    ///
    /// None is used for `export * as ns from "mod"` declarations.
    pub import_name: Option<JsString>,
}

/// How a top-level lexical declaration is bound in the module
/// environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalDeclarationKind {
    Let,
    /// `const`, `using` and `await using`.
    Const,
    Function,
    Class,
    /// The `*default*` binding of `export default AssignmentExpression`.
    Default,
}

#[derive(Debug)]
pub struct SourceTextModuleRecord {
    /// The text the module was parsed from. The AST itself is not kept:
    /// interpreters parse the text again when they execute the body.
    source_text: Box<str>,
    /// ### \[\[ImportEntries\]\]
    import_entries: Box<[ImportEntryRecord]>,
    /// ### \[\[LocalExportEntries\]\]
    local_export_entries: Box<[LocalExportEntryRecord]>,
    /// ### \[\[IndirectExportEntries\]\]
    indirect_export_entries: Box<[IndirectExportEntryRecord]>,
    /// ### \[\[StarExportEntries\]\]
    ///
    /// The module requests of `export * from "mod"` declarations.
    star_export_entries: Box<[JsString]>,
    var_declared_names: Box<[JsString]>,
    lexical_declarations: Box<[(JsString, LexicalDeclarationKind)]>,
    /// ### \[\[Environment\]\]
    ///
    /// Created by InitializeEnvironment, dropped again if linking fails.
    pub(crate) environment: Option<ModuleEnvironment>,
}

impl SourceTextModuleRecord {
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn import_entries(&self) -> &[ImportEntryRecord] {
        &self.import_entries
    }

    pub fn local_export_entries(&self) -> &[LocalExportEntryRecord] {
        &self.local_export_entries
    }

    pub fn indirect_export_entries(&self) -> &[IndirectExportEntryRecord] {
        &self.indirect_export_entries
    }

    pub fn star_export_entries(&self) -> &[JsString] {
        &self.star_export_entries
    }

    /// VarDeclaredNames of the module body.
    pub fn var_declared_names(&self) -> &[JsString] {
        &self.var_declared_names
    }

    /// LexicallyScopedDeclarations of the module body, imports excluded.
    pub fn lexical_declarations(&self) -> &[(JsString, LexicalDeclarationKind)] {
        &self.lexical_declarations
    }
}

pub type ModuleOrErrors = Result<Module, Vec<OxcDiagnostic>>;

/// ### [16.2.1.7.1 ParseModule ( sourceText, realm, hostDefined )](https://tc39.es/ecma262/#sec-parsemodule)
///
/// Parses `source_text` with Module as the goal symbol and creates a Source
/// Text Module Record for it. Early errors, such as duplicate export names
/// or a declaration clashing with an import, are reported together with
/// syntax errors.
pub fn parse_module(
    agent: &mut Agent,
    source_text: &str,
    host_defined: Option<HostDefined>,
) -> ModuleOrErrors {
    let allocator = Allocator::default();
    // 1. Let body be ParseText(sourceText, Module).
    let ParserReturn {
        errors, program, ..
    } = Parser::new(
        &allocator,
        source_text,
        SourceType::default().with_module(true),
    )
    .parse();
    // 2. If body is a List of errors, return body.
    if !errors.is_empty() {
        return Err(errors);
    }
    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&program);
    if !semantic.errors.is_empty() {
        return Err(semantic.errors);
    }
    let body = &program;

    // 3. Let requestedModules be the ModuleRequests of body.
    let mut requested_modules: Vec<JsString> = vec![];
    let mut request = |specifier: &str| -> JsString {
        if let Some(existing) = requested_modules.iter().find(|r| r.as_str() == specifier) {
            return existing.clone();
        }
        let specifier = JsString::from(specifier);
        requested_modules.push(specifier.clone());
        specifier
    };
    // 4. Let importEntries be the ImportEntries of body.
    let mut import_entries: Vec<ImportEntryRecord> = vec![];
    // 5. Let importedBoundNames be ImportedLocalNames(importEntries).
    let mut imported_bound_names = AHashSet::new();
    // 6. Let indirectExportEntries be a new empty List.
    let mut indirect_export_entries = vec![];
    // 7. Let localExportEntries be a new empty List.
    let mut local_export_entries = vec![];
    // 8. Let starExportEntries be a new empty List.
    let mut star_export_entries = vec![];

    // Module requests are recorded in source order, so one pass collects
    // them together with the import entries, and a second pass sorts the
    // export entries once every imported name is known.
    for statement in body.body.iter() {
        let Some(decl) = statement.as_module_declaration() else {
            continue;
        };
        match decl {
            ast::ModuleDeclaration::ImportDeclaration(decl) => {
                let module_request = request(decl.source.value.as_str());
                let Some(specifiers) = &decl.specifiers else {
                    continue;
                };
                for specifier in specifiers {
                    let (import_name, local_name) = match specifier {
                        ast::ImportDeclarationSpecifier::ImportSpecifier(specifier) => (
                            Some(specifier.imported.name().as_str().into()),
                            specifier.local.name.as_str(),
                        ),
                        ast::ImportDeclarationSpecifier::ImportDefaultSpecifier(specifier) => {
                            (Some(DEFAULT.into()), specifier.local.name.as_str())
                        }
                        ast::ImportDeclarationSpecifier::ImportNamespaceSpecifier(specifier) => {
                            (None, specifier.local.name.as_str())
                        }
                    };
                    imported_bound_names.insert(local_name);
                    import_entries.push(ImportEntryRecord {
                        module_request: module_request.clone(),
                        import_name,
                        local_name: local_name.into(),
                    });
                }
            }
            ast::ModuleDeclaration::ExportAllDeclaration(decl) => {
                request(decl.source.value.as_str());
            }
            ast::ModuleDeclaration::ExportNamedDeclaration(decl) => {
                if let Some(source) = &decl.source {
                    request(source.value.as_str());
                }
            }
            _ => {}
        }
    }

    // 9. Let exportEntries be the ExportEntries of body.
    // 10. For each ExportEntry Record ee of exportEntries, do
    for statement in body.body.iter() {
        let Some(decl) = statement.as_module_declaration() else {
            continue;
        };
        match decl {
            ast::ModuleDeclaration::ExportDefaultDeclaration(decl) => {
                let local_name = match &decl.declaration {
                    // ExportDeclaration : export default HoistableDeclaration
                    // 1. Let names be the BoundNames of HoistableDeclaration.
                    // 2. Let localName be the sole element of names.
                    ast::ExportDefaultDeclarationKind::FunctionDeclaration(f) => f
                        .id
                        .as_ref()
                        .map_or(STAR_DEFAULT, |id| id.name.as_str()),
                    // ExportDeclaration : export default ClassDeclaration
                    ast::ExportDefaultDeclarationKind::ClassDeclaration(c) => c
                        .id
                        .as_ref()
                        .map_or(STAR_DEFAULT, |id| id.name.as_str()),
                    ast::ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => continue,
                    // ExportDeclaration : export default AssignmentExpression ;
                    _ => STAR_DEFAULT,
                };
                // NOTE: ImportedBoundNames never contains "*default*", and a
                // named default declaration cannot redeclare an import.
                // 3. Return a List whose sole element is a new ExportEntry Record {
                local_export_entries.push(LocalExportEntryRecord {
                    // [[ExportName]]: "default"
                    export_name: DEFAULT.into(),
                    // [[LocalName]]: localName,
                    local_name: local_name.into(),
                });
                // }.
            }
            ast::ModuleDeclaration::ExportNamedDeclaration(decl) => {
                if let Some(source) = &decl.source {
                    // export { a, b as c } from "source";
                    let module_request = request(source.value.as_str());
                    for specifier in decl.specifiers.iter() {
                        // 1. Let sourceName be the StringValue of the first
                        //    ModuleExportName.
                        // 2. Let exportName be the StringValue of the second
                        //    ModuleExportName.
                        // 3. Let importName be sourceName.
                        // c. Else, i. Append ee to indirectExportEntries.
                        indirect_export_entries.push(IndirectExportEntryRecord {
                            export_name: specifier.exported.name().as_str().into(),
                            module_request: module_request.clone(),
                            import_name: Some(specifier.local.name().as_str().into()),
                        });
                    }
                } else if let Some(declaration) = &decl.declaration {
                    // ExportDeclaration : export VariableStatement
                    // ExportDeclaration : export Declaration
                    // 2. Let names be the BoundNames of Declaration.
                    // 3. For each element name of names, do
                    declaration.bound_names(&mut |name| {
                        let name = JsString::from(name.name.as_str());
                        // a. Append the ExportEntry Record {
                        local_export_entries.push(LocalExportEntryRecord {
                            // [[LocalName]]: name,
                            local_name: name.clone(),
                            // [[ExportName]]: name
                            export_name: name,
                        });
                        // } to entries.
                    });
                } else {
                    // export { a, b as c };
                    for specifier in decl.specifiers.iter() {
                        let local_name = specifier.local.name();
                        let export_name: JsString = specifier.exported.name().as_str().into();
                        // a. If ee.[[ModuleRequest]] is null, then
                        //   i. If importedBoundNames does not contain
                        //      ee.[[LocalName]], then
                        if !imported_bound_names.contains(local_name.as_str()) {
                            // 1. Append ee to localExportEntries.
                            local_export_entries.push(LocalExportEntryRecord {
                                export_name,
                                local_name: local_name.as_str().into(),
                            });
                            continue;
                        }
                        //   ii. Else,
                        //     1. Let ie be the element of importEntries whose
                        //        [[LocalName]] is ee.[[LocalName]].
                        let Some(ie) = import_entries
                            .iter()
                            .find(|ie| ie.local_name.as_str() == local_name.as_str())
                        else {
                            unreachable!("imported bound name without an import entry");
                        };
                        match &ie.import_name {
                            //     2. If ie.[[ImportName]] is namespace-object,
                            //        then
                            //       a. NOTE: This is a re-export of an
                            //          imported module namespace object.
                            //       b. Append ee to localExportEntries.
                            None => local_export_entries.push(LocalExportEntryRecord {
                                export_name,
                                local_name: ie.local_name.clone(),
                            }),
                            //     3. Else,
                            //       a. NOTE: This is a re-export of a single
                            //          name.
                            //       b. Append the ExportEntry Record {
                            //          [[ModuleRequest]]: ie.[[ModuleRequest]],
                            //          [[ImportName]]: ie.[[ImportName]],
                            //          [[LocalName]]: null,
                            //          [[ExportName]]: ee.[[ExportName]] } to
                            //          indirectExportEntries.
                            Some(import_name) => {
                                indirect_export_entries.push(IndirectExportEntryRecord {
                                    export_name,
                                    module_request: ie.module_request.clone(),
                                    import_name: Some(import_name.clone()),
                                })
                            }
                        }
                    }
                }
            }
            ast::ModuleDeclaration::ExportAllDeclaration(decl) => {
                let module_request = request(decl.source.value.as_str());
                if let Some(exported) = &decl.exported {
                    // export * as ns from "mod";
                    // c. Else, i. Append ee to indirectExportEntries.
                    indirect_export_entries.push(IndirectExportEntryRecord {
                        export_name: exported.name().as_str().into(),
                        module_request,
                        import_name: None,
                    });
                } else {
                    // b. Else if ee.[[ImportName]] is all-but-default, then
                    //   i. Assert: ee.[[ExportName]] is null.
                    //   ii. Append ee to starExportEntries.
                    star_export_entries.push(module_request);
                }
            }
            _ => {}
        }
    }

    // 11. Let async be body Contains await.
    let r#async = body.contains_await();
    let var_declared_names = module_var_declared_names(body);
    let lexical_declarations = module_lexically_scoped_declarations(body);

    // It is a Syntax Error if the LexicallyDeclaredNames of ModuleItemList
    // contains any duplicate entries, or if any of them also occurs in the
    // VarDeclaredNames of ModuleItemList. Imported names are part of the
    // LexicallyDeclaredNames; oxc does not check them against the module's
    // own declarations.
    let mut redeclarations: Vec<OxcDiagnostic> = vec![];
    let declared_names = var_declared_names
        .iter()
        .chain(lexical_declarations.iter().map(|(name, _)| name));
    for name in declared_names {
        if imported_bound_names.contains(name.as_str()) {
            redeclarations.push(OxcDiagnostic::error(format!(
                "Identifier `{name}` has already been declared"
            )));
        }
    }
    if !redeclarations.is_empty() {
        return Err(redeclarations);
    }

    let module = agent.heap.create(ModuleHeapData::new(
        ModuleKind::SourceText(Box::new(SourceTextModuleRecord {
            // [[ECMAScriptCode]]: body,
            source_text: source_text.into(),
            // [[ImportEntries]]: importEntries,
            import_entries: import_entries.into_boxed_slice(),
            // [[LocalExportEntries]]: localExportEntries,
            local_export_entries: local_export_entries.into_boxed_slice(),
            // [[IndirectExportEntries]]: indirectExportEntries,
            indirect_export_entries: indirect_export_entries.into_boxed_slice(),
            // [[StarExportEntries]]: starExportEntries,
            star_export_entries: star_export_entries.into_boxed_slice(),
            var_declared_names: var_declared_names.into_boxed_slice(),
            lexical_declarations: lexical_declarations.into_boxed_slice(),
            // [[Environment]]: empty,
            environment: None,
        })),
        // [[HasTLA]]: async,
        // [[RequestedModules]]: requestedModules,
        Some(CyclicModuleRecord::new(
            r#async,
            requested_modules.into_boxed_slice(),
        )),
        // [[HostDefined]]: hostDefined,
        host_defined,
    ));
    debug!(
        module = module.get_index(),
        has_tla = r#async,
        "parsed source text module"
    );
    Ok(module)
}

fn record(agent: &Agent, module: Module) -> &SourceTextModuleRecord {
    match agent[module].source_text() {
        Some(record) => record,
        None => unreachable!("Module is not a Source Text Module Record"),
    }
}

/// ### [16.2.1.7.2.1 GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#sec-getexportednames)
///
/// The GetExportedNames concrete method of a Source Text Module Record module
/// takes optional argument exportStarSet (a List of Source Text Module
/// Records) and returns a List of Strings.
pub(super) fn get_exported_names(
    agent: &mut Agent,
    module: Module,
    export_star_set: &mut Vec<Module>,
) -> JsResult<Option<Vec<JsString>>> {
    // 2. If exportStarSet is not present, set exportStarSet to a new empty
    //    List.
    // 3. If exportStarSet contains module, then
    if export_star_set.contains(&module) {
        // a. Assert: We've reached the starting point of an export *
        //    circularity.
        // b. Return a new empty List.
        return Ok(None);
    }
    // 4. Append module to exportStarSet.
    export_star_set.push(module);
    let record = record(agent, module);
    // 5. Let exportedNames be a new empty List.
    // 6. For each ExportEntry Record e of module.[[LocalExportEntries]], do
    //   c. Append e.[[ExportName]] to exportedNames.
    // 7. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
    //   c. Append e.[[ExportName]] to exportedNames.
    let mut exported_names: Vec<JsString> = record
        .local_export_entries
        .iter()
        .map(|e| e.export_name.clone())
        .chain(
            record
                .indirect_export_entries
                .iter()
                .map(|e| e.export_name.clone()),
        )
        .collect();
    let star_export_entries = record.star_export_entries.clone();
    // 8. For each ExportEntry Record e of module.[[StarExportEntries]], do
    for e in star_export_entries.iter() {
        // a. Assert: e.[[ModuleRequest]] is not null.
        // b. Let requestedModule be GetImportedModule(module, e.[[ModuleRequest]]).
        let requested_module = get_imported_module(agent, module, e)?;
        // c. Let starNames be requestedModule.GetExportedNames(exportStarSet).
        let Some(star_names) = requested_module.get_exported_names(agent, export_star_set)? else {
            continue;
        };
        // d. For each element n of starNames, do
        for n in star_names {
            // i. If n is not "default", then
            //   1. If exportedNames does not contain n, then
            if n.as_str() != DEFAULT && !exported_names.contains(&n) {
                // a. Append n to exportedNames.
                exported_names.push(n);
            }
        }
    }
    // 9. Return exportedNames.
    Ok(Some(exported_names))
}

/// ### [16.2.1.7.2.2 ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#sec-resolveexport)
///
/// ResolveExport attempts to resolve an imported binding to the actual
/// defining module and local binding name. The defining module may be the
/// module represented by the Module Record this method was invoked on or
/// some other module that is imported by that module. The parameter
/// resolveSet is used to detect unresolved circular import/export paths.
/// If a pair consisting of specific Module Record and exportName is
/// reached that is already in resolveSet, an import circularity has been
/// encountered.
pub(super) fn resolve_export(
    agent: &mut Agent,
    module: Module,
    export_name: &JsString,
    resolve_set: &mut ResolveSet,
) -> JsResult<Option<ResolvedBinding>> {
    // 3. For each Record { [[Module]], [[ExportName]] } r of resolveSet, do
    //   a. If module and r.[[Module]] are the same Module Record and
    //      exportName is r.[[ExportName]], then
    if resolve_set.contains(module, export_name) {
        //   i. Assert: This is a circular import request.
        //   ii. Return null.
        return Ok(None);
    }
    // 4. Append the Record { [[Module]]: module, [[ExportName]]: exportName }
    //    to resolveSet.
    resolve_set.insert(module, export_name.clone());
    let record = record(agent, module);
    // 5. For each ExportEntry Record e of module.[[LocalExportEntries]], do
    //   a. If e.[[ExportName]] is exportName, then
    if let Some(e) = record
        .local_export_entries
        .iter()
        .find(|e| e.export_name == *export_name)
    {
        // i. Assert: module provides the direct binding for this export.
        // ii. Return ResolvedBinding Record { [[Module]]: module,
        //     [[BindingName]]: e.[[LocalName]] }.
        return Ok(Some(ResolvedBinding::Resolved {
            module,
            binding_name: BindingName::Name(e.local_name.clone()),
        }));
    }
    // 6. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
    //   a. If e.[[ExportName]] is exportName, then
    if let Some(e) = record
        .indirect_export_entries
        .iter()
        .find(|e| e.export_name == *export_name)
        .cloned()
    {
        // i. Assert: e.[[ModuleRequest]] is not null.
        // ii. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
        let imported_module = get_imported_module(agent, module, &e.module_request)?;
        return match e.import_name {
            // iii. If e.[[ImportName]] is all, then
            //   1. Assert: module does not provide the direct binding for
            //      this export.
            //   2. Return ResolvedBinding Record { [[Module]]: importedModule,
            //      [[BindingName]]: namespace }.
            None => Ok(Some(ResolvedBinding::Resolved {
                module: imported_module,
                binding_name: BindingName::Namespace,
            })),
            // iv. Else,
            //   1. Assert: module imports a specific binding for this export.
            //   2. Assert: e.[[ImportName]] is a String.
            //   3. Return importedModule.ResolveExport(e.[[ImportName]],
            //      resolveSet).
            Some(import_name) => imported_module.resolve_export(agent, &import_name, resolve_set),
        };
    }
    // 7. If exportName is "default", then
    if export_name.as_str() == DEFAULT {
        // a. Assert: A default export was not explicitly defined by this
        //    module.
        // b. Return null.
        // c. NOTE: A default export cannot be provided by an export * from
        //    "mod" declaration.
        return Ok(None);
    }
    let star_export_entries = record.star_export_entries.clone();
    // 8. Let starResolution be null.
    let mut star_resolution: Option<(Module, BindingName)> = None;
    // 9. For each ExportEntry Record e of module.[[StarExportEntries]], do
    for e in star_export_entries.iter() {
        // a. Assert: e.[[ModuleRequest]] is not null.
        // b. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
        let imported_module = get_imported_module(agent, module, e)?;
        // c. Let resolution be importedModule.ResolveExport(exportName,
        //    resolveSet).
        match imported_module.resolve_export(agent, export_name, resolve_set)? {
            // d. If resolution is ambiguous, return ambiguous.
            Some(ResolvedBinding::Ambiguous) => return Ok(Some(ResolvedBinding::Ambiguous)),
            // e. If resolution is not null, then
            Some(ResolvedBinding::Resolved {
                module: resolution_module,
                binding_name: resolution_binding_name,
            }) => match &star_resolution {
                // ii. If starResolution is null, then
                //   1. Set starResolution to resolution.
                None => star_resolution = Some((resolution_module, resolution_binding_name)),
                // iii. Else,
                //   1. Assert: There is more than one * import that includes
                //      the requested name.
                Some((star_resolution_module, star_resolution_binding_name)) => {
                    // 2. If resolution.[[Module]] and starResolution.[[Module]]
                    //    are not the same Module Record, return ambiguous.
                    // 3. If resolution.[[BindingName]] is not
                    //    starResolution.[[BindingName]], return ambiguous.
                    if resolution_module != *star_resolution_module
                        || resolution_binding_name != *star_resolution_binding_name
                    {
                        return Ok(Some(ResolvedBinding::Ambiguous));
                    }
                }
            },
            None => {}
        }
    }
    // 10. Return starResolution.
    Ok(star_resolution.map(|(module, binding_name)| ResolvedBinding::Resolved {
        module,
        binding_name,
    }))
}

fn request_path(import_path: &[JsString], request: &JsString) -> Vec<JsString> {
    let mut path = import_path.to_vec();
    path.push(request.clone());
    path
}

/// Resolve `import_name` in the module requested by `module_request`,
/// turning null and ambiguous resolutions into link errors.
fn resolve_import(
    agent: &mut Agent,
    module: Module,
    module_request: &JsString,
    import_name: &JsString,
    import_path: &[JsString],
) -> Result<(Module, BindingName), ModuleError> {
    let resolution = get_imported_module(agent, module, module_request)
        .and_then(|imported_module| {
            imported_module.resolve_export(agent, import_name, &mut ResolveSet::new())
        })
        .map_err(|error| ModuleError::Resolution {
            specifier: module_request.clone(),
            import_path: request_path(import_path, module_request),
            error,
        })?;
    match resolution {
        Some(ResolvedBinding::Resolved {
            module,
            binding_name,
        }) => Ok((module, binding_name)),
        Some(ResolvedBinding::Ambiguous) => Err(ModuleError::Ambiguous {
            specifier: module_request.clone(),
            name: import_name.clone(),
            import_path: request_path(import_path, module_request),
        }),
        None => Err(ModuleError::Unresolvable {
            specifier: module_request.clone(),
            name: import_name.clone(),
            import_path: request_path(import_path, module_request),
        }),
    }
}

fn namespace_value(
    agent: &mut Agent,
    target: Module,
    module_request: &JsString,
    import_path: &[JsString],
) -> Result<Value, ModuleError> {
    get_module_namespace(agent, target)
        .map(Value::from)
        .map_err(|error| ModuleError::Resolution {
            specifier: module_request.clone(),
            import_path: request_path(import_path, module_request),
            error,
        })
}

/// ### [16.2.1.7.3.1 InitializeEnvironment ( )](https://tc39.es/ecma262/#sec-source-text-module-record-initialize-environment)
///
/// The InitializeEnvironment concrete method of a Source Text Module Record
/// module takes no arguments and returns either a normal completion
/// containing unused or a throw completion.
///
/// `import_path` is the chain of specifiers leading to `module`; errors
/// about one of its requests extend it with that request.
pub(super) fn initialize_environment(
    agent: &mut Agent,
    module: Module,
    import_path: &[JsString],
) -> Result<(), ModuleError> {
    let record = record(agent, module);
    let indirect_export_entries = record.indirect_export_entries.clone();
    let import_entries = record.import_entries.clone();
    let var_declared_names = record.var_declared_names.clone();
    let lexical_declarations = record.lexical_declarations.clone();

    // 1. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
    for e in indirect_export_entries.iter() {
        // a. Assert: e.[[ExportName]] is not null.
        // b. Let resolution be module.ResolveExport(e.[[ExportName]]).
        // c. If resolution is either null or ambiguous, throw a SyntaxError
        //    exception.
        // d. Assert: resolution is a ResolvedBinding Record.
        match &e.import_name {
            Some(import_name) => {
                resolve_import(agent, module, &e.module_request, import_name, import_path)?;
            }
            // export * as ns from "mod" always resolves to the namespace of
            // the requested module.
            None => {
                get_imported_module(agent, module, &e.module_request).map_err(|error| {
                    ModuleError::Resolution {
                        specifier: e.module_request.clone(),
                        import_path: request_path(import_path, &e.module_request),
                        error,
                    }
                })?;
            }
        }
    }
    // 2. Assert: All named exports from module are resolvable.
    // 5. Let env be NewModuleEnvironment(realm.[[GlobalEnv]]).
    let mut env = ModuleEnvironment::default();
    // 7. For each ImportEntry Record in of module.[[ImportEntries]], do
    for r#in in import_entries.iter() {
        match &r#in.import_name {
            // b. If in.[[ImportName]] is namespace-object, then
            None => {
                // a. Let importedModule be GetImportedModule(module,
                //    in.[[ModuleRequest]]).
                let imported_module = get_imported_module(agent, module, &r#in.module_request)
                    .map_err(|error| ModuleError::Resolution {
                        specifier: r#in.module_request.clone(),
                        import_path: request_path(import_path, &r#in.module_request),
                        error,
                    })?;
                // i. Let namespace be GetModuleNamespace(importedModule).
                let namespace =
                    namespace_value(agent, imported_module, &r#in.module_request, import_path)?;
                // ii. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                env.create_immutable_binding(r#in.local_name.clone());
                // iii. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                env.initialize_binding(&r#in.local_name, namespace);
            }
            // c. Else,
            Some(import_name) => {
                // i. Let resolution be importedModule.ResolveExport(in.[[ImportName]]).
                // ii. If resolution is either null or ambiguous, throw a
                //     SyntaxError exception.
                let (target, binding_name) =
                    resolve_import(agent, module, &r#in.module_request, import_name, import_path)?;
                match binding_name {
                    // iii. If resolution.[[BindingName]] is namespace, then
                    BindingName::Namespace => {
                        // 1. Let namespace be GetModuleNamespace(resolution.[[Module]]).
                        let namespace =
                            namespace_value(agent, target, &r#in.module_request, import_path)?;
                        // 2. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                        env.create_immutable_binding(r#in.local_name.clone());
                        // 3. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                        env.initialize_binding(&r#in.local_name, namespace);
                    }
                    // iv. Else,
                    //   1. Perform CreateImportBinding(env, in.[[LocalName]],
                    //      resolution.[[Module]], resolution.[[BindingName]]).
                    BindingName::Name(binding_name) => {
                        env.create_import_binding(r#in.local_name.clone(), target, binding_name);
                    }
                }
            }
        }
    }
    // 19. Let varDeclarations be the VarScopedDeclarations of code.
    // 20. Let declaredVarNames be a new empty List.
    // 21. For each element d of varDeclarations, do
    //   a. For each element dn of the BoundNames of d, do
    for dn in var_declared_names.iter() {
        // i. If declaredVarNames does not contain dn, then
        if !env.has_binding(dn) {
            // 1. Perform ! env.CreateMutableBinding(dn, false).
            env.create_mutable_binding(dn.clone());
            // 2. Perform ! env.InitializeBinding(dn, undefined).
            env.initialize_binding(dn, Value::Undefined);
        }
    }
    // 22. Let lexDeclarations be the LexicallyScopedDeclarations of code.
    // 24. For each element d of lexDeclarations, do
    //   a. For each element dn of the BoundNames of d, do
    for (dn, kind) in lexical_declarations.iter() {
        if env.has_binding(dn) {
            continue;
        }
        match kind {
            // i. If IsConstantDeclaration of d is true, then
            //   1. Perform ! env.CreateImmutableBinding(dn, true).
            // NOTE: No syntax permits assignment to "*default*", so it is
            // bound immutably.
            LexicalDeclarationKind::Const | LexicalDeclarationKind::Default => {
                env.create_immutable_binding(dn.clone())
            }
            // ii. Else,
            //   1. Perform ! env.CreateMutableBinding(dn, false).
            //   iii. If d is a function declaration, the interpreter
            //        initializes the binding with the function object.
            LexicalDeclarationKind::Let
            | LexicalDeclarationKind::Function
            | LexicalDeclarationKind::Class => env.create_mutable_binding(dn.clone()),
        }
    }
    // 6. Set module.[[Environment]] to env.
    match &mut agent[module].kind {
        ModuleKind::SourceText(record) => record.environment = Some(env),
        _ => unreachable!(),
    }
    let interpreter = agent.interpreter();
    interpreter
        .initialize_environment(agent, module)
        .map_err(|error| ModuleError::Link {
            import_path: import_path.to_vec(),
            error,
        })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        ecmascript::execution::{DefaultHostHooks, Options},
        engine::NoopInterpreter,
    };

    fn agent() -> Agent {
        Agent::new(
            Options::default(),
            Rc::new(DefaultHostHooks::default()),
            Rc::new(NoopInterpreter),
        )
    }

    fn strs(list: &[JsString]) -> Vec<&str> {
        list.iter().map(JsString::as_str).collect()
    }

    #[test]
    fn requested_modules_in_source_order_without_duplicates() {
        let mut agent = agent();
        let module = parse_module(
            &mut agent,
            "import a from './a.mjs';\n\
             export { b } from './b.mjs';\n\
             import { c } from './a.mjs';\n\
             export * from './c.mjs';\n\
             import './d.mjs';",
            None,
        )
        .unwrap();
        assert_eq!(
            strs(module.requested_modules(&agent)),
            ["./a.mjs", "./b.mjs", "./c.mjs", "./d.mjs"]
        );
        assert!(!module.has_top_level_await(&agent));
    }

    #[test]
    fn import_entries() {
        let mut agent = agent();
        let module = parse_module(
            &mut agent,
            "import d, { x as y, z } from './m.mjs'; import * as ns from './n.mjs';",
            None,
        )
        .unwrap();
        let record = module.as_source_text(&agent).unwrap();
        assert_eq!(
            record.import_entries(),
            [
                ImportEntryRecord {
                    module_request: "./m.mjs".into(),
                    import_name: Some("default".into()),
                    local_name: "d".into(),
                },
                ImportEntryRecord {
                    module_request: "./m.mjs".into(),
                    import_name: Some("x".into()),
                    local_name: "y".into(),
                },
                ImportEntryRecord {
                    module_request: "./m.mjs".into(),
                    import_name: Some("z".into()),
                    local_name: "z".into(),
                },
                ImportEntryRecord {
                    module_request: "./n.mjs".into(),
                    import_name: None,
                    local_name: "ns".into(),
                },
            ]
        );
    }

    #[test]
    fn export_entries_are_sorted_into_local_indirect_and_star() {
        let mut agent = agent();
        let module = parse_module(
            &mut agent,
            "import { a } from './a.mjs';\n\
             import * as ns from './ns.mjs';\n\
             export { a as reA, ns };\n\
             export let l = 1;\n\
             export function f() {}\n\
             export { x as y } from './x.mjs';\n\
             export * as star from './s.mjs';\n\
             export * from './all.mjs';\n\
             export default 42;",
            None,
        )
        .unwrap();
        let record = module.as_source_text(&agent).unwrap();
        let local: Vec<(&str, &str)> = record
            .local_export_entries()
            .iter()
            .map(|e| (e.export_name.as_str(), e.local_name.as_str()))
            .collect();
        assert_eq!(
            local,
            [("ns", "ns"), ("l", "l"), ("f", "f"), ("default", "*default*")]
        );
        assert_eq!(
            record.indirect_export_entries(),
            [
                IndirectExportEntryRecord {
                    export_name: "reA".into(),
                    module_request: "./a.mjs".into(),
                    import_name: Some("a".into()),
                },
                IndirectExportEntryRecord {
                    export_name: "y".into(),
                    module_request: "./x.mjs".into(),
                    import_name: Some("x".into()),
                },
                IndirectExportEntryRecord {
                    export_name: "star".into(),
                    module_request: "./s.mjs".into(),
                    import_name: None,
                },
            ]
        );
        assert_eq!(strs(record.star_export_entries()), ["./all.mjs"]);
    }

    #[test]
    fn named_default_declarations_export_their_name() {
        let mut agent = agent();
        let module = parse_module(&mut agent, "export default class Foo {}", None).unwrap();
        let record = module.as_source_text(&agent).unwrap();
        assert_eq!(
            record.local_export_entries(),
            [LocalExportEntryRecord {
                export_name: "default".into(),
                local_name: "Foo".into(),
            }]
        );
        assert_eq!(
            record.lexical_declarations(),
            [(JsString::from("Foo"), LexicalDeclarationKind::Class)]
        );
    }

    #[test]
    fn top_level_await_is_detected() {
        let mut agent = agent();
        let module = parse_module(&mut agent, "await Promise.resolve();", None).unwrap();
        assert!(module.has_top_level_await(&agent));
    }

    #[test]
    fn syntax_and_early_errors_are_reported() {
        let mut agent = agent();
        assert!(parse_module(&mut agent, "export { ;", None).is_err());
        assert!(parse_module(&mut agent, "export let a; export { a };", None).is_err());
        assert!(parse_module(&mut agent, "import { a } from './a.mjs'; let a;", None).is_err());
    }

    #[test]
    fn declarations_may_not_shadow_imports() {
        let mut agent = agent();
        for source in [
            "import { a } from './a.mjs'; let a;",
            "import a from './a.mjs'; var a;",
            "import * as a from './a.mjs'; if (true) { var a; }",
            "import { b as a } from './a.mjs'; export function a() {}",
            "import { a } from './a.mjs'; export class a {}",
        ] {
            let errors = parse_module(&mut agent, source, None).expect_err(source);
            assert_eq!(errors.len(), 1, "{source}");
            assert!(errors[0].to_string().contains("`a` has already been declared"));
        }
        // Inner scopes and the imported name itself are fine.
        let module = parse_module(
            &mut agent,
            "import { a } from './a.mjs'; { let a = 1; } function f(a) {} export { a };",
            None,
        )
        .unwrap();
        let record = module.as_source_text(&agent).unwrap();
        assert_eq!(record.import_entries().len(), 1);
        assert_eq!(record.indirect_export_entries().len(), 1);
    }
}
