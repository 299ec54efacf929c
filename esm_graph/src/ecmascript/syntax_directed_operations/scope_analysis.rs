// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use oxc_ast::ast::{
    BindingIdentifier, Declaration, ExportDefaultDeclarationKind, ForStatementInit,
    ForStatementLeft, Program, Statement, VariableDeclaration, VariableDeclarationKind,
};
use oxc_ecmascript::BoundNames;

use crate::ecmascript::{
    scripts_and_modules::module::module_semantics::source_text_module_records::LexicalDeclarationKind,
    types::JsString,
};

/// ### [8.2.6 Static Semantics: VarDeclaredNames](https://tc39.es/ecma262/#sec-static-semantics-vardeclarednames)
///
/// The syntax-directed operation VarDeclaredNames takes no arguments and
/// returns a List of Strings.
pub(crate) trait VarDeclaredNames<'a> {
    fn var_declared_names<F: FnMut(&BindingIdentifier<'a>)>(&self, f: &mut F);
}

/// VarDeclaredNames of a Module, without duplicates and in source order.
pub(crate) fn module_var_declared_names(module: &Program<'_>) -> Vec<JsString> {
    let mut var_declared_names: Vec<JsString> = Vec::new();
    // ModuleItemList : ModuleItemList ModuleItem
    // 1. Let names1 be VarDeclaredNames of ModuleItemList.
    // 2. Let names2 be VarDeclaredNames of ModuleItem.
    // 3. Return the list-concatenation of names1 and names2.
    for st in &module.body {
        st.var_declared_names(&mut |identifier| {
            let name = identifier.name.as_str();
            if !var_declared_names.iter().any(|n| n.as_str() == name) {
                var_declared_names.push(name.into());
            }
        });
    }
    var_declared_names
}

fn var_declaration_bound_names<'a, F: FnMut(&BindingIdentifier<'a>)>(
    decl: &VariableDeclaration<'a>,
    f: &mut F,
) {
    if decl.kind == VariableDeclarationKind::Var {
        decl.bound_names(f);
    }
}

impl<'a> VarDeclaredNames<'a> for Statement<'a> {
    fn var_declared_names<F: FnMut(&BindingIdentifier<'a>)>(&self, f: &mut F) {
        match self {
            Statement::BlockStatement(st) => {
                // Block : { StatementList }
                for st in &st.body {
                    st.var_declared_names(f);
                }
            }
            Statement::DoWhileStatement(st) => st.body.var_declared_names(f),
            Statement::WhileStatement(st) => st.body.var_declared_names(f),
            Statement::WithStatement(st) => st.body.var_declared_names(f),
            Statement::LabeledStatement(st) => st.body.var_declared_names(f),
            Statement::IfStatement(st) => {
                // IfStatement : if ( Expression ) Statement else Statement
                // 1. Let names1 be VarDeclaredNames of the first Statement.
                // 2. Let names2 be VarDeclaredNames of the second Statement.
                // 3. Return the list-concatenation of names1 and names2.
                st.consequent.var_declared_names(f);
                if let Some(alternate) = &st.alternate {
                    alternate.var_declared_names(f);
                }
            }
            Statement::ForStatement(st) => {
                // ForStatement : for ( var VariableDeclarationList ; Expressionopt ; Expressionopt ) Statement
                // 1. Let names1 be BoundNames of VariableDeclarationList.
                if let Some(ForStatementInit::VariableDeclaration(decl)) = &st.init {
                    var_declaration_bound_names(decl, f);
                }
                // 2. Let names2 be VarDeclaredNames of Statement.
                st.body.var_declared_names(f);
            }
            Statement::ForInStatement(st) => {
                // for ( var ForBinding in Expression ) Statement
                // 1. Let names1 be the BoundNames of ForBinding.
                if let ForStatementLeft::VariableDeclaration(decl) = &st.left {
                    var_declaration_bound_names(decl, f);
                }
                // 2. Let names2 be the VarDeclaredNames of Statement.
                st.body.var_declared_names(f);
            }
            Statement::ForOfStatement(st) => {
                if let ForStatementLeft::VariableDeclaration(decl) = &st.left {
                    var_declaration_bound_names(decl, f);
                }
                st.body.var_declared_names(f);
            }
            Statement::SwitchStatement(st) => {
                for case in &st.cases {
                    for st in &case.consequent {
                        st.var_declared_names(f);
                    }
                }
            }
            Statement::TryStatement(st) => {
                // TryStatement : try Block Catch Finally
                for st in &st.block.body {
                    st.var_declared_names(f);
                }
                if let Some(handler) = &st.handler {
                    for st in &handler.body.body {
                        st.var_declared_names(f);
                    }
                }
                if let Some(finalizer) = &st.finalizer {
                    for st in &finalizer.body {
                        st.var_declared_names(f);
                    }
                }
            }
            // VariableStatement : var VariableDeclarationList ;
            // 1. Return BoundNames of VariableDeclarationList.
            Statement::VariableDeclaration(decl) => var_declaration_bound_names(decl, f),
            // ExportDeclaration : export VariableStatement
            // 1. Return BoundNames of VariableStatement.
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(Declaration::VariableDeclaration(decl)) = &decl.declaration {
                    var_declaration_bound_names(decl, f);
                }
            }
            // 1. Return a new empty List.
            _ => {}
        }
    }
}

/// ### [16.2.1.7.4 Static Semantics: LexicallyScopedDeclarations](https://tc39.es/ecma262/#sec-static-semantics-lexicallyscopeddeclarations)
///
/// Lexically scoped declarations of a ModuleItemList, excluding import
/// declarations. At the top level of a Module, function declarations are
/// treated like lexical declarations rather than like var declarations.
///
/// `export default` of an expression or anonymous declaration binds
/// `*default*`.
pub(crate) fn module_lexically_scoped_declarations(
    module: &Program<'_>,
) -> Vec<(JsString, LexicalDeclarationKind)> {
    let mut declarations = Vec::new();
    for st in &module.body {
        match st {
            Statement::VariableDeclaration(decl) => {
                if let Some(kind) = lexical_kind_of(decl.kind) {
                    decl.bound_names(&mut |identifier| push(&mut declarations, identifier, kind));
                }
            }
            Statement::FunctionDeclaration(decl) => {
                decl.bound_names(&mut |identifier| {
                    push(&mut declarations, identifier, LexicalDeclarationKind::Function)
                });
            }
            Statement::ClassDeclaration(decl) => {
                decl.bound_names(&mut |identifier| {
                    push(&mut declarations, identifier, LexicalDeclarationKind::Class)
                });
            }
            Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                Some(Declaration::VariableDeclaration(decl)) => {
                    if let Some(kind) = lexical_kind_of(decl.kind) {
                        decl.bound_names(&mut |identifier| push(&mut declarations, identifier, kind));
                    }
                }
                Some(Declaration::FunctionDeclaration(decl)) => {
                    decl.bound_names(&mut |identifier| {
                    push(&mut declarations, identifier, LexicalDeclarationKind::Function)
                });
                }
                Some(Declaration::ClassDeclaration(decl)) => {
                    decl.bound_names(&mut |identifier| {
                    push(&mut declarations, identifier, LexicalDeclarationKind::Class)
                });
                }
                _ => {}
            },
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                // ExportDeclaration : export default HoistableDeclaration
                // 1. Return a List whose sole element is DeclarationPart of
                //    HoistableDeclaration.
                ExportDefaultDeclarationKind::FunctionDeclaration(decl) => match &decl.id {
                    Some(id) => push(&mut declarations, id, LexicalDeclarationKind::Function),
                    None => declarations.push(("*default*".into(), LexicalDeclarationKind::Function)),
                },
                // ExportDeclaration : export default ClassDeclaration
                ExportDefaultDeclarationKind::ClassDeclaration(decl) => match &decl.id {
                    Some(id) => push(&mut declarations, id, LexicalDeclarationKind::Class),
                    None => declarations.push(("*default*".into(), LexicalDeclarationKind::Class)),
                },
                ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {}
                // ExportDeclaration : export default AssignmentExpression ;
                // 1. Return a List whose sole element is this ExportDeclaration.
                _ => declarations.push(("*default*".into(), LexicalDeclarationKind::Default)),
            },
            _ => {}
        }
    }
    declarations
}

fn push(
    declarations: &mut Vec<(JsString, LexicalDeclarationKind)>,
    identifier: &BindingIdentifier,
    kind: LexicalDeclarationKind,
) {
    declarations.push((identifier.name.as_str().into(), kind));
}

fn lexical_kind_of(kind: VariableDeclarationKind) -> Option<LexicalDeclarationKind> {
    match kind {
        VariableDeclarationKind::Var => None,
        VariableDeclarationKind::Let => Some(LexicalDeclarationKind::Let),
        VariableDeclarationKind::Const
        | VariableDeclarationKind::Using
        | VariableDeclarationKind::AwaitUsing => Some(LexicalDeclarationKind::Const),
    }
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    use super::*;

    fn with_program<R>(source_text: &str, f: impl FnOnce(&Program<'_>) -> R) -> R {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source_text, SourceType::default().with_module(true)).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        f(&ret.program)
    }

    fn names(list: &[JsString]) -> Vec<&str> {
        list.iter().map(JsString::as_str).collect()
    }

    #[test]
    fn var_names_are_hoisted_out_of_blocks() {
        with_program(
            "var a; { var b; let c; } for (var i of xs) { var d; } export var e = 1; var a; \
             function f() { var hidden; }",
            |program| {
                let vars = module_var_declared_names(program);
                assert_eq!(names(&vars), ["a", "b", "i", "d", "e"]);
            },
        );
    }

    #[test]
    fn lexical_declarations_of_module_items() {
        with_program(
            "let a; const b = 1; function f() {} class C {} export let d; \
             export default function () {} { let nested; }",
            |program| {
                let decls = module_lexically_scoped_declarations(program);
                let decls: Vec<(&str, LexicalDeclarationKind)> =
                    decls.iter().map(|(n, k)| (n.as_str(), *k)).collect();
                assert_eq!(
                    decls,
                    [
                        ("a", LexicalDeclarationKind::Let),
                        ("b", LexicalDeclarationKind::Const),
                        ("f", LexicalDeclarationKind::Function),
                        ("C", LexicalDeclarationKind::Class),
                        ("d", LexicalDeclarationKind::Let),
                        ("*default*", LexicalDeclarationKind::Function),
                    ]
                );
            },
        );
    }

    #[test]
    fn default_expression_binds_star_default() {
        with_program("export default 40 + 2;", |program| {
            let decls = module_lexically_scoped_declarations(program);
            assert_eq!(decls.len(), 1);
            assert_eq!(decls[0].0.as_str(), "*default*");
            assert_eq!(decls[0].1, LexicalDeclarationKind::Default);
        });
    }
}
