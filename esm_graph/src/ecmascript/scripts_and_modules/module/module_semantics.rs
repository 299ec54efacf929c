// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1 Module Semantics](https://tc39.es/ecma262/#sec-module-semantics)
//!
//! A [`Module`] is a handle to one of three kinds of module records:
//!
//! * Source Text Module Records, created by [`parse_module`] from ECMAScript
//!   source text;
//! * host-defined Cyclic Module Records, created by
//!   [`Module::new_host_cyclic`], which take part in cycles and top-level
//!   await like source text modules do;
//! * host-defined leaf modules, created by [`Module::new_host`], which have
//!   no dependencies and evaluate synchronously (JSON or WebAssembly style
//!   modules).
//!
//! [`parse_module`]: source_text_module_records::parse_module

pub mod abstract_module_records;
pub mod cyclic_module_records;
pub mod source_text_module_records;

use std::{
    ops::{Index, IndexMut},
    rc::Rc,
};

use abstract_module_records::{
    BindingName, ModuleAbstractMethods, ModuleError, ResolveSet, ResolvedBinding,
};
use cyclic_module_records::{
    CyclicModuleAbstractMethods, CyclicModuleInstance, CyclicModuleRecord,
};
use source_text_module_records::SourceTextModuleRecord;

use crate::{
    ecmascript::{
        builtins::{
            module::{ModuleNamespace, get_module_namespace},
            ordinary::OrdinaryObject,
            promise::Promise,
        },
        execution::{
            Agent, JsError, JsResult,
            agent::ExceptionType,
            environments::{Binding, ModuleEnvironment},
        },
        scripts_and_modules::{ScriptOrModule, module::get_import_meta, script::HostDefined},
        types::{JsString, Value},
    },
    heap::{CreateHeapData, Heap},
};

/// A module record living in an [`Agent`].
///
/// Two handles are the same module if and only if they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Module(u32);

/// ### \[\[Status\]\]
///
/// Initially unlinked. Transitions to linking, linked, evaluating, possibly
/// evaluating-async, evaluated (in that order) as the module progresses
/// throughout its lifecycle. A failed link returns the module to unlinked.
/// Leaf modules only ever report unlinked, linked and evaluated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    #[default]
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

#[derive(Debug)]
pub struct ModuleHeapData {
    /// ### \[\[HostDefined\]\]
    pub(crate) host_defined: Option<HostDefined>,
    /// ### \[\[Namespace\]\]
    ///
    /// The sorted exported names, filled in by the first GetModuleNamespace.
    pub(crate) namespace: Option<Rc<[JsString]>>,
    /// ### \[\[ImportMeta\]\]
    pub(crate) import_meta: Option<OrdinaryObject>,
    /// The Cyclic Module Record fields. `None` for leaf modules.
    pub(crate) cyclic: Option<CyclicModuleRecord>,
    pub(crate) kind: ModuleKind,
}

#[derive(Debug)]
pub(crate) enum ModuleKind {
    SourceText(Box<SourceTextModuleRecord>),
    HostCyclic {
        methods: Rc<dyn CyclicModuleAbstractMethods>,
        /// Created by InitializeEnvironment, dropped when linking fails.
        instance: Option<Rc<dyn CyclicModuleInstance>>,
    },
    Leaf {
        methods: Rc<dyn ModuleAbstractMethods>,
        state: LeafModuleState,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LeafModuleState {
    Unlinked,
    Linked,
    Evaluated(Promise),
}

impl ModuleHeapData {
    pub(crate) fn new(
        kind: ModuleKind,
        cyclic: Option<CyclicModuleRecord>,
        host_defined: Option<HostDefined>,
    ) -> Self {
        Self {
            host_defined,
            namespace: None,
            import_meta: None,
            cyclic,
            kind,
        }
    }

    pub(crate) fn cyclic(&self) -> &CyclicModuleRecord {
        match &self.cyclic {
            Some(cyclic) => cyclic,
            None => unreachable!("Module is not a Cyclic Module Record"),
        }
    }

    pub(crate) fn cyclic_mut(&mut self) -> &mut CyclicModuleRecord {
        match &mut self.cyclic {
            Some(cyclic) => cyclic,
            None => unreachable!("Module is not a Cyclic Module Record"),
        }
    }

    pub(crate) fn source_text(&self) -> Option<&SourceTextModuleRecord> {
        match &self.kind {
            ModuleKind::SourceText(record) => Some(record),
            _ => None,
        }
    }

    fn environment(&self) -> Option<&ModuleEnvironment> {
        self.source_text()
            .and_then(|record| record.environment.as_ref())
    }

    fn environment_mut(&mut self) -> Option<&mut ModuleEnvironment> {
        match &mut self.kind {
            ModuleKind::SourceText(record) => record.environment.as_mut(),
            _ => None,
        }
    }
}

impl Module {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    /// Create a host-defined module that takes part in the cyclic module
    /// algorithms: it may import other modules, be part of an import cycle,
    /// and use top-level await.
    pub fn new_host_cyclic(
        agent: &mut Agent,
        methods: Rc<dyn CyclicModuleAbstractMethods>,
        host_defined: Option<HostDefined>,
    ) -> Self {
        let requested_modules = methods.requested_modules().into_boxed_slice();
        let cyclic = CyclicModuleRecord::new(false, requested_modules);
        agent.heap.create(ModuleHeapData::new(
            ModuleKind::HostCyclic {
                methods,
                instance: None,
            },
            Some(cyclic),
            host_defined,
        ))
    }

    /// Create a host-defined leaf module. Leaf modules do not import
    /// anything and evaluate synchronously.
    pub fn new_host(
        agent: &mut Agent,
        methods: Rc<dyn ModuleAbstractMethods>,
        host_defined: Option<HostDefined>,
    ) -> Self {
        agent.heap.create(ModuleHeapData::new(
            ModuleKind::Leaf {
                methods,
                state: LeafModuleState::Unlinked,
            },
            None,
            host_defined,
        ))
    }

    pub fn status(self, agent: &Agent) -> ModuleStatus {
        let data = &agent[self];
        match &data.kind {
            ModuleKind::Leaf { state, .. } => match state {
                LeafModuleState::Unlinked => ModuleStatus::Unlinked,
                LeafModuleState::Linked => ModuleStatus::Linked,
                LeafModuleState::Evaluated(_) => ModuleStatus::Evaluated,
            },
            _ => data.cyclic().status(),
        }
    }

    pub fn is_cyclic(self, agent: &Agent) -> bool {
        agent[self].cyclic.is_some()
    }

    /// ### \[\[RequestedModules\]\]
    ///
    /// The specifiers of the modules imported by this module, in source
    /// text occurrence order. Leaf modules have none.
    pub fn requested_modules(self, agent: &Agent) -> &[JsString] {
        match &agent[self].cyclic {
            Some(cyclic) => cyclic.requested_modules(),
            None => &[],
        }
    }

    /// ### \[\[HostDefined\]\]
    pub fn host_defined(self, agent: &Agent) -> Option<HostDefined> {
        agent[self].host_defined.clone()
    }

    /// ### \[\[EvaluationError\]\]
    ///
    /// The exception thrown while evaluating this module or one of its
    /// dependencies, if any.
    pub fn evaluation_error(self, agent: &Agent) -> Option<Value> {
        match &agent[self].kind {
            ModuleKind::Leaf {
                state: LeafModuleState::Evaluated(promise),
                ..
            } => match promise.try_get_result(agent) {
                Some(Err(err)) => Some(err.into_value()),
                _ => None,
            },
            ModuleKind::Leaf { .. } => None,
            _ => agent[self]
                .cyclic()
                .evaluation_error()
                .map(|err| err.value().clone()),
        }
    }

    /// ### \[\[CycleRoot\]\]
    pub fn cycle_root(self, agent: &Agent) -> Option<Module> {
        agent[self]
            .cyclic
            .as_ref()
            .and_then(|cyclic| cyclic.cycle_root())
    }

    /// ### \[\[HasTLA\]\]
    pub fn has_top_level_await(self, agent: &Agent) -> bool {
        agent[self]
            .cyclic
            .as_ref()
            .is_some_and(|cyclic| cyclic.has_tla())
    }

    /// The Source Text Module Record of this module, if it is one.
    pub fn as_source_text(self, agent: &Agent) -> Option<&SourceTextModuleRecord> {
        agent[self].source_text()
    }

    /// ### [Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
    ///
    /// Prepare the module for evaluation by transitively resolving all module
    /// dependencies and creating the module environments. On failure, every
    /// module that was being linked returns to the unlinked status.
    pub fn link(self, agent: &mut Agent) -> Result<(), ModuleError> {
        let methods = match &agent[self].kind {
            ModuleKind::Leaf { methods, state } => {
                if !matches!(state, LeafModuleState::Unlinked) {
                    return Ok(());
                }
                methods.clone()
            }
            _ => return cyclic_module_records::link(agent, self),
        };
        methods
            .link(agent, self)
            .map_err(|error| ModuleError::Link {
                import_path: Vec::new(),
                error,
            })?;
        if let ModuleKind::Leaf { state, .. } = &mut agent[self].kind {
            *state = LeafModuleState::Linked;
        }
        Ok(())
    }

    /// ### [Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
    ///
    /// Returns a promise for the evaluation of this module and its
    /// dependencies. The promise is rejected with the evaluation error if
    /// any module body threw. Calling this again returns the same promise,
    /// and module bodies never run twice.
    pub fn evaluate(self, agent: &mut Agent) -> Promise {
        let (methods, state) = match &agent[self].kind {
            ModuleKind::Leaf { methods, state } => (methods.clone(), *state),
            _ => return cyclic_module_records::evaluate(agent, self),
        };
        match state {
            LeafModuleState::Evaluated(promise) => return promise,
            LeafModuleState::Unlinked => {
                let error = agent.create_exception(
                    ExceptionType::TypeError,
                    "Module must be linked before it can be evaluated".to_string(),
                );
                return Promise::new_rejected(agent, error);
            }
            LeafModuleState::Linked => {}
        }
        let promise = match methods.evaluate(agent, self) {
            Ok(()) => Promise::new_resolved(agent, Value::Undefined),
            Err(err) => Promise::new_rejected(agent, err.into_value()),
        };
        if let ModuleKind::Leaf { state, .. } = &mut agent[self].kind {
            *state = LeafModuleState::Evaluated(promise);
        }
        promise
    }

    /// ### [ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#sec-resolveexport)
    ///
    /// Resolve an exported name to the module and local binding that
    /// ultimately provides it. `Ok(None)` means the name cannot be resolved;
    /// [`ResolvedBinding::Ambiguous`] means two different `export *`
    /// declarations provide it.
    pub fn resolve_export(
        self,
        agent: &mut Agent,
        export_name: &JsString,
        resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolvedBinding>> {
        match &agent[self].kind {
            ModuleKind::SourceText(_) => source_text_module_records::resolve_export(
                agent,
                self,
                export_name,
                resolve_set,
            ),
            ModuleKind::HostCyclic { methods, .. } => {
                let methods = methods.clone();
                methods.resolve_export(agent, self, export_name, resolve_set)
            }
            ModuleKind::Leaf { methods, .. } => {
                let methods = methods.clone();
                methods.resolve_export(agent, self, export_name, resolve_set)
            }
        }
    }

    /// ### [GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#sec-getexportednames)
    ///
    /// Returns `None` when this module is already in `export_star_set`: an
    /// `export *` cycle was reached and the caller already accounts for
    /// this module's names.
    pub fn get_exported_names(
        self,
        agent: &mut Agent,
        export_star_set: &mut Vec<Module>,
    ) -> JsResult<Option<Vec<JsString>>> {
        match &agent[self].kind {
            ModuleKind::SourceText(_) => {
                source_text_module_records::get_exported_names(agent, self, export_star_set)
            }
            ModuleKind::HostCyclic { methods, .. } => {
                if export_star_set.contains(&self) {
                    return Ok(None);
                }
                export_star_set.push(self);
                let methods = methods.clone();
                Ok(Some(methods.get_exported_names(agent, self)))
            }
            ModuleKind::Leaf { methods, .. } => {
                if export_star_set.contains(&self) {
                    return Ok(None);
                }
                export_star_set.push(self);
                let methods = methods.clone();
                Ok(Some(methods.get_exported_names(agent, self)))
            }
        }
    }

    /// ### [9.1.1.5.1 GetBindingValue ( N, S )](https://tc39.es/ecma262/#sec-module-environment-records-getbindingvalue-n-s)
    ///
    /// Read the current value of a binding of the module. Reads are live:
    /// import bindings read the exporting module's binding at the time of
    /// the read. Reading an uninitialized binding throws a ReferenceError.
    pub fn get_binding_value(self, agent: &mut Agent, name: &str) -> JsResult<Value> {
        let lookup = match &agent[self].kind {
            ModuleKind::SourceText(record) => match record.environment.as_ref() {
                None => BindingLookup::NotLinked,
                Some(env) => match env.get_binding(name) {
                    // 2. If the binding for N is an indirect binding, then
                    //   a. Let M and N2 be the indirection values provided
                    //      when this binding for N was created.
                    Some(Binding::Import {
                        module,
                        binding_name,
                    }) => BindingLookup::Indirect(*module, binding_name.clone()),
                    // 3. If the binding for N in envRec is an uninitialized
                    //    binding, throw a ReferenceError exception.
                    Some(Binding::Local { value: None, .. }) => BindingLookup::Uninitialized,
                    // 4. Return the value currently bound to N in envRec.
                    Some(Binding::Local {
                        value: Some(value), ..
                    }) => return Ok(value.clone()),
                    None => BindingLookup::Missing,
                },
            },
            ModuleKind::HostCyclic { instance, .. } => match instance {
                Some(instance) => BindingLookup::Instance(instance.clone()),
                None => BindingLookup::NotLinked,
            },
            ModuleKind::Leaf { methods, .. } => BindingLookup::Leaf(methods.clone()),
        };
        match lookup {
            // b. Let targetEnv be M.[[Environment]].
            // c. If targetEnv is empty, throw a ReferenceError exception.
            // d. Return ? targetEnv.GetBindingValue(N2, true).
            BindingLookup::Indirect(target, binding_name) => {
                target.get_binding_value(agent, &binding_name)
            }
            BindingLookup::Instance(instance) => instance.get_binding_value(agent, self, name),
            BindingLookup::Leaf(methods) => methods.get_binding_value(agent, self, name),
            BindingLookup::Uninitialized => Err(uninitialized_error(agent, name)),
            BindingLookup::Missing => Err(not_defined_error(agent, name)),
            BindingLookup::NotLinked => Err(not_linked_error(agent, name)),
        }
    }

    /// ### [9.1.1.1.1 HasBinding ( N )](https://tc39.es/ecma262/#sec-declarative-environment-records-hasbinding-n)
    ///
    /// Only source text modules that have been linked have bindings.
    pub fn has_binding(self, agent: &Agent, name: &str) -> bool {
        agent[self]
            .environment()
            .is_some_and(|env| env.has_binding(name))
    }

    /// ### [9.1.1.1.4 InitializeBinding ( N, V )](https://tc39.es/ecma262/#sec-declarative-environment-records-initializebinding-n-v)
    ///
    /// Used by interpreters to initialize `let`, `const`, `class` and
    /// function bindings of a source text module, and its `*default*`
    /// binding.
    pub fn initialize_binding(self, agent: &mut Agent, name: &str, value: Value) -> JsResult<()> {
        let initialized = agent[self]
            .environment_mut()
            .is_some_and(|env| env.initialize_binding(name, value));
        if initialized {
            Ok(())
        } else {
            Err(agent.throw_exception(
                ExceptionType::ReferenceError,
                format!("Binding '{name}' cannot be initialized"),
            ))
        }
    }

    /// ### [9.1.1.1.5 SetMutableBinding ( N, V, S )](https://tc39.es/ecma262/#sec-declarative-environment-records-setmutablebinding-n-v-s)
    ///
    /// Module code is strict: assigning to a constant or an import binding
    /// is a TypeError, assigning to an uninitialized binding is a
    /// ReferenceError.
    pub fn set_mutable_binding(self, agent: &mut Agent, name: &str, value: Value) -> JsResult<()> {
        let Some(env) = agent[self].environment_mut() else {
            return Err(not_linked_error(agent, name));
        };
        let binding = match env.get_binding_mut(name) {
            // 5. Else if the binding for N in envRec is a mutable binding,
            //    then
            Some(Binding::Local {
                value: Some(slot),
                mutable: true,
            }) => {
                // a. Change its bound value to V.
                *slot = value;
                return Ok(());
            }
            Some(binding) => binding.clone(),
            // 1. If envRec does not have a binding for N, then
            //   a. If S is true, throw a ReferenceError exception.
            None => return Err(not_defined_error(agent, name)),
        };
        Err(match binding {
            // 4. If the binding for N in envRec has not yet been
            //    initialized, then
            //   a. Throw a ReferenceError exception.
            Binding::Local { value: None, .. } => uninitialized_error(agent, name),
            Binding::Import { .. } => agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot assign to import '{name}'"),
            ),
            // 6. Else,
            //   a. Assert: This is an attempt to change the value of an
            //      immutable binding.
            //   b. If S is true, throw a TypeError exception.
            Binding::Local { .. } => agent.throw_exception_with_static_message(
                ExceptionType::TypeError,
                "Assignment to constant variable.",
            ),
        })
    }

    /// ### [GetModuleNamespace ( module )](https://tc39.es/ecma262/#sec-getmodulenamespace)
    pub fn namespace(self, agent: &mut Agent) -> JsResult<ModuleNamespace> {
        get_module_namespace(agent, self)
    }

    /// The `import.meta` object of this module.
    pub fn import_meta(self, agent: &mut Agent) -> OrdinaryObject {
        get_import_meta(agent, self)
    }
}

enum BindingLookup {
    Indirect(Module, JsString),
    Instance(Rc<dyn CyclicModuleInstance>),
    Leaf(Rc<dyn ModuleAbstractMethods>),
    Uninitialized,
    Missing,
    NotLinked,
}

fn uninitialized_error(agent: &mut Agent, name: &str) -> JsError {
    agent.throw_exception(
        ExceptionType::ReferenceError,
        format!("Cannot access '{name}' before initialization"),
    )
}

fn not_defined_error(agent: &mut Agent, name: &str) -> JsError {
    agent.throw_exception(ExceptionType::ReferenceError, format!("{name} is not defined"))
}

fn not_linked_error(agent: &mut Agent, name: &str) -> JsError {
    agent.throw_exception(
        ExceptionType::ReferenceError,
        format!("Cannot access '{name}': module is not linked"),
    )
}

/// ### [16.2.1.9 GetImportedModule ( referrer, request )](https://tc39.es/ecma262/#sec-GetImportedModule)
///
/// The host is asked every time: it owns the module map and must answer
/// consistently for the same referrer and specifier.
pub(crate) fn get_imported_module(
    agent: &mut Agent,
    referrer: Module,
    specifier: &JsString,
) -> JsResult<Module> {
    let host_hooks = agent.host_hooks();
    host_hooks.host_resolve_imported_module(agent, ScriptOrModule::Module(referrer), specifier)
}

/// Resolve an export on behalf of a namespace or an import binding, using
/// a fresh resolve set.
pub(crate) fn resolve_export_binding(
    agent: &mut Agent,
    module: Module,
    export_name: &JsString,
) -> JsResult<Option<(Module, BindingName)>> {
    let mut resolve_set = ResolveSet::new();
    Ok(
        match module.resolve_export(agent, export_name, &mut resolve_set)? {
            Some(ResolvedBinding::Resolved {
                module,
                binding_name,
            }) => Some((module, binding_name)),
            Some(ResolvedBinding::Ambiguous) | None => None,
        },
    )
}

impl Index<Module> for Agent {
    type Output = ModuleHeapData;

    fn index(&self, index: Module) -> &Self::Output {
        self.heap
            .modules
            .get(index.get_index())
            .expect("Module out of bounds")
    }
}

impl IndexMut<Module> for Agent {
    fn index_mut(&mut self, index: Module) -> &mut Self::Output {
        self.heap
            .modules
            .get_mut(index.get_index())
            .expect("Module out of bounds")
    }
}

impl CreateHeapData<ModuleHeapData, Module> for Heap {
    fn create(&mut self, data: ModuleHeapData) -> Module {
        self.modules.push(data);
        Module(self.modules.len() as u32 - 1)
    }
}
