// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5 Abstract Module Records](https://tc39.es/ecma262/#sec-abstract-module-records)

use std::fmt::Debug;

use crate::ecmascript::{
    execution::{Agent, JsError, JsResult, agent::ExceptionType},
    types::{JsString, Value},
};

use super::Module;

/// ### \[\[BindingName\]\]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingName {
    /// A binding in the module's environment.
    Name(JsString),
    /// The module's namespace object, as exported by `export * as ns from`.
    Namespace,
}

/// ### [ResolvedBinding Record](https://tc39.es/ecma262/#resolvedbinding-record)
///
/// The result of resolving an exported name to the module that defines the
/// binding behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBinding {
    Resolved {
        /// ### \[\[Module\]\]
        module: Module,
        /// ### \[\[BindingName\]\]
        binding_name: BindingName,
    },
    /// Two `export *` declarations provide the name from different
    /// bindings. Never a usable binding.
    Ambiguous,
}

/// The `resolveSet` of ResolveExport: every `(module, export name)` pair
/// visited by one top-level resolution, used to detect circular re-exports.
#[derive(Debug, Default, Clone)]
pub struct ResolveSet(Vec<(Module, JsString)>);

impl ResolveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, module: Module, export_name: &str) -> bool {
        self.0
            .iter()
            .any(|(m, name)| *m == module && name.as_str() == export_name)
    }

    pub fn insert(&mut self, module: Module, export_name: JsString) {
        self.0.push((module, export_name));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// ### [Abstract Methods of Module Records](https://tc39.es/ecma262/#table-abstract-methods-of-module-records)
///
/// Implemented by hosts for leaf modules: modules that have no dependencies
/// and whose evaluation is synchronous, such as JSON modules. The module
/// graph calls [`link`](ModuleAbstractMethods::link) and
/// [`evaluate`](ModuleAbstractMethods::evaluate) at most once each.
pub trait ModuleAbstractMethods: Debug {
    /// ### Link()
    ///
    /// Prepare the module for evaluation.
    fn link(&self, _agent: &mut Agent, _module: Module) -> JsResult<()> {
        Ok(())
    }

    /// ### Evaluate()
    ///
    /// Evaluate the module. The result settles the promise returned by
    /// [`Module::evaluate`].
    fn evaluate(&self, agent: &mut Agent, module: Module) -> JsResult<()>;

    /// ### GetExportedNames(\[exportStarSet\])
    fn get_exported_names(&self, agent: &mut Agent, module: Module) -> Vec<JsString>;

    /// ### ResolveExport(exportName \[, resolveSet\])
    ///
    /// The default implementation resolves every exported name to a binding
    /// of the same name in this module.
    fn resolve_export(
        &self,
        agent: &mut Agent,
        module: Module,
        export_name: &JsString,
        _resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolvedBinding>> {
        let provides = self
            .get_exported_names(agent, module)
            .iter()
            .any(|name| name == export_name);
        Ok(provides.then(|| ResolvedBinding::Resolved {
            module,
            binding_name: BindingName::Name(export_name.clone()),
        }))
    }

    /// Read the current value of one of the module's bindings.
    fn get_binding_value(&self, agent: &mut Agent, module: Module, name: &str) -> JsResult<Value>;
}

/// Failure of [`Module::link`].
///
/// `import_path` is the chain of specifiers followed from the module that
/// was linked down to the module request that failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModuleError {
    /// The host could not produce a module for a specifier.
    #[error("Cannot resolve module '{specifier}'{}", fmt_import_path(.import_path))]
    Resolution {
        specifier: JsString,
        import_path: Vec<JsString>,
        error: JsError,
    },
    /// A host module's Link() or InitializeEnvironment() threw.
    #[error("Module failed to link{}", fmt_import_path(.import_path))]
    Link {
        import_path: Vec<JsString>,
        error: JsError,
    },
    /// An import or re-export names a binding that the target module does
    /// not provide.
    #[error(
        "The requested module '{specifier}' does not provide an export named '{name}'{}",
        fmt_import_path(.import_path)
    )]
    Unresolvable {
        specifier: JsString,
        name: JsString,
        import_path: Vec<JsString>,
    },
    /// An import or re-export names a binding that the target module
    /// provides through conflicting `export *` declarations.
    #[error(
        "The requested module '{specifier}' contains conflicting star exports for name '{name}'{}",
        fmt_import_path(.import_path)
    )]
    Ambiguous {
        specifier: JsString,
        name: JsString,
        import_path: Vec<JsString>,
    },
}

fn fmt_import_path(import_path: &[JsString]) -> String {
    if import_path.is_empty() {
        return String::new();
    }
    let path = import_path
        .iter()
        .map(JsString::as_str)
        .collect::<Vec<_>>()
        .join(" -> ");
    format!(" (import path: {path})")
}

impl ModuleError {
    pub fn import_path(&self) -> &[JsString] {
        match self {
            ModuleError::Resolution { import_path, .. }
            | ModuleError::Link { import_path, .. }
            | ModuleError::Unresolvable { import_path, .. }
            | ModuleError::Ambiguous { import_path, .. } => import_path,
        }
    }

    /// Fill in the import path of an error raised without one.
    pub(crate) fn with_import_path(mut self, path: &[JsString]) -> Self {
        match &mut self {
            ModuleError::Resolution { import_path, .. }
            | ModuleError::Link { import_path, .. }
            | ModuleError::Unresolvable { import_path, .. }
            | ModuleError::Ambiguous { import_path, .. } => {
                if import_path.is_empty() {
                    *import_path = path.to_vec();
                }
            }
        }
        self
    }

    /// The value thrown to ECMAScript code for this error: the host's own
    /// exception for resolution and host link failures, a new SyntaxError
    /// for unresolvable and ambiguous bindings.
    pub fn into_js_error(self, agent: &mut Agent) -> JsError {
        match self {
            ModuleError::Resolution { error, .. } | ModuleError::Link { error, .. } => error,
            ModuleError::Unresolvable { .. } | ModuleError::Ambiguous { .. } => {
                agent.throw_exception(ExceptionType::SyntaxError, self.to_string())
            }
        }
    }
}
