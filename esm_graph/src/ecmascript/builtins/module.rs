// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.4.6 Module Namespace Exotic Objects](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)
//!
//! A module namespace exotic object is an exotic object that exposes the
//! bindings exported from an ECMAScript Module. There is a one-to-one
//! correspondence between the String-keyed own properties of a module
//! namespace exotic object and the binding names exported by the Module.
//! The exported bindings include any bindings that are indirectly exported
//! using export * export items. Each String-valued own property key is the
//! StringValue of the corresponding exported binding name. These are the
//! only String-keyed properties of a module namespace exotic object.

use std::rc::Rc;

use crate::ecmascript::{
    execution::{Agent, JsResult, agent::ExceptionType},
    scripts_and_modules::module::module_semantics::{
        Module, abstract_module_records::BindingName, resolve_export_binding,
    },
    types::{JsString, Value},
};

/// The namespace object of a module. A module has exactly one namespace
/// object, so the handle is the module itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ModuleNamespace(Module);

impl From<ModuleNamespace> for Module {
    fn from(value: ModuleNamespace) -> Self {
        value.0
    }
}

impl ModuleNamespace {
    /// ### \[\[Module\]\]
    pub fn module(self) -> Module {
        self.0
    }

    /// ### \[\[Exports\]\]
    ///
    /// The exported names of the module, ordered as if by
    /// `Array.prototype.sort` with `undefined` as the comparator.
    pub fn exports(self, agent: &Agent) -> Rc<[JsString]> {
        match &agent[self.0].namespace {
            Some(exports) => exports.clone(),
            None => unreachable!("ModuleNamespace created without exports"),
        }
    }

    fn is_exported(self, agent: &Agent, key: &str) -> bool {
        // Exports are sorted by UTF-16 code units, which a str comparison
        // does not match; scan instead of binary searching.
        self.exports(agent).iter().any(|name| name.as_str() == key)
    }

    /// ### [10.4.6.11 \[\[OwnPropertyKeys\]\] ( )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-ownpropertykeys)
    ///
    /// The `@@toStringTag` symbol key is not listed: symbols are outside the
    /// value model of the module graph.
    pub fn own_property_keys(self, agent: &Agent) -> Vec<JsString> {
        // 1. Let exports be O.[[Exports]].
        // 2. Let symbolKeys be OrdinaryOwnPropertyKeys(O).
        // 3. Return the list-concatenation of exports and symbolKeys.
        self.exports(agent).to_vec()
    }

    /// ### [10.4.6.7 \[\[HasProperty\]\] ( P )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-hasproperty-p)
    pub fn has_property(self, agent: &Agent, key: &str) -> bool {
        // 2. Let exports be O.[[Exports]].
        // 3. If exports contains P, return true.
        // 4. Return false.
        self.is_exported(agent, key)
    }

    /// ### [10.4.6.8 \[\[Get\]\] ( P, Receiver )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-get-p-receiver)
    ///
    /// Reads are live: the binding is looked up in the exporting module's
    /// environment at the time of the call. Reading a binding that has not
    /// been initialized yet throws a ReferenceError.
    pub fn get(self, agent: &mut Agent, key: &str) -> JsResult<Value> {
        // 2. Let exports be O.[[Exports]].
        // 3. If exports does not contain P, return undefined.
        let Some(export_name) = self
            .exports(agent)
            .iter()
            .find(|name| name.as_str() == key)
            .cloned()
        else {
            return Ok(Value::Undefined);
        };
        // 4. Let m be O.[[Module]].
        let m = self.0;
        // 5. Let binding be m.ResolveExport(P).
        // 6. Assert: binding is a ResolvedBinding Record.
        // NOTE: A host module may stop resolving a name it used to export.
        let Some((target_module, binding_name)) = resolve_export_binding(agent, m, &export_name)?
        else {
            return Err(agent.throw_exception(
                ExceptionType::ReferenceError,
                format!("Export '{export_name}' cannot be resolved"),
            ));
        };
        // 7. Let targetModule be binding.[[Module]].
        // 8. Assert: targetModule is not undefined.
        match binding_name {
            // 9. If binding.[[BindingName]] is namespace, then
            BindingName::Namespace => {
                // a. Return GetModuleNamespace(targetModule).
                Ok(get_module_namespace(agent, target_module)?.into())
            }
            BindingName::Name(binding_name) => {
                // 10. Let targetEnv be targetModule.[[Environment]].
                // 11. If targetEnv is empty, throw a ReferenceError exception.
                // 12. Return ? targetEnv.GetBindingValue(binding.[[BindingName]], true).
                target_module.get_binding_value(agent, &binding_name)
            }
        }
    }

    /// ### [10.4.6.9 \[\[Set\]\] ( P, V, Receiver )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-set-p-v-receiver)
    pub fn set(self, _agent: &mut Agent, _key: &str, _value: Value) -> bool {
        // 1. Return false.
        false
    }

    /// ### [10.4.6.10 \[\[Delete\]\] ( P )](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects-delete-p)
    pub fn delete(self, agent: &Agent, key: &str) -> bool {
        // 2. Let exports be O.[[Exports]].
        // 3. If exports contains P, return false.
        // 4. Return true.
        !self.is_exported(agent, key)
    }
}

/// ### [16.2.1.10 GetModuleNamespace ( module )](https://tc39.es/ecma262/#sec-getmodulenamespace)
///
/// The abstract operation GetModuleNamespace takes argument module (an
/// instance of a concrete subclass of Module Record) and returns a Module
/// Namespace Object. It retrieves the Module Namespace Object representing
/// module's exports, lazily creating it the first time it was requested,
/// and storing it in module.\[\[Namespace\]\] for future retrieval.
///
/// #### Note
/// GetModuleNamespace never throws. Instead, unresolvable names are simply
/// excluded from the namespace at this point. They will lead to a real
/// linking error later unless they are all ambiguous star exports that are
/// not explicitly requested anywhere.
///
/// An error thrown by the host's resolver while walking `export *`
/// declarations is passed through.
pub fn get_module_namespace(agent: &mut Agent, module: Module) -> JsResult<ModuleNamespace> {
    // 1. Assert: If module is a Cyclic Module Record, then module.[[Status]]
    //    is not new or unlinked.
    // 2. Let namespace be module.[[Namespace]].
    // 3. If namespace is empty, then
    if agent[module].namespace.is_none() {
        // a. Let exportedNames be module.GetExportedNames().
        let exported_names = module
            .get_exported_names(agent, &mut Vec::new())?
            .unwrap_or_default();
        // b. Let unambiguousNames be a new empty List.
        let mut unambiguous_names = Vec::with_capacity(exported_names.len());
        // c. For each element name of exportedNames, do
        for name in exported_names {
            // i. Let resolution be module.ResolveExport(name).
            // ii. If resolution is a ResolvedBinding Record, append name to
            //     unambiguousNames.
            if resolve_export_binding(agent, module, &name)?.is_some() {
                unambiguous_names.push(name);
            }
        }
        // d. Set namespace to ModuleNamespaceCreate(module, unambiguousNames).
        module_namespace_create(agent, module, unambiguous_names);
    }
    // 4. Return namespace.
    Ok(ModuleNamespace(module))
}

/// ### [10.4.6.12 ModuleNamespaceCreate ( module, exports )](https://tc39.es/ecma262/#sec-modulenamespacecreate)
fn module_namespace_create(agent: &mut Agent, module: Module, mut exports: Vec<JsString>) {
    // 1. Assert: module.[[Namespace]] is empty.
    debug_assert!(agent[module].namespace.is_none());
    // 6. Let sortedExports be a List whose elements are the elements of
    //    exports, sorted according to lexicographic code unit order.
    exports.sort();
    exports.dedup();
    // 7. Set M.[[Exports]] to sortedExports.
    // 9. Set module.[[Namespace]] to M.
    agent[module].namespace = Some(exports.into());
}
