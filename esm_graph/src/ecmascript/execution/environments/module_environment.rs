// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ahash::AHashMap;

use crate::ecmascript::{
    scripts_and_modules::module::module_semantics::Module,
    types::{JsString, Value},
};

/// ### [9.1.1.5 Module Environment Records](https://tc39.es/ecma262/#sec-module-environment-records)
/// A Module Environment Record is a Declarative Environment Record that is
/// used to represent the outer scope of an ECMAScript Module. In additional to
/// normal mutable and immutable bindings, Module Environment Records also
/// provide immutable import bindings which are bindings that provide indirect
/// access to a target binding that exists in another Environment Record.
///
/// The outer environment of a module environment is the global environment,
/// which is owned by the interpreter.
#[derive(Debug, Default)]
pub(crate) struct ModuleEnvironment {
    bindings: AHashMap<JsString, Binding>,
}

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Local {
        /// `None` until the binding is initialized.
        value: Option<Value>,
        mutable: bool,
    },
    /// An indirect binding created by CreateImportBinding: reads go to the
    /// named binding of the target module at the time of the read.
    Import {
        module: Module,
        binding_name: JsString,
    },
}

impl ModuleEnvironment {
    /// ##### [9.1.1.1.1 HasBinding ( N )](https://tc39.es/ecma262/#sec-declarative-environment-records-hasbinding-n)
    pub(crate) fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// ##### [9.1.1.1.2 CreateMutableBinding ( N, D )](https://tc39.es/ecma262/#sec-declarative-environment-records-createmutablebinding-n-d)
    pub(crate) fn create_mutable_binding(&mut self, name: JsString) {
        // 1. Assert: envRec does not already have a binding for N.
        debug_assert!(!self.has_binding(&name));
        // 2. Create a mutable binding in envRec for N and record that it is
        //    uninitialized.
        self.bindings.insert(
            name,
            Binding::Local {
                value: None,
                mutable: true,
            },
        );
    }

    /// ##### [9.1.1.1.3 CreateImmutableBinding ( N, S )](https://tc39.es/ecma262/#sec-declarative-environment-records-createimmutablebinding-n-s)
    pub(crate) fn create_immutable_binding(&mut self, name: JsString) {
        // 1. Assert: envRec does not already have a binding for N.
        debug_assert!(!self.has_binding(&name));
        // 2. Create an immutable binding in envRec for N and record that it
        //    is uninitialized.
        self.bindings.insert(
            name,
            Binding::Local {
                value: None,
                mutable: false,
            },
        );
    }

    /// ##### [9.1.1.1.4 InitializeBinding ( N, V )](https://tc39.es/ecma262/#sec-declarative-environment-records-initializebinding-n-v)
    ///
    /// Returns false if there is no uninitialized local binding for N.
    pub(crate) fn initialize_binding(&mut self, name: &str, v: Value) -> bool {
        // 1. Assert: envRec must have an uninitialized binding for N.
        match self.bindings.get_mut(name) {
            Some(Binding::Local { value, .. }) if value.is_none() => {
                // 2. Set the bound value for N in envRec to V.
                // 3. Record that the binding for N in envRec has been initialized.
                *value = Some(v);
                true
            }
            _ => false,
        }
    }

    /// ##### [9.1.1.5.5 CreateImportBinding ( N, M, N2 )](https://tc39.es/ecma262/#sec-createimportbinding)
    pub(crate) fn create_import_binding(&mut self, name: JsString, module: Module, binding_name: JsString) {
        // 1. Assert: envRec does not already have a binding for N.
        debug_assert!(!self.has_binding(&name));
        // 2. Assert: When M.[[Environment]] is instantiated, it will have a
        //    direct binding for N2.
        // 3. Create an immutable indirect binding in envRec for N that
        //    references M and N2 as its target binding and record that the
        //    binding is initialized.
        self.bindings.insert(
            name,
            Binding::Import {
                module,
                binding_name,
            },
        );
    }

    pub(crate) fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub(crate) fn get_binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.bindings.get_mut(name)
    }
}
