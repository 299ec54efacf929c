// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16 ECMAScript Language: Scripts and Modules](https://tc39.es/ecma262/#sec-ecmascript-language-scripts-and-modules)

use module::module_semantics::Module;
use script::Script;

pub mod module;
pub mod script;

/// The referrer of a module request: either a script (for `import()` calls
/// in classic scripts) or a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptOrModule {
    Script(Script),
    Module(Module),
}

impl From<Script> for ScriptOrModule {
    fn from(value: Script) -> Self {
        Self::Script(value)
    }
}

impl From<Module> for ScriptOrModule {
    fn from(value: Module) -> Self {
        Self::Module(value)
    }
}
