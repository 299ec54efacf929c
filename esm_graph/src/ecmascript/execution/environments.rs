// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [9.1 Environment Records](https://tc39.es/ecma262/#sec-environment-records)
//!
//! Only module environments exist in the module graph: function and block
//! scopes belong to the interpreter.

mod module_environment;

pub(crate) use module_environment::{Binding, ModuleEnvironment};
