// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The seam between the module graph and the code that runs module bodies.
//!
//! The graph decides *when* a source text module's body runs; the
//! interpreter decides *what* running it means. Bodies read and write their
//! module environment through
//! [`Module::get_binding_value`](crate::ecmascript::scripts_and_modules::module::module_semantics::Module::get_binding_value)
//! and friends.

use std::fmt::Debug;

use crate::ecmascript::{
    builtins::promise::Promise,
    execution::{Agent, JsResult},
    scripts_and_modules::module::module_semantics::Module,
    types::Value,
};

pub trait Interpreter: Debug {
    /// Called at the end of InitializeEnvironment for a source text module,
    /// after the environment holds every import binding and every
    /// top-level declaration. This is where function declarations get
    /// instantiated and their bindings initialized.
    fn initialize_environment(&self, _agent: &mut Agent, _module: Module) -> JsResult<()> {
        Ok(())
    }

    /// ### [16.2.1.7.2.1 ExecuteModule ( \[ capability \] )](https://tc39.es/ecma262/#sec-source-text-module-record-execute-module)
    ///
    /// Runs the body of a source text module. A module without top-level
    /// await must complete synchronously; a module with top-level await may
    /// suspend by returning [`ModuleExecution::Await`].
    fn execute_module(&self, agent: &mut Agent, module: Module) -> JsResult<ModuleExecution>;
}

/// Completion of a (possibly partial) module body execution.
#[derive(Debug)]
pub enum ModuleExecution {
    /// The body ran to its end.
    Completed,
    /// The body is suspended at an `await` on `promise`. Once it settles,
    /// the continuation is resumed with the settlement from a promise job.
    Await {
        promise: Promise,
        continuation: Box<dyn ModuleContinuation>,
    },
}

/// A suspended module body.
pub trait ModuleContinuation: Debug {
    /// Resumes the body with the result of the awaited promise: `Ok` with
    /// the fulfilment value, or `Err` with the rejection reason thrown at
    /// the `await`.
    fn resume(self: Box<Self>, agent: &mut Agent, result: JsResult<Value>) -> JsResult<ModuleExecution>;
}

/// An interpreter whose module bodies are empty.
///
/// Useful for graphs made only of host-defined modules, and for checking
/// the evaluation plumbing of source text modules without running code.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInterpreter;

impl Interpreter for NoopInterpreter {
    fn execute_module(&self, _agent: &mut Agent, _module: Module) -> JsResult<ModuleExecution> {
        Ok(ModuleExecution::Completed)
    }
}
