// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{fmt::Display, rc::Rc};

use crate::{
    ecmascript::{
        builtins::{
            control_abstraction_objects::promise_objects::promise_abstract_operations::promise_jobs::{
                PromiseReactionJob, PromiseResolveThenableJob,
            },
            error::ErrorHeapData,
            ordinary::OrdinaryObject,
            promise::Promise,
        },
        scripts_and_modules::{
            ScriptOrModule,
            module::{DynamicImportTicket, FinishDynamicImportJob, module_semantics::Module},
        },
        types::{JsString, Value},
    },
    engine::Interpreter,
    heap::{CreateHeapData, Heap},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Options {
    /// Log the status of every module after each Link() and Evaluate().
    pub print_internals: bool,
}

pub type JsResult<T> = std::result::Result<T, JsError>;

/// A thrown ECMAScript value.
#[derive(Debug, Default, Clone, PartialEq)]
#[repr(transparent)]
pub struct JsError(Value);

impl JsError {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn to_string(&self, agent: &Agent) -> JsString {
        self.0.string_repr(agent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseRejectionTrackerOperation {
    Reject,
    Handle,
}

pub trait HostHooks: std::fmt::Debug {
    /// ### [16.2.1.8 HostLoadImportedModule ( referrer, specifier, hostDefined, payload )](https://tc39.es/ecma262/#sec-HostLoadImportedModule)
    ///
    /// Maps a module request to a module record, synchronously.
    ///
    /// The host owns the module map: if this operation is called multiple
    /// times with the same (referrer, specifier) pair and it returns a
    /// module, then it must return the same module each time. Multiple
    /// different (referrer, specifier) pairs may map to the same module. The
    /// actual mapping semantics is host-defined but typically a
    /// normalization process is applied to specifier as part of the mapping
    /// process, such as the expansion of relative path specifiers.
    ///
    /// A thrown error is reported by Link() as a resolution failure.
    fn host_resolve_imported_module(
        &self,
        agent: &mut Agent,
        referrer: ScriptOrModule,
        specifier: &JsString,
    ) -> JsResult<Module>;

    /// ### [9.5.5 HostEnqueuePromiseJob ( job, realm )](https://tc39.es/ecma262/#sec-hostenqueuepromisejob)
    ///
    /// Schedules a job to be performed at some future time. Jobs must run in
    /// the same order as they were enqueued, on the thread that owns the
    /// agent, and only when no other job or module body is running.
    fn enqueue_promise_job(&self, job: Job);

    /// ### [16.2.1.8 HostImportModuleDynamically ( referencingScriptOrModule, specifier, promiseCapability )](https://262.ecma-international.org/12.0/#sec-hostimportmoduledynamically)
    ///
    /// Called by `import()` after the promise capability has been created.
    /// The host must eventually call
    /// [`finish_dynamic_import`](crate::ecmascript::scripts_and_modules::module::finish_dynamic_import)
    /// exactly once with the ticket and the loaded module or an error. The
    /// ticket is `Send`, so the loading may happen on another thread as long
    /// as the completion is handed back to the agent's thread.
    ///
    /// The default implementation enqueues a promise job that resolves the
    /// specifier through [`HostHooks::host_resolve_imported_module`] and
    /// finishes the import.
    fn host_import_module_dynamically(
        &self,
        _agent: &mut Agent,
        referrer: ScriptOrModule,
        specifier: JsString,
        ticket: DynamicImportTicket,
    ) {
        self.enqueue_promise_job(Job {
            inner: InnerJob::FinishDynamicImport(FinishDynamicImportJob::new(
                referrer, specifier, ticket,
            )),
        });
    }

    /// ### [16.2.1.12 HostGetImportMetaProperties ( moduleRecord )](https://tc39.es/ecma262/#sec-hostgetimportmetaproperties)
    ///
    /// Returns the property keys and values to set on a module's
    /// `import.meta` object. Most hosts will simply define
    /// HostGetImportMetaProperties, and leave HostFinalizeImportMeta with
    /// its default behaviour.
    ///
    /// The default implementation returns an empty list.
    fn host_get_import_meta_properties(
        &self,
        _agent: &mut Agent,
        _module: Module,
    ) -> Vec<(JsString, Value)> {
        Vec::new()
    }

    /// ### [16.2.1.13 HostFinalizeImportMeta ( importMeta, moduleRecord )](https://tc39.es/ecma262/#sec-hostfinalizeimportmeta)
    ///
    /// Performs any extraordinary operations to prepare the object returned
    /// from `import.meta`. The default implementation does nothing.
    fn host_finalize_import_meta(
        &self,
        _agent: &mut Agent,
        _import_meta: OrdinaryObject,
        _module: Module,
    ) {
    }

    /// ### [27.2.1.9 HostPromiseRejectionTracker ( promise, operation )](https://tc39.es/ecma262/#sec-host-promise-rejection-tracker)
    ///
    /// The host-defined abstract operation HostPromiseRejectionTracker takes
    /// arguments promise (a Promise) and operation ("reject" or "handle") and
    /// returns unused. It allows host environments to track promise rejections.
    ///
    /// The default implementation of HostPromiseRejectionTracker is to return
    /// unused.
    ///
    /// #### Note
    ///
    /// HostPromiseRejectionTracker is called in two scenarios:
    ///
    /// When a promise is rejected without any handlers, it is called with its
    /// operation argument set to "reject".
    /// When a handler is added to a rejected promise for the first time, it is
    /// called with its operation argument set to "handle".
    fn host_promise_rejection_tracker(
        &self,
        _promise: Promise,
        _operation: PromiseRejectionTrackerOperation,
    ) {
    }
}

/// ### [9.5 Jobs and Host Operations to Enqueue Jobs](https://tc39.es/ecma262/#sec-jobs)
#[derive(Debug)]
pub struct Job {
    pub(crate) inner: InnerJob,
}

#[derive(Debug)]
pub(crate) enum InnerJob {
    PromiseResolveThenable(PromiseResolveThenableJob),
    PromiseReaction(PromiseReactionJob),
    FinishDynamicImport(FinishDynamicImportJob),
}

impl Job {
    /// Runs the job to completion. An error is an uncaught exception thrown
    /// by a host callback attached without a result promise.
    pub fn run(self, agent: &mut Agent) -> JsResult<()> {
        match self.inner {
            InnerJob::PromiseResolveThenable(job) => job.run(agent),
            InnerJob::PromiseReaction(job) => job.run(agent),
            InnerJob::FinishDynamicImport(job) => job.run(agent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Error,
    AggregateError,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl Display for ExceptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExceptionType::Error => "Error",
            ExceptionType::AggregateError => "AggregateError",
            ExceptionType::EvalError => "EvalError",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
            ExceptionType::UriError => "URIError",
        })
    }
}

/// ### [9.7 Agents](https://tc39.es/ecma262/#sec-agents)
pub struct Agent {
    pub(crate) heap: Heap,
    pub(crate) options: Options,
    pub(crate) host_hooks: Rc<dyn HostHooks>,
    pub(crate) interpreter: Rc<dyn Interpreter>,
    /// \[\[ModuleAsyncEvaluationCount\]\]
    ///
    /// Initially 1. Used to assign values to the \[\[AsyncEvaluationOrder\]\]
    /// field of modules that are asynchronous or have asynchronous
    /// dependencies.
    module_async_evaluation_count: u32,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("options", &self.options)
            .field("host_hooks", &self.host_hooks)
            .field("interpreter", &self.interpreter)
            .field("module_async_evaluation_count", &self.module_async_evaluation_count)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(
        options: Options,
        host_hooks: Rc<dyn HostHooks>,
        interpreter: Rc<dyn Interpreter>,
    ) -> Self {
        Self {
            heap: Heap::new(),
            options,
            host_hooks,
            interpreter,
            module_async_evaluation_count: 1,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn host_hooks(&self) -> Rc<dyn HostHooks> {
        self.host_hooks.clone()
    }

    pub(crate) fn interpreter(&self) -> Rc<dyn Interpreter> {
        self.interpreter.clone()
    }

    /// ### [9.6.3 IncrementModuleAsyncEvaluationCount ( )](https://tc39.es/ecma262/#sec-IncrementModuleAsyncEvaluationCount)
    pub(crate) fn increment_module_async_evaluation_count(&mut self) -> u32 {
        // 1. Let AR be the Agent Record of the surrounding agent.
        // 2. Let count be AR.[[ModuleAsyncEvaluationCount]].
        let count = self.module_async_evaluation_count;
        // 3. Set AR.[[ModuleAsyncEvaluationCount]] to count + 1.
        self.module_async_evaluation_count += 1;
        // 4. Return count.
        count
    }

    /// Creates a new error object of the given kind.
    pub fn create_exception(&mut self, kind: ExceptionType, message: String) -> Value {
        let error = self
            .heap
            .create(ErrorHeapData::new(kind, Some(message.into())));
        Value::Error(error)
    }

    /// ### [5.2.3.2 Throw an Exception](https://tc39.es/ecma262/#sec-throw-an-exception)
    pub fn throw_exception(&mut self, kind: ExceptionType, message: String) -> JsError {
        JsError(self.create_exception(kind, message))
    }

    /// ### [5.2.3.2 Throw an Exception](https://tc39.es/ecma262/#sec-throw-an-exception)
    pub fn throw_exception_with_static_message(
        &mut self,
        kind: ExceptionType,
        message: &'static str,
    ) -> JsError {
        JsError(self.create_exception(kind, message.to_string()))
    }
}
