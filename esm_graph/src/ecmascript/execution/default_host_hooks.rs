// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{cell::RefCell, collections::VecDeque, fmt::Debug};

use ahash::AHashMap;

use super::{
    Agent, JsResult,
    agent::{ExceptionType, HostHooks, Job, PromiseRejectionTrackerOperation},
};
use crate::ecmascript::{
    builtins::promise::Promise,
    scripts_and_modules::{ScriptOrModule, module::module_semantics::Module},
    types::JsString,
};

/// An in-memory host: specifiers are looked up verbatim in a module map
/// that the embedder fills with [`DefaultHostHooks::register_module`], and
/// promise jobs are queued until [`DefaultHostHooks::run_jobs`] is called.
#[derive(Default)]
pub struct DefaultHostHooks {
    module_map: RefCell<AHashMap<JsString, Module>>,
    promise_job_queue: RefCell<VecDeque<Job>>,
    unhandled_rejections: RefCell<Vec<Promise>>,
}

// RefCell doesn't implement Debug
impl Debug for DefaultHostHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHostHooks")
            .field("module_map", &*self.module_map.borrow())
            .finish_non_exhaustive()
    }
}

impl DefaultHostHooks {
    /// Makes `module` the result of resolving `specifier` from any referrer.
    pub fn register_module(&self, specifier: impl Into<JsString>, module: Module) {
        self.module_map
            .borrow_mut()
            .insert(specifier.into(), module);
    }

    pub fn pop_promise_job(&self) -> Option<Job> {
        self.promise_job_queue.borrow_mut().pop_front()
    }

    /// Drains the promise job queue, including jobs enqueued while running.
    /// Stops at the first job that throws.
    pub fn run_jobs(&self, agent: &mut Agent) -> JsResult<()> {
        while let Some(job) = self.pop_promise_job() {
            job.run(agent)?;
        }
        Ok(())
    }

    /// Rejected promises that have not been handled yet, in rejection order.
    pub fn unhandled_rejections(&self) -> Vec<Promise> {
        self.unhandled_rejections.borrow().clone()
    }
}

impl HostHooks for DefaultHostHooks {
    fn host_resolve_imported_module(
        &self,
        agent: &mut Agent,
        _referrer: ScriptOrModule,
        specifier: &JsString,
    ) -> JsResult<Module> {
        let module = self.module_map.borrow().get(specifier).copied();
        module.ok_or_else(|| {
            agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot find module '{specifier}'"),
            )
        })
    }

    fn enqueue_promise_job(&self, job: Job) {
        self.promise_job_queue.borrow_mut().push_back(job);
    }

    fn host_promise_rejection_tracker(
        &self,
        promise: Promise,
        operation: PromiseRejectionTrackerOperation,
    ) {
        let mut unhandled_rejections = self.unhandled_rejections.borrow_mut();
        match operation {
            PromiseRejectionTrackerOperation::Reject => unhandled_rejections.push(promise),
            PromiseRejectionTrackerOperation::Handle => {
                unhandled_rejections.retain(|p| *p != promise)
            }
        }
    }
}
