// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Debug;

use crate::{
    ecmascript::{
        execution::{Agent, JsResult},
        scripts_and_modules::module::module_semantics::Module,
        types::Value,
    },
    engine::ModuleContinuation,
    heap::{CreateHeapData, Heap},
};

use super::{promise_all_record::PromiseAllRecord, promise_capability_records::PromiseCapability};

/// \[\[Type\]\]
///
/// fulfill or reject
///
/// The \[\[Type\]\] is used when \[\[Handler\]\] is empty to allow for
/// behaviour specific to the settlement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseReactionType {
    Fulfill,
    Reject,
}

/// Callback attached through [`Promise::then`](crate::ecmascript::builtins::promise::Promise::then).
pub(crate) type HostReactionCallback = Box<dyn FnOnce(&mut Agent, JsResult<Value>) -> JsResult<Value>>;

/// \[\[Handler\]\]
///
/// The function that should be applied to the incoming value, and whose
/// return value will govern what happens to the derived promise. If
/// \[\[Handler\]\] is empty, a function that depends on the value of
/// \[\[Type\]\] will be used instead.
///
/// ECMA-262 creates anonymous built-in functions for the module graph's
/// reactions (the `onFulfilled` and `onRejected` closures of
/// ExecuteAsyncModule, ContinueDynamicImport and Promise.all). They are
/// listed here as variants instead.
pub(crate) enum PromiseReactionHandler {
    Empty,
    /// ### [16.2.1.5.3.2 ExecuteAsyncModule ( module )](https://tc39.es/ecma262/#sec-execute-async-module)
    ///
    /// Steps 4 and 6: AsyncModuleExecutionFulfilled or
    /// AsyncModuleExecutionRejected.
    AsyncModule(Module),
    /// Resumes a module body suspended at a top-level `await`.
    ModuleContinuation {
        module: Module,
        capability: PromiseCapability,
        continuation: Box<dyn ModuleContinuation>,
    },
    /// ### [16.2.1.11 ContinueDynamicImport ( promiseCapability, moduleCompletion )](https://tc39.es/ecma262/#sec-ContinueDynamicImport)
    ///
    /// Step 6 and 7: fulfil with the namespace of the module, or pass the
    /// evaluation error through.
    DynamicImport(Module),
    /// ### [27.2.4.1.3 Promise.all Resolve Element Functions](https://tc39.es/ecma262/#sec-promise.all-resolve-element-functions)
    PromiseAll { record: PromiseAllRecord, index: u32 },
    Host(HostReactionCallback),
}

impl Debug for PromiseReactionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::AsyncModule(module) => f.debug_tuple("AsyncModule").field(module).finish(),
            Self::ModuleContinuation {
                module,
                capability,
                continuation,
            } => f
                .debug_struct("ModuleContinuation")
                .field("module", module)
                .field("capability", capability)
                .field("continuation", continuation)
                .finish(),
            Self::DynamicImport(module) => f.debug_tuple("DynamicImport").field(module).finish(),
            Self::PromiseAll { record, index } => f
                .debug_struct("PromiseAll")
                .field("record", record)
                .field("index", index)
                .finish(),
            Self::Host(_) => write!(f, "Host"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct PromiseReactionRecord {
    /// \[\[Capability\]\]
    ///
    /// a PromiseCapability Record or undefined
    ///
    /// The capabilities of the promise for which this record provides a
    /// reaction handler.
    pub(crate) capability: Option<PromiseCapability>,
    /// \[\[Handler\]\]
    pub(crate) handler: PromiseReactionHandler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub(crate) struct PromiseReaction(u32);

impl PromiseReaction {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    /// Removes the record from the heap. Every reaction is triggered once,
    /// by the job that the settlement of its promise created.
    pub(crate) fn take(self, agent: &mut Agent) -> PromiseReactionRecord {
        agent
            .heap
            .promise_reaction_records
            .get_mut(self.get_index())
            .expect("PromiseReaction out of bounds")
            .take()
            .expect("PromiseReaction slot empty")
    }
}

impl CreateHeapData<PromiseReactionRecord, PromiseReaction> for Heap {
    fn create(&mut self, data: PromiseReactionRecord) -> PromiseReaction {
        self.promise_reaction_records.push(Some(data));
        PromiseReaction(self.promise_reaction_records.len() as u32 - 1)
    }
}
