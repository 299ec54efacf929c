// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [27.2 Promise Objects](https://tc39.es/ecma262/#sec-promise-objects)

mod data;

use std::ops::{Index, IndexMut};

pub(crate) use data::{PromiseHeapData, PromiseState};

use crate::{
    ecmascript::{
        builtins::{
            control_abstraction_objects::promise_objects::promise_abstract_operations::{
                promise_all_record::PromiseAllRecordHeapData,
                promise_capability_records::PromiseCapability,
                promise_jobs::new_promise_reaction_job,
                promise_reaction_records::{
                    PromiseReactionHandler, PromiseReactionRecord, PromiseReactionType,
                },
            },
            ordinary::create_array_from_list,
        },
        execution::{
            Agent, JsError, JsResult, agent::PromiseRejectionTrackerOperation,
        },
        types::Value,
    },
    heap::{CreateHeapData, Heap},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Promise(u32);

impl Promise {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    /// Create a new fulfilled Promise.
    pub fn new_resolved(agent: &mut Agent, value: Value) -> Self {
        agent.heap.create(PromiseHeapData {
            promise_state: PromiseState::Fulfilled {
                promise_result: value,
            },
        })
    }

    /// Create a new rejected Promise.
    ///
    /// The promise starts out unhandled: the host's rejection tracker is
    /// told about it immediately and again once a reaction is attached.
    pub fn new_rejected(agent: &mut Agent, error: Value) -> Self {
        let capability = PromiseCapability::new(agent);
        capability.reject(agent, error);
        capability.promise()
    }

    /// Get the result of a settled Promise, or None if the Promise is still
    /// pending.
    pub fn try_get_result(self, agent: &Agent) -> Option<JsResult<Value>> {
        match &agent[self].promise_state {
            PromiseState::Pending { .. } => None,
            PromiseState::Fulfilled { promise_result } => Some(Ok(promise_result.clone())),
            PromiseState::Rejected { promise_result, .. } => {
                Some(Err(JsError::new(promise_result.clone())))
            }
        }
    }

    pub fn is_pending(self, agent: &Agent) -> bool {
        matches!(agent[self].promise_state, PromiseState::Pending { .. })
    }

    pub(crate) fn set_already_resolved(self, agent: &mut Agent) {
        match &mut agent[self].promise_state {
            PromiseState::Pending { is_resolved, .. } => *is_resolved = true,
            _ => unreachable!(),
        };
    }

    /// Mark a rejected promise as handled, telling the host's rejection
    /// tracker if it was not handled yet.
    pub(crate) fn mark_handled(self, agent: &mut Agent) {
        let PromiseState::Rejected { is_handled, .. } = &mut agent[self].promise_state else {
            return;
        };
        if std::mem::replace(is_handled, true) {
            return;
        }
        agent
            .host_hooks
            .host_promise_rejection_tracker(self, PromiseRejectionTrackerOperation::Handle);
    }

    ///### [27.2.4.7.1 PromiseResolve ( C, x )](https://tc39.es/ecma262/#sec-promise-resolve)
    pub fn resolve(agent: &mut Agent, x: Value) -> Self {
        // 1. If IsPromise(x) is true, then
        if let Value::Promise(promise) = x {
            // a. Let xConstructor be ? Get(x, "constructor").
            // b. If SameValue(xConstructor, C) is true, return x.
            // NOTE: Ignoring subclasses.
            promise
        } else {
            // 2. Let promiseCapability be ? NewPromiseCapability(C).
            let promise_capability = PromiseCapability::new(agent);
            // 3. Perform ? Call(promiseCapability.[[Resolve]], undefined, « x »).
            promise_capability.resolve(agent, x);
            // 4. Return promiseCapability.[[Promise]].
            promise_capability.promise()
        }
    }

    /// Attach a host callback to the promise and return the derived promise.
    ///
    /// The callback runs as a promise job once this promise settles. The
    /// derived promise adopts the callback's result; returning a promise
    /// from the callback chains onto it.
    pub fn then<F>(self, agent: &mut Agent, on_settled: F) -> Promise
    where
        F: FnOnce(&mut Agent, JsResult<Value>) -> JsResult<Value> + 'static,
    {
        let capability = PromiseCapability::new(agent);
        self.perform_then(
            agent,
            PromiseReactionHandler::Host(Box::new(on_settled)),
            Some(capability),
        );
        capability.promise()
    }

    /// ### [27.2.5.4.1 PerformPromiseThen ( promise, onFulfilled, onRejected \[ , resultCapability \] )](https://tc39.es/ecma262/#sec-performpromisethen)
    pub(crate) fn perform_then(
        self,
        agent: &mut Agent,
        handler: PromiseReactionHandler,
        result_capability: Option<PromiseCapability>,
    ) {
        // 7. Let fulfillReaction be the PromiseReaction Record { [[Capability]]: resultCapability, [[Type]]: fulfill, [[Handler]]: onFulfilledJobCallback }.
        // 8. Let rejectReaction be the PromiseReaction Record { [[Capability]]: resultCapability, [[Type]]: reject, [[Handler]]: onRejectedJobCallback }.
        // NOTE: A single record serves both settlement types; the type is
        // fixed when its job is created.
        let reaction = agent.heap.create(PromiseReactionRecord {
            capability: result_capability,
            handler,
        });
        let job = match &mut agent[self].promise_state {
            // 9. If promise.[[PromiseState]] is pending, then
            PromiseState::Pending { reactions, .. } => {
                // a. Append fulfillReaction to promise.[[PromiseFulfillReactions]].
                // b. Append rejectReaction to promise.[[PromiseRejectReactions]].
                reactions.push(reaction);
                None
            }
            // 10. Else if promise.[[PromiseState]] is fulfilled, then
            PromiseState::Fulfilled { promise_result } => {
                // a. Let value be promise.[[PromiseResult]].
                // b. Let fulfillJob be NewPromiseReactionJob(fulfillReaction, value).
                Some((PromiseReactionType::Fulfill, promise_result.clone(), false))
            }
            // 11. Else,
            PromiseState::Rejected {
                promise_result,
                is_handled,
            } => {
                // a. Assert: The value of promise.[[PromiseState]] is rejected.
                // b. Let reason be promise.[[PromiseResult]].
                let was_handled = *is_handled;
                // 12. Set promise.[[PromiseIsHandled]] to true.
                *is_handled = true;
                Some((PromiseReactionType::Reject, promise_result.clone(), !was_handled))
            }
        };
        let Some((reaction_type, argument, notify_handle)) = job else {
            return;
        };
        // 11.c. If promise.[[PromiseIsHandled]] is false, perform HostPromiseRejectionTracker(promise, "handle").
        if notify_handle {
            agent
                .host_hooks
                .host_promise_rejection_tracker(self, PromiseRejectionTrackerOperation::Handle);
        }
        // 10.c. / 11.d. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        let job = new_promise_reaction_job(reaction, reaction_type, argument);
        agent.host_hooks.enqueue_promise_job(job);
    }

    /// ### [27.2.4.1 Promise.all ( iterable )](https://tc39.es/ecma262/#sec-promise.all)
    ///
    /// Aggregates already created promises: the result fulfils with an
    /// array-like object holding every fulfilment value in input order, or
    /// rejects with the first rejection reason.
    pub fn all(agent: &mut Agent, promises: &[Promise]) -> Promise {
        let capability = PromiseCapability::new(agent);
        // 8.d.ii. If remainingElementsCount.[[Value]] = 0, then
        if promises.is_empty() {
            // 1. Let valuesArray be CreateArrayFromList(values).
            let values_array = create_array_from_list(agent, Vec::new());
            // 2. Perform ? Call(resultCapability.[[Resolve]], undefined, « valuesArray »).
            capability.resolve(agent, values_array.into());
            return capability.promise();
        }
        let record = agent.heap.create(PromiseAllRecordHeapData {
            remaining_elements_count: promises.len() as u32,
            values: vec![None; promises.len()],
            capability,
        });
        for (index, promise) in promises.iter().enumerate() {
            promise.perform_then(
                agent,
                PromiseReactionHandler::PromiseAll {
                    record,
                    index: index as u32,
                },
                None,
            );
        }
        capability.promise()
    }
}

impl Index<Promise> for Agent {
    type Output = PromiseHeapData;

    fn index(&self, index: Promise) -> &Self::Output {
        self.heap
            .promises
            .get(index.get_index())
            .expect("Promise out of bounds")
    }
}

impl IndexMut<Promise> for Agent {
    fn index_mut(&mut self, index: Promise) -> &mut Self::Output {
        self.heap
            .promises
            .get_mut(index.get_index())
            .expect("Promise out of bounds")
    }
}

impl CreateHeapData<PromiseHeapData, Promise> for Heap {
    fn create(&mut self, data: PromiseHeapData) -> Promise {
        self.promises.push(data);
        Promise(self.promises.len() as u32 - 1)
    }
}
