// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [27.2.1.1 PromiseCapability Records](https://tc39.es/ecma262/#sec-promisecapability-records)

use crate::{
    ecmascript::{
        builtins::promise::{Promise, PromiseHeapData, PromiseState},
        execution::{
            Agent, JsResult,
            agent::{ExceptionType, PromiseRejectionTrackerOperation},
        },
        types::Value,
    },
    heap::CreateHeapData,
};

use super::{
    promise_jobs::{new_promise_reaction_job, new_promise_resolve_thenable_job},
    promise_reaction_records::{PromiseReaction, PromiseReactionType},
};

/// A promise capability encapsulates a promise, adding methods that are capable
/// of resolving or rejecting that promise.
///
/// NOTE: In ECMA-262, promise capability records contain an object that is
/// usable as a promise, together with its resolve and reject functions. Only
/// built-in promises exist here, so the resolve and reject functions are
/// the methods of this record.
///
/// The `must_be_unresolved` boolean is used to map the `AlreadyResolved` state
/// of a pair of resolve/reject functions with the promise state. If
/// `must_be_unresolved` is false, the promise counts as already resolved if its
/// state is Fulfilled or Rejected. If true, it also counts as already resolved
/// if it's Pending but `is_resolved` is set to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PromiseCapability {
    pub(crate) promise: Promise,
    pub(crate) must_be_unresolved: bool,
}

impl PromiseCapability {
    ///### [27.2.1.5 NewPromiseCapability ( C )](https://tc39.es/ecma262/#sec-newpromisecapability)
    ///
    /// NOTE: Our implementation doesn't take C as a parameter, since
    /// promise subclassing does not exist here.
    pub fn new(agent: &mut Agent) -> Self {
        Self::from_promise(agent.heap.create(PromiseHeapData::default()), true)
    }

    pub fn from_promise(promise: Promise, must_be_unresolved: bool) -> Self {
        Self {
            promise,
            must_be_unresolved,
        }
    }

    pub fn promise(&self) -> Promise {
        self.promise
    }

    fn is_already_resolved(&self, agent: &Agent) -> bool {
        // If `self.must_be_unresolved` is true, then `alreadyResolved`
        // corresponds with the `is_resolved` flag in PromiseState::Pending.
        // Otherwise, it corresponds to `promise_state` not being Pending.
        match agent[self.promise].promise_state {
            PromiseState::Pending { is_resolved, .. } => {
                if self.must_be_unresolved {
                    is_resolved
                } else {
                    false
                }
            }
            _ => true,
        }
    }

    ///### [27.2.1.4 FulfillPromise ( promise, value )](https://tc39.es/ecma262/#sec-fulfillpromise)
    pub(crate) fn internal_fulfill(&self, agent: &mut Agent, value: Value) {
        // 1. Assert: The value of promise.[[PromiseState]] is pending.
        // 2. Let reactions be promise.[[PromiseFulfillReactions]].
        let promise_state = &mut agent[self.promise].promise_state;
        let reactions = match promise_state {
            PromiseState::Pending { reactions, .. } => std::mem::take(reactions),
            _ => unreachable!(),
        };
        // 3. Set promise.[[PromiseResult]] to value.
        // 4. Set promise.[[PromiseFulfillReactions]] to undefined.
        // 5. Set promise.[[PromiseRejectReactions]] to undefined.
        // 6. Set promise.[[PromiseState]] to FULFILLED.
        *promise_state = PromiseState::Fulfilled {
            promise_result: value.clone(),
        };
        // 7. Perform TriggerPromiseReactions(reactions, value)
        trigger_promise_reactions(agent, reactions, PromiseReactionType::Fulfill, value);
    }

    ///### [27.2.1.7 RejectPromise ( promise, reason )](https://tc39.es/ecma262/#sec-rejectpromise)
    fn internal_reject(&self, agent: &mut Agent, reason: Value) {
        // 1. Assert: The value of promise.[[PromiseState]] is pending.
        // 2. Let reactions be promise.[[PromiseRejectReactions]].
        let promise_state = &mut agent[self.promise].promise_state;
        let reactions = match promise_state {
            PromiseState::Pending { reactions, .. } => std::mem::take(reactions),
            _ => unreachable!(),
        };
        // 3. Set promise.[[PromiseResult]] to reason.
        // 4. Set promise.[[PromiseFulfillReactions]] to undefined.
        // 5. Set promise.[[PromiseRejectReactions]] to undefined.
        // 6. Set promise.[[PromiseState]] to REJECTED.
        // NOTE: [[PromiseIsHandled]] for pending promises corresponds to
        // whether [[PromiseRejectReactions]] is not empty.
        let is_handled = !reactions.is_empty();
        *promise_state = PromiseState::Rejected {
            promise_result: reason.clone(),
            is_handled,
        };

        // 7. If promise.[[PromiseIsHandled]] is false, perform HostPromiseRejectionTracker(promise, "reject").
        if !is_handled {
            agent
                .host_hooks
                .host_promise_rejection_tracker(self.promise, PromiseRejectionTrackerOperation::Reject);
        }

        // 8. Perform TriggerPromiseReactions(reactions, reason)
        trigger_promise_reactions(agent, reactions, PromiseReactionType::Reject, reason);
    }

    ///### [27.2.1.3.2 Promise Resolve Functions](https://tc39.es/ecma262/#sec-promise-resolve-functions)
    pub fn resolve(self, agent: &mut Agent, resolution: Value) {
        // 1. Let F be the active function object.
        // 2. Assert: F has a [[Promise]] internal slot whose value is an Object.
        // 3. Let promise be F.[[Promise]].
        // 4. Let alreadyResolved be F.[[AlreadyResolved]].
        // 5. If alreadyResolved.[[Value]] is true, return undefined.
        if self.is_already_resolved(agent) {
            return;
        }
        let promise = self.promise;
        // 6. Set alreadyResolved.[[Value]] to true.
        promise.set_already_resolved(agent);

        // 7. If SameValue(resolution, promise) is true, then
        if resolution == Value::Promise(promise) {
            // a. Let selfResolutionError be a newly created TypeError object.
            // b. Perform RejectPromise(promise, selfResolutionError).
            let exception = agent
                .throw_exception_with_static_message(
                    ExceptionType::TypeError,
                    "Tried to resolve a promise with itself.",
                )
                .into_value();
            self.internal_reject(agent, exception);
            // c. Return undefined.
            return;
        }

        // 8. If resolution is not an Object, then
        // 12. If IsCallable(thenAction) is false, then
        // NOTE: Promises are the only objects with a callable "then".
        let Value::Promise(thenable) = resolution else {
            // a. Perform FulfillPromise(promise, resolution).
            self.internal_fulfill(agent, resolution);
            // b. Return undefined.
            return;
        };

        // 13. Let thenJobCallback be HostMakeJobCallback(thenAction).
        // 14. Let job be NewPromiseResolveThenableJob(promise, resolution, thenJobCallback).
        let job = new_promise_resolve_thenable_job(promise, thenable);
        // 15. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        agent.host_hooks.enqueue_promise_job(job);
        // 16. Return undefined.
    }

    ///### [27.2.1.3.1 Promise Reject Functions](https://tc39.es/ecma262/#sec-promise-reject-functions)
    pub fn reject(self, agent: &mut Agent, reason: Value) {
        // 1. Let F be the active function object.
        // 2. Assert: F has a [[Promise]] internal slot whose value is an Object.
        // 3. Let promise be F.[[Promise]].
        // 4. Let alreadyResolved be F.[[AlreadyResolved]].
        // 5. If alreadyResolved.[[Value]] is true, return undefined.
        if self.is_already_resolved(agent) {
            return;
        }

        // 7. Perform RejectPromise(promise, reason).
        self.internal_reject(agent, reason);

        // 6. Set alreadyResolved.[[Value]] to true.
        debug_assert!(matches!(
            agent[self.promise].promise_state,
            PromiseState::Rejected { .. }
        ));
    }
}

/// ### [27.2.1.8 TriggerPromiseReactions ( reactions, argument )](https://tc39.es/ecma262/#sec-triggerpromisereactions)
fn trigger_promise_reactions(
    agent: &mut Agent,
    reactions: Vec<PromiseReaction>,
    reaction_type: PromiseReactionType,
    argument: Value,
) {
    // 1. For each element reaction of reactions, do
    for reaction in reactions {
        // a. Let job be NewPromiseReactionJob(reaction, argument).
        let job = new_promise_reaction_job(reaction, reaction_type, argument.clone());
        // b. Perform HostEnqueuePromiseJob(job.[[Job]], job.[[Realm]]).
        agent.host_hooks.enqueue_promise_job(job);
    }
    // 2. Return unused.
}

/// ### [27.2.1.1.1 IfAbruptRejectPromise ( value, capability )](https://tc39.es/ecma262/#sec-ifabruptrejectpromise)
///
/// IfAbruptRejectPromise is a shorthand for a sequence of algorithm steps that
/// use a PromiseCapability Record. An algorithm step of the form:
///
/// ```text
/// 1. IfAbruptRejectPromise(value, capability).
/// ```
///
/// means the same thing as:
/// ```text
/// 1. Assert: value is a Completion Record.
/// 2. If value is an abrupt completion, then
///     a. Perform ? Call(capability.[[Reject]], undefined, « value.[[Value]] »).
///     b. Return capability.[[Promise]].
/// 3. Else,
///     a. Set value to ! value.
/// ```
#[inline(always)]
pub(crate) fn if_abrupt_reject_promise<T>(
    agent: &mut Agent,
    value: JsResult<T>,
    capability: PromiseCapability,
) -> Result<T, Promise> {
    value.map_err(|err| {
        capability.reject(agent, err.into_value());

        // Note: We return an error here so that caller gets to call this
        // function with the ? operator
        capability.promise()
    })
}
