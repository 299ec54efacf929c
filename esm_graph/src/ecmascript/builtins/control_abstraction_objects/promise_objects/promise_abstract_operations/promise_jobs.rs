// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.2 Promise Jobs](https://tc39.es/ecma262/#sec-promise-jobs)

use crate::ecmascript::{
    builtins::{module::get_module_namespace, promise::Promise},
    execution::{
        Agent, JsError, JsResult,
        agent::{InnerJob, Job},
    },
    scripts_and_modules::module::module_semantics::cyclic_module_records::{
        async_module_execution_fulfilled, async_module_execution_rejected,
        continue_module_execution,
    },
    types::Value,
};

use super::{
    promise_capability_records::PromiseCapability,
    promise_reaction_records::{PromiseReaction, PromiseReactionHandler, PromiseReactionType},
};

#[derive(Debug)]
pub(crate) struct PromiseResolveThenableJob {
    promise_to_resolve: Promise,
    thenable: Promise,
}
impl PromiseResolveThenableJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self {
            promise_to_resolve,
            thenable,
        } = self;
        // The following are substeps of point 1 in NewPromiseResolveThenableJob.
        // a. Let resolvingFunctions be CreateResolvingFunctions(promiseToResolve).
        let promise_capability = PromiseCapability::from_promise(promise_to_resolve, false);
        // b. Let thenCallResult be Completion(HostCallJobCallback(then, thenable, « resolvingFunctions.[[Resolve]], resolvingFunctions.[[Reject]] »)).
        // NOTE: The thenable is always a built-in promise, and calling its
        // "then" with the resolving functions is PerformPromiseThen with an
        // empty handler.
        thenable.perform_then(
            agent,
            PromiseReactionHandler::Empty,
            Some(promise_capability),
        );
        // c. If thenCallResult is an abrupt completion, then
        // d. Return ? thenCallResult.
        Ok(())
    }
}

/// ### [27.2.2.2 NewPromiseResolveThenableJob ( promiseToResolve, thenable, then )](https://tc39.es/ecma262/#sec-newpromiseresolvethenablejob)
pub(crate) fn new_promise_resolve_thenable_job(promise_to_resolve: Promise, thenable: Promise) -> Job {
    // 6. Return the Record { [[Job]]: job, [[Realm]]: thenRealm }.
    Job {
        inner: InnerJob::PromiseResolveThenable(PromiseResolveThenableJob {
            promise_to_resolve,
            thenable,
        }),
    }
}

#[derive(Debug)]
pub(crate) struct PromiseReactionJob {
    reaction: PromiseReaction,
    reaction_type: PromiseReactionType,
    argument: Value,
}
impl PromiseReactionJob {
    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let Self {
            reaction,
            reaction_type,
            argument,
        } = self;
        let reaction = reaction.take(agent);
        let settlement = match reaction_type {
            PromiseReactionType::Fulfill => Ok(argument),
            PromiseReactionType::Reject => Err(JsError::new(argument)),
        };
        // The following are substeps of point 1 in NewPromiseReactionJob.
        let handler_result = match reaction.handler {
            // d. If handler is empty, then
            // i. If type is fulfill, then
            //   1. Let handlerResult be NormalCompletion(argument).
            // ii. Else,
            //   1. Let handlerResult be ThrowCompletion(argument).
            PromiseReactionHandler::Empty => settlement,
            // e.1. Let handlerResult be Completion(HostCallJobCallback(handler, undefined, « argument »)).
            PromiseReactionHandler::Host(callback) => callback(agent, settlement),
            PromiseReactionHandler::AsyncModule(module) => {
                match settlement {
                    Ok(_) => async_module_execution_fulfilled(agent, module),
                    Err(error) => async_module_execution_rejected(agent, module, error.into_value()),
                }
                Ok(Value::Undefined)
            }
            PromiseReactionHandler::ModuleContinuation {
                module,
                capability,
                continuation,
            } => {
                let execution = continuation.resume(agent, settlement);
                continue_module_execution(agent, module, capability, execution);
                Ok(Value::Undefined)
            }
            PromiseReactionHandler::DynamicImport(module) => settlement.and_then(|_| {
                // 6.b. Let namespace be GetModuleNamespace(module).
                let namespace = get_module_namespace(agent, module)?;
                // 6.c. Perform ! Call(promiseCapability.[[Resolve]], undefined, « namespace »).
                Ok(Value::Module(namespace))
            }),
            PromiseReactionHandler::PromiseAll { record, index } => {
                match settlement {
                    Ok(value) => record.on_promise_fulfilled(agent, index, value),
                    Err(error) => record.on_promise_rejected(agent, error.into_value()),
                }
                Ok(Value::Undefined)
            }
        };

        // f. If promiseCapability is undefined, then
        let Some(promise_capability) = reaction.capability else {
            // i. Assert: handlerResult is not an abrupt completion.
            // ii. Return empty.
            return handler_result.map(|_| ());
        };
        match handler_result {
            // h. If handlerResult is an abrupt completion, then
            Err(err) => {
                // i. Return ? Call(promiseCapability.[[Reject]], undefined, « handlerResult.[[Value]] »).
                promise_capability.reject(agent, err.into_value())
            }
            // i. Else,
            Ok(value) => {
                // i. Return ? Call(promiseCapability.[[Resolve]], undefined, « handlerResult.[[Value]] »).
                promise_capability.resolve(agent, value)
            }
        };
        Ok(())
    }
}

/// ### [27.2.2.1 NewPromiseReactionJob ( reaction, argument )](https://tc39.es/ecma262/#sec-newpromisereactionjob)
pub(crate) fn new_promise_reaction_job(
    reaction: PromiseReaction,
    reaction_type: PromiseReactionType,
    argument: Value,
) -> Job {
    // 4. Return the Record { [[Job]]: job, [[Realm]]: handlerRealm }.
    Job {
        inner: InnerJob::PromiseReaction(PromiseReactionJob {
            reaction,
            reaction_type,
            argument,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque, rc::Rc};

    use crate::ecmascript::{
        builtins::{PromiseCapability, promise::Promise},
        execution::{
            Agent, DefaultHostHooks, JsError, Options,
            agent::ExceptionType,
        },
        types::Value,
    };
    use crate::engine::NoopInterpreter;

    fn agent() -> (Agent, Rc<DefaultHostHooks>) {
        let hooks = Rc::new(DefaultHostHooks::default());
        let agent = Agent::new(Options::default(), hooks.clone(), Rc::new(NoopInterpreter));
        (agent, hooks)
    }

    #[test]
    fn reactions_run_as_jobs() {
        let (mut agent, hooks) = agent();
        let seen = Rc::new(RefCell::new(VecDeque::new()));
        let capability = PromiseCapability::new(&mut agent);
        let log = seen.clone();
        let derived = capability.promise().then(&mut agent, move |_, result| {
            log.borrow_mut().push_back(result.clone());
            result
        });
        capability.resolve(&mut agent, 3.into());
        assert!(seen.borrow().is_empty());
        assert!(derived.is_pending(&agent));
        hooks.run_jobs(&mut agent).unwrap();
        assert_eq!(seen.borrow().front(), Some(&Ok(Value::Number(3.0))));
        assert_eq!(derived.try_get_result(&agent), Some(Ok(Value::Number(3.0))));
    }

    #[test]
    fn resolving_with_a_promise_adopts_its_state() {
        let (mut agent, hooks) = agent();
        let inner = PromiseCapability::new(&mut agent);
        let outer = PromiseCapability::new(&mut agent);
        outer.resolve(&mut agent, inner.promise().into());
        // Resolved but not settled: later resolutions are ignored.
        outer.resolve(&mut agent, 1.into());
        hooks.run_jobs(&mut agent).unwrap();
        assert!(outer.promise().is_pending(&agent));
        let error = agent.throw_exception_with_static_message(ExceptionType::Error, "boom");
        inner.reject(&mut agent, error.value().clone());
        hooks.run_jobs(&mut agent).unwrap();
        assert_eq!(outer.promise().try_get_result(&agent), Some(Err(error)));
    }

    #[test]
    fn self_resolution_is_a_type_error() {
        let (mut agent, _hooks) = agent();
        let capability = PromiseCapability::new(&mut agent);
        capability.resolve(&mut agent, capability.promise().into());
        let Some(Err(error)) = capability.promise().try_get_result(&agent) else {
            panic!("expected a rejection");
        };
        let Value::Error(error) = error.into_value() else {
            panic!("expected an error object");
        };
        assert_eq!(error.kind(&agent), ExceptionType::TypeError);
    }

    #[test]
    fn all_keeps_input_order() {
        let (mut agent, hooks) = agent();
        let first = PromiseCapability::new(&mut agent);
        let second = Promise::new_resolved(&mut agent, "second".into());
        let all = Promise::all(&mut agent, &[first.promise(), second]);
        hooks.run_jobs(&mut agent).unwrap();
        assert!(all.is_pending(&agent));
        first.resolve(&mut agent, "first".into());
        hooks.run_jobs(&mut agent).unwrap();
        let Some(Ok(Value::Object(values))) = all.try_get_result(&agent) else {
            panic!("expected a fulfilled array");
        };
        assert_eq!(values.get(&agent, "0"), Value::from("first"));
        assert_eq!(values.get(&agent, "1"), Value::from("second"));
        assert_eq!(values.get(&agent, "length"), Value::Number(2.0));
    }

    #[test]
    fn all_rejects_with_first_rejection() {
        let (mut agent, hooks) = agent();
        let pending = PromiseCapability::new(&mut agent);
        let rejected = Promise::new_rejected(&mut agent, "nope".into());
        let all = Promise::all(&mut agent, &[pending.promise(), rejected]);
        hooks.run_jobs(&mut agent).unwrap();
        assert_eq!(
            all.try_get_result(&agent),
            Some(Err(JsError::new("nope".into())))
        );
        pending.reject(&mut agent, "late".into());
        hooks.run_jobs(&mut agent).unwrap();
        assert_eq!(
            all.try_get_result(&agent),
            Some(Err(JsError::new("nope".into())))
        );
    }

    #[test]
    fn empty_all_fulfils_immediately() {
        let (mut agent, _hooks) = agent();
        let all = Promise::all(&mut agent, &[]);
        let Some(Ok(Value::Object(values))) = all.try_get_result(&agent) else {
            panic!("expected a fulfilled array");
        };
        assert_eq!(values.get(&agent, "length"), Value::Number(0.0));
    }

    #[test]
    fn rejection_tracker_sees_reject_then_handle() {
        let (mut agent, hooks) = agent();
        let rejected = Promise::new_rejected(&mut agent, Value::Null);
        assert_eq!(hooks.unhandled_rejections(), vec![rejected]);
        rejected.then(&mut agent, |_, _| Ok(Value::Undefined));
        assert!(hooks.unhandled_rejections().is_empty());
        hooks.run_jobs(&mut agent).unwrap();
    }
}
