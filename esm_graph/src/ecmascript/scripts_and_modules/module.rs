// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2 Modules](https://tc39.es/ecma262/#sec-modules)
//!
//! Dynamic `import()` and `import.meta`.
//!
//! A dynamic import is split in two halves. [`evaluate_import_call`] creates
//! the result promise and hands the request to the host together with a
//! [`DynamicImportTicket`]. The host loads the module however it likes,
//! possibly on another thread, and then calls [`finish_dynamic_import`] on
//! the agent's thread with the ticket and the loaded module.

pub mod module_semantics;

use tracing::{debug, warn};

use crate::{
    ecmascript::{
        abstract_operations::type_conversion::to_string,
        builtins::{
            control_abstraction_objects::promise_objects::promise_abstract_operations::{
                promise_capability_records::{PromiseCapability, if_abrupt_reject_promise},
                promise_reaction_records::PromiseReactionHandler,
            },
            ordinary::OrdinaryObject,
            promise::Promise,
        },
        execution::{Agent, JsResult},
        scripts_and_modules::ScriptOrModule,
        types::{JsString, Value},
    },
    heap::{CreateHeapData, Heap},
};

use module_semantics::Module;

/// A pending dynamic import.
///
/// The ticket is a plain index: it can be sent to another thread, and it is
/// redeemed exactly once through [`finish_dynamic_import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DynamicImportTicket(u32);

#[derive(Debug)]
pub(crate) struct DynamicImportRecord {
    referrer: ScriptOrModule,
    specifier: JsString,
    capability: PromiseCapability,
}

impl DynamicImportTicket {
    pub(crate) const fn get_index(self) -> usize {
        self.0 as usize
    }

    /// The script or module that called `import()`, if the import is still
    /// pending.
    pub fn referrer(self, agent: &Agent) -> Option<ScriptOrModule> {
        self.record(agent).map(|record| record.referrer)
    }

    /// The requested specifier, if the import is still pending.
    pub fn specifier(self, agent: &Agent) -> Option<&JsString> {
        self.record(agent).map(|record| &record.specifier)
    }

    /// The promise returned by the `import()` call, if the import is still
    /// pending.
    pub fn promise(self, agent: &Agent) -> Option<Promise> {
        self.record(agent).map(|record| record.capability.promise())
    }

    fn record(self, agent: &Agent) -> Option<&DynamicImportRecord> {
        agent
            .heap
            .dynamic_imports
            .get(self.get_index())
            .and_then(Option::as_ref)
    }
}

impl CreateHeapData<DynamicImportRecord, DynamicImportTicket> for Heap {
    fn create(&mut self, data: DynamicImportRecord) -> DynamicImportTicket {
        self.dynamic_imports.push(Some(data));
        DynamicImportTicket(self.dynamic_imports.len() as u32 - 1)
    }
}

/// ### [13.3.10.1 EvaluateImportCall ( specifierExpression \[ , optionsExpression \] )](https://tc39.es/ecma262/#sec-evaluate-import-call)
///
/// Starts a dynamic import of `specifier` on behalf of `referrer` and
/// returns the promise of the `import()` expression. The promise fulfils
/// with the namespace of the imported module once it has been loaded,
/// linked and evaluated.
pub fn evaluate_import_call(agent: &mut Agent, referrer: ScriptOrModule, specifier: Value) -> Promise {
    // 1. Let referrer be GetActiveScriptOrModule().
    // 2. If referrer is null, set referrer to the current Realm Record.
    // 3. Let specRef be ? Evaluation of specifierExpression.
    // 4. Let specifier be ? GetValue(specRef).
    // 7. Let promiseCapability be ! NewPromiseCapability(%Promise%).
    let promise_capability = PromiseCapability::new(agent);
    // 8. Let specifierString be Completion(ToString(specifier)).
    let specifier_string = to_string(agent, &specifier);
    // 9. IfAbruptRejectPromise(specifierString, promiseCapability).
    let specifier_string = match if_abrupt_reject_promise(agent, specifier_string, promise_capability) {
        Ok(specifier_string) => specifier_string,
        Err(promise) => return promise,
    };
    // 13. Let moduleRequest be a new ModuleRequest Record {
    //     [[Specifier]]: specifierString, [[Attributes]]: attributes }.
    let ticket = agent.heap.create(DynamicImportRecord {
        referrer,
        specifier: specifier_string.clone(),
        capability: promise_capability,
    });
    debug!(
        ticket = ticket.get_index(),
        specifier = specifier_string.as_str(),
        "dynamic import requested"
    );
    // 14. If referrer is a Cyclic Module Record and moduleRequest is
    //     already loaded, then ...
    // 15. Else, perform HostLoadImportedModule(referrer, moduleRequest,
    //     empty, promiseCapability).
    let host_hooks = agent.host_hooks();
    host_hooks.host_import_module_dynamically(agent, referrer, specifier_string, ticket);
    // 16. Return promiseCapability.[[Promise]].
    promise_capability.promise()
}

/// ### [16.2.1.11 ContinueDynamicImport ( promiseCapability, moduleCompletion )](https://tc39.es/ecma262/#sec-ContinueDynamicImport)
///
/// Completes a dynamic import started by [`evaluate_import_call`]. On
/// success the module is linked and evaluated, and the `import()` promise
/// fulfils with its namespace once evaluation finishes. A ticket can only
/// be redeemed once: later completions are ignored.
pub fn finish_dynamic_import(
    agent: &mut Agent,
    ticket: DynamicImportTicket,
    module_completion: JsResult<Module>,
) {
    let Some(DynamicImportRecord {
        capability: promise_capability,
        specifier,
        ..
    }) = agent
        .heap
        .dynamic_imports
        .get_mut(ticket.get_index())
        .and_then(Option::take)
    else {
        warn!(
            ticket = ticket.get_index(),
            "dynamic import ticket completed more than once"
        );
        return;
    };
    // 1. If moduleCompletion is an abrupt completion, then
    let module = match module_completion {
        Err(err) => {
            debug!(specifier = specifier.as_str(), "dynamic import failed to load");
            // a. Perform ! Call(promiseCapability.[[Reject]], undefined,
            //    « moduleCompletion.[[Value]] »).
            promise_capability.reject(agent, err.into_value());
            // b. Return unused.
            return;
        }
        // 2. Let module be moduleCompletion.[[Value]].
        Ok(module) => module,
    };
    // 3. Let loadPromise be module.LoadRequestedModules().
    // NOTE: The host resolves module requests on demand; loading happens
    // as part of Link().
    // 6. Let linkAndEvaluateClosure be a new Abstract Closure with no
    //    parameters that captures module, promiseCapability, and onRejected
    //    and performs the following steps when called:
    //   a. Let link be Completion(module.Link()).
    if let Err(err) = module.link(agent) {
        debug!(specifier = specifier.as_str(), "dynamic import failed to link: {err}");
        //   b. If link is an abrupt completion, then
        //     i. Perform ! Call(promiseCapability.[[Reject]], undefined,
        //        « link.[[Value]] »).
        let error = err.into_js_error(agent);
        promise_capability.reject(agent, error.into_value());
        //     ii. Return NormalCompletion(undefined).
        return;
    }
    //   c. Let evaluatePromise be module.Evaluate().
    let evaluate_promise = module.evaluate(agent);
    //   d. Let fulfilledClosure be a new Abstract Closure with no parameters
    //      that captures module and promiseCapability and performs the
    //      following steps when called:
    //     i. Let namespace be GetModuleNamespace(module).
    //     ii. Perform ! Call(promiseCapability.[[Resolve]], undefined,
    //         « namespace »).
    //     iii. Return NormalCompletion(undefined).
    //   e. Let onFulfilled be CreateBuiltinFunction(fulfilledClosure, 0, "", « »).
    //   f. Perform PerformPromiseThen(evaluatePromise, onFulfilled, onRejected).
    evaluate_promise.perform_then(
        agent,
        PromiseReactionHandler::DynamicImport(module),
        Some(promise_capability),
    );
    //   g. Return unused.
}

/// Job queued by the default `HostImportModuleDynamically`: resolves the
/// specifier through the host and finishes the import.
#[derive(Debug)]
pub(crate) struct FinishDynamicImportJob {
    referrer: ScriptOrModule,
    specifier: JsString,
    ticket: DynamicImportTicket,
}

impl FinishDynamicImportJob {
    pub(crate) fn new(referrer: ScriptOrModule, specifier: JsString, ticket: DynamicImportTicket) -> Self {
        Self {
            referrer,
            specifier,
            ticket,
        }
    }

    pub(crate) fn run(self, agent: &mut Agent) -> JsResult<()> {
        let host_hooks = agent.host_hooks();
        let module = host_hooks.host_resolve_imported_module(agent, self.referrer, &self.specifier);
        finish_dynamic_import(agent, self.ticket, module);
        Ok(())
    }
}

/// ### [13.3.12.1 Runtime Semantics: Evaluation](https://tc39.es/ecma262/#sec-meta-properties-runtime-semantics-evaluation)
///
/// `ImportMeta : import . meta`
///
/// Each module has its own `import.meta` object, created on first access.
pub fn get_import_meta(agent: &mut Agent, module: Module) -> OrdinaryObject {
    // 1. Let module be GetActiveScriptOrModule().
    // 2. Assert: module is a Source Text Module Record.
    // 3. Let importMeta be module.[[ImportMeta]].
    // 5. Else,
    if let Some(import_meta) = agent[module].import_meta {
        // a. Assert: importMeta is an Object.
        // b. Return importMeta.
        return import_meta;
    }
    // 4. If importMeta is empty, then
    //   a. Set importMeta to OrdinaryObjectCreate(null).
    let import_meta = OrdinaryObject::create(agent);
    //   b. Let importMetaValues be HostGetImportMetaProperties(module).
    let host_hooks = agent.host_hooks();
    let import_meta_values = host_hooks.host_get_import_meta_properties(agent, module);
    //   c. For each Record { [[Key]], [[Value]] } p of importMetaValues, do
    for (key, value) in import_meta_values {
        //   i. Perform ! CreateDataPropertyOrThrow(importMeta, p.[[Key]], p.[[Value]]).
        import_meta.create_data_property(agent, key, value);
    }
    //   d. Perform HostFinalizeImportMeta(importMeta, module).
    host_hooks.host_finalize_import_meta(agent, import_meta, module);
    //   e. Set module.[[ImportMeta]] to importMeta.
    agent[module].import_meta = Some(import_meta);
    //   f. Return importMeta.
    import_meta
}
