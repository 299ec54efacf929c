// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.6 Cyclic Module Records](https://tc39.es/ecma262/#sec-cyclic-module-records)

use std::{fmt::Debug, rc::Rc};

use tracing::{debug, info, trace};

use crate::{
    ecmascript::{
        builtins::{
            control_abstraction_objects::promise_objects::promise_abstract_operations::{
                promise_capability_records::PromiseCapability,
                promise_reaction_records::PromiseReactionHandler,
            },
            promise::Promise,
        },
        execution::{Agent, JsError, JsResult, agent::ExceptionType},
        types::{JsString, Value},
    },
    engine::{ModuleExecution, ModuleContinuation},
};

use super::{
    Module, ModuleKind, ModuleStatus,
    abstract_module_records::{ModuleError, ResolveSet, ResolvedBinding},
    get_imported_module, source_text_module_records,
};

/// ### \[\[AsyncEvaluationOrder\]\]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AsyncEvaluationOrder {
    /// Fully synchronous modules stay unset.
    #[default]
    Unset,
    /// Queue position of a module that is asynchronous or has asynchronous
    /// dependencies.
    Order(u32),
    /// The pending module has been executed.
    Done,
}

#[derive(Debug)]
pub(crate) struct CyclicModuleRecord {
    /// ### \[\[Status\]\]
    status: ModuleStatus,
    /// ### \[\[EvaluationError\]\]
    ///
    /// A throw completion representing the exception that occurred during
    /// evaluation. `None` if no exception occurred or if \[\[Status\]\] is
    /// not evaluated.
    evaluation_error: Option<JsError>,
    /// ### \[\[DFSIndex\]\]
    ///
    /// Auxiliary field used during Link and Evaluate only. If \[\[Status\]\]
    /// is either linking or evaluating, this non-negative number records the
    /// point at which the module was first visited during the depth-first
    /// traversal of the dependency graph.
    dfs_index: Option<u32>,
    /// ### \[\[DFSAncestorIndex\]\]
    ///
    /// Auxiliary field used during Link and Evaluate only. If \[\[Status\]\]
    /// is either linking or evaluating, this is either the module's own
    /// \[\[DFSIndex\]\] or that of an "earlier" module in the same strongly
    /// connected component.
    dfs_ancestor_index: Option<u32>,
    /// ### \[\[RequestedModules\]\]
    ///
    /// The module specifiers imported by this module, in source text
    /// occurrence order.
    requested_modules: Box<[JsString]>,
    /// ### \[\[CycleRoot\]\]
    ///
    /// The first visited module of the cycle, the root DFS ancestor of the
    /// strongly connected component. For a module not in a cycle, this would
    /// be the module itself. Once Evaluate has completed, a module's
    /// \[\[DFSAncestorIndex\]\] is the \[\[DFSIndex\]\] of its
    /// \[\[CycleRoot\]\].
    cycle_root: Option<Module>,
    /// ### \[\[HasTLA\]\]
    ///
    /// Whether this module is individually asynchronous. Having an
    /// asynchronous dependency does not mean this field is true.
    has_tla: bool,
    /// ### \[\[AsyncEvaluationOrder\]\]
    async_evaluation_order: AsyncEvaluationOrder,
    /// ### \[\[TopLevelCapability\]\]
    ///
    /// If this module is the \[\[CycleRoot\]\] of some cycle, and Evaluate()
    /// was called on some module in that cycle, this field contains the
    /// PromiseCapability Record for that entire evaluation.
    top_level_capability: Option<PromiseCapability>,
    /// ### \[\[AsyncParentModules\]\]
    ///
    /// If this module or a dependency has \[\[HasTLA\]\] true, and execution
    /// is in progress, this tracks the parent importers of this module for
    /// the top-level execution job. These parent modules will not start
    /// executing before this module has successfully completed execution.
    async_parent_modules: Vec<Module>,
    /// ### \[\[PendingAsyncDependencies\]\]
    ///
    /// The number of asynchronous dependency modules remaining to execute
    /// for this module.
    pending_async_dependencies: Option<u32>,
}

impl CyclicModuleRecord {
    pub(crate) fn new(has_tla: bool, requested_modules: Box<[JsString]>) -> Self {
        Self {
            status: ModuleStatus::Unlinked,
            evaluation_error: None,
            dfs_index: None,
            dfs_ancestor_index: None,
            requested_modules,
            cycle_root: None,
            has_tla,
            async_evaluation_order: AsyncEvaluationOrder::Unset,
            top_level_capability: None,
            async_parent_modules: Vec::new(),
            pending_async_dependencies: None,
        }
    }

    pub(crate) fn status(&self) -> ModuleStatus {
        self.status
    }

    pub(crate) fn has_tla(&self) -> bool {
        self.has_tla
    }

    pub(crate) fn evaluation_error(&self) -> Option<&JsError> {
        self.evaluation_error.as_ref()
    }

    pub(crate) fn requested_modules(&self) -> &[JsString] {
        &self.requested_modules
    }

    pub(crate) fn cycle_root(&self) -> Option<Module> {
        self.cycle_root
    }

    /// Set \[\[DFSIndex\]\] and \[\[DFSAncestorIndex\]\] to index.
    fn set_dfs_index(&mut self, index: u32) {
        self.dfs_index = Some(index);
        self.dfs_ancestor_index = Some(index);
    }

    /// Set \[\[DFSAncestorIndex\]\] to min(\[\[DFSAncestorIndex\]\], index).
    fn lower_dfs_ancestor_index(&mut self, index: Option<u32>) {
        self.dfs_ancestor_index = match (self.dfs_ancestor_index, index) {
            (Some(own), Some(other)) => Some(own.min(other)),
            (own, other) => own.or(other),
        };
    }

    fn is_scc_root(&self) -> bool {
        debug_assert!(self.dfs_ancestor_index <= self.dfs_index);
        self.dfs_ancestor_index == self.dfs_index
    }

    /// Set \[\[EvaluationError\]\] to error and \[\[Status\]\] to evaluated.
    fn set_evaluation_error(&mut self, error: JsError) {
        debug_assert!(
            self.evaluation_error.is_none(),
            "Attempted to set module [[EvaluationError]] twice"
        );
        self.evaluation_error = Some(error);
        self.status = ModuleStatus::Evaluated;
    }
}

/// ### [Additional Abstract Methods of Cyclic Module Records](https://tc39.es/ecma262/#table-cyclic-module-methods)
///
/// Implemented by hosts for modules that take part in cycles and may use
/// top-level await, but are not ECMAScript source text: for example modules
/// compiled from another language. The module graph does the Link() and
/// Evaluate() bookkeeping; the host provides the bindings and the code.
pub trait CyclicModuleAbstractMethods: Debug {
    /// The module specifiers imported by the module, in order. Called once
    /// when the module is created.
    fn requested_modules(&self) -> Vec<JsString>;

    /// ### InitializeEnvironment()
    ///
    /// Resolve all imported bindings of the module. Called once all
    /// dependencies of the module are linking or linked.
    fn initialize_environment(&self, _agent: &mut Agent, _module: Module) -> JsResult<()> {
        Ok(())
    }

    /// Create the runnable instance of the module. Called right after
    /// [`initialize_environment`](CyclicModuleAbstractMethods::initialize_environment)
    /// succeeds. The instance is dropped if linking the graph fails.
    fn instantiate(&self, agent: &mut Agent, module: Module) -> JsResult<Rc<dyn CyclicModuleInstance>>;

    /// ### ResolveExport(exportName \[, resolveSet\])
    fn resolve_export(
        &self,
        agent: &mut Agent,
        module: Module,
        export_name: &JsString,
        resolve_set: &mut ResolveSet,
    ) -> JsResult<Option<ResolvedBinding>>;

    /// ### GetExportedNames(\[exportStarSet\])
    fn get_exported_names(&self, agent: &mut Agent, module: Module) -> Vec<JsString>;
}

/// A linked host cyclic module.
pub trait CyclicModuleInstance: Debug {
    /// ### \[\[HasTLA\]\]
    fn has_tla(&self) -> bool {
        false
    }

    /// ### ExecuteModule(\[promiseCapability\])
    ///
    /// Evaluate the module's code. Only a module with top-level await may
    /// return [`ModuleExecution::Await`].
    fn execute_module(&self, agent: &mut Agent, module: Module) -> JsResult<ModuleExecution>;

    /// Read the current value of one of the module's bindings.
    fn get_binding_value(&self, agent: &mut Agent, module: Module, name: &str) -> JsResult<Value>;
}

/// ### [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
pub(crate) fn link(agent: &mut Agent, module: Module) -> Result<(), ModuleError> {
    // 1. Assert: module.[[Status]] is one of unlinked, linked,
    //    evaluating-async, or evaluated.
    // 2. Let stack be a new empty List.
    let mut stack = Vec::new();
    let mut import_path = Vec::new();
    // 3. Let result be Completion(InnerModuleLinking(module, stack, 0)).
    let result = inner_module_linking(agent, module, &mut stack, &mut import_path, 0);
    // 4. If result is an abrupt completion, then
    if let Err(err) = result {
        debug!(
            module = module.get_index(),
            unlinked = stack.len(),
            "link failed: {err}"
        );
        // a. For each Cyclic Module Record m of stack, do
        for m in stack {
            // i. Assert: m.[[Status]] is linking.
            debug_assert_eq!(m.status(agent), ModuleStatus::Linking);
            // ii. Set m.[[Status]] to unlinked.
            let data = &mut agent[m];
            data.cyclic_mut().status = ModuleStatus::Unlinked;
            data.cyclic_mut().dfs_index = None;
            data.cyclic_mut().dfs_ancestor_index = None;
            match &mut data.kind {
                ModuleKind::SourceText(record) => record.environment = None,
                ModuleKind::HostCyclic { instance, .. } => *instance = None,
                ModuleKind::Leaf { .. } => unreachable!(),
            }
            trace!(module = m.get_index(), "linking -> unlinked");
        }
        // b. Assert: module.[[Status]] is unlinked.
        // c. Return ? result.
        return Err(err);
    }
    // 5. Assert: module.[[Status]] is one of linked, evaluating-async, or
    //    evaluated.
    // 6. Assert: stack is empty.
    debug_assert!(stack.is_empty());
    if agent.options.print_internals {
        print_module_internals(agent, "link");
    }
    // 7. Return unused.
    Ok(())
}

/// ### [16.2.1.6.1.1.1 InnerModuleLinking ( module, stack, index )](https://tc39.es/ecma262/#sec-InnerModuleLinking)
///
/// The abstract operation InnerModuleLinking takes arguments module (a Module
/// Record), stack (a List of Cyclic Module Records), and index (a
/// non-negative integer) and returns either a normal completion containing a
/// non-negative integer or a throw completion. It is used by Link to perform
/// the actual linking process for module, as well as recursively on all
/// other modules in the dependency graph. The stack and index parameters, as
/// well as a module's \[\[DFSIndex\]\] and \[\[DFSAncestorIndex\]\] fields,
/// keep track of the depth-first search (DFS) traversal. In particular,
/// \[\[DFSAncestorIndex\]\] is used to discover strongly connected
/// components (SCCs), such that all modules in an SCC transition to linked
/// together.
///
/// `import_path` holds the specifiers followed from the linked module down
/// to `module`.
fn inner_module_linking(
    agent: &mut Agent,
    module: Module,
    stack: &mut Vec<Module>,
    import_path: &mut Vec<JsString>,
    index: u32,
) -> Result<u32, ModuleError> {
    // 1. If module is not a Cyclic Module Record, then
    if !module.is_cyclic(agent) {
        // a. Perform ? module.Link().
        module
            .link(agent)
            .map_err(|err| err.with_import_path(import_path))?;
        // b. Return index.
        return Ok(index);
    }
    // 2. If module.[[Status]] is one of linking, linked, evaluating-async, or
    //    evaluated, then
    // NOTE: A module that is evaluating has been linked as well. This
    // happens when a module body dynamically imports one of its ancestors
    // and the host completes the import synchronously.
    if matches!(
        module.status(agent),
        ModuleStatus::Linking
            | ModuleStatus::Linked
            | ModuleStatus::Evaluating
            | ModuleStatus::EvaluatingAsync
            | ModuleStatus::Evaluated
    ) {
        // a. Return index.
        return Ok(index);
    }
    // 3. Assert: module.[[Status]] is unlinked.
    debug_assert_eq!(module.status(agent), ModuleStatus::Unlinked);
    let cyclic = agent[module].cyclic_mut();
    // 4. Set module.[[Status]] to linking.
    cyclic.status = ModuleStatus::Linking;
    // 5. Set module.[[DFSIndex]] to index.
    // 6. Set module.[[DFSAncestorIndex]] to index.
    cyclic.set_dfs_index(index);
    let requested_modules = cyclic.requested_modules.clone();
    trace!(module = module.get_index(), index, "unlinked -> linking");
    // 7. Set index to index + 1.
    let mut index = index + 1;
    // 8. Append module to stack.
    stack.push(module);
    // 9. For each ModuleRequest Record request of module.[[RequestedModules]], do
    for request in requested_modules.iter() {
        import_path.push(request.clone());
        // a. Let requiredModule be GetImportedModule(module, request).
        let required_module = get_imported_module(agent, module, request).map_err(|error| {
            ModuleError::Resolution {
                specifier: request.clone(),
                import_path: import_path.clone(),
                error,
            }
        })?;
        // b. Set index to ? InnerModuleLinking(requiredModule, stack, index).
        index = inner_module_linking(agent, required_module, stack, import_path, index)?;
        // c. If requiredModule is a Cyclic Module Record, then
        if required_module.is_cyclic(agent) {
            let required = agent[required_module].cyclic();
            // i. Assert: requiredModule.[[Status]] is one of linking, linked,
            //    evaluating-async, or evaluated.
            debug_assert_ne!(required.status, ModuleStatus::Unlinked);
            // ii. Assert: requiredModule.[[Status]] is linking if and only if
            //     stack contains requiredModule.
            debug_assert_eq!(
                required.status == ModuleStatus::Linking,
                stack.contains(&required_module)
            );
            // iii. If requiredModule.[[Status]] is linking, then
            if required.status == ModuleStatus::Linking {
                // 1. Set module.[[DFSAncestorIndex]] to
                //    min(module.[[DFSAncestorIndex]],
                //    requiredModule.[[DFSAncestorIndex]]).
                let required_ancestor_index = required.dfs_ancestor_index;
                agent[module]
                    .cyclic_mut()
                    .lower_dfs_ancestor_index(required_ancestor_index);
            }
        }
        import_path.pop();
    }
    // 10. Perform ? module.InitializeEnvironment().
    initialize_environment(agent, module, import_path)?;
    // 11. Assert: module occurs exactly once in stack.
    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    // 12. Assert: module.[[DFSAncestorIndex]] ≤ module.[[DFSIndex]].
    // 13. If module.[[DFSAncestorIndex]] = module.[[DFSIndex]], then
    if agent[module].cyclic().is_scc_root() {
        let mut component_size = 0;
        // a. Let done be false.
        // b. Repeat, while done is false,
        loop {
            // i. Let requiredModule be the last element of stack.
            // ii. Remove the last element of stack.
            let Some(required_module) = stack.pop() else {
                unreachable!("module must be in the stack");
            };
            component_size += 1;
            // iii. Assert: requiredModule is a Cyclic Module Record.
            // iv. Set requiredModule.[[Status]] to linked.
            agent[required_module].cyclic_mut().status = ModuleStatus::Linked;
            trace!(module = required_module.get_index(), "linking -> linked");
            // v. If requiredModule and module are the same Module Record,
            //    set done to true.
            if required_module == module {
                break;
            }
        }
        debug!(
            root = module.get_index(),
            size = component_size,
            "linked strongly connected component"
        );
    }
    // 14. Return index.
    Ok(index)
}

/// ### InitializeEnvironment()
///
/// Dispatch to the Cyclic Module Record's concrete method.
fn initialize_environment(
    agent: &mut Agent,
    module: Module,
    import_path: &[JsString],
) -> Result<(), ModuleError> {
    let methods = match &agent[module].kind {
        ModuleKind::SourceText(_) => {
            return source_text_module_records::initialize_environment(agent, module, import_path);
        }
        ModuleKind::HostCyclic { methods, .. } => methods.clone(),
        ModuleKind::Leaf { .. } => unreachable!(),
    };
    let instance = methods
        .initialize_environment(agent, module)
        .and_then(|()| methods.instantiate(agent, module))
        .map_err(|error| ModuleError::Link {
            import_path: import_path.to_vec(),
            error,
        })?;
    let has_tla = instance.has_tla();
    let data = &mut agent[module];
    data.cyclic_mut().has_tla = has_tla;
    if let ModuleKind::HostCyclic { instance: slot, .. } = &mut data.kind {
        *slot = Some(instance);
    }
    Ok(())
}

/// ### [16.2.1.6.1.2 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
///
/// The Evaluate concrete method of a Cyclic Module Record module takes no
/// arguments and returns a Promise. Evaluate transitions this module's
/// \[\[Status\]\] from linked to either evaluating-async or evaluated. The
/// first time it is called on a module in a given strongly connected
/// component, Evaluate creates and returns a Promise which resolves when the
/// module has finished evaluating. This Promise is stored in the
/// \[\[TopLevelCapability\]\] field of the \[\[CycleRoot\]\] for the
/// component. Future invocations of Evaluate on any module in the component
/// return the same Promise.
pub(crate) fn evaluate(agent: &mut Agent, module: Module) -> Promise {
    // 1. Assert: This call to Evaluate is not happening at the same time as
    //    another call to Evaluate within the surrounding agent.
    // 2. Assert: module.[[Status]] is one of linked, evaluating-async, or
    //    evaluated.
    let status = module.status(agent);
    let message = match status {
        ModuleStatus::Unlinked | ModuleStatus::Linking => {
            Some("Module must be linked before it can be evaluated")
        }
        ModuleStatus::Evaluating => Some("Module is already being evaluated"),
        _ => None,
    };
    if let Some(message) = message {
        let error = agent.create_exception(ExceptionType::TypeError, message.to_string());
        return Promise::new_rejected(agent, error);
    }
    // 3. If module.[[Status]] is either evaluating-async or evaluated, set
    //    module to module.[[CycleRoot]].
    // NOTE: A module whose evaluation threw before its component finished
    // has no cycle root. It answers for itself.
    let module = if matches!(
        status,
        ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ) {
        agent[module].cyclic().cycle_root.unwrap_or(module)
    } else {
        module
    };
    // 4. If module.[[TopLevelCapability]] is not empty, then
    if let Some(capability) = agent[module].cyclic().top_level_capability {
        // a. Return module.[[TopLevelCapability]].[[Promise]].
        return capability.promise();
    }
    debug!(module = module.get_index(), "evaluating module graph");
    // 5. Let stack be a new empty List.
    let mut stack = Vec::new();
    // 6. Let capability be ! NewPromiseCapability(%Promise%).
    let capability = PromiseCapability::new(agent);
    // 7. Set module.[[TopLevelCapability]] to capability.
    agent[module].cyclic_mut().top_level_capability = Some(capability);
    // 8. Let result be Completion(InnerModuleEvaluation(module, stack, 0)).
    let result = inner_module_evaluation(agent, module, &mut stack, 0);
    match result {
        // 9. If result is an abrupt completion, then
        Err(error) => {
            debug!(
                module = module.get_index(),
                failed = stack.len(),
                "module evaluation threw"
            );
            // a. For each Cyclic Module Record m of stack, do
            for m in stack {
                // i. Assert: m.[[Status]] is evaluating.
                debug_assert_eq!(m.status(agent), ModuleStatus::Evaluating);
                // ii. Set m.[[Status]] to evaluated.
                // iii. Set m.[[EvaluationError]] to result.
                agent[m].cyclic_mut().set_evaluation_error(error.clone());
                trace!(module = m.get_index(), "evaluating -> evaluated (threw)");
            }
            // b. Assert: module.[[Status]] is evaluated.
            debug_assert_eq!(module.status(agent), ModuleStatus::Evaluated);
            // c. Assert: module.[[EvaluationError]] and result are the same
            //    Completion Record.
            // d. Perform ! Call(capability.[[Reject]], undefined, « result.[[Value]] »).
            capability.reject(agent, error.into_value());
        }
        // 10. Else,
        Ok(_) => {
            // a. Assert: module.[[Status]] is either evaluating-async or
            //    evaluated.
            // b. Assert: module.[[EvaluationError]] is empty.
            // c. If module.[[AsyncEvaluationOrder]] is unset, then
            //   i. Assert: module.[[Status]] is evaluated.
            // NOTE: A component that finished asynchronous evaluation before
            // this call is evaluated as well and resolves here too.
            if module.status(agent) == ModuleStatus::Evaluated {
                //   ii. Perform ! Call(capability.[[Resolve]], undefined, « undefined »).
                capability.resolve(agent, Value::Undefined);
            }
            // d. Assert: stack is empty.
            debug_assert!(stack.is_empty());
        }
    }
    if agent.options.print_internals {
        print_module_internals(agent, "evaluate");
    }
    // 11. Return capability.[[Promise]].
    capability.promise()
}

/// ### [16.2.1.6.1.2.1 InnerModuleEvaluation ( module, stack, index )](https://tc39.es/ecma262/#sec-innermoduleevaluation)
///
/// The abstract operation InnerModuleEvaluation takes arguments module (a
/// Module Record), stack (a List of Cyclic Module Records), and index (a
/// non-negative integer) and returns either a normal completion containing a
/// non-negative integer or a throw completion. It is used by Evaluate to
/// perform the actual evaluation process for module, as well as recursively
/// on all other modules in the dependency graph. The stack and index
/// parameters, as well as module's \[\[DFSIndex\]\] and
/// \[\[DFSAncestorIndex\]\] fields, are used the same way as in
/// InnerModuleLinking.
///
/// > NOTE: Any modules depending on a module of an asynchronous cycle when
/// > that cycle is not evaluating will instead depend on the execution of the
/// > root of the cycle via \[\[CycleRoot\]\]. This ensures that the cycle
/// > state can be treated as a single strongly connected component through
/// > its root module state.
fn inner_module_evaluation(
    agent: &mut Agent,
    module: Module,
    stack: &mut Vec<Module>,
    index: u32,
) -> JsResult<u32> {
    // 1. If module is not a Cyclic Module Record, then
    if !module.is_cyclic(agent) {
        // a. Perform ? EvaluateModuleSync(module).
        evaluate_module_sync(agent, module)?;
        // b. Return index.
        return Ok(index);
    }
    let status = module.status(agent);
    // 2. If module.[[Status]] is either evaluating-async or evaluated, then
    if matches!(
        status,
        ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ) {
        // a. If module.[[EvaluationError]] is empty, return index.
        // b. Otherwise, return ? module.[[EvaluationError]].
        return match agent[module].cyclic().evaluation_error() {
            Some(error) => Err(error.clone()),
            None => Ok(index),
        };
    }
    // 3. If module.[[Status]] is evaluating, return index.
    if status == ModuleStatus::Evaluating {
        return Ok(index);
    }
    // 4. Assert: module.[[Status]] is linked.
    debug_assert_eq!(status, ModuleStatus::Linked);
    let cyclic = agent[module].cyclic_mut();
    // 5. Set module.[[Status]] to evaluating.
    cyclic.status = ModuleStatus::Evaluating;
    // 6. Set module.[[DFSIndex]] to index.
    // 7. Set module.[[DFSAncestorIndex]] to index.
    cyclic.set_dfs_index(index);
    // 8. Set module.[[PendingAsyncDependencies]] to 0.
    cyclic.pending_async_dependencies = Some(0);
    let requested_modules = cyclic.requested_modules.clone();
    trace!(module = module.get_index(), index, "linked -> evaluating");
    // 9. Set index to index + 1.
    let mut index = index + 1;
    // 10. Append module to stack.
    stack.push(module);
    // 11. For each ModuleRequest Record request of module.[[RequestedModules]], do
    for request in requested_modules.iter() {
        // a. Let requiredModule be GetImportedModule(module, request).
        let required_module = get_imported_module(agent, module, request)?;
        // b. Set index to ? InnerModuleEvaluation(requiredModule, stack, index).
        index = inner_module_evaluation(agent, required_module, stack, index)?;
        // c. If requiredModule is a Cyclic Module Record, then
        if !required_module.is_cyclic(agent) {
            continue;
        }
        let required = agent[required_module].cyclic();
        // i. Assert: requiredModule.[[Status]] is one of evaluating,
        //    evaluating-async, or evaluated.
        // ii. Assert: requiredModule.[[Status]] is evaluating if and only if
        //     stack contains requiredModule.
        debug_assert_eq!(
            required.status == ModuleStatus::Evaluating,
            stack.contains(&required_module)
        );
        let required_module = if required.status == ModuleStatus::Evaluating {
            // iii. If requiredModule.[[Status]] is evaluating, then
            //   1. Set module.[[DFSAncestorIndex]] to
            //      min(module.[[DFSAncestorIndex]],
            //      requiredModule.[[DFSAncestorIndex]]).
            let required_ancestor_index = required.dfs_ancestor_index;
            agent[module]
                .cyclic_mut()
                .lower_dfs_ancestor_index(required_ancestor_index);
            required_module
        } else {
            // iv. Else,
            //   1. Set requiredModule to requiredModule.[[CycleRoot]].
            let cycle_root = required.cycle_root.unwrap_or(required_module);
            let root = agent[cycle_root].cyclic();
            //   2. Assert: requiredModule.[[Status]] is either
            //      evaluating-async or evaluated.
            debug_assert!(matches!(
                root.status,
                ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
            ));
            //   3. If requiredModule.[[EvaluationError]] is not empty,
            //      return ? requiredModule.[[EvaluationError]].
            if let Some(error) = root.evaluation_error() {
                return Err(error.clone());
            }
            cycle_root
        };
        // v. If requiredModule.[[AsyncEvaluationOrder]] is an integer, then
        if matches!(
            agent[required_module].cyclic().async_evaluation_order,
            AsyncEvaluationOrder::Order(_)
        ) {
            // 1. Set module.[[PendingAsyncDependencies]] to
            //    module.[[PendingAsyncDependencies]] + 1.
            if let Some(pending) = &mut agent[module].cyclic_mut().pending_async_dependencies {
                *pending += 1;
            }
            // 2. Append module to requiredModule.[[AsyncParentModules]].
            agent[required_module]
                .cyclic_mut()
                .async_parent_modules
                .push(module);
        }
    }
    let cyclic = agent[module].cyclic();
    let pending_async_dependencies = cyclic.pending_async_dependencies.unwrap_or(0);
    // 12. If module.[[PendingAsyncDependencies]] > 0 or module.[[HasTLA]] is
    //     true, then
    if pending_async_dependencies > 0 || cyclic.has_tla {
        // a. Assert: module.[[AsyncEvaluationOrder]] is unset.
        debug_assert_eq!(cyclic.async_evaluation_order, AsyncEvaluationOrder::Unset);
        // b. Set module.[[AsyncEvaluationOrder]] to
        //    IncrementModuleAsyncEvaluationCount().
        let order = agent.increment_module_async_evaluation_count();
        agent[module].cyclic_mut().async_evaluation_order = AsyncEvaluationOrder::Order(order);
        trace!(
            module = module.get_index(),
            order,
            pending = pending_async_dependencies,
            "queued for asynchronous evaluation"
        );
        // c. If module.[[PendingAsyncDependencies]] = 0, perform
        //    ExecuteAsyncModule(module).
        if pending_async_dependencies == 0 {
            execute_async_module(agent, module);
        }
    } else {
        // 13. Else,
        //   a. Perform ? module.ExecuteModule().
        execute_module_sync(agent, module)?;
    }
    let cyclic = agent[module].cyclic();
    // 14. Assert: module occurs exactly once in stack.
    // 15. Assert: module.[[DFSAncestorIndex]] ≤ module.[[DFSIndex]].
    // 16. If module.[[DFSAncestorIndex]] = module.[[DFSIndex]], then
    if cyclic.is_scc_root() {
        // a. Let done be false.
        // b. Repeat, while done is false,
        loop {
            // i. Let requiredModule be the last element of stack.
            // ii. Remove the last element of stack.
            let Some(required_module) = stack.pop() else {
                unreachable!("module must be in the stack");
            };
            // iii. Assert: requiredModule is a Cyclic Module Record.
            let required = agent[required_module].cyclic_mut();
            // iv. Assert: requiredModule.[[AsyncEvaluationOrder]] is either
            //     an integer or unset.
            // v. If requiredModule.[[AsyncEvaluationOrder]] is unset, set
            //    requiredModule.[[Status]] to evaluated.
            // vi. Otherwise, set requiredModule.[[Status]] to
            //     evaluating-async.
            // NOTE: The order is only done here if the host ran promise jobs
            // while the graph was still being evaluated. The module keeps the
            // status its completion gave it.
            match required.async_evaluation_order {
                AsyncEvaluationOrder::Unset => required.status = ModuleStatus::Evaluated,
                AsyncEvaluationOrder::Order(_) => required.status = ModuleStatus::EvaluatingAsync,
                AsyncEvaluationOrder::Done => {}
            }
            // viii. Set requiredModule.[[CycleRoot]] to module.
            required.cycle_root = Some(module);
            trace!(
                module = required_module.get_index(),
                status = ?required.status,
                "evaluating -> {:?}",
                required.status
            );
            // vii. If requiredModule and module are the same Module Record,
            //      set done to true.
            if required_module == module {
                break;
            }
        }
    }
    // 17. Return index.
    Ok(index)
}

/// ### [16.2.1.6.1.2.2 EvaluateModuleSync ( module )](https://tc39.es/ecma262/#sec-EvaluateModuleSync)
fn evaluate_module_sync(agent: &mut Agent, module: Module) -> JsResult<()> {
    // 1. Assert: module is not a Cyclic Module Record.
    debug_assert!(!module.is_cyclic(agent));
    // 2. Let promise be module.Evaluate().
    let promise = module.evaluate(agent);
    // 3. Assert: promise.[[PromiseState]] is either fulfilled or rejected.
    match promise.try_get_result(agent) {
        Some(Ok(_)) => Ok(()),
        // 4. If promise.[[PromiseState]] is rejected, then
        Some(Err(error)) => {
            // a. If promise.[[PromiseIsHandled]] is false, perform
            //    HostPromiseRejectionTracker(promise, "handle").
            // b. Set promise.[[PromiseIsHandled]] to true.
            promise.mark_handled(agent);
            // c. Return ThrowCompletion(promise.[[PromiseResult]]).
            Err(error)
        }
        None => unreachable!("leaf module evaluation is synchronous"),
    }
}

/// ### ExecuteModule()
///
/// Run the body of a module that has no pending asynchronous work.
fn execute_module_sync(agent: &mut Agent, module: Module) -> JsResult<()> {
    match run_module_body(agent, module)? {
        ModuleExecution::Completed => {
            trace!(module = module.get_index(), "module body completed");
            Ok(())
        }
        ModuleExecution::Await { .. } => Err(agent.throw_exception_with_static_message(
            ExceptionType::SyntaxError,
            "await is only valid in modules with top-level await",
        )),
    }
}

fn run_module_body(agent: &mut Agent, module: Module) -> JsResult<ModuleExecution> {
    match &agent[module].kind {
        ModuleKind::SourceText(_) => {
            let interpreter = agent.interpreter();
            interpreter.execute_module(agent, module)
        }
        ModuleKind::HostCyclic { instance, .. } => {
            let Some(instance) = instance.clone() else {
                return Err(agent.throw_exception_with_static_message(
                    ExceptionType::TypeError,
                    "Module must be linked before it can be evaluated",
                ));
            };
            instance.execute_module(agent, module)
        }
        ModuleKind::Leaf { .. } => unreachable!(),
    }
}

/// ### [16.2.1.6.1.3.1 ExecuteAsyncModule ( module )](https://tc39.es/ecma262/#sec-execute-async-module)
fn execute_async_module(agent: &mut Agent, module: Module) {
    // 1. Assert: module.[[Status]] is either evaluating or evaluating-async.
    debug_assert!(matches!(
        module.status(agent),
        ModuleStatus::Evaluating | ModuleStatus::EvaluatingAsync
    ));
    // 2. Assert: module.[[HasTLA]] is true.
    debug_assert!(agent[module].cyclic().has_tla);
    trace!(module = module.get_index(), "executing asynchronous module");
    // 3. Let capability be ! NewPromiseCapability(%Promise%).
    let capability = PromiseCapability::new(agent);
    // 4. Let fulfilledClosure be a new Abstract Closure with no parameters
    //    that captures module and performs the following steps when called:
    //   a. Perform AsyncModuleExecutionFulfilled(module).
    //   b. Return undefined.
    // 5. Let onFulfilled be CreateBuiltinFunction(fulfilledClosure, 0, "", « »).
    // 6. Let rejectedClosure be a new Abstract Closure with parameters
    //    (error) that captures module and performs the following steps when
    //    called:
    //   a. Perform AsyncModuleExecutionRejected(module, error).
    //   b. Return undefined.
    // 7. Let onRejected be CreateBuiltinFunction(rejectedClosure, 0, "", « »).
    // 8. Perform PerformPromiseThen(capability.[[Promise]], onFulfilled, onRejected).
    capability
        .promise()
        .perform_then(agent, PromiseReactionHandler::AsyncModule(module), None);
    // 9. Perform ! module.ExecuteModule(capability).
    let execution = run_module_body(agent, module);
    continue_module_execution(agent, module, capability, execution);
    // 10. Return unused.
}

/// Drive an asynchronous module body: settle its capability once the body
/// completes or throws, or wait for the promise it awaits.
pub(crate) fn continue_module_execution(
    agent: &mut Agent,
    module: Module,
    capability: PromiseCapability,
    execution: JsResult<ModuleExecution>,
) {
    match execution {
        Ok(ModuleExecution::Completed) => capability.resolve(agent, Value::Undefined),
        Err(error) => capability.reject(agent, error.into_value()),
        Ok(ModuleExecution::Await {
            promise,
            continuation,
        }) => await_in_module(agent, module, capability, promise, continuation),
    }
}

fn await_in_module(
    agent: &mut Agent,
    module: Module,
    capability: PromiseCapability,
    promise: Promise,
    continuation: Box<dyn ModuleContinuation>,
) {
    trace!(module = module.get_index(), "module body suspended at await");
    promise.perform_then(
        agent,
        PromiseReactionHandler::ModuleContinuation {
            module,
            capability,
            continuation,
        },
        None,
    );
}

/// ### [16.2.1.6.1.3.2 GatherAvailableAncestors ( module, execList )](https://tc39.es/ecma262/#sec-gather-available-ancestors)
fn gather_available_ancestors(agent: &mut Agent, module: Module, exec_list: &mut Vec<Module>) {
    // 1. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    let async_parent_modules = agent[module].cyclic().async_parent_modules.clone();
    for m in async_parent_modules {
        // a. If execList does not contain m and
        //    m.[[CycleRoot]].[[EvaluationError]] is empty, then
        if exec_list.contains(&m) {
            continue;
        }
        let cycle_root = agent[m].cyclic().cycle_root.unwrap_or(m);
        if agent[cycle_root].cyclic().evaluation_error.is_some() {
            continue;
        }
        let parent = agent[m].cyclic_mut();
        // i. Assert: m.[[Status]] is evaluating-async.
        // ii. Assert: m.[[EvaluationError]] is empty.
        // iii. Assert: m.[[AsyncEvaluationOrder]] is an integer.
        debug_assert!(matches!(
            parent.async_evaluation_order,
            AsyncEvaluationOrder::Order(_)
        ));
        // iv. Assert: m.[[PendingAsyncDependencies]] > 0.
        // v. Set m.[[PendingAsyncDependencies]] to
        //    m.[[PendingAsyncDependencies]] - 1.
        let Some(pending) = &mut parent.pending_async_dependencies else {
            unreachable!("async parent has no pending dependencies");
        };
        debug_assert!(*pending > 0);
        *pending -= 1;
        // vi. If m.[[PendingAsyncDependencies]] = 0, then
        if *pending == 0 {
            let has_tla = parent.has_tla;
            // 1. Append m to execList.
            exec_list.push(m);
            // 2. If m.[[HasTLA]] is false, perform
            //    GatherAvailableAncestors(m, execList).
            if !has_tla {
                gather_available_ancestors(agent, m, exec_list);
            }
        }
    }
    // 2. Return unused.
}

/// ### [16.2.1.6.1.3.3 AsyncModuleExecutionFulfilled ( module )](https://tc39.es/ecma262/#sec-async-module-execution-fulfilled)
pub(crate) fn async_module_execution_fulfilled(agent: &mut Agent, module: Module) {
    let cyclic = agent[module].cyclic_mut();
    // 1. If module.[[Status]] is evaluated, then
    if cyclic.status == ModuleStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not empty.
        debug_assert!(cyclic.evaluation_error.is_some());
        // b. Return unused.
        return;
    }
    // 2. Assert: module.[[Status]] is evaluating-async.
    debug_assert_eq!(cyclic.status, ModuleStatus::EvaluatingAsync);
    // 3. Assert: module.[[AsyncEvaluationOrder]] is an integer.
    // 4. Assert: module.[[EvaluationError]] is empty.
    // 5. Set module.[[AsyncEvaluationOrder]] to done.
    cyclic.async_evaluation_order = AsyncEvaluationOrder::Done;
    // 6. Set module.[[Status]] to evaluated.
    cyclic.status = ModuleStatus::Evaluated;
    debug!(module = module.get_index(), "asynchronous module fulfilled");
    // 7. If module.[[TopLevelCapability]] is not empty, then
    if let Some(capability) = cyclic.top_level_capability {
        // a. Assert: module.[[CycleRoot]] and module are the same Module
        //    Record.
        // b. Perform ! Call(module.[[TopLevelCapability]].[[Resolve]],
        //    undefined, « undefined »).
        capability.resolve(agent, Value::Undefined);
    }
    // 8. Let execList be a new empty List.
    let mut exec_list = Vec::new();
    // 9. Perform GatherAvailableAncestors(module, execList).
    gather_available_ancestors(agent, module, &mut exec_list);
    // 10. Assert: All elements of execList have their
    //     [[AsyncEvaluationOrder]] field set to an integer,
    //     [[PendingAsyncDependencies]] field set to 0, and
    //     [[EvaluationError]] field set to empty.
    // 11. Let sortedExecList be a List whose elements are the elements of
    //     execList, sorted by their [[AsyncEvaluationOrder]] field in
    //     ascending order.
    exec_list.sort_by_key(|m| match agent[*m].cyclic().async_evaluation_order {
        AsyncEvaluationOrder::Order(order) => order,
        _ => u32::MAX,
    });
    // 12. For each Cyclic Module Record m of sortedExecList, do
    for m in exec_list {
        let cyclic = agent[m].cyclic();
        // a. If m.[[Status]] is evaluated, then
        if cyclic.status == ModuleStatus::Evaluated {
            // i. Assert: m.[[EvaluationError]] is not empty.
            debug_assert!(cyclic.evaluation_error.is_some());
        } else if cyclic.has_tla {
            // b. Else if m.[[HasTLA]] is true, then
            //   i. Perform ExecuteAsyncModule(m).
            execute_async_module(agent, m);
        } else {
            // c. Else,
            //   i. Let result be m.ExecuteModule().
            let result = execute_module_sync(agent, m);
            match result {
                // ii. If result is an abrupt completion, then
                Err(error) => {
                    // 1. Perform AsyncModuleExecutionRejected(m, result.[[Value]]).
                    async_module_execution_rejected(agent, m, error.into_value());
                }
                // iii. Else,
                Ok(()) => {
                    let cyclic = agent[m].cyclic_mut();
                    // 1. Set m.[[AsyncEvaluationOrder]] to done.
                    cyclic.async_evaluation_order = AsyncEvaluationOrder::Done;
                    // 2. Set m.[[Status]] to evaluated.
                    cyclic.status = ModuleStatus::Evaluated;
                    trace!(module = m.get_index(), "evaluating-async -> evaluated");
                    // 3. If m.[[TopLevelCapability]] is not empty, then
                    if let Some(capability) = cyclic.top_level_capability {
                        // a. Assert: m.[[CycleRoot]] and m are the same
                        //    Module Record.
                        // b. Perform ! Call(m.[[TopLevelCapability]].[[Resolve]],
                        //    undefined, « undefined »).
                        capability.resolve(agent, Value::Undefined);
                    }
                }
            }
        }
    }
    // 13. Return unused.
}

/// ### [16.2.1.6.1.3.4 AsyncModuleExecutionRejected ( module, error )](https://tc39.es/ecma262/#sec-async-module-execution-rejected)
pub(crate) fn async_module_execution_rejected(agent: &mut Agent, module: Module, error: Value) {
    let cyclic = agent[module].cyclic_mut();
    // 1. If module.[[Status]] is evaluated, then
    if cyclic.status == ModuleStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not empty.
        // b. Return unused.
        return;
    }
    // 2. Assert: module.[[Status]] is evaluating-async.
    debug_assert_eq!(cyclic.status, ModuleStatus::EvaluatingAsync);
    // 3. Assert: module.[[AsyncEvaluationOrder]] is an integer.
    // 4. Assert: module.[[EvaluationError]] is empty.
    // 5. Set module.[[EvaluationError]] to ThrowCompletion(error).
    // 6. Set module.[[Status]] to evaluated.
    cyclic.set_evaluation_error(JsError::new(error.clone()));
    // 7. Set module.[[AsyncEvaluationOrder]] to done.
    cyclic.async_evaluation_order = AsyncEvaluationOrder::Done;
    // 8. NOTE: module.[[AsyncEvaluationOrder]] is set to done for symmetry
    //    with AsyncModuleExecutionFulfilled. In InnerModuleEvaluation, the
    //    value of a module's [[AsyncEvaluationOrder]] internal slot is unused
    //    when its [[EvaluationError]] internal slot is not empty.
    let async_parent_modules = cyclic.async_parent_modules.clone();
    let top_level_capability = cyclic.top_level_capability;
    debug!(module = module.get_index(), "asynchronous module rejected");
    // 9. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    for m in async_parent_modules {
        // a. Perform AsyncModuleExecutionRejected(m, error).
        async_module_execution_rejected(agent, m, error.clone());
    }
    // 10. If module.[[TopLevelCapability]] is not empty, then
    if let Some(capability) = top_level_capability {
        // a. Assert: module.[[CycleRoot]] and module are the same Module
        //    Record.
        // b. Perform ! Call(module.[[TopLevelCapability]].[[Reject]],
        //    undefined, « error »).
        capability.reject(agent, error);
    }
    // 11. Return unused.
}

fn print_module_internals(agent: &Agent, operation: &str) {
    for (index, data) in agent.heap.modules.iter().enumerate() {
        match &data.cyclic {
            Some(cyclic) => info!(
                module = index,
                status = ?cyclic.status,
                cycle_root = ?cyclic.cycle_root,
                async_evaluation_order = ?cyclic.async_evaluation_order,
                has_error = cyclic.evaluation_error.is_some(),
                "after {operation}"
            ),
            None => info!(module = index, "after {operation}: leaf module"),
        }
    }
}
