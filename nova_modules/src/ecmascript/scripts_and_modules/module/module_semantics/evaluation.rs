// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.6.1.3 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
//!
//! Evaluation of the module graph, including the asynchronous completion
//! of modules with top-level await.

use tracing::{debug, trace, warn};

use crate::ecmascript::{
    execution::{Agent, ExecutionMode, HostHooks, JsError, JsResult},
    scripts_and_modules::module::ModuleId,
};

use super::{
    abstract_module_records::BindingName,
    cyclic_module_records::{AsyncEvaluation, ModuleStatus, get_requested_module},
    module_environment::Binding,
    module_error::{ModuleError, ModuleResult, ResolutionFailure},
    shared_modules::settle_shared_module,
    source_text_module_records::ModuleKind,
};

impl ModuleId {
    /// ### [16.2.1.6.1.3 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
    ///
    /// Evaluates this module and its dependencies. Returns the top-level
    /// promise, which settles once the whole graph has finished, including
    /// any asynchronous modules. Evaluation errors reject the promise; the
    /// `Err` case is reserved for modules that have not been linked.
    pub fn evaluate<H: HostHooks>(self, agent: &mut Agent<H>) -> ModuleResult<H::Value, H::Value> {
        agent.check_module(self)?;
        // 1. Assert: This call to Evaluate is not happening at the same time
        //    as another call to Evaluate within the surrounding agent.
        // 2. Assert: module.[[Status]] is one of linked, evaluating-async, or evaluated.
        let status = agent[self].status;
        if !matches!(
            status,
            ModuleStatus::Instantiated | ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
        ) {
            return Err(ModuleError::InvalidStatus {
                module: agent[self].name.clone(),
                status,
            });
        }
        let mut module = self;
        // 3. If module.[[Status]] is either evaluating-async or evaluated, then
        if status != ModuleStatus::Instantiated {
            // a. If module.[[CycleRoot]] is not EMPTY, then
            if let Some(cycle_root) = agent[module].cycle_root {
                // i. Set module to module.[[CycleRoot]].
                if agent.heap.contains(cycle_root) {
                    module = cycle_root;
                }
            }
        }
        // 4. If module.[[TopLevelCapability]] is not EMPTY, then
        if let Some(capability) = &agent[module].top_level_capability {
            // a. Return module.[[TopLevelCapability]].[[Promise]].
            return Ok(capability.clone());
        }
        // 5. Let stack be a new empty List.
        let mut stack = Vec::with_capacity(8);
        // 6. Let capability be ! NewPromiseCapability(%Promise%).
        let capability = agent.host_hooks.new_promise_capability();
        // 7. Set module.[[TopLevelCapability]] to capability.
        agent[module].top_level_capability = Some(capability.clone());
        // 8. Let result be Completion(InnerModuleEvaluation(module, stack, 0)).
        let result = inner_module_evaluation(agent, module, &mut stack, 0);
        match result {
            // 9. If result is an abrupt completion, then
            Err(error) => {
                // a. For each Cyclic Module Record m of stack, do
                for m in stack {
                    // i. Assert: m.[[Status]] is evaluating.
                    // ii. Set m.[[Status]] to evaluated.
                    // iii. Set m.[[EvaluationError]] to result.
                    agent.record_evaluation_error(m, &error);
                }
                // b. Assert: module.[[Status]] is evaluated.
                // c. Assert: module.[[EvaluationError]] and result are the same Completion Record.
                agent.record_evaluation_error(module, &error);
                // d. Perform ! Call(capability.[[Reject]], undefined, « result.[[Value]] »).
                agent.host_hooks.reject_promise(&capability, error.value());
            }
            // 10. Else,
            Ok(_) => {
                // a. Assert: module.[[Status]] is either evaluating-async or evaluated.
                debug_assert!(matches!(
                    agent[module].status,
                    ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
                ));
                // b. If module.[[AsyncEvaluation]] is false, then
                if !agent[module].async_evaluation.is_async_evaluating() {
                    // i. Assert: module.[[Status]] is evaluated.
                    // ii. Perform ! Call(capability.[[Resolve]], undefined, « undefined »).
                    agent.host_hooks.resolve_promise(&capability);
                }
                // c. Assert: stack is empty.
                debug_assert!(stack.is_empty());
            }
        }
        // 11. Return capability.[[Promise]].
        Ok(capability)
    }

    /// Evaluates an already linked module for a concurrent caller that
    /// awaits nothing. The result is reported synchronously and no top-level
    /// promise is created.
    pub fn evaluate_for_concurrent<H: HostHooks>(
        self,
        agent: &mut Agent<H>,
    ) -> ModuleResult<(), H::Value> {
        agent.check_module(self)?;
        let status = agent[self].status;
        if status < ModuleStatus::Instantiated || status == ModuleStatus::Evaluating {
            return Err(ModuleError::InvalidStatus {
                module: agent[self].name.clone(),
                status,
            });
        }
        let mut stack = vec![];
        if let Err(error) = inner_module_evaluation(agent, self, &mut stack, 0) {
            for m in stack {
                agent.record_evaluation_error(m, &error);
            }
            return Err(ModuleError::Evaluation(error));
        }
        Ok(())
    }

    /// Replays the evaluation error of this module, if it has one. Used by
    /// dynamic import before handing out an already evaluated module.
    pub fn check_module_error<H: HostHooks>(self, agent: &Agent<H>) -> ModuleResult<(), H::Value> {
        agent.check_module(self)?;
        match &agent[self].evaluation_error {
            Some(error) => {
                warn!(
                    target: "nova_modules::evaluation",
                    module = %agent[self].name,
                    error = %agent.host_hooks.describe_exception(error.value()),
                    "module has an evaluation error"
                );
                Err(ModuleError::Evaluation(error.clone()))
            }
            None => Ok(()),
        }
    }
}

/// Dispatches to the shared module synchronizer for shared modules.
pub(crate) fn inner_module_evaluation<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    stack: &mut Vec<ModuleId>,
    index: u32,
) -> JsResult<u32, H::Value> {
    if agent[module].shared {
        if let Some(manager) = agent.shared_modules.clone() {
            return manager.evaluate(agent, module, stack, index);
        }
    }
    inner_module_evaluation_unsafe(agent, module, stack, index)
}

/// ### [16.2.1.6.1.3.1 InnerModuleEvaluation ( module, stack, index )](https://tc39.es/ecma262/#sec-innermoduleevaluation)
///
/// The single-threaded walk. Shared modules must hold their state visit
/// lock when they get here.
pub(crate) fn inner_module_evaluation_unsafe<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    stack: &mut Vec<ModuleId>,
    mut index: u32,
) -> JsResult<u32, H::Value> {
    // 1. If module is not a Cyclic Module Record, then
    if !agent[module].is_cyclic_module_record() {
        // a. Let promise be ! module.Evaluate().
        // b. Assert: promise.[[PromiseState]] is not PENDING.
        // c. If promise.[[PromiseState]] is REJECTED, then
        // i. Return ThrowCompletion(promise.[[PromiseResult]]).
        evaluate_non_cyclic_module(agent, module)?;
        // d. Return index.
        return Ok(index);
    }
    let record = &agent[module];
    match record.status {
        // 2. If module.[[Status]] is either EVALUATING-ASYNC or EVALUATED, then
        ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated => {
            // a. If module.[[EvaluationError]] is EMPTY, return index.
            // b. Otherwise, return ? module.[[EvaluationError]].
            return match &record.evaluation_error {
                None => Ok(index),
                Some(error) => Err(error.clone()),
            };
        }
        // 3. If module.[[Status]] is EVALUATING, return index.
        ModuleStatus::Evaluating => return Ok(index),
        // 4. Assert: module.[[Status]] is LINKED.
        status => debug_assert_eq!(status, ModuleStatus::Instantiated),
    }
    // 5. Set module.[[Status]] to EVALUATING.
    // 6. Let moduleIndex be index.
    // 7. Set module.[[DFSAncestorIndex]] to index.
    // 8. Set module.[[PendingAsyncDependencies]] to 0.
    agent[module].set_evaluating(index);
    trace!(target: "nova_modules::evaluation", module = %agent[module].name, index, "evaluating");
    // 9. Set index to index + 1.
    index += 1;
    // 10. Append module to stack.
    stack.push(module);
    // 11. For each ModuleRequest Record required of module.[[RequestedModules]], do
    for request_index in 0..agent[module].requested_modules.len() {
        if agent[module].requested_modules[request_index].lazy {
            trace!(
                target: "nova_modules::evaluation",
                module = %agent[module].name,
                request = %agent[module].requested_modules[request_index].specifier,
                "skip lazy request"
            );
            continue;
        }
        // a. Let requiredModule be GetImportedModule(module, required).
        let mut required_module = get_requested_module(agent, module, request_index)
            .map_err(|error| agent.throw_module_error(error))?;
        // b. Set index to ? InnerModuleEvaluation(requiredModule, stack, index).
        index = inner_module_evaluation(agent, required_module, stack, index)?;
        // c. If requiredModule is a Cyclic Module Record, then
        if !agent[required_module].is_cyclic_module_record() {
            continue;
        }
        let required_status = agent[required_module].status;
        // i. Assert: requiredModule.[[Status]] is one of EVALUATING,
        //    EVALUATING-ASYNC, or EVALUATED.
        debug_assert!(required_status >= ModuleStatus::Evaluating);
        // ii. Assert: requiredModule.[[Status]] is EVALUATING if and only if
        //     stack contains requiredModule.
        debug_assert_eq!(
            required_status == ModuleStatus::Evaluating,
            stack.contains(&required_module)
        );
        // iii. If requiredModule.[[Status]] is EVALUATING, then
        if required_status == ModuleStatus::Evaluating {
            // 1. Set module.[[DFSAncestorIndex]] to
            //    min(module.[[DFSAncestorIndex]], requiredModule.[[DFSAncestorIndex]]).
            let ancestor_index = agent[required_module].dfs_ancestor_index;
            agent[module].lower_dfs_ancestor_index(ancestor_index);
        } else {
            // iv. Else,
            // 1. Set requiredModule to requiredModule.[[CycleRoot]].
            if let Some(cycle_root) = agent[required_module].cycle_root {
                if agent.heap.contains(cycle_root) {
                    required_module = cycle_root;
                }
            }
            // 2. Assert: requiredModule.[[Status]] is either EVALUATING-ASYNC or EVALUATED.
            // 3. If requiredModule.[[EvaluationError]] is not EMPTY, return
            //    ? requiredModule.[[EvaluationError]].
            if let Some(error) = &agent[required_module].evaluation_error {
                return Err(error.clone());
            }
        }
        // v. If requiredModule.[[AsyncEvaluation]] is true, then
        if agent[required_module].async_evaluation.is_async_evaluating() {
            // 1. Set module.[[PendingAsyncDependencies]] to
            //    module.[[PendingAsyncDependencies]] + 1.
            agent[module].pending_async_dependencies += 1;
            // 2. Append module to requiredModule.[[AsyncParentModules]].
            agent[required_module].async_parent_modules.push(module);
        }
    }
    check_deferred_imports(agent, module).map_err(|error| agent.throw_module_error(error))?;
    // 12. If module.[[PendingAsyncDependencies]] > 0 or module.[[HasTLA]] is true, then
    if agent[module].pending_async_dependencies > 0 || agent[module].has_top_level_await {
        // a. Assert: module.[[AsyncEvaluation]] is false and was never previously set to true.
        debug_assert_eq!(agent[module].async_evaluation, AsyncEvaluation::NotAsync);
        // b. Set module.[[AsyncEvaluation]] to true.
        // c. NOTE: The order in which module records have their
        //    [[AsyncEvaluation]] fields transition to true is significant.
        let ordinal = agent.next_async_evaluating_ordinal();
        agent[module].async_evaluation = AsyncEvaluation::Evaluating(ordinal);
        debug!(target: "nova_modules::evaluation", module = %agent[module].name, ordinal, "async evaluating");
        // d. If module.[[PendingAsyncDependencies]] = 0, perform ExecuteAsyncModule(module).
        if agent[module].pending_async_dependencies == 0 {
            execute_async_module(agent, module)?;
        }
    } else {
        // 13. Else,
        // a. Perform ? module.ExecuteModule().
        execute_module(agent, module, ExecutionMode::Sync)?;
    }
    // 14. Assert: module occurs exactly once in stack.
    // 15. Assert: module.[[DFSAncestorIndex]] ≤ moduleIndex.
    // 16. If module.[[DFSAncestorIndex]] = moduleIndex, then
    if agent[module].is_component_root() {
        // a. Let done be false.
        // b. Repeat, while done is false,
        // i. Let requiredModule be the last element of stack.
        // ii. Remove the last element of stack.
        while let Some(required_module) = stack.pop() {
            // iii. Assert: requiredModule is a Cyclic Module Record.
            let record = &mut agent[required_module];
            // iv. If requiredModule.[[AsyncEvaluation]] is false, set
            //     requiredModule.[[Status]] to EVALUATED.
            // v. Otherwise, set requiredModule.[[Status]] to EVALUATING-ASYNC.
            record.status = if record.async_evaluation.is_async_evaluating() {
                ModuleStatus::EvaluatingAsync
            } else {
                ModuleStatus::Evaluated
            };
            // vii. Set requiredModule.[[CycleRoot]] to module.
            record.set_cycle_root(module);
            debug!(
                target: "nova_modules::evaluation",
                module = %record.name,
                status = ?record.status,
                "component closed"
            );
            settle_shared_module(agent, required_module);
            // vi. If requiredModule and module are the same Module Record, set done to true.
            if required_module == module {
                break;
            }
        }
    }
    // 17. Return index.
    Ok(index)
}

fn execute_module<H: HostHooks>(
    agent: &Agent<H>,
    module: ModuleId,
    mode: ExecutionMode,
) -> JsResult<(), H::Value> {
    debug!(target: "nova_modules::evaluation", module = %agent[module].name, ?mode, "execute module");
    agent.host_hooks.execute_module(&agent.heap, module, mode)
}

/// ### [16.2.1.6.1.3.2 ExecuteAsyncModule ( module )](https://tc39.es/ecma262/#sec-execute-async-module)
///
/// Starts the body of a module with top-level await. An `Err` is a
/// synchronous throw from the body.
fn execute_async_module<H: HostHooks>(
    agent: &Agent<H>,
    module: ModuleId,
) -> JsResult<(), H::Value> {
    // 1. Assert: module.[[Status]] is either EVALUATING or EVALUATING-ASYNC.
    debug_assert!(matches!(
        agent[module].status,
        ModuleStatus::Evaluating | ModuleStatus::EvaluatingAsync
    ));
    // 2. Assert: module.[[HasTLA]] is true.
    debug_assert!(agent[module].has_top_level_await);
    // 3-6. Create the capability and perform ! module.ExecuteModule(capability).
    execute_module(agent, module, ExecutionMode::Async)
}

/// Native, CommonJS and JSON modules are evaluated on first contact and
/// never enter the strongly connected component walk.
fn evaluate_non_cyclic_module<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
) -> JsResult<(), H::Value> {
    let record = &agent[module];
    if record.status == ModuleStatus::Evaluated {
        return match &record.evaluation_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        };
    }
    if let ModuleKind::Json = record.kind {
        agent[module].status = ModuleStatus::Evaluated;
        return Ok(());
    }
    evaluate_deferred_module(agent, module)
}

/// Executes a native or CommonJS module and records it as evaluated or
/// errored. On success the module's export names are published.
pub(crate) fn evaluate_deferred_module<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
) -> JsResult<(), H::Value> {
    match execute_module(agent, module, ExecutionMode::Sync) {
        Ok(()) => {
            let exported_names = agent.host_hooks.exported_names(&agent.heap, module);
            let record = &mut agent[module];
            if let Some(exported_names) = exported_names {
                if let Some(exports) = record.kind.deferred_exports_mut() {
                    exports.publish(exported_names);
                    record.namespace = None;
                }
            }
            record.status = ModuleStatus::Evaluated;
            Ok(())
        }
        Err(error) => {
            agent.record_evaluation_error(module, &error);
            Err(error)
        }
    }
}

/// Checks that every name imported from a native or CommonJS module was
/// published by it. `"default"` is always available.
fn check_deferred_imports<H: HostHooks>(
    agent: &Agent<H>,
    module: ModuleId,
) -> ModuleResult<(), H::Value> {
    let record = &agent[module];
    let (ModuleKind::EcmaScript(source), Some(env)) = (&record.kind, &record.environment) else {
        return Ok(());
    };
    for entry in source.import_entries.iter() {
        let Some(Binding::Import {
            module: target,
            binding_name: BindingName::Deferred(name),
        }) = env.get_binding(&entry.local_name)
        else {
            continue;
        };
        if name == "default" {
            continue;
        }
        let provided = agent
            .heap
            .get(*target)
            .and_then(|target| target.kind.deferred_exports())
            .and_then(|exports| exports.contains(name));
        if provided == Some(false) {
            return Err(ModuleError::UnresolvedImport {
                specifier: entry.module_request.clone(),
                export_name: name.clone(),
                referrer: record.name.clone(),
                failure: ResolutionFailure::NotFound,
            });
        }
    }
    Ok(())
}

/// ### [16.2.1.6.1.3.3 GatherAvailableAncestors ( module, execList )](https://tc39.es/ecma262/#sec-gather-available-ancestors)
pub(crate) fn gather_available_ancestors<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    exec_list: &mut Vec<ModuleId>,
) {
    // 1. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    let parents = agent[module].async_parent_modules.clone();
    for m in parents {
        if !agent.heap.contains(m) {
            continue;
        }
        // a. If execList does not contain m and m.[[CycleRoot]].[[EvaluationError]]
        //    is EMPTY, then
        let cycle_root_errored = agent[m]
            .cycle_root
            .and_then(|cycle_root| agent.heap.get(cycle_root))
            .is_some_and(|cycle_root| cycle_root.evaluation_error.is_some());
        // Modules left on the stack by a synchronous failure have an error but
        // no cycle root.
        let errored = agent[m].evaluation_error.is_some() || agent[m].status == ModuleStatus::Evaluated;
        if exec_list.contains(&m) || cycle_root_errored || errored {
            continue;
        }
        let record = &mut agent[m];
        // i. Assert: m.[[Status]] is EVALUATING-ASYNC.
        debug_assert_eq!(record.status, ModuleStatus::EvaluatingAsync);
        // ii. Assert: m.[[EvaluationError]] is EMPTY.
        debug_assert!(record.evaluation_error.is_none());
        // iii. Assert: m.[[AsyncEvaluation]] is true.
        debug_assert!(record.async_evaluation.is_async_evaluating());
        // iv. Assert: m.[[PendingAsyncDependencies]] > 0.
        debug_assert!(record.pending_async_dependencies > 0);
        // v. Set m.[[PendingAsyncDependencies]] to m.[[PendingAsyncDependencies]] - 1.
        record.pending_async_dependencies = record.pending_async_dependencies.saturating_sub(1);
        // vi. If m.[[PendingAsyncDependencies]] = 0, then
        if record.pending_async_dependencies == 0 {
            let has_top_level_await = record.has_top_level_await;
            // 1. Append m to execList.
            exec_list.push(m);
            // 2. If m.[[HasTLA]] is false, perform GatherAvailableAncestors(m, execList).
            if !has_top_level_await {
                gather_available_ancestors(agent, m, exec_list);
            }
        }
    }
}

impl<H: HostHooks> Agent<H> {
    /// ### [16.2.1.6.1.3.4 AsyncModuleExecutionFulfilled ( module )](https://tc39.es/ecma262/#sec-async-module-execution-fulfilled)
    ///
    /// Called by the host when the body of a module started with
    /// [`ExecutionMode::Async`] completes normally.
    pub fn async_module_execution_fulfilled(&mut self, module: ModuleId) -> ModuleResult<(), H::Value> {
        self.check_module(module)?;
        async_module_execution_fulfilled(self, module);
        Ok(())
    }

    /// ### [16.2.1.6.1.3.5 AsyncModuleExecutionRejected ( module, error )](https://tc39.es/ecma262/#sec-async-module-execution-rejected)
    ///
    /// Called by the host when the body of a module started with
    /// [`ExecutionMode::Async`] throws.
    pub fn async_module_execution_rejected(
        &mut self,
        module: ModuleId,
        error: H::Value,
    ) -> ModuleResult<(), H::Value> {
        self.check_module(module)?;
        async_module_execution_rejected(self, module, JsError::new(error));
        Ok(())
    }
}

fn async_module_execution_fulfilled<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) {
    // 1. If module.[[Status]] is EVALUATED, then
    if agent[module].status == ModuleStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not EMPTY.
        debug_assert!(agent[module].evaluation_error.is_some());
        // b. Return UNUSED.
        return;
    }
    // 2. Assert: module.[[Status]] is EVALUATING-ASYNC.
    // 3. Assert: module.[[AsyncEvaluation]] is true.
    // 4. Assert: module.[[EvaluationError]] is EMPTY.
    debug_assert_eq!(agent[module].status, ModuleStatus::EvaluatingAsync);
    debug_assert!(agent[module].async_evaluation.is_async_evaluating());
    // 5. Set module.[[AsyncEvaluation]] to DONE.
    // 6. Set module.[[Status]] to EVALUATED.
    mark_async_finished(agent, module);
    // 8. Let execList be a new empty List.
    let mut exec_list = Vec::new();
    // 9. Perform GatherAvailableAncestors(module, execList).
    gather_available_ancestors(agent, module, &mut exec_list);
    // 10. Assert: All elements of execList have their [[AsyncEvaluation]]
    //     field set to true, [[PendingAsyncDependencies]] field set to 0, and
    //     [[EvaluationError]] field set to EMPTY.
    // 11. Let sortedExecList be a List whose elements are the elements of
    //     execList, sorted by the order in which they had their
    //     [[AsyncEvaluation]] fields set to true in InnerModuleEvaluation.
    exec_list.sort_by_key(|m| agent[*m].async_evaluation.ordinal());
    trace!(target: "nova_modules::evaluation", module = %agent[module].name, ready = exec_list.len(), "async fulfilled");
    // 12. For each Cyclic Module Record m of sortedExecList, do
    for m in exec_list {
        // a. If m.[[Status]] is EVALUATED, then
        if agent[m].status == ModuleStatus::Evaluated {
            // i. Assert: m.[[EvaluationError]] is not EMPTY.
            debug_assert!(agent[m].evaluation_error.is_some());
            continue;
        }
        // b. Else if m.[[HasTLA]] is true, then
        if agent[m].has_top_level_await {
            // i. Perform ExecuteAsyncModule(m).
            if let Err(error) = execute_async_module(agent, m) {
                async_module_execution_rejected(agent, m, error);
            }
            continue;
        }
        // c. Else,
        // i. Let result be m.ExecuteModule().
        match execute_module(agent, m, ExecutionMode::Sync) {
            // ii. If result is an abrupt completion, then
            // 1. Perform AsyncModuleExecutionRejected(m, result.[[Value]]).
            Err(error) => async_module_execution_rejected(agent, m, error),
            // iii. Else,
            // 1. Set m.[[AsyncEvaluation]] to DONE.
            // 2. Set m.[[Status]] to EVALUATED.
            // 3. If m.[[TopLevelCapability]] is not EMPTY, then
            //    Perform ! Call(m.[[TopLevelCapability]].[[Resolve]], undefined, « undefined »).
            Ok(()) => mark_async_finished(agent, m),
        }
    }
}

fn mark_async_finished<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) {
    let record = &mut agent[module];
    record.async_evaluation = AsyncEvaluation::Finished;
    record.status = ModuleStatus::Evaluated;
    debug!(target: "nova_modules::evaluation", module = %record.name, "async evaluated");
    // 7. If module.[[TopLevelCapability]] is not EMPTY, then
    if let Some(capability) = &agent[module].top_level_capability {
        // a. Perform ! Call(module.[[TopLevelCapability]].[[Resolve]], undefined, « undefined »).
        agent.host_hooks.resolve_promise(capability);
    }
}

fn async_module_execution_rejected<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    error: JsError<H::Value>,
) {
    // 1. If module.[[Status]] is EVALUATED, then
    if agent[module].status == ModuleStatus::Evaluated {
        // a. Assert: module.[[EvaluationError]] is not EMPTY.
        debug_assert!(agent[module].evaluation_error.is_some());
        // b. Return UNUSED.
        return;
    }
    // 2. Assert: module.[[Status]] is EVALUATING-ASYNC.
    // 3. Assert: module.[[AsyncEvaluation]] is true.
    // 4. Assert: module.[[EvaluationError]] is EMPTY.
    debug_assert_eq!(agent[module].status, ModuleStatus::EvaluatingAsync);
    // 5. Set module.[[EvaluationError]] to ThrowCompletion(error).
    // 6. Set module.[[Status]] to EVALUATED.
    agent.record_evaluation_error(module, &error);
    // 7. Set module.[[AsyncEvaluation]] to DONE.
    agent[module].async_evaluation = AsyncEvaluation::Finished;
    debug!(target: "nova_modules::evaluation", module = %agent[module].name, "async rejected");
    // 8. NOTE: module.[[AsyncEvaluation]] is set to DONE for symmetry with
    //    AsyncModuleExecutionFulfilled.
    // 9. For each Cyclic Module Record m of module.[[AsyncParentModules]], do
    let parents = agent[module].async_parent_modules.clone();
    for m in parents {
        if agent.heap.contains(m) {
            // a. Perform AsyncModuleExecutionRejected(m, error).
            async_module_execution_rejected(agent, m, error.clone());
        }
    }
    // 10. If module.[[TopLevelCapability]] is not EMPTY, then
    if let Some(capability) = &agent[module].top_level_capability {
        // a. Perform ! Call(module.[[TopLevelCapability]].[[Reject]], undefined, « error »).
        agent.host_hooks.reject_promise(capability, error.value());
    }
}
