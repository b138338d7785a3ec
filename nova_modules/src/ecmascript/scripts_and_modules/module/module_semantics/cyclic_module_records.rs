// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.6 Cyclic Module Records](https://tc39.es/ecma262/#sec-cyclic-module-records)

use crate::ecmascript::{
    execution::{Agent, HostHooks, JsError},
    scripts_and_modules::module::ModuleId,
};

use super::{
    module_environment::ModuleEnvironment,
    module_error::ModuleResult,
    module_namespace::ModuleNamespace,
    source_text_module_records::{ModuleKind, ModuleRequest, ModuleSource},
};

/// ### \[\[Status]]
///
/// The variants are ordered by lifecycle progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleStatus {
    Uninstantiated,
    Instantiating,
    Instantiated,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingType {
    /// Bundled or statically imported. Never unloaded.
    Stable,
    /// Loaded at runtime. Reference counted by the registration ledger.
    Dynamic,
}

/// ### \[\[AsyncEvaluation]]
///
/// Either never async, async with the ordinal recording when it became
/// async, or async and finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncEvaluation {
    NotAsync,
    Evaluating(u32),
    Finished,
}

impl AsyncEvaluation {
    pub fn is_async_evaluating(self) -> bool {
        matches!(self, AsyncEvaluation::Evaluating(_))
    }

    pub fn ordinal(self) -> Option<u32> {
        match self {
            AsyncEvaluation::Evaluating(ordinal) => Some(ordinal),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ModuleRecord<V> {
    /// Record name: the module's identity in the module cache.
    pub(crate) name: String,
    pub(crate) kind: ModuleKind,
    /// ### \[\[Status]]
    ///
    /// Initially Uninstantiated. Transitions (in order) to Instantiating,
    /// Instantiated, Evaluating, possibly EvaluatingAsync, and Evaluated as the
    /// module progresses throughout its lifecycle. EvaluatingAsync indicates
    /// this module is queued to execute on completion of its asynchronous
    /// dependencies or it is a module whose \[\[HasTLA]] field is true that
    /// has been executed and is pending top-level completion.
    pub(crate) status: ModuleStatus,
    /// ### \[\[DFSIndex]]
    ///
    /// Auxiliary field used during Link and Evaluate only. If \[\[Status]] is
    /// Instantiating or Evaluating, this non-negative number records the
    /// point at which the module was first visited during the depth-first
    /// traversal of the dependency graph.
    pub(crate) dfs_index: Option<u32>,
    /// ### \[\[DFSAncestorIndex]]
    ///
    /// Auxiliary field used during Link and Evaluate only. If \[\[Status]] is
    /// Instantiating or Evaluating, this is either the module's own
    /// \[\[DFSIndex]] or that of an "earlier" module in the same strongly
    /// connected component.
    pub(crate) dfs_ancestor_index: Option<u32>,
    /// ### \[\[RequestedModules]]
    pub(crate) requested_modules: Box<[ModuleRequest]>,
    /// ### \[\[LoadedModules]]
    ///
    /// Resolution result for each entry of \[\[RequestedModules]], filled in
    /// on first use.
    pub(crate) loaded_modules: Box<[Option<ModuleId>]>,
    /// ### \[\[Environment]]
    pub(crate) environment: Option<ModuleEnvironment>,
    /// ### \[\[Namespace]]
    pub(crate) namespace: Option<ModuleNamespace>,
    pub(crate) register_counts: u16,
    pub(crate) loading_type: LoadingType,
    /// Evaluated at most once across all agents sharing a
    /// [`SharedModuleManager`](super::shared_modules::SharedModuleManager).
    pub(crate) shared: bool,
    /// ### \[\[CycleRoot]]
    pub(crate) cycle_root: Option<ModuleId>,
    /// ### \[\[HasTLA]]
    pub(crate) has_top_level_await: bool,
    /// ### \[\[AsyncEvaluation]]
    pub(crate) async_evaluation: AsyncEvaluation,
    /// ### \[\[TopLevelCapability]]
    ///
    /// The promise of the top-level evaluation. Only set on the module that
    /// Evaluate was called on, which is always the root of its cycle.
    pub(crate) top_level_capability: Option<V>,
    /// ### \[\[AsyncParentModules]]
    pub(crate) async_parent_modules: Vec<ModuleId>,
    /// ### \[\[PendingAsyncDependencies]]
    pub(crate) pending_async_dependencies: u32,
    /// ### \[\[EvaluationError]]
    ///
    /// Write-once.
    pub(crate) evaluation_error: Option<JsError<V>>,
}

impl<V> ModuleRecord<V> {
    pub(crate) fn new(name: String, source: ModuleSource) -> Self {
        let ModuleSource {
            kind,
            requested_modules,
            has_top_level_await,
            loading_type,
            shared,
        } = source;
        let loaded_modules = vec![None; requested_modules.len()].into_boxed_slice();
        Self {
            name,
            kind,
            status: ModuleStatus::Uninstantiated,
            dfs_index: None,
            dfs_ancestor_index: None,
            requested_modules: requested_modules.into_boxed_slice(),
            loaded_modules,
            environment: None,
            namespace: None,
            register_counts: 0,
            loading_type,
            shared,
            cycle_root: None,
            has_top_level_await,
            async_evaluation: AsyncEvaluation::NotAsync,
            top_level_capability: None,
            async_parent_modules: vec![],
            pending_async_dependencies: 0,
            evaluation_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    pub fn dfs_index(&self) -> Option<u32> {
        self.dfs_index
    }

    pub fn dfs_ancestor_index(&self) -> Option<u32> {
        self.dfs_ancestor_index
    }

    pub fn requested_modules(&self) -> &[ModuleRequest] {
        &self.requested_modules
    }

    /// Modules the requests of this module resolved to so far.
    pub fn loaded_modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.loaded_modules.iter().flatten().copied()
    }

    pub fn environment(&self) -> Option<&ModuleEnvironment> {
        self.environment.as_ref()
    }

    pub fn namespace(&self) -> Option<&ModuleNamespace> {
        self.namespace.as_ref()
    }

    pub fn register_counts(&self) -> u16 {
        self.register_counts
    }

    pub fn loading_type(&self) -> LoadingType {
        self.loading_type
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn cycle_root(&self) -> Option<ModuleId> {
        self.cycle_root
    }

    pub fn has_top_level_await(&self) -> bool {
        self.has_top_level_await
    }

    pub fn async_evaluation(&self) -> AsyncEvaluation {
        self.async_evaluation
    }

    pub fn async_parent_modules(&self) -> &[ModuleId] {
        &self.async_parent_modules
    }

    pub fn pending_async_dependencies(&self) -> u32 {
        self.pending_async_dependencies
    }

    pub fn evaluation_error(&self) -> Option<&JsError<V>> {
        self.evaluation_error.as_ref()
    }

    pub fn top_level_capability(&self) -> Option<&V> {
        self.top_level_capability.as_ref()
    }

    /// Native, CommonJS and JSON modules take no part in the strongly
    /// connected component walks.
    pub fn is_cyclic_module_record(&self) -> bool {
        matches!(self.kind, ModuleKind::EcmaScript(_))
    }

    pub(crate) fn set_instantiating(&mut self, index: u32) {
        debug_assert_eq!(self.status, ModuleStatus::Uninstantiated);
        self.status = ModuleStatus::Instantiating;
        self.dfs_index = Some(index);
        self.dfs_ancestor_index = Some(index);
    }

    pub(crate) fn set_instantiated(&mut self) {
        debug_assert!(matches!(
            self.status,
            ModuleStatus::Uninstantiated | ModuleStatus::Instantiating
        ));
        self.status = ModuleStatus::Instantiated;
    }

    /// Rolls a module on the linking stack back to Uninstantiated.
    pub(crate) fn set_uninstantiated(&mut self) {
        debug_assert_eq!(self.status, ModuleStatus::Instantiating);
        self.status = ModuleStatus::Uninstantiated;
        self.dfs_index = None;
        self.dfs_ancestor_index = None;
        self.environment = None;
    }

    pub(crate) fn set_evaluating(&mut self, index: u32) {
        debug_assert_eq!(self.status, ModuleStatus::Instantiated);
        self.status = ModuleStatus::Evaluating;
        self.dfs_index = Some(index);
        self.dfs_ancestor_index = Some(index);
        self.pending_async_dependencies = 0;
    }

    /// Lowers \[\[DFSAncestorIndex]] to `index` if `index` is smaller.
    pub(crate) fn lower_dfs_ancestor_index(&mut self, index: Option<u32>) {
        debug_assert!(matches!(
            self.status,
            ModuleStatus::Instantiating | ModuleStatus::Evaluating
        ));
        if let (Some(current), Some(index)) = (self.dfs_ancestor_index, index) {
            self.dfs_ancestor_index = Some(current.min(index));
        }
    }

    /// Whether this module is the root of its strongly connected component.
    pub(crate) fn is_component_root(&self) -> bool {
        debug_assert!(self.dfs_ancestor_index <= self.dfs_index);
        self.dfs_ancestor_index == self.dfs_index
    }

    pub(crate) fn set_evaluation_error(&mut self, error: JsError<V>) {
        debug_assert!(self.evaluation_error.is_none());
        self.status = ModuleStatus::Evaluated;
        self.evaluation_error.get_or_insert(error);
    }

    pub(crate) fn set_cycle_root(&mut self, root: ModuleId) {
        debug_assert!(self.cycle_root.is_none_or(|current| current == root));
        self.cycle_root.get_or_insert(root);
    }
}

/// ### [16.2.1.9 GetImportedModule ( referrer, request )](https://tc39.es/ecma262/#sec-GetImportedModule)
///
/// Returns the module that `referrer`'s request number `index` resolved to,
/// resolving it through the host on first use.
pub(crate) fn get_requested_module<H: HostHooks>(
    agent: &mut Agent<H>,
    referrer: ModuleId,
    index: usize,
) -> ModuleResult<ModuleId, H::Value> {
    if let Some(module) = agent[referrer].loaded_modules[index] {
        if agent.heap.contains(module) {
            return Ok(module);
        }
    }
    let specifier = agent[referrer].requested_modules[index].specifier.clone();
    let module = agent.host_resolve_imported_module(referrer, &specifier)?;
    agent[referrer].loaded_modules[index] = Some(module);
    Ok(module)
}

/// Same as [`get_requested_module`] but by specifier.
pub(crate) fn get_imported_module<H: HostHooks>(
    agent: &mut Agent<H>,
    referrer: ModuleId,
    specifier: &str,
) -> ModuleResult<ModuleId, H::Value> {
    match agent[referrer]
        .requested_modules
        .iter()
        .position(|request| request.specifier == specifier)
    {
        Some(index) => get_requested_module(agent, referrer, index),
        None => agent.host_resolve_imported_module(referrer, specifier),
    }
}
