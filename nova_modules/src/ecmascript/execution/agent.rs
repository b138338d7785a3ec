// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    ecmascript::scripts_and_modules::module::{
        ModuleId,
        module_semantics::{
            cyclic_module_records::ModuleRecord,
            module_error::{ModuleError, ModuleResult},
            shared_modules::{SharedModuleManager, settle_shared_module},
            source_text_module_records::ModuleSource,
        },
    },
    heap::Heap,
};

#[derive(Debug, Default, Clone)]
pub struct Options {
    /// Log every module that ends up with an evaluation error.
    pub enable_module_exception: bool,
    /// Report circular imports reachable from each successfully linked entry.
    ///
    /// The check lists every import path from the entry, which grows
    /// exponentially with the number of diamonds in the graph. It is a
    /// diagnostic for small graphs only.
    pub check_circular_imports: bool,
    /// When reporting circular imports, also report cycles that do not pass
    /// through the entry module.
    pub print_other_circular: bool,
}

/// Opaque handle to a value of the host's value model.
///
/// The module engine never inspects values; it only clones them, compares
/// them for identity and hands them back to the host.
pub trait ValueRef: Clone + PartialEq + Debug {}

impl<T: Clone + PartialEq + Debug> ValueRef for T {}

pub type JsResult<T, V> = std::result::Result<T, JsError<V>>;

/// A thrown host value.
#[derive(Debug, Clone, PartialEq)]
pub struct JsError<V>(pub(crate) V);

impl<V> JsError<V> {
    pub fn new(value: V) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &V {
        &self.0
    }

    pub fn into_value(self) -> V {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Error,
    ReferenceError,
    SyntaxError,
    TypeError,
}

/// How the host should run a module body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run the body to completion before returning.
    Sync,
    /// Start the body and settle it later through
    /// [`Agent::async_module_execution_fulfilled`] or
    /// [`Agent::async_module_execution_rejected`].
    Async,
}

pub trait HostHooks: Debug {
    type Value: ValueRef;

    /// ### [16.2.1.8 HostLoadImportedModule ( referrer, specifier, hostDefined, payload )](https://tc39.es/ecma262/#sec-HostLoadImportedModule)
    ///
    /// Maps a module request made by `referrer` to the record name of the
    /// requested module. If this operation is called multiple times with the
    /// same (referrer, specifier) pair and returns normally, it must return
    /// the same name each time.
    ///
    /// The actual mapping is host-defined but typically a normalization
    /// process is applied to specifier, such as expansion of relative and
    /// abbreviated path specifiers.
    fn resolve_module_specifier(
        &self,
        referrer: &str,
        specifier: &str,
    ) -> JsResult<String, Self::Value>;

    /// Supplies the static declarations of the module named `name`. Only
    /// called for names that are not yet in the module cache.
    fn load_module(&self, name: &str) -> JsResult<ModuleSource, Self::Value>;

    /// Runs the body of `module` against its linked environment.
    ///
    /// With [`ExecutionMode::Async`] the host must eventually settle the
    /// module through the async completion functions exactly once. Returning
    /// an error in either mode is a throw from the body.
    fn execute_module(
        &self,
        heap: &Heap<Self::Value>,
        module: ModuleId,
        mode: ExecutionMode,
    ) -> JsResult<(), Self::Value>;

    /// The export names a native or CommonJS module ended up with after its
    /// body ran. `None` means the names are unknown and every import is
    /// accepted.
    fn exported_names(&self, heap: &Heap<Self::Value>, module: ModuleId) -> Option<Vec<String>> {
        let _ = (heap, module);
        None
    }

    /// ### [27.2.1.5 NewPromiseCapability ( C )](https://tc39.es/ecma262/#sec-newpromisecapability)
    fn new_promise_capability(&self) -> Self::Value;

    fn resolve_promise(&self, promise: &Self::Value);

    fn reject_promise(&self, promise: &Self::Value, reason: &Self::Value);

    /// Creates a new error object of the given kind.
    fn create_exception(&self, kind: ExceptionType, message: &str) -> Self::Value;

    /// Renders a thrown value as text. Used to carry errors of shared
    /// modules across agents.
    fn describe_exception(&self, value: &Self::Value) -> String {
        format!("{value:?}")
    }

    /// Best-effort unload of the shared library backing a native module.
    /// Called once, when the module is removed from the module cache.
    fn unload_native_binding(&self, name: &str, library: &str) {
        let _ = (name, library);
    }
}

#[derive(Debug)]
pub struct Agent<H: HostHooks> {
    pub(crate) heap: Heap<H::Value>,
    pub(crate) options: Options,
    pub(crate) host_hooks: H,
    pub(crate) shared_modules: Option<Arc<SharedModuleManager>>,
    async_evaluation_count: u32,
}

impl<H: HostHooks> Agent<H> {
    pub fn new(options: Options, host_hooks: H) -> Self {
        Self {
            heap: Heap::new(),
            options,
            host_hooks,
            shared_modules: None,
            async_evaluation_count: 0,
        }
    }

    /// Attaches the process-wide shared module state. Modules loaded with
    /// [`ModuleSource::shared`] are evaluated at most once across all agents
    /// using the same manager.
    pub fn with_shared_modules(mut self, manager: Arc<SharedModuleManager>) -> Self {
        self.shared_modules = Some(manager);
        self
    }

    pub fn heap(&self) -> &Heap<H::Value> {
        &self.heap
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn host_hooks(&self) -> &H {
        &self.host_hooks
    }

    /// Inserts a module into the module cache ahead of any resolution.
    /// Returns the existing module if the name is already cached.
    pub fn add_module(&mut self, name: impl Into<String>, source: ModuleSource) -> ModuleId {
        let name = name.into();
        if let Some(module) = self.heap.lookup(&name) {
            return module;
        }
        debug!(target: "nova_modules::heap", module = %name, "add module");
        self.heap.create_module(name, source)
    }

    pub fn host_get_imported_module(&self, name: &str) -> Option<ModuleId> {
        self.heap.lookup(name)
    }

    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.heap.lookup(name).is_some()
    }

    pub fn get_module(&self, module: ModuleId) -> Option<&ModuleRecord<H::Value>> {
        self.heap.get(module)
    }

    pub(crate) fn check_module(&self, module: ModuleId) -> ModuleResult<(), H::Value> {
        if self.heap.contains(module) {
            Ok(())
        } else {
            Err(ModuleError::UnknownModule(module))
        }
    }

    /// Resolves `specifier` as requested by `referrer` and returns the cached
    /// module for the resulting name, loading it through the host on first
    /// use.
    pub(crate) fn host_resolve_imported_module(
        &mut self,
        referrer: ModuleId,
        specifier: &str,
    ) -> ModuleResult<ModuleId, H::Value> {
        let name = self
            .host_hooks
            .resolve_module_specifier(self[referrer].name(), specifier)
            .map_err(ModuleError::Host)?;
        if let Some(module) = self.heap.lookup(&name) {
            return Ok(module);
        }
        let source = self
            .host_hooks
            .load_module(&name)
            .map_err(ModuleError::Host)?;
        debug!(target: "nova_modules::heap", module = %name, referrer = %self[referrer].name(), "load module");
        Ok(self.heap.create_module(name, source))
    }

    pub(crate) fn throw_exception(&self, kind: ExceptionType, message: &str) -> JsError<H::Value> {
        JsError(self.host_hooks.create_exception(kind, message))
    }

    /// Converts an engine-side error into a thrown host value.
    pub(crate) fn throw_module_error(&self, error: ModuleError<H::Value>) -> JsError<H::Value> {
        match error {
            ModuleError::Host(error) | ModuleError::Evaluation(error) => error,
            error => self.throw_exception(error.exception_type(), &error.to_string()),
        }
    }

    /// Hands out the next async evaluation ordinal. Ordinals record the order
    /// in which modules became async and decide the execution order of
    /// modules that become ready together.
    pub(crate) fn next_async_evaluating_ordinal(&mut self) -> u32 {
        self.async_evaluation_count += 1;
        self.async_evaluation_count
    }

    /// Stores `error` as the evaluation error of `module` unless one is
    /// already recorded.
    pub(crate) fn record_evaluation_error(&mut self, module: ModuleId, error: &JsError<H::Value>) {
        let record = &mut self[module];
        if record.evaluation_error.is_some() {
            return;
        }
        record.set_evaluation_error(error.clone());
        if self.options.enable_module_exception {
            info!(target: "nova_modules::evaluation", module = %self[module].name(), "error module");
        }
        settle_shared_module(self, module);
    }
}
