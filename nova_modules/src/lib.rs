// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linking and evaluation of ECMAScript module graphs.
//!
//! Module records live in an index arena owned by an [`Agent`]. The host
//! supplies module sources, runs module bodies and owns the value model
//! through the [`HostHooks`] trait.

pub mod ecmascript;
pub mod heap;
#[cfg(test)]
pub(crate) mod test_host;

pub use ecmascript::execution::{
    Agent, DefaultHostHooks, DefaultValue, ExceptionType, ExecutionMode, HostHooks, JsError, JsResult, Options,
    ValueRef,
};
pub use ecmascript::scripts_and_modules::module::{
    ModuleId,
    module_semantics::{
        abstract_module_records::{BindingName, ResolveSet, ResolvedBinding},
        circular_imports::check_circular_imports,
        cyclic_module_records::{AsyncEvaluation, LoadingType, ModuleRecord, ModuleStatus},
        module_environment::{Binding, ModuleEnvironment},
        module_error::{ModuleError, ModuleResult, ResolutionFailure},
        module_namespace::{ModuleNamespace, get_module_namespace},
        registration::{
            decrease_register_counts, increase_register_counts, remove_module,
            revise_loaded_module_count,
        },
        shared_modules::{SharedModuleManager, SharedModuleStatus},
        source_text_module_records::{
            DeferredExports, ImportEntryRecord, IndirectExportEntryRecord,
            LocalExportEntryRecord, ModuleKind, ModuleRequest, ModuleSource, NativeModule,
            SourceTextModule, StarExportEntryRecord, get_exported_names, resolve_export,
        },
    },
};
pub use heap::Heap;
