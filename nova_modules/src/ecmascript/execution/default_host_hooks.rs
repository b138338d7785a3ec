// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::cell::Cell;

use ahash::AHashMap;

use super::agent::{ExceptionType, ExecutionMode, HostHooks, JsError, JsResult};
use crate::{
    ecmascript::scripts_and_modules::module::{
        ModuleId, module_semantics::source_text_module_records::ModuleSource,
    },
    heap::Heap,
};

/// Value model of [`DefaultHostHooks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Promise(u32),
    Error(ExceptionType, String),
}

/// An in-memory host: module sources are registered up front, specifiers
/// are record names and module bodies have no effect.
///
/// Bodies started with [`ExecutionMode::Async`] do not settle on their own;
/// the embedder settles them through the agent.
#[derive(Debug, Default)]
pub struct DefaultHostHooks {
    sources: AHashMap<String, ModuleSource>,
    promise_count: Cell<u32>,
}

impl DefaultHostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, source: ModuleSource) -> Self {
        self.insert_module(name, source);
        self
    }

    pub fn insert_module(&mut self, name: impl Into<String>, source: ModuleSource) {
        self.sources.insert(name.into(), source);
    }
}

impl HostHooks for DefaultHostHooks {
    type Value = DefaultValue;

    /// The default implementation uses the specifier as the record name.
    fn resolve_module_specifier(
        &self,
        _referrer: &str,
        specifier: &str,
    ) -> JsResult<String, DefaultValue> {
        Ok(specifier.to_owned())
    }

    fn load_module(&self, name: &str) -> JsResult<ModuleSource, DefaultValue> {
        self.sources.get(name).cloned().ok_or_else(|| {
            JsError::new(self.create_exception(
                ExceptionType::Error,
                &format!("cannot find module '{name}'"),
            ))
        })
    }

    fn execute_module(
        &self,
        _heap: &Heap<DefaultValue>,
        _module: ModuleId,
        _mode: ExecutionMode,
    ) -> JsResult<(), DefaultValue> {
        Ok(())
    }

    fn new_promise_capability(&self) -> DefaultValue {
        let id = self.promise_count.get();
        self.promise_count.set(id + 1);
        DefaultValue::Promise(id)
    }

    fn resolve_promise(&self, _promise: &DefaultValue) {}

    fn reject_promise(&self, _promise: &DefaultValue, _reason: &DefaultValue) {}

    fn create_exception(&self, kind: ExceptionType, message: &str) -> DefaultValue {
        DefaultValue::Error(kind, message.to_owned())
    }

    fn describe_exception(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Error(_, message) => message.clone(),
            value => format!("{value:?}"),
        }
    }
}
