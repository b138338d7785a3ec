// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recording host used by the unit tests.

use core::cell::RefCell;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use ahash::AHashMap;
use tracing_subscriber::EnvFilter;

use crate::{
    Agent, ExceptionType, ExecutionMode, Heap, HostHooks, JsError, JsResult, ModuleId,
    ModuleSource, Options,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TestValue {
    Promise(usize),
    Exception(ExceptionType, String),
    Thrown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PromiseState {
    Pending,
    Fulfilled,
    Rejected(TestValue),
}

pub(crate) fn thrown(message: &str) -> TestValue {
    TestValue::Thrown(message.to_owned())
}

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
pub(crate) struct TestHost {
    sources: RefCell<AHashMap<String, ModuleSource>>,
    throwing: RefCell<AHashMap<String, String>>,
    published: RefCell<AHashMap<String, Vec<String>>>,
    executed: RefCell<Vec<String>>,
    started_async: RefCell<Vec<String>>,
    promises: RefCell<Vec<PromiseState>>,
    unloaded: RefCell<Vec<String>>,
    counted: Option<(String, Arc<AtomicUsize>)>,
    execution_delay: Option<Duration>,
}

impl TestHost {
    /// Builds an agent whose module cache holds `modules`, in order.
    pub(crate) fn agent(
        host: TestHost,
        modules: &[(&str, ModuleSource)],
    ) -> (Agent<TestHost>, AHashMap<String, ModuleId>) {
        init_tracing();
        let mut agent = Agent::new(Options::default(), host);
        let ids = modules
            .iter()
            .map(|(name, source)| ((*name).to_owned(), agent.add_module(*name, source.clone())))
            .collect();
        (agent, ids)
    }

    /// Makes `name` loadable on demand instead of up front.
    pub(crate) fn add_source(&self, name: &str, source: ModuleSource) {
        self.sources.borrow_mut().insert(name.to_owned(), source);
    }

    /// Makes the body of `name` throw `message`.
    pub(crate) fn throw_from(&self, name: &str, message: &str) {
        self.throwing
            .borrow_mut()
            .insert(name.to_owned(), message.to_owned());
    }

    /// Export names reported for `name` after its body ran.
    pub(crate) fn publish_exports(&self, name: &str, exports: &[&str]) {
        self.published.borrow_mut().insert(
            name.to_owned(),
            exports.iter().map(|export| (*export).to_owned()).collect(),
        );
    }

    pub(crate) fn with_execution_counter(mut self, name: &str, counter: Arc<AtomicUsize>) -> Self {
        self.counted = Some((name.to_owned(), counter));
        self
    }

    pub(crate) fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = Some(delay);
        self
    }

    /// Bodies run so far, synchronous and asynchronous, in order.
    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    pub(crate) fn started_async(&self) -> Vec<String> {
        self.started_async.borrow().clone()
    }

    pub(crate) fn unloaded(&self) -> Vec<String> {
        self.unloaded.borrow().clone()
    }

    pub(crate) fn promise_state(&self, promise: &TestValue) -> PromiseState {
        match promise {
            TestValue::Promise(id) => self.promises.borrow()[*id].clone(),
            value => panic!("{value:?} is not a promise"),
        }
    }

    fn settle(&self, promise: &TestValue, state: PromiseState) {
        let TestValue::Promise(id) = promise else {
            panic!("{promise:?} is not a promise");
        };
        let mut promises = self.promises.borrow_mut();
        assert_eq!(promises[*id], PromiseState::Pending, "promise settled twice");
        promises[*id] = state;
    }
}

pub(crate) fn agent_with(
    modules: &[(&str, ModuleSource)],
) -> (Agent<TestHost>, AHashMap<String, ModuleId>) {
    TestHost::agent(TestHost::default(), modules)
}

impl HostHooks for TestHost {
    type Value = TestValue;

    fn resolve_module_specifier(&self, _referrer: &str, specifier: &str) -> JsResult<String, TestValue> {
        Ok(specifier.to_owned())
    }

    fn load_module(&self, name: &str) -> JsResult<ModuleSource, TestValue> {
        self.sources.borrow().get(name).cloned().ok_or_else(|| {
            JsError::new(TestValue::Exception(
                ExceptionType::Error,
                format!("cannot find module '{name}'"),
            ))
        })
    }

    fn execute_module(
        &self,
        heap: &Heap<TestValue>,
        module: ModuleId,
        mode: ExecutionMode,
    ) -> JsResult<(), TestValue> {
        let name = heap[module].name().to_owned();
        if let Some(delay) = self.execution_delay {
            thread::sleep(delay);
        }
        if let Some((counted, counter)) = &self.counted {
            if *counted == name {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
        if mode == ExecutionMode::Async {
            self.started_async.borrow_mut().push(name.clone());
        }
        self.executed.borrow_mut().push(name.clone());
        match self.throwing.borrow().get(&name) {
            Some(message) => Err(JsError::new(thrown(message))),
            None => Ok(()),
        }
    }

    fn exported_names(&self, heap: &Heap<TestValue>, module: ModuleId) -> Option<Vec<String>> {
        self.published.borrow().get(heap[module].name()).cloned()
    }

    fn new_promise_capability(&self) -> TestValue {
        let mut promises = self.promises.borrow_mut();
        promises.push(PromiseState::Pending);
        TestValue::Promise(promises.len() - 1)
    }

    fn resolve_promise(&self, promise: &TestValue) {
        self.settle(promise, PromiseState::Fulfilled);
    }

    fn reject_promise(&self, promise: &TestValue, reason: &TestValue) {
        self.settle(promise, PromiseState::Rejected(reason.clone()));
    }

    fn create_exception(&self, kind: ExceptionType, message: &str) -> TestValue {
        TestValue::Exception(kind, message.to_owned())
    }

    fn describe_exception(&self, value: &TestValue) -> String {
        match value {
            TestValue::Exception(_, message) | TestValue::Thrown(message) => message.clone(),
            TestValue::Promise(id) => format!("promise #{id}"),
        }
    }

    fn unload_native_binding(&self, name: &str, _library: &str) {
        self.unloaded.borrow_mut().push(name.to_owned());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sources_load_on_first_request() {
        let host = TestHost::default();
        host.add_source("lib", ModuleSource::ecmascript().export_local("x", "x"));
        let (mut agent, modules) = TestHost::agent(
            host,
            &[("main", ModuleSource::ecmascript().import_named("lib", "x", "x"))],
        );
        assert!(!agent.is_module_loaded("lib"));
        assert!(modules["main"].link(&mut agent).is_ok());
        assert!(agent.is_module_loaded("lib"));
        assert_eq!(agent.heap().module_count(), 2);
        assert_eq!(
            agent.host_get_imported_module("lib").map(|lib| agent[lib].name()),
            Some("lib")
        );
    }
}
