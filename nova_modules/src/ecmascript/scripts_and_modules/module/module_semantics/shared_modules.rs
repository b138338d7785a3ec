// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Modules shared between agents running on different threads.
//!
//! Every agent keeps its own record of a shared module, but the module body
//! runs at most once per [`SharedModuleManager`]. The first agent to reach a
//! shared module claims it; agents on other threads block until it settles.

use std::{
    sync::Arc,
    thread::{self, ThreadId},
};

use ahash::AHashMap;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::ecmascript::{
    execution::{Agent, ExceptionType, HostHooks, JsResult},
    scripts_and_modules::module::ModuleId,
};

use super::{
    cyclic_module_records::ModuleStatus,
    evaluation::inner_module_evaluation_unsafe,
    module_error::ModuleError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedModuleStatus {
    Instantiated,
    /// Claimed by an agent on some thread.
    Evaluating,
    Evaluated,
    /// The body threw. Holds the error rendered through
    /// [`HostHooks::describe_exception`].
    Errored(String),
}

#[derive(Debug)]
struct SharedState {
    status: SharedModuleStatus,
    thread_id: Option<ThreadId>,
}

#[derive(Debug)]
struct StateVisit {
    state: Mutex<SharedState>,
    settled: Condvar,
}

impl StateVisit {
    fn new() -> Self {
        Self {
            state: Mutex::new(SharedState {
                status: SharedModuleStatus::Instantiated,
                thread_id: None,
            }),
            settled: Condvar::new(),
        }
    }
}

/// Process-wide evaluation state of shared modules, keyed by record name.
#[derive(Debug, Default)]
pub struct SharedModuleManager {
    state_visits: Mutex<AHashMap<String, Arc<StateVisit>>>,
}

impl SharedModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, name: &str) -> Option<SharedModuleStatus> {
        let visit = self.state_visits.lock().get(name).cloned()?;
        let status = visit.state.lock().status.clone();
        Some(status)
    }

    fn state_visit(&self, name: &str) -> Arc<StateVisit> {
        self.state_visits
            .lock()
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(StateVisit::new()))
            .clone()
    }

    /// Runs the evaluation walk for a shared module once it has been
    /// claimed by the current thread.
    pub(crate) fn evaluate<H: HostHooks>(
        &self,
        agent: &mut Agent<H>,
        module: ModuleId,
        stack: &mut Vec<ModuleId>,
        index: u32,
    ) -> JsResult<u32, H::Value> {
        let local_status = agent[module].status;
        if local_status >= ModuleStatus::Evaluating {
            if local_status == ModuleStatus::Evaluating {
                trace!(target: "nova_modules::shared", module = %agent[module].name, "reentrant evaluation");
            }
            return inner_module_evaluation_unsafe(agent, module, stack, index);
        }

        let name = agent[module].name.clone();
        let visit = self.state_visit(&name);
        let current = thread::current().id();
        let mut state = visit.state.lock();
        loop {
            match state.status.clone() {
                SharedModuleStatus::Instantiated => {
                    state.status = SharedModuleStatus::Evaluating;
                    state.thread_id = Some(current);
                    break;
                }
                SharedModuleStatus::Evaluating if state.thread_id == Some(current) => {
                    drop(state);
                    return Err(agent.throw_module_error(ModuleError::SharedModuleBusy(name)));
                }
                SharedModuleStatus::Evaluating => {
                    trace!(target: "nova_modules::shared", module = %name, "waiting for other thread");
                    visit.settled.wait(&mut state);
                }
                SharedModuleStatus::Evaluated => {
                    drop(state);
                    debug!(target: "nova_modules::shared", module = %name, "evaluated by another agent");
                    let record = &mut agent[module];
                    record.status = ModuleStatus::Evaluated;
                    record.set_cycle_root(module);
                    return Ok(index);
                }
                SharedModuleStatus::Errored(message) => {
                    drop(state);
                    let error = agent.throw_exception(ExceptionType::Error, &message);
                    agent.record_evaluation_error(module, &error);
                    return Err(error);
                }
            }
        }
        drop(state);

        debug!(target: "nova_modules::shared", module = %name, "claimed shared module");
        let result = inner_module_evaluation_unsafe(agent, module, stack, index);
        match &result {
            Ok(_) => settle_shared_module(agent, module),
            Err(error) => {
                let message = agent.host_hooks.describe_exception(error.value());
                self.settle(&name, SharedModuleStatus::Errored(message));
            }
        }
        result
    }

    /// Publishes the final status of a claimed module and wakes up waiting
    /// threads. Asynchronous modules are published as evaluated when they
    /// start, so a later rejection may still replace `Evaluated` with
    /// `Errored`. Every other state is left alone.
    fn settle(&self, name: &str, status: SharedModuleStatus) {
        let Some(visit) = self.state_visits.lock().get(name).cloned() else {
            return;
        };
        let mut state = visit.state.lock();
        let late_rejection = state.status == SharedModuleStatus::Evaluated
            && matches!(status, SharedModuleStatus::Errored(_));
        if state.status != SharedModuleStatus::Evaluating && !late_rejection {
            return;
        }
        debug!(target: "nova_modules::shared", module = %name, ?status, "settled");
        state.status = status;
        state.thread_id = None;
        drop(state);
        visit.settled.notify_all();
    }
}

/// Publishes the status of `module` to the shared module manager once its
/// component has closed or it has an evaluation error.
///
/// Asynchronous shared modules count as evaluated once they have started.
/// Agents that already picked up that status do not see a later rejection.
pub(crate) fn settle_shared_module<H: HostHooks>(agent: &Agent<H>, module: ModuleId) {
    let record = &agent[module];
    if !record.shared {
        return;
    }
    let Some(manager) = &agent.shared_modules else {
        return;
    };
    let status = match (&record.evaluation_error, record.status) {
        (Some(error), _) => {
            SharedModuleStatus::Errored(agent.host_hooks.describe_exception(error.value()))
        }
        (None, ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated) => {
            SharedModuleStatus::Evaluated
        }
        (None, _) => return,
    };
    manager.settle(&record.name, status);
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::{
        ModuleSource,
        test_host::{PromiseState, TestHost, TestValue},
    };

    fn sources() -> [(&'static str, ModuleSource); 2] {
        [
            ("main", ModuleSource::ecmascript().import("config")),
            ("config", ModuleSource::ecmascript().shared()),
        ]
    }

    fn shared_agent(
        host: TestHost,
        manager: &Arc<SharedModuleManager>,
    ) -> (Agent<TestHost>, AHashMap<String, ModuleId>) {
        let (agent, modules) = TestHost::agent(host, &sources());
        (agent.with_shared_modules(manager.clone()), modules)
    }

    #[test]
    fn shared_body_runs_once_across_threads() {
        let manager = Arc::new(SharedModuleManager::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let manager = manager.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    let host = TestHost::default()
                        .with_execution_counter("config", counter)
                        .with_execution_delay(Duration::from_millis(20));
                    let (mut agent, modules) = shared_agent(host, &manager);
                    assert!(modules["main"].link(&mut agent).is_ok());
                    let promise = modules["main"].evaluate(&mut agent).ok();
                    assert_eq!(
                        promise.map(|promise| agent.host_hooks().promise_state(&promise)),
                        Some(PromiseState::Fulfilled)
                    );
                    assert_eq!(agent[modules["config"]].status(), ModuleStatus::Evaluated);
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.join().is_ok());
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status("config"), Some(SharedModuleStatus::Evaluated));
    }

    #[test]
    fn second_agent_skips_evaluated_shared_module() {
        let manager = Arc::new(SharedModuleManager::new());
        let (mut first, first_modules) = shared_agent(TestHost::default(), &manager);
        assert!(first_modules["main"].link(&mut first).is_ok());
        assert!(first_modules["main"].evaluate(&mut first).is_ok());

        let (mut second, modules) = shared_agent(TestHost::default(), &manager);
        assert!(modules["main"].link(&mut second).is_ok());
        assert!(modules["main"].evaluate(&mut second).is_ok());
        assert_eq!(first.host_hooks().executed(), ["config", "main"]);
        assert_eq!(second.host_hooks().executed(), ["main"]);
        assert_eq!(second[modules["config"]].status(), ModuleStatus::Evaluated);
    }

    #[test]
    fn shared_error_is_replayed_in_other_agents() {
        let manager = Arc::new(SharedModuleManager::new());
        let host = TestHost::default();
        host.throw_from("config", "bad config");
        let (mut first, first_modules) = shared_agent(host, &manager);
        assert!(first_modules["main"].link(&mut first).is_ok());
        assert!(first_modules["main"].evaluate(&mut first).is_ok());
        assert_eq!(
            manager.status("config"),
            Some(SharedModuleStatus::Errored("bad config".into()))
        );

        let (mut second, modules) = shared_agent(TestHost::default(), &manager);
        assert!(modules["main"].link(&mut second).is_ok());
        let promise = modules["main"].evaluate(&mut second).ok();
        assert_eq!(
            promise.map(|promise| second.host_hooks().promise_state(&promise)),
            Some(PromiseState::Rejected(TestValue::Exception(
                ExceptionType::Error,
                "bad config".into()
            )))
        );
        assert!(second.host_hooks().executed().is_empty());
        assert!(second[modules["config"]].evaluation_error().is_some());
    }

    #[test]
    fn reentrant_cycle_through_shared_module() {
        let manager = Arc::new(SharedModuleManager::new());
        let (agent, modules) = TestHost::agent(
            TestHost::default(),
            &[
                ("a", ModuleSource::ecmascript().import("b").shared()),
                ("b", ModuleSource::ecmascript().import("a").shared()),
            ],
        );
        let mut agent = agent.with_shared_modules(manager.clone());
        assert!(modules["a"].link(&mut agent).is_ok());
        assert!(modules["a"].evaluate(&mut agent).is_ok());
        assert_eq!(agent.host_hooks().executed(), ["b", "a"]);
        assert_eq!(manager.status("a"), Some(SharedModuleStatus::Evaluated));
        assert_eq!(manager.status("b"), Some(SharedModuleStatus::Evaluated));
    }

    #[test]
    fn async_rejection_is_published_after_start() {
        let manager = Arc::new(SharedModuleManager::new());
        let (agent, modules) = TestHost::agent(
            TestHost::default(),
            &[
                ("main", ModuleSource::ecmascript().import("config")),
                ("config", ModuleSource::ecmascript().shared().with_top_level_await()),
            ],
        );
        let mut first = agent.with_shared_modules(manager.clone());
        assert!(modules["main"].link(&mut first).is_ok());
        assert!(modules["main"].evaluate(&mut first).is_ok());
        assert_eq!(manager.status("config"), Some(SharedModuleStatus::Evaluated));

        assert!(
            first
                .async_module_execution_rejected(modules["config"], TestValue::Thrown("late".into()))
                .is_ok()
        );
        assert_eq!(
            manager.status("config"),
            Some(SharedModuleStatus::Errored("late".into()))
        );

        let (mut second, modules) = shared_agent(TestHost::default(), &manager);
        assert!(modules["main"].link(&mut second).is_ok());
        let promise = modules["main"].evaluate(&mut second).ok();
        assert_eq!(
            promise.map(|promise| second.host_hooks().promise_state(&promise)),
            Some(PromiseState::Rejected(TestValue::Exception(
                ExceptionType::Error,
                "late".into()
            )))
        );
    }

    #[test]
    fn modules_are_not_shared_without_a_manager() {
        let (mut agent, modules) = TestHost::agent(TestHost::default(), &sources());
        assert!(modules["main"].link(&mut agent).is_ok());
        assert!(modules["main"].evaluate(&mut agent).is_ok());
        assert_eq!(agent.host_hooks().executed(), ["config", "main"]);
    }
}
