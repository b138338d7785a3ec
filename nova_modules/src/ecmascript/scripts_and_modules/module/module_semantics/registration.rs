// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register counts of dynamically loaded modules.
//!
//! Every dynamic load of a module graph increments the count of each
//! dynamic module in it, every unload decrements them. A module whose count
//! drops to zero is removed from the module cache. Stable modules are never
//! counted and never removed.

use ahash::{AHashMap, AHashSet};
use tracing::{debug, error, trace};

use crate::ecmascript::{
    execution::{Agent, HostHooks},
    scripts_and_modules::module::ModuleId,
};

use super::{
    cyclic_module_records::LoadingType, module_error::ModuleResult,
    source_text_module_records::ModuleKind,
};

/// Increments the register count of `module` and of every dynamic module it
/// transitively loaded. `visited` collects the modules counted by this walk;
/// each module is counted at most once per walk.
///
/// Every member of an import cycle is promoted to [`LoadingType::Stable`], as
/// are modules whose count saturates.
pub fn increase_register_counts<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    visited: &mut AHashSet<ModuleId>,
) -> ModuleResult<(), H::Value> {
    agent.check_module(module)?;
    visited.insert(module);
    RegisterWalk::new(increment_register_count).walk(agent, module, visited);
    Ok(())
}

/// Decrements the register count of `module` and of every dynamic module it
/// transitively loaded, removing modules whose count drops to zero.
///
/// # Panics
///
/// Panics if a dynamic module with a register count of zero is reached.
pub fn decrease_register_counts<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    visited: &mut AHashSet<ModuleId>,
) -> ModuleResult<(), H::Value> {
    agent.check_module(module)?;
    visited.insert(module);
    RegisterWalk::new(decrement_register_count).walk(agent, module, visited);
    Ok(())
}

/// Depth-first walk over dynamic dependencies with low-link bookkeeping.
/// Counts are updated once a module's strongly connected component closes,
/// dependencies first. Components with more than one member, or with a
/// self-import, are pinned instead of counted so that no member of a cycle is
/// removed while another member still imports it.
struct RegisterWalk<H: HostHooks> {
    index: u32,
    dfs_indices: AHashMap<ModuleId, u32>,
    stack: Vec<ModuleId>,
    on_stack: AHashSet<ModuleId>,
    update: fn(&mut Agent<H>, ModuleId),
}

impl<H: HostHooks> RegisterWalk<H> {
    fn new(update: fn(&mut Agent<H>, ModuleId)) -> Self {
        Self {
            index: 0,
            dfs_indices: AHashMap::default(),
            stack: vec![],
            on_stack: AHashSet::default(),
            update,
        }
    }

    /// Returns the lowest DFS index reachable from `module`.
    fn walk(&mut self, agent: &mut Agent<H>, module: ModuleId, visited: &mut AHashSet<ModuleId>) -> u32 {
        let dfs_index = self.index;
        self.index += 1;
        self.dfs_indices.insert(module, dfs_index);
        self.stack.push(module);
        self.on_stack.insert(module);
        let mut dfs_ancestor_index = dfs_index;
        let mut self_import = false;

        let dependencies: Vec<ModuleId> = agent[module].loaded_modules().collect();
        for dependency in dependencies {
            let Some(record) = agent.heap.get(dependency) else {
                continue;
            };
            if dependency == module {
                self_import = true;
                continue;
            }
            if let Some(&dependency_index) = self.dfs_indices.get(&dependency) {
                if self.on_stack.contains(&dependency) {
                    dfs_ancestor_index = dfs_ancestor_index.min(dependency_index);
                }
                continue;
            }
            if record.loading_type != LoadingType::Dynamic || !visited.insert(dependency) {
                continue;
            }
            let reached = self.walk(agent, dependency, visited);
            dfs_ancestor_index = dfs_ancestor_index.min(reached);
        }

        if dfs_ancestor_index == dfs_index {
            let mut component = vec![];
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(&member);
                component.push(member);
                if member == module {
                    break;
                }
            }
            if component.len() > 1 || self_import {
                for &member in &component {
                    let record = &mut agent[member];
                    if record.loading_type == LoadingType::Dynamic {
                        record.loading_type = LoadingType::Stable;
                        debug!(target: "nova_modules::registration", module = %record.name, "cyclic module promoted to stable");
                    }
                }
            }
            for member in component {
                (self.update)(agent, member);
            }
        }
        dfs_ancestor_index
    }
}

fn increment_register_count<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) {
    let Some(record) = agent.heap.get_mut(module) else {
        return;
    };
    if record.loading_type == LoadingType::Stable {
        return;
    }
    if record.register_counts == u16::MAX {
        record.loading_type = LoadingType::Stable;
        debug!(target: "nova_modules::registration", module = %record.name, "register count saturated, promoted to stable");
        return;
    }
    record.register_counts += 1;
    trace!(target: "nova_modules::registration", module = %record.name, count = record.register_counts, "increase");
}

fn decrement_register_count<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) {
    let Some(record) = agent.heap.get_mut(module) else {
        return;
    };
    if record.loading_type == LoadingType::Stable {
        return;
    }
    if record.register_counts == 0 {
        error!(target: "nova_modules::registration", module = %record.name, "register count underflow");
        panic!("register count of module '{}' is already zero", record.name);
    }
    record.register_counts -= 1;
    trace!(target: "nova_modules::registration", module = %record.name, count = record.register_counts, "decrease");
    if record.register_counts == 0 {
        remove_module(agent, module);
    }
}

/// Removes `module` from the module cache, unloading the shared library of
/// native modules. Returns false if the module was already removed.
pub fn remove_module<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) -> bool {
    let Some(record) = agent.heap.remove_module(module) else {
        return false;
    };
    if let ModuleKind::Native(native) = &record.kind {
        agent
            .host_hooks
            .unload_native_binding(&record.name, &native.library);
    }
    debug!(target: "nova_modules::registration", module = %record.name, "removed from module cache");
    true
}

/// Pins a module that was loaded both dynamically and statically.
pub fn revise_loaded_module_count<H: HostHooks>(agent: &mut Agent<H>, name: &str) {
    let Some(module) = agent.heap.lookup(name) else {
        return;
    };
    let record = &mut agent[module];
    if record.loading_type == LoadingType::Dynamic {
        record.loading_type = LoadingType::Stable;
        debug!(target: "nova_modules::registration", module = %record.name, "revised to stable");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ModuleSource, test_host::agent_with};

    fn increase<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) {
        assert!(increase_register_counts(agent, module, &mut AHashSet::default()).is_ok());
    }

    fn decrease<H: HostHooks>(agent: &mut Agent<H>, module: ModuleId) {
        assert!(decrease_register_counts(agent, module, &mut AHashSet::default()).is_ok());
    }

    #[test]
    fn counts_each_dynamic_module_once_per_walk() {
        let (mut agent, modules) = agent_with(&[
            ("entry", ModuleSource::ecmascript().dynamic().import("left").import("right")),
            ("left", ModuleSource::ecmascript().dynamic().import("shared")),
            ("right", ModuleSource::ecmascript().dynamic().import("shared")),
            ("shared", ModuleSource::ecmascript().dynamic().import("stable")),
            ("stable", ModuleSource::ecmascript()),
        ]);
        assert!(modules["entry"].link(&mut agent).is_ok());
        increase(&mut agent, modules["entry"]);
        increase(&mut agent, modules["entry"]);
        for name in ["entry", "left", "right", "shared"] {
            assert_eq!(agent[modules[name]].register_counts(), 2, "{name}");
            assert_eq!(agent[modules[name]].loading_type(), LoadingType::Dynamic);
        }
        assert_eq!(agent[modules["stable"]].register_counts(), 0);
    }

    #[test]
    fn saturated_count_promotes_to_stable() {
        let (mut agent, modules) = agent_with(&[("a", ModuleSource::ecmascript().dynamic())]);
        agent[modules["a"]].register_counts = u16::MAX - 1;
        increase(&mut agent, modules["a"]);
        assert_eq!(agent[modules["a"]].register_counts(), u16::MAX);
        assert_eq!(agent[modules["a"]].loading_type(), LoadingType::Dynamic);
        increase(&mut agent, modules["a"]);
        assert_eq!(agent[modules["a"]].register_counts(), u16::MAX);
        assert_eq!(agent[modules["a"]].loading_type(), LoadingType::Stable);
        // Stable modules are never decremented or removed.
        decrease(&mut agent, modules["a"]);
        assert_eq!(agent[modules["a"]].register_counts(), u16::MAX);
        assert!(agent.is_module_loaded("a"));
    }

    #[test]
    fn cyclic_modules_are_promoted_to_stable() {
        let (mut agent, modules) = agent_with(&[
            ("a", ModuleSource::ecmascript().dynamic().import_named("b", "x", "x")),
            ("b", ModuleSource::ecmascript().dynamic().import("a").export_local("x", "x")),
        ]);
        assert!(modules["a"].link(&mut agent).is_ok());
        increase(&mut agent, modules["a"]);
        for name in ["a", "b"] {
            assert_eq!(agent[modules[name]].loading_type(), LoadingType::Stable, "{name}");
            assert_eq!(agent[modules[name]].register_counts(), 0, "{name}");
        }
        decrease(&mut agent, modules["a"]);
        assert!(agent.is_module_loaded("a"));
        assert!(agent.is_module_loaded("b"));
        assert_eq!(agent.heap().module_count(), 2);
    }

    #[test]
    fn whole_component_is_pinned_when_reached_through_a_finished_member() {
        // entry -> b -> c -> d -> b, and b -> e -> c. When e is walked, c has
        // finished but its component is still open.
        let (mut agent, modules) = agent_with(&[
            ("entry", ModuleSource::ecmascript().dynamic().import("b")),
            ("b", ModuleSource::ecmascript().dynamic().import("c").import("e")),
            ("c", ModuleSource::ecmascript().dynamic().import("d")),
            ("d", ModuleSource::ecmascript().dynamic().import("b")),
            ("e", ModuleSource::ecmascript().dynamic().import("c")),
        ]);
        assert!(modules["entry"].link(&mut agent).is_ok());
        increase(&mut agent, modules["entry"]);
        for name in ["b", "c", "d", "e"] {
            assert_eq!(agent[modules[name]].loading_type(), LoadingType::Stable, "{name}");
        }
        assert_eq!(agent[modules["entry"]].loading_type(), LoadingType::Dynamic);
        assert_eq!(agent[modules["entry"]].register_counts(), 1);

        decrease(&mut agent, modules["entry"]);
        assert!(!agent.is_module_loaded("entry"));
        assert_eq!(agent.heap().module_count(), 4);
    }

    #[test]
    fn self_import_is_pinned() {
        let (mut agent, modules) = agent_with(&[("a", ModuleSource::ecmascript().dynamic().import("a"))]);
        assert!(modules["a"].link(&mut agent).is_ok());
        increase(&mut agent, modules["a"]);
        assert_eq!(agent[modules["a"]].loading_type(), LoadingType::Stable);
        assert_eq!(agent[modules["a"]].register_counts(), 0);
    }

    #[test]
    fn reaching_zero_removes_exactly_once() {
        let (mut agent, modules) = agent_with(&[
            ("app", ModuleSource::ecmascript().dynamic().import("addon")),
            ("addon", ModuleSource::native("libaddon.so").dynamic()),
        ]);
        assert!(modules["app"].link(&mut agent).is_ok());
        increase(&mut agent, modules["app"]);
        assert_eq!(agent.heap().module_count(), 2);

        decrease(&mut agent, modules["app"]);
        assert!(!agent.is_module_loaded("app"));
        assert!(!agent.is_module_loaded("addon"));
        assert_eq!(agent.heap().module_count(), 0);
        assert_eq!(agent.host_hooks().unloaded(), ["addon"]);

        assert!(!remove_module(&mut agent, modules["addon"]));
        assert_eq!(agent.host_hooks().unloaded(), ["addon"]);
        assert!(decrease_register_counts(&mut agent, modules["app"], &mut AHashSet::default()).is_err());
    }

    #[test]
    fn explicit_removal_then_decrease_is_a_no_op() {
        let (mut agent, modules) = agent_with(&[
            ("app", ModuleSource::ecmascript().dynamic().import("addon")),
            ("addon", ModuleSource::native("libaddon.so").dynamic()),
        ]);
        assert!(modules["app"].link(&mut agent).is_ok());
        increase(&mut agent, modules["app"]);
        assert!(remove_module(&mut agent, modules["addon"]));
        decrease(&mut agent, modules["app"]);
        assert_eq!(agent.host_hooks().unloaded(), ["addon"]);
        assert_eq!(agent.heap().module_count(), 0);
    }

    #[test]
    #[should_panic(expected = "already zero")]
    fn decreasing_a_zero_count_panics() {
        let (mut agent, modules) = agent_with(&[("a", ModuleSource::ecmascript().dynamic())]);
        let _ = decrease_register_counts(&mut agent, modules["a"], &mut AHashSet::default());
    }

    #[test]
    fn revise_pins_dynamic_modules() {
        let (mut agent, modules) = agent_with(&[("a", ModuleSource::ecmascript().dynamic())]);
        revise_loaded_module_count(&mut agent, "a");
        revise_loaded_module_count(&mut agent, "not-loaded");
        assert_eq!(agent[modules["a"]].loading_type(), LoadingType::Stable);
    }
}
