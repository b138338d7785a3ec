// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostics for import cycles in linked module graphs.

use tracing::{error, warn};

use crate::ecmascript::{
    execution::{Agent, HostHooks},
    scripts_and_modules::module::ModuleId,
};

/// Walks the loaded modules reachable from `entry` and reports every import
/// chain that leads back to `entry`. With `print_other_circular` cycles that
/// do not pass through `entry` are reported as well.
///
/// Returns the chains as lists of record names, each starting and ending
/// with the same module.
///
/// Every import path is walked separately, so the cost is exponential in
/// the number of diamonds between `entry` and the leaves.
pub fn check_circular_imports<H: HostHooks>(
    agent: &Agent<H>,
    entry: ModuleId,
    print_other_circular: bool,
) -> Vec<Vec<String>> {
    let mut chains = vec![];
    if !agent.heap.contains(entry) {
        return chains;
    }
    let mut reference_list = vec![entry];
    search_circular_imports(
        agent,
        entry,
        &mut reference_list,
        &mut chains,
        print_other_circular,
    );
    chains
}

fn search_circular_imports<H: HostHooks>(
    agent: &Agent<H>,
    module: ModuleId,
    reference_list: &mut Vec<ModuleId>,
    chains: &mut Vec<Vec<String>>,
    print_other_circular: bool,
) {
    let Some(record) = agent.heap.get(module) else {
        return;
    };
    for dependency in record.loaded_modules() {
        if !agent.heap.contains(dependency) {
            continue;
        }
        let Some(start) = reference_list.iter().position(|m| *m == dependency) else {
            reference_list.push(dependency);
            search_circular_imports(agent, dependency, reference_list, chains, print_other_circular);
            reference_list.pop();
            continue;
        };
        let through_entry = start == 0;
        if !through_entry && !print_other_circular {
            continue;
        }
        let chain: Vec<String> = reference_list[start..]
            .iter()
            .chain(Some(&dependency))
            .map(|m| agent[*m].name.clone())
            .collect();
        if through_entry {
            error!(target: "nova_modules::diagnostics", chain = %chain.join(" -> "), "circular import");
        } else {
            warn!(target: "nova_modules::diagnostics", chain = %chain.join(" -> "), "other circular import");
        }
        chains.push(chain);
    }
}
