// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)

use tracing::{debug, trace, warn};

use crate::ecmascript::{
    execution::{Agent, HostHooks},
    scripts_and_modules::module::ModuleId,
};

use super::{
    abstract_module_records::{BindingName, ResolveSet, ResolvedBinding},
    circular_imports::check_circular_imports,
    cyclic_module_records::{ModuleStatus, get_imported_module, get_requested_module},
    module_environment::{Binding, ModuleEnvironment},
    module_error::{ModuleError, ModuleResult, ResolutionFailure},
    module_namespace::get_module_namespace,
    source_text_module_records::{ModuleKind, resolve_export},
};

impl ModuleId {
    /// ### [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
    ///
    /// Links this module and everything it transitively requests. On
    /// failure every module visited by this call is rolled back to
    /// Uninstantiated and the error is returned.
    pub fn link<H: HostHooks>(self, agent: &mut Agent<H>) -> ModuleResult<(), H::Value> {
        agent.check_module(self)?;
        // 1. Assert: module.[[Status]] is one of unlinked, linked,
        //    evaluating-async, or evaluated.
        let status = agent[self].status;
        if matches!(status, ModuleStatus::Instantiating | ModuleStatus::Evaluating) {
            return Err(ModuleError::InvalidStatus {
                module: agent[self].name.clone(),
                status,
            });
        }
        // 2. Let stack be a new empty List.
        let mut stack = Vec::with_capacity(8);
        // 3. Let result be Completion(InnerModuleLinking(module, stack, 0)).
        let result = inner_module_linking(agent, self, &mut stack, 0);
        // 4. If result is an abrupt completion, then
        if let Err(error) = result {
            // a. For each Cyclic Module Record m of stack, do
            for m in stack {
                // i. Assert: m.[[Status]] is linking.
                // ii. Set m.[[Status]] to unlinked.
                agent[m].set_uninstantiated();
            }
            // b. Assert: module.[[Status]] is unlinked.
            // c. Return ? result.
            warn!(target: "nova_modules::linking", module = %agent[self].name, %error, "link failed");
            return Err(error);
        }
        // 5. Assert: module.[[Status]] is one of linked, evaluating-async, or evaluated.
        debug_assert!(agent[self].status >= ModuleStatus::Instantiated);
        // 6. Assert: stack is empty.
        debug_assert!(stack.is_empty());
        if agent.options.check_circular_imports {
            let print_other_circular = agent.options.print_other_circular;
            check_circular_imports(agent, self, print_other_circular);
        }
        // 7. Return unused.
        Ok(())
    }
}

/// ### [16.2.1.6.1.1.1 InnerModuleLinking ( module, stack, index )](https://tc39.es/ecma262/#sec-InnerModuleLinking)
pub(crate) fn inner_module_linking<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    stack: &mut Vec<ModuleId>,
    mut index: u32,
) -> ModuleResult<u32, H::Value> {
    // 1. If module is not a Cyclic Module Record, then
    if !agent[module].is_cyclic_module_record() {
        // a. Perform ? module.Link().
        if agent[module].status == ModuleStatus::Uninstantiated {
            agent[module].set_instantiated();
        }
        // b. Return index.
        return Ok(index);
    }
    // 2. If module.[[Status]] is one of linking, linked, evaluating-async, or
    //    evaluated, then
    if agent[module].status != ModuleStatus::Uninstantiated {
        // a. Return index.
        return Ok(index);
    }
    // 3. Assert: module.[[Status]] is unlinked.
    // 4. Set module.[[Status]] to linking.
    // 5. Let moduleIndex be index.
    // 6. Set module.[[DFSAncestorIndex]] to index.
    agent[module].set_instantiating(index);
    trace!(target: "nova_modules::linking", module = %agent[module].name, index, "instantiating");
    // 7. Set index to index + 1.
    index += 1;
    // 8. Append module to stack.
    stack.push(module);
    // 9. For each ModuleRequest Record request of module.[[RequestedModules]], do
    for request_index in 0..agent[module].requested_modules.len() {
        // a. Let requiredModule be GetImportedModule(module, request).
        let required_module = get_requested_module(agent, module, request_index)?;
        // b. Set index to ? InnerModuleLinking(requiredModule, stack, index).
        index = inner_module_linking(agent, required_module, stack, index)?;
        // c. If requiredModule is a Cyclic Module Record, then
        let required = &agent[required_module];
        if required.is_cyclic_module_record() {
            // i. Assert: requiredModule.[[Status]] is one of linking, linked,
            //    evaluating-async, or evaluated.
            debug_assert_ne!(required.status, ModuleStatus::Uninstantiated);
            // ii. Assert: requiredModule.[[Status]] is linking if and only if
            //     stack contains requiredModule.
            debug_assert_eq!(
                required.status == ModuleStatus::Instantiating,
                stack.contains(&required_module)
            );
            // iii. If requiredModule.[[Status]] is linking, then
            if required.status == ModuleStatus::Instantiating {
                // 1. Set module.[[DFSAncestorIndex]] to
                //    min(module.[[DFSAncestorIndex]], requiredModule.[[DFSAncestorIndex]]).
                let ancestor_index = required.dfs_ancestor_index;
                agent[module].lower_dfs_ancestor_index(ancestor_index);
            }
        }
    }
    // 10. Perform ? module.InitializeEnvironment().
    initialize_environment(agent, module)?;
    // 11. Assert: module occurs exactly once in stack.
    // 12. Assert: module.[[DFSAncestorIndex]] ≤ moduleIndex.
    // 13. If module.[[DFSAncestorIndex]] = moduleIndex, then
    if agent[module].is_component_root() {
        // a. Let done be false.
        // b. Repeat, while done is false,
        // i. Let requiredModule be the last element of stack.
        // ii. Remove the last element of stack.
        while let Some(required_module) = stack.pop() {
            // iii. Assert: requiredModule is a Cyclic Module Record.
            // iv. Set requiredModule.[[Status]] to linked.
            agent[required_module].set_instantiated();
            debug!(target: "nova_modules::linking", module = %agent[required_module].name, "instantiated");
            // v. If requiredModule and module are the same Module Record, set done to true.
            if required_module == module {
                break;
            }
        }
    }
    // 14. Return index.
    Ok(index)
}

/// ### [16.2.1.7.3.1 InitializeEnvironment ( )](https://tc39.es/ecma262/#sec-source-text-module-record-initialize-environment)
///
/// Checks that every indirect export resolves and binds every import entry
/// to the binding it resolves to.
fn initialize_environment<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
) -> ModuleResult<(), H::Value> {
    let ModuleKind::EcmaScript(source) = &agent[module].kind else {
        return Ok(());
    };
    let indirect_export_entries = source.indirect_export_entries.clone();
    let import_entries = source.import_entries.clone();
    let local_names: Vec<String> = source
        .local_export_entries
        .iter()
        .map(|e| e.local_name.clone())
        .collect();

    // 1. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
    for e in indirect_export_entries {
        // a. Assert: e.[[ExportName]] is not null.
        // b. Let resolution be module.ResolveExport(e.[[ExportName]]).
        let resolution = resolve_export(agent, module, &e.export_name, &mut ResolveSet::new())?;
        // c. If resolution is either null or ambiguous, throw a SyntaxError exception.
        let failure = match resolution {
            Some(ResolvedBinding::Resolved { .. }) => continue,
            Some(ResolvedBinding::Ambiguous) => ResolutionFailure::Ambiguous,
            None => ResolutionFailure::NotFound,
        };
        return Err(ModuleError::UnresolvedIndirectExport {
            specifier: e.module_request,
            export_name: e.import_name.unwrap_or(e.export_name),
            referrer: agent[module].name.clone(),
            failure,
        });
    }

    // 2. Assert: All named exports from module are resolvable.
    // 5. Let env be NewModuleEnvironment(realm.[[GlobalEnv]]).
    let mut env = ModuleEnvironment::with_capacity(local_names.len() + import_entries.len());
    for local_name in local_names {
        env.create_binding(local_name, Binding::Local);
    }
    // 7. For each ImportEntry Record in of module.[[ImportEntries]], do
    for entry in import_entries {
        // a. Let importedModule be GetImportedModule(module, in.[[ModuleRequest]]).
        let imported_module = get_imported_module(agent, module, &entry.module_request)?;
        let binding = match &entry.import_name {
            // b. If in.[[ImportName]] is namespace-object, then
            None => {
                // i. Let namespace be GetModuleNamespace(importedModule).
                get_module_namespace(agent, imported_module)?;
                // ii. Perform ! env.CreateImmutableBinding(in.[[LocalName]], true).
                // iii. Perform ! env.InitializeBinding(in.[[LocalName]], namespace).
                Binding::Namespace(imported_module)
            }
            // c. Else,
            Some(import_name) => {
                // i. Let resolution be importedModule.ResolveExport(in.[[ImportName]]).
                let resolution =
                    resolve_export(agent, imported_module, import_name, &mut ResolveSet::new())?;
                // ii. If resolution is either null or ambiguous, throw a SyntaxError exception.
                let (target, binding_name) = match resolution {
                    Some(ResolvedBinding::Resolved {
                        module,
                        binding_name,
                    }) => (module, binding_name),
                    unresolved => {
                        let failure = if unresolved.is_some() {
                            ResolutionFailure::Ambiguous
                        } else {
                            ResolutionFailure::NotFound
                        };
                        return Err(ModuleError::UnresolvedImport {
                            specifier: entry.module_request,
                            export_name: import_name.clone(),
                            referrer: agent[module].name.clone(),
                            failure,
                        });
                    }
                };
                // iii. If resolution.[[BindingName]] is namespace, then
                if binding_name == BindingName::Namespace {
                    // 1. Let namespace be GetModuleNamespace(resolution.[[Module]]).
                    get_module_namespace(agent, target)?;
                    Binding::Namespace(target)
                } else {
                    // iv. Else,
                    // 1. Perform env.CreateImportBinding(in.[[LocalName]],
                    //    resolution.[[Module]], resolution.[[BindingName]]).
                    Binding::Import {
                        module: target,
                        binding_name,
                    }
                }
            }
        };
        env.create_binding(entry.local_name, binding);
    }
    agent[module].environment = Some(env);
    Ok(())
}
