// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [10.4.6 Module Namespace Exotic Objects](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)

use crate::ecmascript::{
    execution::{Agent, HostHooks},
    scripts_and_modules::module::ModuleId,
};

use super::{
    abstract_module_records::{ResolveSet, ResolvedBinding},
    module_error::ModuleResult,
    source_text_module_records::{get_exported_names, resolve_export},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNamespace {
    /// ### \[\[Module]]
    module: ModuleId,
    /// ### \[\[Exports]]
    ///
    /// Sorted in code unit order.
    exports: Box<[String]>,
}

impl ModuleNamespace {
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.exports
            .binary_search_by(|export| export.as_str().cmp(name))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

/// ### [16.2.1.12 GetModuleNamespace ( module )](https://tc39.es/ecma262/#sec-getmodulenamespace)
///
/// The namespace is created on first request and cached on the module
/// record. Native and CommonJS modules drop the cached namespace when they
/// publish their export names.
pub fn get_module_namespace<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
) -> ModuleResult<&ModuleNamespace, H::Value> {
    agent.check_module(module)?;
    // 3. Let namespace be module.[[Namespace]].
    let namespace = match agent[module].namespace.take() {
        Some(namespace) => namespace,
        // 4. If namespace is EMPTY, then
        None => {
            // a. Let exportedNames be module.GetExportedNames().
            let exported_names = get_exported_names(agent, module, &mut vec![])?;
            // b. Let unambiguousNames be a new empty List.
            let mut unambiguous_names = Vec::with_capacity(exported_names.len());
            // c. For each element name of exportedNames, do
            for name in exported_names {
                // i. Let resolution be module.ResolveExport(name).
                let resolution = resolve_export(agent, module, &name, &mut ResolveSet::new())?;
                // ii. If resolution is a ResolvedBinding Record, append name to unambiguousNames.
                if let Some(ResolvedBinding::Resolved { .. }) = resolution {
                    unambiguous_names.push(name);
                }
            }
            // d. Set namespace to ModuleNamespaceCreate(module, unambiguousNames).
            unambiguous_names.sort();
            ModuleNamespace {
                module,
                exports: unambiguous_names.into_boxed_slice(),
            }
        }
    };
    // 5. Return namespace.
    Ok(agent[module].namespace.insert(namespace))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ModuleSource, test_host::agent_with};

    #[test]
    fn namespace_is_sorted_and_drops_ambiguous_names() {
        let (mut agent, modules) = agent_with(&[
            (
                "main",
                ModuleSource::ecmascript()
                    .export_local("zeta", "zeta")
                    .export_local("alpha", "alpha")
                    .export_star("left")
                    .export_star("right"),
            ),
            (
                "left",
                ModuleSource::ecmascript()
                    .export_local("shared", "l")
                    .export_local("mid", "mid"),
            ),
            ("right", ModuleSource::ecmascript().export_local("shared", "r")),
        ]);
        let namespace = get_module_namespace(&mut agent, modules["main"]).cloned();
        let namespace = namespace.ok();
        assert_eq!(
            namespace.as_ref().map(ModuleNamespace::exports),
            Some(&["alpha".to_owned(), "mid".to_owned(), "zeta".to_owned()][..])
        );
        assert!(namespace.is_some_and(|namespace| namespace.has_export("mid")));
    }

    #[test]
    fn namespace_is_cached() {
        let (mut agent, modules) = agent_with(&[("a", ModuleSource::ecmascript().export_local("x", "x"))]);
        assert!(get_module_namespace(&mut agent, modules["a"]).is_ok());
        assert!(agent[modules["a"]].namespace().is_some());
        assert_eq!(
            get_module_namespace(&mut agent, modules["a"]).map(|ns| ns.len()).ok(),
            Some(1)
        );
    }
}
