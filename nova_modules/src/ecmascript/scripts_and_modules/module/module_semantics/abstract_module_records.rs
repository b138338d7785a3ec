// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.4 Abstract Module Records](https://tc39.es/ecma262/#sec-abstract-module-records)

use crate::ecmascript::scripts_and_modules::module::ModuleId;

/// ### \[\[BindingName]]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingName {
    /// A local binding of the target module.
    Local(String),
    /// The namespace object of the target module.
    Namespace,
    /// An export of a native or CommonJS module. Its existence is only known
    /// after the module has executed.
    Deferred(String),
}

/// ### ResolvedBinding Record
///
/// The successful result of ResolveExport. A failed resolution is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBinding {
    Resolved {
        /// ### \[\[Module]]
        module: ModuleId,
        /// ### \[\[BindingName]]
        binding_name: BindingName,
    },
    /// The name is exported by several star exports that disagree.
    Ambiguous,
}

impl ResolvedBinding {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ResolvedBinding::Ambiguous)
    }
}

/// The resolveSet of ResolveExport: `(module, export name)` pairs already on
/// the current resolution chain.
#[derive(Debug, Default, Clone)]
pub struct ResolveSet(Vec<(ModuleId, String)>);

impl ResolveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the pair. Returns false if it was already present, which
    /// means the request is circular.
    pub(crate) fn insert(&mut self, module: ModuleId, export_name: &str) -> bool {
        if self
            .0
            .iter()
            .any(|(m, name)| *m == module && name == export_name)
        {
            return false;
        }
        self.0.push((module, export_name.to_owned()));
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolve_set_detects_repeats() {
        let mut set = ResolveSet::new();
        let a = ModuleId::from_index(0);
        let b = ModuleId::from_index(1);
        assert!(set.insert(a, "x"));
        assert!(set.insert(b, "x"));
        assert!(set.insert(a, "y"));
        assert!(!set.insert(a, "x"));
        assert_eq!(set.len(), 3);
    }
}
