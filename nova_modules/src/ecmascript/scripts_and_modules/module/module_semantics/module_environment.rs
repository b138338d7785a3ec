// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [9.1.1.5 Module Environment Records](https://tc39.es/ecma262/#sec-module-environment-records)

use ahash::AHashMap;

use crate::ecmascript::scripts_and_modules::module::ModuleId;

use super::abstract_module_records::BindingName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A binding declared by the module itself.
    Local,
    /// ### CreateImportBinding ( N, M, N2 )
    ///
    /// An indirect binding to `binding_name` in `module`.
    Import {
        module: ModuleId,
        binding_name: BindingName,
    },
    /// An immutable binding initialized to the namespace of `module`.
    Namespace(ModuleId),
}

/// Local binding names of a module mapped to what they resolve to.
#[derive(Debug, Default, Clone)]
pub struct ModuleEnvironment {
    bindings: AHashMap<String, Binding>,
}

impl ModuleEnvironment {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: AHashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn create_binding(&mut self, name: String, binding: Binding) {
        self.bindings.insert(name, binding);
    }

    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(name, binding)| (name.as_str(), binding))
    }
}
