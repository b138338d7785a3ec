// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ahash::AHashMap;

use crate::ecmascript::scripts_and_modules::module::{
    ModuleId,
    module_semantics::{cyclic_module_records::ModuleRecord, source_text_module_records::ModuleSource},
};

/// The module cache: every module record known to an agent, keyed both by
/// [`ModuleId`] and by record name.
#[derive(Debug)]
pub struct Heap<V> {
    pub(crate) modules: Vec<Option<ModuleRecord<V>>>,
    pub(crate) module_map: AHashMap<String, ModuleId>,
}

impl<V> Default for Heap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Heap<V> {
    pub fn new() -> Self {
        Self {
            modules: Vec::with_capacity(64),
            module_map: AHashMap::with_capacity(64),
        }
    }

    /// Allocates a new module record for `name` and registers it in the
    /// module map. An existing record with the same name is shadowed.
    pub(crate) fn create_module(&mut self, name: String, source: ModuleSource) -> ModuleId {
        let id = ModuleId::from_index(self.modules.len());
        self.module_map.insert(name.clone(), id);
        self.modules.push(Some(ModuleRecord::new(name, source)));
        id
    }

    pub fn get(&self, module: ModuleId) -> Option<&ModuleRecord<V>> {
        self.modules.get(module.into_index())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, module: ModuleId) -> Option<&mut ModuleRecord<V>> {
        self.modules.get_mut(module.into_index())?.as_mut()
    }

    pub fn contains(&self, module: ModuleId) -> bool {
        self.get(module).is_some()
    }

    /// Looks up a module by record name.
    pub fn lookup(&self, name: &str) -> Option<ModuleId> {
        self.module_map.get(name).copied()
    }

    /// Number of live module records.
    pub fn module_count(&self) -> usize {
        self.modules.iter().filter(|slot| slot.is_some()).count()
    }

    /// Iterates over all live module records.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &ModuleRecord<V>)> {
        self.modules
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| Some((ModuleId::from_index(index), slot.as_ref()?)))
    }

    /// Takes the record out of its slot and forgets its name. Returns `None`
    /// if the module was already removed.
    pub(crate) fn remove_module(&mut self, module: ModuleId) -> Option<ModuleRecord<V>> {
        let record = self.modules.get_mut(module.into_index())?.take()?;
        if self.module_map.get(record.name()) == Some(&module) {
            self.module_map.remove(record.name());
        }
        Some(record)
    }
}
