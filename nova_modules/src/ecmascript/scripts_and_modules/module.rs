// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::{
    fmt,
    ops::{Index, IndexMut},
};

use crate::{
    ecmascript::execution::{Agent, HostHooks},
    heap::Heap,
};

pub mod module_semantics;

use module_semantics::cyclic_module_records::ModuleRecord;

/// Handle to a module record in the module heap.
///
/// Slots are never reused: once a module is removed from the heap, every
/// `ModuleId` pointing at it stays dangling and lookups through
/// [`Heap::get`] return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Creates a module identifier from a usize.
    ///
    /// ## Panics
    /// If the given index is greater than `u32::MAX`.
    pub(crate) const fn from_index(value: usize) -> Self {
        assert!(value <= u32::MAX as usize);
        Self(value as u32)
    }

    pub(crate) const fn into_index(self) -> usize {
        self.0 as usize
    }

    pub const fn into_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<H: HostHooks> Index<ModuleId> for Agent<H> {
    type Output = ModuleRecord<H::Value>;

    fn index(&self, index: ModuleId) -> &Self::Output {
        &self.heap[index]
    }
}

impl<H: HostHooks> IndexMut<ModuleId> for Agent<H> {
    fn index_mut(&mut self, index: ModuleId) -> &mut Self::Output {
        &mut self.heap[index]
    }
}

impl<V> Index<ModuleId> for Heap<V> {
    type Output = ModuleRecord<V>;

    fn index(&self, index: ModuleId) -> &Self::Output {
        match self.modules.get(index.into_index()) {
            Some(Some(record)) => record,
            Some(None) => panic!("ModuleId {index} slot empty"),
            None => panic!("ModuleId {index} out of bounds"),
        }
    }
}

impl<V> IndexMut<ModuleId> for Heap<V> {
    fn index_mut(&mut self, index: ModuleId) -> &mut Self::Output {
        match self.modules.get_mut(index.into_index()) {
            Some(Some(record)) => record,
            Some(None) => panic!("ModuleId {index} slot empty"),
            None => panic!("ModuleId {index} out of bounds"),
        }
    }
}
