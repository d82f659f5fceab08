//! Hash-indexed storage
//!
//! Values stay in an insertion-ordered vector; an FxHashMap maps each name to
//! the slot of its first occurrence. Lookups are O(1) on average and
//! iteration order is identical to [`LinearStorage`](crate::LinearStorage).
//!
//! `remove` is O(n): every slot above the removed one shifts down by one and
//! the index entries pointing there must follow.

use crate::policy::StoragePolicy;
use rustc_hash::FxHashMap;
use std::mem;
use vessel_core::{NamedValue, Result};

/// Insertion-ordered vector with a name → slot index
#[derive(Debug, Clone, Default)]
pub struct IndexedStorage {
    values: Vec<NamedValue>,
    index: FxHashMap<String, usize>,
}

impl IndexedStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (slot, value) in self.values.iter().enumerate() {
            self.index.entry(value.name.clone()).or_insert(slot);
        }
    }
}

impl StoragePolicy for IndexedStorage {
    const NAME: &'static str = "indexed";

    fn from_values(values: Vec<NamedValue>) -> Self {
        let mut store = Self {
            values,
            index: FxHashMap::default(),
        };
        store.rebuild_index();
        store
    }

    fn into_values(self) -> Vec<NamedValue> {
        self.values
    }

    fn set(&mut self, value: NamedValue) {
        match self.index.get(&value.name) {
            Some(&slot) => self.values[slot] = value,
            None => self.push(value),
        }
    }

    fn push(&mut self, value: NamedValue) {
        let slot = self.values.len();
        self.index.entry(value.name.clone()).or_insert(slot);
        self.values.push(value);
    }

    fn get(&self, key: &str) -> Option<&NamedValue> {
        self.index.get(key).map(|&slot| &self.values[slot])
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut NamedValue> {
        match self.index.get(key) {
            Some(&slot) => self.values.get_mut(slot),
            None => None,
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(slot) = self.index.remove(key) else {
            return false;
        };
        self.values.remove(slot);

        if self.values[slot..].iter().any(|v| v.name == key) {
            // appended duplicates
            self.values.retain(|v| v.name != key);
            self.rebuild_index();
        } else {
            for entry in self.index.values_mut() {
                if *entry > slot {
                    *entry -= 1;
                }
            }
        }
        true
    }

    fn clear(&mut self) {
        self.values.clear();
        self.index.clear();
    }

    fn as_slice(&self) -> &[NamedValue] {
        &self.values
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.values.try_reserve(additional)?;
        self.index.try_reserve(additional)?;
        Ok(())
    }

    fn overhead(&self) -> usize {
        let spare = (self.values.capacity() - self.values.len()) * mem::size_of::<NamedValue>();
        let index = self.index.capacity() * (mem::size_of::<String>() + mem::size_of::<usize>())
            + self.index.keys().map(String::capacity).sum::<usize>();
        spare + index
    }
}
