//! Linear-scan storage
//!
//! A plain vector of named values. Every lookup scans by name, which beats
//! hashing for the small containers that make up most traffic (under ~100
//! entries) and carries no bookkeeping beyond the vector itself.

use crate::policy::StoragePolicy;
use std::mem;
use vessel_core::{NamedValue, Result};

/// Insertion-ordered vector with O(n) lookups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearStorage {
    values: Vec<NamedValue>,
}

impl LinearStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name == key)
    }
}

impl StoragePolicy for LinearStorage {
    const NAME: &'static str = "linear";

    fn from_values(values: Vec<NamedValue>) -> Self {
        Self { values }
    }

    fn into_values(self) -> Vec<NamedValue> {
        self.values
    }

    fn set(&mut self, value: NamedValue) {
        match self.position(&value.name) {
            Some(pos) => self.values[pos] = value,
            None => self.values.push(value),
        }
    }

    fn push(&mut self, value: NamedValue) {
        self.values.push(value);
    }

    fn get(&self, key: &str) -> Option<&NamedValue> {
        self.values.iter().find(|v| v.name == key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut NamedValue> {
        self.values.iter_mut().find(|v| v.name == key)
    }

    fn remove(&mut self, key: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v.name != key);
        self.values.len() != before
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn as_slice(&self) -> &[NamedValue] {
        &self.values
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.values.try_reserve(additional)?;
        Ok(())
    }

    fn overhead(&self) -> usize {
        (self.values.capacity() - self.values.len()) * mem::size_of::<NamedValue>()
    }
}
