//! Storage policy trait
//!
//! A storage policy is the backing store of a container. The container picks
//! its policy through a type parameter, so every call is statically
//! dispatched.

use std::fmt::Debug;
use vessel_core::{NamedValue, Result};

/// Backing store for the named values of a container
///
/// # Ordering
///
/// Every policy keeps values in insertion order. Upserting an existing name
/// replaces the value in place and keeps its position.
///
/// # Duplicate Names
///
/// `set` never creates a duplicate, but `push` appends unconditionally.
/// When duplicates exist, lookups resolve to the first entry in order and
/// `remove` deletes every entry with the name.
///
/// # Thread Safety
///
/// Policies are plain data. The container wraps them in its lock.
pub trait StoragePolicy: Default + Debug + Send + Sync + 'static {
    /// Short name used in logs
    const NAME: &'static str;

    /// Build a store from values in order, keeping any duplicates
    fn from_values(values: Vec<NamedValue>) -> Self;

    /// Consume the store, returning values in order
    fn into_values(self) -> Vec<NamedValue>;

    /// Insert or replace the first value with the same name
    fn set(&mut self, value: NamedValue);

    /// Append without looking for an existing name
    fn push(&mut self, value: NamedValue);

    /// First value with the given name
    fn get(&self, key: &str) -> Option<&NamedValue>;

    /// Mutable access to the first value with the given name
    fn get_mut(&mut self, key: &str) -> Option<&mut NamedValue>;

    /// Check whether a value with the given name exists
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove every value with the given name; false if none existed
    fn remove(&mut self, key: &str) -> bool;

    /// Remove all values
    fn clear(&mut self);

    /// Values in insertion order
    fn as_slice(&self) -> &[NamedValue];

    /// Reserve room for `additional` more values
    ///
    /// # Errors
    /// Returns `MemoryAllocationFailed` if the allocation cannot be satisfied.
    fn try_reserve(&mut self, additional: usize) -> Result<()>;

    /// Bytes used by the policy's own bookkeeping, excluding values
    fn overhead(&self) -> usize;

    /// Number of stored values, duplicates included
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True when nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate values in insertion order
    fn iter(&self) -> std::slice::Iter<'_, NamedValue> {
        self.as_slice().iter()
    }
}
