//! Append-only name registries for scope and type hashes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::ser::{Serialize, Serializer};

use crate::collections::{RawMap, RawString, DEFAULT_BUCKETS};

/// Hash of the global scope at the bottom of every scope stack.
pub const GLOBAL_SCOPE_HASH: u64 = 0;

/// Registered name of the global scope.
pub const GLOBAL_SCOPE_NAME: &str = "global";

/// Hash a scope name or type name.
///
/// Stable for the lifetime of the process, which is all the trace format needs.
pub fn hash_name(name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish()
}

/// Insert-if-absent mapping from hash to display name.
///
/// The first name registered for a hash wins; later registrations are ignored.
#[derive(Debug, Clone)]
pub struct Registry<V> {
    entries: RawMap<V>,
}

/// Scope names, copied out of the caller's strings.
pub type ScopeRegistry = Registry<RawString>;

/// Type names as reported by [`std::any::type_name`].
pub type TypeRegistry = Registry<&'static str>;

impl<V> Registry<V> {
    /// Create an empty registry with [`DEFAULT_BUCKETS`] buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Create an empty registry with a fixed bucket count.
    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            entries: RawMap::with_buckets(buckets),
        }
    }

    /// Register the value built by `make` unless `hash` already has an entry.
    ///
    /// Returns true if the entry is new.
    pub fn register_with<F>(&mut self, hash: u64, make: F) -> bool
    where
        F: FnOnce() -> V,
    {
        self.entries.insert_with(hash, make)
    }

    /// Returns true if `hash` has an entry.
    pub fn contains(&self, hash: u64) -> bool {
        self.entries.contains_key(hash)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fixed bucket count.
    pub fn bucket_count(&self) -> usize {
        self.entries.bucket_count()
    }
}

impl<V: AsRef<str>> Registry<V> {
    /// Name registered for `hash`.
    pub fn get(&self, hash: u64) -> Option<&str> {
        self.entries.find(hash).map(AsRef::as_ref)
    }

    /// Iterate over `(hash, name)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.entries.iter().map(|(hash, name)| (hash, name.as_ref()))
    }
}

impl Registry<RawString> {
    /// Register `name` under `hash`, copying it only if the entry is new.
    pub fn register(&mut self, hash: u64, name: &str) -> bool {
        self.register_with(hash, || RawString::from(name))
    }
}

impl Registry<&'static str> {
    /// Register `name` under `hash`.
    pub fn register(&mut self, hash: u64, name: &'static str) -> bool {
        self.register_with(hash, || name)
    }
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes as a map from hash to name; serde_json writes the keys as decimal strings.
impl<V: AsRef<str>> Serialize for Registry<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
