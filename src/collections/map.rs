//! Append-oriented hash map keyed by precomputed 64-bit hashes.
//!
//! The bucket count is fixed at construction and never grows; each bucket is a
//! [`RawVec`] of `(key, value)` pairs searched linearly. Keys are already hashes,
//! so the bucket is simply `key % bucket_count`.

use super::vec::RawVec;

/// Bucket count used by [`RawMap::new`].
pub const DEFAULT_BUCKETS: usize = 128;

/// Hash map over `u64` keys with a fixed number of buckets.
#[derive(Debug, Clone)]
pub struct RawMap<V> {
    buckets: RawVec<RawVec<(u64, V)>>,
    len: usize,
}

impl<V> RawMap<V> {
    /// Create a map with [`DEFAULT_BUCKETS`] buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Create a map with `bucket_count` buckets (at least one).
    pub fn with_buckets(bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        let mut buckets = RawVec::with_capacity(bucket_count);
        for _ in 0..bucket_count {
            buckets.push(RawVec::new());
        }
        Self { buckets, len: 0 }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets chosen at construction.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_index(&self, key: u64) -> usize {
        (key % self.buckets.len() as u64) as usize
    }

    /// Look up the value stored under `key`.
    pub fn find(&self, key: u64) -> Option<&V> {
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Look up the value stored under `key` for mutation.
    pub fn find_mut(&mut self, key: u64) -> Option<&mut V> {
        let index = self.bucket_index(key);
        self.buckets[index]
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if `key` has an entry.
    pub fn contains_key(&self, key: u64) -> bool {
        self.find(key).is_some()
    }

    /// Insert or update the entry for `key`, returning the previous value.
    pub fn emplace(&mut self, key: u64, value: V) -> Option<V> {
        if let Some(existing) = self.find_mut(key) {
            return Some(std::mem::replace(existing, value));
        }
        let index = self.bucket_index(key);
        self.buckets[index].push((key, value));
        self.len += 1;
        None
    }

    /// Insert the value produced by `make` only if `key` is absent.
    ///
    /// Returns true if a new entry was created. `make` is not called otherwise.
    pub fn insert_with<F>(&mut self, key: u64, make: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains_key(key) {
            return false;
        }
        let index = self.bucket_index(key);
        self.buckets[index].push((key, make()));
        self.len += 1;
        true
    }

    /// Iterate over all entries in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|(k, v)| (*k, v)))
    }
}

impl<V> Default for RawMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emplace_and_find() {
        let mut map = RawMap::new();
        assert_eq!(map.emplace(1, "one"), None);
        assert_eq!(map.emplace(2, "two"), None);

        assert_eq!(map.find(1), Some(&"one"));
        assert_eq!(map.find(2), Some(&"two"));
        assert_eq!(map.find(3), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_emplace_updates_existing_key() {
        let mut map = RawMap::new();
        map.emplace(5, 10);
        assert_eq!(map.emplace(5, 20), Some(10));
        assert_eq!(map.find(5), Some(&20));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_colliding_keys_share_a_bucket() {
        let mut map = RawMap::with_buckets(4);
        map.emplace(1, 'a');
        map.emplace(5, 'b');
        map.emplace(9, 'c');

        assert_eq!(map.find(1), Some(&'a'));
        assert_eq!(map.find(5), Some(&'b'));
        assert_eq!(map.find(9), Some(&'c'));
        assert_eq!(map.len(), 3);
        assert_eq!(map.bucket_count(), 4);
    }

    #[test]
    fn test_insert_with_keeps_first_value() {
        let mut map = RawMap::new();
        assert!(map.insert_with(7, || "first"));
        assert!(!map.insert_with(7, || panic!("must not be called for an existing key")));
        assert_eq!(map.find(7), Some(&"first"));
    }

    #[test]
    fn test_iter_visits_every_entry() {
        let mut map = RawMap::with_buckets(3);
        for key in 0..50u64 {
            map.emplace(key, key * 2);
        }

        let mut seen: Vec<(u64, u64)> = map.iter().map(|(k, v)| (k, *v)).collect();
        seen.sort_unstable();
        assert_eq!(seen.len(), 50);
        assert!(seen.iter().all(|(k, v)| *v == k * 2));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map = RawMap::new();
        map.emplace(1, String::from("x"));
        let mut copy = map.clone();
        copy.emplace(1, String::from("y"));

        assert_eq!(map.find(1).map(String::as_str), Some("x"));
        assert_eq!(copy.find(1).map(String::as_str), Some("y"));
    }
}
