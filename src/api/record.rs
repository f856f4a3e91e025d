//! Event records and type identity.

use serde::{Deserialize, Serialize};

use crate::core::registry::hash_name;
use crate::util::time::Timestamp;

/// One allocation or deallocation event.
///
/// Serialized with the short field names of the trace format:
/// `ts`, `sh`, `th`, `s`, `l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ts")]
    timestamp: Timestamp,
    #[serde(rename = "sh")]
    scope_hash: u64,
    #[serde(rename = "th")]
    type_hash: u64,
    #[serde(rename = "s")]
    size: usize,
    #[serde(rename = "l")]
    location: usize,
}

impl Record {
    /// Build a record.
    pub const fn new(
        scope_hash: u64,
        type_hash: u64,
        size: usize,
        location: usize,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            timestamp,
            scope_hash,
            type_hash,
            size,
            location,
        }
    }

    /// Hash of the scope active when the event happened.
    pub fn scope_hash(&self) -> u64 {
        self.scope_hash
    }

    /// Hash of the element type.
    pub fn type_hash(&self) -> u64 {
        self.type_hash
    }

    /// Total size of the request in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Address of the block. Identity only.
    pub fn location(&self) -> usize {
        self.location
    }

    /// Time of the event.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Identity of an element type as seen by the profiler.
///
/// Building one is free; the name hash is computed on demand. The recording path
/// resolves it through a per-thread cache instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    name: &'static str,
    size: usize,
}

impl TypeInfo {
    /// Identity of `T`.
    pub fn of<T>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
        }
    }

    /// Hash of the type name, as written to `Record::type_hash`.
    pub fn hash(&self) -> u64 {
        hash_name(self.name)
    }

    /// Readable type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes taken by `count` elements, saturating at `usize::MAX`.
    pub fn size_of_array(&self, count: usize) -> usize {
        self.size.saturating_mul(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_short_names() {
        let record = Record::new(1, 2, 24, 0x1000, 99);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"ts":99,"sh":1,"th":2,"s":24,"l":4096}"#);
    }

    #[test]
    fn test_type_info_is_stable() {
        let first = TypeInfo::of::<[i32; 10]>();
        let second = TypeInfo::of::<[i32; 10]>();
        assert_eq!(first, second);
        assert_eq!(first.size(), 40);
        assert_eq!(first.size_of_array(5), 200);
        assert_ne!(first.hash(), TypeInfo::of::<i32>().hash());
    }
}
