//! Owned UTF-8 string stored in a [`RawVec`].

use std::fmt;
use std::ops::Deref;

use super::vec::RawVec;

/// An owned string whose bytes live outside the global allocator.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawString {
    bytes: RawVec<u8>,
}

impl RawString {
    /// Create an empty string.
    pub const fn new() -> Self {
        Self { bytes: RawVec::new() }
    }

    /// Borrow the contents.
    pub fn as_str(&self) -> &str {
        // SAFETY: bytes are only ever appended from &str values.
        unsafe { std::str::from_utf8_unchecked(self.bytes.as_slice()) }
    }

    /// Append a string slice.
    pub fn push_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for RawString {
    fn from(s: &str) -> Self {
        let mut raw = Self::new();
        raw.push_str(s);
        raw
    }
}

impl Deref for RawString {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for RawString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for RawString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for RawString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for RawString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for RawString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_utf8() {
        let raw = RawString::from("scope/région/数据");
        assert_eq!(raw.as_str(), "scope/région/数据");
        assert_eq!(raw, "scope/région/数据");
        assert_eq!(raw.to_string(), "scope/région/数据");
    }

    #[test]
    fn test_push_str() {
        let mut raw = RawString::new();
        assert!(raw.is_empty());
        raw.push_str("outer");
        raw.push_str("::inner");
        assert_eq!(&*raw, "outer::inner");
        assert_eq!(raw.len(), 12);
    }
}
