//! Stack of active scope hashes.

use crate::collections::RawStack;
use crate::core::registry::GLOBAL_SCOPE_HASH;
use crate::error::ScopeError;

/// Nested scope hashes, innermost on top.
///
/// Never empty: [`GLOBAL_SCOPE_HASH`] is pushed at construction and cannot be popped.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    hashes: RawStack<u64>,
}

impl ScopeStack {
    /// Create a stack holding only the global scope.
    pub fn new() -> Self {
        let mut hashes = RawStack::new();
        hashes.push(GLOBAL_SCOPE_HASH);
        Self { hashes }
    }

    /// Enter a scope.
    pub fn push(&mut self, hash: u64) {
        self.hashes.push(hash);
    }

    /// Leave the innermost scope and return its hash.
    pub fn pop(&mut self) -> Result<u64, ScopeError> {
        if self.hashes.len() <= 1 {
            return Err(ScopeError::PopGlobal);
        }
        self.hashes.pop().map_err(|_| ScopeError::PopGlobal)
    }

    /// Hash of the innermost scope.
    pub fn current(&self) -> u64 {
        self.hashes.top().copied().unwrap_or(GLOBAL_SCOPE_HASH)
    }

    /// Number of scopes above the global one.
    pub fn depth(&self) -> usize {
        self.hashes.len().saturating_sub(1)
    }

    /// Returns true if only the global scope is active.
    pub fn is_global(&self) -> bool {
        self.depth() == 0
    }

    /// Iterate from the global scope outwards.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.hashes.iter().copied()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_global() {
        let stack = ScopeStack::new();
        assert_eq!(stack.current(), GLOBAL_SCOPE_HASH);
        assert_eq!(stack.depth(), 0);
        assert!(stack.is_global());
    }

    #[test]
    fn test_global_scope_cannot_be_popped() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.pop(), Err(ScopeError::PopGlobal));

        stack.push(5);
        assert_eq!(stack.pop(), Ok(5));
        assert_eq!(stack.pop(), Err(ScopeError::PopGlobal));
        assert_eq!(stack.current(), GLOBAL_SCOPE_HASH);
    }

    #[test]
    fn test_nested_scopes_unwind_in_order() {
        let mut stack = ScopeStack::new();
        for hash in 1..=100u64 {
            stack.push(hash);
        }
        assert_eq!(stack.depth(), 100);
        assert_eq!(stack.iter().next(), Some(GLOBAL_SCOPE_HASH));

        for hash in (1..=100u64).rev() {
            assert_eq!(stack.current(), hash);
            assert_eq!(stack.pop(), Ok(hash));
        }
        assert!(stack.is_global());
    }
}
