//! LIFO stack over [`RawVec`] storage.

use super::vec::RawVec;

/// Returned by [`RawStack::pop`] and [`RawStack::top`] when nothing is on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stack has no elements")]
pub struct EmptyStack;

/// A growable stack whose storage bypasses the global allocator.
#[derive(Debug, Clone)]
pub struct RawStack<T> {
    items: RawVec<T>,
}

impl<T> RawStack<T> {
    /// Create an empty stack.
    pub const fn new() -> Self {
        Self { items: RawVec::new() }
    }

    /// Push a value on top.
    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    /// Remove the top value.
    pub fn pop(&mut self) -> Result<T, EmptyStack> {
        self.items.pop().ok_or(EmptyStack)
    }

    /// Reference to the top value.
    pub fn top(&self) -> Result<&T, EmptyStack> {
        self.items.last().ok_or(EmptyStack)
    }

    /// Number of values on the stack.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate from the bottom of the stack to the top.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for RawStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
