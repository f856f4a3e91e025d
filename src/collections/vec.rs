//! Growable array backed directly by the system allocator.
//!
//! Storage is requested from [`System`] rather than the global allocator so that
//! growing profiler bookkeeping can never route back into an instrumented path.

use std::alloc::{handle_alloc_error, GlobalAlloc, Layout, System};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::util::layout::{array_layout, array_layout_unchecked};

/// Capacity of the first block, allocated on the first push.
const INITIAL_CAPACITY: usize = 8;

/// Capacity multiplier applied every time the buffer is full.
const GROWTH_RATIO: usize = 2;

/// A growable array that owns a block obtained from [`System`].
///
/// Behaves like a stripped-down `Vec`: amortized O(1) [`push`](Self::push) by capacity
/// doubling, indexed access through `Deref<Target = [T]>`, and a deep [`Clone`].
/// Moving a `RawVec` transfers its block; [`take`](Self::take) leaves an empty vector behind.
pub struct RawVec<T> {
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

// SAFETY: RawVec uniquely owns its elements, like Vec.
unsafe impl<T: Send> Send for RawVec<T> {}
// SAFETY: shared access only hands out &T.
unsafe impl<T: Sync> Sync for RawVec<T> {}

impl<T> RawVec<T> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Create an empty vector without allocating.
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: if Self::IS_ZST { usize::MAX } else { 0 },
            _marker: PhantomData,
        }
    }

    /// Create an empty vector with room for at least `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut vec = Self::new();
        vec.reserve(capacity);
        vec
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the vector holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current block can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an element, doubling the capacity when full.
    pub fn push(&mut self, value: T) {
        if self.len == self.capacity {
            self.reserve(1);
        }
        // SAFETY: len < capacity after reserve, so the slot is inside the block.
        unsafe {
            self.ptr.as_ptr().add(self.len).write(value);
        }
        self.len += 1;
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old last index is initialized and now logically removed.
        unsafe { Some(self.ptr.as_ptr().add(self.len).read()) }
    }

    /// Reference to the last element.
    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Make sure at least `additional` more elements fit without reallocating.
    pub fn reserve(&mut self, additional: usize) {
        let required = match self.len.checked_add(additional) {
            Some(required) => required,
            None => capacity_overflow(),
        };
        if required <= self.capacity {
            return;
        }

        let mut new_capacity = self.capacity.max(INITIAL_CAPACITY);
        while new_capacity < required {
            new_capacity = match new_capacity.checked_mul(GROWTH_RATIO) {
                Some(capacity) => capacity,
                None => capacity_overflow(),
            };
        }
        self.reallocate(new_capacity);
    }

    /// Drop all elements, keeping the block.
    pub fn clear(&mut self) {
        let elements: *mut [T] = self.as_mut_slice();
        self.len = 0;
        // SAFETY: the elements were initialized and len is already zero, so none is dropped twice.
        unsafe {
            ptr::drop_in_place(elements);
        }
    }

    /// Move the contents out, leaving an empty vector in place.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// View the elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is non-null and aligned, and the first len slots are initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// View the elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: same as as_slice, with unique access through &mut self.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn reallocate(&mut self, new_capacity: usize) {
        debug_assert!(!Self::IS_ZST && new_capacity > self.capacity);

        let new_layout = match array_layout::<T>(new_capacity) {
            Some(layout) => layout,
            None => capacity_overflow(),
        };

        let raw = if self.capacity == 0 {
            // SAFETY: T is not zero-sized and new_capacity > 0, so the layout is non-zero.
            unsafe { System.alloc(new_layout) }
        } else {
            // SAFETY: the block was allocated by System with the layout of the current capacity.
            unsafe {
                System.realloc(
                    self.ptr.as_ptr().cast::<u8>(),
                    Self::block_layout(self.capacity),
                    new_layout.size(),
                )
            }
        };

        match NonNull::new(raw.cast::<T>()) {
            Some(ptr) => self.ptr = ptr,
            None => handle_alloc_error(new_layout),
        }
        self.capacity = new_capacity;
    }

    fn block_layout(capacity: usize) -> Layout {
        // SAFETY: a block of this capacity was already allocated, so the layout is valid.
        unsafe { array_layout_unchecked::<T>(capacity) }
    }
}

impl<T: Copy> RawVec<T> {
    /// Append a copy of every element in `other`.
    pub fn extend_from_slice(&mut self, other: &[T]) {
        self.reserve(other.len());
        // SAFETY: reserve made room for other.len() elements past len; the regions cannot overlap
        // because other is borrowed immutably while self is borrowed mutably.
        unsafe {
            ptr::copy_nonoverlapping(other.as_ptr(), self.ptr.as_ptr().add(self.len), other.len());
        }
        self.len += other.len();
    }
}

#[cold]
fn capacity_overflow() -> ! {
    panic!("RawVec capacity overflow")
}

impl<T> Drop for RawVec<T> {
    fn drop(&mut self) {
        self.clear();
        if !Self::IS_ZST && self.capacity > 0 {
            // SAFETY: the block was allocated by System with exactly this layout.
            unsafe {
                System.dealloc(self.ptr.as_ptr().cast::<u8>(), Self::block_layout(self.capacity));
            }
        }
    }
}

impl<T> Default for RawVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for RawVec<T> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity(self.len);
        for item in self.iter() {
            copy.push(item.clone());
        }
        copy
    }
}

impl<T> Deref for RawVec<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for RawVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<'a, T> IntoIterator for &'a RawVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for RawVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for RawVec<T> {}

impl<T: fmt::Debug> fmt::Debug for RawVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_push_grows_by_doubling() {
        let mut vec = RawVec::new();
        assert_eq!(vec.capacity(), 0);

        vec.push(1u32);
        assert_eq!(vec.capacity(), INITIAL_CAPACITY);

        for i in 2..=9u32 {
            vec.push(i);
        }
        assert_eq!(vec.len(), 9);
        assert_eq!(vec.capacity(), INITIAL_CAPACITY * GROWTH_RATIO);
        assert_eq!(vec[0], 1);
        assert_eq!(vec[8], 9);
    }

    #[test]
    fn test_many_elements_survive_reallocation() {
        let mut vec = RawVec::new();
        for i in 0..10_000u64 {
            vec.push(i);
        }
        assert_eq!(vec.len(), 10_000);
        assert!(vec.iter().copied().eq(0..10_000u64));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = RawVec::new();
        original.push(String::from("a"));
        original.push(String::from("b"));

        let mut copy = original.clone();
        copy[0].push('!');

        assert_eq!(original[0], "a");
        assert_eq!(copy[0], "a!");
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut source = RawVec::new();
        source.push(7u8);
        source.push(8u8);

        let moved = source.take();
        assert_eq!(moved.as_slice(), &[7, 8]);
        assert!(source.is_empty());

        source.push(9);
        assert_eq!(source.as_slice(), &[9]);
    }

    #[test]
    fn test_drop_releases_elements() {
        let tracker = Rc::new(());
        {
            let mut vec = RawVec::new();
            for _ in 0..20 {
                vec.push(Rc::clone(&tracker));
            }
            assert_eq!(Rc::strong_count(&tracker), 21);
            drop(vec.pop());
            assert_eq!(Rc::strong_count(&tracker), 20);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_extend_from_slice() {
        let mut vec = RawVec::new();
        vec.extend_from_slice(b"hello ");
        vec.extend_from_slice(b"world");
        assert_eq!(vec.as_slice(), b"hello world");
    }

    #[test]
    fn test_zero_sized_elements() {
        let mut vec = RawVec::new();
        for _ in 0..100 {
            vec.push(());
        }
        assert_eq!(vec.len(), 100);
        assert_eq!(vec.pop(), Some(()));
    }
}
