//! The profiling allocator.
//!
//! [`ProfileAllocator`] forwards every request to a [`BaseAllocator`] and records the
//! event in the profiling state of the calling thread.
//!
//! ```rust,ignore
//! use erata::{pop_scope, push_scope, ProfileAllocator};
//!
//! let alloc = ProfileAllocator::<u32>::new();
//!
//! push_scope("decode");
//! let block = alloc.allocate(256)?;
//! // ...
//! unsafe { alloc.deallocate(block, 256) };
//! pop_scope();
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::core::tls;
use crate::error::AllocError;
use crate::util::layout::{array_layout, array_layout_unchecked, dangling_for};
use crate::writer::Direction;

/// Allocator that actually provides memory to a [`ProfileAllocator`].
///
/// # Safety
///
/// `allocate` must return a block valid for `layout`, or an error. `deallocate` must
/// accept every block returned by `allocate` on this allocator or an equivalent one,
/// together with the layout it was allocated with.
pub unsafe trait BaseAllocator {
    /// Allocate a block for `layout`. Zero-sized layouts get a dangling, aligned pointer.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator (or an equivalent one) with `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Returns true if blocks from `self` can be released through `other`.
    fn is_equivalent(&self, _other: &Self) -> bool {
        true
    }
}

// SAFETY: System upholds the GlobalAlloc contract; zero-sized blocks never reach it.
unsafe impl BaseAllocator for System {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling_for(layout));
        }
        // SAFETY: the layout has a non-zero size.
        let raw = unsafe { GlobalAlloc::alloc(self, layout) };
        NonNull::new(raw).ok_or(AllocError::Exhausted {
            size: layout.size(),
            align: layout.align(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            GlobalAlloc::dealloc(self, ptr.as_ptr(), layout);
        }
    }
}

// SAFETY: forwards to A.
unsafe impl<A: BaseAllocator + ?Sized> BaseAllocator for &A {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }

    fn is_equivalent(&self, other: &Self) -> bool {
        (**self).is_equivalent(*other)
    }
}

/// Allocator of `T` values that records every allocation and deallocation.
///
/// Events go to the profiling state of the thread that makes the call, so an
/// instance can be moved between threads when `A` allows it. Instances over
/// different element types share that state; see [`rebind`](Self::rebind).
pub struct ProfileAllocator<T, A = System> {
    base: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProfileAllocator<T, System> {
    /// Profiling allocator over the system allocator.
    pub const fn new() -> Self {
        Self::with_base(System)
    }
}

impl<T, A> ProfileAllocator<T, A> {
    /// Profiling allocator over `base`.
    pub const fn with_base(base: A) -> Self {
        Self {
            base,
            _marker: PhantomData,
        }
    }

    /// The underlying allocator.
    pub fn base(&self) -> &A {
        &self.base
    }

    /// Consume the wrapper and return the underlying allocator.
    pub fn into_base(self) -> A {
        self.base
    }

    /// Equivalent allocator over element type `U`.
    pub fn rebind<U>(&self) -> ProfileAllocator<U, A>
    where
        A: Clone,
    {
        ProfileAllocator::with_base(self.base.clone())
    }

    /// Build from an allocator over another element type.
    pub fn from_rebound<U>(other: &ProfileAllocator<U, A>) -> Self
    where
        A: Clone,
    {
        other.rebind()
    }
}

impl<T, A: BaseAllocator> ProfileAllocator<T, A> {
    /// Allocate uninitialized room for `n` values of `T` and record the event.
    ///
    /// Failures of the underlying allocator are returned unchanged and not recorded.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        let layout = array_layout::<T>(n).ok_or(AllocError::CapacityOverflow {
            type_name: std::any::type_name::<T>(),
            count: n,
        })?;
        let ptr = self.base.allocate(layout)?;
        tls::record::<T>(Direction::Alloc, ptr.as_ptr() as usize, n);
        Ok(ptr.cast())
    }

    /// Release `n` values of `T` at `ptr`, then record the event.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`allocate`](Self::allocate) with the same `n` on this
    /// allocator or an equal one, and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        let layout = array_layout_unchecked::<T>(n);
        self.base.deallocate(ptr.cast(), layout);
        tls::record::<T>(Direction::Dealloc, ptr.as_ptr() as usize, n);
    }
}

impl<T, A: Default> Default for ProfileAllocator<T, A> {
    fn default() -> Self {
        Self::with_base(A::default())
    }
}

impl<T, A: Clone> Clone for ProfileAllocator<T, A> {
    fn clone(&self) -> Self {
        Self::with_base(self.base.clone())
    }
}

impl<T, A: Copy> Copy for ProfileAllocator<T, A> {}

impl<T, U, A: BaseAllocator> PartialEq<ProfileAllocator<U, A>> for ProfileAllocator<T, A> {
    fn eq(&self, other: &ProfileAllocator<U, A>) -> bool {
        self.base.is_equivalent(&other.base)
    }
}

impl<T, A: BaseAllocator> Eq for ProfileAllocator<T, A> {}

impl<T, A: fmt::Debug> fmt::Debug for ProfileAllocator<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileAllocator")
            .field("type", &std::any::type_name::<T>())
            .field("base", &self.base)
            .finish()
    }
}
