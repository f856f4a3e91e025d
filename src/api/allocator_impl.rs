//! Implementation of `std::alloc::Allocator` for [`ProfileAllocator`].
//!
//! This module requires the `nightly` feature and a nightly Rust compiler.
//! It allows using the profiling allocator with standard library collections.
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! erata = { version = "0.1", features = ["nightly"] }
//! ```
//!
//! Events are attributed to the allocator's element type `T` and carry the exact size
//! of the requested layout, so a `Vec<T, ProfileAllocator<T>>` reports the bytes of
//! each buffer it grows into.

#![cfg(feature = "nightly")]

use std::alloc::{AllocError as StdAllocError, Allocator, Layout};
use std::ptr::NonNull;

use crate::api::allocator::{BaseAllocator, ProfileAllocator};
use crate::core::tls;
use crate::writer::Direction;

// SAFETY: blocks come from the base allocator, which upholds the BaseAllocator contract;
// clones share the same base and therefore release each other's blocks.
unsafe impl<T, A: BaseAllocator> Allocator for ProfileAllocator<T, A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, StdAllocError> {
        let ptr = self.base().allocate(layout).map_err(|_| StdAllocError)?;
        tls::record_sized::<T>(Direction::Alloc, ptr.as_ptr() as usize, layout.size());
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.base().deallocate(ptr, layout);
        tls::record_sized::<T>(Direction::Dealloc, ptr.as_ptr() as usize, layout.size());
    }
}

#[cfg(test)]
mod tests {
    use crate::core::tls::{finish_thread, init_thread, with_state};
    use crate::writer::{MemoryWriter, NullWriter};
    use crate::ProfileAllocator;

    #[test]
    fn test_vec_in_profile_allocator() {
        std::thread::spawn(|| {
            let alloc = MemoryWriter::new();
            let view = alloc.view();
            init_thread(alloc, NullWriter::new()).unwrap();

            let mut values: Vec<u64, _> = Vec::with_capacity_in(4, ProfileAllocator::<u64>::new());
            values.extend([1, 2, 3, 4]);
            assert_eq!(view.write_count(), 1);
            assert_eq!(view.latest().unwrap().size(), 32);

            drop(values);
            assert_eq!(with_state(|state| state.stats().deallocations).unwrap(), 1);
            finish_thread().unwrap();
        })
        .join()
        .unwrap();
    }
}
