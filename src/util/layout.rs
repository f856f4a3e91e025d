//! Layout utilities.

use std::alloc::Layout;

/// Create a layout for an array of `count` values of T.
///
/// Returns `None` when the total size overflows `isize::MAX`.
pub fn array_layout<T>(count: usize) -> Option<Layout> {
    Layout::array::<T>(count).ok()
}

/// Layout of an array previously produced by [`array_layout`] for the same T and count.
///
/// # Safety
///
/// `array_layout::<T>(count)` must have returned `Some` for this `count`.
pub unsafe fn array_layout_unchecked<T>(count: usize) -> Layout {
    Layout::from_size_align_unchecked(std::mem::size_of::<T>() * count, std::mem::align_of::<T>())
}

/// Dangling, well-aligned address used for zero-sized blocks.
pub fn dangling_for(layout: Layout) -> std::ptr::NonNull<u8> {
    // SAFETY: alignment is a non-zero power of two, so the address is non-null.
    unsafe { std::ptr::NonNull::new_unchecked(layout.align() as *mut u8) }
}
