mod malloc;
pub use malloc::Malloc;

/// Source of raw, zero-initialized memory for a [`GuardedBuffer`](crate::GuardedBuffer).
///
/// Every method signals failure by returning a null pointer, the same way the C allocator does.
pub trait RawAlloc {
    /// Returns a pointer to `size` zeroed bytes, or null.
    unsafe fn alloc_zeroed(&self, size: usize) -> *mut u8;

    /// Resizes the block at `ptr` from `old_size` to `new_size` bytes. When the block grows, the
    /// bytes in `[old_size, new_size)` are zeroed. On failure null is returned and the old block
    /// is left untouched.
    unsafe fn realloc_zeroed(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8;

    /// Returns the block to the allocator.
    unsafe fn release(&self, ptr: *mut u8, size: usize);
}

impl<A: RawAlloc + ?Sized> RawAlloc for &A {
    unsafe fn alloc_zeroed(&self, size: usize) -> *mut u8 {
        (**self).alloc_zeroed(size)
    }

    unsafe fn realloc_zeroed(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        (**self).realloc_zeroed(ptr, old_size, new_size)
    }

    unsafe fn release(&self, ptr: *mut u8, size: usize) {
        (**self).release(ptr, size)
    }
}
