use std::ptr;

use libc::{c_void, calloc, free, realloc};

use super::RawAlloc;

/// The C heap (`calloc`/`realloc`/`free`).
///
/// `realloc` does not clear the memory it adds, so the grown tail is zeroed by hand. The old size
/// is always known to the caller, there is no need to ask the allocator for the usable size.
#[derive(Debug, Default, Clone, Copy)]
pub struct Malloc;

impl RawAlloc for Malloc {
    unsafe fn alloc_zeroed(&self, size: usize) -> *mut u8 {
        calloc(1, size) as *mut u8
    }

    unsafe fn realloc_zeroed(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        let new_ptr = realloc(ptr as *mut c_void, new_size) as *mut u8;
        if !new_ptr.is_null() && new_size > old_size {
            ptr::write_bytes(new_ptr.add(old_size), 0, new_size - old_size);
        }
        new_ptr
    }

    unsafe fn release(&self, ptr: *mut u8, _size: usize) {
        free(ptr as *mut c_void);
    }
}
