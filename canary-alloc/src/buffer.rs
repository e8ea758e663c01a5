use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};
use std::slice;

use crate::alloc::{Malloc, RawAlloc};
use crate::{AllocError, Canary, Plain, LEFT_BUFFER_CANARY, MIN_ALIGN, RIGHT_BUFFER_CANARY};

/// Heap storage for `capacity` elements of `T` between two guard words.
///
/// The left prefix is `max(size_of::<Canary>(), align_of::<T>())` bytes long, so the elements that
/// follow it keep their natural alignment. The left guard occupies the last four bytes of the
/// prefix, directly in front of element 0. The right guard is written unaligned right after the
/// last element.
pub struct GuardedBuffer<T: Plain, A: RawAlloc = Malloc> {
    base: NonNull<u8>,
    capacity: usize,
    alloc: A,
    phantom: PhantomData<T>,
}

unsafe impl<T: Plain + Send, A: RawAlloc + Send> Send for GuardedBuffer<T, A> {}

impl<T: Plain> GuardedBuffer<T, Malloc> {
    /// Allocates a zeroed buffer on the C heap.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        Self::new_in(capacity, Malloc)
    }
}

impl<T: Plain, A: RawAlloc> GuardedBuffer<T, A> {
    /// Bytes in front of element 0.
    pub const GUARD_PREFIX: usize = if align_of::<T>() > size_of::<Canary>() {
        align_of::<T>()
    } else {
        size_of::<Canary>()
    };

    /// Allocates a zeroed buffer of `capacity` elements and writes both guards.
    ///
    /// A zero capacity has no buffer at all; owners represent that state without a
    /// `GuardedBuffer`.
    pub fn new_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        assert!(capacity > 0, "a guarded buffer needs at least one element slot");
        assert!(
            align_of::<T>() <= MIN_ALIGN,
            "element alignment exceeds what the allocator guarantees"
        );
        assert!(size_of::<T>() > 0, "zero sized elements are not supported");

        let total = Self::total_size(capacity)?;
        let base = unsafe { alloc.alloc_zeroed(total) };
        let base = NonNull::new(base).ok_or(AllocError::OutOfMemory { bytes: total })?;

        let mut buffer = Self {
            base,
            capacity,
            alloc,
            phantom: PhantomData,
        };
        buffer.write_guards();
        Ok(buffer)
    }

    /// Reallocates the buffer to hold exactly `new_capacity` elements.
    ///
    /// Slots added by growing are zeroed and the right guard is rewritten at the new boundary.
    /// If the allocator fails the old block is released and the error returned, nothing survives.
    pub fn resize(mut self, new_capacity: usize) -> Result<Self, AllocError> {
        assert!(new_capacity > 0, "a guarded buffer needs at least one element slot");

        let old_capacity = self.capacity;
        let old_total = self.allocated_bytes();
        let new_total = Self::total_size(new_capacity)?;

        let base = unsafe {
            self.alloc
                .realloc_zeroed(self.base.as_ptr(), old_total, new_total)
        };
        // On failure `self` still owns the old block and releases it when dropped.
        let base = NonNull::new(base).ok_or(AllocError::OutOfMemory { bytes: new_total })?;

        self.base = base;
        self.capacity = new_capacity;
        if new_capacity > old_capacity {
            // The old right guard now sits inside the element region.
            unsafe {
                ptr::write_bytes(
                    self.elements_ptr().add(old_capacity * size_of::<T>()),
                    0,
                    (new_capacity - old_capacity) * size_of::<T>(),
                );
            }
        }
        self.write_guards();
        Ok(self)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the whole block, guards included.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        Self::GUARD_PREFIX + self.capacity * size_of::<T>() + size_of::<Canary>()
    }

    /// Returns a pointer to the first element slot.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.elements_ptr() as *const T
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.elements_ptr() as *mut T
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.capacity) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.capacity) }
    }

    /// The element region as bytes, guards excluded.
    #[inline]
    pub fn element_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.elements_ptr(), self.capacity * size_of::<T>()) }
    }

    #[inline]
    pub fn left_guard(&self) -> Canary {
        unsafe { ptr::read_unaligned(self.left_guard_ptr() as *const Canary) }
    }

    #[inline]
    pub fn right_guard(&self) -> Canary {
        unsafe { ptr::read_unaligned(self.right_guard_ptr() as *const Canary) }
    }

    /// The whole block, guards included.
    ///
    /// # Safety
    ///
    /// Nothing stops the caller from overwriting the guards; that is the point. The caller must
    /// not hold on to the slice across a `resize`.
    pub unsafe fn raw_bytes_mut(&mut self) -> &mut [u8] {
        slice::from_raw_parts_mut(self.base.as_ptr(), self.allocated_bytes())
    }

    /// Offset of element 0 inside [`raw_bytes_mut`](Self::raw_bytes_mut).
    #[inline]
    pub fn element_offset(&self) -> usize {
        Self::GUARD_PREFIX
    }

    fn total_size(capacity: usize) -> Result<usize, AllocError> {
        capacity
            .checked_mul(size_of::<T>())
            .and_then(|bytes| bytes.checked_add(Self::GUARD_PREFIX + size_of::<Canary>()))
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or(AllocError::CapacityOverflow)
    }

    fn write_guards(&mut self) {
        unsafe {
            ptr::write_unaligned(self.left_guard_ptr() as *mut Canary, LEFT_BUFFER_CANARY);
            ptr::write_unaligned(self.right_guard_ptr() as *mut Canary, RIGHT_BUFFER_CANARY);
        }
    }

    #[inline]
    fn elements_ptr(&self) -> *mut u8 {
        // The `add(n)` function for `u8` adds exactly `n` bytes to the pointer.
        unsafe { self.base.as_ptr().add(Self::GUARD_PREFIX) }
    }

    #[inline]
    fn left_guard_ptr(&self) -> *mut u8 {
        unsafe { self.elements_ptr().sub(size_of::<Canary>()) }
    }

    #[inline]
    fn right_guard_ptr(&self) -> *mut u8 {
        unsafe { self.elements_ptr().add(self.capacity * size_of::<T>()) }
    }
}

impl<T: Plain, A: RawAlloc> Drop for GuardedBuffer<T, A> {
    fn drop(&mut self) {
        let size = self.allocated_bytes();
        unsafe { self.alloc.release(self.base.as_ptr(), size) };
    }
}

impl<T: Plain + fmt::Debug, A: RawAlloc> fmt::Debug for GuardedBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedBuffer")
            .field("ptr", &self.as_ptr())
            .field("capacity", &self.capacity)
            .field("left_guard", &format_args!("{:#010X}", self.left_guard()))
            .field("right_guard", &format_args!("{:#010X}", self.right_guard()))
            .field("elements", &self.as_slice())
            .finish()
    }
}
