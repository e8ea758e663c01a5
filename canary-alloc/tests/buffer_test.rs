use std::cell::Cell;
use std::rc::Rc;

use canary_alloc::*;

#[test]
fn create_buffer_with_intact_guards() -> Result<(), AllocError> {
    let buffer = GuardedBuffer::<i32>::new(16)?;
    assert_eq!(buffer.capacity(), 16);
    assert_eq!(buffer.left_guard(), LEFT_BUFFER_CANARY);
    assert_eq!(buffer.right_guard(), RIGHT_BUFFER_CANARY);
    assert!(buffer.as_slice().iter().all(|&x| x == 0));
    Ok(())
}

#[test]
fn elements_are_aligned() -> Result<(), AllocError> {
    let buffer = GuardedBuffer::<f64>::new(3)?;
    assert_eq!(buffer.as_ptr() as usize % std::mem::align_of::<f64>(), 0);
    assert_eq!(buffer.element_offset(), 8);

    let buffer = GuardedBuffer::<u8>::new(3)?;
    assert_eq!(buffer.element_offset(), 4);
    assert_eq!(buffer.allocated_bytes(), 4 + 3 + 4);
    Ok(())
}

#[test]
fn grow_keeps_values_and_zeroes_new_slots() -> Result<(), AllocError> {
    let mut buffer = GuardedBuffer::<i32>::new(2)?;
    buffer.as_mut_slice().copy_from_slice(&[7, -7]);

    let buffer = buffer.resize(5)?;
    assert_eq!(buffer.as_slice(), &[7, -7, 0, 0, 0]);
    assert_eq!(buffer.left_guard(), LEFT_BUFFER_CANARY);
    assert_eq!(buffer.right_guard(), RIGHT_BUFFER_CANARY);
    Ok(())
}

#[test]
fn shrink_moves_the_right_guard() -> Result<(), AllocError> {
    let mut buffer = GuardedBuffer::<u64>::new(8)?;
    for (i, slot) in buffer.as_mut_slice().iter_mut().enumerate() {
        *slot = i as u64;
    }

    let buffer = buffer.resize(3)?;
    assert_eq!(buffer.as_slice(), &[0, 1, 2]);
    assert_eq!(buffer.right_guard(), RIGHT_BUFFER_CANARY);
    Ok(())
}

#[test]
fn overwriting_past_the_end_kills_the_right_guard() -> Result<(), AllocError> {
    let mut buffer = GuardedBuffer::<i32>::new(4)?;
    let end = buffer.element_offset() + 4 * 4;
    unsafe { buffer.raw_bytes_mut()[end] ^= 0xFF };
    assert_ne!(buffer.right_guard(), RIGHT_BUFFER_CANARY);
    assert_eq!(buffer.left_guard(), LEFT_BUFFER_CANARY);
    Ok(())
}

#[test]
fn overwriting_before_the_start_kills_the_left_guard() -> Result<(), AllocError> {
    let mut buffer = GuardedBuffer::<i32>::new(4)?;
    let start = buffer.element_offset() - 1;
    unsafe { buffer.raw_bytes_mut()[start] = 0 };
    assert_ne!(buffer.left_guard(), LEFT_BUFFER_CANARY);
    assert_eq!(buffer.right_guard(), RIGHT_BUFFER_CANARY);
    Ok(())
}

#[test]
fn capacity_overflow_is_reported() {
    let result = GuardedBuffer::<u64>::new(usize::MAX / 4);
    assert_eq!(result.err(), Some(AllocError::CapacityOverflow));
}

/// Hands out memory until `budget` bytes are exceeded and counts outstanding blocks.
#[derive(Clone)]
struct Budget {
    budget: usize,
    live: Rc<Cell<isize>>,
}

impl RawAlloc for Budget {
    unsafe fn alloc_zeroed(&self, size: usize) -> *mut u8 {
        if size > self.budget {
            return std::ptr::null_mut();
        }
        let ptr = Malloc.alloc_zeroed(size);
        self.live.set(self.live.get() + 1);
        ptr
    }

    unsafe fn realloc_zeroed(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        if new_size > self.budget {
            return std::ptr::null_mut();
        }
        Malloc.realloc_zeroed(ptr, old_size, new_size)
    }

    unsafe fn release(&self, ptr: *mut u8, size: usize) {
        self.live.set(self.live.get() - 1);
        Malloc.release(ptr, size)
    }
}

#[test]
fn failed_alloc_returns_out_of_memory() {
    let live = Rc::new(Cell::new(0));
    let alloc = Budget { budget: 16, live: live.clone() };
    let result = GuardedBuffer::<i32, _>::new_in(64, alloc);
    assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
    assert_eq!(live.get(), 0);
}

#[test]
fn failed_resize_releases_the_old_block() -> Result<(), AllocError> {
    let live = Rc::new(Cell::new(0));
    let alloc = Budget { budget: 64, live: live.clone() };
    let buffer = GuardedBuffer::<i32, _>::new_in(4, alloc)?;
    assert_eq!(live.get(), 1);

    let result = buffer.resize(1024);
    assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
    assert_eq!(live.get(), 0);
    Ok(())
}

#[test]
#[should_panic]
fn zero_capacity_is_rejected() {
    let _ = GuardedBuffer::<i32>::new(0);
}
