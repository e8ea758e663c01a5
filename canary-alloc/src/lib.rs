//! Canary-alloc provides raw element buffers flanked by guard words.
//!
//! A [`GuardedBuffer`] owns one heap block laid out as:
//! ```text
//!      +-------------+-----------+-----------+-----+-----------+-------------+
//!      | left prefix | element 0 | element 1 | ... | element n | right guard |
//!      +-------------+-----------+-----------+-----+-----------+-------------+
//!                    ^
//!                    as_ptr()
//! ```
//! The pointer handed out always addresses the first element; the guards are invisible to element
//! index arithmetic. An out-of-bounds write that lands next to the elements will overwrite one of
//! the guards, which is then visible through [`GuardedBuffer::left_guard`] and
//! [`GuardedBuffer::right_guard`].
//!
//! ## Example
//! ```
//! use canary_alloc::*;
//!
//! let buffer = GuardedBuffer::<i32>::new(4).unwrap();
//! assert_eq!(buffer.as_slice(), &[0, 0, 0, 0]);
//! assert_eq!(buffer.left_guard(), LEFT_BUFFER_CANARY);
//!
//! let buffer = buffer.resize(8).unwrap();
//! assert_eq!(buffer.capacity(), 8);
//! assert_eq!(buffer.right_guard(), RIGHT_BUFFER_CANARY);
//! ```

pub mod alloc;
mod buffer;

pub use alloc::{Malloc, RawAlloc};
pub use buffer::GuardedBuffer;

use thiserror::Error;

/// A guard word.
pub type Canary = u32;

pub const LEFT_CANARY: Canary = 0xDEAD_BEAF;
pub const RIGHT_CANARY: Canary = 0xBADC_0FEE;
pub const LEFT_BUFFER_CANARY: Canary = 0xBEAD_FACE;
pub const RIGHT_BUFFER_CANARY: Canary = 0xABAD_BABE;

/// Alignment every [`RawAlloc`] is expected to provide.
pub const MIN_ALIGN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("allocator could not provide {bytes} bytes")]
    OutOfMemory { bytes: usize },
    #[error("requested capacity overflows the address space")]
    CapacityOverflow,
}

/// Plain old data that can live inside a [`GuardedBuffer`].
///
/// # Safety
///
/// Implementors must be free of padding bytes and every bit pattern, including all zeroes, must be
/// a valid value. The buffer hands out freshly zeroed memory as initialized elements and exposes
/// the element region as raw bytes.
pub unsafe trait Plain: Copy + 'static {}

macro_rules! plain {
    ($($ty:ty),*) => {
        $(unsafe impl Plain for $ty {})*
    };
}

plain!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);
