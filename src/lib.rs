//! A growable stack that keeps checking itself.
//!
//! [`Stack`] stores [`Element`]s in a [`GuardedBuffer`](canary_alloc::GuardedBuffer) and protects
//! its own control block with canaries and a fingerprint. Every mutation validates the stack before
//! and after it runs (the `self-check` feature), so memory corruption is caught at the next
//! operation instead of much later. [`dump`] draws the whole stack, corrupted or not.
//!
//! ## Example
//! ```
//! use canary_stack::{stack_init, Element, Stack, Violations};
//!
//! let mut numbers = Stack::<i32>::new();
//! stack_init!(numbers, 4, i32::copy).unwrap();
//!
//! for n in 1..=5 {
//!     numbers.push(n).unwrap();
//! }
//! assert_eq!(numbers.capacity(), Ok(8));
//! assert_eq!(numbers.pop(), Ok(5));
//! assert_eq!(numbers.validate(), Violations::empty());
//!
//! let picture = canary_stack::stack_dump!(&numbers, numbers.validate());
//! assert!(picture.contains("Stack is ok"));
//!
//! numbers.destroy();
//! ```

pub mod config;
pub mod dump;
pub mod element;
pub mod error;
pub mod hash;
pub mod integrity;
pub mod log;
pub mod origin;
pub mod stack;

pub use canary_alloc::{AllocError, Malloc, Plain, RawAlloc};
pub use config::{DumpLevel, DumpOptions, LogConfig};
pub use element::{CopyFn, Element};
pub use error::{Result, StackError};
pub use integrity::{validate, Violations};
pub use origin::{CallSite, DebugOrigin};
pub use stack::{Stack, Status};

/// Initializes `$stack` with a [`DebugOrigin`] naming the variable and the current location.
///
/// ```
/// # use canary_stack::{stack_init, Element, Stack};
/// let mut lengths = Stack::<u64>::new();
/// stack_init!(lengths, 0, u64::copy).unwrap();
/// assert_eq!(lengths.origin().name, "lengths");
/// ```
#[macro_export]
macro_rules! stack_init {
    ($stack:ident, $capacity:expr, $copy:expr) => {
        $stack.init($capacity, $copy, $crate::origin!(stringify!($stack)))
    };
}

/// Dumps a stack from the current location.
///
/// With a sink, writes into it and evaluates to `io::Result<()>`. Without one, evaluates to the
/// dump as a `String`.
#[macro_export]
macro_rules! stack_dump {
    ($stack:expr, $violations:expr) => {
        $crate::stack_dump!($stack, $violations, options = $crate::DumpOptions::default())
    };
    ($stack:expr, $violations:expr, options = $options:expr) => {
        $crate::dump::dump_to_string(
            ::std::option::Option::Some($stack),
            $violations,
            $crate::call_site!(),
            $options,
        )
    };
    ($stack:expr, $violations:expr, $sink:expr) => {
        $crate::stack_dump!($stack, $violations, $sink, $crate::DumpOptions::default())
    };
    ($stack:expr, $violations:expr, $sink:expr, $options:expr) => {
        $crate::dump::dump(
            ::std::option::Option::Some($stack),
            $violations,
            $sink,
            $crate::call_site!(),
            $options,
        )
    };
}
