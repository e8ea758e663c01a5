use std::fmt;
use std::hash::Hasher;

use bitflags::bitflags;
use canary_alloc::{Canary, GuardedBuffer, Malloc, RawAlloc, LEFT_CANARY, RIGHT_CANARY};
use tracing::{debug, error, trace, warn};

use crate::config::{DumpOptions, GROWTH_FACTOR, SHRINK_SLACK};
use crate::dump;
use crate::element::{CopyFn, Element};
use crate::error::{Result, StackError};
use crate::hash::{fingerprint, Fingerprint};
use crate::integrity::{self, Violations};
use crate::origin::{CallSite, DebugOrigin};

bitflags! {
    /// Lifecycle flags of a stack's control block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        const INIT      = 1 << 0;
        const DESTROYED = 1 << 1;
        const EMPTY     = 1 << 2;
    }
}

/// A growable stack of plain elements that checks its own integrity.
///
/// The control block is bracketed by two canaries and fingerprinted after every mutation, and the
/// buffer is a [`GuardedBuffer`] with its own guard words and fingerprint. Corruption that happens
/// between two operations is reported by [`validate`](Stack::validate) as [`Violations`].
///
/// A stack starts out as a zeroed, uninitialized control block and goes through
/// `init -> push/pop -> destroy -> reset -> init ...`. Calling an operation out of that order is a
/// programming error and panics after logging a dump of the stack.
pub struct Stack<T: Element, A: RawAlloc = Malloc> {
    pub(crate) left_canary: Canary,
    pub(crate) buffer: Option<GuardedBuffer<T, A>>,
    pub(crate) capacity: usize,
    pub(crate) size: usize,
    pub(crate) copy: Option<CopyFn<T>>,
    pub(crate) status: Status,
    pub(crate) origin: DebugOrigin,
    pub(crate) alloc: A,
    pub(crate) buffer_hash: u32,
    pub(crate) control_hash: u32,
    pub(crate) right_canary: Canary,
}

impl<T: Element> Stack<T, Malloc> {
    /// An uninitialized stack using the C heap.
    pub fn new() -> Self {
        Self::new_in(Malloc)
    }
}

impl<T: Element> Default for Stack<T, Malloc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, A: RawAlloc + Clone> Stack<T, A> {
    /// An uninitialized stack that will take its buffers from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self {
            left_canary: 0,
            buffer: None,
            capacity: 0,
            size: 0,
            copy: None,
            status: Status::empty(),
            origin: DebugOrigin::default(),
            alloc,
            buffer_hash: 0,
            control_hash: 0,
            right_canary: 0,
        }
    }

    /// Sets up the control block and allocates room for `capacity` elements.
    ///
    /// Prefer the [`stack_init!`](crate::stack_init) macro, which fills in `origin`.
    ///
    /// # Panics
    ///
    /// If the stack is already initialized or `origin` is incomplete.
    ///
    /// # Errors
    ///
    /// [`StackError::AllocationFailure`] leaves an initialized, empty stack without a buffer.
    #[track_caller]
    pub fn init(&mut self, capacity: usize, copy: CopyFn<T>, origin: DebugOrigin) -> Result<()> {
        self.require(!self.status.contains(Status::INIT), "init", "stack is already initialized");
        self.require(origin.is_complete(), "init", "debug origin is incomplete");

        self.left_canary = LEFT_CANARY;
        self.right_canary = RIGHT_CANARY;
        self.buffer = None;
        self.capacity = 0;
        self.size = 0;
        self.copy = Some(copy);
        self.status = Status::INIT | Status::EMPTY;
        self.origin = origin;
        self.rehash();

        let result = if capacity > 0 {
            self.reallocate(capacity)
        } else {
            Ok(())
        };
        debug!(name = origin.name, capacity = self.capacity, "stack initialized");

        self.check("init");
        result
    }

    /// Releases the buffer and marks the stack destroyed.
    #[track_caller]
    pub fn destroy(&mut self) {
        self.check("destroy");
        self.require_live("destroy");

        self.buffer = None;
        self.capacity = 0;
        self.size = 0;
        self.copy = None;
        self.status.insert(Status::DESTROYED | Status::EMPTY);
        self.rehash();
        debug!(name = self.origin.name, "stack destroyed");

        self.check("destroy");
    }

    /// Clears every status flag of a destroyed stack so it can be initialized again.
    #[track_caller]
    pub fn reset(&mut self) {
        self.check("reset");
        self.require(
            self.status.contains(Status::DESTROYED),
            "reset",
            "only a destroyed stack can be reset",
        );

        self.status = Status::empty();
        self.rehash();

        self.check("reset");
    }

    /// Pushes `value`, growing the buffer if it is full.
    ///
    /// # Errors
    ///
    /// If growing fails the stack loses its contents: it is left empty with zero capacity.
    #[track_caller]
    pub fn push(&mut self, value: T) -> Result<()> {
        self.check("push");
        self.require_live("push");

        if self.size == self.capacity {
            let new_capacity = match self.capacity {
                0 => 1,
                capacity => capacity
                    .checked_mul(GROWTH_FACTOR)
                    .ok_or(canary_alloc::AllocError::CapacityOverflow)?,
            };
            trace!(from = self.capacity, to = new_capacity, "growing stack");
            self.reallocate(new_capacity)?;
        }

        let copy = self.copy_fn("push");
        let top = self.size;
        copy(&mut self.slots_mut()[top], &value);
        self.size += 1;
        self.status.remove(Status::EMPTY);
        self.rehash();

        self.check("push");
        Ok(())
    }

    /// Pops the top element into `out`, shrinking the buffer when it has become mostly unused.
    ///
    /// # Errors
    ///
    /// [`StackError::EmptyStack`] leaves everything untouched. If shrinking fails `out` already
    /// holds the popped element, but the stack is left empty with zero capacity.
    #[track_caller]
    pub fn pop_into(&mut self, out: &mut T) -> Result<()> {
        self.check("pop");
        self.require_live("pop");

        if self.status.contains(Status::EMPTY) {
            return Err(StackError::EmptyStack);
        }

        let copy = self.copy_fn("pop");
        self.size -= 1;
        copy(out, &self.slots()[self.size]);
        if self.size == 0 {
            self.status.insert(Status::EMPTY);
        }
        self.rehash();

        let half = self.capacity / GROWTH_FACTOR;
        let result = if self.size < half.saturating_sub(SHRINK_SLACK) {
            trace!(from = self.capacity, to = half, "shrinking stack");
            self.reallocate(half)
        } else {
            Ok(())
        };

        self.check("pop");
        result
    }

    /// Pops the top element.
    #[track_caller]
    pub fn pop(&mut self) -> Result<T> {
        let mut out = T::poison();
        self.pop_into(&mut out)?;
        Ok(out)
    }

    /// Reallocates the buffer to exactly `new_capacity` elements.
    ///
    /// Slots gained by growing are filled with [`Element::poison`]. A capacity of 0 releases the
    /// buffer.
    ///
    /// # Panics
    ///
    /// If `new_capacity` is smaller than the current size.
    #[track_caller]
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        self.check("resize");
        self.require_live("resize");
        self.require(
            new_capacity >= self.size,
            "resize",
            "new capacity cannot hold the elements on the stack",
        );

        let result = self.reallocate(new_capacity);

        self.check("resize");
        result
    }

    // Leaves the stack consistent whatever happens. On failure the buffer is gone and the stack is
    // empty with zero capacity.
    fn reallocate(&mut self, new_capacity: usize) -> Result<()> {
        let old_capacity = self.capacity;
        let result = match (self.buffer.take(), new_capacity) {
            (_, 0) => Ok(None),
            (None, capacity) => GuardedBuffer::new_in(capacity, self.alloc.clone()).map(Some),
            (Some(buffer), capacity) => buffer.resize(capacity).map(Some),
        };

        match result {
            Ok(buffer) => {
                self.buffer = buffer;
                self.capacity = new_capacity;
                if new_capacity > old_capacity {
                    self.poison(old_capacity);
                }
                self.rehash();
                Ok(())
            }
            Err(err) => {
                warn!(
                    name = self.origin.name,
                    capacity = new_capacity,
                    %err,
                    "stack buffer reallocation failed, contents dropped"
                );
                self.capacity = 0;
                self.size = 0;
                self.status.insert(Status::EMPTY);
                self.rehash();
                Err(err.into())
            }
        }
    }

    fn poison(&mut self, from: usize) {
        let copy = self.copy_fn("poison");
        let poison = T::poison();
        for slot in &mut self.slots_mut()[from..] {
            copy(slot, &poison);
        }
    }

    fn slots_mut(&mut self) -> &mut [T] {
        match &mut self.buffer {
            Some(buffer) => buffer.as_mut_slice(),
            None => &mut [],
        }
    }

    #[track_caller]
    fn copy_fn(&self, operation: &'static str) -> CopyFn<T> {
        match self.copy {
            Some(copy) => copy,
            None => self.fatal(operation, "stack has no copy function", self.validate()),
        }
    }

    #[track_caller]
    fn require_live(&self, operation: &'static str) {
        self.require(
            self.status.contains(Status::INIT),
            operation,
            "stack is not initialized",
        );
        self.require(
            !self.status.contains(Status::DESTROYED),
            operation,
            "stack is destroyed",
        );
    }

    #[track_caller]
    fn require(&self, condition: bool, operation: &'static str, reason: &'static str) {
        if !condition {
            self.fatal(operation, reason, self.validate());
        }
    }

    #[cfg(feature = "self-check")]
    #[track_caller]
    fn check(&self, operation: &'static str) {
        let violations = self.validate();
        if !violations.is_empty() {
            self.fatal(operation, "stack integrity violated", violations);
        }
    }

    #[cfg(not(feature = "self-check"))]
    #[inline(always)]
    fn check(&self, _operation: &'static str) {}

    #[cold]
    #[inline(never)]
    #[track_caller]
    fn fatal(&self, operation: &'static str, reason: &'static str, violations: Violations) -> ! {
        let site = CallSite::caller(operation);
        let dump = dump::dump_to_string(Some(self), violations, site, DumpOptions::default());
        error!(
            operation,
            reason,
            violations = violations.bits(),
            "contract violation\n{}",
            dump
        );
        panic!(
            "{} at {}:{}: {} ({:?})",
            operation, site.file, site.line, reason, violations
        );
    }
}

impl<T: Element, A: RawAlloc> Stack<T, A> {
    /// Number of elements on the stack.
    pub fn size(&self) -> Result<usize> {
        self.ensure_valid()?;
        Ok(self.size)
    }

    /// Number of element slots in the buffer.
    pub fn capacity(&self) -> Result<usize> {
        self.ensure_valid()?;
        Ok(self.capacity)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.ensure_valid()?;
        Ok(self.status.contains(Status::EMPTY))
    }

    /// Checks every structural invariant, see [`integrity::validate`].
    pub fn validate(&self) -> Violations {
        integrity::check(self)
    }

    /// All `capacity` slots, the unoccupied ones included.
    pub fn slots(&self) -> &[T] {
        match &self.buffer {
            Some(buffer) => buffer.as_slice(),
            None => &[],
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn origin(&self) -> &DebugOrigin {
        &self.origin
    }

    /// Fingerprints as of the last mutation: `(control block, buffer)`.
    pub fn hashes(&self) -> (u32, u32) {
        (self.control_hash, self.buffer_hash)
    }

    /// Address of the first element slot, null without a buffer.
    pub fn as_ptr(&self) -> *const T {
        match &self.buffer {
            Some(buffer) => buffer.as_ptr(),
            None => std::ptr::null(),
        }
    }

    /// The raw buffer block, guards included, or `None` without a buffer. Element 0 starts at
    /// [`GuardedBuffer::GUARD_PREFIX`].
    ///
    /// # Safety
    ///
    /// Writes through the slice bypass every bookkeeping step of the stack. This exists to
    /// simulate out-of-band corruption; anything written here is expected to show up in
    /// [`validate`](Stack::validate).
    pub unsafe fn raw_buffer_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.buffer {
            Some(buffer) => Some(buffer.raw_bytes_mut()),
            None => None,
        }
    }

    pub(crate) fn rehash(&mut self) {
        self.buffer_hash = self.buffer_fingerprint();
        self.control_hash = self.control_fingerprint();
    }

    pub(crate) fn buffer_fingerprint(&self) -> u32 {
        match &self.buffer {
            Some(buffer) => fingerprint(buffer.element_bytes()),
            None => 0,
        }
    }

    // Covers every control field except the canaries, which are checked on their own, and the
    // control hash itself.
    pub(crate) fn control_fingerprint(&self) -> u32 {
        let mut hasher = Fingerprint::new();
        hasher.write_usize(self.as_ptr() as usize);
        hasher.write_usize(self.capacity);
        hasher.write_usize(self.size);
        hasher.write_usize(self.copy.map_or(0, |copy| copy as usize));
        hasher.write_u8(self.status.bits());
        hasher.write(self.origin.name.as_bytes());
        hasher.write(self.origin.file.as_bytes());
        hasher.write(self.origin.function.as_bytes());
        hasher.write_u32(self.origin.line);
        hasher.write_u32(self.buffer_hash);
        hasher.value()
    }

    fn ensure_valid(&self) -> Result<()> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(StackError::Invalid(violations))
        }
    }
}

impl<T: Element + fmt::Debug, A: RawAlloc> fmt::Debug for Stack<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("origin", &self.origin)
            .field("status", &self.status)
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("buffer", &self.buffer)
            .field("control_hash", &self.control_hash)
            .field("buffer_hash", &self.buffer_hash)
            .finish()
    }
}
