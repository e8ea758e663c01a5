use bitflags::bitflags;
use canary_alloc::{RawAlloc, LEFT_BUFFER_CANARY, LEFT_CANARY, RIGHT_BUFFER_CANARY, RIGHT_CANARY};

use crate::element::Element;
use crate::stack::{Stack, Status};

bitflags! {
    /// Structural invariants a stack failed, one bit per invariant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Violations: u16 {
        const NULL_STACK             = 1 << 0;
        const DESTROY_WITHOUT_INIT   = 1 << 1;
        const INCORRECT_STATUS       = 1 << 2;
        const NULL_BUFFER            = 1 << 3;
        const CAPACITY_LESS_THAN_SIZE = 1 << 4;
        const NO_COPY_FN             = 1 << 5;
        const LEFT_CANARY            = 1 << 6;
        const RIGHT_CANARY           = 1 << 7;
        const LEFT_BUFFER_CANARY     = 1 << 8;
        const RIGHT_BUFFER_CANARY    = 1 << 9;
        const NO_NAME                = 1 << 10;
        const NO_FILE_NAME           = 1 << 11;
        const NO_FUNCTION_NAME       = 1 << 12;
        const BAD_LINE               = 1 << 13;
        const CONTROL_HASH           = 1 << 14;
        const BUFFER_HASH            = 1 << 15;
    }
}

const MESSAGES: [&str; 16] = [
    "Pointer to stack is null",
    "Stack was destroyed without init",
    "Status is incorrect",
    "Pointer to stack's buffer is null",
    "Capacity is less than size",
    "Stack has no copy function",
    "Left canary is dead",
    "Right canary is dead",
    "Left buffer canary is dead",
    "Right buffer canary is dead",
    "Stack has no name",
    "Stack has no file name",
    "Stack has no function name",
    "Stack has no valid line",
    "Stack hash is corrupted",
    "Stack's buffer hash is corrupted",
];

impl Violations {
    /// Human readable messages for every set bit, lowest bit first.
    pub fn messages(self) -> impl Iterator<Item = &'static str> {
        (0..MESSAGES.len())
            .filter(move |&bit| self.bits() & (1u16 << bit) != 0)
            .map(|bit| MESSAGES[bit])
    }
}

/// Checks every invariant of `stack` and returns the ones that do not hold.
///
/// A missing stack only reports [`Violations::NULL_STACK`].
pub fn validate<T: Element, A: RawAlloc>(stack: Option<&Stack<T, A>>) -> Violations {
    match stack {
        None => Violations::NULL_STACK,
        Some(stack) => check(stack),
    }
}

// Every invariant is evaluated, none short-circuits another.
pub(crate) fn check<T: Element, A: RawAlloc>(stack: &Stack<T, A>) -> Violations {
    let mut violations = Violations::empty();
    let status = stack.status;
    let initialized = status.contains(Status::INIT);
    let live = initialized && !status.contains(Status::DESTROYED);

    if status.contains(Status::DESTROYED) && !initialized {
        violations |= Violations::DESTROY_WITHOUT_INIT;
    }
    if initialized && status.contains(Status::EMPTY) != (stack.size == 0) {
        violations |= Violations::INCORRECT_STATUS;
    }
    if stack.buffer.is_none() && stack.capacity > 0 {
        violations |= Violations::NULL_BUFFER;
    }
    if stack.capacity < stack.size {
        violations |= Violations::CAPACITY_LESS_THAN_SIZE;
    }
    if live && stack.copy.is_none() {
        violations |= Violations::NO_COPY_FN;
    }

    if stack.left_canary != LEFT_CANARY {
        violations |= Violations::LEFT_CANARY;
    }
    if stack.right_canary != RIGHT_CANARY {
        violations |= Violations::RIGHT_CANARY;
    }
    if let Some(buffer) = &stack.buffer {
        if buffer.left_guard() != LEFT_BUFFER_CANARY {
            violations |= Violations::LEFT_BUFFER_CANARY;
        }
        if buffer.right_guard() != RIGHT_BUFFER_CANARY {
            violations |= Violations::RIGHT_BUFFER_CANARY;
        }
    }

    if stack.buffer_fingerprint() != stack.buffer_hash {
        violations |= Violations::BUFFER_HASH;
    }
    if stack.control_fingerprint() != stack.control_hash {
        violations |= Violations::CONTROL_HASH;
    }

    let origin = &stack.origin;
    if origin.name.is_empty() {
        violations |= Violations::NO_NAME;
    }
    if origin.file.is_empty() {
        violations |= Violations::NO_FILE_NAME;
    }
    if origin.function.is_empty() {
        violations |= Violations::NO_FUNCTION_NAME;
    }
    if origin.line == 0 {
        violations |= Violations::BAD_LINE;
    }

    violations
}
