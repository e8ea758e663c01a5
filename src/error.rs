use canary_alloc::AllocError;
use thiserror::Error;

use crate::integrity::Violations;

/// Recoverable failures of stack operations.
///
/// Misuse of the API (pushing onto a destroyed stack, initializing twice, ...) is not reported
/// here, it panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// The buffer could not be (re)allocated. The stack is left empty with zero capacity.
    #[error("stack buffer allocation failed: {0}")]
    AllocationFailure(#[from] AllocError),
    #[error("pop from an empty stack")]
    EmptyStack,
    /// The stack failed validation, so no answer about it can be trusted.
    #[error("stack integrity violated: {0:?}")]
    Invalid(Violations),
}

pub type Result<T> = std::result::Result<T, StackError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown dump level `{0}`, expected one of: all, poison, unused")]
    UnknownDumpLevel(String),
}
