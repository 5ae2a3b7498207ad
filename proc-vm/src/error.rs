//! Runtime error variants.

use proc_asm::CodecError;
use thiserror::Error;

use crate::param::ParamError;
use crate::transport::TransportError;

/// Errors aborting a procedure, a request or a runtime operation.
///
/// Any instruction-level error terminates the enclosing procedure
/// immediately; the worker tears down and nothing is retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The addressed slot holds no procedure.
    #[error("slot {0} is empty")]
    SlotEmpty(u8),
    /// The addressed slot is occupied and overwriting wasn't requested.
    #[error("slot {0} is already occupied")]
    SlotOccupied(u8),
    /// The addressed slot is below the builder-side read-only range.
    #[error("slot {0} is reserved")]
    SlotReserved(u8),
    /// The concurrent-worker cap is reached.
    #[error("maximum number of concurrent procedures reached")]
    WorkerCapReached,
    /// The non-tail call depth bound was exceeded.
    #[error("maximum recursion depth exceeded")]
    RecursionLimit,
    /// A blocking guard gave up before its comparison held.
    #[error("block instruction timed out")]
    BlockTimeout,
    /// The worker was cancelled from outside.
    #[error("procedure cancelled")]
    Cancelled,
    /// Operand categories don't match for the attempted comparison or
    /// arithmetic.
    #[error("mismatched operand types")]
    TypeMismatch,
    /// The operator is undefined for the operand's category.
    #[error("operator unsupported for operand type")]
    UnsupportedOperand,
    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// A call instruction references a slot missing from the analysis edge
    /// list.
    #[error("callee slot {0} not present in call graph")]
    UnknownCallee(u8),
    /// The remote node flagged the request as failed.
    #[error("request failed at the remote node")]
    RequestFailed,
    /// Parameter-space failure.
    #[error(transparent)]
    Param(#[from] ParamError),
    /// Wire codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// OS-level failure, e.g. worker spawn.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
