//! Incremental procedure construction, the library surface behind an
//! interactive shell's `proc` command group.

use core::fmt;

use crate::codec::CodecError;
use crate::instruction::Instruction;
use crate::op::{BinaryOp, ComparisonOp, UnaryOp};
use crate::procedure::Procedure;

/// Builds the "current procedure" one instruction at a time.
///
/// Instruction appends fail once the procedure is full; nothing here touches
/// the network, pushing the finished procedure to a node is the client's job.
#[derive(Debug, Clone, Default)]
pub struct ProcBuilder {
    proc: Procedure,
}

impl ProcBuilder {
    /// Start over with an empty procedure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a blocking guard.
    pub fn block(&mut self, param_a: &str, op: ComparisonOp, param_b: &str, node: u16) -> Result<(), CodecError> {
        self.proc.push(Instruction::block(param_a, op, param_b, node))
    }

    /// Append a conditional.
    pub fn ifelse(&mut self, param_a: &str, op: ComparisonOp, param_b: &str, node: u16) -> Result<(), CodecError> {
        self.proc.push(Instruction::ifelse(param_a, op, param_b, node))
    }

    /// Append a literal assignment.
    pub fn set(&mut self, param: &str, value: &str, node: u16) -> Result<(), CodecError> {
        self.proc.push(Instruction::set(param, value, node))
    }

    /// Append a unary operation.
    pub fn unop(&mut self, param: &str, op: UnaryOp, result: &str, node: u16) -> Result<(), CodecError> {
        self.proc.push(Instruction::unop(param, op, result, node))
    }

    /// Append a binary operation.
    pub fn binop(
        &mut self,
        param_a: &str,
        op: BinaryOp,
        param_b: &str,
        result: &str,
        node: u16,
    ) -> Result<(), CodecError> {
        self.proc.push(Instruction::binop(param_a, op, param_b, result, node))
    }

    /// Append a call to another stored procedure.
    pub fn call(&mut self, slot: u8, node: u16) -> Result<(), CodecError> {
        self.proc.push(Instruction::call(slot, node))
    }

    /// Append a no-op.
    pub fn noop(&mut self, node: u16) -> Result<(), CodecError> {
        self.proc.push(Instruction::noop(node))
    }

    /// Remove the instruction at `index`, or the last one with `None`.
    pub fn pop(&mut self, index: Option<usize>) -> Option<Instruction> {
        self.proc.pop(index)
    }

    /// Packed body size of the procedure built so far.
    pub fn size(&self) -> usize {
        self.proc.encoded_len()
    }

    /// The procedure built so far.
    pub fn proc(&self) -> &Procedure {
        &self.proc
    }

    /// Consume the builder and yield the finished procedure.
    pub fn finish(self) -> Procedure {
        self.proc
    }
}

impl fmt::Display for ProcBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.proc.fmt(f)
    }
}
