//! Wire codec for [`Procedure`].
//!
//! A procedure travels in a single datagram. The first two bytes of the
//! datagram belong to the request framing (header byte and slot byte); the
//! body packed here starts at [`PROC_BODY_OFFSET`]:
//!
//! 1. `instruction_count: u8`
//! 2. per instruction: `node: u16` LE, `type: u8`, then the type body with
//!    inline NUL-terminated strings and `u32` LE operator discriminants.

use core::fmt;

use crate::instruction::{Instruction, InstructionOp, InstructionRepr};
use crate::op::{BinaryOp, ComparisonOp, UnaryOp};
use crate::procedure::Procedure;

/// Fixed datagram payload capacity of the underlying transport.
pub const PACKET_DATA_SIZE: usize = 256;

/// Offset of the packed procedure body within a datagram payload.
pub const PROC_BODY_OFFSET: usize = 2;

/// Errors produced while packing or unpacking a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The procedure holds [`crate::MAX_INSTRUCTIONS`] instructions already.
    TooManyInstructions,
    /// Packed body plus framing exceeds [`PACKET_DATA_SIZE`].
    ProcedureTooLarge(usize),
    /// The type byte maps to no known instruction.
    UnknownInstruction(u8),
    /// The operator discriminant maps to no known operator.
    UnknownOperator(u32),
    /// The header byte's type nibble maps to no known message.
    UnknownMessage(u8),
    /// The packet ended in the middle of a fixed-width field.
    UnexpectedEnd,
    /// A string field ran past the end of the packet without a terminator.
    UnterminatedString,
    /// A string field held invalid UTF-8.
    InvalidString,
    /// A string field holds an interior NUL and can't be framed.
    EmbeddedNul,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyInstructions => write!(f, "procedure instruction buffer is full"),
            Self::ProcedureTooLarge(size) => {
                write!(f, "packed procedure ({size} bytes) exceeds the packet capacity")
            }
            Self::UnknownInstruction(b) => write!(f, "unknown instruction type {b:#04x}"),
            Self::UnknownOperator(d) => write!(f, "unknown operator discriminant {d:#010x}"),
            Self::UnknownMessage(b) => write!(f, "unknown message type {b:#04x}"),
            Self::UnexpectedEnd => write!(f, "packet ended mid-field"),
            Self::UnterminatedString => write!(f, "unterminated string in packet"),
            Self::InvalidString => write!(f, "string field is not valid utf-8"),
            Self::EmbeddedNul => write!(f, "string field holds an interior nul byte"),
        }
    }
}

impl std::error::Error for CodecError {}

impl Procedure {
    /// Packed body length in bytes, excluding the two framing bytes.
    ///
    /// Callers verify `encoded_len() + PROC_BODY_OFFSET` against
    /// [`PACKET_DATA_SIZE`] before transmission; [`pack_proc`] enforces the
    /// same bound.
    pub fn encoded_len(&self) -> usize {
        let body: usize = self
            .instructions
            .iter()
            .map(|instruction| {
                // node + type byte
                3 + match &instruction.op {
                    InstructionOp::Block { param_a, param_b, .. }
                    | InstructionOp::IfElse { param_a, param_b, .. } => param_a.len() + param_b.len() + 6,
                    InstructionOp::Set { param, value } => param.len() + value.len() + 2,
                    InstructionOp::Unop { param, result, .. } => param.len() + result.len() + 6,
                    InstructionOp::Binop {
                        param_a,
                        param_b,
                        result,
                        ..
                    } => param_a.len() + param_b.len() + result.len() + 7,
                    InstructionOp::Call { .. } => 1,
                    InstructionOp::Noop => 0,
                }
            })
            .sum();
        1 + body
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<(), CodecError> {
    if s.as_bytes().contains(&0) {
        return Err(CodecError::EmbeddedNul);
    }
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    Ok(())
}

/// Append the packed body of `proc` to `buf`.
///
/// `buf` is expected to already hold the [`PROC_BODY_OFFSET`] framing bytes;
/// packing fails if the total would exceed [`PACKET_DATA_SIZE`]. The source
/// procedure is borrowed immutably and never modified.
pub fn pack_proc(proc: &Procedure, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    let total = buf.len() + proc.encoded_len();
    if total > PACKET_DATA_SIZE {
        return Err(CodecError::ProcedureTooLarge(total));
    }

    buf.push(proc.len() as u8);
    for instruction in proc.instructions() {
        buf.extend_from_slice(&instruction.node.to_le_bytes());
        buf.push(instruction.op.repr() as u8);

        match &instruction.op {
            InstructionOp::Block { param_a, op, param_b } | InstructionOp::IfElse { param_a, op, param_b } => {
                put_str(buf, param_a)?;
                buf.extend_from_slice(&(*op as u32).to_le_bytes());
                put_str(buf, param_b)?;
            }
            InstructionOp::Set { param, value } => {
                put_str(buf, param)?;
                put_str(buf, value)?;
            }
            InstructionOp::Unop { param, op, result } => {
                put_str(buf, param)?;
                buf.extend_from_slice(&(*op as u32).to_le_bytes());
                put_str(buf, result)?;
            }
            InstructionOp::Binop {
                param_a,
                op,
                param_b,
                result,
            } => {
                put_str(buf, param_a)?;
                buf.extend_from_slice(&(*op as u32).to_le_bytes());
                put_str(buf, param_b)?;
                put_str(buf, result)?;
            }
            InstructionOp::Call { slot } => buf.push(*slot),
            InstructionOp::Noop => {}
        }
    }

    Ok(())
}

/// Bounds-checked reader over a packet body.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        let slice = self.bytes.get(self.pos..end).ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_str(&mut self) -> Result<String, CodecError> {
        let rest = &self.bytes[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::UnterminatedString)?;
        let s = core::str::from_utf8(&rest[..nul]).map_err(|_| CodecError::InvalidString)?;
        self.pos += nul + 1;
        Ok(s.to_owned())
    }
}

/// Decode a procedure from a packet body (the bytes after the two framing
/// bytes).
///
/// Every read is bounds-checked against the body length; truncated fields,
/// unterminated strings and unknown discriminants fail.
pub fn unpack_proc(body: &[u8]) -> Result<Procedure, CodecError> {
    let mut cursor = Cursor::new(body);
    let count = cursor.take_u8()? as usize;

    let mut proc = Procedure::new();
    for _ in 0..count {
        let node = cursor.take_u16()?;
        let repr = InstructionRepr::try_from(cursor.take_u8()?)?;

        let op = match repr {
            InstructionRepr::Block | InstructionRepr::IfElse => {
                let param_a = cursor.take_str()?;
                let op = ComparisonOp::try_from(cursor.take_u32()?)?;
                let param_b = cursor.take_str()?;
                if repr == InstructionRepr::Block {
                    InstructionOp::Block { param_a, op, param_b }
                } else {
                    InstructionOp::IfElse { param_a, op, param_b }
                }
            }
            InstructionRepr::Set => InstructionOp::Set {
                param: cursor.take_str()?,
                value: cursor.take_str()?,
            },
            InstructionRepr::Unop => {
                let param = cursor.take_str()?;
                let op = UnaryOp::try_from(cursor.take_u32()?)?;
                let result = cursor.take_str()?;
                InstructionOp::Unop { param, op, result }
            }
            InstructionRepr::Binop => {
                let param_a = cursor.take_str()?;
                let op = BinaryOp::try_from(cursor.take_u32()?)?;
                let param_b = cursor.take_str()?;
                let result = cursor.take_str()?;
                InstructionOp::Binop {
                    param_a,
                    op,
                    param_b,
                    result,
                }
            }
            InstructionRepr::Call => InstructionOp::Call {
                slot: cursor.take_u8()?,
            },
            InstructionRepr::Noop => InstructionOp::Noop,
        };

        proc.push(Instruction { node, op })?;
    }

    Ok(proc)
}
