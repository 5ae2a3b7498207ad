//! Atomic types of the procedure VM.
//!
//! A procedure is an ordered list of at most 255 instructions over a
//! distributed parameter space. This crate defines the instruction set, the
//! operator tables, the single-datagram wire codec and the request framing
//! shared by every node, plus the builder surface used by interactive
//! front-ends. Execution lives in the `proc-vm` crate.

#![warn(missing_docs)]

mod builder;
mod codec;
mod instruction;
mod op;
mod packet;
mod procedure;

#[cfg(test)]
mod encoding_tests;

pub use builder::ProcBuilder;
pub use codec::{pack_proc, unpack_proc, CodecError, PACKET_DATA_SIZE, PROC_BODY_OFFSET};
pub use instruction::{Instruction, InstructionOp, InstructionRepr};
pub use op::{BinaryOp, ComparisonOp, UnaryOp, UnknownOpError};
pub use packet::{Header, HeaderFlags, MessageKind, TYPE_MASK};
pub use procedure::{Procedure, MAX_INSTRUCTIONS, MAX_PROC_SLOT};
