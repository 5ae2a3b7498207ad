//! Procedure VM.
//!
//! Stores tiny client-built programs in 256 indexed slots, analyzes their
//! call graphs ahead of execution and runs them on supervised workers
//! against a distributed parameter space spanning local and remote nodes.
//! The instruction set and wire codec live in the `proc-asm` crate; the
//! parameter library and the small-packet transport are consumed through
//! the traits in [`param`] and [`transport`].

#![warn(missing_docs)]

pub mod analyze;
pub mod client;
pub mod config;
pub mod consts;
pub mod error;
pub mod interpreter;
pub mod param;
pub mod runtime;
pub mod server;
pub mod state;
pub mod store;
pub mod transport;

/// Convenience re-exports of the commonly used surface.
pub mod prelude {
    pub use proc_asm::{
        pack_proc, unpack_proc, BinaryOp, CodecError, ComparisonOp, Header, HeaderFlags, Instruction, InstructionOp,
        InstructionRepr, MessageKind, ProcBuilder, Procedure, UnaryOp, MAX_INSTRUCTIONS, MAX_PROC_SLOT,
        PACKET_DATA_SIZE, PROC_BODY_OFFSET,
    };

    pub use crate::analyze::{analyze, Analysis, AnalysisId, CallAnalysis, CallEdge, CallGraph};
    pub use crate::client::ProcClient;
    pub use crate::config::RuntimeConfig;
    pub use crate::error::RuntimeError;
    pub use crate::interpreter::{Interpreter, Operand};
    pub use crate::param::mem::MemParamSpace;
    pub use crate::param::{ParamError, ParamFlags, ParamMeta, ParamSpace, ParamType, ParamValue};
    pub use crate::runtime::{CancelToken, RunId, Runtime};
    pub use crate::server::ProcServer;
    pub use crate::state::{ExecuteState, IfElseFlag};
    pub use crate::store::ProcStore;
    pub use crate::transport::mem::{MemEndpoint, MemListener, MemNetwork};
    pub use crate::transport::{Connection, Listener, Packet, Priority, Transport, TransportError};
}
