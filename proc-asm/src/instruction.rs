use core::fmt;

use crate::codec::CodecError;
use crate::op::{BinaryOp, ComparisonOp, UnaryOp};

/// Discriminant byte of an [`Instruction`] payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum InstructionRepr {
    /// Blocking comparison guard.
    Block = 0x00,
    /// Conditional skip of the following clause pair.
    IfElse = 0x01,
    /// Literal parameter assignment.
    Set = 0x02,
    /// Unary operation.
    Unop = 0x03,
    /// Binary operation.
    Binop = 0x04,
    /// Invocation of another stored procedure.
    Call = 0x05,
    /// No operation.
    Noop = 0x06,
}

impl TryFrom<u8> for InstructionRepr {
    type Error = CodecError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0x00 => Ok(Self::Block),
            0x01 => Ok(Self::IfElse),
            0x02 => Ok(Self::Set),
            0x03 => Ok(Self::Unop),
            0x04 => Ok(Self::Binop),
            0x05 => Ok(Self::Call),
            0x06 => Ok(Self::Noop),
            _ => Err(CodecError::UnknownInstruction(b)),
        }
    }
}

/// Type-tagged payload of an [`Instruction`].
///
/// Parameter names are free-form strings resolved against the distributed
/// parameter space at run time; empty strings are legal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionOp {
    /// Re-evaluate `param_a op param_b` until true or until the block
    /// timeout elapses.
    Block {
        /// Left-hand parameter name.
        param_a: String,
        /// Comparison to apply.
        op: ComparisonOp,
        /// Right-hand parameter name.
        param_b: String,
    },
    /// Evaluate `param_a op param_b` once and arm the if/else skip flag.
    IfElse {
        /// Left-hand parameter name.
        param_a: String,
        /// Comparison to apply.
        op: ComparisonOp,
        /// Right-hand parameter name.
        param_b: String,
    },
    /// Write a literal value into a parameter.
    Set {
        /// Destination parameter name.
        param: String,
        /// Literal value, coerced through the parameter type.
        value: String,
    },
    /// Fetch `param`, apply `op`, store into `result`.
    Unop {
        /// Source parameter name.
        param: String,
        /// Unary operator to apply.
        op: UnaryOp,
        /// Destination parameter name.
        result: String,
    },
    /// Fetch both operands, apply `op`, store into `result`.
    Binop {
        /// Left-hand parameter name.
        param_a: String,
        /// Binary operator to apply.
        op: BinaryOp,
        /// Right-hand parameter name.
        param_b: String,
        /// Destination parameter name.
        result: String,
    },
    /// Invoke the procedure stored in `slot`.
    Call {
        /// Callee slot index.
        slot: u8,
    },
    /// Do nothing.
    Noop,
}

impl InstructionOp {
    /// Wire discriminant of this payload.
    pub const fn repr(&self) -> InstructionRepr {
        match self {
            Self::Block { .. } => InstructionRepr::Block,
            Self::IfElse { .. } => InstructionRepr::IfElse,
            Self::Set { .. } => InstructionRepr::Set,
            Self::Unop { .. } => InstructionRepr::Unop,
            Self::Binop { .. } => InstructionRepr::Binop,
            Self::Call { .. } => InstructionRepr::Call,
            Self::Noop => InstructionRepr::Noop,
        }
    }
}

/// One operation of a stored procedure.
///
/// `node` is the 16-bit network endpoint the instruction targets; `0` denotes
/// the node executing the procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// Target node identifier.
    pub node: u16,
    /// Type-tagged payload.
    pub op: InstructionOp,
}

impl Instruction {
    /// Blocking guard instruction.
    pub fn block(param_a: impl Into<String>, op: ComparisonOp, param_b: impl Into<String>, node: u16) -> Self {
        Self {
            node,
            op: InstructionOp::Block {
                param_a: param_a.into(),
                op,
                param_b: param_b.into(),
            },
        }
    }

    /// Conditional instruction arming the if/else skip flag.
    pub fn ifelse(param_a: impl Into<String>, op: ComparisonOp, param_b: impl Into<String>, node: u16) -> Self {
        Self {
            node,
            op: InstructionOp::IfElse {
                param_a: param_a.into(),
                op,
                param_b: param_b.into(),
            },
        }
    }

    /// Literal assignment instruction.
    pub fn set(param: impl Into<String>, value: impl Into<String>, node: u16) -> Self {
        Self {
            node,
            op: InstructionOp::Set {
                param: param.into(),
                value: value.into(),
            },
        }
    }

    /// Unary operation instruction.
    pub fn unop(param: impl Into<String>, op: UnaryOp, result: impl Into<String>, node: u16) -> Self {
        Self {
            node,
            op: InstructionOp::Unop {
                param: param.into(),
                op,
                result: result.into(),
            },
        }
    }

    /// Binary operation instruction.
    pub fn binop(
        param_a: impl Into<String>,
        op: BinaryOp,
        param_b: impl Into<String>,
        result: impl Into<String>,
        node: u16,
    ) -> Self {
        Self {
            node,
            op: InstructionOp::Binop {
                param_a: param_a.into(),
                op,
                param_b: param_b.into(),
                result: result.into(),
            },
        }
    }

    /// Procedure call instruction.
    pub const fn call(slot: u8, node: u16) -> Self {
        Self {
            node,
            op: InstructionOp::Call { slot },
        }
    }

    /// No-op instruction.
    pub const fn noop(node: u16) -> Self {
        Self {
            node,
            op: InstructionOp::Noop,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            InstructionOp::Block { param_a, op, param_b } => {
                write!(f, "block {param_a} {op} {param_b} @{}", self.node)
            }
            InstructionOp::IfElse { param_a, op, param_b } => {
                write!(f, "ifelse {param_a} {op} {param_b} @{}", self.node)
            }
            InstructionOp::Set { param, value } => write!(f, "set {param} {value} @{}", self.node),
            InstructionOp::Unop { param, op, result } => {
                write!(f, "unop {param} {op} {result} @{}", self.node)
            }
            InstructionOp::Binop {
                param_a,
                op,
                param_b,
                result,
            } => write!(f, "binop {param_a} {op} {param_b} {result} @{}", self.node),
            InstructionOp::Call { slot } => write!(f, "call {slot} @{}", self.node),
            InstructionOp::Noop => write!(f, "noop @{}", self.node),
        }
    }
}
