//! Execution state representation for the interpreter.

use crate::analyze::AnalysisId;

/// Resulting state of a single instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecuteState {
    /// The interpreter should proceed to the next instruction.
    Proceed,
    /// A tail call: the interpreter rebinds its procedure/analysis pair to
    /// the callee and restarts from instruction 0, reusing the current
    /// execution frame.
    TailCall(AnalysisId),
}

impl ExecuteState {
    /// `true` if the instruction pointer should simply advance.
    pub const fn should_continue(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

impl Default for ExecuteState {
    fn default() -> Self {
        Self::Proceed
    }
}

/// Interpreter-local register controlling the single-instruction skip of
/// if- and else-clauses.
///
/// `IFELSE` leaves the flag `True` or `False`; evaluation errors surface as
/// instruction failures instead of flag states. Consequently conditionals
/// never nest: the instruction after an `IFELSE` is the if-clause, the one
/// after that the else-clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IfElseFlag {
    /// No conditional in progress.
    #[default]
    None,
    /// Comparison held; the instruction after the next will be skipped.
    True,
    /// Comparison failed; the next instruction will be skipped.
    False,
}
