//! Procedure interpreter.
//!
//! Walks a procedure's instructions in source order against the parameter
//! space, driven by the analysis graph produced before the run. Control flow
//! is limited to the if/else skip flag and `CALL`; a tail call surfaces as
//! [`ExecuteState::TailCall`] and rebinds the current frame instead of
//! recursing, so self-chaining procedures run in constant stack space.

use std::thread;
use std::time::Instant;

use proc_asm::{ComparisonOp, Instruction, InstructionOp, UnaryOp};
use tracing::trace;

use crate::analyze::{Analysis, AnalysisId, CallGraph};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::param::ParamSpace;
use crate::runtime::CancelToken;
use crate::state::{ExecuteState, IfElseFlag};

mod operand;
mod params;

pub use operand::Operand;

use params::SetSource;

/// Executes one procedure invocation against a parameter space.
///
/// Strictly sequential within a worker; every suspension is an OS-level
/// sleep or blocking parameter I/O.
#[derive(Debug)]
pub struct Interpreter<'a, P> {
    graph: &'a CallGraph,
    params: &'a P,
    config: &'a RuntimeConfig,
    cancel: &'a CancelToken,
}

impl<'a, P: ParamSpace> Interpreter<'a, P> {
    /// Interpreter over an analyzed call graph.
    pub fn new(graph: &'a CallGraph, params: &'a P, config: &'a RuntimeConfig, cancel: &'a CancelToken) -> Self {
        Self {
            graph,
            params,
            config,
            cancel,
        }
    }

    /// Execute the root procedure to completion.
    pub fn run(&self) -> Result<(), RuntimeError> {
        self.exec(self.graph.root(), 0)
    }

    /// Execute one frame. `depth` counts nested non-tail calls; tail calls
    /// stay within the frame and don't grow it.
    fn exec(&self, id: AnalysisId, depth: usize) -> Result<(), RuntimeError> {
        if depth > self.config.max_recursion_depth {
            return Err(RuntimeError::RecursionLimit);
        }

        let mut analysis = self.graph.node(id);
        let mut flag = IfElseFlag::None;
        let mut ip = 0usize;

        while let Some(instruction) = analysis.proc().instructions().get(ip) {
            if self.cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }

            match flag {
                IfElseFlag::False => {
                    // Skip this instruction.
                    flag = IfElseFlag::None;
                    ip += 1;
                    continue;
                }
                // If-clause runs now; the else-clause after it is skipped.
                IfElseFlag::True => flag = IfElseFlag::False,
                IfElseFlag::None => {}
            }

            trace!(ip, %instruction, "executing instruction");

            match self.instruction(analysis, ip, instruction, &mut flag, depth)? {
                ExecuteState::Proceed => ip += 1,
                ExecuteState::TailCall(next) => {
                    analysis = self.graph.node(next);
                    ip = 0;
                    flag = IfElseFlag::None;
                }
            }
        }

        Ok(())
    }

    fn instruction(
        &self,
        analysis: &Analysis,
        ip: usize,
        instruction: &Instruction,
        flag: &mut IfElseFlag,
        depth: usize,
    ) -> Result<ExecuteState, RuntimeError> {
        let node = instruction.node;
        match &instruction.op {
            InstructionOp::Block { param_a, op, param_b } => {
                self.block(param_a, *op, param_b, node)?;
                Ok(ExecuteState::Proceed)
            }
            InstructionOp::IfElse { param_a, op, param_b } => {
                *flag = if self.condition(param_a, *op, param_b, node)? {
                    IfElseFlag::True
                } else {
                    IfElseFlag::False
                };
                Ok(ExecuteState::Proceed)
            }
            InstructionOp::Set { param, value } => {
                self.set_param(param, node, SetSource::Literal(value))?;
                Ok(ExecuteState::Proceed)
            }
            InstructionOp::Unop { param, op, result } => {
                self.unop(param, *op, result, node)?;
                Ok(ExecuteState::Proceed)
            }
            InstructionOp::Binop {
                param_a,
                op,
                param_b,
                result,
            } => {
                let a = self.fetch_operand(param_a, node)?;
                let b = self.fetch_operand(param_b, node)?;
                let computed = Operand::binary(*op, a, b)?;
                self.set_param(result, node, SetSource::Computed(&computed))?;
                Ok(ExecuteState::Proceed)
            }
            InstructionOp::Call { slot } => self.call(analysis, ip, *slot, depth),
            InstructionOp::Noop => Ok(ExecuteState::Proceed),
        }
    }

    fn condition(&self, param_a: &str, op: ComparisonOp, param_b: &str, node: u16) -> Result<bool, RuntimeError> {
        let a = self.fetch_operand(param_a, node)?;
        let b = self.fetch_operand(param_b, node)?;
        Operand::compare(op, &a, &b, self.config.float_epsilon)
    }

    /// Re-evaluate the guard until it holds, sleeping between polls, up to
    /// the configured block timeout.
    fn block(&self, param_a: &str, op: ComparisonOp, param_b: &str, node: u16) -> Result<(), RuntimeError> {
        let deadline = Instant::now() + self.config.block_timeout;
        loop {
            if self.cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            if self.condition(param_a, op, param_b, node)? {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RuntimeError::BlockTimeout);
            }
            thread::sleep(self.config.block_period.min(deadline - now));
        }
    }

    /// `rmt` swaps locality: the source is read locally and the result lands
    /// on the instruction's node. Every other unary keeps the instruction's
    /// node for the fetch and stores locally.
    fn unop(&self, param: &str, op: UnaryOp, result: &str, node: u16) -> Result<(), RuntimeError> {
        let (fetch_node, result_node) = if op == UnaryOp::Rmt { (0, node) } else { (node, 0) };
        let operand = self.fetch_operand(param, fetch_node)?;
        let computed = Operand::unary(op, operand)?;
        self.set_param(result, result_node, SetSource::Computed(&computed))
    }

    fn call(&self, analysis: &Analysis, ip: usize, slot: u8, depth: usize) -> Result<ExecuteState, RuntimeError> {
        let edge = analysis
            .edge_for_slot(slot)
            .ok_or(RuntimeError::UnknownCallee(slot))?;

        if analysis.call(ip).is_some_and(|call| call.is_tail_call) {
            trace!(slot, "tail call, reusing frame");
            return Ok(ExecuteState::TailCall(edge.target));
        }

        self.exec(edge.target, depth + 1)?;
        Ok(ExecuteState::Proceed)
    }
}
