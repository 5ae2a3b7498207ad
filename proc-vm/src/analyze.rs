//! Pre-execution static analysis.
//!
//! Before a worker runs a procedure, the analyzer walks its call graph once,
//! deep-copying every reachable callee out of the slot store and flagging
//! which `CALL` instructions are tail calls. The result is an arena of
//! analysis nodes addressed by [`AnalysisId`]; cyclic call graphs converge
//! because a slot already under analysis resolves to its existing node.

use proc_asm::{InstructionOp, InstructionRepr, Procedure};

use crate::error::RuntimeError;
use crate::store::ProcStore;

const SLOT_COUNT: usize = proc_asm::MAX_PROC_SLOT as usize + 1;

/// Handle of one analysis node within a [`CallGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisId(usize);

/// Analysis payload of a `CALL` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallAnalysis {
    /// No observable instruction of the caller follows this call.
    pub is_tail_call: bool,
}

/// One resolved `CALL` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    /// Callee slot.
    pub slot: u8,
    /// Callee analysis node.
    pub target: AnalysisId,
}

/// Analysis of a single procedure.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    proc: Procedure,
    // One entry per instruction; only CALL carries a payload.
    instructions: Vec<Option<CallAnalysis>>,
    edges: Vec<CallEdge>,
}

impl Analysis {
    /// The analyzed procedure.
    pub fn proc(&self) -> &Procedure {
        &self.proc
    }

    /// Analysis payload of the instruction at `index`.
    pub fn call(&self, index: usize) -> Option<&CallAnalysis> {
        self.instructions.get(index).and_then(Option::as_ref)
    }

    /// First edge targeting `slot`. Multiple calls to one slot share a
    /// single callee node, so the first match is the right one.
    pub fn edge_for_slot(&self, slot: u8) -> Option<&CallEdge> {
        self.edges.iter().find(|edge| edge.slot == slot)
    }

    /// All resolved call edges, in instruction order.
    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }
}

/// Arena of analysis nodes for one procedure run.
#[derive(Debug)]
pub struct CallGraph {
    nodes: Vec<Analysis>,
    root: AnalysisId,
}

impl CallGraph {
    /// Node behind `id`.
    pub fn node(&self, id: AnalysisId) -> &Analysis {
        &self.nodes[id.0]
    }

    /// The root procedure's node.
    pub fn root(&self) -> AnalysisId {
        self.root
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Decide whether the `CALL` at `index` is a tail call.
///
/// A call sandwiched between an `IFELSE` and its else-clause is the
/// if-clause; the scan then starts after the else-clause. Everything scanned
/// must be `NOOP` for the call to be a tail call.
fn is_tail_call(proc: &Procedure, index: usize) -> bool {
    let instructions = proc.instructions();
    let n = instructions.len();
    let after_ifelse = index > 0 && instructions[index - 1].op.repr() == InstructionRepr::IfElse;

    let scan_from = if after_ifelse {
        if index + 1 >= n {
            return true;
        }
        index + 2
    } else {
        index + 1
    };

    instructions[scan_from.min(n)..]
        .iter()
        .all(|instruction| instruction.op.repr() == InstructionRepr::Noop)
}

struct Analyzer<'s> {
    store: &'s ProcStore,
    nodes: Vec<Analysis>,
    // Per-slot node of procedures already under analysis; re-entry reuses it.
    in_flight: Vec<Option<AnalysisId>>,
}

impl<'s> Analyzer<'s> {
    fn new(store: &'s ProcStore) -> Self {
        Self {
            store,
            nodes: Vec::new(),
            in_flight: vec![None; SLOT_COUNT],
        }
    }

    fn reserve(&mut self) -> AnalysisId {
        self.nodes.push(Analysis::default());
        AnalysisId(self.nodes.len() - 1)
    }

    fn analyze_slot(&mut self, slot: u8) -> Result<AnalysisId, RuntimeError> {
        if let Some(id) = self.in_flight[slot as usize] {
            return Ok(id);
        }
        let proc = self.store.get(slot).ok_or(RuntimeError::SlotEmpty(slot))?;
        let id = self.reserve();
        // Register before descending so cycles resolve to this node.
        self.in_flight[slot as usize] = Some(id);
        self.fill(id, proc)?;
        Ok(id)
    }

    fn fill(&mut self, id: AnalysisId, proc: Procedure) -> Result<(), RuntimeError> {
        let mut instructions = Vec::with_capacity(proc.len());
        let mut edges = Vec::new();

        for (index, instruction) in proc.instructions().iter().enumerate() {
            match instruction.op {
                InstructionOp::Call { slot } => {
                    instructions.push(Some(CallAnalysis {
                        is_tail_call: is_tail_call(&proc, index),
                    }));
                    let target = self.analyze_slot(slot)?;
                    edges.push(CallEdge { slot, target });
                }
                _ => instructions.push(None),
            }
        }

        self.nodes[id.0] = Analysis {
            proc,
            instructions,
            edges,
        };
        Ok(())
    }
}

/// Analyze a detached root procedure against the slot store.
///
/// The root is not registered under any slot: a `CALL` back into the slot it
/// came from resolves to the procedure *currently stored* there.
pub fn analyze(proc: Procedure, store: &ProcStore) -> Result<CallGraph, RuntimeError> {
    let mut analyzer = Analyzer::new(store);
    let root = analyzer.reserve();
    analyzer.fill(root, proc)?;
    Ok(CallGraph {
        nodes: analyzer.nodes,
        root,
    })
}
