use core::fmt;

use crate::codec::CodecError;
use crate::instruction::Instruction;

/// Maximum number of instructions in a procedure.
///
/// One less than 2⁸ so the count byte can't wrap to zero when the
/// instruction buffer is full.
pub const MAX_INSTRUCTIONS: usize = 255;

/// Highest addressable procedure slot.
pub const MAX_PROC_SLOT: u8 = 255;

/// An ordered sequence of up to [`MAX_INSTRUCTIONS`] instructions.
///
/// A stored procedure with zero instructions is indistinguishable from an
/// empty slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Procedure {
    pub(crate) instructions: Vec<Instruction>,
}

impl Procedure {
    /// Empty procedure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// `true` iff the procedure holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Append an instruction.
    ///
    /// Fails once the procedure holds [`MAX_INSTRUCTIONS`] entries.
    pub fn push(&mut self, instruction: Instruction) -> Result<(), CodecError> {
        if self.instructions.len() >= MAX_INSTRUCTIONS {
            return Err(CodecError::TooManyInstructions);
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// Remove and return the instruction at `index`, shifting the remainder
    /// down; with `None`, remove the last instruction.
    ///
    /// Returns `None` when the procedure is empty or `index` is out of range.
    pub fn pop(&mut self, index: Option<usize>) -> Option<Instruction> {
        match index {
            None => self.instructions.pop(),
            Some(i) if i < self.instructions.len() => Some(self.instructions.remove(i)),
            Some(_) => None,
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{i:3}: {instruction}")?;
        }
        Ok(())
    }
}

impl FromIterator<Instruction> for Procedure {
    /// Collects at most [`MAX_INSTRUCTIONS`] entries; the excess is dropped.
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().take(MAX_INSTRUCTIONS).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_respects_the_instruction_cap() {
        let mut proc = Procedure::new();
        for _ in 0..MAX_INSTRUCTIONS {
            proc.push(Instruction::noop(0)).unwrap();
        }
        assert!(matches!(
            proc.push(Instruction::noop(0)),
            Err(CodecError::TooManyInstructions)
        ));
        assert_eq!(proc.len(), MAX_INSTRUCTIONS);
    }

    #[test]
    fn pop_shifts_the_tail_down() {
        let mut proc = Procedure::new();
        proc.push(Instruction::noop(1)).unwrap();
        proc.push(Instruction::call(7, 0)).unwrap();
        proc.push(Instruction::noop(3)).unwrap();

        let removed = proc.pop(Some(1)).unwrap();
        assert_eq!(removed, Instruction::call(7, 0));
        assert_eq!(proc.instructions(), &[Instruction::noop(1), Instruction::noop(3)]);

        assert_eq!(proc.pop(None), Some(Instruction::noop(3)));
        assert_eq!(proc.pop(Some(5)), None);
    }
}
