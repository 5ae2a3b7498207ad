//! Slot store: the node's table of stored procedures.

use std::sync::{Mutex, MutexGuard, PoisonError};

use proc_asm::Procedure;

use crate::error::RuntimeError;

const SLOT_COUNT: usize = proc_asm::MAX_PROC_SLOT as usize + 1;

/// Indexed table of 256 procedure slots behind a single mutex.
///
/// A slot holding a procedure with zero instructions is empty. One
/// store-wide mutex serializes every operation; callers that outlive the
/// lock work on owned copies handed out by [`ProcStore::get`].
#[derive(Debug)]
pub struct ProcStore {
    slots: Mutex<Vec<Procedure>>,
}

impl Default for ProcStore {
    fn default() -> Self {
        Self {
            slots: Mutex::new(vec![Procedure::new(); SLOT_COUNT]),
        }
    }
}

impl ProcStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Procedure>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `proc` into `slot`.
    ///
    /// An occupied slot is only replaced when `overwrite` is set; the prior
    /// contents are dropped on replacement.
    pub fn insert(&self, proc: Procedure, slot: u8, overwrite: bool) -> Result<(), RuntimeError> {
        let mut slots = self.lock();
        let cell = &mut slots[slot as usize];
        if !cell.is_empty() && !overwrite {
            return Err(RuntimeError::SlotOccupied(slot));
        }
        *cell = proc;
        Ok(())
    }

    /// Owned copy of the procedure in `slot`, or `None` when empty.
    ///
    /// The copy detaches the caller from the store: a later delete or
    /// overwrite of the slot can't touch it.
    pub fn get(&self, slot: u8) -> Option<Procedure> {
        let slots = self.lock();
        let proc = &slots[slot as usize];
        (!proc.is_empty()).then(|| proc.clone())
    }

    /// Empty `slot`, dropping its procedure.
    pub fn delete(&self, slot: u8) {
        self.lock()[slot as usize] = Procedure::new();
    }

    /// Empty every slot.
    pub fn reset(&self) {
        let mut slots = self.lock();
        for cell in slots.iter_mut() {
            *cell = Procedure::new();
        }
    }

    /// Snapshot of the occupied slot indices, in ascending order.
    pub fn slots(&self) -> Vec<u8> {
        self.lock()
            .iter()
            .enumerate()
            .filter(|(_, proc)| !proc.is_empty())
            .map(|(i, _)| i as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_asm::Instruction;

    fn one_noop() -> Procedure {
        let mut proc = Procedure::new();
        proc.push(Instruction::noop(0)).unwrap();
        proc
    }

    #[test]
    fn occupied_slots_need_overwrite() {
        let store = ProcStore::new();
        store.insert(one_noop(), 3, false).unwrap();
        assert!(matches!(
            store.insert(one_noop(), 3, false),
            Err(RuntimeError::SlotOccupied(3))
        ));
        store.insert(one_noop(), 3, true).unwrap();
    }

    #[test]
    fn get_detaches_from_the_store() {
        let store = ProcStore::new();
        store.insert(one_noop(), 7, false).unwrap();
        let copy = store.get(7).unwrap();
        store.delete(7);
        assert!(store.get(7).is_none());
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn slots_lists_occupied_indices() {
        let store = ProcStore::new();
        assert!(store.slots().is_empty());
        store.insert(one_noop(), 0, false).unwrap();
        store.insert(one_noop(), 255, false).unwrap();
        assert_eq!(store.slots(), vec![0, 255]);
        store.reset();
        assert!(store.slots().is_empty());
    }
}
