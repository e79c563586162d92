//! A single ring of slots at one time granularity.

use std::collections::VecDeque;

use crate::entry::Entry;

/// One tier of the wheel. Adjacency is by index into the owning wheel's
/// level arena: `index - 1` is finer, `index + 1` is coarser.
#[derive(Debug)]
pub struct Level {
    index: usize,
    slots: Vec<VecDeque<Entry>>,
    cursor: usize,
    /// Index of the coarsest level, used to answer `coarser()`.
    last: usize,
}

impl Level {
    /// `slot_count` must be non-zero; the wheel validates this before building levels.
    pub(crate) fn new(index: usize, slot_count: usize, last: usize) -> Self {
        debug_assert!(slot_count > 0);
        Self {
            index,
            slots: (0..slot_count).map(|_| VecDeque::new()).collect(),
            cursor: 0,
            last,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Adjacent finer level, `None` on the finest level.
    pub fn finer(&self) -> Option<usize> {
        self.index.checked_sub(1)
    }

    /// Adjacent coarser level, `None` on the coarsest level.
    pub fn coarser(&self) -> Option<usize> {
        (self.index < self.last).then_some(self.index + 1)
    }

    /// Move the cursor one slot. Returns true when it wrapped back to 0.
    pub(crate) fn advance(&mut self) -> bool {
        self.cursor += 1;
        if self.cursor == self.slots.len() {
            self.cursor = 0;
            return true;
        }
        false
    }

    pub(crate) fn push(&mut self, slot: usize, entry: Entry) {
        self.slots[slot].push_back(entry);
    }

    /// Drain the slot under the cursor, oldest first.
    pub(crate) fn take_current(&mut self) -> VecDeque<Entry> {
        std::mem::take(&mut self.slots[self.cursor])
    }

    /// Number of entries currently held across all slots.
    pub fn len(&self) -> usize {
        self.slots.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(VecDeque::is_empty)
    }

    pub fn slot_len(&self, slot: usize) -> usize {
        self.slots.get(slot).map_or(0, VecDeque::len)
    }
}
