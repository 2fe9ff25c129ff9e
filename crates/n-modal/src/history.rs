//! Undo/redo history — checkpoint-based snapshots.
//!
//! Every buffer-mutating command calls [`Buffer::checkpoint`] *before* it
//! mutates. A checkpoint is a deep [`Snapshot`] of all lines plus the
//! position of every live cursor, so undo is a state swap rather than a
//! replay:
//!
//! ```text
//! undo:  live ──push──▶ redo      undo.pop() ──▶ live
//! redo:  live ──push──▶ undo      redo.pop() ──▶ live
//! ```
//!
//! Both stacks are bounded. When a push exceeds the capacity the oldest
//! snapshot is dropped. Checkpointing clears nothing, so a redo remains
//! available after a new edit.
//!
//! [`Buffer::checkpoint`]: crate::buffer::Buffer::checkpoint

use std::collections::VecDeque;

use crate::cell::Line;
use crate::position::Position;

/// Default number of snapshots kept on each stack.
pub const DEFAULT_CAPACITY: usize = 100;

/// A full copy of buffer text and cursor positions.
///
/// Cursor positions are recorded in registration order; restoring matches
/// them to live cursors by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub lines: Vec<Line>,
    pub cursors: Vec<Position>,
}

/// Undo/redo stacks of snapshots.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    capacity: usize,
}

impl History {
    /// Create an empty history keeping `capacity` snapshots per stack.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Push a checkpoint onto the undo stack.
    pub fn checkpoint(&mut self, snapshot: Snapshot) {
        push_bounded(&mut self.undo_stack, snapshot, self.capacity);
    }

    /// Swap `live` for the most recent undo snapshot. Returns `None` (and
    /// leaves both stacks untouched) when there is nothing to undo.
    pub fn undo(&mut self, live: Snapshot) -> Option<Snapshot> {
        let restored = self.undo_stack.pop_back()?;
        push_bounded(&mut self.redo_stack, live, self.capacity);
        Some(restored)
    }

    /// Swap `live` for the most recent redo snapshot.
    pub fn redo(&mut self, live: Snapshot) -> Option<Snapshot> {
        let restored = self.redo_stack.pop_back()?;
        push_bounded(&mut self.undo_stack, live, self.capacity);
        Some(restored)
    }

    /// Change the stack capacity, dropping the oldest snapshots if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        while self.redo_stack.len() > self.capacity {
            self.redo_stack.pop_front();
        }
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, capacity: usize) {
    stack.push_back(snapshot);
    while stack.len() > capacity {
        stack.pop_front();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::lines_from_str;
    use pretty_assertions::assert_eq;

    fn snap(text: &str, line: usize) -> Snapshot {
        Snapshot {
            lines: lines_from_str(text),
            cursors: vec![Position::new(line, 1)],
        }
    }

    #[test]
    fn undo_then_redo_swaps_state() {
        let mut h = History::default();
        h.checkpoint(snap("one", 1));
        let restored = h.undo(snap("two", 1));
        assert_eq!(restored, Some(snap("one", 1)));
        assert_eq!(h.redo(snap("one", 1)), Some(snap("two", 1)));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn empty_stacks_return_none() {
        let mut h = History::default();
        assert_eq!(h.undo(snap("x", 1)), None);
        assert_eq!(h.redo(snap("x", 1)), None);
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut h = History::new(3);
        for i in 1..=5 {
            h.checkpoint(snap(&i.to_string(), i));
        }
        assert_eq!(h.undo_count(), 3);
        let mut seen = Vec::new();
        let mut live = snap("live", 1);
        while let Some(s) = h.undo(live.clone()) {
            seen.push(s.cursors[0].line);
            live = s;
        }
        assert_eq!(seen, vec![5, 4, 3]);
    }

    #[test]
    fn checkpoint_keeps_redo() {
        let mut h = History::default();
        h.checkpoint(snap("a", 1));
        let _ = h.undo(snap("b", 1));
        h.checkpoint(snap("c", 1));
        assert_eq!(h.redo_count(), 1);
    }
}
