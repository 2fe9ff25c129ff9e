//! Commands — what a completed key sequence asks the session to do.
//!
//! The key parser builds one [`Command`] per key sequence and hands it to
//! the session, which executes it once and drops it.
//!
//! ```text
//! "a 3 d 2 w   →  Command {
//!                    register: Some('a'),
//!                    count: 3,
//!                    operation: Delete,
//!                    operand: { motion: Word, count: 2 },
//!                 }
//!              →  merge_counts()  →  operand.count = 6
//! ```
//!
//! | Family     | Operations                                              |
//! |------------|---------------------------------------------------------|
//! | operators  | `Delete` `Change` `Yank` `Indent` `Unindent` `ToggleCase` `Replace` |
//! | movement   | `Move` `Select` `Scroll` `Mark` `JumpTag`               |
//! | insertion  | `Insert` `Append` `OpenLine` `InsertChar` `BreakLine` … |
//! | history    | `Undo` `Redo` `UndoLine` `Repeat` `RecordMacro` `RunMacro` |
//! | prompts    | `TextEntry` `Submit` `SearchWord` `SearchAgain`         |

use crate::buffer::Direction;
use crate::mode::{EntryKind, VisualKind};
use crate::motion::Operand;

/// The largest count a command carries; longer digit runs stop growing.
pub const MAX_COUNT: usize = 99_999;

/// `count` limited to [`MAX_COUNT`].
#[inline]
#[must_use]
pub const fn clamp_count(count: usize) -> usize {
    if count > MAX_COUNT { MAX_COUNT } else { count }
}

// ---------------------------------------------------------------------------
// Operation payloads
// ---------------------------------------------------------------------------

/// How a scrolling command moves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scroll {
    /// `Ctrl-E`
    LineDown,
    /// `Ctrl-Y`
    LineUp,
    /// `Ctrl-D`
    HalfPageDown,
    /// `Ctrl-U`
    HalfPageUp,
    /// `Ctrl-F` / `PageDown`
    PageDown,
    /// `Ctrl-B` / `PageUp`
    PageUp,
    /// `z<CR>` / `zt`: cursor line to the top of the window.
    Top { first_non_blank: bool },
    /// `z.` / `zz`
    Middle { first_non_blank: bool },
    /// `z-` / `zb`
    Bottom { first_non_blank: bool },
    /// `z+`: the line below the window becomes the top line.
    NextPage,
    /// `z^`: the line above the window becomes the bottom line.
    PreviousPage,
}

/// Multi-cursor growth (`Ctrl-L` sub-commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extend {
    Down,
    Up,
    /// Add a cursor `count` lines below the last one.
    DownSkip,
    /// Add a cursor `count` lines above the first one.
    UpSkip,
    /// Add a cursor at the next occurrence of the selected text.
    NextSelection,
    /// Remove the most recently added cursor.
    Pop,
}

/// Tab-page requests forwarded to the host (`gt`, `gT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabCommand {
    Next,
    Previous,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The verb of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // -- Operators -----------------------------------------------------------
    Move,
    /// Extend the visual selection.
    Select,
    Delete,
    Change,
    Yank,
    Indent,
    Unindent,
    ToggleCase,
    /// `r{char}` and replace-mode typing.
    Replace,
    Paste,
    PasteBefore,
    JoinLines,

    // -- Insertion -----------------------------------------------------------
    Insert,
    InsertStart,
    Append,
    AppendEnd,
    OpenLine,
    OpenLineAbove,
    ReplaceMode,
    InsertChar,
    BreakLine,
    Backspace,

    // -- Visual --------------------------------------------------------------
    Visual(VisualKind),
    /// `o` — cursor and anchor trade places.
    SwapEnds,
    /// `O` — cursor and anchor trade columns only.
    SwapColumns,
    BlockInsert,
    BlockAppend,

    // -- Prompts & search ----------------------------------------------------
    TextEntry(EntryKind),
    Submit(EntryKind),
    /// `*` / `#`
    SearchWord(Direction),
    /// `n`
    SearchAgain,
    /// `N`
    SearchReverse,
    /// `&`
    RepeatSubstitution,

    // -- History & macros ----------------------------------------------------
    Undo,
    Redo,
    UndoLine,
    Repeat,
    RecordMacro,
    RunMacro,

    // -- Everything else -----------------------------------------------------
    Scroll(Scroll),
    Mark,
    Extend(Extend),
    NormalMode,
    Info,
    Tab(TabCommand),
    JumpTag,
}

impl Operation {
    /// True for operations `.` should be able to repeat.
    #[must_use]
    pub const fn is_change(self) -> bool {
        matches!(
            self,
            Self::Delete
                | Self::Change
                | Self::Indent
                | Self::Unindent
                | Self::ToggleCase
                | Self::Replace
                | Self::Paste
                | Self::PasteBefore
                | Self::JoinLines
                | Self::Insert
                | Self::InsertStart
                | Self::Append
                | Self::AppendEnd
                | Self::OpenLine
                | Self::OpenLineAbove
                | Self::ReplaceMode
        )
    }

    /// True for operations that leave the session in insert or replace
    /// mode, so the change continues until `Escape`.
    #[must_use]
    pub const fn enters_insert(self) -> bool {
        matches!(
            self,
            Self::Change
                | Self::Insert
                | Self::InsertStart
                | Self::Append
                | Self::AppendEnd
                | Self::OpenLine
                | Self::OpenLineAbove
                | Self::ReplaceMode
        )
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A fully parsed key sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub operation: Option<Operation>,
    pub operand: Operand,
    /// The count typed before the operator (zero when absent).
    pub count: usize,
    pub register: Option<char>,
    /// `"A`–`"Z`: append to the register instead of replacing it.
    pub append_register: bool,
    /// The keys that produced this command, in order.
    pub keys: Vec<String>,
}

impl Command {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the operator count into the operand count (`2d3w` = `d6w`).
    pub const fn merge_counts(&mut self) {
        if self.count > 0 {
            self.operand.count = if self.operand.count > 0 {
                clamp_count(self.operand.count.saturating_mul(self.count))
            } else {
                clamp_count(self.count)
            };
        }
        self.count = 0;
    }

    /// Operand count, or 1 when none was typed.
    #[inline]
    #[must_use]
    pub const fn count_or_one(&self) -> usize {
        self.operand.count_or_one()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counts(operator: usize, operand: usize) -> usize {
        let mut cmd = Command {
            count: operator,
            ..Command::new()
        };
        cmd.operand.count = operand;
        cmd.merge_counts();
        assert_eq!(cmd.count, 0);
        cmd.operand.count
    }

    #[test]
    fn counts_multiply() {
        assert_eq!(counts(2, 3), 6);
        assert_eq!(counts(4, 0), 4);
        assert_eq!(counts(0, 5), 5);
        assert_eq!(counts(0, 0), 0);
    }

    #[test]
    fn operations_hash_by_payload() {
        use std::collections::HashSet;
        let seen: HashSet<Operation> = [
            Operation::SearchWord(Direction::Forward),
            Operation::SearchWord(Direction::Backward),
            Operation::SearchWord(Direction::Forward),
        ]
        .into_iter()
        .collect();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn huge_counts_stop_at_the_limit() {
        assert_eq!(counts(MAX_COUNT, MAX_COUNT), MAX_COUNT);
        assert_eq!(counts(usize::MAX, 2), MAX_COUNT);
        assert_eq!(clamp_count(12), 12);
    }

    #[test]
    fn change_classification() {
        assert!(Operation::Delete.is_change());
        assert!(Operation::OpenLineAbove.is_change());
        assert!(!Operation::Move.is_change());
        assert!(!Operation::Yank.is_change());
        assert!(Operation::Change.enters_insert());
        assert!(!Operation::Delete.enters_insert());
    }
}
