//! Text buffer — line-of-cells storage with live cursor fixups.
//!
//! A `Buffer` is an ordered list of [`Line`]s (never empty: a buffer with no
//! content holds one empty line), plus the state that has to follow the
//! text around as it is edited:
//!
//! - **tags** — named positions, defined by rich-text anchors
//! - **marks** — single-character positions set with `m`
//! - **cursors** — every live [`Cursor`](crate::cursor::Cursor) registers a
//!   slot here and is addressed by its [`CursorId`]
//! - **history** — bounded undo/redo snapshots
//!
//! # Fixups
//!
//! Every structural edit goes through [`EditPrimitives`]. Each primitive
//! builds a position mapping describing how the edit moved text, applies it
//! to all cursor slots, tags and marks, then clamps cursors back into range.
//! A position that pointed at deleted text lands on the nearest valid cell.
//!
//! ```text
//! insert_char (2,3)          "abXcd"
//!   cursor (2,3) ──▶ (2,4)      ^ cursors at or after the insert shift right
//!   mark   (2,1) ──▶ (2,1)
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::cell::{Cell, Line, RichNode, RichText, line_to_string, lines_from_str, lines_to_string};
use crate::history::{History, Snapshot};
use crate::pattern::{Match, Pattern};
use crate::position::Position;

/// Spaces added or removed by one indent step unless configured otherwise.
pub const DEFAULT_SHIFT_WIDTH: usize = 4;

// ---------------------------------------------------------------------------
// Cursor registration
// ---------------------------------------------------------------------------

/// Handle to a cursor slot registered with a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(usize);

#[derive(Debug, Clone, Copy)]
struct Slot {
    pos: Position,
    past_end: bool,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Search direction through the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The reverse direction (used by `N` and `,`).
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// A pattern match located in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub position: Position,
    pub length: usize,
}

// ---------------------------------------------------------------------------
// EditPrimitives
// ---------------------------------------------------------------------------

/// The structural edits a cursor may perform on its buffer.
///
/// Every method keeps all registered cursors, tags and marks pointing at
/// the same logical text. Out-of-range positions are ignored (or clamped
/// for insertion points) rather than panicking.
pub trait EditPrimitives {
    /// Insert `cell` before `at` (column `len + 1` appends).
    fn insert_char(&mut self, at: Position, cell: Cell);

    /// Remove and return the cell at `at`.
    fn delete_char(&mut self, at: Position) -> Option<Cell>;

    /// Replace the cell at `at`, returning the old one.
    fn set_char(&mut self, at: Position, cell: Cell) -> Option<Cell>;

    /// Remove and return the cell before `at`.
    fn delete_before(&mut self, at: Position) -> Option<Cell>;

    /// Split `at.line` at `at.column`; the tail becomes a new following line.
    /// Splitting line `line_count + 1` appends an empty line.
    fn insert_line(&mut self, at: Position);

    /// Remove line `line`, returning its cells. The buffer keeps at least one
    /// line.
    fn delete_line(&mut self, line: usize) -> Option<Line>;

    /// Join `line` with the following line. Returns `false` on the last line.
    fn join_lines(&mut self, line: usize, leave_whitespace: bool) -> bool;

    /// Add one shift width of spaces, or remove up to one shift width of
    /// leading spaces. Empty lines are never indented.
    fn indent_line(&mut self, line: usize, unindent: bool);

    /// A copy of line `line` (empty when out of range).
    fn copy_line(&self, line: usize) -> Line;

    /// Replace the whole of line `line`, returning the old cells.
    fn replace_line(&mut self, line: usize, cells: Line) -> Line;

    /// Drop a cursor from the registration set.
    fn release(&mut self, id: CursorId);
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Line-structured text plus tags, marks, cursor slots and history.
pub struct Buffer {
    lines: Vec<Line>,
    tags: HashMap<String, Position>,
    marks: HashMap<char, Position>,
    cursors: Vec<Option<Slot>>,
    history: History,
    shift_width: usize,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// Create a buffer holding one empty line.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
            tags: HashMap::new(),
            marks: HashMap::new(),
            cursors: Vec::new(),
            history: History::default(),
            shift_width: DEFAULT_SHIFT_WIDTH,
        }
    }

    /// Create a buffer from plain text split on `\n`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut buf = Self::new();
        buf.lines = lines_from_str(text);
        buf
    }

    /// Create a buffer from a rich-text tree, defining its tags.
    #[must_use]
    pub fn from_rich_text(nodes: &[RichNode]) -> Self {
        let rich = RichText::flatten(nodes);
        let mut buf = Self::new();
        buf.lines = rich.lines;
        buf.tags = rich.tags.into_iter().collect();
        buf
    }

    // -- Text access --------------------------------------------------------

    /// The full text, lines joined with `\n`.
    #[must_use]
    pub fn contents(&self) -> String {
        lines_to_string(&self.lines)
    }

    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line `line` (1-based).
    #[inline]
    #[must_use]
    pub fn line(&self, line: usize) -> Option<&Line> {
        line.checked_sub(1).and_then(|i| self.lines.get(i))
    }

    /// Line `line` as a `String`.
    #[must_use]
    pub fn line_text(&self, line: usize) -> String {
        self.line(line).map(|l| line_to_string(l)).unwrap_or_default()
    }

    /// Number of cells on `line`, zero when out of range.
    #[inline]
    #[must_use]
    pub fn line_len(&self, line: usize) -> usize {
        self.line(line).map_or(0, Vec::len)
    }

    /// The cell at `pos`.
    #[inline]
    #[must_use]
    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.line(pos.line)?.get(pos.column.checked_sub(1)?)
    }

    /// `len` lines starting at `start` (1-based), clamped to the buffer.
    #[must_use]
    pub fn range(&self, start: usize, len: usize) -> &[Line] {
        let from = start.saturating_sub(1).min(self.lines.len());
        let to = from.saturating_add(len).min(self.lines.len());
        &self.lines[from..to]
    }

    /// Column of the first non-blank cell on `line` (1 when blank).
    #[must_use]
    pub fn first_non_blank(&self, line: usize) -> usize {
        self.line(line)
            .and_then(|l| l.iter().position(|c| !c.is_whitespace()))
            .map_or(1, |i| i + 1)
    }

    /// The largest valid cursor column on `line`.
    #[inline]
    #[must_use]
    pub fn max_column(&self, line: usize, past_end: bool) -> usize {
        (self.line_len(line) + usize::from(past_end)).max(1)
    }

    /// Clamp `pos` to a valid cursor position.
    #[must_use]
    pub fn clamp(&self, pos: Position, past_end: bool) -> Position {
        let line = pos.line.clamp(1, self.line_count());
        let column = pos.column.clamp(1, self.max_column(line, past_end));
        Position::new(line, column)
    }

    /// Position just past the last cell of the buffer.
    #[must_use]
    pub fn end_position(&self) -> Position {
        let last = self.line_count();
        Position::new(last, self.line_len(last) + 1)
    }

    // -- Raw splicing -------------------------------------------------------

    /// Replace `len` cells of `line` starting at `column` with `cells`,
    /// returning the removed cells.
    pub fn splice(&mut self, line: usize, column: usize, len: usize, cells: Line) -> Line {
        let Some(target) = line.checked_sub(1).and_then(|i| self.lines.get_mut(i)) else {
            return Vec::new();
        };
        let from = column.saturating_sub(1).min(target.len());
        let to = from.saturating_add(len).min(target.len());
        let inserted = cells.len();
        let removed: Line = target.splice(from..to, cells).collect();
        let removed_len = removed.len();
        let start = from + 1;
        self.remap(|p| {
            if p.line != line || p.column < start {
                p
            } else if p.column >= start + removed_len {
                Position::new(line, p.column + inserted - removed_len)
            } else {
                Position::new(line, p.column.min(start + inserted.saturating_sub(1)))
            }
        });
        removed
    }

    /// Replace `len` lines starting at `line` with `new_lines`, returning the
    /// removed lines. `line == line_count + 1` appends.
    pub fn splice_lines(&mut self, line: usize, len: usize, new_lines: Vec<Line>) -> Vec<Line> {
        let from = line.saturating_sub(1).min(self.lines.len());
        let to = from.saturating_add(len).min(self.lines.len());
        let inserted = new_lines.len();
        let removed: Vec<Line> = self.lines.splice(from..to, new_lines).collect();
        let removed_len = removed.len();
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        let first = from + 1;
        self.remap(|p| {
            if p.line < first {
                p
            } else if p.line >= first + removed_len {
                Position::new(p.line + inserted - removed_len, p.column)
            } else {
                Position::new(p.line.min(first + inserted.saturating_sub(1)), p.column)
            }
        });
        removed
    }

    // -- Tags & marks -------------------------------------------------------

    /// Position of tag `name`, or the buffer origin when undefined.
    #[must_use]
    pub fn tag(&self, name: &str) -> Position {
        self.tags.get(name).copied().unwrap_or(Position::ORIGIN)
    }

    pub fn set_tag(&mut self, name: impl Into<String>, pos: Position) {
        self.tags.insert(name.into(), pos);
    }

    pub fn set_mark(&mut self, name: char, pos: Position) {
        self.marks.insert(name, pos);
    }

    #[must_use]
    pub fn mark(&self, name: char) -> Option<Position> {
        self.marks.get(&name).copied()
    }

    // -- Cursor slots -------------------------------------------------------

    /// Register a cursor at `pos` (clamped) and return its handle.
    pub fn register_cursor(&mut self, pos: Position, past_end: bool) -> CursorId {
        let pos = self.clamp(pos, past_end);
        let slot = Some(Slot { pos, past_end });
        if let Some(free) = self.cursors.iter().position(Option::is_none) {
            self.cursors[free] = slot;
            CursorId(free)
        } else {
            self.cursors.push(slot);
            CursorId(self.cursors.len() - 1)
        }
    }

    /// Current position of cursor `id` (the origin for a released id).
    #[must_use]
    pub fn cursor_position(&self, id: CursorId) -> Position {
        self.slot(id).map_or(Position::ORIGIN, |s| s.pos)
    }

    /// Move cursor `id` to `pos`, clamped to its mode's bounds. Returns the
    /// position actually taken.
    pub fn place_cursor(&mut self, id: CursorId, pos: Position) -> Position {
        let Some(past_end) = self.slot(id).map(|s| s.past_end) else {
            return Position::ORIGIN;
        };
        let pos = self.clamp(pos, past_end);
        if let Some(Some(slot)) = self.cursors.get_mut(id.0) {
            slot.pos = pos;
        }
        pos
    }

    /// Allow or forbid cursor `id` to sit after the last cell.
    pub fn set_cursor_past_end(&mut self, id: CursorId, past_end: bool) {
        if let Some(Some(slot)) = self.cursors.get_mut(id.0) {
            slot.past_end = past_end;
        }
        if let Some(pos) = self.slot(id).map(|s| s.pos) {
            self.place_cursor(id, pos);
        }
    }

    /// Number of registered cursors.
    #[must_use]
    pub fn cursor_count(&self) -> usize {
        self.cursors.iter().flatten().count()
    }

    fn slot(&self, id: CursorId) -> Option<&Slot> {
        self.cursors.get(id.0).and_then(Option::as_ref)
    }

    // -- History ------------------------------------------------------------

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            lines: self.lines.clone(),
            cursors: self.cursors.iter().flatten().map(|s| s.pos).collect(),
        }
    }

    /// Record the current text and cursor positions for undo.
    pub fn checkpoint(&mut self) {
        let snapshot = self.snapshot();
        self.history.checkpoint(snapshot);
    }

    /// Restore the most recent checkpoint. Returns `false` if there is none.
    pub fn undo(&mut self) -> bool {
        let live = self.snapshot();
        match self.history.undo(live) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone state.
    pub fn redo(&mut self) -> bool {
        let live = self.snapshot();
        match self.history.redo(live) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn set_undo_capacity(&mut self, capacity: usize) {
        self.history.set_capacity(capacity);
    }

    pub fn set_shift_width(&mut self, width: usize) {
        self.shift_width = if width == 0 { 1 } else { width };
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.lines = snapshot.lines;
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        let mut recorded = snapshot.cursors.into_iter();
        for slot in self.cursors.iter_mut().flatten() {
            match recorded.next() {
                Some(pos) => slot.pos = pos,
                None => break,
            }
        }
        self.remap(|p| p);
    }

    // -- Pattern search -----------------------------------------------------

    /// Try `pattern` at exactly `(line, column)`.
    #[must_use]
    pub fn match_at(&self, line: usize, column: usize, pattern: &Pattern) -> Option<Match> {
        pattern.match_at(self.line(line)?, column)
    }

    /// Find the next match of `pattern` from `from` in `direction`.
    ///
    /// `inclusive` lets a match at `from` itself count. With `wrap` the scan
    /// continues from the other end of the buffer back to `from`.
    #[must_use]
    pub fn search(
        &self,
        pattern: &Pattern,
        from: Position,
        direction: Direction,
        inclusive: bool,
        wrap: bool,
    ) -> Option<SearchHit> {
        let count = self.line_count();
        match direction {
            Direction::Forward => {
                let first = if inclusive { from.column } else { from.column + 1 };
                self.scan(pattern, from.line, first, usize::MAX, direction)
                    .or_else(|| {
                        (from.line + 1..=count)
                            .find_map(|l| self.scan(pattern, l, 1, usize::MAX, direction))
                    })
                    .or_else(|| {
                        if !wrap {
                            return None;
                        }
                        (1..from.line)
                            .find_map(|l| self.scan(pattern, l, 1, usize::MAX, direction))
                            .or_else(|| self.scan(pattern, from.line, 1, first - 1, direction))
                    })
            }
            Direction::Backward => {
                let last = if inclusive {
                    from.column
                } else {
                    from.column.saturating_sub(1)
                };
                self.scan(pattern, from.line, 1, last, direction)
                    .or_else(|| {
                        (1..from.line)
                            .rev()
                            .find_map(|l| self.scan(pattern, l, 1, usize::MAX, direction))
                    })
                    .or_else(|| {
                        if !wrap {
                            return None;
                        }
                        (from.line + 1..=count)
                            .rev()
                            .find_map(|l| self.scan(pattern, l, 1, usize::MAX, direction))
                            .or_else(|| {
                                self.scan(pattern, from.line, last + 1, usize::MAX, direction)
                            })
                    })
            }
        }
    }

    /// Try each column of `line` in `first..=last` (clamped) in `direction`.
    fn scan(
        &self,
        pattern: &Pattern,
        line: usize,
        first: usize,
        last: usize,
        direction: Direction,
    ) -> Option<SearchHit> {
        let cells = self.line(line)?;
        let last = last.min(cells.len().max(1));
        let first = first.max(1);
        if first > last {
            return None;
        }
        let hit = |column: usize| {
            pattern.match_at(cells, column).map(|m| SearchHit {
                position: Position::new(line, m.column),
                length: m.length,
            })
        };
        match direction {
            Direction::Forward => (first..=last).find_map(hit),
            Direction::Backward => (first..=last).rev().find_map(hit),
        }
    }

    /// Start positions of every occurrence of `needle` (compared by symbol).
    #[must_use]
    pub fn occurrences(&self, needle: &[Cell]) -> Vec<Position> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut found = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            if line.len() < needle.len() {
                continue;
            }
            for start in 0..=line.len() - needle.len() {
                let window = &line[start..start + needle.len()];
                if window.iter().zip(needle).all(|(a, b)| a.symbol() == b.symbol()) {
                    found.push(Position::new(i + 1, start + 1));
                }
            }
        }
        found
    }

    // -- Fixups -------------------------------------------------------------

    /// Apply `map` to every cursor, tag and mark, then clamp them all.
    fn remap(&mut self, map: impl Fn(Position) -> Position) {
        for slot in self.cursors.iter_mut().flatten() {
            slot.pos = map(slot.pos);
        }
        for pos in self.tags.values_mut().chain(self.marks.values_mut()) {
            *pos = map(*pos);
        }

        let line_count = self.lines.len();
        let len = |line: usize| self.lines.get(line - 1).map_or(0, Vec::len);
        for slot in self.cursors.iter_mut().flatten() {
            let line = slot.pos.line.clamp(1, line_count);
            let max = (len(line) + usize::from(slot.past_end)).max(1);
            slot.pos = Position::new(line, slot.pos.column.clamp(1, max));
        }
        for pos in self.tags.values_mut().chain(self.marks.values_mut()) {
            let line = pos.line.clamp(1, line_count);
            *pos = Position::new(line, pos.column.clamp(1, len(line) + 1));
        }
    }

    fn line_mut(&mut self, line: usize) -> Option<&mut Line> {
        line.checked_sub(1).and_then(|i| self.lines.get_mut(i))
    }
}

impl EditPrimitives for Buffer {
    fn insert_char(&mut self, at: Position, cell: Cell) {
        let Some(target) = self.line_mut(at.line) else {
            return;
        };
        let column = at.column.clamp(1, target.len() + 1);
        target.insert(column - 1, cell);
        self.remap(|p| {
            if p.line == at.line && p.column >= column {
                Position::new(p.line, p.column + 1)
            } else {
                p
            }
        });
    }

    fn delete_char(&mut self, at: Position) -> Option<Cell> {
        let target = self.line_mut(at.line)?;
        let idx = at.column.checked_sub(1)?;
        if idx >= target.len() {
            return None;
        }
        let removed = target.remove(idx);
        self.remap(|p| {
            if p.line == at.line && p.column > at.column {
                Position::new(p.line, p.column - 1)
            } else {
                p
            }
        });
        Some(removed)
    }

    fn set_char(&mut self, at: Position, cell: Cell) -> Option<Cell> {
        let slot = self
            .line_mut(at.line)?
            .get_mut(at.column.checked_sub(1)?)?;
        Some(std::mem::replace(slot, cell))
    }

    fn delete_before(&mut self, at: Position) -> Option<Cell> {
        if at.column <= 1 {
            return None;
        }
        self.delete_char(Position::new(at.line, at.column - 1))
    }

    fn insert_line(&mut self, at: Position) {
        if at.line == self.lines.len() + 1 {
            self.lines.push(Vec::new());
            return;
        }
        let Some(target) = self.line_mut(at.line) else {
            return;
        };
        let column = at.column.clamp(1, target.len() + 1);
        let tail = target.split_off(column - 1);
        self.lines.insert(at.line, tail);
        self.remap(|p| {
            if p.line > at.line {
                Position::new(p.line + 1, p.column)
            } else if p.line == at.line && p.column >= column {
                Position::new(p.line + 1, p.column - column + 1)
            } else {
                p
            }
        });
    }

    fn delete_line(&mut self, line: usize) -> Option<Line> {
        let idx = line.checked_sub(1)?;
        if idx >= self.lines.len() {
            return None;
        }
        let removed = self.lines.remove(idx);
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        self.remap(|p| {
            if p.line > line {
                Position::new(p.line - 1, p.column)
            } else {
                p
            }
        });
        Some(removed)
    }

    fn join_lines(&mut self, line: usize, leave_whitespace: bool) -> bool {
        if line == 0 || line >= self.lines.len() {
            return false;
        }
        let next = self.lines.remove(line);
        let current = &mut self.lines[line - 1];
        let current_len = current.len();

        let keep_as_is = leave_whitespace
            || next.first().is_some_and(|c| c.is(")"))
            || current.last().is_some_and(Cell::is_whitespace);
        let (inserted, trimmed) = if keep_as_is {
            (0, 0)
        } else {
            (1, next.iter().take_while(|c| c.is_whitespace()).count())
        };

        if inserted == 1 {
            current.push(Cell::new(" "));
        }
        current.extend(next.into_iter().skip(trimmed));

        let offset = current_len + inserted;
        self.remap(|p| {
            if p.line == line + 1 {
                let column = if p.column <= trimmed {
                    offset + 1
                } else {
                    offset + p.column - trimmed
                };
                Position::new(line, column)
            } else if p.line > line + 1 {
                Position::new(p.line - 1, p.column)
            } else {
                p
            }
        });
        true
    }

    fn indent_line(&mut self, line: usize, unindent: bool) {
        let width = self.shift_width;
        let Some(target) = self.line_mut(line) else {
            return;
        };
        if unindent {
            let leading = target.iter().take_while(|c| c.is(" ")).count();
            let removed = leading.min(width);
            if removed == 0 {
                return;
            }
            target.drain(..removed);
            self.remap(|p| {
                if p.line == line {
                    Position::new(line, p.column.saturating_sub(removed).max(1))
                } else {
                    p
                }
            });
        } else if !target.is_empty() {
            target.splice(0..0, std::iter::repeat_with(|| Cell::new(" ")).take(width));
            self.remap(|p| {
                if p.line == line {
                    Position::new(line, p.column + width)
                } else {
                    p
                }
            });
        }
    }

    fn copy_line(&self, line: usize) -> Line {
        self.line(line).cloned().unwrap_or_default()
    }

    fn replace_line(&mut self, line: usize, cells: Line) -> Line {
        let Some(target) = self.line_mut(line) else {
            return Vec::new();
        };
        let old = std::mem::replace(target, cells);
        self.remap(|p| p);
        old
    }

    fn release(&mut self, id: CursorId) {
        if let Some(slot) = self.cursors.get_mut(id.0) {
            *slot = None;
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("lines", &self.line_count())
            .field("tags", &self.tags.len())
            .field("marks", &self.marks.len())
            .field("cursors", &self.cursor_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
