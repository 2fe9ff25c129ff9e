//! Cursor — a position bound to a buffer, plus everything that acts on it.
//!
//! A [`Cursor`] does not store its position. It holds the [`CursorId`] of a
//! slot registered with the [`Buffer`], so every structural edit (made by
//! this cursor or any other) keeps it on the same logical text. Dropping a
//! cursor from a group must go through [`Cursor::dispose`], which releases
//! the slot.
//!
//! All edits go through [`EditPrimitives`] or the buffer's splice calls;
//! the cursor never touches line storage directly.
//!
//! ```text
//! operand ──▶ operand_range ──▶ Range ──▶ delete_range / yank_range /
//!                                         replace_range / toggle_case /
//!                                         indent_range
//! ```

use crate::buffer::{Buffer, CursorId, EditPrimitives};
use crate::cell::{Cell, Line};
use crate::command::Operation;
use crate::error::{EditError, EditResult};
use crate::mode::VisualKind;
use crate::motion::{Motion, MotionMemory, ObjectKind, Operand, motion_range, operator_range};
use crate::position::{Position, Range, RangeKind};
use crate::register::{Register, RegisterKind};
use crate::text_object::object_range;

/// An active visual selection: the fixed end and its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub kind: VisualKind,
}

/// A single editing cursor.
#[derive(Debug)]
pub struct Cursor {
    id: CursorId,
    visual: Option<Selection>,
    /// Other occurrences of the selected text (char selections on one line).
    matching: Vec<Range>,
    memory: MotionMemory,
    /// The line as it was when the cursor arrived on it, for `U`.
    saved_line: Option<Line>,
}

impl Cursor {
    /// Register a new cursor with `buf` at `pos`.
    pub fn new(buf: &mut Buffer, pos: Position, past_end: bool) -> Self {
        let id = buf.register_cursor(pos, past_end);
        let saved_line = Some(buf.copy_line(buf.cursor_position(id).line));
        Self {
            id,
            visual: None,
            matching: Vec::new(),
            memory: MotionMemory::new(),
            saved_line,
        }
    }

    // -- Registration -------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn id(&self) -> CursorId {
        self.id
    }

    /// Release the buffer slot. The cursor is gone afterwards.
    pub fn dispose(self, buf: &mut Buffer) {
        buf.release(self.id);
    }

    #[inline]
    #[must_use]
    pub fn position(&self, buf: &Buffer) -> Position {
        buf.cursor_position(self.id)
    }

    /// Allow the caret after the last cell (insert-like modes).
    pub fn set_past_end(&self, buf: &mut Buffer, past_end: bool) {
        buf.set_cursor_past_end(self.id, past_end);
    }

    #[must_use]
    pub const fn memory(&self) -> &MotionMemory {
        &self.memory
    }

    // -- Movement -----------------------------------------------------------

    /// Move to `pos` (clamped). Arriving on a new line snapshots it for `U`.
    pub fn move_to(&mut self, buf: &mut Buffer, pos: Position) -> Position {
        let before = self.position(buf);
        let after = buf.place_cursor(self.id, pos);
        if after.line != before.line {
            self.saved_line = Some(buf.copy_line(after.line));
        }
        after
    }

    /// Record the current position as the previous-context mark.
    pub fn set_previous_context(&mut self, buf: &Buffer) {
        self.memory.previous_context = self.position(buf);
    }

    /// Resolve a motion or text object from the cursor.
    ///
    /// # Errors
    ///
    /// Whatever the motion or object reports; see
    /// [`motion_range`](crate::motion::motion_range).
    pub fn operand_range(&mut self, buf: &Buffer, operand: &Operand) -> EditResult<Range> {
        let at = self.position(buf);
        match (operand.object, operand.motion) {
            (Some(ObjectKind::Visual), _) => self.visual_range(buf).ok_or(EditError::NoTarget),
            (Some(kind), _) => object_range(buf, at, kind, operand.inside, operand.count),
            (None, Some(motion)) => motion_range(buf, at, motion, operand, &mut self.memory),
            (None, None) => Err(EditError::NoTarget),
        }
    }

    /// Resolve an operand for `operation`, applying the operator-pending
    /// rules: `cw` acts like `ce` on a non-blank, and exclusive motions are
    /// corrected at line boundaries.
    ///
    /// # Errors
    ///
    /// As [`operand_range`](Self::operand_range).
    pub fn pending_range(
        &mut self,
        buf: &Buffer,
        operation: Operation,
        operand: &Operand,
    ) -> EditResult<Range> {
        let Some(motion) = operand.motion.filter(|_| operand.object.is_none()) else {
            return self.operand_range(buf, operand);
        };
        let at = self.position(buf);
        let on_blank = buf.cell(at).is_none_or(Cell::is_whitespace);
        let motion = match motion {
            Motion::Word if operation == Operation::Change && !on_blank => Motion::EndWord,
            Motion::BigWord if operation == Operation::Change && !on_blank => Motion::EndBigWord,
            other => other,
        };
        let range = motion_range(buf, at, motion, operand, &mut self.memory)?;
        Ok(operator_range(buf, at, motion, operand.count, range))
    }

    /// Move by a motion. Jumps record the previous-context mark.
    ///
    /// # Errors
    ///
    /// As [`operand_range`](Self::operand_range).
    pub fn move_operand(&mut self, buf: &mut Buffer, operand: &Operand) -> EditResult<Position> {
        let at = self.position(buf);
        let range = self.operand_range(buf, operand)?;
        if range.is_jump() {
            self.memory.previous_context = at;
        }
        Ok(self.move_to(buf, range.end))
    }

    /// `CTRL-]` — jump to the tag the cell links to, or to the tag named by
    /// the keyword under the cursor. Undefined tags resolve to the origin.
    ///
    /// # Errors
    ///
    /// [`EditError::NoWordUnderCursor`] when there is neither a link nor a
    /// keyword.
    pub fn jump_tag(&mut self, buf: &mut Buffer) -> EditResult<Position> {
        let at = self.position(buf);
        let target = match buf.cell(at).and_then(Cell::tag_dest) {
            Some(dest) => buf.tag(dest),
            None => {
                let cells: &[Cell] = buf.line(at.line).map(Vec::as_slice).unwrap_or_default();
                let idx = at.column.saturating_sub(1).min(cells.len());
                let start = cells[..idx]
                    .iter()
                    .rposition(|c| !c.is_word_char())
                    .map_or(0, |i| i + 1);
                let end = cells[idx..]
                    .iter()
                    .position(|c| !c.is_word_char())
                    .map_or(cells.len(), |i| idx + i);
                if start >= end {
                    return Err(EditError::NoWordUnderCursor);
                }
                let keyword: String = cells[start..end].iter().map(Cell::symbol).collect();
                buf.tag(&keyword)
            }
        };
        self.memory.previous_context = at;
        Ok(self.move_to(buf, target))
    }

    // -- Operators ----------------------------------------------------------

    /// Remove the text of `range`, leaving the cursor at its start.
    pub fn delete_range(&mut self, buf: &mut Buffer, range: &Range) -> Register {
        let text = range.text(buf.lines()).to_vec();
        let (earlier, later) = (range.earlier(), range.later());
        match range.kind() {
            RangeKind::Line => {
                buf.splice_lines(earlier.line, later.line - earlier.line + 1, Vec::new());
                let line = earlier.line.min(buf.line_count());
                let column = buf.first_non_blank(line);
                self.move_to(buf, Position::new(line, column));
                return Register::with_text(text, RegisterKind::Line);
            }
            RangeKind::Block => {
                for (line, from, to) in spans(buf, range) {
                    buf.splice(line, from, to - from + 1, Vec::new());
                }
            }
            RangeKind::Char if earlier.line == later.line => {
                let len = (range.last_column() + 1).saturating_sub(earlier.column);
                buf.splice(earlier.line, earlier.column, len, Vec::new());
            }
            RangeKind::Char => {
                buf.splice(earlier.line, earlier.column, usize::MAX, Vec::new());
                buf.splice(later.line, 1, range.last_column(), Vec::new());
                if later.line > earlier.line + 1 {
                    buf.splice_lines(earlier.line + 1, later.line - earlier.line - 1, Vec::new());
                }
                buf.join_lines(earlier.line, true);
            }
        }
        self.move_to(buf, earlier);
        let kind = if range.is_linewise() {
            RegisterKind::Line
        } else {
            RegisterKind::Char
        };
        Register::with_text(text, kind)
    }

    /// Resolve and delete an operand.
    ///
    /// # Errors
    ///
    /// As [`pending_range`](Self::pending_range).
    pub fn delete_operand(
        &mut self,
        buf: &mut Buffer,
        operation: Operation,
        operand: &Operand,
    ) -> EditResult<Register> {
        let range = self.pending_range(buf, operation, operand)?;
        Ok(self.delete_range(buf, &range))
    }

    /// Copy the text of `range`. The cursor moves to the start of the range
    /// when that is before it.
    pub fn yank_range(&mut self, buf: &mut Buffer, range: &Range) -> Register {
        let kind = if range.is_linewise() {
            RegisterKind::Line
        } else {
            RegisterKind::Char
        };
        let register = Register::with_text(range.text(buf.lines()).to_vec(), kind);
        let at = self.position(buf);
        let start = match range.kind() {
            RangeKind::Line => Position::new(range.earlier().line, at.column),
            _ => range.earlier(),
        };
        if start < at {
            self.move_to(buf, start);
        }
        register
    }

    /// Overwrite every cell of `range` with `cell`.
    pub fn replace_range(&mut self, buf: &mut Buffer, range: &Range, cell: &Cell) {
        for (line, from, to) in spans(buf, range) {
            for column in from..=to {
                buf.set_char(Position::new(line, column), cell.clone());
            }
        }
    }

    /// `~` and visual `~` — flip the case of every cased cell in `range`.
    pub fn toggle_case(&mut self, buf: &mut Buffer, range: &Range) {
        for (line, from, to) in spans(buf, range) {
            for column in from..=to {
                let pos = Position::new(line, column);
                if let Some(flipped) = buf.cell(pos).and_then(Cell::toggled_case) {
                    buf.set_char(pos, flipped);
                }
            }
        }
    }

    /// `>` / `<` — shift every line `range` touches.
    pub fn indent_range(&mut self, buf: &mut Buffer, range: &Range, unindent: bool) {
        let (first, last) = (range.earlier().line, range.later().line);
        for line in first..=last.min(buf.line_count()) {
            buf.indent_line(line, unindent);
        }
        let column = buf.first_non_blank(first);
        self.move_to(buf, Position::new(first, column));
    }

    /// `J` — join `count` lines (two at minimum). False on the last line.
    pub fn join_lines(&mut self, buf: &mut Buffer, count: usize) -> bool {
        let line = self.position(buf).line;
        let mut joined = false;
        for _ in 0..count.saturating_sub(1).max(1) {
            let len = buf.line_len(line);
            if !buf.join_lines(line, false) {
                break;
            }
            joined = true;
            self.move_to(buf, Position::new(line, len + 1));
        }
        joined
    }

    /// `p` / `P` — paste `register` `count` times after or before the
    /// cursor.
    ///
    /// Linewise text opens new lines and lands on the first non-blank of
    /// the first one. Charwise text is spliced into the line; multi-line
    /// text splits it and the cursor ends on the last pasted cell.
    pub fn paste(&mut self, buf: &mut Buffer, register: &Register, before: bool, count: usize) {
        if register.is_empty() {
            return;
        }
        let text = repeated(register.text(), count, register.is_linewise());
        let at = self.position(buf);

        if register.is_linewise() {
            let line = if before { at.line } else { at.line + 1 };
            buf.splice_lines(line, 0, text);
            let column = buf.first_non_blank(line);
            self.move_to(buf, Position::new(line, column));
            return;
        }

        let len = buf.line_len(at.line);
        let column = if before || len == 0 {
            at.column
        } else {
            at.column + 1
        }
        .min(len + 1);
        let pasted = text.len();
        let mut lines = text.into_iter();
        let first = lines.next().unwrap_or_default();

        if pasted == 1 {
            let width = first.len();
            buf.splice(at.line, column, 0, first);
            let end = (column + width).saturating_sub(1).max(1);
            self.move_to(buf, Position::new(at.line, end));
            return;
        }

        let last = lines.next_back().unwrap_or_default();
        let middle: Vec<Line> = lines.collect();
        let last_len = last.len();
        buf.insert_line(Position::new(at.line, column));
        buf.splice(at.line, column, 0, first);
        buf.splice(at.line + 1, 1, 0, last);
        buf.splice_lines(at.line + 1, 0, middle);
        self.move_to(buf, Position::new(at.line + pasted - 1, last_len.max(1)));
    }

    /// `U` — swap the current line with its copy from when the cursor
    /// arrived, so a second `U` redoes.
    pub fn undo_line(&mut self, buf: &mut Buffer) -> bool {
        let Some(saved) = self.saved_line.take() else {
            return false;
        };
        let line = self.position(buf).line;
        self.saved_line = Some(buf.replace_line(line, saved));
        buf.place_cursor(self.id, Position::new(line, 1));
        true
    }

    // -- Insertion ----------------------------------------------------------

    /// Insert `cell` before the caret; the caret moves past it.
    pub fn insert(&self, buf: &mut Buffer, cell: Cell) {
        buf.insert_char(self.position(buf), cell);
    }

    /// Overwrite the cell under the caret (or append past the end), then
    /// advance.
    pub fn overwrite(&mut self, buf: &mut Buffer, cell: Cell) {
        let at = self.position(buf);
        if at.column <= buf.line_len(at.line) {
            buf.set_char(at, cell);
            buf.place_cursor(self.id, Position::new(at.line, at.column + 1));
        } else {
            buf.insert_char(at, cell);
        }
    }

    /// Backspace: delete before the caret, joining with the previous line
    /// at column 1.
    pub fn delete_before(&mut self, buf: &mut Buffer) -> bool {
        let at = self.position(buf);
        if at.column > 1 {
            return buf.delete_before(at).is_some();
        }
        at.line > 1 && buf.join_lines(at.line - 1, true)
    }

    /// Delete under the caret, joining the next line at the end of a line.
    pub fn delete_under(&mut self, buf: &mut Buffer) -> bool {
        let at = self.position(buf);
        if at.column > buf.line_len(at.line) {
            return buf.join_lines(at.line, true);
        }
        buf.delete_char(at).is_some()
    }

    /// Split the line at the caret.
    pub fn break_line(&self, buf: &mut Buffer) {
        buf.insert_line(self.position(buf));
    }

    /// `o` / `O` — open an empty line below or above and move onto it.
    pub fn open_line(&mut self, buf: &mut Buffer, above: bool) {
        let at = self.position(buf);
        let line = if above { at.line } else { at.line + 1 };
        buf.insert_line(Position::new(line, 1));
        self.move_to(buf, Position::new(line, 1));
    }

    // -- Visual -------------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn visual(&self) -> Option<Selection> {
        self.visual
    }

    /// Anchor a selection here, or change the kind of the active one.
    pub fn start_visual(&mut self, buf: &Buffer, kind: VisualKind) {
        let anchor = self.position(buf);
        match &mut self.visual {
            Some(selection) => selection.kind = kind,
            None => self.visual = Some(Selection { anchor, kind }),
        }
        self.matching.clear();
    }

    /// Drop the selection, moving to its top-left corner.
    pub fn end_visual(&mut self, buf: &mut Buffer) {
        let Some(selection) = self.visual.take() else {
            return;
        };
        self.matching.clear();
        let at = self.position(buf);
        let anchor = selection.anchor;
        let top = at.line.min(anchor.line);
        let left = if selection.kind == VisualKind::Block || at.line == anchor.line {
            at.column.min(anchor.column)
        } else if at.line < anchor.line {
            at.column
        } else {
            anchor.column
        };
        self.move_to(buf, Position::new(top, left));
    }

    /// Drop the selection where the cursor stands.
    pub fn clear_visual(&mut self) {
        self.visual = None;
        self.matching.clear();
    }

    /// `o` swaps cursor and anchor; `O` (`columns_only`) swaps columns.
    pub fn visual_swap(&mut self, buf: &mut Buffer, columns_only: bool) {
        let Some(selection) = self.visual.as_mut() else {
            return;
        };
        let at = buf.cursor_position(self.id);
        let anchor = selection.anchor;
        let target = if columns_only {
            selection.anchor = Position::new(anchor.line, at.column);
            Position::new(at.line, anchor.column)
        } else {
            selection.anchor = at;
            anchor
        };
        self.move_to(buf, target);
    }

    /// Extend the selection by a motion, or replace it with a text object.
    ///
    /// # Errors
    ///
    /// As [`operand_range`](Self::operand_range).
    pub fn set_visual_operand(&mut self, buf: &mut Buffer, operand: &Operand) -> EditResult<()> {
        if operand.object.is_some() {
            let range = self.operand_range(buf, operand)?;
            let mut last = range.later();
            if range.is_exclusive() && last.column > 1 {
                last.column -= 1;
            }
            let kind = match (range.kind(), self.visual.map(|s| s.kind)) {
                (RangeKind::Line, _) => VisualKind::Line,
                (_, Some(kind)) => kind,
                (_, None) => VisualKind::Char,
            };
            self.visual = Some(Selection {
                anchor: range.earlier(),
                kind,
            });
            self.move_to(buf, last);
        } else {
            self.move_operand(buf, operand)?;
        }
        self.find_matching_selections(buf);
        Ok(())
    }

    /// The selection as a range: char, line or block per its kind.
    #[must_use]
    pub fn visual_range(&self, buf: &Buffer) -> Option<Range> {
        let selection = self.visual?;
        let at = self.position(buf);
        Some(Range::new(selection.anchor, at, selection.kind.range_kind()))
    }

    /// Occurrences of the selected text elsewhere in the buffer.
    #[must_use]
    pub fn matching_selections(&self) -> &[Range] {
        &self.matching
    }

    fn find_matching_selections(&mut self, buf: &Buffer) {
        self.matching.clear();
        let Some(selection) = self.visual.filter(|s| s.kind == VisualKind::Char) else {
            return;
        };
        let at = self.position(buf);
        if at.line != selection.anchor.line {
            return;
        }
        let low = at.column.min(selection.anchor.column);
        let high = at.column.max(selection.anchor.column);
        let Some(needle) = buf.line(at.line).and_then(|l| l.get(low - 1..high)) else {
            return;
        };
        let width = needle.len();
        self.matching = buf
            .occurrences(needle)
            .into_iter()
            .filter(|p| p.line != at.line || p.column + width <= low || p.column > high)
            .map(|p| Range::chars(p, Position::new(p.line, p.column + width - 1)))
            .collect();
    }

    /// True if `pos` is inside the visual selection.
    #[must_use]
    pub fn is_selected(&self, buf: &Buffer, pos: Position) -> bool {
        self.visual_range(buf).is_some_and(|r| r.contains(pos))
    }

    /// True if `pos` is inside one of the matching selections.
    #[must_use]
    pub fn is_highlighted(&self, pos: Position) -> bool {
        self.matching.iter().any(|r| r.contains(pos))
    }

    // -- Multi-cursor growth ------------------------------------------------

    /// A new cursor on `line` at this cursor's column, if the line exists.
    pub fn sibling(&self, buf: &mut Buffer, line: usize) -> Option<Self> {
        if line == 0 || line > buf.line_count() {
            return None;
        }
        let at = self.position(buf);
        Some(Self::new(buf, Position::new(line, at.column), false))
    }

    /// A cursor selecting the first matching selection after this cursor
    /// and after `last` (the newest cursor of a group), oriented the same
    /// way as this selection.
    pub fn next_selection(&self, buf: &mut Buffer, last: Option<Position>) -> Option<Self> {
        let selection = self.visual?;
        let at = self.position(buf);
        let range = self
            .matching
            .iter()
            .filter(|r| last.is_none_or(|l| r.start > l))
            .find(|r| r.start > at)?;
        let (from, to) = if at.column < selection.anchor.column {
            (range.end, range.start)
        } else {
            (range.start, range.end)
        };
        let mut next = Self::new(buf, from, false);
        next.visual = Some(Selection {
            anchor: from,
            kind: selection.kind,
        });
        next.move_to(buf, to);
        Some(next)
    }
}

/// Per-line `(line, first, last)` column spans covered by `range`, clamped
/// to each line. Lines with nothing covered are skipped.
fn spans(buf: &Buffer, range: &Range) -> Vec<(usize, usize, usize)> {
    let (earlier, later) = (range.earlier(), range.later());
    (earlier.line..=later.line.min(buf.line_count()))
        .filter_map(|line| {
            let len = buf.line_len(line);
            let (from, to) = match range.kind() {
                RangeKind::Line => (1, len),
                RangeKind::Block => (earlier.column, range.last_column()),
                RangeKind::Char => (
                    if line == earlier.line { earlier.column } else { 1 },
                    if line == later.line { range.last_column() } else { len },
                ),
            };
            let to = to.min(len);
            (from >= 1 && from <= to).then_some((line, from, to))
        })
        .collect()
}

/// `text` repeated `count` times; charwise copies run on from each other.
fn repeated(text: &[Line], count: usize, linewise: bool) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::new();
    for _ in 0..count.max(1) {
        let mut lines = text.iter().cloned();
        if !linewise {
            if let Some(tail) = out.last_mut() {
                if let Some(first) = lines.next() {
                    tail.extend(first);
                }
            }
        }
        out.extend(lines);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{lines_from_str, lines_to_string};
    use pretty_assertions::assert_eq;

    fn p(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    fn setup(text: &str, at: Position) -> (Buffer, Cursor) {
        let mut buf = Buffer::from_text(text);
        let cursor = Cursor::new(&mut buf, at, false);
        (buf, cursor)
    }

    fn delete(buf: &mut Buffer, cursor: &mut Cursor, operation: Operation, operand: &Operand) -> String {
        let reg = cursor.delete_operand(buf, operation, operand).unwrap();
        lines_to_string(reg.text())
    }

    // -- Delete -------------------------------------------------------------

    #[test]
    fn dw_deletes_word_and_trailing_blank() {
        let (mut buf, mut cursor) = setup("hello world\nfoo bar", p(1, 1));
        let text = delete(&mut buf, &mut cursor, Operation::Delete, &Operand::motion(Motion::Word, 0));
        assert_eq!(text, "hello ");
        assert_eq!(buf.contents(), "world\nfoo bar");
        assert_eq!(cursor.position(&buf), p(1, 1));
    }

    #[test]
    fn cw_on_a_word_stops_at_its_end() {
        let (mut buf, mut cursor) = setup("hello world", p(1, 1));
        let text = delete(&mut buf, &mut cursor, Operation::Change, &Operand::motion(Motion::Word, 0));
        assert_eq!(text, "hello");
        assert_eq!(buf.contents(), " world");
    }

    #[test]
    fn dd_on_last_line_moves_up() {
        let (mut buf, mut cursor) = setup("one\n  two", p(2, 1));
        let reg = cursor
            .delete_operand(&mut buf, Operation::Delete, &Operand::object(ObjectKind::Line, false, 0))
            .unwrap();
        assert!(reg.is_linewise());
        assert_eq!(buf.contents(), "one");
        assert_eq!(cursor.position(&buf), p(1, 1));
    }

    #[test]
    fn multi_line_char_delete_joins() {
        let (mut buf, mut cursor) = setup("abc\nmiddle\nxyz", p(1, 2));
        let range = Range::chars(p(1, 2), p(3, 2));
        let reg = cursor.delete_range(&mut buf, &range);
        assert_eq!(lines_to_string(reg.text()), "bc\nmiddle\nxy");
        assert_eq!(buf.contents(), "az");
        assert_eq!(cursor.position(&buf), p(1, 2));
    }

    #[test]
    fn block_delete_removes_the_rectangle() {
        let (mut buf, mut cursor) = setup("abcdef\nghijkl\nmnopqr", p(1, 2));
        let range = Range::new(p(1, 2), p(2, 4), RangeKind::Block);
        cursor.delete_range(&mut buf, &range);
        assert_eq!(buf.contents(), "aef\ngkl\nmnopqr");
    }

    // -- Yank & paste -------------------------------------------------------

    #[test]
    fn yank_backwards_moves_to_start() {
        let (mut buf, mut cursor) = setup("one two", p(1, 5));
        let range = cursor.operand_range(&buf, &Operand::motion(Motion::BackWord, 0)).unwrap();
        let reg = cursor.yank_range(&mut buf, &range);
        assert_eq!(lines_to_string(reg.text()), "one ");
        assert_eq!(cursor.position(&buf), p(1, 1));
        assert_eq!(buf.contents(), "one two");
    }

    #[test]
    fn paste_charwise_after_and_before() {
        let (mut buf, mut cursor) = setup("ac", p(1, 1));
        let reg = Register::with_text(lines_from_str("b"), RegisterKind::Char);
        cursor.paste(&mut buf, &reg, false, 1);
        assert_eq!(buf.contents(), "abc");
        assert_eq!(cursor.position(&buf), p(1, 2));
        cursor.paste(&mut buf, &reg, true, 2);
        assert_eq!(buf.contents(), "abbbc");
        assert_eq!(cursor.position(&buf), p(1, 3));
    }

    #[test]
    fn paste_linewise_opens_lines() {
        let (mut buf, mut cursor) = setup("one\ntwo", p(1, 2));
        let reg = Register::with_text(lines_from_str("  new"), RegisterKind::Line);
        cursor.paste(&mut buf, &reg, false, 1);
        assert_eq!(buf.contents(), "one\n  new\ntwo");
        assert_eq!(cursor.position(&buf), p(2, 3));
        cursor.paste(&mut buf, &reg, true, 1);
        assert_eq!(buf.contents(), "one\n  new\n  new\ntwo");
        assert_eq!(cursor.position(&buf), p(2, 3));
    }

    #[test]
    fn paste_multi_line_charwise_splits_the_line() {
        let (mut buf, mut cursor) = setup("abXY", p(1, 2));
        let reg = Register::with_text(lines_from_str("1\n2\n3"), RegisterKind::Char);
        cursor.paste(&mut buf, &reg, false, 1);
        assert_eq!(buf.contents(), "ab1\n2\n3XY");
        assert_eq!(cursor.position(&buf), p(3, 1));
    }

    // -- Other operators ----------------------------------------------------

    #[test]
    fn replace_and_toggle_case_follow_the_range() {
        let (mut buf, mut cursor) = setup("abc def", p(1, 1));
        cursor.replace_range(&mut buf, &Range::chars(p(1, 1), p(1, 2)), &Cell::new("x"));
        assert_eq!(buf.contents(), "xxc def");
        cursor.toggle_case(&mut buf, &Range::chars(p(1, 3), p(1, 6)));
        assert_eq!(buf.contents(), "xxC DEf");
    }

    #[test]
    fn indent_moves_to_first_non_blank() {
        let (mut buf, mut cursor) = setup("a\nb", p(1, 1));
        cursor.indent_range(&mut buf, &Range::lines(p(1, 1), p(2, 1)), false);
        assert_eq!(buf.contents(), "    a\n    b");
        assert_eq!(cursor.position(&buf), p(1, 5));
    }

    #[test]
    fn join_counts_lines() {
        let (mut buf, mut cursor) = setup("a\n  b\nc", p(1, 1));
        assert!(cursor.join_lines(&mut buf, 3));
        assert_eq!(buf.contents(), "a b c");
        assert!(!cursor.join_lines(&mut buf, 1));
    }

    #[test]
    fn undo_line_toggles() {
        let (mut buf, mut cursor) = setup("keep\nline", p(1, 1));
        cursor.move_to(&mut buf, p(2, 1));
        buf.delete_char(p(2, 1));
        assert!(cursor.undo_line(&mut buf));
        assert_eq!(buf.contents(), "keep\nline");
        assert!(cursor.undo_line(&mut buf));
        assert_eq!(buf.contents(), "keep\nine");
    }

    // -- Insertion ----------------------------------------------------------

    #[test]
    fn insert_backspace_and_break() {
        let mut buf = Buffer::from_text("ab\ncd");
        let mut cursor = Cursor::new(&mut buf, p(2, 1), true);
        cursor.insert(&mut buf, Cell::new("x"));
        assert_eq!(cursor.position(&buf), p(2, 2));
        assert!(cursor.delete_before(&mut buf));
        assert!(cursor.delete_before(&mut buf));
        assert_eq!(buf.contents(), "abcd");
        assert_eq!(cursor.position(&buf), p(1, 3));
        cursor.break_line(&mut buf);
        assert_eq!(buf.contents(), "ab\ncd");
        assert_eq!(cursor.position(&buf), p(2, 1));
    }

    #[test]
    fn overwrite_replaces_then_appends() {
        let mut buf = Buffer::from_text("ab");
        let mut cursor = Cursor::new(&mut buf, p(1, 2), true);
        cursor.overwrite(&mut buf, Cell::new("X"));
        cursor.overwrite(&mut buf, Cell::new("Y"));
        assert_eq!(buf.contents(), "aXY");
        assert_eq!(cursor.position(&buf), p(1, 4));
    }

    #[test]
    fn open_line_above_and_below() {
        let (mut buf, mut cursor) = setup("one\ntwo", p(1, 2));
        cursor.open_line(&mut buf, false);
        assert_eq!(buf.contents(), "one\n\ntwo");
        assert_eq!(cursor.position(&buf), p(2, 1));
        cursor.open_line(&mut buf, true);
        assert_eq!(buf.contents(), "one\n\n\ntwo");
        assert_eq!(cursor.position(&buf), p(2, 1));
    }

    // -- Visual -------------------------------------------------------------

    #[test]
    fn visual_range_and_end_visual() {
        let (mut buf, mut cursor) = setup("abcdef\nghijkl", p(1, 4));
        cursor.start_visual(&buf, VisualKind::Char);
        cursor.move_operand(&mut buf, &Operand::motion(Motion::Down, 0)).unwrap();
        cursor.move_operand(&mut buf, &Operand::motion(Motion::Left, 2)).unwrap();
        let range = cursor.visual_range(&buf).unwrap();
        assert_eq!((range.earlier(), range.later()), (p(1, 4), p(2, 2)));
        assert!(cursor.is_selected(&buf, p(1, 6)));
        assert!(!cursor.is_selected(&buf, p(2, 3)));
        cursor.end_visual(&mut buf);
        assert_eq!(cursor.visual(), None);
        assert_eq!(cursor.position(&buf), p(1, 4));
    }

    #[test]
    fn visual_swap_exchanges_ends() {
        let (mut buf, mut cursor) = setup("abcdef\nghijkl", p(1, 2));
        cursor.start_visual(&buf, VisualKind::Block);
        cursor.move_to(&mut buf, p(2, 5));
        cursor.visual_swap(&mut buf, true);
        assert_eq!(cursor.position(&buf), p(2, 2));
        assert_eq!(cursor.visual().map(|s| s.anchor), Some(p(1, 5)));
        cursor.visual_swap(&mut buf, false);
        assert_eq!(cursor.position(&buf), p(1, 5));
    }

    #[test]
    fn object_selection_and_matching_occurrences() {
        let (mut buf, mut cursor) = setup("foo bar foo\nfoo", p(1, 2));
        cursor.start_visual(&buf, VisualKind::Char);
        cursor
            .set_visual_operand(&mut buf, &Operand::object(ObjectKind::Word, true, 0))
            .unwrap();
        assert_eq!(cursor.visual().map(|s| s.anchor), Some(p(1, 1)));
        assert_eq!(cursor.position(&buf), p(1, 3));
        let starts: Vec<Position> = cursor.matching_selections().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![p(1, 9), p(2, 1)]);
        assert!(cursor.is_highlighted(p(2, 3)));

        let next = cursor.next_selection(&mut buf, None).unwrap();
        assert_eq!(next.position(&buf), p(1, 11));
        assert_eq!(next.visual().map(|s| s.anchor), Some(p(1, 9)));
        next.dispose(&mut buf);
        assert_eq!(buf.cursor_count(), 1);
    }

    // -- Tags ---------------------------------------------------------------

    #[test]
    fn jump_tag_uses_keyword_and_records_context() {
        let mut buf = Buffer::from_text("see intro\n\nintro text");
        buf.set_tag("intro", p(3, 1));
        let mut cursor = Cursor::new(&mut buf, p(1, 6), false);
        assert_eq!(cursor.jump_tag(&mut buf), Ok(p(3, 1)));
        assert_eq!(cursor.memory().previous_context, p(1, 6));
        cursor.move_to(&mut buf, p(2, 1));
        assert_eq!(cursor.jump_tag(&mut buf), Err(EditError::NoWordUnderCursor));
    }
}
