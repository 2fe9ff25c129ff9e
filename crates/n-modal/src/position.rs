//! Text position and range types.
//!
//! All coordinates are **1-indexed**, matching what Vi shows the user: line 1
//! is the first line, column 1 the first cell. Columns count cells
//! (graphemes), not bytes or display columns. Column `len + 1` is the caret
//! after the last cell, valid only in insert-like modes.
//!
//! A [`Range`] is what motions and text objects produce. Unlike an editor's
//! half-open selection, a Vi range remembers *how* it was made: its
//! [`RangeKind`] (char, line, block) and whether the far end is exclusive.
//! That classification, not the motion that built it, decides how operators
//! interpret the range.

use std::cell::OnceCell;
use std::fmt;

use crate::cell::Line;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position in a buffer: (line, column), both 1-indexed.
///
/// Positions are ordered lexicographically: line first, then column.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The first cell of the first line.
    pub const ORIGIN: Self = Self { line: 1, column: 1 };

    #[inline]
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.line, self.column)
    }
}

// ---------------------------------------------------------------------------
// RangeKind
// ---------------------------------------------------------------------------

/// How an operator should interpret a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    /// An exact span of cells, possibly crossing lines.
    Char,
    /// Whole lines from `earlier.line` to `later.line`.
    Line,
    /// A column rectangle applied to each line independently.
    Block,
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A motion or text-object result.
///
/// `start` is where the motion began and `end` where it landed, so `end` may
/// come before `start`. [`earlier`](Self::earlier) and [`later`](Self::later)
/// are the ordered endpoints, computed once at construction: lexicographic
/// for char and line ranges, per-axis min/max for blocks.
///
/// The text covered by the range is computed on first request via
/// [`text`](Self::text) and cached.
#[derive(Clone, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
    kind: RangeKind,
    exclusive: bool,
    jump: bool,
    earlier: Position,
    later: Position,
    text: OnceCell<Vec<Line>>,
}

impl Range {
    /// Create an inclusive range of the given kind.
    #[must_use]
    pub fn new(start: Position, end: Position, kind: RangeKind) -> Self {
        let (earlier, later) = match kind {
            RangeKind::Block => (
                Position::new(start.line.min(end.line), start.column.min(end.column)),
                Position::new(start.line.max(end.line), start.column.max(end.column)),
            ),
            RangeKind::Char | RangeKind::Line => {
                if start <= end {
                    (start, end)
                } else {
                    (end, start)
                }
            }
        };
        Self {
            start,
            end,
            kind,
            exclusive: false,
            jump: false,
            earlier,
            later,
            text: OnceCell::new(),
        }
    }

    /// Inclusive charwise range.
    #[must_use]
    pub fn chars(start: Position, end: Position) -> Self {
        Self::new(start, end, RangeKind::Char)
    }

    /// Linewise range.
    #[must_use]
    pub fn lines(start: Position, end: Position) -> Self {
        Self::new(start, end, RangeKind::Line)
    }

    /// Mark the later endpoint as excluded.
    #[must_use]
    pub const fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Flag the motion as a jump, recording the origin as the
    /// previous-context mark.
    #[must_use]
    pub const fn jump(mut self) -> Self {
        self.jump = true;
        self
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RangeKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    #[inline]
    #[must_use]
    pub const fn is_jump(&self) -> bool {
        self.jump
    }

    /// Line and block ranges are stored in registers as whole lines.
    #[inline]
    #[must_use]
    pub const fn is_linewise(&self) -> bool {
        !matches!(self.kind, RangeKind::Char)
    }

    #[inline]
    #[must_use]
    pub const fn earlier(&self) -> Position {
        self.earlier
    }

    #[inline]
    #[must_use]
    pub const fn later(&self) -> Position {
        self.later
    }

    /// The last column included on the final line (or of the block).
    ///
    /// Zero when an exclusive range ends at column 1, meaning nothing on
    /// that line is covered.
    #[inline]
    #[must_use]
    pub const fn last_column(&self) -> usize {
        if self.exclusive {
            self.later.column.saturating_sub(1)
        } else {
            self.later.column
        }
    }

    /// True for an exclusive charwise range whose endpoints coincide.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, RangeKind::Char) && self.exclusive && self.earlier == self.later
    }

    /// Whether `pos` lies inside the range.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        if pos.line < self.earlier.line || pos.line > self.later.line {
            return false;
        }
        match self.kind {
            RangeKind::Line => true,
            RangeKind::Block => {
                pos.column >= self.earlier.column && pos.column <= self.last_column()
            }
            RangeKind::Char => {
                pos >= self.earlier
                    && if self.exclusive {
                        pos < self.later
                    } else {
                        pos <= self.later
                    }
            }
        }
    }

    /// The covered text as lines of cells, computed once from `lines`.
    pub fn text(&self, lines: &[Line]) -> &[Line] {
        self.text.get_or_init(|| self.extract(lines))
    }

    fn extract(&self, lines: &[Line]) -> Vec<Line> {
        let first = self.earlier.line.max(1);
        let last = self.later.line.min(lines.len());
        if first > last {
            return Vec::new();
        }
        let span = &lines[first - 1..last];
        match self.kind {
            RangeKind::Line => span.to_vec(),
            RangeKind::Block => span
                .iter()
                .map(|line| slice(line, self.earlier.column, self.last_column()))
                .collect(),
            RangeKind::Char if first == last => {
                vec![slice(&span[0], self.earlier.column, self.last_column())]
            }
            RangeKind::Char => {
                let mut out = Vec::with_capacity(span.len());
                out.push(slice(&span[0], self.earlier.column, usize::MAX));
                for line in &span[1..span.len() - 1] {
                    out.push(line.clone());
                }
                out.push(slice(&span[span.len() - 1], 1, self.last_column()));
                out
            }
        }
    }
}

/// Cells `from..=to` (1-based, inclusive), clamped to the line.
fn slice(line: &[crate::cell::Cell], from: usize, to: usize) -> Line {
    let start = from.saturating_sub(1).min(line.len());
    let end = to.min(line.len()).max(start);
    line[start..end].to_vec()
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Range({:?} {}:{} .. {}:{}{}{})",
            self.kind,
            self.start.line,
            self.start.column,
            self.end.line,
            self.end.column,
            if self.exclusive { " excl" } else { "" },
            if self.jump { " jump" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{line_to_string, lines_from_str};
    use pretty_assertions::assert_eq;

    fn texts(range: &Range, source: &str) -> Vec<String> {
        let lines = lines_from_str(source);
        range.text(&lines).iter().map(|l| line_to_string(l)).collect()
    }

    // -- Ordering -----------------------------------------------------------

    #[test]
    fn positions_order_by_line_then_column() {
        assert!(Position::new(1, 9) < Position::new(2, 1));
        assert!(Position::new(3, 2) < Position::new(3, 4));
        assert_eq!(Position::new(4, 7).to_string(), "4,7");
    }

    #[test]
    fn earlier_and_later_are_ordered() {
        let r = Range::chars(Position::new(2, 5), Position::new(1, 3));
        assert_eq!(r.earlier(), Position::new(1, 3));
        assert_eq!(r.later(), Position::new(2, 5));
    }

    #[test]
    fn block_endpoints_use_per_axis_extremes() {
        let r = Range::new(Position::new(1, 6), Position::new(3, 2), RangeKind::Block);
        assert_eq!(r.earlier(), Position::new(1, 2));
        assert_eq!(r.later(), Position::new(3, 6));
    }

    // -- Text ---------------------------------------------------------------

    #[test]
    fn single_line_char_text_respects_exclusivity() {
        let r = Range::chars(Position::new(1, 1), Position::new(1, 7)).exclusive();
        assert_eq!(texts(&r, "hello world"), vec!["hello "]);
        let r = Range::chars(Position::new(1, 1), Position::new(1, 7));
        assert_eq!(texts(&r, "hello world"), vec!["hello w"]);
    }

    #[test]
    fn multi_line_char_text() {
        let r = Range::chars(Position::new(1, 3), Position::new(3, 2));
        assert_eq!(texts(&r, "abcd\nefgh\nijkl"), vec!["cd", "efgh", "ij"]);
    }

    #[test]
    fn line_and_block_text() {
        let source = "abcdef\nghijkl\nmnopqr";
        let r = Range::lines(Position::new(2, 4), Position::new(3, 1));
        assert_eq!(texts(&r, source), vec!["ghijkl", "mnopqr"]);
        let r = Range::new(Position::new(1, 2), Position::new(2, 4), RangeKind::Block);
        assert_eq!(texts(&r, source), vec!["bcd", "hij"]);
    }

    // -- Containment --------------------------------------------------------

    #[test]
    fn contains_by_kind() {
        let r = Range::chars(Position::new(1, 3), Position::new(2, 2)).exclusive();
        assert!(r.contains(Position::new(1, 9)));
        assert!(r.contains(Position::new(2, 1)));
        assert!(!r.contains(Position::new(2, 2)));

        let r = Range::lines(Position::new(2, 1), Position::new(4, 1));
        assert!(r.contains(Position::new(3, 50)));
        assert!(!r.contains(Position::new(5, 1)));

        let r = Range::new(Position::new(1, 2), Position::new(3, 4), RangeKind::Block);
        assert!(r.contains(Position::new(2, 3)));
        assert!(!r.contains(Position::new(2, 5)));
    }

    #[test]
    fn empty_exclusive_range() {
        let r = Range::chars(Position::new(1, 4), Position::new(1, 4)).exclusive();
        assert!(r.is_empty());
        assert_eq!(texts(&r, "abcdef"), vec![""]);
    }
}
