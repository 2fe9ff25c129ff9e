//! Word motions — cell classification and boundary scans.
//!
//! | Motion | Key | Predicate                                  |
//! |--------|-----|--------------------------------------------|
//! | start  | `w` | non-blank cell whose left neighbour differs in class |
//! | back   | `b` | same predicate, scanning backward          |
//! | end    | `e` | non-blank cell whose right neighbour differs in class |
//!
//! `W`/`B`/`E` use the same predicates with [`classify_big`], where only
//! blank vs non-blank matters.
//!
//! Scans walk cell by cell across lines. A line boundary counts as a class
//! change, and an empty line is itself a word start (Vim: "an empty line is
//! also considered to be a word").

use crate::buffer::Buffer;
use crate::cell::Cell;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Cell class for word boundary detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Letters, digits, underscore.
    Word,
    /// Non-blank, non-word cells (operators, brackets, images).
    Punctuation,
    /// Space, tab.
    Blank,
}

/// Classifier used by a scan.
pub type Classifier = fn(&Cell) -> CharClass;

/// Classify a cell for `w`/`b`/`e`.
#[must_use]
pub const fn classify(cell: &Cell) -> CharClass {
    if cell.is_whitespace() {
        CharClass::Blank
    } else if cell.is_word_char() {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

/// Classify a cell for `W`/`B`/`E`.
#[must_use]
pub const fn classify_big(cell: &Cell) -> CharClass {
    if cell.is_whitespace() {
        CharClass::Blank
    } else {
        CharClass::Word
    }
}

// ---------------------------------------------------------------------------
// Probes & predicates
// ---------------------------------------------------------------------------

/// A cell and its neighbours on the same line.
///
/// `cell` is `None` when probing an empty line.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    pub cell: Option<&'a Cell>,
    pub before: Option<&'a Cell>,
    pub after: Option<&'a Cell>,
}

impl<'a> Probe<'a> {
    fn at(line: &'a [Cell], idx: usize) -> Self {
        Self {
            cell: line.get(idx),
            before: idx.checked_sub(1).and_then(|i| line.get(i)),
            after: line.get(idx + 1),
        }
    }
}

/// First cell of a word, or an empty line.
#[must_use]
pub fn is_word_start(probe: &Probe<'_>, class: Classifier) -> bool {
    match probe.cell {
        None => true,
        Some(cell) => {
            let here = class(cell);
            here != CharClass::Blank && probe.before.is_none_or(|b| class(b) != here)
        }
    }
}

/// Last cell of a word.
#[must_use]
pub fn is_word_end(probe: &Probe<'_>, class: Classifier) -> bool {
    probe.cell.is_some_and(|cell| {
        let here = class(cell);
        here != CharClass::Blank && probe.after.is_none_or(|a| class(a) != here)
    })
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

/// First position strictly after `from` whose probe satisfies `pred`.
pub fn find_forward(
    buf: &Buffer,
    from: Position,
    pred: impl Fn(&Probe<'_>) -> bool,
) -> Option<Position> {
    for line in from.line..=buf.line_count() {
        let cells = buf.line(line)?;
        if cells.is_empty() {
            if line != from.line && pred(&Probe::at(cells, 0)) {
                return Some(Position::new(line, 1));
            }
            continue;
        }
        let start = if line == from.line { from.column } else { 0 };
        for idx in start..cells.len() {
            if pred(&Probe::at(cells, idx)) {
                return Some(Position::new(line, idx + 1));
            }
        }
    }
    None
}

/// First position strictly before `from` whose probe satisfies `pred`.
pub fn find_backward(
    buf: &Buffer,
    from: Position,
    pred: impl Fn(&Probe<'_>) -> bool,
) -> Option<Position> {
    for line in (1..=from.line.min(buf.line_count())).rev() {
        let cells = buf.line(line)?;
        if cells.is_empty() {
            if line != from.line && pred(&Probe::at(cells, 0)) {
                return Some(Position::new(line, 1));
            }
            continue;
        }
        let end = if line == from.line {
            from.column.saturating_sub(1).min(cells.len())
        } else {
            cells.len()
        };
        for idx in (0..end).rev() {
            if pred(&Probe::at(cells, idx)) {
                return Some(Position::new(line, idx + 1));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Motions
// ---------------------------------------------------------------------------

/// `w` / `W` — start of the `count`-th next word. Runs off the end of the
/// buffer to the position after the last cell.
#[must_use]
pub fn word_forward(buf: &Buffer, from: Position, count: usize, class: Classifier) -> Position {
    let mut pos = from;
    for _ in 0..count.max(1) {
        match find_forward(buf, pos, |p| is_word_start(p, class)) {
            Some(next) => pos = next,
            None => return buf.end_position(),
        }
    }
    pos
}

/// `b` / `B` — start of the `count`-th previous word, or the origin.
#[must_use]
pub fn word_backward(buf: &Buffer, from: Position, count: usize, class: Classifier) -> Position {
    let mut pos = from;
    for _ in 0..count.max(1) {
        match find_backward(buf, pos, |p| is_word_start(p, class)) {
            Some(prev) => pos = prev,
            None => return Position::ORIGIN,
        }
    }
    pos
}

/// `e` / `E` — end of the `count`-th word after `from`, or the last cell.
#[must_use]
pub fn word_end_forward(buf: &Buffer, from: Position, count: usize, class: Classifier) -> Position {
    let mut pos = from;
    for _ in 0..count.max(1) {
        match find_forward(buf, pos, |p| is_word_end(p, class)) {
            Some(next) => pos = next,
            None => {
                let last = buf.line_count();
                return Position::new(last, buf.line_len(last).max(1));
            }
        }
    }
    pos
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
