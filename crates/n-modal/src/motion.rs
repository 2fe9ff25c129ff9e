//! Motions — where a key sends the cursor, expressed as a [`Range`].
//!
//! A motion never moves anything itself. [`motion_range`] resolves it
//! against the buffer from a starting position; the cursor then either
//! moves to `range.end` or hands the whole range to an operator.
//!
//! | Motion                  | Keys        | Range kind | Exclusive | Jump |
//! |-------------------------|-------------|------------|-----------|------|
//! | `Left` / `Right`        | `h` `l`     | char       | yes       |      |
//! | `Up` / `Down`           | `k` `j`     | line       |           |      |
//! | `Word` / `BigWord`      | `w` `W`     | char       | yes       |      |
//! | `BackWord` / `BackBigWord` | `b` `B`  | char       | yes       |      |
//! | `EndWord` / `EndBigWord`| `e` `E`     | char       | no        |      |
//! | `StartLine`             | `0`         | char       | yes       |      |
//! | `FirstNonBlank`         | `^`         | char       | yes       |      |
//! | `EndLine`               | `$`         | char       | yes (len+1) |    |
//! | `GotoLine`              | `G` `gg`    | line       |           | yes  |
//! | `Column`                | `\|`        | char       | yes       |      |
//! | `FindChar` / `TillChar` | `f` `t`     | char       | no        |      |
//! | `FindCharBack` / `TillCharBack` | `F` `T` | char   | yes       |      |
//! | `Line`                  | `_`         | line       |           |      |
//! | `Match`                 | `%`         | char       | no        | yes  |
//! | `MarkChar` / `MarkLine` | `` ` `` `'` | char / line| yes       | yes  |
//! | paragraphs / sentences  | `}{` `)(`   | char       | yes       |      |
//! | `Search` / `SearchBack` | `/` `?` `n` | char       | yes       | yes  |
//!
//! Screen motions (`H`, `M`, `L`) are resolved by the viewport into a
//! `GotoLine` with an explicit count before they reach this module.

use crate::buffer::{Buffer, Direction};
use crate::cell::Cell;
use crate::error::{EditError, EditResult};
use crate::pattern::Pattern;
use crate::position::{Position, Range, RangeKind};
use crate::word::{self, Classifier, classify, classify_big};

// ---------------------------------------------------------------------------
// Motion / object vocabulary
// ---------------------------------------------------------------------------

/// A cursor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    Word,
    BackWord,
    BigWord,
    BackBigWord,
    EndWord,
    EndBigWord,
    StartLine,
    FirstNonBlank,
    EndLine,
    GotoLine,
    Column,
    FindChar,
    FindCharBack,
    TillChar,
    TillCharBack,
    RepeatFind,
    RepeatFindReverse,
    Line,
    Match,
    MarkChar,
    MarkLine,
    ParagraphForward,
    ParagraphBackward,
    SentenceForward,
    SentenceBackward,
    Search,
    SearchBack,
}

impl Motion {
    /// The same character search in the other direction (`,`).
    #[must_use]
    pub const fn reversed_find(self) -> Self {
        match self {
            Self::FindChar => Self::FindCharBack,
            Self::FindCharBack => Self::FindChar,
            Self::TillChar => Self::TillCharBack,
            Self::TillCharBack => Self::TillChar,
            other => other,
        }
    }
}

/// A window-relative motion (`H`, `M`, `L`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenMotion {
    Top,
    Middle,
    Bottom,
}

/// A text object kind (the key after `i` / `a`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Word,
    BigWord,
    Paren,
    Brace,
    Bracket,
    Angle,
    DoubleQuote,
    SingleQuote,
    Paragraph,
    Sentence,
    /// The current line(s), as used by `dd`, `yy`, `S`.
    Line,
    /// Cells under and after the cursor, as used by `x` and `r`.
    Char,
    /// The active visual selection.
    Visual,
}

/// What an operation acts on: a motion or a text object plus its count
/// and any captured character or text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operand {
    pub motion: Option<Motion>,
    pub object: Option<ObjectKind>,
    /// `i` (true) or `a` (false) for text objects.
    pub inside: bool,
    pub screen: Option<ScreenMotion>,
    /// The key captured after `f`, `t`, `r`, `m`, `` ` ``, `@`, `q`.
    pub character: Option<String>,
    /// Zero means "not given".
    pub count: usize,
    /// Text typed into a `:`, `/` or `?` prompt.
    pub text: String,
    pub pattern: Option<Pattern>,
    /// Whether searches wrap around the buffer ends.
    pub wrap: bool,
}

impl Operand {
    #[must_use]
    pub fn motion(motion: Motion, count: usize) -> Self {
        Self {
            motion: Some(motion),
            count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn object(kind: ObjectKind, inside: bool, count: usize) -> Self {
        Self {
            object: Some(kind),
            inside,
            count,
            ..Self::default()
        }
    }

    /// A search motion for `pattern`.
    #[must_use]
    pub fn search(pattern: Pattern, direction: Direction, wrap: bool) -> Self {
        let motion = match direction {
            Direction::Forward => Motion::Search,
            Direction::Backward => Motion::SearchBack,
        };
        Self {
            motion: Some(motion),
            pattern: Some(pattern),
            wrap,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub const fn count_or_one(&self) -> usize {
        if self.count == 0 { 1 } else { self.count }
    }
}

// ---------------------------------------------------------------------------
// Motion memory
// ---------------------------------------------------------------------------

/// The last `f`/`F`/`t`/`T`, repeated by `;` and `,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastFind {
    pub motion: Motion,
    pub character: String,
}

/// Per-cursor state that motions read and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionMemory {
    pub last_find: Option<LastFind>,
    /// Origin of the most recent jump (`` ` `` `` ` `` / `''`).
    pub previous_context: Position,
}

impl MotionMemory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_find: None,
            previous_context: Position::ORIGIN,
        }
    }
}

impl Default for MotionMemory {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Cell walks
// ---------------------------------------------------------------------------

/// Cells strictly after `from`, in buffer order.
pub fn cells_forward(buf: &Buffer, from: Position) -> impl Iterator<Item = (Position, &Cell)> {
    (from.line..=buf.line_count()).flat_map(move |line| {
        let cells: &[Cell] = buf.line(line).map(Vec::as_slice).unwrap_or_default();
        let skip = if line == from.line { from.column } else { 0 };
        cells
            .iter()
            .enumerate()
            .skip(skip)
            .map(move |(i, cell)| (Position::new(line, i + 1), cell))
    })
}

/// Cells strictly before `from`, in reverse buffer order.
pub fn cells_backward(buf: &Buffer, from: Position) -> impl Iterator<Item = (Position, &Cell)> {
    (1..=from.line.min(buf.line_count())).rev().flat_map(move |line| {
        let cells: &[Cell] = buf.line(line).map(Vec::as_slice).unwrap_or_default();
        let end = if line == from.line {
            from.column.saturating_sub(1).min(cells.len())
        } else {
            cells.len()
        };
        cells[..end]
            .iter()
            .enumerate()
            .rev()
            .map(move |(i, cell)| (Position::new(line, i + 1), cell))
    })
}

/// The bracket matching the one at `from`, honouring nesting.
///
/// Scans forward for `close` (counting nested `open`s) or backward for
/// `open` (counting nested `close`s).
#[must_use]
pub fn bracket_partner(
    buf: &Buffer,
    from: Position,
    open: &str,
    close: &str,
    direction: Direction,
) -> Option<Position> {
    let (deeper, target) = match direction {
        Direction::Forward => (open, close),
        Direction::Backward => (close, open),
    };
    let mut depth = 0usize;
    let mut visit = |(pos, cell): (Position, &Cell)| {
        if cell.is(deeper) {
            depth += 1;
        } else if cell.is(target) {
            if depth == 0 {
                return Some(pos);
            }
            depth -= 1;
        }
        None
    };
    match direction {
        Direction::Forward => cells_forward(buf, from).find_map(&mut visit),
        Direction::Backward => cells_backward(buf, from).find_map(&mut visit),
    }
}

const BRACKETS: [(&str, &str); 3] = [("(", ")"), ("[", "]"), ("{", "}")];

// ---------------------------------------------------------------------------
// Sentences & paragraphs
// ---------------------------------------------------------------------------

fn is_blank_line(buf: &Buffer, line: usize) -> bool {
    buf.line_len(line) == 0
}

/// True if a sentence ends with `cells[..=idx]`: a `.`, `?` or `!`,
/// optionally followed by closing `)`, `]`, `"` or `'`.
fn ends_sentence(cells: &[Cell], idx: usize) -> bool {
    let mut i = idx;
    while i > 0 && [")", "]", "\"", "'"].iter().any(|s| cells[i].is(s)) {
        i -= 1;
    }
    [".", "?", "!"].iter().any(|s| cells[i].is(s))
}

/// Whether a sentence begins at `pos`.
///
/// Starts are: an empty line, the first non-blank after an empty (or
/// all-blank) line or at the top of the buffer, and any non-blank whose
/// previous non-blank ends a sentence with whitespace or a line break in
/// between.
#[must_use]
pub fn is_sentence_start(buf: &Buffer, pos: Position) -> bool {
    let Some(cells) = buf.line(pos.line) else {
        return false;
    };
    if cells.is_empty() {
        return pos.column == 1;
    }
    let Some(idx) = pos.column.checked_sub(1).filter(|&i| i < cells.len()) else {
        return false;
    };
    if cells[idx].is_whitespace() {
        return false;
    }
    let before = &cells[..idx];
    if let Some(prev) = before.iter().rposition(|c| !c.is_whitespace()) {
        return prev + 1 < idx && ends_sentence(before, prev);
    }
    if pos.line == 1 {
        return true;
    }
    let above = buf.line(pos.line - 1).map(Vec::as_slice).unwrap_or_default();
    above
        .iter()
        .rposition(|c| !c.is_whitespace())
        .is_none_or(|last| ends_sentence(above, last))
}

fn next_sentence_start(buf: &Buffer, from: Position) -> Option<Position> {
    for line in from.line..=buf.line_count() {
        let first = if line == from.line { from.column + 1 } else { 1 };
        for column in first..=buf.line_len(line).max(1) {
            let pos = Position::new(line, column);
            if is_sentence_start(buf, pos) {
                return Some(pos);
            }
        }
    }
    None
}

fn previous_sentence_start(buf: &Buffer, from: Position) -> Option<Position> {
    for line in (1..=from.line.min(buf.line_count())).rev() {
        let width = buf.line_len(line).max(1);
        let last = if line == from.line {
            from.column.saturating_sub(1).min(width)
        } else {
            width
        };
        for column in (1..=last).rev() {
            let pos = Position::new(line, column);
            if is_sentence_start(buf, pos) {
                return Some(pos);
            }
        }
    }
    None
}

/// `)` — start of the `count`-th next sentence, or the buffer end.
#[must_use]
pub fn sentence_forward(buf: &Buffer, from: Position, count: usize) -> Position {
    let mut pos = from;
    for _ in 0..count.max(1) {
        match next_sentence_start(buf, pos) {
            Some(next) => pos = next,
            None => return buf.end_position(),
        }
    }
    pos
}

/// `(` — start of the `count`-th previous sentence, or the origin.
#[must_use]
pub fn sentence_backward(buf: &Buffer, from: Position, count: usize) -> Position {
    let mut pos = from;
    for _ in 0..count.max(1) {
        match previous_sentence_start(buf, pos) {
            Some(prev) => pos = prev,
            None => return Position::ORIGIN,
        }
    }
    pos
}

/// `}` — the empty line after the `count`-th paragraph.
///
/// Returns the target and whether it is exclusive. Running off the end
/// lands inclusively on the last cell of the buffer.
#[must_use]
pub fn paragraph_forward(buf: &Buffer, from: Position, count: usize) -> (Position, bool) {
    let last = buf.line_count();
    let mut line = from.line;
    for _ in 0..count.max(1) {
        while line <= last && is_blank_line(buf, line) {
            line += 1;
        }
        while line <= last && !is_blank_line(buf, line) {
            line += 1;
        }
        if line > last {
            return (Position::new(last, buf.line_len(last).max(1)), false);
        }
    }
    (Position::new(line, 1), true)
}

/// `{` — the empty line before the `count`-th previous paragraph, or the
/// origin.
#[must_use]
pub fn paragraph_backward(buf: &Buffer, from: Position, count: usize) -> Position {
    let mut line = from.line;
    for _ in 0..count.max(1) {
        while line >= 1 && is_blank_line(buf, line) {
            line -= 1;
        }
        while line >= 1 && !is_blank_line(buf, line) {
            line -= 1;
        }
        if line == 0 {
            return Position::ORIGIN;
        }
    }
    Position::new(line, 1)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

const fn word_class(motion: Motion) -> Classifier {
    match motion {
        Motion::BigWord | Motion::BackBigWord | Motion::EndBigWord => classify_big,
        _ => classify,
    }
}

/// Resolve `motion` from `at`.
///
/// `f`/`F`/`t`/`T` record themselves in `memory` for `;` and `,`; mark
/// motions read the previous-context position from it.
///
/// # Errors
///
/// [`EditError::NoTarget`] when the motion cannot move (edges, no match on
/// the line), [`EditError::MarkNotSet`], [`EditError::NoPreviousPattern`]
/// and [`EditError::PatternNotFound`] for the user-visible failures.
pub fn motion_range(
    buf: &Buffer,
    at: Position,
    motion: Motion,
    operand: &Operand,
    memory: &mut MotionMemory,
) -> EditResult<Range> {
    let n = operand.count_or_one();
    let line_len = buf.line_len(at.line);
    match motion {
        Motion::Left => {
            if at.column <= 1 {
                return Err(EditError::NoTarget);
            }
            let column = at.column.saturating_sub(n).max(1);
            Ok(Range::chars(at, Position::new(at.line, column)).exclusive())
        }
        Motion::Right => {
            if at.column > line_len {
                return Err(EditError::NoTarget);
            }
            let column = (at.column + n).min(line_len + 1);
            Ok(Range::chars(at, Position::new(at.line, column)).exclusive())
        }
        Motion::Up => {
            if at.line <= 1 {
                return Err(EditError::NoTarget);
            }
            let line = at.line.saturating_sub(n).max(1);
            Ok(Range::lines(at, Position::new(line, at.column)))
        }
        Motion::Down => {
            let last = buf.line_count();
            if at.line >= last {
                return Err(EditError::NoTarget);
            }
            Ok(Range::lines(at, Position::new((at.line + n).min(last), at.column)))
        }
        Motion::Word | Motion::BigWord => {
            let target = word::word_forward(buf, at, n, word_class(motion));
            Ok(Range::chars(at, target).exclusive())
        }
        Motion::BackWord | Motion::BackBigWord => {
            let target = word::word_backward(buf, at, n, word_class(motion));
            Ok(Range::chars(at, target).exclusive())
        }
        Motion::EndWord | Motion::EndBigWord => {
            let target = word::word_end_forward(buf, at, n, word_class(motion));
            Ok(Range::chars(at, target))
        }
        Motion::StartLine => Ok(Range::chars(at, Position::new(at.line, 1)).exclusive()),
        Motion::FirstNonBlank => {
            let column = buf.first_non_blank(at.line);
            Ok(Range::chars(at, Position::new(at.line, column)).exclusive())
        }
        Motion::EndLine => {
            let line = (at.line + n - 1).min(buf.line_count());
            Ok(Range::chars(at, Position::new(line, buf.line_len(line) + 1)).exclusive())
        }
        Motion::GotoLine => {
            let last = buf.line_count();
            let line = if operand.count == 0 {
                last
            } else {
                operand.count.min(last)
            };
            Ok(Range::lines(at, Position::new(line, buf.first_non_blank(line))).jump())
        }
        Motion::Column => {
            let column = n.min(line_len.max(1));
            Ok(Range::chars(at, Position::new(at.line, column)).exclusive())
        }
        Motion::FindChar | Motion::FindCharBack | Motion::TillChar | Motion::TillCharBack => {
            let character = operand.character.clone().ok_or(EditError::NoTarget)?;
            let range = find_in_line(buf, at, motion, &character, n);
            memory.last_find = Some(LastFind { motion, character });
            range
        }
        Motion::RepeatFind | Motion::RepeatFindReverse => {
            let last = memory.last_find.as_ref().ok_or(EditError::NoTarget)?;
            let find = if motion == Motion::RepeatFindReverse {
                last.motion.reversed_find()
            } else {
                last.motion
            };
            find_in_line(buf, at, find, &last.character, n)
        }
        Motion::Line => {
            let line = (at.line + n - 1).min(buf.line_count());
            Ok(Range::lines(at, Position::new(line, buf.first_non_blank(line))))
        }
        Motion::Match => {
            if operand.count > 0 {
                let last = buf.line_count();
                let line = (operand.count * last).div_ceil(100).clamp(1, last);
                return Ok(Range::lines(at, Position::new(line, buf.first_non_blank(line))).jump());
            }
            let target = matching_bracket(buf, at).ok_or(EditError::NoTarget)?;
            Ok(Range::chars(at, target).jump())
        }
        Motion::MarkChar | Motion::MarkLine => {
            let name = operand.character.as_deref().ok_or(EditError::NoTarget)?;
            let target = match name {
                "`" | "'" => memory.previous_context,
                _ => name
                    .chars()
                    .next()
                    .and_then(|c| buf.mark(c))
                    .ok_or(EditError::MarkNotSet)?,
            };
            let target = buf.clamp(target, false);
            if motion == Motion::MarkLine {
                let first = buf.first_non_blank(target.line);
                Ok(Range::lines(at, Position::new(target.line, first)).jump())
            } else {
                Ok(Range::chars(at, target).exclusive().jump())
            }
        }
        Motion::ParagraphForward => {
            let (target, exclusive) = paragraph_forward(buf, at, n);
            let range = Range::chars(at, target);
            Ok(if exclusive { range.exclusive() } else { range })
        }
        Motion::ParagraphBackward => {
            Ok(Range::chars(at, paragraph_backward(buf, at, n)).exclusive())
        }
        Motion::SentenceForward => Ok(Range::chars(at, sentence_forward(buf, at, n)).exclusive()),
        Motion::SentenceBackward => {
            Ok(Range::chars(at, sentence_backward(buf, at, n)).exclusive())
        }
        Motion::Search | Motion::SearchBack => {
            let pattern = operand.pattern.as_ref().ok_or(EditError::NoPreviousPattern)?;
            let direction = if motion == Motion::Search {
                Direction::Forward
            } else {
                Direction::Backward
            };
            let mut pos = at;
            for _ in 0..n {
                let hit = buf
                    .search(pattern, pos, direction, false, operand.wrap)
                    .ok_or_else(|| EditError::PatternNotFound(pattern.source().to_string()))?;
                pos = hit.position;
            }
            Ok(Range::chars(at, pos).exclusive().jump())
        }
    }
}

/// `f`, `F`, `t`, `T` on the cursor's line.
fn find_in_line(
    buf: &Buffer,
    at: Position,
    motion: Motion,
    character: &str,
    count: usize,
) -> EditResult<Range> {
    let cells = buf.line(at.line).ok_or(EditError::NoTarget)?;
    let cursor = at.column.saturating_sub(1).min(cells.len());
    let forward = matches!(motion, Motion::FindChar | Motion::TillChar);
    let hit = if forward {
        (cursor + 1..cells.len())
            .filter(|&i| cells[i].is(character))
            .nth(count - 1)
    } else {
        (0..cursor).rev().filter(|&i| cells[i].is(character)).nth(count - 1)
    };
    let column = hit.ok_or(EditError::NoTarget)? + 1;
    let range = match motion {
        Motion::FindChar => Range::chars(at, Position::new(at.line, column)),
        Motion::TillChar => Range::chars(at, Position::new(at.line, column - 1)),
        Motion::FindCharBack => Range::chars(at, Position::new(at.line, column)).exclusive(),
        _ => Range::chars(at, Position::new(at.line, column + 1)).exclusive(),
    };
    Ok(range)
}

/// `%` — the partner of the first bracket at or after the cursor on its
/// line.
fn matching_bracket(buf: &Buffer, at: Position) -> Option<Position> {
    let cells = buf.line(at.line)?;
    let start = at.column.saturating_sub(1);
    cells.iter().enumerate().skip(start).find_map(|(i, cell)| {
        let here = Position::new(at.line, i + 1);
        BRACKETS.iter().find_map(|&(open, close)| {
            if cell.is(open) {
                Some(bracket_partner(buf, here, open, close, Direction::Forward))
            } else if cell.is(close) {
                Some(bracket_partner(buf, here, open, close, Direction::Backward))
            } else {
                None
            }
        })
    })?
}

// ---------------------------------------------------------------------------
// Operator-pending corrections
// ---------------------------------------------------------------------------

/// Apply Vim's exclusive-motion rules to a range about to be handed to an
/// operator.
///
/// - `w`/`W` whose last step lands on a later line stops at the end of the
///   line the last word was on.
/// - An exclusive charwise range ending in column 1 of a later line ends at
///   the end of the previous line instead, and becomes linewise if it
///   started at or before the first non-blank.
#[must_use]
pub fn operator_range(buf: &Buffer, at: Position, motion: Motion, count: usize, range: Range) -> Range {
    let mut range = range;
    if matches!(motion, Motion::Word | Motion::BigWord) && range.end.line > at.line {
        let n = count.max(1);
        let prev = if n > 1 {
            word::word_forward(buf, at, n - 1, word_class(motion))
        } else {
            at
        };
        let prev_len = buf.line_len(prev.line);
        if range.end.line > prev.line && prev_len > 0 {
            range = Range::chars(at, Position::new(prev.line, prev_len + 1)).exclusive();
        }
    }

    let (earlier, later) = (range.earlier(), range.later());
    if range.kind() == RangeKind::Char
        && range.is_exclusive()
        && later.column == 1
        && later.line > earlier.line
    {
        let end_line = later.line - 1;
        range = if earlier.column <= buf.first_non_blank(earlier.line) {
            Range::lines(earlier, Position::new(end_line, 1))
        } else {
            Range::chars(earlier, Position::new(end_line, buf.line_len(end_line) + 1)).exclusive()
        };
    }
    range
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    fn resolve(buf: &Buffer, at: Position, operand: &Operand) -> EditResult<Range> {
        let mut memory = MotionMemory::new();
        motion_range(buf, at, operand.motion.unwrap(), operand, &mut memory)
    }

    fn target(buf: &Buffer, at: Position, motion: Motion, count: usize) -> Position {
        resolve(buf, at, &Operand::motion(motion, count)).unwrap().end
    }

    fn find(motion: Motion, ch: &str) -> Operand {
        Operand {
            character: Some(ch.to_string()),
            ..Operand::motion(motion, 0)
        }
    }

    // -- Edges --------------------------------------------------------------

    #[test]
    fn h_at_column_one_and_j_on_last_line_have_no_target() {
        let buf = Buffer::from_text("ab\ncd");
        assert_eq!(resolve(&buf, p(1, 1), &Operand::motion(Motion::Left, 1)), Err(EditError::NoTarget));
        assert_eq!(resolve(&buf, p(2, 1), &Operand::motion(Motion::Down, 1)), Err(EditError::NoTarget));
        assert_eq!(resolve(&buf, p(1, 1), &Operand::motion(Motion::Up, 1)), Err(EditError::NoTarget));
    }

    #[test]
    fn counts_clamp_to_the_buffer() {
        let buf = Buffer::from_text("abcdef\nx\ny");
        assert_eq!(target(&buf, p(1, 5), Motion::Left, 9), p(1, 1));
        assert_eq!(target(&buf, p(1, 2), Motion::Right, 9), p(1, 7));
        assert_eq!(target(&buf, p(1, 2), Motion::Down, 9), p(3, 2));
    }

    #[test]
    fn dollar_with_count_ends_past_a_later_line() {
        let buf = Buffer::from_text("ab\ncdef\ng");
        let r = resolve(&buf, p(1, 1), &Operand::motion(Motion::EndLine, 2)).unwrap();
        assert_eq!(r.end, p(2, 5));
        assert!(r.is_exclusive());
    }

    #[test]
    fn goto_line_defaults_to_last_and_is_a_linewise_jump() {
        let buf = Buffer::from_text("a\n  b\nc");
        let r = resolve(&buf, p(1, 1), &Operand::motion(Motion::GotoLine, 2)).unwrap();
        assert_eq!(r.end, p(2, 3));
        assert!(r.is_linewise() && r.is_jump());
        assert_eq!(target(&buf, p(1, 1), Motion::GotoLine, 0), p(3, 1));
    }

    // -- Character search ---------------------------------------------------

    #[test]
    fn f_and_t_land_on_and_before_the_target() {
        let buf = Buffer::from_text("a,b,c,d");
        let mut memory = MotionMemory::new();
        let f = motion_range(&buf, p(1, 1), Motion::FindChar, &find(Motion::FindChar, ","), &mut memory).unwrap();
        assert_eq!(f.end, p(1, 2));
        assert!(!f.is_exclusive());
        let t = motion_range(&buf, p(1, 3), Motion::TillChar, &find(Motion::TillChar, ","), &mut memory).unwrap();
        assert_eq!(t.end, p(1, 3));
        let big_t = motion_range(&buf, p(1, 7), Motion::TillCharBack, &find(Motion::TillCharBack, ","), &mut memory).unwrap();
        assert_eq!(big_t.end, p(1, 7));
        assert!(big_t.is_exclusive());
    }

    #[test]
    fn semicolon_and_comma_repeat_the_last_find() {
        let buf = Buffer::from_text("a,b,c,d");
        let mut memory = MotionMemory::new();
        let _ = motion_range(&buf, p(1, 1), Motion::FindChar, &find(Motion::FindChar, ","), &mut memory);
        let again = Operand::motion(Motion::RepeatFind, 0);
        assert_eq!(motion_range(&buf, p(1, 2), Motion::RepeatFind, &again, &mut memory).unwrap().end, p(1, 4));
        let back = Operand::motion(Motion::RepeatFindReverse, 0);
        assert_eq!(motion_range(&buf, p(1, 4), Motion::RepeatFindReverse, &back, &mut memory).unwrap().end, p(1, 2));
    }

    #[test]
    fn repeat_find_without_history_has_no_target() {
        let buf = Buffer::from_text("abc");
        assert_eq!(
            resolve(&buf, p(1, 1), &Operand::motion(Motion::RepeatFind, 0)),
            Err(EditError::NoTarget)
        );
    }

    // -- Brackets -----------------------------------------------------------

    #[test]
    fn percent_jumps_between_nested_brackets() {
        let buf = Buffer::from_text("f(a, (b)) {\n}");
        assert_eq!(target(&buf, p(1, 1), Motion::Match, 0), p(1, 9));
        assert_eq!(target(&buf, p(1, 9), Motion::Match, 0), p(1, 2));
        assert_eq!(target(&buf, p(1, 11), Motion::Match, 0), p(2, 1));
    }

    #[test]
    fn percent_with_count_goes_to_a_line_percentage() {
        let buf = Buffer::from_text("1\n2\n3\n4\n5\n6\n7\n8\n9\n10");
        assert_eq!(target(&buf, p(1, 1), Motion::Match, 50), p(5, 1));
    }

    // -- Marks --------------------------------------------------------------

    #[test]
    fn undefined_mark_is_reported() {
        let buf = Buffer::from_text("abc");
        assert_eq!(resolve(&buf, p(1, 1), &find(Motion::MarkChar, "q")), Err(EditError::MarkNotSet));
    }

    #[test]
    fn mark_line_lands_on_first_non_blank() {
        let mut buf = Buffer::from_text("x\n   yz");
        buf.set_mark('a', p(2, 5));
        assert_eq!(resolve(&buf, p(1, 1), &find(Motion::MarkLine, "a")).unwrap().end, p(2, 4));
        assert_eq!(resolve(&buf, p(1, 1), &find(Motion::MarkChar, "a")).unwrap().end, p(2, 5));
    }

    // -- Paragraphs & sentences ---------------------------------------------

    #[test]
    fn paragraph_motions_stop_on_blank_lines() {
        let buf = Buffer::from_text("a\nb\n\nc\nd\n\ne");
        assert_eq!(target(&buf, p(1, 1), Motion::ParagraphForward, 1), p(3, 1));
        assert_eq!(target(&buf, p(1, 1), Motion::ParagraphForward, 2), p(6, 1));
        assert_eq!(target(&buf, p(1, 1), Motion::ParagraphForward, 3), p(7, 1));
        assert_eq!(target(&buf, p(5, 1), Motion::ParagraphBackward, 1), p(3, 1));
        assert_eq!(target(&buf, p(5, 1), Motion::ParagraphBackward, 2), p(1, 1));
    }

    #[test]
    fn sentence_starts() {
        let buf = Buffer::from_text("One. Two!  Three\nfour.\n\nFive");
        assert!(is_sentence_start(&buf, p(1, 1)));
        assert!(is_sentence_start(&buf, p(1, 6)));
        assert!(is_sentence_start(&buf, p(1, 12)));
        assert!(!is_sentence_start(&buf, p(2, 1)));
        assert!(is_sentence_start(&buf, p(3, 1)));
        assert!(is_sentence_start(&buf, p(4, 1)));
    }

    #[test]
    fn sentence_motions() {
        let buf = Buffer::from_text("One. Two. Three.");
        assert_eq!(target(&buf, p(1, 1), Motion::SentenceForward, 1), p(1, 6));
        assert_eq!(target(&buf, p(1, 1), Motion::SentenceForward, 2), p(1, 11));
        assert_eq!(target(&buf, p(1, 1), Motion::SentenceForward, 3), p(1, 17));
        assert_eq!(target(&buf, p(1, 12), Motion::SentenceBackward, 1), p(1, 11));
        assert_eq!(target(&buf, p(1, 11), Motion::SentenceBackward, 1), p(1, 6));
    }

    // -- Search -------------------------------------------------------------

    #[test]
    fn search_without_pattern_or_match() {
        let buf = Buffer::from_text("abc");
        assert_eq!(
            resolve(&buf, p(1, 1), &Operand::motion(Motion::Search, 0)),
            Err(EditError::NoPreviousPattern)
        );
        let op = Operand::search(Pattern::compile("zz"), Direction::Forward, true);
        assert_eq!(resolve(&buf, p(1, 1), &op), Err(EditError::PatternNotFound("zz".into())));
    }

    #[test]
    fn search_respects_wrapscan() {
        let buf = Buffer::from_text("foo\nbar\nfoo");
        let wrap = Operand::search(Pattern::compile("foo"), Direction::Forward, true);
        assert_eq!(resolve(&buf, p(3, 1), &wrap).unwrap().end, p(1, 1));
        let nowrap = Operand::search(Pattern::compile("foo"), Direction::Forward, false);
        assert!(resolve(&buf, p(3, 1), &nowrap).is_err());
    }

    // -- Operator corrections -----------------------------------------------

    #[test]
    fn dw_on_last_word_of_line_stops_at_line_end() {
        let buf = Buffer::from_text("foo bar\nbaz");
        let r = resolve(&buf, p(1, 5), &Operand::motion(Motion::Word, 1)).unwrap();
        let r = operator_range(&buf, p(1, 5), Motion::Word, 1, r);
        assert_eq!((r.earlier(), r.later()), (p(1, 5), p(1, 8)));
        assert!(r.is_exclusive());
    }

    #[test]
    fn exclusive_motion_to_column_one_becomes_linewise() {
        let buf = Buffer::from_text("a\nb\n\nc");
        let r = resolve(&buf, p(1, 1), &Operand::motion(Motion::ParagraphForward, 1)).unwrap();
        let r = operator_range(&buf, p(1, 1), Motion::ParagraphForward, 1, r);
        assert!(r.is_linewise());
        assert_eq!((r.earlier().line, r.later().line), (1, 2));
    }
}
