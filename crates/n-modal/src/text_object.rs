//! Text objects — Vim-style selection by structure.
//!
//! ```text
//! operator + text-object = action
//! d        + iw          = delete inner word
//! c        + i"          = change inside quotes
//! y        + a(          = yank around parentheses
//! ```
//!
//! [`object_range`] resolves an [`ObjectKind`] at a cursor position into a
//! [`Range`], or [`EditError::NoTarget`] when there is nothing to select.
//!
//! | Inner | Around | Shape                                      |
//! |-------|--------|--------------------------------------------|
//! | `iw`  | `aw`   | word run, plus trailing (or leading) blank |
//! | `iW`  | `aW`   | WORD run, same rule                        |
//! | `i"`  | `a"`   | quote pair on the cursor line              |
//! | `i'`  | `a'`   | quote pair on the cursor line              |
//! | `ib`  | `ab`   | `( )`, nested `count` levels out           |
//! | `iB`  | `aB`   | `{ }`                                      |
//! | `i[`  | `a[`   | `[ ]`                                      |
//! | `i<`  | `a<`   | `< >`                                      |
//! | `ip`  | `ap`   | paragraph, plus following blank lines      |
//! | `is`  | `as`   | sentence, plus trailing whitespace         |
//!
//! `Line` and `Char` are the implicit objects of doubled operators (`dd`)
//! and `x`/`r`. The visual object is resolved by the cursor from its anchor.

use crate::buffer::{Buffer, Direction};
use crate::cell::Cell;
use crate::error::{EditError, EditResult};
use crate::motion::{ObjectKind, bracket_partner, cells_backward, is_sentence_start, sentence_backward, sentence_forward};
use crate::position::{Position, Range};
use crate::word::{CharClass, Classifier, classify, classify_big};

/// Resolve a text object at `at`.
///
/// # Errors
///
/// [`EditError::NoTarget`] when the object does not exist there (an empty
/// line for `iw`, no enclosing pair, no quotes on the line).
pub fn object_range(
    buf: &Buffer,
    at: Position,
    kind: ObjectKind,
    inside: bool,
    count: usize,
) -> EditResult<Range> {
    let count = count.max(1);
    match kind {
        ObjectKind::Word => word_object(buf, at, classify, inside, count),
        ObjectKind::BigWord => word_object(buf, at, classify_big, inside, count),
        ObjectKind::DoubleQuote => quote_object(buf, at, "\"", inside),
        ObjectKind::SingleQuote => quote_object(buf, at, "'", inside),
        ObjectKind::Paren => bracket_object(buf, at, "(", ")", inside, count),
        ObjectKind::Brace => bracket_object(buf, at, "{", "}", inside, count),
        ObjectKind::Bracket => bracket_object(buf, at, "[", "]", inside, count),
        ObjectKind::Angle => bracket_object(buf, at, "<", ">", inside, count),
        ObjectKind::Paragraph => Ok(paragraph_object(buf, at, inside, count)),
        ObjectKind::Sentence => Ok(sentence_object(buf, at, inside, count)),
        ObjectKind::Line => {
            let last = (at.line + count - 1).min(buf.line_count());
            Ok(Range::lines(Position::new(at.line, 1), Position::new(last, 1)))
        }
        ObjectKind::Char => {
            let len = buf.line_len(at.line);
            if at.column > len {
                return Err(EditError::NoTarget);
            }
            let end = (at.column + count - 1).min(len);
            Ok(Range::chars(at, Position::new(at.line, end)))
        }
        ObjectKind::Visual => Err(EditError::NoTarget),
    }
}

// ---------------------------------------------------------------------------
// Word objects
// ---------------------------------------------------------------------------

/// The run of same-class cells around `idx`, inclusive.
fn run_around(cells: &[Cell], idx: usize, class: Classifier) -> (usize, usize) {
    let here = class(&cells[idx]);
    let mut start = idx;
    while start > 0 && class(&cells[start - 1]) == here {
        start -= 1;
    }
    let mut end = idx;
    while end + 1 < cells.len() && class(&cells[end + 1]) == here {
        end += 1;
    }
    (start, end)
}

/// `iw`/`aw`/`iW`/`aW`. Word objects never cross a line break.
fn word_object(
    buf: &Buffer,
    at: Position,
    class: Classifier,
    inside: bool,
    count: usize,
) -> EditResult<Range> {
    let cells = buf.line(at.line).ok_or(EditError::NoTarget)?;
    let idx = at.column.saturating_sub(1);
    if idx >= cells.len() {
        return Err(EditError::NoTarget);
    }
    let is_blank = |i: usize| class(&cells[i]) == CharClass::Blank;

    let (mut start, mut end) = run_around(cells, idx, class);
    if inside {
        for _ in 1..count {
            if end + 1 >= cells.len() {
                break;
            }
            end = run_around(cells, end + 1, class).1;
        }
    } else if is_blank(idx) {
        // On whitespace: the blank run plus the following word.
        if end + 1 < cells.len() {
            end = run_around(cells, end + 1, class).1;
        }
        for _ in 1..count {
            end = extend_word_and_blank(cells, end, class);
        }
    } else {
        let trailing = end + 1 < cells.len() && is_blank(end + 1);
        if trailing {
            end = run_around(cells, end + 1, class).1;
        } else if start > 0 && is_blank(start - 1) {
            start = run_around(cells, start - 1, class).0;
        }
        for _ in 1..count {
            end = extend_word_and_blank(cells, end, class);
        }
    }
    Ok(Range::chars(
        Position::new(at.line, start + 1),
        Position::new(at.line, end + 1),
    ))
}

/// One more `aw` step after `end`: the next word and its trailing blanks.
fn extend_word_and_blank(cells: &[Cell], end: usize, class: Classifier) -> usize {
    let mut end = end;
    if end + 1 < cells.len() {
        end = run_around(cells, end + 1, class).1;
    }
    if end + 1 < cells.len() && class(&cells[end + 1]) == CharClass::Blank {
        end = run_around(cells, end + 1, class).1;
    }
    end
}

// ---------------------------------------------------------------------------
// Quote objects
// ---------------------------------------------------------------------------

/// Quotes pair up left to right on the cursor line: 1st with 2nd, 3rd with
/// 4th. The pair containing the cursor wins, else the next pair forward.
fn quote_pair(cells: &[Cell], column: usize, quote: &str) -> Option<(usize, usize)> {
    let quotes: Vec<usize> = cells
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is(quote))
        .map(|(i, _)| i)
        .collect();
    let col = column.saturating_sub(1);
    let pairs = || quotes.chunks_exact(2).map(|p| (p[0], p[1]));
    pairs()
        .find(|&(open, close)| col >= open && col <= close)
        .or_else(|| pairs().find(|&(open, _)| open > col))
}

fn quote_object(buf: &Buffer, at: Position, quote: &str, inside: bool) -> EditResult<Range> {
    let cells = buf.line(at.line).ok_or(EditError::NoTarget)?;
    let (open, close) = quote_pair(cells, at.column, quote).ok_or(EditError::NoTarget)?;
    let line = at.line;
    if inside {
        // Columns are 1-based: open + 2 is the cell after the opening quote.
        let start = Position::new(line, open + 2);
        return Ok(Range::chars(start, Position::new(line, close + 1)).exclusive());
    }
    let (mut start, mut end) = (open, close);
    let trailing = cells[close + 1..].iter().take_while(|c| c.is_whitespace()).count();
    if trailing > 0 {
        end += trailing;
    } else {
        start -= cells[..open].iter().rev().take_while(|c| c.is_whitespace()).count();
    }
    Ok(Range::chars(Position::new(line, start + 1), Position::new(line, end + 1)))
}

// ---------------------------------------------------------------------------
// Bracket objects
// ---------------------------------------------------------------------------

/// The `count`-th unmatched `open` at or before `at`.
fn enclosing_open(buf: &Buffer, at: Position, open: &str, close: &str, count: usize) -> Option<Position> {
    let mut remaining = count;
    if buf.cell(at).is_some_and(|c| c.is(open)) {
        remaining -= 1;
        if remaining == 0 {
            return Some(at);
        }
    }
    let mut depth = 0usize;
    cells_backward(buf, at).find_map(|(pos, cell)| {
        if cell.is(close) {
            depth += 1;
        } else if cell.is(open) {
            if depth > 0 {
                depth -= 1;
            } else {
                remaining -= 1;
                if remaining == 0 {
                    return Some(pos);
                }
            }
        }
        None
    })
}

fn bracket_object(
    buf: &Buffer,
    at: Position,
    open: &str,
    close: &str,
    inside: bool,
    count: usize,
) -> EditResult<Range> {
    let start = enclosing_open(buf, at, open, close, count).ok_or(EditError::NoTarget)?;
    let end = bracket_partner(buf, start, open, close, Direction::Forward).ok_or(EditError::NoTarget)?;
    if !inside {
        return Ok(Range::chars(start, end));
    }

    // Brackets on lines of their own: the lines in between.
    let open_ends_line = start.column == buf.line_len(start.line);
    let close_starts_line = end.column <= buf.first_non_blank(end.line);
    if end.line > start.line && open_ends_line && close_starts_line {
        if end.line - start.line < 2 {
            return Err(EditError::NoTarget);
        }
        return Ok(Range::lines(
            Position::new(start.line + 1, 1),
            Position::new(end.line - 1, 1),
        ));
    }
    let after_open = Position::new(start.line, start.column + 1);
    Ok(Range::chars(after_open, end).exclusive())
}

// ---------------------------------------------------------------------------
// Paragraph & sentence objects
// ---------------------------------------------------------------------------

/// Lines `first..=last` sharing the blankness of `line`.
fn line_run(buf: &Buffer, line: usize) -> (usize, usize) {
    let blank = |l: usize| buf.line_len(l) == 0;
    let here = blank(line);
    let mut first = line;
    while first > 1 && blank(first - 1) == here {
        first -= 1;
    }
    let mut last = line;
    while last < buf.line_count() && blank(last + 1) == here {
        last += 1;
    }
    (first, last)
}

/// `ip` selects runs of same-blankness lines; `ap` pairs each paragraph
/// with the blank run after it (before it at the end of the buffer).
fn paragraph_object(buf: &Buffer, at: Position, inside: bool, count: usize) -> Range {
    let line_count = buf.line_count();
    let (mut first, mut last) = line_run(buf, at.line);
    let runs = if inside { count } else { count * 2 };
    for _ in 1..runs {
        if last >= line_count {
            break;
        }
        last = line_run(buf, last + 1).1;
    }
    if !inside {
        let ends_on_text = buf.line_len(last) > 0;
        if ends_on_text && last == line_count && first > 1 && buf.line_len(first - 1) == 0 {
            first = line_run(buf, first - 1).0;
        }
    }
    Range::lines(Position::new(first, 1), Position::new(last, 1))
}

/// `is` stops before the whitespace that follows the sentence; `as`
/// includes it.
fn sentence_object(buf: &Buffer, at: Position, inside: bool, count: usize) -> Range {
    let start = if is_sentence_start(buf, at) {
        at
    } else {
        sentence_backward(buf, at, 1)
    };
    let mut end = sentence_forward(buf, start, count);
    if end.column == 1 && end.line > start.line {
        let line = end.line - 1;
        end = Position::new(line, buf.line_len(line) + 1);
    }
    if inside {
        while end.column > 1
            && end > start
            && buf
                .cell(Position::new(end.line, end.column - 1))
                .is_some_and(Cell::is_whitespace)
        {
            end.column -= 1;
        }
    }
    Range::chars(start, end).exclusive()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
