//! Viewport — a scrolling window of display rows over the buffer.
//!
//! The viewport owns no text. It tracks which buffer line is at the top of
//! the window and how big the window is, and lays the visible lines out as
//! rows of display cells:
//!
//! ```text
//! buffer                         layout (cols = 8)
//! ┌────────────────────┐        ┌────────┐
//! │ 1 a\tb             │  ───▶  │a·······│  tab fills to the next stop
//! │ 2 wide 日本         │        │b       │
//! │ 3 (empty)          │        │wide 日_│  wide cell + padding
//! └────────────────────┘        │本_     │  long lines wrap
//!                               │        │  empty line: one blank cell
//!                               │~       │  past the end of the buffer
//!                               └────────┘
//! ```
//!
//! Screen-relative motions (`H`, `M`, `L`) read the buffer line shown on a
//! layout row, so the layout must be current when they are resolved.

use crate::buffer::Buffer;
use crate::cell::Cell;
use crate::motion::ScreenMotion;
use crate::position::Position;

/// What a display cell shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    Symbol(String),
    /// An inline image's first column; the rest are padding.
    Image(String),
    /// The tail of a tab, wide cell or image.
    Padding,
    /// The single cell standing for an empty line.
    Blank,
    /// `~` past the end of the buffer.
    Tilde,
}

/// One display cell and the buffer position it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutCell {
    pub glyph: Glyph,
    pub line: usize,
    pub column: usize,
    /// 1-based column within the display row.
    pub display_column: usize,
    /// 1-based display column within the whole (unwrapped) line.
    pub space_column: usize,
}

/// A scrolling window over a buffer.
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Top visible line, 0-based.
    start: usize,
    rows: usize,
    cols: usize,
    tabstop: usize,
    layout: Vec<Vec<LayoutCell>>,
}

impl Viewport {
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self {
            start: 0,
            rows: if rows == 0 { 1 } else { rows },
            cols: if cols == 0 { 1 } else { cols },
            tabstop: 8,
            layout: Vec::new(),
        }
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// First visible buffer line (1-based).
    #[inline]
    #[must_use]
    pub const fn top_line(&self) -> usize {
        self.start + 1
    }

    /// First and last buffer lines that start inside the window.
    #[must_use]
    pub fn visible_lines(&self, buf: &Buffer) -> (usize, usize) {
        let first = self.top_line();
        let last = self
            .layout
            .iter()
            .rev()
            .find(|row| row.first().is_some_and(|c| c.glyph != Glyph::Tilde))
            .and_then(|row| row.first())
            .map_or_else(
                || (self.start + self.rows).min(buf.line_count()),
                |c| c.line,
            );
        (first, last.max(first))
    }

    /// The most recent layout.
    #[must_use]
    pub fn layout(&self) -> &[Vec<LayoutCell>] {
        &self.layout
    }

    // -- Configuration ------------------------------------------------------

    pub const fn set_size(&mut self, rows: usize, cols: usize) {
        self.rows = if rows == 0 { 1 } else { rows };
        self.cols = if cols == 0 { 1 } else { cols };
    }

    pub const fn set_tabstop(&mut self, tabstop: usize) {
        self.tabstop = if tabstop == 0 { 1 } else { tabstop };
    }

    // -- Layout -------------------------------------------------------------

    fn cell_width(&self, cell: &Cell, display_column: usize) -> usize {
        if let Some(image) = cell.image_ref() {
            image.cols.max(1)
        } else if cell.is("\t") {
            self.tabstop - display_column % self.tabstop
        } else {
            cell.width().max(1)
        }
    }

    /// Recompute the display rows for the current window.
    pub fn lay_out(&mut self, buf: &Buffer) -> &[Vec<LayoutCell>] {
        let mut rows = Vec::with_capacity(self.rows);
        let mut line = self.start + 1;
        let mut column = 0usize;
        let mut space = 0usize;

        for _ in 0..self.rows {
            let mut row = Vec::new();
            let Some(cells) = buf.line(line) else {
                row.push(LayoutCell {
                    glyph: Glyph::Tilde,
                    line,
                    column: 1,
                    display_column: 1,
                    space_column: 1,
                });
                rows.push(row);
                line += 1;
                continue;
            };
            if cells.is_empty() {
                row.push(LayoutCell {
                    glyph: Glyph::Blank,
                    line,
                    column: 1,
                    display_column: 1,
                    space_column: 1,
                });
                rows.push(row);
                line += 1;
                continue;
            }

            let mut j = 0;
            while j < self.cols && column < cells.len() {
                let cell = &cells[column];
                let width = self.cell_width(cell, j);
                let glyph = cell.image_ref().map_or_else(
                    || Glyph::Symbol(cell.symbol().to_string()),
                    |image| Glyph::Image(image.src.clone()),
                );
                let tab = cell.is("\t");
                for t in 0..width {
                    let glyph = if t == 0 || tab { glyph.clone() } else { Glyph::Padding };
                    row.push(LayoutCell {
                        glyph,
                        line,
                        column: column + 1,
                        display_column: j + t + 1,
                        space_column: space + t + 1,
                    });
                }
                j += width;
                space += width;
                column += 1;
            }
            if column >= cells.len() {
                line += 1;
                column = 0;
                space = 0;
            }
            rows.push(row);
        }
        self.layout = rows;
        &self.layout
    }

    // -- Scrolling ----------------------------------------------------------

    /// Scroll the window up one line. False at the top of the buffer.
    pub const fn up(&mut self) -> bool {
        if self.start == 0 {
            return false;
        }
        self.start -= 1;
        true
    }

    /// Scroll the window down one line. False once the last line is at
    /// the top.
    pub fn down(&mut self, buf: &Buffer) -> bool {
        if self.start + 1 >= buf.line_count() {
            return false;
        }
        self.start += 1;
        true
    }

    /// The layout row showing `pos`, if it is on screen.
    fn row_of(&self, pos: Position) -> Option<usize> {
        self.layout
            .iter()
            .position(|row| row.iter().any(|c| c.line == pos.line && c.column == pos.column))
            .or_else(|| {
                self.layout
                    .iter()
                    .rposition(|row| row.first().is_some_and(|c| c.line == pos.line && c.glyph != Glyph::Tilde))
            })
    }

    /// Scroll so the cursor is shown on display row `row` (0-based).
    pub fn scroll_to(&mut self, buf: &Buffer, cursor: Position, row: usize) {
        self.lay_out(buf);
        let Some(current) = self.row_of(cursor) else {
            return;
        };
        if current > row {
            for _ in 0..current - row {
                self.down(buf);
            }
        } else {
            for _ in 0..row - current {
                self.up();
            }
        }
        self.lay_out(buf);
    }

    /// Bring `cursor` into the window with a margin of `scrolloff` lines
    /// (one when minimising movement), clamped to half the window.
    pub fn ensure_visible(&mut self, buf: &Buffer, cursor: Position, minimise: bool, scrolloff: usize) {
        let line = cursor.line.saturating_sub(1);
        if line < self.start {
            self.start = line;
        } else if line >= self.start + self.rows {
            self.start = line + 1 - self.rows;
        }

        let offset = if minimise { 1 } else { scrolloff }.min((self.rows - 1) / 2);
        if line < self.start + offset {
            for _ in 0..self.start + offset - line {
                if !self.up() {
                    break;
                }
            }
        }
        if line + offset >= self.start + self.rows {
            for _ in 0..line + offset + 1 - self.start - self.rows {
                if !self.down(buf) {
                    break;
                }
            }
        }

        // Wrapped lines above the cursor push it down the screen.
        let cols = self.cols;
        let wrapped = |start: usize| -> usize {
            (start + 1..=line)
                .map(|l| buf.line_len(l))
                .filter(|&len| len > cols)
                .map(|len| len.div_ceil(cols) - 1)
                .sum()
        };
        let mut extra = wrapped(self.start);
        while extra > 0 && self.start + self.rows < line + 2 + extra {
            if !self.down(buf) {
                break;
            }
            extra = wrapped(self.start);
        }
        self.lay_out(buf);
    }

    /// The buffer line an `H` / `M` / `L` with `count` refers to.
    #[must_use]
    pub fn screen_line(&self, motion: ScreenMotion, count: usize) -> usize {
        let rows = self.layout.len();
        if rows == 0 {
            return self.top_line();
        }
        let row = match motion {
            ScreenMotion::Middle => rows / 2,
            ScreenMotion::Top => (count.max(1) - 1).min(rows - 1),
            ScreenMotion::Bottom => rows - count.max(1).min(rows),
        };
        self.layout[row].first().map_or(self.top_line(), |c| c.line)
    }

    /// 1-based display column of `pos` on its unwrapped line.
    #[must_use]
    pub fn display_column(&self, buf: &Buffer, pos: Position) -> usize {
        let cells: &[Cell] = buf.line(pos.line).map(Vec::as_slice).unwrap_or_default();
        let before = pos.column.saturating_sub(1).min(cells.len());
        cells[..before]
            .iter()
            .fold(0, |col, cell| col + self.cell_width(cell, col))
            + 1
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
