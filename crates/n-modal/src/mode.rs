//! Vim-style modal editing.
//!
//! The session is always in exactly one [`Mode`]. Each mode selects a key
//! map and changes how far the cursor may travel:
//!
//! | Mode       | Cursor shape | Cursor limit        | Key map           |
//! |------------|--------------|---------------------|-------------------|
//! | Normal     | Block        | `1..=len`           | normal commands   |
//! | Insert     | Bar          | `1..=len+1`         | text input        |
//! | Visual     | Block        | `1..=len`           | selection         |
//! | Replace    | Underline    | `1..=len+1`         | overwrite         |
//! | TextEntry  | Bar          | (in the prompt)     | `:` `/` `?` line  |

use std::fmt;

use crate::position::RangeKind;

// ---------------------------------------------------------------------------
// VisualKind
// ---------------------------------------------------------------------------

/// The sub-mode of visual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// `v` — character-wise selection.
    Char,
    /// `V` — line-wise selection (always selects full lines).
    Line,
    /// `Ctrl-V` — block (column) selection.
    Block,
}

impl VisualKind {
    /// The range kind a selection of this kind produces.
    #[must_use]
    pub const fn range_kind(self) -> RangeKind {
        match self {
            Self::Char => RangeKind::Char,
            Self::Line => RangeKind::Line,
            Self::Block => RangeKind::Block,
        }
    }
}

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// What a text-entry prompt submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// `:` — an ex command line.
    Ex,
    /// `/` — forward search.
    Search,
    /// `?` — backward search.
    SearchBack,
}

impl EntryKind {
    /// The prompt character shown before the typed text.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Ex => ":",
            Self::Search => "/",
            Self::SearchBack => "?",
        }
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// The current editing mode.
///
/// A pure data type: which key map is active and how the cursor is bounded.
/// Transitions live in the session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Visual(VisualKind),
    /// `R` — continuous overwrite until Esc.
    Replace,
    /// Typing into a `:`, `/` or `?` prompt.
    TextEntry(EntryKind),
}

impl Mode {
    /// Human-readable name for the status line.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Insert => "INSERT",
            Self::Visual(kind) => match kind {
                VisualKind::Char => "VISUAL",
                VisualKind::Line => "VISUAL LINE",
                VisualKind::Block => "VISUAL BLOCK",
            },
            Self::Replace => "REPLACE",
            Self::TextEntry(_) => "COMMAND",
        }
    }

    /// The `-- INSERT --` style banner, empty in normal and prompt modes.
    #[must_use]
    pub fn banner(self) -> String {
        match self {
            Self::Normal | Self::TextEntry(_) => String::new(),
            other => format!("-- {} --", other.display_name()),
        }
    }

    #[must_use]
    pub const fn cursor_shape(self) -> CursorShape {
        match self {
            Self::Normal | Self::Visual(_) => CursorShape::SteadyBlock,
            Self::Insert | Self::TextEntry(_) => CursorShape::SteadyBar,
            Self::Replace => CursorShape::SteadyUnderline,
        }
    }

    /// True if the cursor can sit one past the last cell.
    #[inline]
    #[must_use]
    pub const fn cursor_past_end(self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }

    #[inline]
    #[must_use]
    pub const fn is_visual(self) -> bool {
        matches!(self, Self::Visual(_))
    }

    #[inline]
    #[must_use]
    pub const fn visual_kind(self) -> Option<VisualKind> {
        match self {
            Self::Visual(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// CursorShape
// ---------------------------------------------------------------------------

/// Cursor shape hint for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorShape {
    SteadyBlock,
    SteadyBar,
    SteadyUnderline,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
