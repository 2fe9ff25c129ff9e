//! Engine errors.
//!
//! Nothing in the engine is fatal. A command that cannot find its target
//! returns an [`EditError`]; the session turns it into the one-shot status
//! message (its `Display` text) and leaves the buffer untouched.
//! [`EditError::NoTarget`] is the silent case: `h` at column 1, `j` on the
//! last line, `f` with no match on the line.

use thiserror::Error;

/// Why a command did nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("No word under cursor")]
    NoWordUnderCursor,

    #[error("No previous search pattern")]
    NoPreviousPattern,

    #[error("No previous substitution")]
    NoPreviousSubstitution,

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Mark not set")]
    MarkNotSet,

    #[error("Macro {0} not defined")]
    MacroNotDefined(char),

    #[error("Macro recursion too deep")]
    MacroTooDeep,

    #[error("Unknown ex command: {0}")]
    UnknownExCommand(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The motion or object has nowhere to go.
    #[error("no target")]
    NoTarget,
}

impl EditError {
    /// True when the failure should not produce a status message.
    #[inline]
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::NoTarget)
    }
}

/// Result alias for engine operations.
pub type EditResult<T> = Result<T, EditError>;
