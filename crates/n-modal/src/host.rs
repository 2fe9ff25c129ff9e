//! The engine's view of its embedder.
//!
//! Two seams connect a [`Session`](crate::session::Session) to the outside
//! world. Both are traits with do-nothing defaults so a host only
//! implements what it supports.
//!
//! - [`Clipboard`] backs the `+` and `*` registers. Reads may complete
//!   later: a [`ClipboardRead::Pending`] read parks the paste until the host
//!   calls [`Session::deliver_clipboard`](crate::session::Session::deliver_clipboard).
//! - [`Host`] receives what the engine cannot do itself: `:w`, unknown ex
//!   commands, and tab-page requests.

use crate::command::TabCommand;

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

/// Outcome of a clipboard read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardRead {
    Ready(String),
    /// The text will arrive through `Session::deliver_clipboard`.
    Pending,
}

/// External clipboard for the `+` and `*` registers.
pub trait Clipboard {
    fn read_text(&mut self) -> ClipboardRead;
    fn write_text(&mut self, text: &str);
}

/// A clipboard that lives in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    text: String,
}

impl MemoryClipboard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&mut self) -> ClipboardRead {
        ClipboardRead::Ready(self.text.clone())
    }

    fn write_text(&mut self, text: &str) {
        text.clone_into(&mut self.text);
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// `:w` — the lines to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// First and last line written (1-based, inclusive).
    pub range: (usize, usize),
    /// Whatever followed `:w`, usually a file name.
    pub args: String,
    pub text: String,
}

/// An ex command the engine does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExRequest {
    /// The explicit range, if one was typed.
    pub range: Option<(usize, usize)>,
    pub command: String,
}

/// The host's answer to an [`ExRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExResponse {
    pub handled: bool,
    /// Shown as the status message.
    pub message: Option<String>,
}

impl ExResponse {
    #[must_use]
    pub fn handled(message: Option<String>) -> Self {
        Self {
            handled: true,
            message,
        }
    }
}

/// Commands delegated to the embedder.
pub trait Host {
    /// Handle `:w`. The returned text becomes the status message.
    fn write(&mut self, request: &WriteRequest) -> Option<String> {
        let _ = request;
        None
    }

    /// Handle an unrecognised ex command.
    fn ex_command(&mut self, request: &ExRequest) -> ExResponse {
        let _ = request;
        ExResponse::default()
    }

    fn tab_command(&mut self, command: TabCommand) {
        let _ = command;
    }
}

/// A host that handles nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoHost;

impl Host for NoHost {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_clipboard_round_trips() {
        let mut clip = MemoryClipboard::new();
        assert_eq!(clip.read_text(), ClipboardRead::Ready(String::new()));
        clip.write_text("copied");
        assert_eq!(clip.read_text(), ClipboardRead::Ready("copied".into()));
        assert_eq!(clip.text(), "copied");
    }

    #[test]
    fn default_host_declines() {
        let mut host = NoHost;
        let request = ExRequest {
            range: None,
            command: "frob".into(),
        };
        assert_eq!(host.ex_command(&request), ExResponse::default());
        assert_eq!(
            host.write(&WriteRequest {
                range: (1, 1),
                args: String::new(),
                text: String::new()
            }),
            None
        );
    }
}
