//! # n-modal — Vi/Vim modal editing engine
//!
//! A headless editing engine: feed it logical key names, read back text,
//! cursors, a screen layout and a status line. No terminal, no files.
//!
//! - **[`cell`]** — `Cell` (one grapheme plus tag/image metadata) and rich text
//! - **[`position`]** — 1-based `Position` and the `Range` an operator acts on
//! - **[`buffer`]** — lines of cells, cursor slots, marks, tags, undo and search
//! - **[`history`]** — checkpoint snapshots behind undo/redo
//! - **[`word`]**, **[`motion`]**, **[`text_object`]** — where motions land
//! - **[`pattern`]** — the search pattern language
//! - **[`register`]** — named, numbered and unnamed registers
//! - **[`cursor`]**, **[`cursor_set`]** — cursors, selections and multi-cursor groups
//! - **[`keymap`]** — per-mode key maps and the incremental parser
//! - **[`ex`]**, **[`options`]** — the `:` command line and `:set`
//! - **[`viewport`]** — the scrolled, wrapped window onto the buffer
//! - **[`host`]** — clipboard and embedder seams
//! - **[`session`]** — the mode dispatcher that ties it all together
//!
//! ```
//! use n_modal::Session;
//!
//! let mut session = Session::new("hello world");
//! session.type_keys("dw");
//! assert_eq!(session.text(), "world");
//! ```

pub mod buffer;
pub mod cell;
pub mod command;
pub mod cursor;
pub mod cursor_set;
pub mod error;
pub mod ex;
pub mod history;
pub mod host;
pub mod keymap;
pub mod mode;
pub mod motion;
pub mod options;
pub mod pattern;
pub mod position;
pub mod register;
pub mod session;
pub mod text_object;
pub mod viewport;
pub mod word;

pub use buffer::{Buffer, Direction};
pub use cell::{Cell, Image, RichNode};
pub use error::{EditError, EditResult};
pub use host::{Clipboard, ClipboardRead, ExRequest, ExResponse, Host, MemoryClipboard, NoHost, WriteRequest};
pub use keymap::{format_keys, parse_keys};
pub use mode::{CursorShape, EntryKind, Mode, VisualKind};
pub use position::{Position, Range};
pub use session::{CellAttrs, Session};
