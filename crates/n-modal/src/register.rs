//! Registers — storage for yanked and deleted text.
//!
//! Every yank and delete copies cells into a register; paste reads them
//! back. A register remembers whether its text was captured linewise,
//! because paste behaves differently for each:
//!
//! - **Char-wise**: `p` inserts after the cursor, `P` before it.
//! - **Line-wise**: `p` opens the lines below the cursor line, `P` above.
//!
//! ## Register names
//!
//! | Name        | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | `"`         | unnamed: every write lands here too                   |
//! | `a`–`z`     | named; `A`–`Z` append to the lowercase register       |
//! | `0`         | the most recent unnamed yank                          |
//! | `1`–`9`     | unnamed deletes that span lines, newest in `1`        |
//! | `+` `*`     | the external clipboard (handled by the session)       |
//!
//! Macro recording stores keys in a named register as a single line of
//! key cells, so `"ap` shows a recorded macro and `@a` replays yanked text.

use crate::cell::Line;

/// How the register content was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Char,
    Line,
}

/// One register slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    text: Vec<Line>,
    kind: RegisterKind,
}

impl Register {
    /// An empty char-wise register.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            text: Vec::new(),
            kind: RegisterKind::Char,
        }
    }

    #[must_use]
    pub const fn with_text(text: Vec<Line>, kind: RegisterKind) -> Self {
        Self { text, kind }
    }

    /// Replace the content.
    pub fn yank(&mut self, text: Vec<Line>, kind: RegisterKind) {
        self.text = text;
        self.kind = kind;
    }

    /// Append to the content.
    ///
    /// If either side is line-wise the result is line-wise and the new text
    /// starts on its own line. Otherwise the first appended line continues
    /// the last stored one.
    pub fn append(&mut self, text: Vec<Line>, kind: RegisterKind) {
        if self.text.is_empty() {
            self.yank(text, kind);
            return;
        }
        if kind == RegisterKind::Line || self.kind == RegisterKind::Line {
            self.text.extend(text);
            self.kind = RegisterKind::Line;
            return;
        }
        let mut incoming = text.into_iter();
        if let (Some(last), Some(first)) = (self.text.last_mut(), incoming.next()) {
            last.extend(first);
        }
        self.text.extend(incoming);
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &[Line] {
        &self.text
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn is_linewise(&self) -> bool {
        self.kind == RegisterKind::Line
    }

    /// True if there is nothing to paste.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.iter().all(Vec::is_empty) && !self.is_linewise()
    }
}

impl Default for Register {
    fn default() -> Self {
        Self::new()
    }
}

/// Why text is being written to a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Yank,
    Delete,
}

// ── Register file ────────────────────────────────────────────────────────

/// Unnamed, named and numbered registers.
pub struct RegisterFile {
    unnamed: Register,
    named: [Register; 26],
    numbered: [Register; 10],
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> Self {
        Self {
            unnamed: Register::new(),
            named: std::array::from_fn(|_| Register::new()),
            numbered: std::array::from_fn(|_| Register::new()),
        }
    }

    /// True for names [`store`](Self::store) and [`get`](Self::get) accept.
    #[must_use]
    pub const fn is_valid_name(name: char) -> bool {
        matches!(name, '"' | 'a'..='z' | 'A'..='Z' | '0'..='9')
    }

    /// Store text from a yank or delete.
    ///
    /// - `None` or `"` → unnamed, plus `0` for yanks or the `1`–`9` shift
    ///   for deletes that are linewise or span lines
    /// - `a`–`z` → the named register (appending when `append`), and the
    ///   unnamed register receives the full result
    /// - `0`–`9` → that numbered register, copied to unnamed
    pub fn store(
        &mut self,
        name: Option<char>,
        append: bool,
        text: Vec<Line>,
        kind: RegisterKind,
        origin: Origin,
    ) {
        match name.map(|c| c.to_ascii_lowercase()) {
            Some(ch @ 'a'..='z') => {
                let slot = &mut self.named[letter_index(ch)];
                if append {
                    slot.append(text, kind);
                } else {
                    slot.yank(text, kind);
                }
                self.unnamed = slot.clone();
            }
            Some(ch @ '0'..='9') => {
                let slot = &mut self.numbered[digit_index(ch)];
                slot.yank(text, kind);
                self.unnamed = slot.clone();
            }
            _ => {
                let register = Register::with_text(text, kind);
                match origin {
                    Origin::Yank => self.numbered[0] = register.clone(),
                    Origin::Delete if register.is_linewise() || register.text.len() > 1 => {
                        self.numbered[1..].rotate_right(1);
                        self.numbered[1] = register.clone();
                    }
                    Origin::Delete => {}
                }
                self.unnamed = register;
            }
        }
    }

    /// Write a register directly, leaving unnamed and the numbered
    /// registers alone (macro recording).
    pub fn set(&mut self, name: char, append: bool, register: Register) {
        let slot = match name.to_ascii_lowercase() {
            ch @ 'a'..='z' => &mut self.named[letter_index(ch)],
            ch @ '0'..='9' => &mut self.numbered[digit_index(ch)],
            _ => &mut self.unnamed,
        };
        if append {
            slot.append(register.text, register.kind);
        } else {
            *slot = register;
        }
    }

    /// The register to read from. Uppercase names read their lowercase
    /// register; `None`, `"` and unknown names read unnamed.
    #[must_use]
    pub fn get(&self, name: Option<char>) -> &Register {
        match name.map(|c| c.to_ascii_lowercase()) {
            Some(ch @ 'a'..='z') => &self.named[letter_index(ch)],
            Some(ch @ '0'..='9') => &self.numbered[digit_index(ch)],
            _ => &self.unnamed,
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

const fn letter_index(ch: char) -> usize {
    (ch as u8 - b'a') as usize
}

const fn digit_index(ch: char) -> usize {
    (ch as u8 - b'0') as usize
}

// ── Tests ──────────────────────────────────────────────────────────────
