//! Session — the mode dispatcher that owns an editing session.
//!
//! A [`Session`] ties the pieces together: one key at a time goes through
//! the [`Parser`] for the current mode, and every completed [`Command`] is
//! routed to cursor, buffer and viewport calls.
//!
//! ```text
//!  handle_key("d")
//!      │
//!      ├─ macro recording / last-change recording
//!      ▼
//!  Parser::feed ──Pending──▶ wait for more keys
//!      │ Done(Command)
//!      ▼
//!  execute ──▶ run_normal / run_typing / run_visual / run_entry
//!      │
//!      ▼
//!  Err(EditError) ──▶ status message      Ok ──▶ viewport follows cursor
//! ```
//!
//! Everything a command needs to remember between keys (last search, last
//! substitution, the last change for `.`, macro recording) lives in an
//! explicit [`SessionState`], not in the cursors or the buffer.

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::buffer::{Buffer, Direction};
use crate::cell::{Cell, RichNode, cells_from_str, line_to_string, lines_from_str, lines_to_string};
use crate::command::{Command, Operation, Scroll};
use crate::cursor::Cursor;
use crate::cursor_set::CursorSet;
use crate::error::{EditError, EditResult};
use crate::ex::{ExCommand, Substitution, SubFlags, parse_ex, substitute};
use crate::host::{Clipboard, ClipboardRead, ExRequest, Host, MemoryClipboard, NoHost, WriteRequest};
use crate::keymap::{Feed, Parser, format_keys, parse_keys};
use crate::mode::{CursorShape, EntryKind, Mode, VisualKind};
use crate::motion::{Motion, ObjectKind, Operand};
use crate::options::Options;
use crate::pattern::Pattern;
use crate::position::{Position, Range, RangeKind};
use crate::register::{Origin, Register, RegisterFile, RegisterKind};
use crate::text_object::object_range;
use crate::viewport::{LayoutCell, Viewport};

/// Deepest `@` nesting before replay gives up.
pub const MAX_MACRO_DEPTH: usize = 100;

/// Lines `PageUp` / `PageDown` keep from the previous page.
const PAGE_OVERLAP: usize = 5;

/// `:s` reports its counts once it changes more than this many matches.
const REPORT_THRESHOLD: usize = 2;

// ---------------------------------------------------------------------------
// Cell attributes
// ---------------------------------------------------------------------------

bitflags! {
    /// How a renderer should paint one buffer cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellAttrs: u8 {
        /// A cursor stands here.
        const CURSOR      = 0b0000_0001;
        /// Inside a visual selection.
        const SELECTED    = 0b0000_0010;
        /// Inside another occurrence of the selected text.
        const HIGHLIGHTED = 0b0000_0100;
        /// The cell links to a tag.
        const LINK        = 0b0000_1000;
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// A macro being recorded with `q`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub register: char,
    /// `qA`: append to the register instead of replacing it.
    pub append: bool,
    pub keys: Vec<String>,
}

/// A paste waiting for the external clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPaste {
    pub before: bool,
    pub count: usize,
}

/// What the dispatcher remembers between commands.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub last_pattern: Option<Pattern>,
    pub last_direction: Option<Direction>,
    pub last_substitution: Option<Substitution>,
    /// Keys of the last change, replayed by `.`.
    pub last_change: Vec<String>,
    /// Keys of a change still being typed (insert or replace mode).
    pub change_in_progress: Option<Vec<String>>,
    pub recording: Option<Recording>,
    pub last_macro: Option<char>,
    /// Current `@` nesting.
    pub macro_depth: usize,
    /// Set when the nesting guard trips; unwinds every replay loop.
    pub macro_aborted: bool,
    /// True while `.` is replaying.
    pub repeating: bool,
    pub pending_paste: Option<PendingPaste>,
    /// The lines a visual `:` was typed over.
    pub entry_range: Option<(usize, usize)>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One editing session: a buffer, its cursors, and the dispatcher state.
pub struct Session<C = MemoryClipboard, H = NoHost> {
    buffer: Buffer,
    cursors: CursorSet,
    mode: Mode,
    parser: Parser,
    viewport: Viewport,
    options: Options,
    registers: RegisterFile,
    state: SessionState,
    message: Option<String>,
    clipboard: C,
    host: H,
}

impl Session {
    /// A session over plain text, with an in-memory clipboard and no host.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::with_host(Buffer::from_text(text), MemoryClipboard::new(), NoHost)
    }

    /// A session over a rich-text tree (tags, links, images).
    #[must_use]
    pub fn from_rich_text(nodes: &[RichNode]) -> Self {
        Self::with_host(Buffer::from_rich_text(nodes), MemoryClipboard::new(), NoHost)
    }
}

impl<C: Clipboard, H: Host> Session<C, H> {
    /// A session over `buffer` talking to `clipboard` and `host`.
    pub fn with_host(mut buffer: Buffer, clipboard: C, host: H) -> Self {
        let cursors = CursorSet::new(&mut buffer, Position::ORIGIN);
        let mut session = Self {
            buffer,
            cursors,
            mode: Mode::Normal,
            parser: Parser::new(Mode::Normal),
            viewport: Viewport::default(),
            options: Options::new(),
            registers: RegisterFile::new(),
            state: SessionState::default(),
            message: None,
            clipboard,
            host,
        };
        session.apply_options();
        session.viewport.lay_out(&session.buffer);
        session
    }

    // -- Key injection ------------------------------------------------------

    /// Feed one logical key (`"a"`, `"ArrowLeft"`, `"CTRL-r"`, `"Escape"`).
    ///
    /// Never fails: whatever goes wrong ends up in the status message.
    pub fn handle_key(&mut self, key: &str) {
        let top_level = self.state.macro_depth == 0 && !self.state.repeating;

        if top_level && key == "q" && self.mode == Mode::Normal && self.parser.is_idle() {
            if let Some(recording) = self.state.recording.take() {
                self.finish_recording(recording);
                return;
            }
        }
        if top_level {
            if let Some(recording) = self.state.recording.as_mut() {
                recording.keys.push(key.to_string());
            }
        }
        if !self.state.repeating && self.mode.cursor_past_end() {
            if let Some(change) = self.state.change_in_progress.as_mut() {
                change.push(key.to_string());
            }
        }

        if let Feed::Done(command) = self.parser.feed(key) {
            self.execute(command);
        }
    }

    /// Feed a key script in `<Esc>` / `<CR>` / `<C-r>` notation.
    pub fn type_keys(&mut self, script: &str) {
        for key in parse_keys(script) {
            self.handle_key(&key);
        }
    }

    /// Resume a paste that found the clipboard [`ClipboardRead::Pending`].
    pub fn deliver_clipboard(&mut self, text: &str) {
        let Some(paste) = self.state.pending_paste.take() else {
            debug!("clipboard text arrived with no paste waiting");
            return;
        };
        debug!(len = text.len(), "clipboard paste resumed");
        let register = clipboard_register(text);
        self.buffer.checkpoint();
        let _ = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
            cursor.paste(buf, &register, paste.before, paste.count);
            Ok(())
        });
        self.follow_cursor();
    }

    // -- Queries ------------------------------------------------------------

    #[must_use]
    pub fn text(&self) -> String {
        self.buffer.contents()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.buffer.lines().iter().map(|l| line_to_string(l)).collect()
    }

    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// The primary cursor.
    #[must_use]
    pub fn cursor_position(&self) -> Position {
        self.cursors.first().position(&self.buffer)
    }

    /// Every cursor, in creation order.
    #[must_use]
    pub fn cursor_positions(&self) -> Vec<Position> {
        self.cursors.positions(&self.buffer)
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Shape a renderer should draw the cursor with.
    #[must_use]
    pub const fn cursor_shape(&self) -> CursorShape {
        self.mode.cursor_shape()
    }

    /// First and last buffer lines in the window.
    #[must_use]
    pub fn visible_lines(&self) -> (usize, usize) {
        self.viewport.visible_lines(&self.buffer)
    }

    #[must_use]
    pub fn layout(&self) -> &[Vec<LayoutCell>] {
        self.viewport.layout()
    }

    /// How to paint the cell at `(line, column)`.
    #[must_use]
    pub fn cell_attrs(&self, line: usize, column: usize) -> CellAttrs {
        let pos = Position::new(line, column);
        let mut attrs = CellAttrs::empty();
        for cursor in self.cursors.as_slice() {
            if cursor.position(&self.buffer) == pos {
                attrs |= CellAttrs::CURSOR;
            }
            if cursor.is_selected(&self.buffer, pos) {
                attrs |= CellAttrs::SELECTED;
            }
            if cursor.is_highlighted(pos) {
                attrs |= CellAttrs::HIGHLIGHTED;
            }
        }
        if self.buffer.cell(pos).and_then(Cell::tag_dest).is_some() {
            attrs |= CellAttrs::LINK;
        }
        attrs
    }

    /// The one-shot status message, cleared by reading it.
    pub const fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Keys typed so far for an unfinished command.
    #[must_use]
    pub fn pending_keys(&self) -> String {
        self.parser.pending_keys()
    }

    /// The prompt being typed, or the mode banner, recording marker,
    /// pending keys and `line,column[-display column]`.
    #[must_use]
    pub fn status_line(&self) -> String {
        if let Mode::TextEntry(kind) = self.mode {
            return format!("{}{}", kind.prompt(), self.parser.entry_text());
        }
        let at = self.cursor_position();
        let display = self.viewport.display_column(&self.buffer, at);
        let position = if display == at.column {
            format!("{},{}", at.line, at.column)
        } else {
            format!("{},{}-{display}", at.line, at.column)
        };
        let mut parts = Vec::new();
        let banner = self.mode.banner();
        if !banner.is_empty() {
            parts.push(banner);
        }
        if let Some(recording) = &self.state.recording {
            parts.push(format!("recording @{}", recording.register));
        }
        let pending = self.pending_keys();
        if !pending.is_empty() {
            parts.push(pending);
        }
        parts.push(position);
        parts.join("  ")
    }

    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub const fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub const fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// Resize the window.
    pub fn set_size(&mut self, rows: usize, cols: usize) {
        self.viewport.set_size(rows, cols);
        self.follow_cursor();
    }

    // -- Dispatch -----------------------------------------------------------

    fn execute(&mut self, command: Command) {
        let Some(operation) = command.operation else {
            return;
        };
        trace!(?operation, count = command.operand.count, mode = %self.mode, "dispatch");
        let started_in = self.mode;
        let result = match self.mode {
            Mode::Normal => self.run_normal(&command, operation),
            Mode::Insert | Mode::Replace => self.run_typing(&command, operation),
            Mode::Visual(kind) => self.run_visual(&command, operation, kind),
            Mode::TextEntry(_) => self.run_entry(&command, operation),
        };
        match result {
            Ok(()) => {
                if started_in == Mode::Normal && operation.is_change() && !self.state.repeating {
                    self.record_change(command.keys);
                }
            }
            Err(err) if err.is_silent() => trace!(?operation, "no target"),
            Err(err) => self.message = Some(err.to_string()),
        }
        if !matches!(operation, Operation::Scroll(_)) {
            self.follow_cursor();
        }
    }

    fn record_change(&mut self, keys: Vec<String>) {
        if self.mode.cursor_past_end() {
            self.state.change_in_progress = Some(keys);
        } else {
            self.state.last_change = keys;
        }
    }

    fn follow_cursor(&mut self) {
        let at = self.cursor_position();
        self.viewport
            .ensure_visible(&self.buffer, at, false, self.options.scrolloff);
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.parser.set_mode(mode);
        self.cursors.set_past_end(&mut self.buffer, mode.cursor_past_end());
    }

    fn apply_options(&mut self) {
        self.viewport.set_tabstop(self.options.tabstop);
        self.buffer.set_shift_width(self.options.shiftwidth);
        self.buffer.set_undo_capacity(self.options.undolevels);
    }

    // -- Normal mode --------------------------------------------------------

    fn run_normal(&mut self, command: &Command, operation: Operation) -> EditResult<()> {
        use Operation as Op;
        let count = command.count_or_one();
        match operation {
            Op::Move => {
                let operand = self.resolve(&command.operand);
                self.move_cursors(&operand)
            }
            Op::Delete | Op::Change => self.delete_operand(command, operation),
            Op::Yank => {
                let operand = self.resolve(&command.operand);
                let yanked = self.cursors.each(&mut self.buffer, |cursor, buf| {
                    let range = cursor.pending_range(buf, operation, &operand)?;
                    Ok(cursor.yank_range(buf, &range))
                })?;
                self.store_first(command, yanked, Origin::Yank);
                Ok(())
            }
            Op::Indent | Op::Unindent => {
                let operand = self.resolve(&command.operand);
                self.buffer.checkpoint();
                self.cursors
                    .each_reverse(&mut self.buffer, |cursor, buf| {
                        let range = cursor.pending_range(buf, operation, &operand)?;
                        cursor.indent_range(buf, &range, operation == Op::Unindent);
                        Ok(())
                    })
                    .map(drop)
            }
            Op::ToggleCase => {
                let operand = self.resolve(&command.operand);
                self.buffer.checkpoint();
                self.cursors
                    .each_reverse(&mut self.buffer, |cursor, buf| {
                        let range = cursor.pending_range(buf, operation, &operand)?;
                        cursor.toggle_case(buf, &range);
                        let end = range.later();
                        cursor.move_to(buf, Position::new(end.line, range.last_column() + 1));
                        Ok(())
                    })
                    .map(drop)
            }
            Op::Replace => {
                let cell = command
                    .operand
                    .character
                    .as_deref()
                    .map(Cell::new)
                    .ok_or(EditError::NoTarget)?;
                let operand = command.operand.clone();
                self.buffer.checkpoint();
                self.cursors
                    .each_reverse(&mut self.buffer, |cursor, buf| {
                        let range = cursor.pending_range(buf, operation, &operand)?;
                        cursor.replace_range(buf, &range, &cell);
                        cursor.move_to(buf, Position::new(range.later().line, range.last_column()));
                        Ok(())
                    })
                    .map(drop)
            }
            Op::Paste | Op::PasteBefore => self.paste(command, operation == Op::PasteBefore, count),
            Op::JoinLines => {
                self.buffer.checkpoint();
                self.cursors
                    .each_reverse(&mut self.buffer, |cursor, buf| {
                        if cursor.join_lines(buf, count) {
                            Ok(())
                        } else {
                            Err(EditError::NoTarget)
                        }
                    })
                    .map(drop)
            }
            Op::Insert => {
                self.buffer.checkpoint();
                self.set_mode(Mode::Insert);
                Ok(())
            }
            Op::InsertStart | Op::Append | Op::AppendEnd => {
                self.buffer.checkpoint();
                self.set_mode(Mode::Insert);
                self.cursors
                    .each(&mut self.buffer, |cursor, buf| {
                        let at = cursor.position(buf);
                        let column = match operation {
                            Op::InsertStart => buf.first_non_blank(at.line),
                            Op::Append => at.column + 1,
                            _ => buf.line_len(at.line) + 1,
                        };
                        Ok(cursor.move_to(buf, Position::new(at.line, column)))
                    })
                    .map(drop)
            }
            Op::OpenLine | Op::OpenLineAbove => {
                self.buffer.checkpoint();
                let above = operation == Op::OpenLineAbove;
                self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
                    cursor.open_line(buf, above);
                    Ok(())
                })?;
                self.set_mode(Mode::Insert);
                Ok(())
            }
            Op::ReplaceMode => {
                self.buffer.checkpoint();
                self.set_mode(Mode::Replace);
                Ok(())
            }
            Op::Visual(kind) => {
                for cursor in self.cursors.as_mut_slice() {
                    cursor.start_visual(&self.buffer, kind);
                }
                self.set_mode(Mode::Visual(kind));
                Ok(())
            }
            Op::TextEntry(kind) => {
                self.set_mode(Mode::TextEntry(kind));
                Ok(())
            }
            Op::SearchWord(direction) => self.search_word(direction, count),
            Op::SearchAgain => self.search_again(false, count),
            Op::SearchReverse => self.search_again(true, count),
            Op::RepeatSubstitution => {
                let sub = self
                    .state
                    .last_substitution
                    .clone()
                    .ok_or(EditError::NoPreviousSubstitution)?;
                let line = self.cursor_position().line;
                self.substitute(line, line, &sub)
            }
            Op::Undo | Op::Redo => {
                let mut changed = false;
                for _ in 0..count {
                    let step = if operation == Op::Undo {
                        self.buffer.undo()
                    } else {
                        self.buffer.redo()
                    };
                    if !step {
                        break;
                    }
                    changed = true;
                }
                if changed { Ok(()) } else { Err(EditError::NoTarget) }
            }
            Op::UndoLine => {
                self.buffer.checkpoint();
                if self.cursors.first_mut().undo_line(&mut self.buffer) {
                    Ok(())
                } else {
                    Err(EditError::NoTarget)
                }
            }
            Op::Repeat => self.repeat_change(count),
            Op::RecordMacro => self.start_recording(command.operand.character.as_deref()),
            Op::RunMacro => self.run_macro(command.operand.character.as_deref(), count),
            Op::Scroll(how) => {
                self.scroll(how, command.operand.count);
                Ok(())
            }
            Op::Mark => self.set_mark(command.operand.character.as_deref()),
            Op::Extend(how) => self
                .cursors
                .extend(&mut self.buffer, how, command.operand.count),
            Op::NormalMode => {
                self.cursors.collapse(&mut self.buffer);
                Ok(())
            }
            Op::Info => {
                self.message = Some(self.info());
                Ok(())
            }
            Op::Tab(tab) => {
                self.host.tab_command(tab);
                Ok(())
            }
            Op::JumpTag => self.cursors.first_mut().jump_tag(&mut self.buffer).map(drop),
            Op::Select
            | Op::SwapEnds
            | Op::SwapColumns
            | Op::BlockInsert
            | Op::BlockAppend
            | Op::InsertChar
            | Op::BreakLine
            | Op::Backspace
            | Op::Submit(_) => {
                debug!(?operation, "operation not handled in normal mode");
                Ok(())
            }
        }
    }

    /// `d{motion}` / `c{motion}` and their shorthands.
    fn delete_operand(&mut self, command: &Command, operation: Operation) -> EditResult<()> {
        let operand = self.resolve(&command.operand);
        self.buffer.checkpoint();
        let deleted = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
            let range = cursor.pending_range(buf, operation, &operand)?;
            Ok(if operation == Operation::Change {
                delete_for_change(cursor, buf, &range)
            } else {
                cursor.delete_range(buf, &range)
            })
        })?;
        self.store_first(command, deleted, Origin::Delete);
        if operation == Operation::Change {
            self.set_mode(Mode::Insert);
        }
        Ok(())
    }

    fn paste(&mut self, command: &Command, before: bool, count: usize) -> EditResult<()> {
        let Some(register) = self.fetch_register(command.register) else {
            self.state.pending_paste = Some(PendingPaste { before, count });
            return Ok(());
        };
        if register.is_empty() {
            return Err(EditError::NoTarget);
        }
        self.buffer.checkpoint();
        self.cursors
            .each_reverse(&mut self.buffer, |cursor, buf| {
                cursor.paste(buf, &register, before, count);
                Ok(())
            })
            .map(drop)
    }

    // -- Insert & replace mode ----------------------------------------------

    fn run_typing(&mut self, command: &Command, operation: Operation) -> EditResult<()> {
        use Operation as Op;
        match operation {
            Op::NormalMode => {
                self.cursors.collapse(&mut self.buffer);
                let cursor = self.cursors.first_mut();
                let at = cursor.position(&self.buffer);
                cursor.move_to(&mut self.buffer, Position::new(at.line, at.column.saturating_sub(1).max(1)));
                self.set_mode(Mode::Normal);
                if let Some(keys) = self.state.change_in_progress.take() {
                    self.state.last_change = keys;
                }
                Ok(())
            }
            Op::InsertChar | Op::Replace => {
                let symbol = command.operand.character.as_deref().ok_or(EditError::NoTarget)?;
                let cell = Cell::new(symbol);
                let overwrite = self.mode == Mode::Replace;
                self.cursors
                    .each_reverse(&mut self.buffer, |cursor, buf| {
                        if overwrite {
                            cursor.overwrite(buf, cell.clone());
                        } else {
                            cursor.insert(buf, cell.clone());
                        }
                        Ok(())
                    })
                    .map(drop)
            }
            Op::BreakLine => self
                .cursors
                .each_reverse(&mut self.buffer, |cursor, buf| {
                    cursor.break_line(buf);
                    Ok(())
                })
                .map(drop),
            Op::Backspace => self.each_edit(Cursor::delete_before),
            Op::Delete => self.each_edit(Cursor::delete_under),
            Op::Move => {
                let operand = command.operand.clone();
                self.move_cursors(&operand)
            }
            _ => {
                debug!(?operation, mode = %self.mode, "operation not handled while typing");
                Ok(())
            }
        }
    }

    /// Run a per-cursor edit bottom-up; fails only if no cursor could edit.
    fn each_edit(&mut self, edit: fn(&mut Cursor, &mut Buffer) -> bool) -> EditResult<()> {
        self.cursors
            .each_reverse(&mut self.buffer, |cursor, buf| {
                if edit(cursor, buf) { Ok(()) } else { Err(EditError::NoTarget) }
            })
            .map(drop)
    }

    // -- Visual mode --------------------------------------------------------

    fn run_visual(&mut self, command: &Command, operation: Operation, kind: VisualKind) -> EditResult<()> {
        use Operation as Op;
        let count = command.count_or_one();
        match operation {
            Op::Select => {
                let operand = self.resolve(&command.operand);
                self.cursors
                    .each(&mut self.buffer, |cursor, buf| cursor.set_visual_operand(buf, &operand))
                    .map(drop)
            }
            Op::Visual(next) if next == kind => {
                self.leave_visual();
                Ok(())
            }
            Op::Visual(next) => {
                for cursor in self.cursors.as_mut_slice() {
                    cursor.start_visual(&self.buffer, next);
                }
                self.set_mode(Mode::Visual(next));
                Ok(())
            }
            Op::NormalMode => {
                self.leave_visual();
                self.cursors.collapse(&mut self.buffer);
                Ok(())
            }
            Op::Delete => {
                self.buffer.checkpoint();
                let deleted = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
                    let range = take_selection(cursor, buf)?;
                    Ok(cursor.delete_range(buf, &range))
                });
                self.set_mode(Mode::Normal);
                self.store_first(command, deleted?, Origin::Delete);
                Ok(())
            }
            Op::Change => self.visual_change(command, kind),
            Op::Yank => {
                let yanked = self.cursors.each(&mut self.buffer, |cursor, buf| {
                    let range = cursor.visual_range(buf).ok_or(EditError::NoTarget)?;
                    cursor.end_visual(buf);
                    Ok(cursor.yank_range(buf, &range))
                });
                self.set_mode(Mode::Normal);
                self.store_first(command, yanked?, Origin::Yank);
                Ok(())
            }
            Op::Indent | Op::Unindent => {
                self.buffer.checkpoint();
                let result = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
                    let range = take_selection(cursor, buf)?;
                    for _ in 0..count {
                        cursor.indent_range(buf, &range, operation == Op::Unindent);
                    }
                    Ok(())
                });
                self.set_mode(Mode::Normal);
                result.map(drop)
            }
            Op::ToggleCase | Op::Replace => {
                let cell = command.operand.character.as_deref().map(Cell::new);
                self.buffer.checkpoint();
                let result = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
                    let range = cursor.visual_range(buf).ok_or(EditError::NoTarget)?;
                    match &cell {
                        Some(cell) => cursor.replace_range(buf, &range, cell),
                        None => cursor.toggle_case(buf, &range),
                    }
                    cursor.end_visual(buf);
                    Ok(())
                });
                self.set_mode(Mode::Normal);
                result.map(drop)
            }
            Op::JoinLines => {
                self.buffer.checkpoint();
                let result = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
                    let range = take_selection(cursor, buf)?;
                    let (first, last) = (range.earlier().line, range.later().line);
                    cursor.move_to(buf, Position::new(first, 1));
                    if cursor.join_lines(buf, last - first + 1) {
                        Ok(())
                    } else {
                        Err(EditError::NoTarget)
                    }
                });
                self.set_mode(Mode::Normal);
                result.map(drop)
            }
            Op::Paste | Op::PasteBefore => self.visual_paste(command, count),
            Op::SwapEnds | Op::SwapColumns => {
                let columns_only = operation == Op::SwapColumns && kind == VisualKind::Block;
                for cursor in self.cursors.as_mut_slice() {
                    cursor.visual_swap(&mut self.buffer, columns_only);
                }
                Ok(())
            }
            Op::BlockInsert | Op::BlockAppend => self.visual_insert(operation == Op::BlockAppend, kind),
            Op::Extend(how) => self.cursors.extend(&mut self.buffer, how, command.operand.count),
            Op::TextEntry(entry) => {
                let range = self.cursors.first().visual_range(&self.buffer);
                self.state.entry_range = range.map(|r| (r.earlier().line, r.later().line));
                self.leave_visual();
                self.set_mode(Mode::TextEntry(entry));
                Ok(())
            }
            Op::JumpTag => {
                self.leave_visual();
                self.cursors.first_mut().jump_tag(&mut self.buffer).map(drop)
            }
            _ => {
                debug!(?operation, "operation not handled in visual mode");
                Ok(())
            }
        }
    }

    /// Drop every selection where the cursors stand and return to normal.
    fn leave_visual(&mut self) {
        for cursor in self.cursors.as_mut_slice() {
            cursor.clear_visual();
        }
        self.set_mode(Mode::Normal);
    }

    fn visual_change(&mut self, command: &Command, kind: VisualKind) -> EditResult<()> {
        self.buffer.checkpoint();
        if kind == VisualKind::Block && !self.cursors.is_group() {
            let range = take_selection(self.cursors.first_mut(), &mut self.buffer)?;
            let register = self.cursors.first_mut().delete_range(&mut self.buffer, &range);
            self.store_first(command, vec![register], Origin::Delete);
            let left = range.earlier().column;
            let positions = block_positions(&range, |_| left);
            self.set_mode(Mode::Insert);
            self.cursors.reset(&mut self.buffer, &positions, true);
            return Ok(());
        }
        let deleted = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
            let range = take_selection(cursor, buf)?;
            Ok(delete_for_change(cursor, buf, &range))
        });
        self.set_mode(Mode::Insert);
        self.store_first(command, deleted?, Origin::Delete);
        Ok(())
    }

    /// Visual `p`: the selection is replaced by the register.
    fn visual_paste(&mut self, command: &Command, count: usize) -> EditResult<()> {
        let source = self.fetch_register(command.register);
        self.buffer.checkpoint();
        let mut placements = Vec::new();
        let deleted = self.cursors.each_reverse(&mut self.buffer, |cursor, buf| {
            let range = take_selection(cursor, buf)?;
            let register = cursor.delete_range(buf, &range);
            let earlier = range.earlier();
            let at_end = match range.kind() {
                RangeKind::Line => earlier.line > buf.line_count(),
                _ => earlier.column > buf.line_len(earlier.line),
            };
            placements.push((cursor.id(), !at_end));
            Ok(register)
        });
        self.set_mode(Mode::Normal);
        let deleted = deleted?;
        if let Some(first) = deleted.into_iter().next() {
            self.registers
                .store(None, false, first.text().to_vec(), first.kind(), Origin::Delete);
        }
        let Some(register) = source else {
            let before = placements.first().is_none_or(|&(_, before)| before);
            self.state.pending_paste = Some(PendingPaste { before, count });
            return Ok(());
        };
        self.cursors
            .each_reverse(&mut self.buffer, |cursor, buf| {
                let before = placements
                    .iter()
                    .find(|(id, _)| *id == cursor.id())
                    .is_none_or(|&(_, before)| before);
                cursor.paste(buf, &register, before, count);
                Ok(())
            })
            .map(drop)
    }

    /// Visual `I` / `A`: a block becomes one insert cursor per line.
    fn visual_insert(&mut self, append: bool, kind: VisualKind) -> EditResult<()> {
        let range = self
            .cursors
            .first()
            .visual_range(&self.buffer)
            .ok_or(EditError::NoTarget)?;
        self.buffer.checkpoint();
        let positions = match kind {
            VisualKind::Block => {
                let column = if append {
                    range.last_column() + 1
                } else {
                    range.earlier().column
                };
                block_positions(&range, |_| column)
            }
            VisualKind::Line if append => {
                let line = range.later().line;
                vec![Position::new(line, self.buffer.line_len(line) + 1)]
            }
            VisualKind::Line => {
                let line = range.earlier().line;
                vec![Position::new(line, self.buffer.first_non_blank(line))]
            }
            VisualKind::Char if append => {
                let end = range.later();
                vec![Position::new(end.line, end.column + 1)]
            }
            VisualKind::Char => vec![range.earlier()],
        };
        self.set_mode(Mode::Insert);
        self.cursors.reset(&mut self.buffer, &positions, true);
        Ok(())
    }

    // -- Prompts ------------------------------------------------------------

    fn run_entry(&mut self, command: &Command, operation: Operation) -> EditResult<()> {
        let entry_range = self.state.entry_range.take();
        self.set_mode(Mode::Normal);
        match operation {
            Operation::Submit(EntryKind::Ex) => self.run_ex(&command.operand.text, entry_range),
            Operation::Submit(EntryKind::Search) => self.search(&command.operand.text, Direction::Forward),
            Operation::Submit(EntryKind::SearchBack) => {
                self.search(&command.operand.text, Direction::Backward)
            }
            Operation::NormalMode => Ok(()),
            _ => {
                debug!(?operation, "operation not handled in a prompt");
                Ok(())
            }
        }
    }

    fn run_ex(&mut self, text: &str, selected: Option<(usize, usize)>) -> EditResult<()> {
        let ex = parse_ex(text);
        let line_count = self.buffer.line_count();
        let explicit = ex.range.map(|r| r.lines(line_count)).or(selected);
        let here = self.cursor_position().line;
        let (first, last) = explicit.unwrap_or((here, here));
        match ex.command {
            ExCommand::Empty => {
                if explicit.is_some() {
                    let cursor = self.cursors.first_mut();
                    cursor.set_previous_context(&self.buffer);
                    let column = self.buffer.first_non_blank(last);
                    cursor.move_to(&mut self.buffer, Position::new(last, column));
                }
                Ok(())
            }
            ExCommand::Search(pattern) => self.search(&pattern, Direction::Forward),
            ExCommand::Substitute(sub) => {
                self.state.last_substitution = Some(sub.clone());
                self.substitute(first, last, &sub)
            }
            ExCommand::RepeatSubstitution => {
                let sub = self
                    .state
                    .last_substitution
                    .clone()
                    .ok_or(EditError::NoPreviousSubstitution)?;
                self.substitute(first, last, &sub)
            }
            ExCommand::Set(args) => {
                let shown = self.options.set(&args);
                self.apply_options();
                if let Some(text) = shown? {
                    self.message = Some(text);
                }
                Ok(())
            }
            ExCommand::Write(args) => {
                let (first, last) = explicit.unwrap_or((1, line_count));
                let request = WriteRequest {
                    range: (first, last),
                    args,
                    text: lines_to_string(self.buffer.range(first, last + 1 - first)),
                };
                if let Some(message) = self.host.write(&request) {
                    self.message = Some(message);
                }
                Ok(())
            }
            ExCommand::Other(command) => {
                let request = ExRequest {
                    range: explicit,
                    command,
                };
                let response = self.host.ex_command(&request);
                if !response.handled {
                    return Err(EditError::UnknownExCommand(request.command));
                }
                if let Some(message) = response.message {
                    self.message = Some(message);
                }
                Ok(())
            }
        }
    }

    fn substitute(&mut self, first: usize, last: usize, sub: &Substitution) -> EditResult<()> {
        self.buffer.checkpoint();
        let report = substitute(&mut self.buffer, first, last, sub, self.options.maxsubstitutions);
        let line = report
            .last_line
            .ok_or_else(|| EditError::PatternNotFound(sub.pattern.source().to_string()))?;
        if sub.flags.contains(SubFlags::COUNT_ONLY) {
            self.message = Some(format!(
                "{} match{} on {} line{}",
                report.replacements,
                if report.replacements == 1 { "" } else { "es" },
                report.lines,
                plural(report.lines),
            ));
            return Ok(());
        }
        if report.replacements > REPORT_THRESHOLD {
            self.message = Some(format!(
                "{} substitution{} on {} line{}",
                report.replacements,
                plural(report.replacements),
                report.lines,
                plural(report.lines),
            ));
        }
        let column = self.buffer.first_non_blank(line);
        self.cursors.collapse(&mut self.buffer);
        self.cursors
            .first_mut()
            .move_to(&mut self.buffer, Position::new(line, column));
        Ok(())
    }

    // -- Search -------------------------------------------------------------

    /// `/text<CR>` and `?text<CR>`. An empty pattern reuses the last one.
    fn search(&mut self, source: &str, direction: Direction) -> EditResult<()> {
        let pattern = if source.is_empty() {
            self.state.last_pattern.clone().ok_or(EditError::NoPreviousPattern)?
        } else {
            Pattern::compile(source)
        };
        self.state.last_pattern = Some(pattern.clone());
        self.state.last_direction = Some(direction);
        self.search_from_cursors(pattern, direction, 1)
    }

    fn search_again(&mut self, reverse: bool, count: usize) -> EditResult<()> {
        let pattern = self.state.last_pattern.clone().ok_or(EditError::NoPreviousPattern)?;
        let direction = self.state.last_direction.unwrap_or(Direction::Forward);
        let direction = if reverse { direction.opposite() } else { direction };
        self.search_from_cursors(pattern, direction, count)
    }

    /// `*` / `#` — search for the keyword under the cursor as a whole word.
    fn search_word(&mut self, direction: Direction, count: usize) -> EditResult<()> {
        let at = self.cursor_position();
        if !self.buffer.cell(at).is_some_and(Cell::is_word_char) {
            return Err(EditError::NoWordUnderCursor);
        }
        let range = object_range(&self.buffer, at, ObjectKind::Word, true, 1)?;
        let word = range
            .text(self.buffer.lines())
            .first()
            .map(|cells| line_to_string(cells))
            .ok_or(EditError::NoWordUnderCursor)?;
        let pattern = Pattern::whole_word(&word);
        self.state.last_pattern = Some(pattern.clone());
        self.state.last_direction = Some(direction);
        self.search_from_cursors(pattern, direction, count)
    }

    fn search_from_cursors(&mut self, pattern: Pattern, direction: Direction, count: usize) -> EditResult<()> {
        let operand = Operand {
            count,
            ..Operand::search(pattern, direction, self.options.wrapscan)
        };
        self.move_cursors(&operand)
    }

    // -- Registers ----------------------------------------------------------

    /// The register to paste from, or `None` while the clipboard is pending.
    fn fetch_register(&mut self, name: Option<char>) -> Option<Register> {
        match name {
            Some('+' | '*') => match self.clipboard.read_text() {
                ClipboardRead::Ready(text) => Some(clipboard_register(&text)),
                ClipboardRead::Pending => {
                    debug!("clipboard read pending; paste parked");
                    None
                }
            },
            _ => Some(self.registers.get(name).clone()),
        }
    }

    /// Store the first register of a fan-out (document order) under the
    /// command's register name.
    fn store_first(&mut self, command: &Command, registers: Vec<Register>, origin: Origin) {
        let Some(register) = registers.into_iter().next() else {
            return;
        };
        match command.register {
            Some('+' | '*') => {
                let mut text = lines_to_string(register.text());
                if register.is_linewise() {
                    text.push('\n');
                }
                self.clipboard.write_text(&text);
            }
            name => self.registers.store(
                name,
                command.append_register,
                register.text().to_vec(),
                register.kind(),
                origin,
            ),
        }
    }

    // -- Repeat & macros ----------------------------------------------------

    fn repeat_change(&mut self, count: usize) -> EditResult<()> {
        if self.state.last_change.is_empty() || self.state.repeating {
            return Err(EditError::NoTarget);
        }
        let keys = self.state.last_change.clone();
        self.state.repeating = true;
        for _ in 0..count {
            for key in &keys {
                self.handle_key(key);
            }
        }
        self.state.repeating = false;
        Ok(())
    }

    fn start_recording(&mut self, name: Option<&str>) -> EditResult<()> {
        let register = name
            .and_then(|n| n.chars().next())
            .filter(|&c| c.is_ascii_alphanumeric())
            .ok_or(EditError::NoTarget)?;
        self.state.recording = Some(Recording {
            register: register.to_ascii_lowercase(),
            append: register.is_ascii_uppercase(),
            keys: Vec::new(),
        });
        self.message = Some(format!("Recording @{}", register.to_ascii_lowercase()));
        Ok(())
    }

    fn finish_recording(&mut self, recording: Recording) {
        let script = format_keys(&recording.keys);
        debug!(register = %recording.register, keys = recording.keys.len(), "macro recorded");
        self.registers.set(
            recording.register,
            recording.append,
            Register::with_text(vec![cells_from_str(&script)], RegisterKind::Char),
        );
    }

    fn run_macro(&mut self, name: Option<&str>, count: usize) -> EditResult<()> {
        let name = name.and_then(|n| n.chars().next()).ok_or(EditError::NoTarget)?;
        let register = if name == '@' {
            self.state.last_macro.ok_or(EditError::MacroNotDefined(name))?
        } else {
            name.to_ascii_lowercase()
        };
        if !RegisterFile::is_valid_name(register) {
            return Err(EditError::MacroNotDefined(register));
        }
        let keys = parse_keys(&lines_to_string(self.registers.get(Some(register)).text()));
        if keys.is_empty() {
            return Err(EditError::MacroNotDefined(register));
        }
        if self.state.macro_depth >= MAX_MACRO_DEPTH {
            warn!(depth = self.state.macro_depth, register = %register, "macro nesting guard tripped");
            self.state.macro_aborted = true;
            return Err(EditError::MacroTooDeep);
        }
        self.state.last_macro = Some(register);
        self.state.macro_depth += 1;
        'replay: for _ in 0..count {
            for key in &keys {
                if self.state.macro_aborted {
                    break 'replay;
                }
                self.handle_key(key);
            }
        }
        self.state.macro_depth -= 1;
        if self.state.macro_depth == 0 {
            self.state.macro_aborted = false;
        }
        Ok(())
    }

    // -- Movement helpers ---------------------------------------------------

    /// Turn screen motions into line numbers and apply `wrapscan`.
    fn resolve(&mut self, operand: &Operand) -> Operand {
        let mut operand = operand.clone();
        if let Some(screen) = operand.screen.take() {
            self.viewport.lay_out(&self.buffer);
            operand.count = self.viewport.screen_line(screen, operand.count);
            operand.motion = Some(Motion::GotoLine);
        }
        operand.wrap = self.options.wrapscan;
        operand
    }

    fn move_cursors(&mut self, operand: &Operand) -> EditResult<()> {
        self.cursors
            .each(&mut self.buffer, |cursor, buf| cursor.move_operand(buf, operand))
            .map(drop)
    }

    fn set_mark(&mut self, name: Option<&str>) -> EditResult<()> {
        let name = name.and_then(|n| n.chars().next()).ok_or(EditError::NoTarget)?;
        match name {
            '`' | '\'' => {
                self.cursors.first_mut().set_previous_context(&self.buffer);
                Ok(())
            }
            'a'..='z' => {
                let at = self.cursor_position();
                self.buffer.set_mark(name, at);
                Ok(())
            }
            _ => Err(EditError::NoTarget),
        }
    }

    fn info(&self) -> String {
        let lines = self.buffer.line_count();
        let percent = self.cursor_position().line * 100 / lines.max(1);
        format!("\"[No Name]\" {lines} line{} --{percent}%--", plural(lines))
    }

    // -- Scrolling ----------------------------------------------------------

    fn scroll(&mut self, how: Scroll, count: usize) {
        let rows = self.viewport.rows();
        match how {
            Scroll::LineDown | Scroll::LineUp => {
                for _ in 0..count.max(1) {
                    let moved = if how == Scroll::LineDown {
                        self.viewport.down(&self.buffer)
                    } else {
                        self.viewport.up()
                    };
                    if !moved {
                        break;
                    }
                }
                self.viewport.lay_out(&self.buffer);
                self.keep_cursors_in_view();
            }
            Scroll::HalfPageDown | Scroll::HalfPageUp => {
                let amount = if count > 0 { count } else { (rows / 2).max(1) };
                let down = how == Scroll::HalfPageDown;
                for _ in 0..amount {
                    if down {
                        self.viewport.down(&self.buffer);
                    } else {
                        self.viewport.up();
                    }
                }
                self.shift_cursors(amount, down);
                self.viewport.lay_out(&self.buffer);
                self.keep_cursors_in_view();
            }
            Scroll::PageDown | Scroll::PageUp => {
                let amount = rows.saturating_sub(PAGE_OVERLAP).max(1) * count.max(1);
                self.shift_cursors(amount, how == Scroll::PageDown);
                let at = self.cursor_position();
                self.viewport
                    .ensure_visible(&self.buffer, at, true, self.options.scrolloff);
            }
            Scroll::Top { first_non_blank }
            | Scroll::Middle { first_non_blank }
            | Scroll::Bottom { first_non_blank } => {
                let row = match how {
                    Scroll::Top { .. } => 0,
                    Scroll::Middle { .. } => rows / 2,
                    _ => rows.saturating_sub(1),
                };
                let line = (count > 0).then_some(count);
                self.place_and_scroll(line, first_non_blank, row);
            }
            Scroll::NextPage => {
                let (_, last) = self.viewport.visible_lines(&self.buffer);
                let line = if count > 0 { count } else { last + 1 };
                self.place_and_scroll(Some(line), true, 0);
            }
            Scroll::PreviousPage => {
                let top = self.viewport.top_line();
                let line = if count > 0 { count } else { top.saturating_sub(1) };
                self.place_and_scroll(Some(line), true, rows.saturating_sub(1));
            }
        }
    }

    /// Optionally move to `line`, then scroll its row to `row`.
    fn place_and_scroll(&mut self, line: Option<usize>, first_non_blank: bool, row: usize) {
        let last = self.buffer.line_count();
        let cursor = self.cursors.first_mut();
        let at = cursor.position(&self.buffer);
        let line = line.map_or(at.line, |l| l.clamp(1, last));
        let column = if first_non_blank {
            self.buffer.first_non_blank(line)
        } else {
            at.column
        };
        let at = cursor.move_to(&mut self.buffer, Position::new(line, column));
        self.viewport.ensure_visible(&self.buffer, at, true, 0);
        self.viewport.scroll_to(&self.buffer, at, row);
    }

    /// Move every cursor `amount` lines up or down, keeping its column.
    fn shift_cursors(&mut self, amount: usize, down: bool) {
        let last = self.buffer.line_count();
        let _ = self.cursors.each(&mut self.buffer, |cursor, buf| {
            let at = cursor.position(buf);
            let line = if down {
                (at.line + amount).min(last)
            } else {
                at.line.saturating_sub(amount).max(1)
            };
            Ok(cursor.move_to(buf, Position::new(line, at.column)))
        });
    }

    /// Pull cursors into the window, honouring `scrolloff` away from the
    /// buffer ends.
    fn keep_cursors_in_view(&mut self) {
        let (first, last) = self.viewport.visible_lines(&self.buffer);
        let margin = self
            .options
            .scrolloff
            .min(self.viewport.rows().saturating_sub(1) / 2);
        let low = if first == 1 { 1 } else { first + margin };
        let high = if last >= self.buffer.line_count() {
            last
        } else {
            last.saturating_sub(margin)
        };
        let (low, high) = if low <= high { (low, high) } else { (first, last) };
        let _ = self.cursors.each(&mut self.buffer, |cursor, buf| {
            let at = cursor.position(buf);
            let line = at.line.clamp(low, high);
            Ok(if line == at.line {
                at
            } else {
                cursor.move_to(buf, Position::new(line, at.column))
            })
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Delete `range` for a change. Whole-line changes leave an empty line in
/// their place to type on. The cursor may rest past the end so a change
/// reaching end of line types after the remaining text.
fn delete_for_change(cursor: &mut Cursor, buf: &mut Buffer, range: &Range) -> Register {
    let total = buf.line_count();
    cursor.set_past_end(buf, true);
    let register = cursor.delete_range(buf, range);
    if range.kind() == RangeKind::Line {
        let (first, last) = (range.earlier().line, range.later().line);
        if last - first + 1 < total {
            cursor.open_line(buf, first <= buf.line_count());
        }
    }
    register
}

/// The cursor's selection as a range; the selection is cleared.
fn take_selection(cursor: &mut Cursor, buf: &Buffer) -> EditResult<Range> {
    let range = cursor.visual_range(buf).ok_or(EditError::NoTarget)?;
    cursor.clear_visual();
    Ok(range)
}

/// One position per line of a block, at `column(line)`.
fn block_positions(range: &Range, column: impl Fn(usize) -> usize) -> Vec<Position> {
    (range.earlier().line..=range.later().line)
        .map(|line| Position::new(line, column(line)))
        .collect()
}

/// Clipboard text as a register: a trailing newline makes it linewise.
fn clipboard_register(text: &str) -> Register {
    match text.strip_suffix('\n') {
        Some(body) => Register::with_text(lines_from_str(body), RegisterKind::Line),
        None => Register::with_text(lines_from_str(text), RegisterKind::Char),
    }
}

const fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TabCommand;
    use crate::host::ExResponse;
    use pretty_assertions::assert_eq;

    fn session(text: &str, keys: &str) -> Session {
        let mut session = Session::new(text);
        session.type_keys(keys);
        session
    }

    fn unnamed(session: &Session) -> String {
        lines_to_string(session.registers().get(None).text())
    }

    #[derive(Debug, Default)]
    struct RecordingHost {
        writes: Vec<WriteRequest>,
        commands: Vec<ExRequest>,
        tabs: Vec<TabCommand>,
    }

    impl Host for RecordingHost {
        fn write(&mut self, request: &WriteRequest) -> Option<String> {
            self.writes.push(request.clone());
            Some(format!("\"{}\" written", request.args))
        }

        fn ex_command(&mut self, request: &ExRequest) -> ExResponse {
            self.commands.push(request.clone());
            if request.command == "q" {
                ExResponse::handled(Some("bye".to_string()))
            } else {
                ExResponse::default()
            }
        }

        fn tab_command(&mut self, command: TabCommand) {
            self.tabs.push(command);
        }
    }

    #[derive(Debug, Default)]
    struct SlowClipboard {
        written: String,
    }

    impl Clipboard for SlowClipboard {
        fn read_text(&mut self) -> ClipboardRead {
            ClipboardRead::Pending
        }

        fn write_text(&mut self, text: &str) {
            text.clone_into(&mut self.written);
        }
    }

    // -- Operators ----------------------------------------------------------

    #[test]
    fn delete_word_fills_the_unnamed_register() {
        let s = session("hello world", "dw");
        assert_eq!(s.text(), "world");
        assert_eq!(unnamed(&s), "hello ");
        assert_eq!(s.cursor_position(), Position::new(1, 1));
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn delete_char() {
        assert_eq!(session("abc", "x").text(), "bc");
    }

    #[test]
    fn change_word_types_over_it() {
        let s = session("hello world", "cwbye<Esc>");
        assert_eq!(s.text(), "bye world");
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn changes_reaching_end_of_line_type_after_the_text() {
        for keys in ["wCX<Esc>", "wcwX<Esc>", "wciwX<Esc>", "wc$X<Esc>"] {
            assert_eq!(session("foo bar", keys).text(), "foo X", "{keys}");
        }
        assert_eq!(session("foo bar", "$sX<Esc>").text(), "foo baX");
        assert_eq!(session("foo bar", "ciwxyz<Esc>w.").text(), "xyz xyz");
    }

    #[test]
    fn huge_counts_are_clamped() {
        let s = session("a b c", "99999999999999999999d99999999999999999999w");
        assert_eq!(s.text(), "");
        assert_eq!(s.message(), None);
        assert_eq!(session("abc", "99999999999999999999x").text(), "");
    }

    #[test]
    fn change_line_keeps_an_empty_line_to_type_on() {
        assert_eq!(session("one\ntwo\nthree", "jccX<Esc>").text(), "one\nX\nthree");
        assert_eq!(session("one\ntwo", "jccX<Esc>").text(), "one\nX");
        assert_eq!(session("  only", "SX<Esc>").text(), "X");
    }

    #[test]
    fn delete_line_then_paste_below() {
        let s = session("one\ntwo\nthree", "ddp");
        assert_eq!(s.text(), "two\none\nthree");
        assert_eq!(s.cursor_position(), Position::new(2, 1));
    }

    #[test]
    fn join_lines_drops_leading_blanks() {
        assert_eq!(session("a\n  b", "J").text(), "a b");
    }

    #[test]
    fn indent_follows_shiftwidth() {
        assert_eq!(session("x", ">>").text(), "    x");
        assert_eq!(session("x", ":set sw=2<CR>>>").text(), "  x");
    }

    #[test]
    fn replace_mode_overwrites_then_appends() {
        let s = session("abc", "Rxyzw<Esc>");
        assert_eq!(s.text(), "xyzw");
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn insert_then_escape_steps_back() {
        let s = session("", "ihello<Esc>");
        assert_eq!(s.text(), "hello");
        assert_eq!(s.cursor_position(), Position::new(1, 5));
        assert_eq!(s.cursor_shape(), CursorShape::SteadyBlock);
        assert_eq!(session("", "R").cursor_shape(), CursorShape::SteadyUnderline);
    }

    // -- Undo & repeat ------------------------------------------------------

    #[test]
    fn undo_and_redo() {
        let mut s = session("abc", "x");
        s.type_keys("u");
        assert_eq!(s.text(), "abc");
        s.type_keys("<C-r>");
        assert_eq!(s.text(), "bc");
    }

    #[test]
    fn undo_redo_round_trip_restores_every_state() {
        let mut s = session("one two three", "dwxdd");
        assert_eq!(s.text(), "");
        s.type_keys("uuu");
        assert_eq!(s.text(), "one two three");
        s.type_keys("<C-r><C-r><C-r>");
        assert_eq!(s.text(), "");
    }

    #[test]
    fn dot_repeats_the_last_change() {
        assert_eq!(session("abcdef", "x.").text(), "cdef");
        assert_eq!(session("abcdef", "2x.").text(), "ef");
    }

    #[test]
    fn dot_repeats_a_whole_insert() {
        assert_eq!(session("foo", "ahi<Esc>.").text(), "fhihioo");
    }

    #[test]
    fn dot_without_a_change_is_silent() {
        let s = session("abc", ".");
        assert_eq!(s.text(), "abc");
        assert_eq!(s.message(), None);
    }

    // -- Search -------------------------------------------------------------

    #[test]
    fn search_then_repeat_wraps() {
        let mut s = session("one two\nthree two", "/two<CR>");
        assert_eq!(s.cursor_position(), Position::new(1, 5));
        s.type_keys("n");
        assert_eq!(s.cursor_position(), Position::new(2, 7));
        s.type_keys("n");
        assert_eq!(s.cursor_position(), Position::new(1, 5));
        s.type_keys("N");
        assert_eq!(s.cursor_position(), Position::new(2, 7));
    }

    #[test]
    fn repeat_search_without_a_pattern() {
        let s = session("abc", "n");
        assert_eq!(s.message(), Some("No previous search pattern"));
    }

    #[test]
    fn star_searches_the_word_under_the_cursor() {
        let s = session("foo bar foo", "*");
        assert_eq!(s.cursor_position(), Position::new(1, 9));
        assert_eq!(s.state().last_pattern.as_ref().map(Pattern::source), Some("\\<foo\\>"));
    }

    #[test]
    fn star_on_a_blank_reports() {
        let s = session("foo bar", "4|*");
        assert_eq!(s.message(), Some("No word under cursor"));
    }

    // -- Ex commands --------------------------------------------------------

    #[test]
    fn substitute_across_the_buffer() {
        let s = session("foo foo\nfoo", ":%s/foo/bar/g<CR>");
        assert_eq!(s.text(), "bar bar\nbar");
        assert_eq!(s.message(), Some("3 substitutions on 2 lines"));
        assert_eq!(s.cursor_position(), Position::new(2, 1));
    }

    #[test]
    fn substitute_miss_reports_the_pattern() {
        let s = session("abc", ":s/zzz/y<CR>");
        assert_eq!(s.message(), Some("Pattern not found: zzz"));
    }

    #[test]
    fn ampersand_repeats_the_substitution() {
        let s = session("aa\naa", "&");
        assert_eq!(s.message(), Some("No previous substitution"));
        let s = session("aa\naa", ":s/a/b<CR>j&");
        assert_eq!(s.text(), "ba\nba");
    }

    #[test]
    fn set_options() {
        let s = session("abc", ":set ts=4<CR>");
        assert_eq!(s.options().tabstop, 4);
        let s = session("abc", ":set bogus<CR>");
        assert_eq!(s.message(), Some("Unknown option: bogus"));
    }

    #[test]
    fn unknown_ex_command() {
        let s = session("abc", ":frob<CR>");
        assert_eq!(s.message(), Some("Unknown ex command: frob"));
    }

    #[test]
    fn write_and_quit_go_to_the_host() {
        let mut s = Session::with_host(
            Buffer::from_text("a\nb"),
            MemoryClipboard::new(),
            RecordingHost::default(),
        );
        s.type_keys(":w out.txt<CR>");
        assert_eq!(
            s.host().writes,
            vec![WriteRequest {
                range: (1, 2),
                args: "out.txt".to_string(),
                text: "a\nb".to_string(),
            }]
        );
        assert_eq!(s.take_message().as_deref(), Some("\"out.txt\" written"));
        s.type_keys(":q<CR>");
        assert_eq!(s.message(), Some("bye"));
        s.type_keys("gt");
        assert_eq!(s.host().tabs, vec![TabCommand::Next]);
        s.host_mut().tabs.clear();
        s.type_keys("gT");
        assert_eq!(s.host().tabs, vec![TabCommand::Previous]);
    }

    #[test]
    fn visual_colon_uses_the_selected_lines() {
        let s = session("a\na\na", "jVj:s/a/b<CR>");
        assert_eq!(s.text(), "a\nb\nb");
    }

    // -- Macros -------------------------------------------------------------

    #[test]
    fn record_and_replay_a_macro() {
        let s = session("a\nb\nc", "qaA!<Esc>jq2@a");
        assert_eq!(s.text(), "a!\nb!\nc!");
        assert_eq!(lines_to_string(s.registers().get(Some('a')).text()), "A!<Esc>j");
        assert_eq!(s.state().recording, None);
    }

    #[test]
    fn recording_shows_in_the_status_line() {
        let s = session("abc", "qb");
        assert_eq!(s.message(), Some("Recording @b"));
        assert_eq!(s.status_line(), "recording @b  1,1");
    }

    #[test]
    fn undefined_macro() {
        let s = session("abc", "@z");
        assert_eq!(s.message(), Some("Macro z not defined"));
    }

    #[test]
    fn self_calling_macro_stops() {
        let s = session("abc", "qa@aq@a");
        assert_eq!(s.message(), Some("Macro recursion too deep"));
        assert_eq!(s.state().macro_depth, 0);
        assert!(!s.state().macro_aborted);
    }

    // -- Registers & clipboard ----------------------------------------------

    #[test]
    fn paste_a_yanked_character() {
        let s = session("abc", "ylp");
        assert_eq!(s.text(), "aabc");
        assert_eq!(s.cursor_position(), Position::new(1, 2));
        assert_eq!(session("abc", "yl3p").text(), "aaaabc");
        assert_eq!(session("abc", "lylP").text(), "abbc");
    }

    #[test]
    fn paste_a_multi_line_selection() {
        assert_eq!(session("ab\ncd\nef", "jvjy0ggp").text(), "acd\neb\ncd\nef");
        assert_eq!(session("ab\ncd", "vjyP").text(), "ab\ncab\ncd");
    }

    #[test]
    fn visual_paste_swaps_with_the_register() {
        let s = session("foo bar", "yiwwviwp");
        assert_eq!(s.text(), "foo foo");
        assert_eq!(unnamed(&s), "bar");
    }

    #[test]
    fn linewise_visual_yank_and_paste() {
        assert_eq!(session("one\ntwo", "Vyjp").text(), "one\ntwo\none");
    }

    #[test]
    fn clipboard_yank_is_linewise_text() {
        let s = session("line", "\"+yy");
        assert_eq!(s.clipboard().text(), "line\n");
    }

    #[test]
    fn pending_clipboard_paste_resumes() {
        let mut s = Session::with_host(Buffer::from_text("abc"), SlowClipboard::default(), NoHost);
        s.type_keys("\"+p");
        assert_eq!(s.state().pending_paste, Some(PendingPaste { before: false, count: 1 }));
        assert_eq!(s.text(), "abc");
        s.deliver_clipboard("xyz");
        assert_eq!(s.text(), "axyzbc");
        assert_eq!(s.state().pending_paste, None);
        s.type_keys("\"+yl");
        assert_eq!(s.clipboard().written, "z");
    }

    // -- Visual & multiple cursors ------------------------------------------

    #[test]
    fn block_delete() {
        assert_eq!(session("abcdef\nghijkl", "l<C-v>jlld").text(), "aef\ngkl");
    }

    #[test]
    fn block_insert_types_on_every_line() {
        let s = session("abc\nabc", "l<C-v>jIX<Esc>");
        assert_eq!(s.text(), "aXbc\naXbc");
        assert_eq!(s.cursor_positions().len(), 1);
    }

    #[test]
    fn added_cursors_insert_together() {
        let s = session("abc\nabc\nabc", "<C-l>j<C-l>jIx<Esc>");
        assert_eq!(s.text(), "xabc\nxabc\nxabc");
        assert_eq!(s.mode(), Mode::Normal);
    }

    #[test]
    fn selection_attributes() {
        let s = session("abc", "vl");
        assert_eq!(s.cell_attrs(1, 1), CellAttrs::SELECTED);
        assert_eq!(s.cell_attrs(1, 2), CellAttrs::SELECTED | CellAttrs::CURSOR);
        assert_eq!(s.cell_attrs(1, 3), CellAttrs::empty());
        assert_eq!(s.mode(), Mode::Visual(VisualKind::Char));
    }

    // -- Marks & messages ---------------------------------------------------

    #[test]
    fn marks_jump_back() {
        let s = session("one\ntwo\nthree", "jmagg`a");
        assert_eq!(s.cursor_position(), Position::new(2, 1));
        let s = session("one", "`b");
        assert_eq!(s.message(), Some("Mark not set"));
    }

    #[test]
    fn file_info() {
        let s = session("a\nb\nc", "<C-g>");
        assert_eq!(s.message(), Some("\"[No Name]\" 3 lines --33%--"));
    }

    #[test]
    fn status_line_shows_mode_and_pending_keys() {
        assert_eq!(session("abc", "i").status_line(), "-- INSERT --  1,1");
        let s = session("abc", "\"a2d");
        assert_eq!(s.pending_keys(), "\"a2d");
        assert_eq!(s.status_line(), "\"a2d  1,1");
        assert_eq!(session("abc", ":set").status_line(), ":set");
    }

    #[test]
    fn messages_are_taken_once() {
        let mut s = session("abc", ":frob<CR>");
        assert!(s.take_message().is_some());
        assert_eq!(s.take_message(), None);
    }

    // -- Scrolling ----------------------------------------------------------

    fn twenty_lines() -> Session {
        let text: Vec<String> = (1..=20).map(|n| format!("line {n}")).collect();
        let mut s = Session::new(&text.join("\n"));
        s.set_size(5, 80);
        s
    }

    #[test]
    fn scroll_current_line_to_top() {
        let mut s = twenty_lines();
        s.type_keys("10Gzt");
        assert_eq!(s.visible_lines().0, 10);
        assert_eq!(s.cursor_position().line, 10);
    }

    #[test]
    fn scrolling_the_view_drags_the_cursor() {
        let mut s = twenty_lines();
        s.type_keys("<C-e>");
        assert_eq!(s.visible_lines().0, 2);
        assert_eq!(s.cursor_position().line, 4);
    }

    #[test]
    fn goto_end_keeps_the_cursor_visible() {
        let mut s = twenty_lines();
        s.type_keys("G");
        let (first, last) = s.visible_lines();
        assert_eq!(last, 20);
        assert!(first <= 20);
    }

    // -- Invariants ---------------------------------------------------------

    #[test]
    fn cursor_stays_inside_the_buffer() {
        let scripts = [
            "ddddddddj",
            "Gdkx$",
            "3J$x",
            "vjjd",
            "<C-v>jj$d",
            "A   <Esc>dd",
            "ofoo<CR>bar<Esc>uu",
            "yyPPPGdgg",
        ];
        for script in scripts {
            let s = session("one\n  two\nthree four\n\nfive", script);
            let at = s.cursor_position();
            let lines = s.buffer().line_count();
            assert!(at.line >= 1 && at.line <= lines, "{script}: {at}");
            assert!(at.column >= 1, "{script}: {at}");
            assert!(at.column <= s.buffer().line_len(at.line).max(1), "{script}: {at}");
        }
    }
}
