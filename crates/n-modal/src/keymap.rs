//! Key maps — the per-mode automata that turn keys into [`Command`]s.
//!
//! A key map is a list of [`Matcher`]s. The [`Parser`] offers each key to
//! the current list; the first matcher that accepts it updates the command
//! under construction and says what comes next:
//!
//! ```text
//!   "  a  3  d  2  w
//!   │  │  │  │  │  └─ motion Word ............ Done
//!   │  │  │  │  └──── operand count 2 ........ Stay
//!   │  │  │  └─────── operator Delete ......... Next(pending list)
//!   │  │  └────────── operator count 3 ........ Stay
//!   │  └───────────── register name 'a' ....... Next(after-register list)
//!   └──────────────── register prefix ......... Next([name])
//! ```
//!
//! A key nobody accepts throws the partial command away and starts over.
//! That is deliberate: a stray key in the middle of `d2w` is not an error,
//! it just cancels.
//!
//! | Variant     | Accepts                                 |
//! |-------------|-----------------------------------------|
//! | `Key`       | one literal key or one of its aliases   |
//! | `Character` | any single grapheme (after `f`, `r`, …) |
//! | `Count`     | digits, but not a leading `0`           |
//! | `Register`  | `"`, followed by a register name        |
//! | `OneOf`     | whatever one of its children accepts    |
//! | `Typed`     | printable keys in insert / replace mode |
//! | `Entry`     | prompt text in `:` `/` `?` mode         |

use std::rc::Rc;

use unicode_segmentation::UnicodeSegmentation;

use crate::buffer::Direction;
use crate::command::{Command, Extend, Operation, Scroll, TabCommand, clamp_count};
use crate::mode::{EntryKind, Mode, VisualKind};
use crate::motion::{Motion, ObjectKind, ScreenMotion};
use crate::register::RegisterFile;

/// A shared list of matchers.
pub type List = Rc<[Matcher]>;

/// Which count a [`Matcher::Count`] accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountTarget {
    /// Typed before the operator (`3dw`).
    Operator,
    /// Typed before the motion (`d3w`).
    Operand,
}

/// What a literal key writes into the command.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    operation: Option<Operation>,
    motion: Option<Motion>,
    object: Option<ObjectKind>,
    inside: Option<bool>,
    screen: Option<ScreenMotion>,
    /// Operand count to assume when none was typed (`gg` is line 1).
    count: Option<usize>,
    /// `None` completes the command.
    then: Option<List>,
}

impl Binding {
    fn op(operation: Operation) -> Self {
        Self {
            operation: Some(operation),
            ..Self::default()
        }
    }

    fn motion(motion: Motion) -> Self {
        Self {
            motion: Some(motion),
            ..Self::default()
        }
    }

    fn object(object: ObjectKind) -> Self {
        Self {
            object: Some(object),
            ..Self::default()
        }
    }

    fn screen(screen: ScreenMotion) -> Self {
        Self {
            screen: Some(screen),
            ..Self::default()
        }
    }

    fn inside(inside: bool) -> Self {
        Self {
            inside: Some(inside),
            ..Self::default()
        }
    }

    fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = Some(motion);
        self
    }

    fn with_object(mut self, object: ObjectKind) -> Self {
        self.object = Some(object);
        self
    }

    const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    fn then(mut self, list: List) -> Self {
        self.then = Some(list);
        self
    }

    fn apply(&self, command: &mut Command) -> Step {
        if let Some(operation) = self.operation {
            command.operation = Some(operation);
        }
        if let Some(motion) = self.motion {
            command.operand.motion = Some(motion);
        }
        if let Some(object) = self.object {
            command.operand.object = Some(object);
        }
        if let Some(inside) = self.inside {
            command.operand.inside = inside;
        }
        if let Some(screen) = self.screen {
            command.operand.screen = Some(screen);
        }
        if let Some(count) = self.count {
            if command.operand.count == 0 {
                command.operand.count = count;
            }
        }
        self.then.clone().map_or(Step::Done, Step::Next)
    }
}

/// Where the parser goes after a matcher handles a key.
#[derive(Debug, Clone)]
pub enum Step {
    /// Continue with this list.
    Next(List),
    /// Keep the current list (counts, prompt text).
    Stay,
    /// The command is complete.
    Done,
}

/// One node of a key map.
#[derive(Debug, Clone)]
pub enum Matcher {
    Key {
        keys: &'static [&'static str],
        binding: Binding,
    },
    /// Captures the key itself into `operand.character`.
    Character,
    Count(CountTarget),
    /// `"` followed by a register name, then `then`.
    Register { then: List },
    RegisterName { then: List },
    /// The first accepting child handles the key; `default` fills in the
    /// operation when nothing else has set one.
    OneOf {
        children: List,
        default: Option<Operation>,
    },
    /// A printable key in insert or replace mode.
    Typed(Operation),
    /// Prompt text: everything except `Enter` and `Escape`.
    Entry,
}

impl Matcher {
    /// Whether this matcher takes `key` given the command built so far.
    #[must_use]
    pub fn accepts(&self, key: &str, command: &Command) -> bool {
        match self {
            Self::Key { keys, .. } => keys.contains(&key),
            Self::Character | Self::Typed(_) => typed_symbol(key).is_some(),
            Self::Count(target) => {
                let current = match target {
                    CountTarget::Operator => command.count,
                    CountTarget::Operand => command.operand.count,
                };
                key.len() == 1
                    && key.as_bytes()[0].is_ascii_digit()
                    && (key != "0" || current > 0)
            }
            Self::Register { .. } => key == "\"",
            Self::RegisterName { .. } => register_name(key).is_some(),
            Self::OneOf { children, .. } => children.iter().any(|m| m.accepts(key, command)),
            Self::Entry => key != "Enter" && key != "Escape",
        }
    }

    /// Apply `key` to `command`. Only called after [`accepts`](Self::accepts).
    pub fn handle(&self, key: &str, command: &mut Command) -> Step {
        match self {
            Self::Key { binding, .. } => binding.apply(command),
            Self::Character => {
                command.operand.character = typed_symbol(key).map(str::to_string);
                Step::Done
            }
            Self::Count(target) => {
                let digit = usize::from(key.as_bytes()[0] - b'0');
                let count = match target {
                    CountTarget::Operator => &mut command.count,
                    CountTarget::Operand => &mut command.operand.count,
                };
                *count = clamp_count(count.saturating_mul(10).saturating_add(digit));
                Step::Stay
            }
            Self::Register { then } => Step::Next(Rc::from(vec![Self::RegisterName {
                then: then.clone(),
            }])),
            Self::RegisterName { then } => {
                if let Some(name) = register_name(key) {
                    command.register = Some(name.to_ascii_lowercase());
                    command.append_register = name.is_ascii_uppercase();
                }
                Step::Next(then.clone())
            }
            Self::OneOf { children, default } => {
                let step = children
                    .iter()
                    .find(|m| m.accepts(key, command))
                    .map_or(Step::Done, |m| m.handle(key, command));
                if command.operation.is_none() {
                    command.operation = *default;
                }
                step
            }
            Self::Typed(operation) => {
                command.operation = Some(*operation);
                command.operand.character = typed_symbol(key).map(str::to_string);
                Step::Done
            }
            Self::Entry => {
                let text = &mut command.operand.text;
                if key == "Backspace" {
                    match text.grapheme_indices(true).next_back() {
                        Some((idx, _)) => text.truncate(idx),
                        None => {
                            command.operation = Some(Operation::NormalMode);
                            return Step::Done;
                        }
                    }
                } else if let Some(symbol) = typed_symbol(key) {
                    text.push_str(symbol);
                }
                Step::Stay
            }
        }
    }
}

/// The cell a key types: itself when it is one grapheme, a tab for `Tab`.
fn typed_symbol(key: &str) -> Option<&str> {
    if key == "Tab" {
        return Some("\t");
    }
    let mut graphemes = key.graphemes(true);
    match (graphemes.next(), graphemes.next()) {
        (Some(g), None) => Some(g),
        _ => None,
    }
}

fn register_name(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };
    (RegisterFile::is_valid_name(c) || c == '+' || c == '*').then_some(c)
}

// ---------------------------------------------------------------------------
// Key maps
// ---------------------------------------------------------------------------

fn key(keys: &'static [&'static str], binding: Binding) -> Matcher {
    Matcher::Key { keys, binding }
}

fn list(matchers: Vec<Matcher>) -> List {
    Rc::from(matchers)
}

fn character() -> List {
    list(vec![Matcher::Character])
}

fn motions() -> Vec<Matcher> {
    use Motion as M;
    let g = list(vec![key(&["g"], Binding::motion(M::GotoLine).with_count(1))]);
    vec![
        key(&["h", "ArrowLeft", "Backspace", "CTRL-h"], Binding::motion(M::Left)),
        key(&["j", "ArrowDown", "Enter", "+", "CTRL-m", "CTRL-n", "CTRL-j"], Binding::motion(M::Down)),
        key(&["k", "ArrowUp", "CTRL-p", "-"], Binding::motion(M::Up)),
        key(&["l", "ArrowRight", " "], Binding::motion(M::Right)),
        key(&["w"], Binding::motion(M::Word)),
        key(&["W"], Binding::motion(M::BigWord)),
        key(&["b"], Binding::motion(M::BackWord)),
        key(&["B"], Binding::motion(M::BackBigWord)),
        key(&["e"], Binding::motion(M::EndWord)),
        key(&["E"], Binding::motion(M::EndBigWord)),
        key(&["0", "Home"], Binding::motion(M::StartLine)),
        key(&["^"], Binding::motion(M::FirstNonBlank)),
        key(&["$", "End"], Binding::motion(M::EndLine)),
        key(&["G"], Binding::motion(M::GotoLine)),
        key(&["|"], Binding::motion(M::Column)),
        key(&["f"], Binding::motion(M::FindChar).then(character())),
        key(&["F"], Binding::motion(M::FindCharBack).then(character())),
        key(&["t"], Binding::motion(M::TillChar).then(character())),
        key(&["T"], Binding::motion(M::TillCharBack).then(character())),
        key(&[";"], Binding::motion(M::RepeatFind)),
        key(&[","], Binding::motion(M::RepeatFindReverse)),
        key(&["_"], Binding::motion(M::Line)),
        key(&["%"], Binding::motion(M::Match)),
        key(&["`"], Binding::motion(M::MarkChar).then(character())),
        key(&["'"], Binding::motion(M::MarkLine).then(character())),
        key(&["}"], Binding::motion(M::ParagraphForward)),
        key(&["{"], Binding::motion(M::ParagraphBackward)),
        key(&[")"], Binding::motion(M::SentenceForward)),
        key(&["("], Binding::motion(M::SentenceBackward)),
        key(&["g"], Binding::default().then(g)),
    ]
}

fn screen_motions() -> Vec<Matcher> {
    vec![
        key(&["H"], Binding::screen(ScreenMotion::Top)),
        key(&["M"], Binding::screen(ScreenMotion::Middle)),
        key(&["L"], Binding::screen(ScreenMotion::Bottom)),
    ]
}

fn objects() -> Vec<Matcher> {
    use ObjectKind as O;
    let kinds = list(vec![
        key(&["w"], Binding::object(O::Word)),
        key(&["W"], Binding::object(O::BigWord)),
        key(&["b", "(", ")"], Binding::object(O::Paren)),
        key(&["B", "{", "}"], Binding::object(O::Brace)),
        key(&["[", "]"], Binding::object(O::Bracket)),
        key(&["<", ">"], Binding::object(O::Angle)),
        key(&["\""], Binding::object(O::DoubleQuote)),
        key(&["'"], Binding::object(O::SingleQuote)),
        key(&["p"], Binding::object(O::Paragraph)),
        key(&["s"], Binding::object(O::Sentence)),
    ]);
    vec![
        key(&["i"], Binding::inside(true).then(kinds.clone())),
        key(&["a"], Binding::inside(false).then(kinds)),
    ]
}

/// What may follow an operator key: a count, a motion, an object, or the
/// operator key again for whole lines.
fn pending(doubled: &'static [&'static str]) -> List {
    let mut matchers = vec![Matcher::Count(CountTarget::Operand)];
    matchers.extend(motions());
    matchers.extend(screen_motions());
    matchers.extend(objects());
    matchers.push(key(doubled, Binding::object(ObjectKind::Line)));
    list(matchers)
}

fn scroll(how: Scroll) -> Binding {
    Binding::op(Operation::Scroll(how))
}

fn normal_map() -> List {
    use Operation as Op;
    let z = list(vec![
        key(&["Enter"], scroll(Scroll::Top { first_non_blank: true })),
        key(&["t"], scroll(Scroll::Top { first_non_blank: false })),
        key(&["."], scroll(Scroll::Middle { first_non_blank: true })),
        key(&["z"], scroll(Scroll::Middle { first_non_blank: false })),
        key(&["-"], scroll(Scroll::Bottom { first_non_blank: true })),
        key(&["b"], scroll(Scroll::Bottom { first_non_blank: false })),
        key(&["+"], scroll(Scroll::NextPage)),
        key(&["^"], scroll(Scroll::PreviousPage)),
    ]);
    let g = list(vec![
        key(&["g"], Binding::op(Op::Move).with_motion(Motion::GotoLine).with_count(1)),
        key(&["t"], Binding::op(Op::Tab(TabCommand::Next))),
        key(&["T"], Binding::op(Op::Tab(TabCommand::Previous))),
    ]);
    let extend = list(vec![
        Matcher::Count(CountTarget::Operand),
        key(&["j", "ArrowDown"], Binding::op(Op::Extend(Extend::Down))),
        key(&["k", "ArrowUp"], Binding::op(Op::Extend(Extend::Up))),
        key(&["J"], Binding::op(Op::Extend(Extend::DownSkip))),
        key(&["K"], Binding::op(Op::Extend(Extend::UpSkip))),
        key(&["u"], Binding::op(Op::Extend(Extend::Pop))),
    ]);

    let mut after_count = vec![
        // -- Immediate ------------------------------------------------------
        key(&["i", "Insert"], Binding::op(Op::Insert)),
        key(&["a"], Binding::op(Op::Append)),
        key(&["I"], Binding::op(Op::InsertStart)),
        key(&["A"], Binding::op(Op::AppendEnd)),
        key(&["o"], Binding::op(Op::OpenLine)),
        key(&["O"], Binding::op(Op::OpenLineAbove)),
        key(&["R"], Binding::op(Op::ReplaceMode)),
        key(&["v"], Binding::op(Op::Visual(VisualKind::Char))),
        key(&["V"], Binding::op(Op::Visual(VisualKind::Line))),
        key(&["CTRL-v"], Binding::op(Op::Visual(VisualKind::Block))),
        key(&["CTRL-]"], Binding::op(Op::JumpTag)),
        key(&["u"], Binding::op(Op::Undo)),
        key(&["CTRL-r"], Binding::op(Op::Redo)),
        key(&["U"], Binding::op(Op::UndoLine)),
        key(&["PageUp", "CTRL-b"], scroll(Scroll::PageUp)),
        key(&["PageDown", "CTRL-f"], scroll(Scroll::PageDown)),
        key(&["CTRL-d"], scroll(Scroll::HalfPageDown)),
        key(&["CTRL-u"], scroll(Scroll::HalfPageUp)),
        key(&["CTRL-e"], scroll(Scroll::LineDown)),
        key(&["CTRL-y"], scroll(Scroll::LineUp)),
        key(&["CTRL-g"], Binding::op(Op::Info)),
        key(&["n"], Binding::op(Op::SearchAgain)),
        key(&["N"], Binding::op(Op::SearchReverse)),
        key(&["*"], Binding::op(Op::SearchWord(Direction::Forward))),
        key(&["#"], Binding::op(Op::SearchWord(Direction::Backward))),
        key(&["."], Binding::op(Op::Repeat)),
        key(&["&"], Binding::op(Op::RepeatSubstitution)),
        key(&["q"], Binding::op(Op::RecordMacro).then(character())),
        key(&["@"], Binding::op(Op::RunMacro).then(character())),
        key(&["J"], Binding::op(Op::JoinLines)),
        key(&["p"], Binding::op(Op::Paste)),
        key(&["P"], Binding::op(Op::PasteBefore)),
        key(&["/"], Binding::op(Op::TextEntry(EntryKind::Search))),
        key(&["?"], Binding::op(Op::TextEntry(EntryKind::SearchBack))),
        key(&[":"], Binding::op(Op::TextEntry(EntryKind::Ex))),
        key(&["CTRL-l"], Binding::default().then(extend)),
        key(&["g"], Binding::default().then(g)),
        // -- Shorthands -----------------------------------------------------
        key(&["x", "Delete"], Binding::op(Op::Delete).with_object(ObjectKind::Char)),
        key(&["X"], Binding::op(Op::Delete).with_motion(Motion::Left)),
        key(&["D"], Binding::op(Op::Delete).with_motion(Motion::EndLine)),
        key(&["C"], Binding::op(Op::Change).with_motion(Motion::EndLine)),
        key(&["s"], Binding::op(Op::Change).with_object(ObjectKind::Char)),
        key(&["S"], Binding::op(Op::Change).with_object(ObjectKind::Line)),
        key(&["Y"], Binding::op(Op::Yank).with_object(ObjectKind::Line)),
        key(&["~"], Binding::op(Op::ToggleCase).with_object(ObjectKind::Char)),
        key(
            &["r"],
            Binding::op(Op::Replace)
                .with_object(ObjectKind::Char)
                .then(character()),
        ),
        key(&["m"], Binding::op(Op::Mark).then(character())),
        key(&["z"], Binding::default().then(z)),
        // -- Operators ------------------------------------------------------
        key(&["d"], Binding::op(Op::Delete).then(pending(&["d"]))),
        key(&["c"], Binding::op(Op::Change).then(pending(&["c"]))),
        key(&["y"], Binding::op(Op::Yank).then(pending(&["y"]))),
        key(&[">"], Binding::op(Op::Indent).then(pending(&[">"]))),
        key(&["<"], Binding::op(Op::Unindent).then(pending(&["<"]))),
    ];
    let mut moves = motions();
    moves.extend(screen_motions());
    after_count.push(Matcher::OneOf {
        children: list(moves),
        default: Some(Op::Move),
    });

    let after_register = {
        let mut matchers = vec![Matcher::Count(CountTarget::Operator)];
        matchers.extend(after_count.iter().cloned());
        list(matchers)
    };
    let mut matchers = vec![
        key(&["Escape"], Binding::op(Op::NormalMode)),
        Matcher::Register {
            then: after_register,
        },
        Matcher::Count(CountTarget::Operator),
    ];
    matchers.extend(after_count);
    list(matchers)
}

fn visual_map() -> List {
    use Operation as Op;
    let on_selection = |operation| Binding::op(operation).with_object(ObjectKind::Visual);

    let mut after_count = vec![
        key(&["v"], Binding::op(Op::Visual(VisualKind::Char))),
        key(&["V"], Binding::op(Op::Visual(VisualKind::Line))),
        key(&["CTRL-v"], Binding::op(Op::Visual(VisualKind::Block))),
        key(&["d", "x", "Delete"], on_selection(Op::Delete)),
        key(&["c", "s"], on_selection(Op::Change)),
        key(&["y"], on_selection(Op::Yank)),
        key(&[">"], on_selection(Op::Indent)),
        key(&["<"], on_selection(Op::Unindent)),
        key(&["~"], on_selection(Op::ToggleCase)),
        key(&["r"], on_selection(Op::Replace).then(character())),
        key(&["J"], on_selection(Op::JoinLines)),
        key(&["p"], on_selection(Op::Paste)),
        key(&["P"], on_selection(Op::PasteBefore)),
        key(&["CTRL-]"], Binding::op(Op::JumpTag)),
        key(&["o"], Binding::op(Op::SwapEnds)),
        key(&["O"], Binding::op(Op::SwapColumns)),
        key(&["I"], Binding::op(Op::BlockInsert)),
        key(&["A"], Binding::op(Op::BlockAppend)),
        key(&["CTRL-l"], Binding::op(Op::Extend(Extend::NextSelection))),
        key(&[":"], Binding::op(Op::TextEntry(EntryKind::Ex))),
    ];
    let mut moves = motions();
    moves.extend(screen_motions());
    moves.extend(objects());
    after_count.push(Matcher::OneOf {
        children: list(moves),
        default: Some(Op::Select),
    });

    let after_register = {
        let mut matchers = vec![Matcher::Count(CountTarget::Operand)];
        matchers.extend(after_count.iter().cloned());
        list(matchers)
    };
    let mut matchers = vec![
        key(&["Escape"], Binding::op(Op::NormalMode)),
        Matcher::Register {
            then: after_register,
        },
        Matcher::Count(CountTarget::Operand),
    ];
    matchers.extend(after_count);
    list(matchers)
}

/// Insert and replace mode share everything but what a typed key does.
fn typing_map(typed: Operation) -> List {
    use Operation as Op;
    let backspace = if typed == Op::Replace {
        Binding::op(Op::Move).with_motion(Motion::Left)
    } else {
        Binding::op(Op::Backspace)
    };
    list(vec![
        key(&["Escape"], Binding::op(Op::NormalMode)),
        key(&["Backspace", "CTRL-h"], backspace),
        key(&["Delete"], Binding::op(Op::Delete).with_object(ObjectKind::Char)),
        key(&["Enter", "CTRL-m", "CTRL-j"], Binding::op(Op::BreakLine)),
        key(&["ArrowLeft"], Binding::op(Op::Move).with_motion(Motion::Left)),
        key(&["ArrowRight"], Binding::op(Op::Move).with_motion(Motion::Right)),
        key(&["ArrowUp"], Binding::op(Op::Move).with_motion(Motion::Up)),
        key(&["ArrowDown"], Binding::op(Op::Move).with_motion(Motion::Down)),
        key(&["Home"], Binding::op(Op::Move).with_motion(Motion::StartLine)),
        key(&["End"], Binding::op(Op::Move).with_motion(Motion::EndLine)),
        Matcher::Typed(typed),
    ])
}

fn entry_map(kind: EntryKind) -> List {
    list(vec![
        key(&["Enter"], Binding::op(Operation::Submit(kind))),
        key(&["Escape"], Binding::op(Operation::NormalMode)),
        Matcher::Entry,
    ])
}

/// Every mode's initial matcher list, built once.
#[derive(Debug, Clone)]
pub struct KeyMaps {
    normal: List,
    insert: List,
    visual: List,
    replace: List,
    ex: List,
    search: List,
    search_back: List,
}

impl KeyMaps {
    #[must_use]
    pub fn new() -> Self {
        Self {
            normal: normal_map(),
            insert: typing_map(Operation::InsertChar),
            visual: visual_map(),
            replace: typing_map(Operation::Replace),
            ex: entry_map(EntryKind::Ex),
            search: entry_map(EntryKind::Search),
            search_back: entry_map(EntryKind::SearchBack),
        }
    }

    /// The initial list for `mode`.
    #[must_use]
    pub fn for_mode(&self, mode: Mode) -> List {
        match mode {
            Mode::Normal => self.normal.clone(),
            Mode::Insert => self.insert.clone(),
            Mode::Visual(_) => self.visual.clone(),
            Mode::Replace => self.replace.clone(),
            Mode::TextEntry(EntryKind::Ex) => self.ex.clone(),
            Mode::TextEntry(EntryKind::Search) => self.search.clone(),
            Mode::TextEntry(EntryKind::SearchBack) => self.search_back.clone(),
        }
    }
}

impl Default for KeyMaps {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Result of feeding one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// More keys are needed.
    Pending,
    /// A command is complete, with its counts already merged.
    Done(Command),
    /// No matcher accepted the key; the partial command was dropped.
    Reset,
}

/// The incremental key-sequence parser for the current mode.
#[derive(Debug)]
pub struct Parser {
    maps: KeyMaps,
    initial: List,
    current: List,
    command: Command,
}

impl Parser {
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        let maps = KeyMaps::new();
        let initial = maps.for_mode(mode);
        Self {
            maps,
            current: initial.clone(),
            initial,
            command: Command::new(),
        }
    }

    /// Switch key maps, dropping any partial command.
    pub fn set_mode(&mut self, mode: Mode) {
        self.initial = self.maps.for_mode(mode);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.current = self.initial.clone();
        self.command = Command::new();
    }

    /// True when no key of a command has been consumed yet.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.command.keys.is_empty()
    }

    /// Offer one key to the current matcher list.
    pub fn feed(&mut self, key: &str) -> Feed {
        let found = self.current.iter().position(|m| m.accepts(key, &self.command));
        let Some(index) = found else {
            tracing::debug!(key, discarded = %self.pending_keys(), "no matcher for key");
            self.reset();
            return Feed::Reset;
        };
        let step = self.current[index].handle(key, &mut self.command);
        self.command.keys.push(key.to_string());
        match step {
            Step::Stay => Feed::Pending,
            Step::Next(next) => {
                self.current = next;
                Feed::Pending
            }
            Step::Done => {
                let mut command = std::mem::take(&mut self.command);
                self.current = self.initial.clone();
                command.merge_counts();
                Feed::Done(command)
            }
        }
    }

    /// The keys typed so far for the pending command, in `^x` notation.
    #[must_use]
    pub fn pending_keys(&self) -> String {
        self.command.keys.iter().map(|k| key_notation(k)).collect()
    }

    /// Text typed into the current prompt.
    #[must_use]
    pub fn entry_text(&self) -> &str {
        &self.command.operand.text
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Mode::Normal)
    }
}

/// Short display form of a key: `CTRL-r` → `^r`, `Escape` → `^[`.
#[must_use]
pub fn key_notation(key: &str) -> String {
    match key {
        "Escape" => "^[".to_string(),
        "Enter" => "^M".to_string(),
        "Tab" => "^I".to_string(),
        _ => key
            .strip_prefix("CTRL-")
            .map_or_else(|| key.to_string(), |rest| format!("^{rest}")),
    }
}

// ---------------------------------------------------------------------------
// Key scripts
// ---------------------------------------------------------------------------

/// `<name>` forms understood in key scripts, and the key each stands for.
/// The first entry for a key is the one [`format_keys`] writes.
const NAMED_KEYS: &[(&str, &str)] = &[
    ("Esc", "Escape"),
    ("CR", "Enter"),
    ("Enter", "Enter"),
    ("Return", "Enter"),
    ("BS", "Backspace"),
    ("Tab", "Tab"),
    ("Del", "Delete"),
    ("Insert", "Insert"),
    ("Up", "ArrowUp"),
    ("Down", "ArrowDown"),
    ("Left", "ArrowLeft"),
    ("Right", "ArrowRight"),
    ("Home", "Home"),
    ("End", "End"),
    ("PageUp", "PageUp"),
    ("PageDown", "PageDown"),
    ("Space", " "),
    ("lt", "<"),
];

fn named_key(name: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix("C-").or_else(|| name.strip_prefix("c-")) {
        let mut graphemes = rest.graphemes(true);
        return match (graphemes.next(), graphemes.next()) {
            (Some("["), None) => Some("Escape".to_string()),
            (Some(g), None) => Some(format!("CTRL-{g}")),
            _ => None,
        };
    }
    NAMED_KEYS
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, key)| (*key).to_string())
}

/// Split a key script such as `ihello<Esc>:w<CR>` into key names.
///
/// `<Esc>`, `<CR>`, `<BS>`, `<Tab>`, `<Del>`, the arrows, `<C-x>` and
/// `<lt>` are recognised; any other `<` is an ordinary key.
#[must_use]
pub fn parse_keys(script: &str) -> Vec<String> {
    let graphemes: Vec<&str> = script.graphemes(true).collect();
    let mut keys = Vec::new();
    let mut i = 0;
    while i < graphemes.len() {
        if graphemes[i] == "<" {
            let close = graphemes[i + 1..].iter().position(|g| *g == ">");
            if let Some(len) = close.filter(|&len| len > 0) {
                let name: String = graphemes[i + 1..=i + len].concat();
                if let Some(key) = named_key(&name) {
                    keys.push(key);
                    i += len + 2;
                    continue;
                }
            }
        }
        keys.push(graphemes[i].to_string());
        i += 1;
    }
    keys
}

/// The inverse of [`parse_keys`].
#[must_use]
pub fn format_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|key| {
            if let Some(rest) = key.strip_prefix("CTRL-") {
                return format!("<C-{rest}>");
            }
            if key == " " {
                return key.clone();
            }
            NAMED_KEYS
                .iter()
                .find(|(_, k)| k == key)
                .map_or_else(|| key.clone(), |(alias, _)| format!("<{alias}>"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::Operand;
    use pretty_assertions::assert_eq;

    fn parse(mode: Mode, keys: &[&str]) -> Command {
        let mut parser = Parser::new(mode);
        let (last, init) = keys.split_last().unwrap();
        for key in init {
            assert_eq!(parser.feed(key), Feed::Pending, "key {key:?}");
        }
        match parser.feed(last) {
            Feed::Done(command) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    fn normal(keys: &[&str]) -> Command {
        parse(Mode::Normal, keys)
    }

    // -- Operators & counts -------------------------------------------------

    #[test]
    fn operator_with_counts_and_register() {
        let cmd = normal(&["\"", "a", "3", "d", "2", "w"]);
        assert_eq!(cmd.operation, Some(Operation::Delete));
        assert_eq!(cmd.operand.motion, Some(Motion::Word));
        assert_eq!(cmd.operand.count, 6);
        assert_eq!(cmd.register, Some('a'));
        assert!(!cmd.append_register);
        assert_eq!(cmd.keys, vec!["\"", "a", "3", "d", "2", "w"]);
    }

    #[test]
    fn uppercase_register_appends() {
        let cmd = normal(&["\"", "Q", "y", "y"]);
        assert_eq!(cmd.register, Some('q'));
        assert!(cmd.append_register);
        assert_eq!(cmd.operand.object, Some(ObjectKind::Line));
    }

    #[test]
    fn zero_is_a_motion_unless_counting() {
        let cmd = normal(&["0"]);
        assert_eq!(cmd.operation, Some(Operation::Move));
        assert_eq!(cmd.operand.motion, Some(Motion::StartLine));
        let cmd = normal(&["1", "0", "j"]);
        assert_eq!(cmd.operand.count, 10);
        assert_eq!(cmd.operand.motion, Some(Motion::Down));
    }

    #[test]
    fn text_objects_after_operators() {
        let cmd = normal(&["c", "i", "\""]);
        assert_eq!(cmd.operation, Some(Operation::Change));
        assert_eq!(cmd.operand.object, Some(ObjectKind::DoubleQuote));
        assert!(cmd.operand.inside);
        let cmd = normal(&["d", "a", "("]);
        assert_eq!(cmd.operand.object, Some(ObjectKind::Paren));
        assert!(!cmd.operand.inside);
    }

    #[test]
    fn find_captures_the_character() {
        let cmd = normal(&["d", "t", "x"]);
        assert_eq!(cmd.operand.motion, Some(Motion::TillChar));
        assert_eq!(cmd.operand.character.as_deref(), Some("x"));
        let cmd = normal(&["r", "Tab"]);
        assert_eq!(cmd.operation, Some(Operation::Replace));
        assert_eq!(cmd.operand.character.as_deref(), Some("\t"));
    }

    #[test]
    fn gg_defaults_to_line_one_but_keeps_a_count() {
        let cmd = normal(&["g", "g"]);
        assert_eq!(cmd.operand.motion, Some(Motion::GotoLine));
        assert_eq!(cmd.operand.count, 1);
        let cmd = normal(&["5", "g", "g"]);
        assert_eq!(cmd.operand.count, 5);
        let cmd = normal(&["d", "g", "g"]);
        assert_eq!(cmd.operation, Some(Operation::Delete));
        assert_eq!(cmd.operand.count, 1);
    }

    #[test]
    fn shorthands_expand() {
        let cmd = normal(&["D"]);
        assert_eq!(
            (cmd.operation, cmd.operand),
            (Some(Operation::Delete), Operand::motion(Motion::EndLine, 0))
        );
        let cmd = normal(&["3", "x"]);
        assert_eq!(cmd.operand, Operand::object(ObjectKind::Char, false, 3));
        let cmd = normal(&["z", "Enter"]);
        assert_eq!(
            cmd.operation,
            Some(Operation::Scroll(Scroll::Top { first_non_blank: true }))
        );
        let cmd = normal(&["CTRL-l", "2", "J"]);
        assert_eq!(cmd.operation, Some(Operation::Extend(Extend::DownSkip)));
        assert_eq!(cmd.operand.count, 2);
    }

    #[test]
    fn screen_motions_default_to_move() {
        let cmd = normal(&["L"]);
        assert_eq!(cmd.operation, Some(Operation::Move));
        assert_eq!(cmd.operand.screen, Some(ScreenMotion::Bottom));
    }

    // -- Resets -------------------------------------------------------------

    #[test]
    fn unknown_key_resets_silently() {
        let mut parser = Parser::new(Mode::Normal);
        assert_eq!(parser.feed("d"), Feed::Pending);
        assert_eq!(parser.pending_keys(), "d");
        assert_eq!(parser.feed("Q"), Feed::Reset);
        assert!(parser.is_idle());
        assert_eq!(parser.feed("f"), Feed::Pending);
        assert_eq!(parser.feed("Escape"), Feed::Reset);
        assert!(matches!(parser.feed("x"), Feed::Done(_)));
    }

    #[test]
    fn pending_keys_use_caret_notation() {
        let mut parser = Parser::new(Mode::Normal);
        parser.feed("CTRL-l");
        assert_eq!(parser.pending_keys(), "^l");
        assert_eq!(key_notation("Escape"), "^[");
    }

    // -- Visual -------------------------------------------------------------

    #[test]
    fn visual_defaults_to_select() {
        let cmd = parse(Mode::Visual(VisualKind::Char), &["i", "w"]);
        assert_eq!(cmd.operation, Some(Operation::Select));
        assert_eq!(cmd.operand.object, Some(ObjectKind::Word));
        let cmd = parse(Mode::Visual(VisualKind::Block), &["d"]);
        assert_eq!(cmd.operation, Some(Operation::Delete));
        assert_eq!(cmd.operand.object, Some(ObjectKind::Visual));
        let cmd = parse(Mode::Visual(VisualKind::Line), &["3", ">"]);
        assert_eq!(cmd.operand.count, 3);
    }

    // -- Insert, replace & prompts ------------------------------------------

    #[test]
    fn insert_keys() {
        let cmd = parse(Mode::Insert, &["é"]);
        assert_eq!(cmd.operation, Some(Operation::InsertChar));
        assert_eq!(cmd.operand.character.as_deref(), Some("é"));
        let cmd = parse(Mode::Insert, &["Enter"]);
        assert_eq!(cmd.operation, Some(Operation::BreakLine));
        let cmd = parse(Mode::Replace, &["z"]);
        assert_eq!(cmd.operation, Some(Operation::Replace));
        let mut parser = Parser::new(Mode::Insert);
        assert_eq!(parser.feed("F5"), Feed::Reset);
    }

    #[test]
    fn prompt_accumulates_and_submits() {
        let mut parser = Parser::new(Mode::TextEntry(EntryKind::Search));
        for key in ["f", "o", "x", "Backspace", "o"] {
            assert_eq!(parser.feed(key), Feed::Pending);
        }
        assert_eq!(parser.entry_text(), "foo");
        let Feed::Done(cmd) = parser.feed("Enter") else {
            panic!("prompt did not submit");
        };
        assert_eq!(cmd.operation, Some(Operation::Submit(EntryKind::Search)));
        assert_eq!(cmd.operand.text, "foo");
    }

    #[test]
    fn backspace_on_empty_prompt_cancels() {
        let cmd = parse(Mode::TextEntry(EntryKind::Ex), &["Backspace"]);
        assert_eq!(cmd.operation, Some(Operation::NormalMode));
        let cmd = parse(Mode::TextEntry(EntryKind::Ex), &["w", "Escape"]);
        assert_eq!(cmd.operation, Some(Operation::NormalMode));
    }

    // -- Key scripts --------------------------------------------------------

    #[test]
    fn scripts_split_into_keys() {
        assert_eq!(
            parse_keys("ié<Esc>:w<CR><C-r><bs><lt>x<Up>"),
            vec!["i", "é", "Escape", ":", "w", "Enter", "CTRL-r", "Backspace", "<", "x", "ArrowUp"]
        );
        assert_eq!(parse_keys("a<b<>"), vec!["a", "<", "b", "<", ">"]);
        assert_eq!(parse_keys("<C-[>"), vec!["Escape"]);
    }

    #[test]
    fn formatted_scripts_parse_back() {
        let keys = parse_keys("A! <Tab><Esc>j<lt><C-v>");
        let script = format_keys(&keys);
        assert_eq!(script, "A! <Tab><Esc>j<lt><C-v>");
        assert_eq!(parse_keys(&script), keys);
    }
}
