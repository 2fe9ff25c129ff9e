//! Ex command lines — the text typed after `:`.
//!
//! A line is an optional range followed by a command:
//!
//! | Range   | Lines                          |
//! |---------|--------------------------------|
//! | (none)  | the cursor line                |
//! | `N`     | line N                         |
//! | `N,M`   | lines N through M              |
//! | `N,$`   | line N through the last line   |
//! | `%`     | every line                     |
//!
//! | Command             | Meaning                                   |
//! |---------------------|-------------------------------------------|
//! | (empty)             | go to the (last) range line               |
//! | `/pat`              | search forward                            |
//! | `s/pat/rep/[gn]`    | substitute                                |
//! | `s`                 | repeat the last substitution              |
//! | `set args`          | options                                   |
//! | `w` / `write`       | write request to the host                 |
//! | anything else       | ex request to the host                    |

use std::sync::LazyLock;

use bitflags::bitflags;
use regex::Regex;
use tracing::warn;

use crate::buffer::Buffer;
use crate::cell::{Cell, Line, cells_from_str};
use crate::pattern::Pattern;

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

static RANGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:%|([1-9][0-9]*)(?:,([1-9][0-9]*|\$))?)").ok());

/// The line range prefix of an ex command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExRange {
    /// `%`
    Whole,
    /// `N`
    Line(usize),
    /// `N,M`
    Span(usize, usize),
    /// `N,$`
    ToEnd(usize),
}

impl ExRange {
    /// First and last line, ordered and clamped to the buffer.
    #[must_use]
    pub fn lines(self, line_count: usize) -> (usize, usize) {
        let clamp = |n: usize| n.clamp(1, line_count.max(1));
        let (first, last) = match self {
            Self::Whole => (1, line_count),
            Self::Line(n) => (n, n),
            Self::Span(a, b) => (a.min(b), a.max(b)),
            Self::ToEnd(n) => (n, line_count),
        };
        (clamp(first), clamp(last))
    }
}

/// Split the range prefix off an ex line.
fn split_range(line: &str) -> (Option<ExRange>, &str) {
    let Some(caps) = RANGE.as_ref().and_then(|re| re.captures(line)) else {
        return (None, line);
    };
    let Some(whole) = caps.get(0).filter(|m| !m.is_empty()) else {
        return (None, line);
    };
    let rest = &line[whole.end()..];
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<usize>().ok());
    let range = match (number(1), caps.get(2).map(|m| m.as_str())) {
        (None, _) => ExRange::Whole,
        (Some(first), None) => ExRange::Line(first),
        (Some(first), Some("$")) => ExRange::ToEnd(first),
        (Some(first), Some(_)) => ExRange::Span(first, number(2).unwrap_or(first)),
    };
    (Some(range), rest)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

bitflags! {
    /// Substitution flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct SubFlags: u8 {
        /// `g` — every match on each line, not just the first.
        const GLOBAL     = 0b0000_0001;
        /// `n` — count matches without replacing.
        const COUNT_ONLY = 0b0000_0010;
    }
}

/// A parsed `:s` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub pattern: Pattern,
    /// `&` stands for the matched text, `\&` for a literal ampersand.
    pub replacement: String,
    pub flags: SubFlags,
}

/// The command part of an ex line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    /// Nothing after the range.
    Empty,
    Search(String),
    Substitute(Substitution),
    /// `:s` with no pattern.
    RepeatSubstitution,
    Set(String),
    /// `:w [args]`
    Write(String),
    Other(String),
}

/// A parsed ex line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExLine {
    pub range: Option<ExRange>,
    pub command: ExCommand,
}

/// Parse the text typed after `:`.
#[must_use]
pub fn parse_ex(input: &str) -> ExLine {
    let (range, rest) = split_range(input.trim_start());
    let rest = rest.trim();
    let command = if rest.is_empty() {
        ExCommand::Empty
    } else if let Some(pattern) = rest.strip_prefix('/') {
        let pattern = split_at_unescaped(pattern, '/').map_or(pattern, |(p, _)| p);
        ExCommand::Search(unescape_delim(pattern, '/'))
    } else if let Some(body) = substitute_body(rest) {
        parse_substitute(body)
    } else {
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        match name {
            "set" | "se" => ExCommand::Set(args.trim().to_string()),
            "w" | "write" => ExCommand::Write(args.trim().to_string()),
            _ => ExCommand::Other(rest.to_string()),
        }
    };
    ExLine { range, command }
}

/// The text after `s`/`substitute` when `rest` is a substitution.
fn substitute_body(rest: &str) -> Option<&str> {
    let body = rest
        .strip_prefix("substitute")
        .or_else(|| rest.strip_prefix('s'))?;
    match body.chars().next() {
        None => Some(body),
        Some(c) if !c.is_alphanumeric() && !c.is_whitespace() && c != '"' && c != '|' => Some(body),
        Some(_) => None,
    }
}

fn parse_substitute(body: &str) -> ExCommand {
    let mut chars = body.chars();
    let Some(delim) = chars.next() else {
        return ExCommand::RepeatSubstitution;
    };
    let after_delim = chars.as_str();

    let (pattern, rest) = split_at_unescaped(after_delim, delim).unwrap_or((after_delim, ""));
    let (replacement, flags) = split_at_unescaped(rest, delim).unwrap_or((rest, ""));

    ExCommand::Substitute(Substitution {
        pattern: Pattern::compile(&unescape_delim(pattern, delim)),
        replacement: unescape_delim(replacement, delim),
        flags: parse_sub_flags(flags),
    })
}

/// Split a string at the first unescaped occurrence of `delim`.
///
/// `\<delim>` is treated as an escaped delimiter and not a split point.
fn split_at_unescaped(s: &str, delim: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (byte_idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == delim {
            return Some((&s[..byte_idx], &s[byte_idx + ch.len_utf8()..]));
        }
    }
    None
}

/// `\<delim>` → `<delim>`; every other `\X` passes through for the pattern
/// compiler or replacement expansion.
fn unescape_delim(s: &str, delim: char) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek() == Some(&delim) {
            result.push(delim);
            chars.next();
            continue;
        }
        result.push(ch);
    }
    result
}

fn parse_sub_flags(s: &str) -> SubFlags {
    s.chars().fold(SubFlags::empty(), |flags, ch| match ch {
        'g' => flags | SubFlags::GLOBAL,
        'n' => flags | SubFlags::COUNT_ONLY,
        _ => flags,
    })
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// What a substitution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubstituteReport {
    /// Matches replaced (or counted, with `n`).
    pub replacements: usize,
    /// Lines with at least one match.
    pub lines: usize,
    pub last_line: Option<usize>,
    /// The replacement cap stopped the run early.
    pub capped: bool,
}

/// Expand `&` in `replacement` to `matched`.
fn expand_replacement(replacement: &str, matched: &[Cell]) -> Line {
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => literal.push('\n'),
                Some('t') => literal.push('\t'),
                Some(other) => literal.push(other),
                None => literal.push('\\'),
            },
            '&' => {
                out.extend(cells_from_str(&literal));
                literal.clear();
                out.extend_from_slice(matched);
            }
            _ => literal.push(ch),
        }
    }
    out.extend(cells_from_str(&literal));
    out
}

/// Run `sub` over lines `first..=last` of `buf`.
///
/// Replacements resume after the inserted text, and an empty match also
/// steps over the next original cell, so a replacement that the pattern
/// matches again does not loop. `max` caps the total number of replacements
/// as a safety valve; hitting it stops the run wherever it is.
pub fn substitute(
    buf: &mut Buffer,
    first: usize,
    last: usize,
    sub: &Substitution,
    max: usize,
) -> SubstituteReport {
    let mut report = SubstituteReport::default();
    let global = sub.flags.contains(SubFlags::GLOBAL);
    let count_only = sub.flags.contains(SubFlags::COUNT_ONLY);

    for line in first..=last.min(buf.line_count()) {
        let mut column = 1;
        let mut hit_line = false;
        loop {
            if report.replacements >= max {
                warn!(max, line, "substitution cap reached");
                report.capped = true;
                if hit_line {
                    report.lines += 1;
                    report.last_line = Some(line);
                }
                return report;
            }
            // One past the end so `\>` can match at end of line.
            let end = buf.line_len(line) + 1;
            let Some(found) = (column..=end).find_map(|c| buf.match_at(line, c, &sub.pattern)) else {
                break;
            };
            report.replacements += 1;
            hit_line = true;

            let advance = if count_only {
                found.length
            } else {
                let matched: Line = buf
                    .line(line)
                    .map(|cells| cells[found.column - 1..found.column - 1 + found.length].to_vec())
                    .unwrap_or_default();
                let cells = expand_replacement(&sub.replacement, &matched);
                let inserted = cells.len();
                buf.splice(line, found.column, found.length, cells);
                inserted
            };
            column = found.column + advance + usize::from(found.length == 0);
            if !global {
                break;
            }
        }
        if hit_line {
            report.lines += 1;
            report.last_line = Some(line);
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sub(pattern: &str, replacement: &str, flags: SubFlags) -> Substitution {
        Substitution {
            pattern: Pattern::compile(pattern),
            replacement: replacement.into(),
            flags,
        }
    }

    // -- Ranges -------------------------------------------------------------

    #[test]
    fn range_prefixes() {
        assert_eq!(parse_ex("%s/a/b/").range, Some(ExRange::Whole));
        assert_eq!(parse_ex("3").range, Some(ExRange::Line(3)));
        assert_eq!(parse_ex("2,5d").range, Some(ExRange::Span(2, 5)));
        assert_eq!(parse_ex("2,$s/a/b/").range, Some(ExRange::ToEnd(2)));
        assert_eq!(parse_ex("set ts=2").range, None);
        assert_eq!(parse_ex("0").range, None);
    }

    #[test]
    fn range_lines_are_ordered_and_clamped() {
        assert_eq!(ExRange::Span(5, 2).lines(10), (2, 5));
        assert_eq!(ExRange::Line(40).lines(10), (10, 10));
        assert_eq!(ExRange::ToEnd(3).lines(10), (3, 10));
        assert_eq!(ExRange::Whole.lines(4), (1, 4));
    }

    // -- Commands -----------------------------------------------------------

    #[test]
    fn commands() {
        assert_eq!(parse_ex("").command, ExCommand::Empty);
        assert_eq!(parse_ex("12").command, ExCommand::Empty);
        assert_eq!(parse_ex("/fo.").command, ExCommand::Search("fo.".into()));
        assert_eq!(parse_ex("set ts=2 nows").command, ExCommand::Set("ts=2 nows".into()));
        assert_eq!(parse_ex("w").command, ExCommand::Write(String::new()));
        assert_eq!(parse_ex("write out.txt").command, ExCommand::Write("out.txt".into()));
        assert_eq!(parse_ex("q!").command, ExCommand::Other("q!".into()));
        assert_eq!(parse_ex("set").command, ExCommand::Set(String::new()));
        assert_eq!(parse_ex("s").command, ExCommand::RepeatSubstitution);
    }

    #[test]
    fn substitute_parsing() {
        assert_eq!(
            parse_ex("s/a\\/b/c/g").command,
            ExCommand::Substitute(sub("a/b", "c", SubFlags::GLOBAL))
        );
        assert_eq!(
            parse_ex("s#x#y").command,
            ExCommand::Substitute(sub("x", "y", SubFlags::empty()))
        );
        assert_eq!(
            parse_ex("s/x").command,
            ExCommand::Substitute(sub("x", "", SubFlags::empty()))
        );
        assert!(matches!(parse_ex("sort").command, ExCommand::Other(_)));
    }

    // -- Substitution -------------------------------------------------------

    #[test]
    fn global_substitution_over_whole_buffer() {
        let mut buf = Buffer::from_text("foo foo\nbaz foo");
        let report = substitute(&mut buf, 1, 2, &sub("foo", "bar", SubFlags::GLOBAL), 1000);
        assert_eq!(buf.contents(), "bar bar\nbaz bar");
        assert_eq!(report.replacements, 3);
        assert_eq!(report.last_line, Some(2));
    }

    #[test]
    fn without_g_only_first_match_per_line() {
        let mut buf = Buffer::from_text("aaa\naa");
        substitute(&mut buf, 1, 2, &sub("a", "b", SubFlags::empty()), 1000);
        assert_eq!(buf.contents(), "baa\nba");
    }

    #[test]
    fn self_matching_replacement_terminates() {
        let mut buf = Buffer::from_text("a a");
        let report = substitute(&mut buf, 1, 1, &sub("a", "aa", SubFlags::GLOBAL), 1000);
        assert_eq!(buf.contents(), "aa aa");
        assert!(!report.capped);
    }

    #[test]
    fn cap_stops_partway() {
        let mut buf = Buffer::from_text("xxxxx");
        let report = substitute(&mut buf, 1, 1, &sub("x", "y", SubFlags::GLOBAL), 3);
        assert_eq!(buf.contents(), "yyyxx");
        assert!(report.capped);
        assert_eq!((report.lines, report.last_line), (1, Some(1)));
    }

    #[test]
    fn empty_matches_step_past_their_replacement() {
        let mut buf = Buffer::from_text("ab cd");
        let report = substitute(&mut buf, 1, 1, &sub("\\>", "X", SubFlags::GLOBAL), 1000);
        assert_eq!(buf.contents(), "abX cdX");
        assert_eq!(report.replacements, 2);
        assert!(!report.capped);

        let mut buf = Buffer::from_text("ab cd");
        substitute(&mut buf, 1, 1, &sub("\\<", "<", SubFlags::GLOBAL), 1000);
        assert_eq!(buf.contents(), "<ab <cd");
    }

    #[test]
    fn ampersand_inserts_match_and_count_only_leaves_text() {
        let mut buf = Buffer::from_text("cat");
        substitute(&mut buf, 1, 1, &sub("cat", "[&] \\&", SubFlags::empty()), 1000);
        assert_eq!(buf.contents(), "[cat] &");

        let mut buf = Buffer::from_text("a b a");
        let report = substitute(&mut buf, 1, 1, &sub("a", "z", SubFlags::GLOBAL | SubFlags::COUNT_ONLY), 1000);
        assert_eq!(buf.contents(), "a b a");
        assert_eq!(report.replacements, 2);
    }
}
