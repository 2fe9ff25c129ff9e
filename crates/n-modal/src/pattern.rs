//! Pattern matcher — a deliberately tiny regex dialect for `/`, `?`, `*`
//! and `:s`.
//!
//! # Syntax
//!
//! | Atom        | Matches                                           |
//! |-------------|---------------------------------------------------|
//! | `x`         | the literal cell `x`                              |
//! | `.`         | any cell (fails at end of line)                   |
//! | `\<`        | zero-width: a word character starts here          |
//! | `\>`        | zero-width: a word character ended just before    |
//! | `\x`        | literal `x` (escape)                              |
//! | `( ... )`   | group; nests, and is itself a concatenation       |
//!
//! There is no alternation, no quantifier and no backtracking. A pattern is
//! a concatenation of nodes; matching threads the column through each node
//! and fails as soon as one fails. Compilation never fails: unbalanced `)`
//! is a literal and an unclosed `(` closes at the end of the source.

use unicode_segmentation::UnicodeSegmentation;

use crate::cell::Cell;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One compiled element of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Literal(String),
    Wildcard,
    WordStart,
    WordEnd,
    Group(Vec<Node>),
}

impl Node {
    /// Match at 0-based `idx`, returning the index after the match and the
    /// number of cells consumed.
    fn match_at(&self, cells: &[Cell], idx: usize) -> Option<(usize, usize)> {
        match self {
            Self::Literal(symbol) => cells
                .get(idx)
                .filter(|cell| cell.is(symbol))
                .map(|_| (idx + 1, 1)),
            Self::Wildcard => (idx < cells.len()).then_some((idx + 1, 1)),
            Self::WordStart => {
                let here = cells.get(idx)?;
                let prev_word = idx > 0 && cells[idx - 1].is_word_char();
                (here.is_word_char() && !prev_word).then_some((idx, 0))
            }
            Self::WordEnd => {
                if idx == 0 || idx > cells.len() {
                    return None;
                }
                let prev_word = cells[idx - 1].is_word_char();
                let here_word = cells.get(idx).is_some_and(Cell::is_word_char);
                (prev_word && !here_word).then_some((idx, 0))
            }
            Self::Group(nodes) => match_sequence(nodes, cells, idx),
        }
    }
}

fn match_sequence(nodes: &[Node], cells: &[Cell], mut idx: usize) -> Option<(usize, usize)> {
    let mut length = 0;
    for node in nodes {
        let (next, len) = node.match_at(cells, idx)?;
        idx = next;
        length += len;
    }
    Some((idx, length))
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A successful match within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// 1-based column where the match starts.
    pub column: usize,
    /// Number of cells matched (zero for pure assertions).
    pub length: usize,
}

/// A compiled search pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    nodes: Vec<Node>,
}

impl Pattern {
    /// Compile `source`.
    #[must_use]
    pub fn compile(source: &str) -> Self {
        let graphemes: Vec<&str> = source.graphemes(true).collect();
        let mut pos = 0;
        let nodes = parse_sequence(&graphemes, &mut pos, 0);
        Self {
            source: source.to_string(),
            nodes,
        }
    }

    /// A pattern matching `text` as a whole word: `\<text\>`.
    #[must_use]
    pub fn whole_word(text: &str) -> Self {
        Self::compile(&format!("\\<{}\\>", escape(text)))
    }

    /// A pattern matching `text` literally.
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::compile(&escape(text))
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Try to match exactly at 1-based `column` of `cells`.
    #[must_use]
    pub fn match_at(&self, cells: &[Cell], column: usize) -> Option<Match> {
        let start = column.checked_sub(1)?;
        match_sequence(&self.nodes, cells, start).map(|(_, length)| Match {
            column,
            length,
        })
    }
}

/// Escape every character that has meaning in the pattern dialect.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '.' | '(' | ')') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn parse_sequence(src: &[&str], pos: &mut usize, depth: usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    while *pos < src.len() {
        let g = src[*pos];
        *pos += 1;
        match g {
            "\\" => match src.get(*pos) {
                Some(&"<") => {
                    *pos += 1;
                    nodes.push(Node::WordStart);
                }
                Some(&">") => {
                    *pos += 1;
                    nodes.push(Node::WordEnd);
                }
                Some(next) => {
                    *pos += 1;
                    nodes.push(Node::Literal((*next).to_string()));
                }
                None => nodes.push(Node::Literal("\\".to_string())),
            },
            "(" => nodes.push(Node::Group(parse_sequence(src, pos, depth + 1))),
            ")" if depth > 0 => return nodes,
            "." => nodes.push(Node::Wildcard),
            other => nodes.push(Node::Literal(other.to_string())),
        }
    }
    nodes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::cells_from_str;
    use pretty_assertions::assert_eq;

    fn all_matches(pattern: &str, text: &str) -> Vec<Match> {
        let p = Pattern::compile(pattern);
        let cells = cells_from_str(text);
        (1..=cells.len()).filter_map(|c| p.match_at(&cells, c)).collect()
    }

    // -- Atoms --------------------------------------------------------------

    #[test]
    fn literal_matches_exact_column_only() {
        let p = Pattern::compile("lo");
        let cells = cells_from_str("hello");
        assert_eq!(p.match_at(&cells, 4), Some(Match { column: 4, length: 2 }));
        assert_eq!(p.match_at(&cells, 3), None);
    }

    #[test]
    fn wildcard_fails_at_end_of_line() {
        let p = Pattern::compile("o.");
        let cells = cells_from_str("foo");
        assert_eq!(p.match_at(&cells, 2), Some(Match { column: 2, length: 2 }));
        assert_eq!(p.match_at(&cells, 3), None);
    }

    #[test]
    fn escaped_characters_are_literal() {
        assert_eq!(all_matches("a\\.b", "axb a.b"), vec![Match { column: 5, length: 3 }]);
    }

    // -- Word boundaries ----------------------------------------------------

    #[test]
    fn whole_word_matches_only_standalone_occurrence() {
        assert_eq!(
            all_matches("\\<cat\\>", "concatcat cat"),
            vec![Match { column: 11, length: 3 }]
        );
    }

    #[test]
    fn word_start_alone_is_zero_width() {
        let starts: Vec<usize> = all_matches("\\<", "ab cd").iter().map(|m| m.column).collect();
        assert_eq!(starts, vec![1, 4]);
        assert!(all_matches("\\<", "ab cd").iter().all(|m| m.length == 0));
    }

    // -- Groups -------------------------------------------------------------

    #[test]
    fn groups_nest_and_concatenate() {
        assert_eq!(all_matches("a(b(c))d", "xabcdx"), vec![Match { column: 2, length: 4 }]);
    }

    #[test]
    fn unbalanced_parens_do_not_fail_compilation() {
        assert_eq!(all_matches("a)", "ba)"), vec![Match { column: 2, length: 2 }]);
        assert_eq!(all_matches("(ab", "xab"), vec![Match { column: 2, length: 2 }]);
    }

    #[test]
    fn literal_escapes_metacharacters() {
        let p = Pattern::literal("a.b");
        assert_eq!(p.source(), "a\\.b");
        assert_eq!(p.match_at(&cells_from_str("axb"), 1), None);
    }
}
