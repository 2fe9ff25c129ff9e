//! Cells — the atomic unit of buffer text.
//!
//! A buffer line is a `Vec<Cell>`. Each cell holds exactly one grapheme
//! cluster, so combining marks, emoji ZWJ sequences and `\r` before a newline
//! all occupy a single column. Cells also carry the classification flags the
//! motion engine needs (`word_char`, `whitespace`) so word scans never
//! re-inspect the symbol.
//!
//! Besides plain text, a buffer can be built from a small rich-text tree
//! ([`RichNode`]): anchors define tags and links, images become a single
//! placeholder cell that the viewport expands to `cols` display columns.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// One line of buffer text.
pub type Line = Vec<Cell>;

/// Symbol used for image cells when the buffer is rendered back to text.
pub const IMAGE_SYMBOL: &str = "\u{FFFC}";

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// An inline image occupying `rows` × `cols` display cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub src: String,
    pub rows: usize,
    pub cols: usize,
}

impl Image {
    /// Create an image, treating zero dimensions as 1.
    #[must_use]
    pub fn new(src: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            src: src.into(),
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single grapheme of buffer text plus its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    symbol: String,
    word_char: bool,
    whitespace: bool,
    tag_dest: Option<String>,
    image: Option<Image>,
}

impl Cell {
    /// Create a cell for one grapheme.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        let first = symbol.chars().next();
        Self {
            symbol: symbol.to_string(),
            word_char: first.is_some_and(|c| c.is_alphanumeric() || c == '_'),
            whitespace: matches!(first, Some(' ' | '\t' | '\n')),
            tag_dest: None,
            image: None,
        }
    }

    /// Create an image placeholder cell.
    #[must_use]
    pub fn image(image: Image) -> Self {
        Self {
            symbol: IMAGE_SYMBOL.to_string(),
            word_char: false,
            whitespace: false,
            tag_dest: None,
            image: Some(image),
        }
    }

    /// Attach a link destination (the name of a tag).
    #[must_use]
    pub fn with_tag_dest(mut self, dest: impl Into<String>) -> Self {
        self.tag_dest = Some(dest.into());
        self
    }

    // -- Accessors ----------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Letters, digits and `_`.
    #[inline]
    #[must_use]
    pub const fn is_word_char(&self) -> bool {
        self.word_char
    }

    /// Space, tab or newline.
    #[inline]
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        self.whitespace
    }

    #[inline]
    #[must_use]
    pub fn tag_dest(&self) -> Option<&str> {
        self.tag_dest.as_deref()
    }

    #[inline]
    #[must_use]
    pub const fn image_ref(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// True when this cell is `symbol` exactly.
    #[inline]
    #[must_use]
    pub fn is(&self, symbol: &str) -> bool {
        self.symbol == symbol
    }

    /// Display width in terminal columns.
    ///
    /// Images span their `cols`. Tabs report 1; tab-stop expansion belongs
    /// to the viewport. Zero-width graphemes (control characters) still
    /// occupy one column so the cursor can sit on them.
    #[must_use]
    pub fn width(&self) -> usize {
        match &self.image {
            Some(image) => image.cols,
            None if self.symbol == "\t" => 1,
            None => UnicodeWidthStr::width(self.symbol.as_str()).max(1),
        }
    }

    /// The same cell with its letter case flipped, or `None` if the symbol
    /// has no case.
    #[must_use]
    pub fn toggled_case(&self) -> Option<Self> {
        if self.image.is_some() {
            return None;
        }
        let flipped = if self.symbol.chars().any(char::is_lowercase) {
            self.symbol.to_uppercase()
        } else {
            self.symbol.to_lowercase()
        };
        if flipped == self.symbol {
            return None;
        }
        let mut cell = Self::new(&flipped);
        cell.tag_dest.clone_from(&self.tag_dest);
        Some(cell)
    }
}

// ---------------------------------------------------------------------------
// Text conversion
// ---------------------------------------------------------------------------

/// Split a single line of text into grapheme cells.
#[must_use]
pub fn cells_from_str(text: &str) -> Line {
    text.graphemes(true).map(Cell::new).collect()
}

/// Split text on `\n` into lines of cells. Always yields at least one line.
#[must_use]
pub fn lines_from_str(text: &str) -> Vec<Line> {
    text.split('\n').map(cells_from_str).collect()
}

/// Split UTF-16 text into lines of cells. Surrogate pairs become one
/// grapheme; lone surrogate halves are dropped.
#[must_use]
pub fn lines_from_utf16(units: &[u16]) -> Vec<Line> {
    let text: String = char::decode_utf16(units.iter().copied())
        .filter_map(Result::ok)
        .collect();
    lines_from_str(&text)
}

/// Render a line back to a `String`.
#[must_use]
pub fn line_to_string(line: &[Cell]) -> String {
    line.iter().map(Cell::symbol).collect()
}

/// Render lines back to text joined with `\n`.
#[must_use]
pub fn lines_to_string(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| line_to_string(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Rich-text input
// ---------------------------------------------------------------------------

/// A node of structured initial content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichNode {
    /// Plain text; `\n` starts a new line.
    Text(String),

    /// An anchor. `name` defines a tag at the start of its content, and an
    /// `href` of the form `#dest` links every content cell to tag `dest`.
    Anchor {
        name: Option<String>,
        href: Option<String>,
        children: Vec<RichNode>,
    },

    /// An inline image.
    Image(Image),

    /// Any other element; only its content is kept.
    Element(Vec<RichNode>),
}

/// The result of flattening a rich-text tree.
#[derive(Debug, Default)]
pub struct RichText {
    pub lines: Vec<Line>,
    pub tags: Vec<(String, crate::position::Position)>,
}

impl RichText {
    /// Flatten a node list into lines of cells plus tag definitions.
    #[must_use]
    pub fn flatten(nodes: &[RichNode]) -> Self {
        let mut out = Self {
            lines: vec![Vec::new()],
            tags: Vec::new(),
        };
        for node in nodes {
            out.push_node(node, None);
        }
        out
    }

    fn push_node(&mut self, node: &RichNode, link: Option<&str>) {
        match node {
            RichNode::Text(text) => {
                for (i, segment) in text.split('\n').enumerate() {
                    if i > 0 {
                        self.lines.push(Vec::new());
                    }
                    let cells = cells_from_str(segment).into_iter().map(|cell| match link {
                        Some(dest) => cell.with_tag_dest(dest),
                        None => cell,
                    });
                    self.current_line().extend(cells);
                }
            }
            RichNode::Anchor {
                name,
                href,
                children,
            } => {
                if let Some(name) = name {
                    let here = crate::position::Position::new(
                        self.lines.len(),
                        self.current_line().len() + 1,
                    );
                    self.tags.push((name.clone(), here));
                }
                let dest = href
                    .as_deref()
                    .and_then(|h| h.strip_prefix('#'))
                    .or(link);
                for child in children {
                    self.push_node(child, dest);
                }
            }
            RichNode::Image(image) => {
                let mut cell = Cell::image(image.clone());
                if let Some(dest) = link {
                    cell = cell.with_tag_dest(dest);
                }
                self.current_line().push(cell);
            }
            RichNode::Element(children) => {
                for child in children {
                    self.push_node(child, link);
                }
            }
        }
    }

    fn current_line(&mut self) -> &mut Line {
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    // -- Classification -----------------------------------------------------

    #[test]
    fn classifies_word_and_whitespace() {
        assert!(Cell::new("a").is_word_char());
        assert!(Cell::new("_").is_word_char());
        assert!(Cell::new("7").is_word_char());
        assert!(!Cell::new(".").is_word_char());
        assert!(Cell::new(" ").is_whitespace());
        assert!(Cell::new("\t").is_whitespace());
        assert!(!Cell::new("x").is_whitespace());
    }

    #[test]
    fn graphemes_are_single_cells() {
        let cells = cells_from_str("e\u{301}x👍🏽");
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].symbol(), "e\u{301}");
    }

    #[test]
    fn utf16_pairs_join_and_lone_halves_drop() {
        let mut units: Vec<u16> = "a👍\nb".encode_utf16().collect();
        assert_eq!(lines_to_string(&lines_from_utf16(&units)), "a👍\nb");
        units.insert(1, 0xD800);
        units.push(0xDC00);
        let lines = lines_from_utf16(&units);
        assert_eq!(lines_to_string(&lines), "a👍\nb");
        assert_eq!(lines[0].len(), 2);
    }

    #[test]
    fn wide_cells_report_width_two() {
        assert_eq!(Cell::new("中").width(), 2);
        assert_eq!(Cell::new("a").width(), 1);
        assert_eq!(Cell::image(Image::new("x.png", 2, 5)).width(), 5);
    }

    // -- Round trip ---------------------------------------------------------

    #[test]
    fn text_round_trips() {
        for text in ["", "abc", "a\nb\n", "\n\n", "tab\there\r\nnext"] {
            assert_eq!(lines_to_string(&lines_from_str(text)), text);
        }
    }

    // -- Case ---------------------------------------------------------------

    #[test]
    fn toggled_case_flips_letters_only() {
        assert_eq!(Cell::new("a").toggled_case(), Some(Cell::new("A")));
        assert_eq!(Cell::new("Q").toggled_case(), Some(Cell::new("q")));
        assert_eq!(Cell::new("3").toggled_case(), None);
    }

    // -- Rich text ----------------------------------------------------------

    #[test]
    fn anchors_define_tags_and_links() {
        let nodes = vec![
            RichNode::Text("see ".into()),
            RichNode::Anchor {
                name: None,
                href: Some("#intro".into()),
                children: vec![RichNode::Text("intro".into())],
            },
            RichNode::Text("\n".into()),
            RichNode::Anchor {
                name: Some("intro".into()),
                href: None,
                children: vec![RichNode::Text("Intro".into())],
            },
            RichNode::Element(vec![RichNode::Image(Image::new("a.png", 0, 3))]),
        ];
        let rich = RichText::flatten(&nodes);
        assert_eq!(rich.lines.len(), 2);
        assert_eq!(line_to_string(&rich.lines[0]), "see intro");
        assert_eq!(rich.lines[0][4].tag_dest(), Some("intro"));
        assert_eq!(rich.lines[0][0].tag_dest(), None);
        assert_eq!(rich.tags, vec![("intro".to_string(), Position::new(2, 1))]);
        let image = rich.lines[1][5].image_ref().cloned();
        assert_eq!(image, Some(Image::new("a.png", 1, 3)));
    }
}
