//! Engine options — the `:set` system.
//!
//! # Supported syntax
//!
//! | Syntax           | Effect                        |
//! |------------------|-------------------------------|
//! | `:set option`    | Enable boolean / show numeric |
//! | `:set nooption`  | Disable boolean               |
//! | `:set option!`   | Toggle boolean                |
//! | `:set option?`   | Query current value           |
//! | `:set option=N`  | Assign numeric value          |
//! | `:set`           | Show changed options          |
//! | `:set all`       | Show all options              |
//!
//! # Option names
//!
//! | Full name          | Abbrev | Type    | Default |
//! |--------------------|--------|---------|---------|
//! | `tabstop`          | `ts`   | integer | 8       |
//! | `shiftwidth`       | `sw`   | integer | 4       |
//! | `scrolloff`        | `so`   | integer | 4       |
//! | `undolevels`       | `ul`   | integer | 100     |
//! | `maxsubstitutions` | `msub` | integer | 1000    |
//! | `wrapscan`         | `ws`   | bool    | true    |

use crate::error::{EditError, EditResult};

/// A parsed `:set` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    /// `:set option` — enable a boolean option.
    On(String),

    /// `:set nooption` — disable a boolean option.
    Off(String),

    /// `:set option!` — toggle a boolean option.
    Toggle(String),

    /// `:set option?` — query the current value.
    Query(String),

    /// `:set option=value` — assign a value.
    Assign(String, String),

    /// `:set` with no arguments — show changed options.
    ShowChanged,

    /// `:set all` — show all options.
    ShowAll,
}

/// The full name for `name` if it is a known boolean option.
#[must_use]
pub fn bool_option(name: &str) -> Option<&'static str> {
    match name {
        "wrapscan" | "ws" => Some("wrapscan"),
        _ => None,
    }
}

/// The full name for `name` if it is a known numeric option.
#[must_use]
pub fn numeric_option(name: &str) -> Option<&'static str> {
    match name {
        "tabstop" | "ts" => Some("tabstop"),
        "shiftwidth" | "sw" => Some("shiftwidth"),
        "scrolloff" | "so" => Some("scrolloff"),
        "undolevels" | "ul" => Some("undolevels"),
        "maxsubstitutions" | "msub" => Some("maxsubstitutions"),
        _ => None,
    }
}

/// Parse the full `:set` arguments string into directives.
///
/// Multiple space-separated arguments are supported (`:set ts=4 nows`).
/// An empty argument string produces [`SetDirective::ShowChanged`].
#[must_use]
pub fn parse_set(args: &str) -> Vec<SetDirective> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return vec![SetDirective::ShowChanged];
    }
    trimmed.split_whitespace().map(parse_set_arg).collect()
}

/// Parse a single `:set` argument into a directive.
#[must_use]
pub fn parse_set_arg(arg: &str) -> SetDirective {
    if arg == "all" {
        return SetDirective::ShowAll;
    }
    if let Some((name, value)) = arg.split_once('=') {
        return SetDirective::Assign(name.to_string(), value.to_string());
    }
    if let Some(name) = arg.strip_suffix('?') {
        return SetDirective::Query(name.to_string());
    }
    if let Some(name) = arg.strip_suffix('!') {
        return SetDirective::Toggle(name.to_string());
    }
    // Only strip "no" when the rest is a boolean option name.
    if let Some(name) = arg.strip_prefix("no") {
        if bool_option(name).is_some() {
            return SetDirective::Off(name.to_string());
        }
    }
    if numeric_option(arg).is_some() {
        return SetDirective::Query(arg.to_string());
    }
    SetDirective::On(arg.to_string())
}

/// `"name"` when true, `"noname"` when false.
#[must_use]
pub fn format_bool(name: &str, value: bool) -> String {
    if value {
        name.to_string()
    } else {
        format!("no{name}")
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub tabstop: usize,
    pub shiftwidth: usize,
    pub scrolloff: usize,
    pub wrapscan: bool,
    pub undolevels: usize,
    /// Substitution safety valve: the most replacements one `:s` makes.
    pub maxsubstitutions: usize,
}

impl Options {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tabstop: 8,
            shiftwidth: 4,
            scrolloff: 4,
            wrapscan: true,
            undolevels: 100,
            maxsubstitutions: 1000,
        }
    }

    fn numeric_mut(&mut self, name: &str) -> &mut usize {
        match name {
            "tabstop" => &mut self.tabstop,
            "shiftwidth" => &mut self.shiftwidth,
            "scrolloff" => &mut self.scrolloff,
            "undolevels" => &mut self.undolevels,
            _ => &mut self.maxsubstitutions,
        }
    }

    fn numeric(&self, name: &str) -> usize {
        match name {
            "tabstop" => self.tabstop,
            "shiftwidth" => self.shiftwidth,
            "scrolloff" => self.scrolloff,
            "undolevels" => self.undolevels,
            _ => self.maxsubstitutions,
        }
    }

    /// `name=value` or `[no]name`, for one full option name.
    fn show(&self, name: &str) -> String {
        if bool_option(name).is_some() {
            format_bool(name, self.wrapscan)
        } else {
            format!("{name}={}", self.numeric(name))
        }
    }

    /// Apply one `:set` command line. Returns the text to display, if any.
    ///
    /// # Errors
    ///
    /// [`EditError::UnknownOption`] for an unrecognised name and
    /// [`EditError::InvalidArgument`] for a bad value. Directives before the
    /// failing one stay applied.
    pub fn set(&mut self, args: &str) -> EditResult<Option<String>> {
        let mut shown = Vec::new();
        for directive in parse_set(args) {
            match directive {
                SetDirective::On(name) | SetDirective::Off(name) | SetDirective::Toggle(name)
                    if numeric_option(&name).is_some() =>
                {
                    return Err(EditError::InvalidArgument(name));
                }
                SetDirective::On(name) => {
                    known_bool(&name)?;
                    self.wrapscan = true;
                }
                SetDirective::Off(name) => {
                    known_bool(&name)?;
                    self.wrapscan = false;
                }
                SetDirective::Toggle(name) => {
                    known_bool(&name)?;
                    self.wrapscan = !self.wrapscan;
                }
                SetDirective::Query(name) => {
                    let full = bool_option(&name)
                        .or_else(|| numeric_option(&name))
                        .ok_or(EditError::UnknownOption(name))?;
                    shown.push(self.show(full));
                }
                SetDirective::Assign(name, value) => {
                    let Some(full) = numeric_option(&name) else {
                        return Err(if bool_option(&name).is_some() {
                            EditError::InvalidArgument(format!("{name}={value}"))
                        } else {
                            EditError::UnknownOption(name)
                        });
                    };
                    let parsed = value
                        .parse::<usize>()
                        .ok()
                        .filter(|&n| n > 0 || full == "scrolloff" || full == "undolevels")
                        .ok_or_else(|| EditError::InvalidArgument(format!("{name}={value}")))?;
                    *self.numeric_mut(full) = parsed;
                }
                SetDirective::ShowChanged => {
                    let defaults = Self::new();
                    shown.extend(
                        ALL_OPTIONS
                            .iter()
                            .filter(|name| self.show(name) != defaults.show(name))
                            .map(|name| self.show(name)),
                    );
                }
                SetDirective::ShowAll => {
                    shown.extend(ALL_OPTIONS.iter().map(|name| self.show(name)));
                }
            }
        }
        Ok((!shown.is_empty()).then(|| shown.join("  ")))
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

const ALL_OPTIONS: [&str; 6] = [
    "maxsubstitutions",
    "scrolloff",
    "shiftwidth",
    "tabstop",
    "undolevels",
    "wrapscan",
];

fn known_bool(name: &str) -> EditResult<&'static str> {
    bool_option(name).ok_or_else(|| EditError::UnknownOption(name.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── parse_set_arg ─────────────────────────────────────────────────────

    #[test]
    fn parse_forms() {
        assert_eq!(parse_set_arg("ws"), SetDirective::On("ws".into()));
        assert_eq!(parse_set_arg("nowrapscan"), SetDirective::Off("wrapscan".into()));
        assert_eq!(parse_set_arg("ws!"), SetDirective::Toggle("ws".into()));
        assert_eq!(parse_set_arg("ts?"), SetDirective::Query("ts".into()));
        assert_eq!(parse_set_arg("ts"), SetDirective::Query("ts".into()));
        assert_eq!(
            parse_set_arg("sw=2"),
            SetDirective::Assign("sw".into(), "2".into())
        );
        assert_eq!(parse_set_arg("all"), SetDirective::ShowAll);
    }

    #[test]
    fn no_prefix_only_strips_for_bool_options() {
        assert_eq!(parse_set_arg("notanoption"), SetDirective::On("notanoption".into()));
    }

    #[test]
    fn empty_args_show_changed() {
        assert_eq!(parse_set(""), vec![SetDirective::ShowChanged]);
        assert_eq!(parse_set("  ts=2 nows ").len(), 2);
    }

    // ── Options::set ──────────────────────────────────────────────────────

    #[test]
    fn defaults() {
        let opts = Options::default();
        assert_eq!(opts.tabstop, 8);
        assert_eq!(opts.shiftwidth, 4);
        assert_eq!(opts.scrolloff, 4);
        assert!(opts.wrapscan);
        assert_eq!(opts.undolevels, 100);
        assert_eq!(opts.maxsubstitutions, 1000);
    }

    #[test]
    fn set_and_query() {
        let mut opts = Options::new();
        assert_eq!(opts.set("ts=4 nows"), Ok(None));
        assert_eq!(opts.tabstop, 4);
        assert!(!opts.wrapscan);
        assert_eq!(opts.set("ts? ws?"), Ok(Some("tabstop=4  nowrapscan".into())));
        assert_eq!(opts.set("ws!"), Ok(None));
        assert!(opts.wrapscan);
    }

    #[test]
    fn show_changed_lists_only_non_defaults() {
        let mut opts = Options::new();
        assert_eq!(opts.set(""), Ok(None));
        opts.set("sw=2").unwrap();
        assert_eq!(opts.set(""), Ok(Some("shiftwidth=2".into())));
    }

    #[test]
    fn errors() {
        let mut opts = Options::new();
        assert_eq!(opts.set("bogus"), Err(EditError::UnknownOption("bogus".into())));
        assert_eq!(opts.set("bogus=1"), Err(EditError::UnknownOption("bogus".into())));
        assert_eq!(opts.set("ts=x"), Err(EditError::InvalidArgument("ts=x".into())));
        assert_eq!(opts.set("ts=0"), Err(EditError::InvalidArgument("ts=0".into())));
        assert_eq!(opts.set("ts!"), Err(EditError::InvalidArgument("ts".into())));
        assert_eq!(opts.set("so=0"), Ok(None));
    }
}
