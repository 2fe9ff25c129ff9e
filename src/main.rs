// SPDX-License-Identifier: MIT
//
// n-vi — a headless driver for the n-modal editing engine.
//
// It loads a text, plays a key script against it, and prints the result.
// There is no terminal: this is how the engine is exercised from scripts
// and tests.
//
//   file / stdin ──▶ Buffer ──▶ Session ◀── key script (<Esc>, <CR>, <C-r>)
//                                  │
//                                  ├──▶ stdout: the final buffer
//                                  └──▶ stderr: the last status message
//
// The engine never touches the file system. `:w` and `:q` reach this
// binary through the `Host` trait:
//
//   :w [file]  → FileHost writes the range to `file`, the loaded file, or stdout
//   :q         → acknowledged; the rest of the script is skipped

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use n_modal::buffer::Buffer;
use n_modal::host::{ExRequest, ExResponse, Host, MemoryClipboard, WriteRequest};
use n_modal::keymap::parse_keys;
use n_modal::session::Session;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`N_VI_LOG=debug`).
const LOG_ENV: &str = "N_VI_LOG";

// ─── Arguments ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "n-vi", version, about = "Play a Vi key script over a text")]
struct Args {
    /// Key script in `<Esc>` notation
    #[arg(short, long, default_value = "")]
    keys: String,

    /// Window height used for scrolling and H/M/L
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u16).range(1..))]
    rows: u16,

    /// Window width used for soft wrap
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u16).range(1..))]
    cols: u16,

    /// File to edit; stdin when absent or `-`
    file: Option<PathBuf>,
}

impl Args {
    /// The file to read and write, unless input comes from stdin.
    fn input(&self) -> Option<&Path> {
        self.file.as_deref().filter(|path| *path != Path::new("-"))
    }
}

// ─── Host ───────────────────────────────────────────────────────────────────

/// Handles `:w` and `:q` for the driver.
///
/// `:w` writes to its argument, else to the loaded file, else to `out`.
struct FileHost<W> {
    path: Option<PathBuf>,
    out: W,
    quit: bool,
}

impl<W: Write> FileHost<W> {
    const fn new(path: Option<PathBuf>, out: W) -> Self {
        Self {
            path,
            out,
            quit: false,
        }
    }
}

impl<W: Write> Host for FileHost<W> {
    fn write(&mut self, request: &WriteRequest) -> Option<String> {
        let lines = request.range.1 + 1 - request.range.0;
        let mut text = request.text.clone();
        text.push('\n');
        let target = if request.args.is_empty() {
            self.path.clone()
        } else {
            Some(PathBuf::from(&request.args))
        };
        let Some(path) = target else {
            if let Err(e) = self.out.write_all(text.as_bytes()) {
                warn!(error = %e, "write to stdout failed");
                return Some(format!("Can't write: {e}"));
            }
            return None;
        };
        match fs::write(&path, text) {
            Ok(()) => {
                info!(path = %path.display(), lines, "buffer written");
                Some(format!("\"{}\" {lines}L written", path.display()))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "write failed");
                Some(format!("\"{}\" can't write: {e}", path.display()))
            }
        }
    }

    fn ex_command(&mut self, request: &ExRequest) -> ExResponse {
        match request.command.as_str() {
            "q" | "q!" | "quit" | "quit!" => {
                debug!("quit requested");
                self.quit = true;
                ExResponse::handled(None)
            }
            _ => ExResponse::default(),
        }
    }
}

// ─── Driver ─────────────────────────────────────────────────────────────────

/// Play `args.keys` over `text`. Stops early after `:q`.
fn run<W: Write>(text: &str, args: &Args, out: W) -> Session<MemoryClipboard, FileHost<W>> {
    let buffer = Buffer::from_text(text.strip_suffix('\n').unwrap_or(text));
    let host = FileHost::new(args.input().map(Path::to_path_buf), out);
    let mut session = Session::with_host(buffer, MemoryClipboard::new(), host);
    session.set_size(usize::from(args.rows), usize::from(args.cols));

    let keys = parse_keys(&args.keys);
    debug!(keys = keys.len(), "playing key script");
    for key in &keys {
        session.handle_key(key);
        if session.host().quit {
            break;
        }
    }
    session
}

fn read_input(file: Option<&Path>) -> io::Result<String> {
    match file {
        Some(path) if path.exists() => fs::read_to_string(path),
        Some(_) => Ok(String::new()),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    init_logging();

    let args = Args::parse();

    let text = read_input(args.input()).unwrap_or_else(|e| {
        eprintln!("n-vi: can't read input: {e}");
        process::exit(1);
    });

    let mut session = run(&text, &args, io::stdout());

    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", session.text()) {
        eprintln!("n-vi: {e}");
        process::exit(1);
    }
    if let Some(message) = session.take_message() {
        eprintln!("{message}");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("n-vi").chain(list.iter().copied()))
    }

    fn script(keys: &str) -> Args {
        Args {
            keys: keys.to_string(),
            ..args(&[]).unwrap()
        }
    }

    // ── Arguments ─────────────────────────────────────────────────────────

    #[test]
    fn parses_keys_size_and_file() {
        let parsed = args(&["--keys", "dd", "--rows", "10", "--cols", "40", "notes.txt"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                keys: "dd".to_string(),
                rows: 10,
                cols: 40,
                file: Some(PathBuf::from("notes.txt")),
            }
        );
    }

    #[test]
    fn dash_means_stdin() {
        assert_eq!(args(&["-k", "x", "-"]).unwrap().input(), None);
        assert_eq!(args(&["a.txt"]).unwrap().input(), Some(Path::new("a.txt")));
    }

    #[test]
    fn defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!((parsed.keys.as_str(), parsed.rows, parsed.cols), ("", 24, 80));
        assert_eq!(parsed.file, None);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--keys"]).is_err());
        assert!(args(&["--rows", "0"]).is_err());
        assert!(args(&["--cols", "wide"]).is_err());
        assert!(args(&["--frob"]).is_err());
        assert!(args(&["a.txt", "b.txt"]).is_err());
    }

    // ── Driver ────────────────────────────────────────────────────────────

    #[test]
    fn plays_the_script() {
        let session = run("hello world\n", &script("dwA!<Esc>"), Vec::new());
        assert_eq!(session.text(), "world!");
    }

    #[test]
    fn write_without_a_file_goes_to_out() {
        let session = run("a\nb\n", &script("x:w<CR>"), Vec::new());
        assert_eq!(session.host().out, b"\nb\n");
    }

    #[test]
    fn write_to_a_named_file() {
        let path = std::env::temp_dir().join(format!("n-vi-write-{}.txt", process::id()));
        let keys = format!("ix<Esc>:w {}<CR>", path.display());
        let mut session = run("abc", &script(&keys), Vec::new());
        assert_eq!(fs::read_to_string(&path).unwrap(), "xabc\n");
        assert_eq!(
            session.take_message(),
            Some(format!("\"{}\" 1L written", path.display()))
        );
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn quit_stops_the_script() {
        let session = run("abc", &script("x:q<CR>x"), Vec::new());
        assert!(session.host().quit);
        assert_eq!(session.text(), "bc");
    }

    #[test]
    fn unknown_commands_still_report() {
        let mut session = run("abc", &script(":wq<CR>"), Vec::new());
        assert_eq!(session.take_message().as_deref(), Some("Unknown ex command: wq"));
    }
}
