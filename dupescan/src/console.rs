//! Transient single-line status rendering.
//!
//! The status line is cosmetic: it elides long paths so the line fits the
//! terminal, but the recorded path strings are never altered. Nothing is
//! rendered when stderr is not a terminal.

use std::io::{self, Write};

use atty::Stream;

const CLEAR_LINE: &str = "\r\x1b[K";

/// Overwrite the current status line.
pub(crate) fn status(line: &str) {
    if !atty::is(Stream::Stderr) {
        return;
    }
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{CLEAR_LINE}{line}");
    let _ = stderr.flush();
}

/// Erase the status line, leaving the cursor at the start of a clean line.
pub(crate) fn clear() {
    if !atty::is(Stream::Stderr) {
        return;
    }
    let mut stderr = io::stderr();
    let _ = write!(stderr, "{CLEAR_LINE}");
    let _ = stderr.flush();
}

/// Elide `path` so that `prefix + path` fits on one terminal line.
///
/// Non-ASCII characters are weighted as three columns, mirroring how wide
/// glyphs typically render.
pub(crate) fn shrink(path: &str, prefix: &str) -> String {
    let max_len = columns().saturating_sub(prefix.len() + 4);

    let mut kept = String::new();
    let mut used = 0usize;
    for ch in path.chars() {
        used += if ch.is_ascii() { 1 } else { 3 };
        if used > max_len {
            // Drop the tail and mark the elision.
            for _ in 0..3 {
                kept.pop();
            }
            kept.push_str("...");
            return format!("{prefix} {kept}");
        }
        kept.push(ch);
    }

    format!("{prefix} {path}")
}

fn columns() -> usize {
    crossterm::terminal::size()
        .map(|(width, _)| usize::from(width))
        .unwrap_or(80)
}
