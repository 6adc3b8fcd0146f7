//! Inline directives on the line that opens an extraction block
//!
//! ```text
//!  /**md file="new_name.md" trim=2 content="^\s*\/\/\s?(.*)$"
//! ```
//!
//! - `file=<name>`: write the block to `<name>`, relative to the destination
//!   directory of the file being scanned
//! - `trim=<n>`: drop the first `n` characters of every extracted line
//! - `content=<regex>`: keep only the last captured group of each line
//! - `stop=<regex>`: end the block on this regex instead of the configured stop

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"file=["']?(\w+.\w+)["']?\b"#).unwrap());
static TRIM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"trim=["']?(\d+)["']?\b"#).unwrap());
static CONTENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"content=["']?([^"']*)["']?"#).unwrap());
static STOP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"stop=["']?([^"']*)["']?"#).unwrap());

/// Settings parsed from one start line; live for one activation
#[derive(Debug, Clone, Default)]
pub struct InlineDirective {
    pub filename: Option<String>,
    pub trim: usize,
    pub content: Option<Regex>,
    pub stop: Option<Regex>,
}

impl InlineDirective {
    /// Parse every recognized token on `line`; absent tokens keep defaults
    pub fn parse(line: &str) -> Self {
        let filename = capture(&FILENAME_RE, line).map(str::to_string);
        let trim = capture(&TRIM_RE, line)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let content = capture(&CONTENT_RE, line).and_then(|p| inline_regex("content", p));
        let stop = capture(&STOP_RE, line).and_then(|p| inline_regex("stop", p));

        Self {
            filename,
            trim,
            content,
            stop,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.trim == 0 && self.content.is_none() && self.stop.is_none()
    }
}

fn capture<'h>(re: &Regex, line: &'h str) -> Option<&'h str> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Inline regexes come from scanned files, not config: a bad one is skipped
fn inline_regex(token: &str, pattern: &str) -> Option<Regex> {
    if pattern.is_empty() {
        return None;
    }
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Ignoring inline {}={:?}: {}", token, pattern, e);
            None
        }
    }
}
