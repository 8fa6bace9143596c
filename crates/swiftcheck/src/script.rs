//! Target-script detection and text normalization.
//!
//! The translator renders Sinhala, so "target script" means the Unicode
//! Sinhala block. Everything that decides whether scraped text looks like a
//! translation goes through the helpers here.

use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// Unicode block of the target script (Sinhala)
pub const TARGET_SCRIPT: RangeInclusive<char> = '\u{0D80}'..='\u{0DFF}';

/// Length of log previews
pub const PREVIEW_CHARS: usize = 50;

fn script_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\x{0D80}-\x{0DFF}]+").expect("valid script pattern"))
}

/// Check whether a single character belongs to the target script
#[must_use]
pub fn is_script_char(c: char) -> bool {
    TARGET_SCRIPT.contains(&c)
}

/// Count target-script code points in `text`
#[must_use]
pub fn script_char_count(text: &str) -> usize {
    text.chars().filter(|c| is_script_char(*c)).count()
}

/// Check whether `text` contains at least one target-script code point
#[must_use]
pub fn contains_script(text: &str) -> bool {
    text.chars().any(is_script_char)
}

/// First contiguous run of target-script characters, if any
#[must_use]
pub fn first_script_run(text: &str) -> Option<&str> {
    script_run_pattern().find(text).map(|m| m.as_str())
}

/// Collapse whitespace runs to single spaces, trim, and lowercase.
///
/// Comparison key for expected vs. actual output.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Length in characters (not bytes), used for every length threshold
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Truncated form of `text` for log lines
#[must_use]
pub fn preview(text: &str) -> String {
    if char_len(text) > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
