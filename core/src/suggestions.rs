//! Follow-up suggestion blocks.
//!
//! The model is asked to finish every answer with
//!
//! ```text
//! [SUGGESTIONS]
//! "First question?"
//! "Second question?"
//! [/SUGGESTIONS]
//! ```
//!
//! The block is machine input: it is parsed into chips and never shown.
//! A missing or malformed block simply means "no suggestions".

use lazy_static::lazy_static;
use regex::Regex;

pub const SUGGESTIONS_START: &str = "[SUGGESTIONS]";
pub const SUGGESTIONS_END: &str = "[/SUGGESTIONS]";

lazy_static! {
    /// First start marker followed by the first end marker after it
    static ref BLOCK_RE: Regex = Regex::new(r"(?s)\[SUGGESTIONS\](.*?)\[/SUGGESTIONS\]")
        .expect("suggestion block pattern is valid");
    /// Content between the first pair of double quotes on a line
    static ref QUOTED_RE: Regex = Regex::new(r#""([^"]*)""#).expect("quote pattern is valid");
}

/// Extracts the follow-up suggestions from a complete assistant reply.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    let Some(captures) = BLOCK_RE.captures(text) else {
        return Vec::new();
    };
    let body = captures.get(1).map_or("", |m| m.as_str()).trim();

    body.lines()
        .filter_map(|line| QUOTED_RE.captures(line))
        .filter_map(|quoted| quoted.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Removes every fully closed suggestion block. Unclosed blocks are left alone.
pub fn strip_suggestion_blocks(text: &str) -> String {
    BLOCK_RE.replace_all(text, "").into_owned()
}

/// Drops an unclosed trailing block, i.e. everything from the first start
/// marker that has no end marker after it.
pub fn strip_open_block(text: &str) -> &str {
    text.match_indices(SUGGESTIONS_START)
        .map(|(start, _)| start)
        .find(|&start| !text[start..].contains(SUGGESTIONS_END))
        .map_or(text, |start| &text[..start])
}

/// Length of the longest tail of `text` that could still grow into a start
/// marker, e.g. 5 for `"Hi [SUGG"`. A complete marker is not counted.
pub fn partial_marker_len(text: &str) -> usize {
    (1..SUGGESTIONS_START.len())
        .rev()
        .find(|&n| text.ends_with(&SUGGESTIONS_START[..n]))
        .unwrap_or(0)
}
