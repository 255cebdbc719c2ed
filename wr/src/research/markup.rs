//! Cleanup of raw model output
//!
//! Reasoning models wrap their chain of thought in `<think>...</think>`; none
//! of that belongs in a summary or a JSON payload.

use serde::de::DeserializeOwned;
use tracing::debug;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Remove every complete `<think>...</think>` segment
///
/// Pairs are matched by depth, so nested and sequential segments both go.
/// An opener without a closer, or a closer without an opener, is ordinary
/// text and stays. Removal repeats until no complete pair remains, which
/// makes the function idempotent. The result is not trimmed.
pub fn strip_thinking_tokens(text: &str) -> String {
    debug!(len = text.len(), "strip_thinking_tokens: called");
    let mut current = text.to_string();
    loop {
        let next = strip_pass(&current);
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// One left-to-right pass removing the outermost matched pairs
fn strip_pass(text: &str) -> String {
    let mut open_stack: Vec<usize> = Vec::new();
    let mut ranges: Vec<(usize, usize)> = Vec::new();

    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with(THINK_OPEN) {
            open_stack.push(i);
            i += THINK_OPEN.len();
        } else if rest.starts_with(THINK_CLOSE) {
            let end = i + THINK_CLOSE.len();
            if let Some(start) = open_stack.pop() {
                // A pair nested in an already recorded one is covered by it
                // only once the outer pair closes; drop inner ranges then
                ranges.retain(|&(s, _)| s < start);
                ranges.push((start, end));
            }
            i = end;
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    if ranges.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in ranges {
        out.push_str(&text[cursor..start]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Cut text at the first `<think>` that never closes
///
/// Meant for answers the provider truncated at the token limit, where an
/// open thinking segment runs to the end. Apply after
/// [`strip_thinking_tokens`] so complete pairs are already gone.
pub fn drop_unclosed_thinking(text: &str) -> &str {
    match text.find(THINK_OPEN) {
        Some(start) => {
            debug!(start, dropped = text.len() - start, "drop_unclosed_thinking: cutting open segment");
            &text[..start]
        }
        None => text,
    }
}

/// Parse a JSON object out of model output
///
/// Thinking segments are stripped first. If the remainder does not parse as
/// a whole, the span from the first `{` to the last `}` is tried, which
/// covers answers wrapped in code fences or chatter.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    let cleaned = strip_thinking_tokens(text);
    let cleaned = cleaned.trim();
    if let Ok(value) = serde_json::from_str(cleaned) {
        return Some(value);
    }
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        debug!("parse_json_object: no object span");
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}
