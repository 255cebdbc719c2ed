//! Formatting search results for the model and for citations

use std::collections::HashSet;

use tracing::{debug, warn};

use super::SearchResponse;

/// Characters per token used to size the raw-content budget
pub const CHARS_PER_TOKEN: usize = 4;

/// Marker appended to raw content cut at the budget
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Render search results as one text blob, one section per unique URL
///
/// The first result for a URL wins. When `include_raw_content` is set, each
/// source's full page text is cut to `max_tokens_per_source` tokens.
pub fn deduplicate_and_format_sources(
    response: &SearchResponse,
    max_tokens_per_source: usize,
    include_raw_content: bool,
) -> String {
    debug!(
        result_count = response.results.len(),
        max_tokens_per_source, include_raw_content, "deduplicate_and_format_sources: called"
    );

    let mut seen = HashSet::new();
    let mut formatted = String::from("Sources:\n\n");

    for source in response.results.iter().filter(|r| seen.insert(r.url.as_str())) {
        formatted.push_str(&format!("Source {}:\n===\n", source.title));
        formatted.push_str(&format!("URL: {}\n===\n", source.url));
        formatted.push_str(&format!("Most relevant content from source: {}\n===\n", source.content));

        if include_raw_content {
            let raw = match source.raw_content.as_deref() {
                Some(raw) => raw,
                None => {
                    warn!(url = %source.url, "deduplicate_and_format_sources: no raw content for source");
                    ""
                }
            };
            formatted.push_str(&format!(
                "Full source content limited to {} tokens: {}\n\n",
                max_tokens_per_source,
                truncate_chars(raw, max_tokens_per_source * CHARS_PER_TOKEN)
            ));
        }
    }

    formatted.trim().to_string()
}

/// Render one citation line per result: `* {title} : {url}`
pub fn format_sources(response: &SearchResponse) -> String {
    debug!(result_count = response.results.len(), "format_sources: called");
    response
        .results
        .iter()
        .map(|r| format!("* {} : {}", r.title, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `s` to `limit` characters, marking the cut
fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}{}", &s[..idx], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchResult;

    fn result(title: &str, url: &str, content: &str, raw: Option<&str>) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            raw_content: raw.map(String::from),
        }
    }

    #[test]
    fn test_format_single_source_with_raw_content() {
        let response = SearchResponse {
            results: vec![result("Rust", "https://rust-lang.org", "A language", Some("Full page"))],
        };

        let blob = deduplicate_and_format_sources(&response, 1000, true);
        assert_eq!(
            blob,
            "Sources:\n\nSource Rust:\n===\nURL: https://rust-lang.org\n===\n\
             Most relevant content from source: A language\n===\n\
             Full source content limited to 1000 tokens: Full page"
        );
    }

    #[test]
    fn test_format_without_raw_content() {
        let response = SearchResponse {
            results: vec![result("Rust", "https://rust-lang.org", "A language", Some("Full page"))],
        };

        let blob = deduplicate_and_format_sources(&response, 1000, false);
        assert!(!blob.contains("Full source content"));
        assert!(blob.ends_with("Most relevant content from source: A language\n==="));
    }

    #[test]
    fn test_dedup_keeps_first_per_url() {
        let response = SearchResponse {
            results: vec![
                result("First", "https://a.example", "one", None),
                result("Second", "https://a.example", "two", None),
                result("Third", "https://b.example", "three", None),
            ],
        };

        let blob = deduplicate_and_format_sources(&response, 10, false);
        assert!(blob.contains("Source First:"));
        assert!(!blob.contains("Source Second:"));
        assert!(blob.contains("Source Third:"));
    }

    #[test]
    fn test_raw_content_truncated_at_budget() {
        let raw = "x".repeat(50);
        let response = SearchResponse {
            results: vec![result("T", "https://t.example", "c", Some(&raw))],
        };

        let blob = deduplicate_and_format_sources(&response, 2, true);
        assert!(blob.ends_with(&format!("limited to 2 tokens: {}{}", "x".repeat(8), TRUNCATION_MARKER)));
    }

    #[test]
    fn test_raw_content_at_budget_not_marked() {
        let raw = "y".repeat(8);
        let response = SearchResponse {
            results: vec![result("T", "https://t.example", "c", Some(&raw))],
        };

        let blob = deduplicate_and_format_sources(&response, 2, true);
        assert!(blob.ends_with("yyyyyyyy"));
    }

    #[test]
    fn test_missing_raw_content_is_empty() {
        let response = SearchResponse {
            results: vec![result("T", "https://t.example", "c", None)],
        };

        let blob = deduplicate_and_format_sources(&response, 2, true);
        assert!(blob.ends_with("Full source content limited to 2 tokens:"));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), format!("hé{}", TRUNCATION_MARKER));
        assert_eq!(truncate_chars("hé", 2), "hé");
    }

    #[test]
    fn test_empty_response() {
        let response = SearchResponse::default();
        assert_eq!(deduplicate_and_format_sources(&response, 1000, true), "Sources:");
        assert_eq!(format_sources(&response), "");
    }

    #[test]
    fn test_format_sources() {
        let response = SearchResponse {
            results: vec![
                result("Rust", "https://rust-lang.org", "", None),
                result("Tokio", "https://tokio.rs", "", None),
            ],
        };
        assert_eq!(
            format_sources(&response),
            "* Rust : https://rust-lang.org\n* Tokio : https://tokio.rs"
        );
    }
}
