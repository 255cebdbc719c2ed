//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Search query writer (JSON output)
pub const QUERY_WRITER: &str = include_str!("../../prompts/query_writer.pmt");

/// Summary writer and merger
pub const SUMMARIZER: &str = include_str!("../../prompts/summarizer.pmt");

/// Knowledge-gap reflection (JSON output)
pub const REFLECTION: &str = include_str!("../../prompts/reflection.pmt");

/// Names of every embedded template, in pipeline order
pub const NAMES: &[&str] = &["query_writer", "summarizer", "reflection"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "query_writer" => {
            debug!("get_embedded: matched query_writer");
            Some(QUERY_WRITER)
        }
        "summarizer" => {
            debug!("get_embedded: matched summarizer");
            Some(SUMMARIZER)
        }
        "reflection" => {
            debug!("get_embedded: matched reflection");
            Some(REFLECTION)
        }
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_is_embedded() {
        for name in NAMES {
            assert!(get_embedded(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_json_prompts_name_their_keys() {
        assert!(QUERY_WRITER.contains("\"query\""));
        assert!(QUERY_WRITER.contains("{{research_topic}}"));
        assert!(REFLECTION.contains("\"follow_up_query\""));
        assert!(REFLECTION.contains("\"knowledge_gap\""));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
