//! Final document assembly

use tracing::debug;

/// Append the gathered citations to the summary
pub fn finalize_summary(summary: &str, sources_gathered: &[String]) -> String {
    debug!(source_blocks = sources_gathered.len(), "finalize_summary: called");
    format!(
        "## Summary\n\n{}\n\n ### Sources:\n{}",
        summary,
        sources_gathered.join("\n")
    )
}
