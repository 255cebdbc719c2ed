//! Progress events published while a run advances

use serde::Serialize;

/// One observable step of a research run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ResearchEvent {
    /// Initial query chosen; `fallback` when the topic stood in for it
    QueryGenerated { query: String, fallback: bool },

    /// A search finished and its results were recorded
    SearchCompleted {
        loop_count: u32,
        query: String,
        result_count: usize,
    },

    /// The running summary was written or merged
    SummaryUpdated { loop_count: u32, summary_len: usize },

    /// A follow-up query was chosen
    Reflected {
        loop_count: u32,
        knowledge_gap: Option<String>,
        follow_up_query: String,
        fallback: bool,
    },

    /// The final document is ready
    Finalized { loop_count: u32, source_count: usize },
}
