//! Research state threaded through every step of a run

use serde::Serialize;
use tracing::debug;

/// Everything a run knows about its topic so far
///
/// One run owns one state. `web_research_results` and `sources_gathered`
/// only grow, in lockstep with `research_loop_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResearchState {
    /// User-supplied subject of the run
    pub research_topic: String,

    /// Query for the next search
    pub search_query: String,

    /// One formatted blob per completed search
    pub web_research_results: Vec<String>,

    /// One citation block per completed search
    pub sources_gathered: Vec<String>,

    /// Completed searches
    pub research_loop_count: u32,

    /// Cumulative summary; holds the final document once finalized
    pub running_summary: Option<String>,
}

impl ResearchState {
    pub fn new(research_topic: impl Into<String>) -> Self {
        let research_topic = research_topic.into();
        debug!(%research_topic, "ResearchState::new: called");
        Self {
            research_topic,
            ..Default::default()
        }
    }

    /// Record one completed search
    pub fn record_search(&mut self, results: String, sources: String) {
        debug!(
            loop_count = self.research_loop_count + 1,
            results_len = results.len(),
            "ResearchState::record_search: called"
        );
        self.web_research_results.push(results);
        self.sources_gathered.push(sources);
        self.research_loop_count += 1;
    }

    /// Formatted results of the most recent search
    pub fn latest_results(&self) -> Option<&str> {
        self.web_research_results.last().map(String::as_str)
    }

    /// Running summary, treating an empty one as absent
    pub fn existing_summary(&self) -> Option<&str> {
        self.running_summary.as_deref().filter(|s| !s.is_empty())
    }
}
