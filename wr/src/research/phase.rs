//! Research phases and the transitions between them
//!
//! ```text
//! GeneratingQuery -> Searching -> Summarizing -> Reflecting -+-> Searching
//!                                                            +-> Finalized
//! ```

use std::fmt;

use serde::Serialize;
use tracing::debug;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    GeneratingQuery,
    Searching,
    Summarizing,
    Reflecting,
    /// Terminal; the running summary holds the final document
    Finalized,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finalized)
    }

    /// Phase that follows this one once its work is done
    ///
    /// Only `Reflecting` branches; it consults the loop counter.
    pub fn next(self, research_loop_count: u32, max_web_search_loops: u32) -> Phase {
        match self {
            Phase::GeneratingQuery => Phase::Searching,
            Phase::Searching => Phase::Summarizing,
            Phase::Summarizing => Phase::Reflecting,
            Phase::Reflecting => route_research(research_loop_count, max_web_search_loops),
            Phase::Finalized => Phase::Finalized,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::GeneratingQuery => "generating-query",
            Phase::Searching => "searching",
            Phase::Summarizing => "summarizing",
            Phase::Reflecting => "reflecting",
            Phase::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decide whether to search again or finalize
///
/// Searching continues while `research_loop_count <= max_web_search_loops`,
/// so a run performs `max_web_search_loops + 1` searches in total.
pub fn route_research(research_loop_count: u32, max_web_search_loops: u32) -> Phase {
    if research_loop_count <= max_web_search_loops {
        debug!(research_loop_count, max_web_search_loops, "route_research: searching again");
        Phase::Searching
    } else {
        debug!(research_loop_count, max_web_search_loops, "route_research: finalizing");
        Phase::Finalized
    }
}
