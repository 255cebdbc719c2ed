//! Iterative research loop
//!
//! A run moves a [`ResearchState`] through the [`Phase`]s: the JSON model
//! writes a first query, the search service answers it, the text model
//! folds the answer into a running summary, and the JSON model proposes a
//! follow-up query. After `max_web_search_loops + 1` searches the summary is
//! finalized with its citations.

mod engine;
mod error;
mod events;
pub mod finalize;
pub mod markup;
mod phase;
pub mod query;
pub mod reflect;
mod state;
pub mod summarize;

pub use engine::{DEFAULT_MAX_TOKENS, ResearchEngine};
pub use error::ResearchError;
pub use events::ResearchEvent;
pub use phase::{Phase, route_research};
pub use state::ResearchState;
