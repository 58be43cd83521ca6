//! Recommendation scorer.

mod scoring;
mod types;

pub use scoring::{recommend, score};
pub use types::{CandidateServer, Recommendation};
