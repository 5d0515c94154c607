//! Hiding-zone mode: station circles narrowed by the same questions.

pub mod candidates;
pub mod eliminator;
pub mod search;

pub use candidates::{Candidate, build_candidates};
pub use eliminator::{Refinement, eliminate, refine_station};
pub use search::{SearchOutcome, expanding_search};
