//! The matching/merging engine (spec §4.8): per-side derivation chains,
//! pre-merge, cross-field matching, and cluster features.

pub mod colors;
#[allow(clippy::module_inception)]
pub mod engine;
pub mod matching;
pub mod merge;
pub mod state;

pub use engine::{Engine, InterestSide, MatchStage};
pub use state::{SideState, Stage};
