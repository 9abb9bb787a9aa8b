//! Error types surfaced across the engine boundary.
//!
//! Bad pixel values are *not* errors (they propagate as the sentinel, see
//! [`crate::grid::BAD_DATA`]); only the conditions enumerated here abort a run.

use thiserror::Error;

/// Which side of the engine (forecast or observation) an error pertains to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Fcst,
    Obs,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Fcst => write!(f, "fcst"),
            Side::Obs => write!(f, "obs"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to read input grid or palette: {0}")]
    InputReadFailed(String),

    #[error("{side} object count {count} exceeds max_singles ({max_singles})")]
    ObjectCountExceeded {
        side: Side,
        count: usize,
        max_singles: usize,
    },

    #[error("need at least {need} colors to paint {need} clusters, have {have}")]
    InsufficientColors { need: usize, have: usize },

    #[error("configuration value out of range: {detail}")]
    ConfigOutOfRange { detail: String },

    #[error("internal engine state invariant violated: {detail}")]
    InternalState { detail: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
