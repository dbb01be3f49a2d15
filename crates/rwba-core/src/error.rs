//! Error taxonomy for the analysis engine.
//!
//! Every variant is local and recoverable by the caller. Source failures are
//! carried through unchanged so the caller sees exactly what the backend
//! reported.

use thiserror::Error;

use crate::source::SourceError;

/// Errors returned by the RWBA engine and session runner.
#[derive(Debug, Error)]
pub enum RwbaError {
    /// A caller-supplied parameter is out of range or unrecognized.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Fewer bits were available than the requested analysis requires.
    #[error("Not enough entropy bits provided: need {needed}, got {got}")]
    InsufficientEntropy { needed: usize, got: usize },

    /// The entropy source failed; surfaced as-is.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The batch was cancelled at a trial boundary.
    #[error("Analysis cancelled after {completed} trial(s)")]
    Cancelled { completed: usize },
}

impl RwbaError {
    /// Shorthand for [`RwbaError::InvalidParameter`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// True for errors caused by the request rather than the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::InsufficientEntropy { .. }
        )
    }
}
