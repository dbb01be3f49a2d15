//! Analysis configuration.

use serde::Serialize;

use crate::error::RwbaError;
use crate::trial::{AimMode, WalkBoundary};

/// Trials per session when the caller does not say otherwise.
pub const DEFAULT_TRIAL_COUNT: usize = 1000;

/// Parameters of one batch analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    pub trial_count: usize,
    pub mode: AimMode,
    pub boundary: WalkBoundary,
    /// Worker threads used to evaluate trials. Does not affect results.
    #[serde(skip)]
    pub workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trial_count: DEFAULT_TRIAL_COUNT,
            mode: AimMode::NoAim,
            boundary: WalkBoundary::DEFAULT,
            workers: default_workers(),
        }
    }
}

impl AnalysisConfig {
    /// Reject parameters the engine cannot honor.
    pub fn validate(&self) -> Result<(), RwbaError> {
        if self.trial_count == 0 {
            return Err(RwbaError::invalid("trial count must be positive"));
        }
        if self.workers == 0 {
            return Err(RwbaError::invalid("worker count must be positive"));
        }
        if self.trial_count.checked_mul(self.boundary.trial_len()).is_none() {
            return Err(RwbaError::invalid(format!(
                "{} trials of {} bits overflow the addressable bit count",
                self.trial_count,
                self.boundary.trial_len()
            )));
        }
        Ok(())
    }

    /// Bits needed to fill every requested trial.
    pub fn total_bits(&self) -> usize {
        self.trial_count.saturating_mul(self.boundary.trial_len())
    }
}

/// Available parallelism, or 1 when it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
