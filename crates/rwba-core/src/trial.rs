//! Per-trial evaluation: 21 subtrial walks combined into one weighted value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RwbaError;
use crate::significance::{round_to, step_significance, tail_polynomial};
use crate::walk::bounded_walk;

/// Subtrials per trial. Fixed by the method.
pub const SUBTRIALS_PER_TRIAL: usize = 21;

/// Symmetric clamp applied to the normalized weighted trial value.
pub const NWTV_LIMIT: f64 = 0.95;

/// Decimal places kept on reported trial values.
const TRIAL_PLACES: i32 = 6;

// ---------------------------------------------------------------------------
// Aim mode
// ---------------------------------------------------------------------------

/// Which direction of bias a session is testing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AimMode {
    /// Two-tailed: any direction.
    #[default]
    #[serde(rename = "no-aim")]
    NoAim,
    /// One-tailed toward more ones.
    #[serde(rename = "aim-high")]
    AimHigh,
    /// One-tailed toward more zeros.
    #[serde(rename = "aim-low")]
    AimLow,
}

impl AimMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoAim => "no-aim",
            Self::AimHigh => "aim-high",
            Self::AimLow => "aim-low",
        }
    }

    /// Turn a base (low-direction) p-value into the reported p-value.
    pub fn apply(self, base_p: f64) -> f64 {
        match self {
            Self::AimHigh => 1.0 - base_p,
            Self::AimLow => base_p,
            Self::NoAim => 2.0 * base_p.min(1.0 - base_p),
        }
    }
}

impl fmt::Display for AimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AimMode {
    type Err = RwbaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-aim" => Ok(Self::NoAim),
            "aim-high" => Ok(Self::AimHigh),
            "aim-low" => Ok(Self::AimLow),
            other => Err(RwbaError::invalid(format!(
                "unknown mode '{other}' (expected no-aim, aim-high or aim-low)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Walk boundary
// ---------------------------------------------------------------------------

/// Half-width `n` of the walk boundary `[-n, +n]`.
///
/// Determines the subtrial size `n²` and the trial size `21·n²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WalkBoundary(usize);

impl WalkBoundary {
    pub const DEFAULT: Self = Self(31);

    /// Rejects `n == 0` and any `n` whose trial size `21·n²` overflows.
    pub fn new(n: usize) -> Result<Self, RwbaError> {
        if n == 0 {
            return Err(RwbaError::invalid("walk boundary must be positive"));
        }
        if n
            .checked_mul(n)
            .and_then(|sub| sub.checked_mul(SUBTRIALS_PER_TRIAL))
            .is_none()
        {
            return Err(RwbaError::invalid(format!(
                "walk boundary {n} is too large: 21·n² bits overflow"
            )));
        }
        Ok(Self(n))
    }

    pub const fn get(self) -> usize {
        self.0
    }

    /// Bits per subtrial, `n²`.
    pub const fn subtrial_len(self) -> usize {
        self.0 * self.0
    }

    /// Bits per trial, `21·n²`.
    pub const fn trial_len(self) -> usize {
        SUBTRIALS_PER_TRIAL * self.subtrial_len()
    }
}

impl Default for WalkBoundary {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for WalkBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Trial evaluation
// ---------------------------------------------------------------------------

/// Outcome of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialResult {
    /// Mode-adjusted p-value, rounded to 6 places.
    pub p_value: f64,
    /// Normalized weighted trial value in `[-0.95, 0.95]`, rounded to 6 places.
    pub nwtv: f64,
    /// Unrounded p-value before the aim policy was applied.
    #[serde(skip)]
    pub base_p: f64,
}

/// Evaluate one trial from the first `21·n²` bits of `bits`.
///
/// Returns `None` when fewer bits are supplied; the caller drops the trial.
pub fn evaluate_trial(bits: &[u8], mode: AimMode, boundary: WalkBoundary) -> Option<TrialResult> {
    let trial_len = boundary.trial_len();
    if bits.len() < trial_len {
        return None;
    }

    let n = boundary.get();
    let mut sum_signed = 0.0;
    let mut sum_abs = 0.0;
    for subtrial in bits[..trial_len].chunks_exact(boundary.subtrial_len()) {
        let walk = bounded_walk(subtrial, n);
        let sv = step_significance(walk.steps, n).surprisal;
        // An open walk adds nothing to the numerator but still weighs in the
        // denominator.
        sum_signed += sv * walk.direction.sign();
        sum_abs += sv.abs();
    }

    let nwtv = if sum_abs != 0.0 { sum_signed / sum_abs } else { 0.0 };
    let nwtv = nwtv.clamp(-NWTV_LIMIT, NWTV_LIMIT);

    let xx = tail_polynomial(-nwtv.abs());
    let base_p = if nwtv < 0.0 { 0.5 + xx } else { 0.5 - xx };

    Some(TrialResult {
        p_value: round_to(mode.apply(base_p), TRIAL_PLACES),
        nwtv: round_to(nwtv, TRIAL_PLACES),
        base_p,
    })
}
