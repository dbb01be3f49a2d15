//! Descriptive statistics over a raw bit sequence.
//!
//! A quick sanity check on the consumed entropy: ones-density, bias and a
//! lag-1 agreement rate. Informational only; nothing here feeds the
//! significance pipeline.

use serde::{Deserialize, Serialize};

use crate::significance::round_to;

const STAT_PLACES: i32 = 5;

/// Summary of a bit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyStats {
    pub length: usize,
    /// Fraction of ones.
    pub mean: f64,
    /// `|mean - 0.5| · 2`: 0 unbiased, 1 constant.
    pub bias: f64,
    /// Fraction of adjacent pairs that are equal. 0.5 for independent fair
    /// bits; 1.0 for a constant run, 0.0 for strict alternation.
    pub correlation: f64,
}

/// Compute [`EntropyStats`], or `None` for an empty sequence.
pub fn diagnostics(bits: &[u8]) -> Option<EntropyStats> {
    let n = bits.len();
    if n == 0 {
        return None;
    }

    let ones = bits.iter().filter(|&&b| b != 0).count();
    let mean = ones as f64 / n as f64;
    let bias = (mean - 0.5).abs() * 2.0;

    // A lone bit has no adjacent pair; report the independence expectation.
    let correlation = if n < 2 {
        0.5
    } else {
        let equal = bits
            .windows(2)
            .filter(|w| (w[0] != 0) == (w[1] != 0))
            .count();
        equal as f64 / (n - 1) as f64
    };

    Some(EntropyStats {
        length: n,
        mean: round_to(mean, STAT_PLACES),
        bias: round_to(bias, STAT_PLACES),
        correlation: round_to(correlation, STAT_PLACES),
    })
}
