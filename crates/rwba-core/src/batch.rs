//! Session-level aggregation of trial p-values.
//!
//! Entropy is cut into consecutive, non-overlapping trial windows. Each
//! window is evaluated independently, the resulting p-values are binned into
//! a 10-bin histogram, and a chi-squared statistic against the uniform null
//! decides whether the session as a whole shows bias.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::config::AnalysisConfig;
use crate::error::RwbaError;
use crate::significance::round_to;
use crate::trial::{AimMode, TrialResult, WalkBoundary, evaluate_trial};

/// Number of histogram bins over `[0, 1]`.
pub const HISTOGRAM_BINS: usize = 10;

/// Chi-squared critical value, 9 degrees of freedom, α = 0.05.
pub const CHI_SQUARED_CRITICAL: f64 = 16.92;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Session verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[serde(rename = "Uniform")]
    Uniform,
    #[serde(rename = "Bias Detected")]
    BiasDetected,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => write!(f, "Uniform"),
            Self::BiasDetected => write!(f, "Bias Detected"),
        }
    }
}

/// One retained trial, tagged with its position in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub p_value: f64,
    pub nwtv: f64,
}

/// Aggregate statistics over every retained trial.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub trials: Vec<TrialRecord>,
    pub histogram: [u64; HISTOGRAM_BINS],
    /// Trials that had a full window of bits.
    pub retained: usize,
    /// Mean p-value, rounded to 5 places.
    pub mean_p: f64,
    /// Chi-squared against a flat histogram, rounded to 4 places.
    pub chi_squared: f64,
    /// Upper-tail probability of `chi_squared` with 9 degrees of freedom.
    pub chi_squared_p_value: f64,
    pub outcome: Outcome,
    /// Fraction of retained trials with `p < 0.5`, rounded to 4 places.
    pub hit_rate: f64,
}

impl BatchResult {
    pub fn p_values(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.p_value).collect()
    }

    pub fn nwtvs(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.nwtv).collect()
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Runs the trial evaluator over a whole session's entropy.
pub struct BatchAnalyzer {
    config: AnalysisConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl BatchAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Stop at the next trial boundary once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Evaluate `trial_count` consecutive windows of `entropy` and aggregate.
    ///
    /// Windows without a full trial's worth of bits are dropped.
    pub fn run(&self, entropy: &[u8]) -> Result<BatchResult, RwbaError> {
        self.config.validate()?;

        let evaluated = self.evaluate_all(entropy)?;
        let trials: Vec<TrialRecord> = evaluated
            .into_iter()
            .enumerate()
            .filter_map(|(trial_index, result)| {
                result.map(|r| TrialRecord {
                    trial_index,
                    p_value: r.p_value,
                    nwtv: r.nwtv,
                })
            })
            .collect();

        let dropped = self.config.trial_count - trials.len();
        if dropped > 0 {
            log::debug!(
                "dropped {dropped} of {} trial(s): fewer than {} bits in window",
                self.config.trial_count,
                self.config.boundary.trial_len()
            );
        }

        Ok(summarize(trials))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Evaluate every trial window, in trial order, across scoped workers.
    fn evaluate_all(&self, entropy: &[u8]) -> Result<Vec<Option<TrialResult>>, RwbaError> {
        let count = self.config.trial_count;
        let workers = self.config.workers.min(count);
        let per_worker = count.div_ceil(workers);
        let mode = self.config.mode;
        let boundary = self.config.boundary;

        let chunks: Vec<Result<Vec<Option<TrialResult>>, usize>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let start = w * per_worker;
                    let end = ((w + 1) * per_worker).min(count);
                    s.spawn(move || {
                        let mut out = Vec::with_capacity(end.saturating_sub(start));
                        for index in start..end {
                            if self.is_cancelled() {
                                return Err(out.len());
                            }
                            let window = trial_window(entropy, index, boundary);
                            out.push(evaluate_trial(window, mode, boundary));
                        }
                        Ok(out)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        if chunks.iter().any(Result::is_err) {
            let completed = chunks
                .iter()
                .map(|c| match c {
                    Ok(done) => done.len(),
                    Err(done) => *done,
                })
                .sum();
            log::info!("batch cancelled after {completed} of {count} trial(s)");
            return Err(RwbaError::Cancelled { completed });
        }

        Ok(chunks.into_iter().flatten().flatten().collect())
    }
}

/// Bits `[i·len, (i+1)·len)` of `entropy`, truncated at the end of the input.
fn trial_window(entropy: &[u8], index: usize, boundary: WalkBoundary) -> &[u8] {
    let len = boundary.trial_len();
    let start = index.saturating_mul(len).min(entropy.len());
    let end = start.saturating_add(len).min(entropy.len());
    &entropy[start..end]
}

/// Histogram, chi-squared and hit rate over retained trials.
fn summarize(trials: Vec<TrialRecord>) -> BatchResult {
    let mut histogram = [0u64; HISTOGRAM_BINS];
    let mut hits = 0usize;
    for t in &trials {
        let bin = ((t.p_value * HISTOGRAM_BINS as f64) as usize).min(HISTOGRAM_BINS - 1);
        histogram[bin] += 1;
        if t.p_value < 0.5 {
            hits += 1;
        }
    }

    let retained = trials.len();
    if retained == 0 {
        return BatchResult {
            trials,
            histogram,
            retained,
            mean_p: 0.0,
            chi_squared: 0.0,
            chi_squared_p_value: 1.0,
            outcome: Outcome::Uniform,
            hit_rate: 0.0,
        };
    }

    let n = retained as f64;
    let mean_p = trials.iter().map(|t| t.p_value).sum::<f64>() / n;
    let expected = n / HISTOGRAM_BINS as f64;
    let chi_squared: f64 = histogram
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum();
    let chi_squared = round_to(chi_squared, 4);

    let outcome = if chi_squared < CHI_SQUARED_CRITICAL {
        Outcome::Uniform
    } else {
        Outcome::BiasDetected
    };

    BatchResult {
        trials,
        histogram,
        retained,
        mean_p: round_to(mean_p, 5),
        chi_squared,
        chi_squared_p_value: chi_squared_sf(chi_squared),
        outcome,
        hit_rate: round_to(hits as f64 / n, 4),
    }
}

fn chi_squared_sf(statistic: f64) -> f64 {
    ChiSquared::new((HISTOGRAM_BINS - 1) as f64)
        .map(|dist| dist.sf(statistic))
        .unwrap_or(1.0)
}

/// Analyze a session's entropy with default worker count.
///
/// `boundary` is the walk half-width `n`; zero is rejected.
pub fn analyze_session(
    entropy: &[u8],
    trial_count: usize,
    mode: AimMode,
    boundary: usize,
) -> Result<BatchResult, RwbaError> {
    let config = AnalysisConfig {
        trial_count,
        mode,
        boundary: WalkBoundary::new(boundary)?,
        ..Default::default()
    };
    BatchAnalyzer::new(config).run(entropy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trial_index: usize, p_value: f64) -> TrialRecord {
        TrialRecord {
            trial_index,
            p_value,
            nwtv: 0.0,
        }
    }

    #[test]
    fn test_summarize_flat_histogram() {
        let trials: Vec<_> = (0..100).map(|i| record(i, (i % 10) as f64 / 10.0 + 0.05)).collect();
        let r = summarize(trials);
        assert_eq!(r.histogram, [10; 10]);
        assert_eq!(r.chi_squared, 0.0);
        assert_eq!(r.outcome, Outcome::Uniform);
        assert_eq!(r.hit_rate, 0.5);
        assert!((r.chi_squared_p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_top_bin_includes_one() {
        let r = summarize(vec![record(0, 1.0), record(1, 0.95), record(2, 0.0)]);
        assert_eq!(r.histogram[9], 2);
        assert_eq!(r.histogram[0], 1);
        assert_eq!(r.histogram.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_summarize_concentrated_histogram_is_biased() {
        let trials: Vec<_> = (0..50).map(|i| record(i, 0.01)).collect();
        let r = summarize(trials);
        // expected 5 per bin: (50-5)²/5 + 9·(0-5)²/5 = 405 + 45
        assert_eq!(r.chi_squared, 450.0);
        assert_eq!(r.outcome, Outcome::BiasDetected);
        assert_eq!(r.hit_rate, 1.0);
        assert_eq!(r.mean_p, 0.01);
        assert!(r.chi_squared_p_value < 1e-6);
    }

    #[test]
    fn test_summarize_empty() {
        let r = summarize(Vec::new());
        assert_eq!(r.retained, 0);
        assert_eq!(r.mean_p, 0.0);
        assert_eq!(r.chi_squared, 0.0);
        assert_eq!(r.outcome, Outcome::Uniform);
        assert_eq!(r.hit_rate, 0.0);
    }

    #[test]
    fn test_trial_window_bounds() {
        let b = WalkBoundary::new(2).unwrap(); // 84 bits per trial
        let data = vec![0u8; 200];
        assert_eq!(trial_window(&data, 0, b).len(), 84);
        assert_eq!(trial_window(&data, 1, b).len(), 84);
        assert_eq!(trial_window(&data, 2, b).len(), 32);
        assert!(trial_window(&data, 3, b).is_empty());
    }

    #[test]
    fn test_cancel_flag_stops_batch() {
        let flag = Arc::new(AtomicBool::new(true));
        let cfg = AnalysisConfig {
            trial_count: 4,
            boundary: WalkBoundary::new(2).unwrap(),
            workers: 2,
            ..Default::default()
        };
        let result = BatchAnalyzer::new(cfg).with_cancel_flag(flag).run(&[1u8; 4 * 84]);
        assert!(matches!(result, Err(RwbaError::Cancelled { completed: 0 })));
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let mut state: u64 = 42;
        let bits: Vec<u8> = (0..30 * 189)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 63) as u8
            })
            .collect();
        let run = |workers| {
            let cfg = AnalysisConfig {
                trial_count: 30,
                boundary: WalkBoundary::new(3).unwrap(),
                workers,
                ..Default::default()
            };
            BatchAnalyzer::new(cfg).run(&bits).unwrap()
        };
        let serial = run(1);
        let parallel = run(7);
        assert_eq!(serial.trials, parallel.trials);
        assert_eq!(serial.histogram, parallel.histogram);
        assert_eq!(serial.chi_squared, parallel.chi_squared);
        let indices: Vec<_> = parallel.trials.iter().map(|t| t.trial_index).collect();
        assert_eq!(indices, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_analyze_session_rejects_zero_boundary() {
        assert!(matches!(
            analyze_session(&[1; 100], 1, AimMode::NoAim, 0),
            Err(RwbaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_analyze_session_rejects_oversized_boundary() {
        let n = 1usize << (usize::BITS / 2);
        assert!(matches!(
            analyze_session(&[1; 100], 1, AimMode::NoAim, n),
            Err(RwbaError::InvalidParameter(_))
        ));
        assert!(analyze_session(&[1; 100], 1, AimMode::NoAim, usize::MAX).is_err());
    }

    #[test]
    fn test_analyze_session_rejects_zero_trials() {
        assert!(analyze_session(&[1; 100], 0, AimMode::NoAim, 31).is_err());
    }
}
