//! # rwba-core
//!
//! **Random Walk Bias Analysis: is this bit stream leaning one way?**
//!
//! `rwba-core` consumes a long sequence of bits, cuts it into trials, runs a
//! bounded ±1 random walk over each subtrial, weights every walk's exit
//! direction by its surprisal, and aggregates the per-trial p-values into a
//! chi-squared uniformity test over the whole session.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rwba_core::{SessionRequest, SimulatedSource, run_session};
//!
//! let source = SimulatedSource::new(0.0, Some(42)).unwrap();
//! let record = run_session(&source, &SessionRequest::default()).unwrap();
//! println!("chi² = {} → {}", record.chi_squared, record.outcome);
//! ```
//!
//! ## Architecture
//!
//! Source → bits → trials (21 bounded walks each) → p-values → histogram → verdict
//!
//! Three aim modes:
//! - **NoAim** (default): two-tailed, bias in either direction.
//! - **AimHigh**: one-tailed, small p-values mean more ones.
//! - **AimLow**: one-tailed, small p-values mean more zeros.
//!
//! The statistical modules ([`walk`], [`significance`], [`trial`], [`batch`],
//! [`diagnostics`]) are pure functions of their input. Every source
//! implements the [`EntropySource`] trait; the engine never retries a source
//! or falls back to another one.

pub mod batch;
pub mod bits;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod session;
pub mod significance;
pub mod source;
pub mod sources;
pub mod trial;
pub mod walk;

pub use batch::{
    BatchAnalyzer, BatchResult, CHI_SQUARED_CRITICAL, HISTOGRAM_BINS, Outcome, TrialRecord,
    analyze_session,
};
pub use bits::{bytes_to_bits, parse_bitstring, render_bits};
pub use config::{AnalysisConfig, DEFAULT_TRIAL_COUNT, default_workers};
pub use diagnostics::{EntropyStats, diagnostics};
pub use error::RwbaError;
pub use session::{SessionRecord, SessionRequest, run_session, session_hash};
pub use significance::{Significance, step_significance, tail_polynomial};
pub use source::{EntropySource, SourceError, SourceInfo, SourceKind, fetch_bits};
pub use sources::{
    FileSource, HardwareSource, HardwareStatus, SimulatedSource, SourceConfig, UploadedSource,
};
pub use trial::{AimMode, TrialResult, WalkBoundary, evaluate_trial};
pub use walk::{ExitDirection, WalkOutcome, bounded_walk};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
