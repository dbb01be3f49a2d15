//! Analysis sessions: one entropy draw, one batch, one exportable record.
//!
//! A session fetches exactly `trial_count · 21 · n²` bits from a source,
//! summarizes them, runs the batch analyzer and packages everything into a
//! [`SessionRecord`] identified by a fresh UUID. The record is what the HTTP
//! service stores and exports and what the CLI writes to disk.
//!
//! # Storage Format
//!
//! [`SessionRecord::save`] writes a single pretty-printed JSON document whose
//! field names follow the `/export/{session_id}` response.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::batch::{BatchAnalyzer, HISTOGRAM_BINS, Outcome, TrialRecord};
use crate::bits::render_bits;
use crate::config::AnalysisConfig;
use crate::diagnostics::{EntropyStats, diagnostics};
use crate::error::RwbaError;
use crate::source::{EntropySource, fetch_bits};
use crate::trial::{AimMode, WalkBoundary};

/// Number of leading bits folded into the session hash.
pub const HASHED_BITS: usize = 500;

// ---------------------------------------------------------------------------
// Session request
// ---------------------------------------------------------------------------

/// Parameters of one analysis session.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub analysis: AnalysisConfig,
    /// Recorded with the session; the source itself already applies it.
    pub bias_delta: f64,
    /// Checked between trials; set it to abandon the batch.
    pub cancel: Option<Arc<AtomicBool>>,
}

// ---------------------------------------------------------------------------
// Session record
// ---------------------------------------------------------------------------

/// Everything reported for a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub timestamp: String,
    pub entropy_source: String,
    pub bias_delta: f64,
    pub mode: AimMode,
    pub trial_count: usize,
    pub boundary: WalkBoundary,
    pub entropy_stats: Option<EntropyStats>,
    pub p_values: Vec<f64>,
    pub nwtvs: Vec<f64>,
    pub histogram: [u64; HISTOGRAM_BINS],
    pub mean_p: f64,
    pub chi_squared: f64,
    pub chi_squared_p_value: f64,
    pub outcome: Outcome,
    pub hit_rate: f64,
    pub session_hash: String,
    pub trials: Vec<TrialRecord>,
}

impl SessionRecord {
    /// Write the record as pretty JSON to `path`.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Running a session
// ---------------------------------------------------------------------------

/// Draw entropy from `source` and analyze it.
///
/// Source failures and short reads are returned as errors; nothing is
/// recorded for a failed session.
pub fn run_session(
    source: &dyn EntropySource,
    request: &SessionRequest,
) -> Result<SessionRecord, RwbaError> {
    let config = &request.analysis;
    config.validate()?;

    let bits = fetch_bits(source, config.total_bits())?;
    let entropy_stats = diagnostics(&bits);

    let mut analyzer = BatchAnalyzer::new(config.clone());
    if let Some(flag) = &request.cancel {
        analyzer = analyzer.with_cancel_flag(Arc::clone(flag));
    }
    let batch = analyzer.run(&bits)?;

    let timestamp = format_iso8601(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default(),
    );
    let meta = session_meta(
        config.mode,
        source.name(),
        request.bias_delta,
        config.trial_count,
        &timestamp,
    );
    let session_hash = session_hash(&meta, &bits);
    let session_id = Uuid::new_v4().to_string();

    log::info!(
        "session {session_id}: {} trial(s) from '{}', chi² {} ({})",
        batch.retained,
        source.name(),
        batch.chi_squared,
        batch.outcome
    );

    Ok(SessionRecord {
        session_id,
        timestamp,
        entropy_source: source.name().to_string(),
        bias_delta: request.bias_delta,
        mode: config.mode,
        trial_count: config.trial_count,
        boundary: config.boundary,
        entropy_stats,
        p_values: batch.p_values(),
        nwtvs: batch.nwtvs(),
        histogram: batch.histogram,
        mean_p: batch.mean_p,
        chi_squared: batch.chi_squared,
        chi_squared_p_value: batch.chi_squared_p_value,
        outcome: batch.outcome,
        hit_rate: batch.hit_rate,
        session_hash,
        trials: batch.trials,
    })
}

/// Metadata string hashed together with the entropy.
///
/// The bias delta keeps a decimal point (`0.0`, not `0`).
pub fn session_meta(
    mode: AimMode,
    source: &str,
    bias_delta: f64,
    trial_count: usize,
    timestamp: &str,
) -> String {
    format!("{mode}-{source}-{bias_delta:?}-{trial_count}-{timestamp}")
}

/// SHA-256 hex digest of `meta` followed by the first [`HASHED_BITS`] bits as
/// `'0'`/`'1'` characters.
pub fn session_hash(meta: &str, bits: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(meta.as_bytes());
    hasher.update(render_bits(&bits[..bits.len().min(HASHED_BITS)]).as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Time formatting
// ---------------------------------------------------------------------------

/// Format a duration-since-epoch as an ISO-8601 UTC timestamp.
/// Example: `2026-02-15T01:30:00Z`
fn format_iso8601(since_epoch: Duration) -> String {
    let (year, month, day, hour, min, sec) = secs_to_utc(since_epoch.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

/// Convert seconds since Unix epoch to (year, month, day, hour, minute, second) UTC.
/// No leap second handling.
fn secs_to_utc(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let sec = secs % 60;
    let min = (secs / 60) % 60;
    let hour = (secs / 3600) % 24;

    let mut days = secs / 86400;
    let mut year = 1970u64;
    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let feb = if is_leap(year) { 29 } else { 28 };
    let months_days: [u64; 12] = [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

    let mut month = 1u64;
    for &md in &months_days {
        if days < md {
            break;
        }
        days -= md;
        month += 1;
    }

    (year, month, days + 1, hour, min, sec)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
