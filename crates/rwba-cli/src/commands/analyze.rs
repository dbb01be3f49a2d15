//! `rwba analyze`: run one bias-analysis session.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rwba_core::{
    AimMode, AnalysisConfig, RwbaError, SessionRecord, SessionRequest, WalkBoundary, run_session,
};

use super::{SourceArgs, bar, fail, source_config};

pub struct AnalyzeCommandConfig<'a> {
    pub source: SourceArgs<'a>,
    pub trials: usize,
    pub mode: AimMode,
    pub boundary: usize,
    pub workers: Option<usize>,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: AnalyzeCommandConfig<'_>) {
    let boundary = WalkBoundary::new(cfg.boundary).unwrap_or_else(|e| fail(e));
    let mut analysis = AnalysisConfig {
        trial_count: cfg.trials,
        mode: cfg.mode,
        boundary,
        ..Default::default()
    };
    if let Some(workers) = cfg.workers {
        analysis.workers = workers;
    }
    if let Err(e) = analysis.validate() {
        fail(e);
    }
    log::debug!("analysis config: {analysis:?}");

    let source_config = source_config(&cfg.source).unwrap_or_else(|e| fail(e));
    let source = source_config.build().unwrap_or_else(|e| fail(e));

    // Ctrl+C stops the batch at the next trial boundary.
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        eprintln!("Warning: Ctrl+C handler not installed: {e}");
    }

    println!("Random Walk Bias Analysis");
    println!("  Source:    {}", source.name());
    println!("  Mode:      {}", analysis.mode);
    println!("  Trials:    {}", analysis.trial_count);
    println!(
        "  Boundary:  ±{} ({} bits per trial, {} bits total)",
        boundary,
        boundary.trial_len(),
        analysis.total_bits()
    );
    println!();

    let request = SessionRequest {
        analysis,
        bias_delta: cfg.source.bias_delta,
        cancel: Some(cancel),
    };

    let start = Instant::now();
    let record = match run_session(source.as_ref(), &request) {
        Ok(record) => record,
        Err(RwbaError::Cancelled { completed }) => {
            eprintln!("Interrupted after {completed} trial(s); no session recorded.");
            std::process::exit(130);
        }
        Err(e) => fail(e),
    };
    let elapsed = start.elapsed();

    print_record(&record);
    println!("  Completed in {:.2}s", elapsed.as_secs_f64());

    if let Some(path) = cfg.output_path {
        match record.save(Path::new(path)) {
            Ok(()) => println!("  Session written to {path}"),
            Err(e) => fail(format!("cannot write {path}: {e}")),
        }
    }
}

fn print_record(record: &SessionRecord) {
    if let Some(stats) = &record.entropy_stats {
        println!("Entropy");
        println!(
            "  {} bits, mean {:.5}, bias {:.5}, lag-1 agreement {:.5}",
            stats.length, stats.mean, stats.bias, stats.correlation
        );
        println!();
    }

    println!("p-value histogram");
    let max = record.histogram.iter().copied().max().unwrap_or(0);
    for (i, &count) in record.histogram.iter().enumerate() {
        println!(
            "  {:.1}-{:.1} {:>6} {}",
            i as f64 / 10.0,
            (i + 1) as f64 / 10.0,
            count,
            bar(count, max, 40)
        );
    }
    println!();

    println!("Result");
    println!("  Session:   {}", record.session_id);
    println!("  Mean p:    {:.5}", record.mean_p);
    println!("  Hit rate:  {:.4}", record.hit_rate);
    println!(
        "  Chi²:      {:.4} (df 9, p = {:.4})",
        record.chi_squared, record.chi_squared_p_value
    );
    println!("  Outcome:   {}", record.outcome);
    println!("  Hash:      {}", record.session_hash);
}
