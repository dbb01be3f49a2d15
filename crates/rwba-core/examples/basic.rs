//! Basic bias analysis example.
//!
//! Runs one session against a fair simulated source and one against a
//! slightly skewed source, and prints both verdicts.
//!
//! Run: `cargo run --example basic`

use rwba_core::{AimMode, AnalysisConfig, SessionRequest, SimulatedSource, run_session};

fn main() -> Result<(), rwba_core::RwbaError> {
    for bias_delta in [0.0, -0.02] {
        let source = SimulatedSource::new(bias_delta, Some(7))?;
        let request = SessionRequest {
            analysis: AnalysisConfig {
                trial_count: 200,
                mode: AimMode::NoAim,
                ..Default::default()
            },
            bias_delta,
            cancel: None,
        };
        let record = run_session(&source, &request)?;

        println!("bias delta {bias_delta:+.2}");
        println!("  histogram: {:?}", record.histogram);
        println!(
            "  mean p {:.5}, hit rate {:.4}, chi² {:.4} (p = {:.4})",
            record.mean_p, record.hit_rate, record.chi_squared, record.chi_squared_p_value
        );
        println!("  outcome: {}", record.outcome);
        println!("  hash: {}", record.session_hash);
    }
    Ok(())
}
