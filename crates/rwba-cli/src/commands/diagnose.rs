//! `rwba diagnose`: descriptive statistics of a bit stream.

use rwba_core::{EntropySource, RwbaError, diagnostics, fetch_bits};

use super::{SourceArgs, fail, source_config};

pub fn run(source: &SourceArgs<'_>, length: usize, json: bool) {
    let config = source_config(source).unwrap_or_else(|e| fail(e));
    let src = config.build().unwrap_or_else(|e| fail(e));

    // Finite sources are summarized in full; generators produce `length` bits.
    let bits = match source.source {
        "uploaded" | "file" => src.get_bits(usize::MAX).map_err(Into::into),
        _ => fetch_bits(src.as_ref(), length),
    }
    .unwrap_or_else(|e: RwbaError| fail(e));

    let Some(stats) = diagnostics(&bits) else {
        fail("no bits to diagnose");
    };

    if json {
        match serde_json::to_string_pretty(&stats) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(e),
        }
        return;
    }

    println!("Entropy diagnostics ({})", src.name());
    println!("  Length:       {}", stats.length);
    println!("  Mean:         {:.5}", stats.mean);
    println!("  Bias:         {:.5}", stats.bias);
    println!("  Lag-1 agree:  {:.5}", stats.correlation);
}
