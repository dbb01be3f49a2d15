//! `rwba status`: check whether the QRNG hardware is usable.

use std::path::Path;

use rwba_core::sources::hardware;

pub fn run(library: &Path, json: bool) {
    let status = hardware::probe(library);

    if json {
        match serde_json::to_string_pretty(&status) {
            Ok(s) => println!("{s}"),
            Err(e) => super::fail(e),
        }
        return;
    }

    println!("RWBA v{}", rwba_core::VERSION);
    println!("  Library:     {}", library.display());
    println!(
        "  QRNG:        {}",
        if status.available { "available" } else { "unavailable" }
    );
    if status.library_initialized {
        println!("  Generators:  {}", status.number_of_generators);
        println!("  Runtime ok:  {}", status.runtime_ok);
    }
    if let Some(err) = &status.error {
        println!("  Reason:      {err}");
    }
    println!("  Workers:     {}", rwba_core::default_workers());
}
