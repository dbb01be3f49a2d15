pub mod analyze;
pub mod diagnose;
pub mod server;
pub mod status;

use std::path::PathBuf;

use rwba_core::sources::hardware;
use rwba_core::{AimMode, SourceConfig};

/// Print an error and exit with status 1.
pub fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

/// clap value parser for `--mode`.
pub fn parse_mode(s: &str) -> Result<AimMode, String> {
    s.parse::<AimMode>().map_err(|e| e.to_string())
}

/// clap value parser for `--bias-delta`: a number in `[-0.5, 0.5]`.
pub fn parse_bias_delta(s: &str) -> Result<f64, String> {
    let delta: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !(-0.5..=0.5).contains(&delta) {
        return Err(format!("bias delta {delta} outside [-0.5, 0.5]"));
    }
    Ok(delta)
}

/// Source-selection flags shared by the commands that draw entropy.
#[derive(Debug, Default)]
pub struct SourceArgs<'a> {
    pub source: &'a str,
    pub bias_delta: f64,
    pub seed: Option<u64>,
    pub bits: Option<&'a str>,
    pub bits_file: Option<&'a str>,
    pub file: Option<&'a str>,
    pub library: Option<&'a str>,
    pub serial: Option<&'a str>,
}

/// Turn source flags into a [`SourceConfig`].
///
/// `uploaded` takes its bitstring from `--bits` or from a text file given by
/// `--bits-file`.
pub fn source_config(args: &SourceArgs<'_>) -> Result<SourceConfig, String> {
    match args.source {
        "simulated" => Ok(SourceConfig::Simulated {
            bias_delta: args.bias_delta,
            seed: args.seed,
        }),
        "uploaded" => {
            let bitstring = match (args.bits, args.bits_file) {
                (Some(bits), _) => bits.to_string(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .map_err(|e| format!("cannot read bitstring from {path}: {e}"))?,
                (None, None) => {
                    return Err("source 'uploaded' needs --bits or --bits-file".into());
                }
            };
            Ok(SourceConfig::Uploaded { bitstring })
        }
        "file" => match args.file {
            Some(path) => Ok(SourceConfig::File {
                path: PathBuf::from(path),
            }),
            None => Err("source 'file' needs --file".into()),
        },
        "qrng" => Ok(SourceConfig::Hardware {
            library: library_path(args.library),
            serial: args.serial.map(str::to_string),
        }),
        other => Err(format!(
            "unknown source '{other}' (expected simulated, uploaded, file or qrng)"
        )),
    }
}

/// `--library` if given, else the MeterFeeder library in the working directory.
pub fn library_path(flag: Option<&str>) -> PathBuf {
    flag.map_or_else(hardware::default_library_path, PathBuf::from)
}

/// Horizontal bar of `width · count / max` cells.
pub fn bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let cells = (count as f64 / max as f64 * width as f64).round() as usize;
    "█".repeat(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_mode / parse_bias_delta
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("aim-low").unwrap(), AimMode::AimLow);
        assert!(parse_mode("up").is_err());
    }

    #[test]
    fn test_parse_bias_delta() {
        assert_eq!(parse_bias_delta("0.02").unwrap(), 0.02);
        assert_eq!(parse_bias_delta(" -0.5 ").unwrap(), -0.5);
        assert!(parse_bias_delta("0.7").is_err());
        assert!(parse_bias_delta("abc").is_err());
    }

    // -----------------------------------------------------------------------
    // source_config
    // -----------------------------------------------------------------------

    #[test]
    fn test_source_config_simulated() {
        let args = SourceArgs {
            source: "simulated",
            bias_delta: 0.1,
            seed: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            source_config(&args).unwrap(),
            SourceConfig::Simulated { seed: Some(3), .. }
        ));
    }

    #[test]
    fn test_source_config_uploaded_needs_bits() {
        let args = SourceArgs {
            source: "uploaded",
            ..Default::default()
        };
        assert!(source_config(&args).is_err());

        let args = SourceArgs {
            source: "uploaded",
            bits: Some("0101"),
            ..Default::default()
        };
        assert!(matches!(
            source_config(&args).unwrap(),
            SourceConfig::Uploaded { .. }
        ));
    }

    #[test]
    fn test_source_config_file_needs_path() {
        let args = SourceArgs {
            source: "file",
            ..Default::default()
        };
        assert!(source_config(&args).is_err());
    }

    #[test]
    fn test_source_config_qrng_library() {
        let args = SourceArgs {
            source: "qrng",
            library: Some("/opt/mf/libmeterfeeder.so"),
            ..Default::default()
        };
        match source_config(&args).unwrap() {
            SourceConfig::Hardware { library, serial } => {
                assert_eq!(library, PathBuf::from("/opt/mf/libmeterfeeder.so"));
                assert!(serial.is_none());
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_source_config_unknown() {
        let args = SourceArgs {
            source: "dice",
            ..Default::default()
        };
        assert!(source_config(&args).unwrap_err().contains("unknown source"));
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(5, 10, 10).chars().count(), 5);
        assert_eq!(bar(0, 10, 10), "");
        assert_eq!(bar(3, 0, 10), "");
    }
}
