//! Entropy source implementations and configuration-driven selection.

pub mod file;
pub mod hardware;
pub mod simulated;
pub mod uploaded;

use std::path::PathBuf;

pub use file::FileSource;
pub use hardware::{HardwareSource, HardwareStatus};
pub use simulated::SimulatedSource;
pub use uploaded::UploadedSource;

use crate::error::RwbaError;
use crate::source::{EntropySource, SourceKind};

/// Which backend to draw bits from, with its parameters.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Simulated {
        bias_delta: f64,
        seed: Option<u64>,
    },
    Uploaded {
        bitstring: String,
    },
    File {
        path: PathBuf,
    },
    Hardware {
        library: PathBuf,
        serial: Option<String>,
    },
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Simulated { .. } => SourceKind::Simulated,
            Self::Uploaded { .. } => SourceKind::Uploaded,
            Self::File { .. } => SourceKind::FileBacked,
            Self::Hardware { .. } => SourceKind::Hardware,
        }
    }

    /// Hardware source using the library in the working directory.
    pub fn default_hardware() -> Self {
        Self::Hardware {
            library: hardware::default_library_path(),
            serial: None,
        }
    }

    /// Construct the configured source.
    ///
    /// Fails when the backend cannot be set up; there is no fallback to a
    /// different backend.
    pub fn build(&self) -> Result<Box<dyn EntropySource>, RwbaError> {
        let source: Box<dyn EntropySource> = match self {
            Self::Simulated { bias_delta, seed } => {
                Box::new(SimulatedSource::new(*bias_delta, *seed)?)
            }
            Self::Uploaded { bitstring } => {
                let src = UploadedSource::from_bitstring(bitstring);
                if src.is_empty() {
                    return Err(RwbaError::invalid("uploaded bitstring contains no bits"));
                }
                Box::new(src)
            }
            Self::File { path } => Box::new(FileSource::new(path.clone())),
            Self::Hardware { library, serial } => {
                Box::new(HardwareSource::open(library, serial.as_deref())?)
            }
        };
        log::debug!("built entropy source '{}'", source.name());
        Ok(source)
    }
}
