//! Entropy source capability.
//!
//! Every backend implements [`EntropySource`]: given a bit count, return
//! exactly that many bits in order, or fail. The analysis engine never
//! retries, never pads a short return and never substitutes another backend.

use serde::Serialize;

use crate::error::RwbaError;

/// Kind of backend behind a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Pseudo-random draws with an optional skew.
    Simulated,
    /// Bits supplied inline by the caller.
    Uploaded,
    /// Bits read from a file on disk.
    FileBacked,
    /// A hardware quantum RNG.
    Hardware,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => write!(f, "simulated"),
            Self::Uploaded => write!(f, "uploaded"),
            Self::FileBacked => write!(f, "file"),
            Self::Hardware => write!(f, "qrng"),
        }
    }
}

/// Metadata about an entropy source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"simulated"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    pub kind: SourceKind,
}

/// Failures reported by a source backend.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The backend cannot be used on this machine right now.
    #[error("{0}")]
    Unavailable(String),

    /// The device accepted the request but reported a failure.
    #[error("Device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait that every entropy source must implement.
pub trait EntropySource: Send + Sync {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Return up to `count` bits, each `0` or `1`, in acquisition order.
    ///
    /// Sources backed by finite data may return fewer bits than asked for;
    /// [`fetch_bits`] turns that into an error.
    fn get_bits(&self, count: usize) -> Result<Vec<u8>, SourceError>;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Fetch exactly `count` bits from `source`.
///
/// A short return is reported as [`RwbaError::InsufficientEntropy`] rather
/// than analysed in truncated form.
pub fn fetch_bits(source: &dyn EntropySource, count: usize) -> Result<Vec<u8>, RwbaError> {
    let bits = source.get_bits(count)?;
    if bits.len() < count {
        log::warn!(
            "source '{}' returned {} of {count} requested bits",
            source.name(),
            bits.len()
        );
        return Err(RwbaError::InsufficientEntropy {
            needed: count,
            got: bits.len(),
        });
    }
    log::debug!("fetched {count} bits from '{}'", source.name());
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    static STUB_INFO: SourceInfo = SourceInfo {
        name: "stub",
        description: "fixed-length test source",
        kind: SourceKind::Uploaded,
    };

    struct Stub(usize);

    impl EntropySource for Stub {
        fn info(&self) -> &SourceInfo {
            &STUB_INFO
        }
        fn is_available(&self) -> bool {
            true
        }
        fn get_bits(&self, count: usize) -> Result<Vec<u8>, SourceError> {
            Ok(vec![1; count.min(self.0)])
        }
    }

    struct Broken;

    impl EntropySource for Broken {
        fn info(&self) -> &SourceInfo {
            &STUB_INFO
        }
        fn is_available(&self) -> bool {
            false
        }
        fn get_bits(&self, _count: usize) -> Result<Vec<u8>, SourceError> {
            Err(SourceError::Unavailable("No QRNG generators found".into()))
        }
    }

    #[test]
    fn test_fetch_exact() {
        let bits = fetch_bits(&Stub(100), 64).unwrap();
        assert_eq!(bits.len(), 64);
    }

    #[test]
    fn test_fetch_short_is_error() {
        let err = fetch_bits(&Stub(10), 64).unwrap_err();
        assert!(matches!(
            err,
            RwbaError::InsufficientEntropy { needed: 64, got: 10 }
        ));
    }

    #[test]
    fn test_fetch_propagates_source_error() {
        let err = fetch_bits(&Broken, 8).unwrap_err();
        assert!(matches!(err, RwbaError::Source(SourceError::Unavailable(_))));
        assert_eq!(err.to_string(), "No QRNG generators found");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(SourceKind::Simulated.to_string(), "simulated");
        assert_eq!(SourceKind::Hardware.to_string(), "qrng");
    }
}
