//! Caller-supplied bitstrings.

use crate::bits::parse_bitstring;
use crate::source::{EntropySource, SourceError, SourceInfo, SourceKind};

static UPLOADED_INFO: SourceInfo = SourceInfo {
    name: "uploaded",
    description: "Bitstring supplied with the request; characters other than 0/1 are ignored",
    kind: SourceKind::Uploaded,
};

/// A fixed bit sequence handed in by the caller.
pub struct UploadedSource {
    bits: Vec<u8>,
}

impl UploadedSource {
    /// Parse a `'0'`/`'1'` string, skipping every other character.
    pub fn from_bitstring(text: &str) -> Self {
        Self {
            bits: parse_bitstring(text),
        }
    }

    pub fn from_bits(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl EntropySource for UploadedSource {
    fn info(&self) -> &SourceInfo {
        &UPLOADED_INFO
    }

    fn is_available(&self) -> bool {
        !self.bits.is_empty()
    }

    fn get_bits(&self, count: usize) -> Result<Vec<u8>, SourceError> {
        Ok(self.bits[..count.min(self.bits.len())].to_vec())
    }
}
