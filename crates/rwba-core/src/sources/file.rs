//! Bits read from a binary file.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::bits::bytes_to_bits;
use crate::source::{EntropySource, SourceError, SourceInfo, SourceKind};

static FILE_INFO: SourceInfo = SourceInfo {
    name: "file",
    description: "Raw bytes from a file, expanded MSB-first into bits",
    kind: SourceKind::FileBacked,
};

/// Entropy recorded to disk, e.g. a capture from a hardware generator.
///
/// The file is read on every request so a capture that is still growing is
/// picked up.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntropySource for FileSource {
    fn info(&self) -> &SourceInfo {
        &FILE_INFO
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn get_bits(&self, count: usize) -> Result<Vec<u8>, SourceError> {
        let limit = u64::try_from(count.div_ceil(8)).unwrap_or(u64::MAX);
        let mut data = Vec::new();
        File::open(&self.path)?.take(limit).read_to_end(&mut data)?;
        let mut bits = bytes_to_bits(&data);
        bits.truncate(count);
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_bits_msb_first() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("capture.bin");
        std::fs::write(&path, [0b1010_0000, 0xFF]).unwrap();

        let src = FileSource::new(&path);
        assert!(src.is_available());
        assert_eq!(src.get_bits(4).unwrap(), vec![1, 0, 1, 0]);
        assert_eq!(src.get_bits(16).unwrap().len(), 16);
        assert_eq!(src.get_bits(100).unwrap().len(), 16);
    }

    #[test]
    fn test_reads_only_the_requested_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("large.bin");
        let mut data = vec![0xF0, 0x3C];
        data.resize(1000, 0xAA);
        std::fs::write(&path, &data).unwrap();

        let src = FileSource::new(&path);
        assert_eq!(
            src.get_bits(12).unwrap(),
            vec![1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1]
        );
        assert_eq!(src.get_bits(0).unwrap(), Vec::<u8>::new());
        assert_eq!(src.get_bits(usize::MAX).unwrap().len(), 8000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let src = FileSource::new("/nonexistent/rwba/capture.bin");
        assert!(!src.is_available());
        assert!(matches!(src.get_bits(8), Err(SourceError::Io(_))));
    }
}
