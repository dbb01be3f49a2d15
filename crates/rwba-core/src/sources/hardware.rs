//! Hardware quantum RNG through the MeterFeeder shared library.
//!
//! The library is loaded at runtime, so builds never link against it and a
//! machine without the device simply reports the source as unavailable.

use std::ffi::{CStr, c_char, c_int, c_uchar};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use libloading::Library;
use serde::Serialize;

use crate::bits::bytes_to_bits;
use crate::source::{EntropySource, SourceError, SourceInfo, SourceKind};

static HARDWARE_INFO: SourceInfo = SourceInfo {
    name: "qrng",
    description: "Quantum RNG device queried through the MeterFeeder library",
    kind: SourceKind::Hardware,
};

const ERROR_REASON_LEN: usize = 256;
const SERIAL_LEN: usize = 58;

type InitializeFn = unsafe extern "C" fn(*mut c_char) -> c_int;
type NumberGeneratorsFn = unsafe extern "C" fn() -> c_int;
type GetBytesFn = unsafe extern "C" fn(c_int, *mut c_uchar, *mut c_char, *mut c_char);

/// Platform file name of the MeterFeeder library.
pub fn library_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "meterfeeder.dll"
    } else if cfg!(target_os = "macos") {
        "libmeterfeeder.dylib"
    } else {
        "libmeterfeeder.so"
    }
}

/// The library in the current working directory.
pub fn default_library_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_default()
        .join(library_file_name())
}

/// Device availability, as reported by `/qrng/status`.
#[derive(Debug, Clone, Serialize)]
pub struct HardwareStatus {
    pub available: bool,
    pub number_of_generators: usize,
    pub runtime_ok: bool,
    pub library_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probe the library at `path` without keeping it loaded.
pub fn probe(path: &Path) -> HardwareStatus {
    match HardwareSource::open(path, None) {
        Ok(source) => {
            let generators = source.generator_count();
            HardwareStatus {
                available: true,
                number_of_generators: generators,
                runtime_ok: generators > 0,
                library_initialized: true,
                error: None,
            }
        }
        Err(e) => HardwareStatus {
            available: false,
            number_of_generators: 0,
            runtime_ok: false,
            library_initialized: false,
            error: Some(e.to_string()),
        },
    }
}

/// A MeterFeeder-attached QRNG.
pub struct HardwareSource {
    initialize: InitializeFn,
    number_generators: NumberGeneratorsFn,
    get_bytes: GetBytesFn,
    serial: [u8; SERIAL_LEN],
    // Device calls are serialized; the library keeps global state.
    device: Mutex<()>,
    _library: Library,
}

impl HardwareSource {
    /// Load the library, resolve its entry points and initialize it.
    ///
    /// `serial` selects a generator; `None` lets the library pick.
    pub fn open(path: &Path, serial: Option<&str>) -> Result<Self, SourceError> {
        // SAFETY: loading a shared library runs its initializers. The path is
        // chosen by the operator and expected to be the MeterFeeder build.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            SourceError::Unavailable(format!("MeterFeeder library not available: {e}"))
        })?;

        // SAFETY: the signatures match the MeterFeeder C API.
        let (initialize, number_generators, get_bytes) = unsafe {
            (
                *library
                    .get::<InitializeFn>(b"MF_Initialize\0")
                    .map_err(missing_symbol)?,
                *library
                    .get::<NumberGeneratorsFn>(b"MF_GetNumberGenerators\0")
                    .map_err(missing_symbol)?,
                *library
                    .get::<GetBytesFn>(b"MF_GetBytes\0")
                    .map_err(missing_symbol)?,
            )
        };

        let mut serial_buf = [0u8; SERIAL_LEN];
        if let Some(s) = serial {
            let bytes = s.as_bytes();
            let len = bytes.len().min(SERIAL_LEN - 1);
            serial_buf[..len].copy_from_slice(&bytes[..len]);
        }

        let source = Self {
            initialize,
            number_generators,
            get_bytes,
            serial: serial_buf,
            device: Mutex::new(()),
            _library: library,
        };
        source.init()?;
        log::info!("MeterFeeder loaded from {}", path.display());
        Ok(source)
    }

    fn init(&self) -> Result<(), SourceError> {
        let mut reason = [0u8; ERROR_REASON_LEN];
        // SAFETY: `reason` outlives the call and has the size the API expects.
        unsafe { (self.initialize)(reason.as_mut_ptr().cast()) };
        match read_reason(&reason) {
            Some(msg) => Err(SourceError::Device(msg)),
            None => Ok(()),
        }
    }

    /// Number of generators the library can see.
    pub fn generator_count(&self) -> usize {
        let _guard = self.device.lock();
        // SAFETY: no arguments; the library was initialized in `open`.
        let n = unsafe { (self.number_generators)() };
        usize::try_from(n).unwrap_or(0)
    }
}

impl EntropySource for HardwareSource {
    fn info(&self) -> &SourceInfo {
        &HARDWARE_INFO
    }

    fn is_available(&self) -> bool {
        self.generator_count() > 0
    }

    fn get_bits(&self, count: usize) -> Result<Vec<u8>, SourceError> {
        if self.generator_count() == 0 {
            return Err(SourceError::Unavailable("No QRNG generators found".into()));
        }

        let byte_count = count.div_ceil(8);
        let length = c_int::try_from(byte_count).map_err(|_| {
            SourceError::Device(format!("request of {byte_count} bytes exceeds device limit"))
        })?;

        let mut buffer = vec![0u8; byte_count];
        let mut serial = self.serial;
        let mut reason = [0u8; ERROR_REASON_LEN];
        {
            let _guard = self
                .device
                .lock()
                .map_err(|_| SourceError::Device("device lock poisoned".into()))?;
            // SAFETY: every buffer is live for the call and sized as the API
            // requires; `buffer` holds exactly `length` bytes.
            unsafe {
                (self.get_bytes)(
                    length,
                    buffer.as_mut_ptr(),
                    serial.as_mut_ptr().cast(),
                    reason.as_mut_ptr().cast(),
                )
            };
        }
        if let Some(msg) = read_reason(&reason) {
            return Err(SourceError::Device(msg));
        }

        let mut bits = bytes_to_bits(&buffer);
        bits.truncate(count);
        Ok(bits)
    }
}

fn missing_symbol(e: libloading::Error) -> SourceError {
    SourceError::Unavailable(format!("MeterFeeder library is missing an entry point: {e}"))
}

/// Non-empty NUL-terminated message in `buf`, if any.
fn read_reason(buf: &[u8]) -> Option<String> {
    let msg = CStr::from_bytes_until_nul(buf).ok()?.to_string_lossy();
    let msg = msg.trim();
    if msg.is_empty() { None } else { Some(msg.to_string()) }
}
