//! Pseudo-random bits with an optional directional skew.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::RwbaError;
use crate::source::{EntropySource, SourceError, SourceInfo, SourceKind};

static SIMULATED_INFO: SourceInfo = SourceInfo {
    name: "simulated",
    description: "Independent pseudo-random draws; a positive bias delta favors zeros",
    kind: SourceKind::Simulated,
};

/// Independent bits: each is 1 when a uniform draw in `[0, 1)` exceeds
/// `0.5 + bias_delta`.
///
/// A positive `bias_delta` therefore lowers the density of ones and a negative
/// one raises it. With a seed, the sequence is reproducible across runs.
pub struct SimulatedSource {
    bias_delta: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedSource {
    /// `bias_delta` must lie in `[-0.5, 0.5]`.
    pub fn new(bias_delta: f64, seed: Option<u64>) -> Result<Self, RwbaError> {
        if !(-0.5..=0.5).contains(&bias_delta) {
            return Err(RwbaError::invalid(format!(
                "bias delta {bias_delta} outside [-0.5, 0.5]"
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            bias_delta,
            rng: Mutex::new(rng),
        })
    }

    pub fn bias_delta(&self) -> f64 {
        self.bias_delta
    }
}

impl EntropySource for SimulatedSource {
    fn info(&self) -> &SourceInfo {
        &SIMULATED_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn get_bits(&self, count: usize) -> Result<Vec<u8>, SourceError> {
        let threshold = 0.5 + self.bias_delta;
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SourceError::Unavailable("simulated generator poisoned".into()))?;
        Ok((0..count)
            .map(|_| u8::from(rng.random::<f64>() > threshold))
            .collect())
    }
}
