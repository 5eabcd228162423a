//! Seeded Gaussian noise source

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gaussian noise generator.
///
/// Owned by the simulation loop and lent to the sensors each tick, so independent simulations
/// never share a random stream.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng: StdRng,
    seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NoiseGenerator {
    /// Create a new generator. With a seed the sequence is reproducible, without one it is seeded
    /// from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self { rng, seed }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Zero-mean Gaussian sample with the given standard deviation.
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev <= 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }
}
