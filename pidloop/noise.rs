//! Measurement noise sources
//!
//! The controller adds a zero-mean Gaussian sample to every error it measures.
//! The random source is owned by the controller and can be seeded, so runs
//! with the same seed produce the same noise sequence.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Source of zero-mean measurement noise
pub trait NoiseSource: Send {
    /// Draw one sample with the given standard deviation.
    ///
    /// `std_dev` is always finite and non-negative.
    fn sample(&mut self, std_dev: f64) -> f64;
}

/// Gaussian noise backed by a seedable ChaCha generator
#[derive(Clone, Debug)]
pub struct GaussianNoise {
    rng: ChaCha8Rng,
}

impl GaussianNoise {
    /// Deterministic noise sequence
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Noise sequence seeded from the OS
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl Default for GaussianNoise {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl NoiseSource for GaussianNoise {
    fn sample(&mut self, std_dev: f64) -> f64 {
        if std_dev == 0.0 {
            return 0.0;
        }

        // Normal::new only fails for a negative or non-finite std_dev
        match Normal::new(0.0, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }
}

/// Noise source that always returns zero
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl NoiseSource for Silent {
    fn sample(&mut self, _std_dev: f64) -> f64 {
        0.0
    }
}
