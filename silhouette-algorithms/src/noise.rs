//! Concrete [`NoiseSampler`] implementations.
//!
//! [`TwoSidedGeometricSampler`] matches the discrete-Laplace-style
//! mechanism spec §4.10's LEDP k-core formula assumes: the difference of
//! two independent geometric draws, which is the standard way to realize a
//! two-sided geometric (discrete Laplace) distribution from a single
//! uniform source.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::driver::NoiseSampler;

/// Draws two-sided geometric noise via `Geom(p) - Geom(p)`, with `p`
/// derived from `scale` as `1 - exp(-1/scale)`.
pub struct TwoSidedGeometricSampler {
    rng: Mutex<ChaCha20Rng>,
}

impl TwoSidedGeometricSampler {
    /// Builds a sampler seeded from the OS RNG.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::from_rng(rand::thread_rng()).expect("rng seeding cannot fail")),
        }
    }

    /// Builds a sampler with a fixed seed, for reproducible tests.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::from_seed(seed)),
        }
    }

    fn geometric(rng: &mut ChaCha20Rng, p: f64) -> f64 {
        let u: f64 = rng.r#gen::<f64>().clamp(f64::MIN_POSITIVE, 1.0);
        (u.ln() / (1.0 - p).ln()).floor()
    }
}

impl Default for TwoSidedGeometricSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSampler for TwoSidedGeometricSampler {
    fn sample(&self, scale: f64) -> f64 {
        if scale <= 0.0 {
            return 0.0;
        }
        let p = 1.0 - (-1.0 / scale).exp();
        let mut rng = self.rng.lock();
        Self::geometric(&mut rng, p) - Self::geometric(&mut rng, p)
    }
}
