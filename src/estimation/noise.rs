//! Randomness source for stochastic estimates.
//!
//! `Deterministic` leaves every factor untouched, which keeps estimates
//! bit-identical for identical inputs. `Stochastic` jitters factors and adds
//! Gaussian noise scaled to the base time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

pub const JITTER_LOW: f64 = 0.95;
pub const JITTER_HIGH: f64 = 1.05;
/// Standard deviation of the additive noise, as a fraction of base time.
pub const NOISE_STD_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateMode {
    #[default]
    Deterministic,
    Stochastic,
}

#[derive(Debug, Clone)]
pub enum NoiseSource {
    Deterministic,
    Stochastic(ChaCha8Rng),
}

impl NoiseSource {
    pub fn deterministic() -> Self {
        Self::Deterministic
    }

    pub fn seeded(seed: u64) -> Self {
        Self::Stochastic(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::Stochastic(ChaCha8Rng::from_entropy())
    }

    pub fn for_mode(mode: EstimateMode, seed: Option<u64>) -> Self {
        match (mode, seed) {
            (EstimateMode::Deterministic, _) => Self::Deterministic,
            (EstimateMode::Stochastic, Some(seed)) => Self::seeded(seed),
            (EstimateMode::Stochastic, None) => Self::from_entropy(),
        }
    }

    pub fn mode(&self) -> EstimateMode {
        match self {
            Self::Deterministic => EstimateMode::Deterministic,
            Self::Stochastic(_) => EstimateMode::Stochastic,
        }
    }

    /// Multiplier applied to one factor; exactly 1.0 when deterministic.
    pub fn jitter(&mut self) -> f64 {
        match self {
            Self::Deterministic => 1.0,
            Self::Stochastic(rng) => rng.gen_range(JITTER_LOW..=JITTER_HIGH),
        }
    }

    /// Additive noise drawn from `Normal(0, NOISE_STD_RATIO * base_minutes)`.
    pub fn gaussian(&mut self, base_minutes: f64) -> Option<f64> {
        match self {
            Self::Deterministic => None,
            Self::Stochastic(rng) => {
                let std_dev = NOISE_STD_RATIO * base_minutes.abs();
                if std_dev == 0.0 {
                    return Some(0.0);
                }
                let z: f64 = rng.sample(StandardNormal);
                Some(z * std_dev)
            }
        }
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::Deterministic
    }
}
