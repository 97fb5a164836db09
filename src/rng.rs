// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Tycoon Economy Simulation Suite ("The Backdrop") - Seedable RNG

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// SimRng - the single randomness source injected into each simulator
// ---------------------------------------------------------------------------

/// Seedable pseudo-random generator owned by each stochastic component.
///
/// Wraps `ChaCha8Rng` so a simulation constructed `with_seed` replays
/// identically tick for tick. Production constructors seed from OS entropy.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform draw in `[min, max]`. Degenerate ranges collapse to `min`.
    pub fn range_u32(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// One standard-normal variate via the Box-Muller cosine transform:
    /// two independent uniforms, `sqrt(-2 ln u1) * cos(2 pi u2)`.
    pub fn normal(&mut self) -> f64 {
        // gen() is [0, 1); flip so the log argument stays in (0, 1].
        let u1: f64 = 1.0 - self.inner.gen::<f64>();
        let u2: f64 = self.inner.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
