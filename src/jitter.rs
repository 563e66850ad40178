//! Jitter sources for the synthetic provincial distribution.
//!
//! The distributor asks for one factor per (province, column). Production
//! runs draw from an RNG; tests plug in fixed or scripted factors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lower bound of the per-province, per-column jitter factor.
pub const JITTER_LOW: f64 = 0.8;
/// Upper bound (exclusive) of the jitter factor.
pub const JITTER_HIGH: f64 = 1.2;

pub trait JitterSource {
    /// Draw a factor from `[low, high)`.
    fn factor(&mut self, low: f64, high: f64) -> f64;
}

/// RNG-backed jitter, uniform over the requested range.
pub struct RandomJitter<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomJitter<StdRng> {
    /// Unseeded: every run produces a different distribution.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> JitterSource for RandomJitter<R> {
    fn factor(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..high)
    }
}

/// Always returns the same factor, ignoring the range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedJitter(pub f64);

impl FixedJitter {
    pub fn identity() -> Self {
        FixedJitter(1.0)
    }
}

impl JitterSource for FixedJitter {
    fn factor(&mut self, _low: f64, _high: f64) -> f64 {
        self.0
    }
}

/// Replays a fixed sequence of factors, cycling when exhausted.
#[derive(Clone, Debug)]
pub struct ScriptedJitter {
    factors: Vec<f64>,
    cursor: usize,
}

impl ScriptedJitter {
    pub fn new(factors: Vec<f64>) -> Self {
        Self { factors, cursor: 0 }
    }

    /// Number of factors handed out so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl JitterSource for ScriptedJitter {
    fn factor(&mut self, _low: f64, _high: f64) -> f64 {
        if self.factors.is_empty() {
            return 1.0;
        }
        let value = self.factors[self.cursor % self.factors.len()];
        self.cursor += 1;
        value
    }
}
