//! Injectable uniform random sources.
//!
//! The engine draws every random number through [`RandomSource`], so a run is
//! reproducible whenever the source is. Any `rand` generator works; seeded
//! [`ChaCha8Rng`] is the usual choice, and [`Sequence`] replays fixed values.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A source of uniform values in `[0, 1)`.
pub trait RandomSource {
    /// Returns the next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Creates the crate's default deterministic generator from a seed.
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Replays a fixed list of values, wrapping around at the end.
///
/// Values are clamped into `[0, 1)` on construction so a sequence can never
/// violate the [`RandomSource`] contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    values: Vec<f64>,
    cursor: usize,
}

impl Sequence {
    /// Creates a sequence. An empty list behaves like a constant zero.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values
            .into()
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { values, cursor: 0 }
    }

    /// A sequence that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of values consumed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for Sequence {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}
