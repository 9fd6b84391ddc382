#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lottery system that owns the random source and turns spin requests into
//! draw commands.
//!
//! The draw engine never touches randomness itself. This system samples an
//! absolute roll below the current total weight and hands it over as
//! [`Command::Draw`], so tests can swap in a [`FixedRoll`] and force any
//! outcome.

use draft_wheel_core::{Command, Roll};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Source of uniformly distributed rolls.
pub trait RandomSource {
    /// Samples a value in `[0, upper)`.
    ///
    /// Implementations return `0.0` when `upper` is not a positive finite
    /// number so the engine can report the real problem.
    fn sample_below(&mut self, upper: f64) -> f64;
}

/// Seedable ChaCha-backed random source.
#[derive(Clone, Debug)]
pub struct SeededSource {
    rng: ChaCha8Rng,
}

impl SeededSource {
    /// Creates a source whose sequence is fully determined by `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a source seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomSource for SeededSource {
    fn sample_below(&mut self, upper: f64) -> f64 {
        if !(upper.is_finite() && upper > 0.0) {
            return 0.0;
        }
        self.rng.gen_range(0.0..upper)
    }
}

/// Random source that always yields the same roll.
///
/// The value is returned as-is, even when it lies outside `[0, upper)`, which
/// lets tests exercise the engine's roll validation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedRoll(pub f64);

impl RandomSource for FixedRoll {
    fn sample_below(&mut self, _upper: f64) -> f64 {
        self.0
    }
}

/// Configuration parameters required to construct the lottery system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: Option<u64>,
}

impl Config {
    /// Creates a configuration with a fixed seed for reproducible drafts.
    #[must_use]
    pub const fn seeded(rng_seed: u64) -> Self {
        Self {
            rng_seed: Some(rng_seed),
        }
    }

    /// Creates a configuration that seeds from operating system entropy.
    #[must_use]
    pub const fn unseeded() -> Self {
        Self { rng_seed: None }
    }
}

/// Pure system that emits draw commands carrying freshly sampled rolls.
#[derive(Debug)]
pub struct Lottery<R = SeededSource> {
    source: R,
}

impl Lottery<SeededSource> {
    /// Creates a lottery backed by a ChaCha source built from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let source = match config.rng_seed {
            Some(seed) => SeededSource::from_seed(seed),
            None => SeededSource::from_entropy(),
        };
        Self { source }
    }
}

impl<R: RandomSource> Lottery<R> {
    /// Creates a lottery that draws its rolls from the supplied source.
    #[must_use]
    pub fn with_source(source: R) -> Self {
        Self { source }
    }

    /// Emits a [`Command::Draw`] when a spin has been requested.
    ///
    /// `total_weight` is the sum of the current active weights, as reported
    /// by the draw engine's queries.
    pub fn handle(&mut self, spin_requested: bool, total_weight: f64, out: &mut Vec<Command>) {
        if !spin_requested {
            return;
        }

        let roll = self.roll(total_weight);
        trace!(roll = roll.get(), total_weight, "sampled draw roll");
        out.push(Command::Draw { roll });
    }

    /// Samples a single roll below `total_weight`.
    pub fn roll(&mut self, total_weight: f64) -> Roll {
        Roll::new(self.source.sample_below(total_weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_source_stays_below_upper_bound() {
        let mut source = SeededSource::from_seed(0x5eed);
        for upper in [0.5, 1.0, 20.0, 57.0, 1e-6] {
            for _ in 0..500 {
                let value = source.sample_below(upper);
                assert!((0.0..upper).contains(&value), "{value} not below {upper}");
            }
        }
    }

    #[test]
    fn degenerate_upper_bounds_yield_zero() {
        let mut source = SeededSource::from_seed(7);
        assert_eq!(source.sample_below(0.0), 0.0);
        assert_eq!(source.sample_below(-3.0), 0.0);
        assert_eq!(source.sample_below(f64::NAN), 0.0);
        assert_eq!(source.sample_below(f64::INFINITY), 0.0);
    }

    #[test]
    fn idle_lottery_emits_nothing() {
        let mut lottery = Lottery::with_source(FixedRoll(1.0));
        let mut commands = Vec::new();
        lottery.handle(false, 20.0, &mut commands);
        assert!(commands.is_empty());
    }
}
