//! Random number helpers shared by all operators.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The generator type threaded through every operator call.
pub type EvolveRng = StdRng;

/// Creates a seeded generator.
///
/// The same seed always yields the same sequence, which makes whole runs
/// reproducible when evaluation is deterministic.
pub fn create_rng(seed: u64) -> EvolveRng {
    StdRng::seed_from_u64(seed)
}

/// Rounds a fractional operation count so that its expectation is preserved.
///
/// `2.3` becomes `3` with probability 0.3 and `2` otherwise. Operators use
/// this when a rate times a population size has to become a whole number of
/// operations, so a configured rate is honored on average instead of being
/// truncated away.
///
/// Negative and non-finite inputs yield 0.
pub fn probabilistic_round<R: Rng>(value: f64, rng: &mut R) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let whole = value.floor();
    let frac = value - whole;
    let extra = if frac > 0.0 && rng.random_bool(frac) { 1 } else { 0 };
    whole as usize + extra
}
