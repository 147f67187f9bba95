//! Crossers.
//!
//! All crossers pick their parents uniformly at random from the population
//! and never modify them. The number of crossover operations per
//! generation is `rate * population / parents`, rounded probabilistically
//! so the configured rate holds on average.
//!
//! # References
//!
//! - De Jong & Spears (1992), "A formal analysis of the role of multi-point
//!   crossover in genetic algorithms"
//! - Eiben & Smith (2015), *Introduction to Evolutionary Computing*, ch. 4

use super::{Crosser, GeneticAlgorithmOperator, OperatorContext, OperatorKind};
use crate::design::{BitManipulator, Design, DesignGroup};
use crate::error::ConfigError;
use crate::params::{poll_rate, poll_size_at_least, tags, ParameterDatabase};
use crate::random::probabilistic_round;
use rand::seq::index::sample;
use rand::Rng;

/// Number of crossover operations for a population of `pop_len`.
fn operation_count<R: Rng>(rate: f64, pop_len: usize, parents: usize, rng: &mut R) -> usize {
    if pop_len < parents || parents == 0 {
        return 0;
    }
    probabilistic_round(rate * pop_len as f64 / parents as f64, rng)
}

/// `count` distinct sorted cut positions in `1..len`.
fn cut_points<R: Rng>(len: u64, count: usize, rng: &mut R) -> Vec<u64> {
    if len < 2 {
        return Vec::new();
    }
    let slots = (len - 1) as usize;
    let mut cuts: Vec<u64> = sample(rng, slots, count.min(slots))
        .into_iter()
        .map(|i| i as u64 + 1)
        .collect();
    cuts.sort_unstable();
    cuts
}

// ============================================================================
// Null
// ============================================================================

/// Performs no crossover.
#[derive(Debug, Clone, Default)]
pub struct NullCrosser;

impl GeneticAlgorithmOperator for NullCrosser {
    fn name(&self) -> &'static str {
        "null_crossover"
    }

    fn description(&self) -> &'static str {
        "Does nothing."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Crosser
    }
}

impl Crosser for NullCrosser {
    fn crossover(&mut self, _ctx: &mut OperatorContext<'_>, _from: &DesignGroup, _into: &mut DesignGroup) {}

    fn rate(&self) -> f64 {
        0.0
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Crosser> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Multi-point binary
// ============================================================================

/// N-point crossover on the binary encoding of the whole design.
///
/// Cuts may fall inside a variable, so children can decode to values past
/// a variable's last grid step.
#[derive(Debug)]
pub struct MultiPointBinaryCrosser {
    rate: f64,
    num_cross_points: usize,
    bits: Option<BitManipulator>,
}

impl Default for MultiPointBinaryCrosser {
    fn default() -> Self {
        Self::new(0.75, 2)
    }
}

impl MultiPointBinaryCrosser {
    pub fn new(rate: f64, num_cross_points: usize) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            num_cross_points: num_cross_points.max(1),
            bits: None,
        }
    }

    pub fn num_cross_points(&self) -> usize {
        self.num_cross_points
    }
}

impl GeneticAlgorithmOperator for MultiPointBinaryCrosser {
    fn name(&self) -> &'static str {
        "multi_point_binary"
    }

    fn description(&self) -> &'static str {
        "N-point crossover on the bit-encoded genome of a pair of parents."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Crosser
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.rate = poll_rate(db, tags::CROSSOVER_RATE, self.rate)?;
        self.num_cross_points = poll_size_at_least(db, tags::NUM_CROSS_POINTS, self.num_cross_points, 1)?;
        log::debug!(
            "{}: rate = {}, num_cross_points = {}",
            self.name(),
            self.rate,
            self.num_cross_points
        );
        Ok(())
    }
}

impl Crosser for MultiPointBinaryCrosser {
    fn crossover(&mut self, ctx: &mut OperatorContext<'_>, from: &DesignGroup, into: &mut DesignGroup) {
        let ops = operation_count(self.rate, from.len(), 2, ctx.rng);
        if ops == 0 {
            return;
        }
        let bits = self.bits.get_or_insert_with(|| BitManipulator::new(ctx.target));
        bits.refresh();
        let total = bits.total_bits();

        for _ in 0..ops {
            let parents = sample(ctx.rng, from.len(), 2);
            let (Some(mom), Some(dad)) = (from.get(parents.index(0)), from.get(parents.index(1))) else {
                continue;
            };
            let cuts = cut_points(total, self.num_cross_points, ctx.rng);
            let (a, b) = bits.cross(&bits.encode(mom), &bits.encode(dad), &cuts);
            for words in [a, b] {
                let mut child = ctx.target.new_design();
                bits.decode_into(&words, &mut child);
                into.insert(child);
            }
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Crosser> {
        Box::new(Self::new(self.rate, self.num_cross_points))
    }
}

// ============================================================================
// Multi-point real
// ============================================================================

/// N-point crossover with cuts only between variables.
///
/// Children inherit whole variable values, so they stay in the domain.
#[derive(Debug, Clone)]
pub struct MultiPointRealCrosser {
    rate: f64,
    num_cross_points: usize,
}

impl Default for MultiPointRealCrosser {
    fn default() -> Self {
        Self::new(0.75, 2)
    }
}

impl MultiPointRealCrosser {
    pub fn new(rate: f64, num_cross_points: usize) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            num_cross_points: num_cross_points.max(1),
        }
    }
}

impl GeneticAlgorithmOperator for MultiPointRealCrosser {
    fn name(&self) -> &'static str {
        "multi_point_real"
    }

    fn description(&self) -> &'static str {
        "N-point crossover with cut points between variables."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Crosser
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.rate = poll_rate(db, tags::CROSSOVER_RATE, self.rate)?;
        self.num_cross_points = poll_size_at_least(db, tags::NUM_CROSS_POINTS, self.num_cross_points, 1)?;
        log::debug!(
            "{}: rate = {}, num_cross_points = {}",
            self.name(),
            self.rate,
            self.num_cross_points
        );
        Ok(())
    }
}

impl Crosser for MultiPointRealCrosser {
    fn crossover(&mut self, ctx: &mut OperatorContext<'_>, from: &DesignGroup, into: &mut DesignGroup) {
        let ops = operation_count(self.rate, from.len(), 2, ctx.rng);
        let ndv = ctx.target.ndv();
        for _ in 0..ops {
            let parents = sample(ctx.rng, from.len(), 2);
            let (Some(mom), Some(dad)) = (from.get(parents.index(0)), from.get(parents.index(1))) else {
                continue;
            };
            let cuts = cut_points(ndv as u64, self.num_cross_points, ctx.rng);
            let mut a = mom.variables().to_vec();
            let mut b = dad.variables().to_vec();
            let mut swapped = false;
            let mut cut_iter = cuts.iter().peekable();
            for i in 0..ndv {
                if cut_iter.next_if(|&&c| c == i as u64).is_some() {
                    swapped = !swapped;
                }
                if swapped {
                    std::mem::swap(&mut a[i], &mut b[i]);
                }
            }
            for reps in [a, b] {
                let mut child = ctx.target.new_design();
                child.set_variables(&reps);
                into.insert(child);
            }
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Crosser> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Shuffle random
// ============================================================================

/// Each child variable is taken from a randomly chosen parent.
#[derive(Debug, Clone)]
pub struct ShuffleRandomCrosser {
    rate: f64,
    num_parents: usize,
    num_offspring: usize,
}

impl Default for ShuffleRandomCrosser {
    fn default() -> Self {
        Self::new(0.75, 2, 2)
    }
}

impl ShuffleRandomCrosser {
    pub fn new(rate: f64, num_parents: usize, num_offspring: usize) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            num_parents: num_parents.max(2),
            num_offspring: num_offspring.max(1),
        }
    }
}

impl GeneticAlgorithmOperator for ShuffleRandomCrosser {
    fn name(&self) -> &'static str {
        "shuffle_random"
    }

    fn description(&self) -> &'static str {
        "Builds each child variable from a randomly chosen parent."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Crosser
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.rate = poll_rate(db, tags::CROSSOVER_RATE, self.rate)?;
        self.num_parents = poll_size_at_least(db, tags::NUM_PARENTS, self.num_parents, 2)?;
        self.num_offspring = poll_size_at_least(db, tags::NUM_OFFSPRING, self.num_offspring, 1)?;
        log::debug!(
            "{}: rate = {}, num_parents = {}, num_offspring = {}",
            self.name(),
            self.rate,
            self.num_parents,
            self.num_offspring
        );
        Ok(())
    }
}

impl Crosser for ShuffleRandomCrosser {
    fn crossover(&mut self, ctx: &mut OperatorContext<'_>, from: &DesignGroup, into: &mut DesignGroup) {
        let ops = operation_count(self.rate, from.len(), self.num_parents, ctx.rng);
        let ndv = ctx.target.ndv();
        for _ in 0..ops {
            let parents: Vec<&Design> = sample(ctx.rng, from.len(), self.num_parents)
                .into_iter()
                .filter_map(|i| from.get(i))
                .collect();
            for _ in 0..self.num_offspring {
                let reps: Vec<f64> = (0..ndv)
                    .map(|v| parents[ctx.rng.random_range(0..parents.len())].variable_rep(v))
                    .collect();
                let mut child = ctx.target.new_design();
                child.set_variables(&reps);
                into.insert(child);
            }
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Crosser> {
        Box::new(self.clone())
    }
}
