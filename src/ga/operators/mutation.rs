//! Mutators.
//!
//! A mutator copies randomly chosen population members into the children
//! group and perturbs the copies; the population itself is never touched.
//! The number of mutations per generation is `rate * population * genes`
//! (genes are variables, or bits for [`BitRandomMutator`]), rounded
//! probabilistically.
//!
//! # References
//!
//! - Bäck (1996), *Evolutionary Algorithms in Theory and Practice*
//! - Yao, Liu & Lin (1999), "Evolutionary Programming Made Faster"
//!   (Cauchy mutation)

use super::{GeneticAlgorithmOperator, Mutator, OperatorContext, OperatorKind};
use crate::design::{BitManipulator, DesignGroup};
use crate::error::ConfigError;
use crate::params::{poll_rate, tags, ParameterDatabase};
use crate::random::probabilistic_round;
use rand::Rng;
use rand_distr::{Cauchy, Normal};

// ============================================================================
// Null
// ============================================================================

/// Performs no mutation.
#[derive(Debug, Clone, Default)]
pub struct NullMutator;

impl GeneticAlgorithmOperator for NullMutator {
    fn name(&self) -> &'static str {
        "null_mutation"
    }

    fn description(&self) -> &'static str {
        "Does nothing."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Mutator
    }
}

impl Mutator for NullMutator {
    fn mutate(&mut self, _ctx: &mut OperatorContext<'_>, _pop: &DesignGroup, _children: &mut DesignGroup) {}

    fn rate(&self) -> f64 {
        0.0
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Mutator> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Bit random
// ============================================================================

/// Flips random bits of the binary encoding.
#[derive(Debug)]
pub struct BitRandomMutator {
    rate: f64,
    bits: Option<BitManipulator>,
}

impl Default for BitRandomMutator {
    fn default() -> Self {
        Self::new(0.08)
    }
}

impl BitRandomMutator {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            bits: None,
        }
    }
}

impl GeneticAlgorithmOperator for BitRandomMutator {
    fn name(&self) -> &'static str {
        "bit_random"
    }

    fn description(&self) -> &'static str {
        "Flips randomly chosen bits of randomly chosen designs."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Mutator
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.rate = poll_rate(db, tags::MUTATION_RATE, self.rate)?;
        log::debug!("{}: rate = {}", self.name(), self.rate);
        Ok(())
    }
}

impl Mutator for BitRandomMutator {
    fn mutate(&mut self, ctx: &mut OperatorContext<'_>, pop: &DesignGroup, children: &mut DesignGroup) {
        if pop.is_empty() {
            return;
        }
        let bits = self.bits.get_or_insert_with(|| BitManipulator::new(ctx.target));
        bits.refresh();
        let total = bits.total_bits();
        if total == 0 {
            return;
        }
        let count = probabilistic_round(self.rate * (pop.len() as u64 * total) as f64, ctx.rng);
        for _ in 0..count {
            let Some(parent) = pop.get(ctx.rng.random_range(0..pop.len())) else {
                continue;
            };
            let mut words = bits.encode(parent);
            bits.flip_bit(&mut words, ctx.rng.random_range(0..total));
            let mut mutant = parent.clone();
            bits.decode_into(&words, &mut mutant);
            children.insert(mutant);
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Mutator> {
        Box::new(Self::new(self.rate))
    }
}

// ============================================================================
// Replace uniform
// ============================================================================

/// Replaces a random variable with a fresh uniformly random value.
#[derive(Debug, Clone)]
pub struct ReplaceUniformMutator {
    rate: f64,
}

impl Default for ReplaceUniformMutator {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl ReplaceUniformMutator {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }
}

impl GeneticAlgorithmOperator for ReplaceUniformMutator {
    fn name(&self) -> &'static str {
        "replace_uniform"
    }

    fn description(&self) -> &'static str {
        "Replaces a random variable with a uniformly random legal value."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Mutator
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.rate = poll_rate(db, tags::MUTATION_RATE, self.rate)?;
        log::debug!("{}: rate = {}", self.name(), self.rate);
        Ok(())
    }
}

impl Mutator for ReplaceUniformMutator {
    fn mutate(&mut self, ctx: &mut OperatorContext<'_>, pop: &DesignGroup, children: &mut DesignGroup) {
        if pop.is_empty() {
            return;
        }
        let ndv = ctx.target.ndv();
        let count = probabilistic_round(self.rate * (pop.len() * ndv) as f64, ctx.rng);
        for _ in 0..count {
            let Some(parent) = pop.get(ctx.rng.random_range(0..pop.len())) else {
                continue;
            };
            let var = ctx.rng.random_range(0..ndv);
            let rep = ctx.target.variables()[var].random_rep(ctx.rng);
            let mut mutant = parent.clone();
            mutant.set_variable_rep(var, rep);
            children.insert(mutant);
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Mutator> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Offset
// ============================================================================

/// Shape of the random offset added by an [`OffsetMutator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetDistribution {
    /// Gaussian with standard deviation `scale * range`.
    Normal,
    /// Cauchy with scale `scale * range`; heavier tails than Normal.
    Cauchy,
    /// Uniform in `[-scale * range, scale * range]`.
    Uniform,
}

/// Adds a random offset, proportional to the variable range, to a random
/// variable. The result may leave the domain.
#[derive(Debug, Clone)]
pub struct OffsetMutator {
    distribution: OffsetDistribution,
    rate: f64,
    scale: f64,
}

impl OffsetMutator {
    pub fn new(distribution: OffsetDistribution, rate: f64, scale: f64) -> Self {
        Self {
            distribution,
            rate: rate.clamp(0.0, 1.0),
            scale: scale.max(0.0),
        }
    }

    pub fn normal() -> Self {
        Self::new(OffsetDistribution::Normal, 0.1, 0.1)
    }

    pub fn cauchy() -> Self {
        Self::new(OffsetDistribution::Cauchy, 0.1, 0.1)
    }

    pub fn uniform() -> Self {
        Self::new(OffsetDistribution::Uniform, 0.1, 0.1)
    }

    pub fn distribution(&self) -> OffsetDistribution {
        self.distribution
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn offset<R: Rng>(&self, spread: f64, rng: &mut R) -> f64 {
        if spread.is_nan() || spread <= 0.0 {
            return 0.0;
        }
        match self.distribution {
            OffsetDistribution::Normal => Normal::new(0.0, spread).map_or(0.0, |d| rng.sample(d)),
            OffsetDistribution::Cauchy => Cauchy::new(0.0, spread).map_or(0.0, |d| rng.sample(d)),
            OffsetDistribution::Uniform => rng.random_range(-spread..=spread),
        }
    }
}

impl GeneticAlgorithmOperator for OffsetMutator {
    fn name(&self) -> &'static str {
        match self.distribution {
            OffsetDistribution::Normal => "offset_normal",
            OffsetDistribution::Cauchy => "offset_cauchy",
            OffsetDistribution::Uniform => "offset_uniform",
        }
    }

    fn description(&self) -> &'static str {
        match self.distribution {
            OffsetDistribution::Normal => "Adds a Gaussian offset scaled by the variable range.",
            OffsetDistribution::Cauchy => "Adds a Cauchy offset scaled by the variable range.",
            OffsetDistribution::Uniform => "Adds a uniform offset scaled by the variable range.",
        }
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Mutator
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.rate = poll_rate(db, tags::MUTATION_RATE, self.rate)?;
        if let Some(scale) = db.get_double(tags::MUTATION_SCALE)? {
            if !scale.is_finite() || scale < 0.0 {
                log::error!("{}: `{}` = {scale} must be non-negative", self.name(), tags::MUTATION_SCALE);
                return Err(ConfigError::out_of_range(tags::MUTATION_SCALE, "must be non-negative"));
            }
            self.scale = scale;
        }
        log::debug!("{}: rate = {}, scale = {}", self.name(), self.rate, self.scale);
        Ok(())
    }
}

impl Mutator for OffsetMutator {
    fn mutate(&mut self, ctx: &mut OperatorContext<'_>, pop: &DesignGroup, children: &mut DesignGroup) {
        if pop.is_empty() {
            return;
        }
        let ndv = ctx.target.ndv();
        let count = probabilistic_round(self.rate * (pop.len() * ndv) as f64, ctx.rng);
        for _ in 0..count {
            let Some(parent) = pop.get(ctx.rng.random_range(0..pop.len())) else {
                continue;
            };
            let var = ctx.rng.random_range(0..ndv);
            let spread = self.scale * ctx.target.variables()[var].rep_range();
            let delta = self.offset(spread, ctx.rng);
            let mut mutant = parent.clone();
            mutant.set_variable_rep(var, parent.variable_rep(var) + delta);
            children.insert(mutant);
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn can_produce_invalid_variable_values(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Mutator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{rng, two_var_target};
    use super::*;
    use crate::random::create_rng;
    use std::sync::Arc;

    fn population(t: &Arc<crate::space::DesignTarget>, n: usize) -> DesignGroup {
        let mut r = create_rng(3);
        (0..n).map(|_| t.random_design(&mut r)).collect()
    }

    #[test]
    fn test_null_mutator() {
        let t = two_var_target();
        let pop = population(&t, 5);
        let mut kids = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        NullMutator.mutate(&mut ctx, &pop, &mut kids);
        assert!(kids.is_empty());
    }

    #[test]
    fn test_bit_random_changes_exactly_one_variable() {
        let t = two_var_target();
        let pop = population(&t, 10);
        let mut kids = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        // 10 designs * 28 bits * 0.05 = 14 flips.
        BitRandomMutator::new(0.05).mutate(&mut ctx, &pop, &mut kids);
        assert_eq!(kids.len(), 14);
        for kid in kids.iter() {
            let changed = pop
                .iter()
                .map(|p| {
                    p.variables()
                        .iter()
                        .zip(kid.variables())
                        .filter(|(a, b)| (*a - *b).abs() > 1e-9)
                        .count()
                })
                .min()
                .unwrap();
            assert_eq!(changed, 1);
        }
    }

    #[test]
    fn test_replace_uniform_stays_valid() {
        let t = two_var_target();
        let pop = population(&t, 10);
        let mut kids = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        ReplaceUniformMutator::new(0.5).mutate(&mut ctx, &pop, &mut kids);
        assert_eq!(kids.len(), 10);
        assert!(kids.iter().all(|k| t.variables_in_bounds(k)));
        assert!(kids.iter().all(|k| !k.is_evaluated()));
    }

    #[test]
    fn test_offset_mutators_perturb() {
        let t = two_var_target();
        let pop = population(&t, 10);
        for mut m in [OffsetMutator::normal(), OffsetMutator::cauchy(), OffsetMutator::uniform()] {
            let mut kids = DesignGroup::new();
            let mut r = rng();
            let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
            m.mutate(&mut ctx, &pop, &mut kids);
            // 10 designs * 2 variables * 0.1 = 2 mutants.
            assert_eq!(kids.len(), 2, "{}", m.name());
            assert!(m.can_produce_invalid_variable_values());
        }
    }

    #[test]
    fn test_offset_poll_scale() {
        let mut m = OffsetMutator::normal();
        let db = ParameterDatabase::new()
            .with(tags::MUTATION_SCALE, 0.25)
            .with(tags::MUTATION_RATE, 0.3);
        m.poll_for_parameters(&db).unwrap();
        assert_eq!(m.scale(), 0.25);
        assert_eq!(m.rate(), 0.3);

        let db = ParameterDatabase::new().with(tags::MUTATION_SCALE, -1.0);
        assert!(m.poll_for_parameters(&db).is_err());
    }

    #[test]
    fn test_names_by_distribution() {
        assert_eq!(OffsetMutator::normal().name(), "offset_normal");
        assert_eq!(OffsetMutator::cauchy().name(), "offset_cauchy");
        assert_eq!(OffsetMutator::uniform().name(), "offset_uniform");
    }
}
