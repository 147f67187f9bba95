//! Fitness assessors.
//!
//! Every assessor returns a [`FitnessRecord`] covering every design of every
//! supplied group, with larger values better:
//!
//! - [`LayerRankAssessor`]: `-layer`, where layer 0 is the Pareto front
//! - [`DominationCountAssessor`]: `-(number of dominating designs)`
//! - [`MeritFunctionAssessor`]: `-(weighted objective sum + penalty * violation)`
//!
//! The Pareto-based assessors use constraint-aware dominance (see
//! [`DominanceKey`]).
//!
//! # References
//!
//! - Goldberg (1989), non-dominated layering
//! - Fonseca & Fleming (1993), dominance-count ranking

use super::{FitnessAssessor, GeneticAlgorithmOperator, OperatorContext, OperatorKind};
use crate::design::{Design, DesignGroupVector, FitnessRecord};
use crate::error::ConfigError;
use crate::ga::multi_objective::{domination_counts, layered_sort, DominanceKey};
use crate::params::{tags, ParameterDatabase};

fn collect<'a>(ctx: &OperatorContext<'_>, groups: &DesignGroupVector<'a>) -> (Vec<&'a Design>, Vec<DominanceKey>) {
    let designs: Vec<&Design> = groups.designs().collect();
    let keys = designs.iter().map(|d| DominanceKey::of(ctx.target, d)).collect();
    (designs, keys)
}

fn record_from(designs: &[&Design], values: impl Iterator<Item = f64>) -> FitnessRecord {
    let mut record = FitnessRecord::with_capacity(designs.len());
    record.suspend_statistics();
    for (d, f) in designs.iter().zip(values) {
        record.add_fitness(d, f);
    }
    record.resume_statistics();
    record
}

// ============================================================================
// Layer rank
// ============================================================================

/// Fitness is the negated Pareto layer.
#[derive(Debug, Clone, Default)]
pub struct LayerRankAssessor;

impl GeneticAlgorithmOperator for LayerRankAssessor {
    fn name(&self) -> &'static str {
        "layer_rank"
    }

    fn description(&self) -> &'static str {
        "Assigns the negative Pareto layer number as fitness."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::FitnessAssessor
    }
}

impl FitnessAssessor for LayerRankAssessor {
    fn assess_fitness(&mut self, ctx: &mut OperatorContext<'_>, groups: &DesignGroupVector<'_>) -> FitnessRecord {
        let (designs, keys) = collect(ctx, groups);
        let sorted = layered_sort(keys.len(), |i, j| keys[i].compare(&keys[j]));
        log::debug!("{}: {} designs in {} layers", self.name(), designs.len(), sorted.fronts.len());
        record_from(&designs, sorted.ranks.iter().map(|&r| -(r as f64)))
    }

    fn clone_box(&self) -> Box<dyn FitnessAssessor> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Domination count
// ============================================================================

/// Fitness is the negated number of designs that dominate a design.
#[derive(Debug, Clone, Default)]
pub struct DominationCountAssessor;

impl GeneticAlgorithmOperator for DominationCountAssessor {
    fn name(&self) -> &'static str {
        "domination_count"
    }

    fn description(&self) -> &'static str {
        "Assigns the negative count of dominating designs as fitness."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::FitnessAssessor
    }
}

impl FitnessAssessor for DominationCountAssessor {
    fn assess_fitness(&mut self, ctx: &mut OperatorContext<'_>, groups: &DesignGroupVector<'_>) -> FitnessRecord {
        let (designs, keys) = collect(ctx, groups);
        let counts = domination_counts(keys.len(), |i, j| keys[i].compare(&keys[j]));
        record_from(&designs, counts.iter().map(|&c| -(c as f64)))
    }

    fn clone_box(&self) -> Box<dyn FitnessAssessor> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Merit function
// ============================================================================

/// Single-objective fitness: negated weighted sum of the
/// minimization-adjusted objectives plus a penalty on the total
/// constraint violation.
///
/// Without configured weights every objective weighs 1.
#[derive(Debug, Clone)]
pub struct MeritFunctionAssessor {
    weights: Vec<f64>,
    constraint_penalty: f64,
}

impl Default for MeritFunctionAssessor {
    fn default() -> Self {
        Self {
            weights: Vec::new(),
            constraint_penalty: 1.0,
        }
    }
}

impl MeritFunctionAssessor {
    pub fn new(weights: Vec<f64>, constraint_penalty: f64) -> Self {
        Self {
            weights,
            constraint_penalty,
        }
    }

    /// Merit (smaller is better) of one design.
    pub fn merit(&self, ctx: &OperatorContext<'_>, design: &Design) -> f64 {
        let weighted: f64 = ctx
            .target
            .adjusted_objectives(design)
            .iter()
            .enumerate()
            .map(|(i, f)| self.weights.get(i).copied().unwrap_or(1.0) * f)
            .sum();
        let violation = ctx.target.total_violation(design);
        if violation > 0.0 {
            weighted + self.constraint_penalty * violation
        } else {
            weighted
        }
    }
}

impl GeneticAlgorithmOperator for MeritFunctionAssessor {
    fn name(&self) -> &'static str {
        "merit_function"
    }

    fn description(&self) -> &'static str {
        "Weighted-sum objective with an exterior constraint penalty."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::FitnessAssessor
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        if let Some(weights) = db.get_vector(tags::WEIGHTS)? {
            if weights.is_empty() {
                log::error!("{}: `{}` must not be empty", self.name(), tags::WEIGHTS);
                return Err(ConfigError::EmptyVector {
                    tag: tags::WEIGHTS.to_string(),
                });
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                log::error!("{}: `{}` must hold non-negative weights", self.name(), tags::WEIGHTS);
                return Err(ConfigError::out_of_range(tags::WEIGHTS, "weights must be non-negative"));
            }
            self.weights = weights.to_vec();
        }
        if let Some(penalty) = db.get_double(tags::CONSTRAINT_PENALTY)? {
            if !penalty.is_finite() || penalty < 0.0 {
                log::error!("{}: `{}` = {penalty} must be non-negative", self.name(), tags::CONSTRAINT_PENALTY);
                return Err(ConfigError::out_of_range(tags::CONSTRAINT_PENALTY, "must be non-negative"));
            }
            self.constraint_penalty = penalty;
        }
        log::debug!(
            "{}: weights = {:?}, constraint_penalty = {}",
            self.name(),
            self.weights,
            self.constraint_penalty
        );
        Ok(())
    }
}

impl FitnessAssessor for MeritFunctionAssessor {
    fn assess_fitness(&mut self, ctx: &mut OperatorContext<'_>, groups: &DesignGroupVector<'_>) -> FitnessRecord {
        if !self.weights.is_empty() && self.weights.len() != ctx.target.nof() {
            log::warn!(
                "{}: {} weights for {} objectives; missing weights default to 1",
                self.name(),
                self.weights.len(),
                ctx.target.nof()
            );
        }
        let designs: Vec<&Design> = groups.designs().collect();
        let values: Vec<f64> = designs.iter().map(|d| -self.merit(ctx, d)).collect();
        record_from(&designs, values.into_iter())
    }

    fn clone_box(&self) -> Box<dyn FitnessAssessor> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{constrained_target, rng, two_var_target};
    use super::*;
    use crate::design::DesignGroup;
    use std::sync::Arc;

    fn with_objectives(t: &Arc<crate::space::DesignTarget>, objs: &[[f64; 2]]) -> DesignGroup {
        objs.iter()
            .enumerate()
            .map(|(i, o)| {
                let mut d = t.new_design();
                d.set_variables(&[i as f64 / 10.0, 0.0]);
                d.set_objective(0, o[0]);
                d.set_objective(1, o[1]);
                d.set_evaluated(true);
                d
            })
            .collect()
    }

    #[test]
    fn test_layer_rank_across_groups() {
        let t = two_var_target();
        let pop = with_objectives(&t, &[[1.0, 5.0], [3.0, 3.0]]);
        let kids = with_objectives(&t, &[[4.0, 4.0], [6.0, 6.0]]);
        let groups: DesignGroupVector = [&pop, &kids].into_iter().collect();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        let rec = LayerRankAssessor.assess_fitness(&mut ctx, &groups);
        assert_eq!(rec.len(), 4);
        assert_eq!(rec.fitness(pop.get(0).unwrap()), Some(0.0));
        assert_eq!(rec.fitness(pop.get(1).unwrap()), Some(0.0));
        assert_eq!(rec.fitness(kids.get(0).unwrap()), Some(-1.0));
        assert_eq!(rec.fitness(kids.get(1).unwrap()), Some(-2.0));
        assert_eq!(rec.max_fitness(), 0.0);
        assert_eq!(rec.min_fitness(), -2.0);
    }

    #[test]
    fn test_domination_count() {
        let t = two_var_target();
        let pop = with_objectives(&t, &[[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [0.5, 9.0]]);
        let groups: DesignGroupVector = [&pop].into_iter().collect();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        let rec = DominationCountAssessor.assess_fitness(&mut ctx, &groups);
        let f: Vec<f64> = pop.iter().map(|d| rec.fitness(d).unwrap()).collect();
        assert_eq!(f, vec![0.0, -1.0, -2.0, 0.0]);
    }

    #[test]
    fn test_merit_function_weights_and_penalty() {
        let t = constrained_target();
        let mut feasible = t.new_design();
        feasible.set_objective(0, 2.0);
        feasible.set_constraint(0, -1.0);
        let mut infeasible = t.new_design();
        infeasible.set_variables(&[0.5]);
        infeasible.set_objective(0, 1.0);
        infeasible.set_constraint(0, 3.0);
        let g: DesignGroup = [feasible, infeasible].into_iter().collect();
        let groups: DesignGroupVector = [&g].into_iter().collect();

        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        let mut m = MeritFunctionAssessor::new(vec![2.0], 10.0);
        let rec = m.assess_fitness(&mut ctx, &groups);
        assert_eq!(rec.fitness(g.get(0).unwrap()), Some(-4.0));
        assert_eq!(rec.fitness(g.get(1).unwrap()), Some(-32.0));
    }

    #[test]
    fn test_merit_poll_validation() {
        let mut m = MeritFunctionAssessor::default();
        let db = ParameterDatabase::new().with(tags::WEIGHTS, Vec::<f64>::new());
        assert!(matches!(m.poll_for_parameters(&db), Err(ConfigError::EmptyVector { .. })));

        let db = ParameterDatabase::new().with(tags::WEIGHTS, vec![1.0, -1.0]);
        assert!(m.poll_for_parameters(&db).is_err());

        let db = ParameterDatabase::new()
            .with(tags::WEIGHTS, vec![0.5, 0.5])
            .with(tags::CONSTRAINT_PENALTY, 100.0);
        m.poll_for_parameters(&db).unwrap();
        assert_eq!(m.constraint_penalty, 100.0);
    }
}
