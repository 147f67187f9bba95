//! Multi-objective GA.
//!
//! [`Moga`] wraps a [`GeneticAlgorithm`] whose answer is a Pareto set rather
//! than a single optimum. Discarded designs stay candidates: a design
//! dropped early may turn out to be non-dominated by the final population,
//! so the discard pool is scanned when the solution is extracted.
//!
//! # Usage
//!
//! ```
//! use u_evolve::ga::operators::Evaluation;
//! use u_evolve::ga::{GaConfig, GeneticAlgorithm, Moga};
//! use u_evolve::params::{tags, ParameterDatabase};
//! use u_evolve::space::{DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};
//!
//! let target = DesignTarget::builder()
//!     .variable(DesignVariableInfo::continuous("x", 0.0, 2.0))
//!     .objective(ObjectiveFunctionInfo::minimize("f1"))
//!     .objective(ObjectiveFunctionInfo::minimize("f2"))
//!     .build()
//!     .unwrap();
//!
//! let ga = GeneticAlgorithm::builder(target)
//!     .config(GaConfig::moga().with_seed(42))
//!     .params(
//!         ParameterDatabase::new()
//!             .with(tags::POPULATION_SIZE, 30_i64)
//!             .with(tags::MAX_GENERATIONS, 20_i64),
//!     )
//!     .evaluate_with(|x: &[f64]| Some(Evaluation::new(vec![x[0] * x[0], (x[0] - 2.0).powi(2)])))
//!     .build()
//!     .unwrap();
//!
//! let mut moga = Moga::new(ga);
//! let result = moga.run().unwrap();
//! assert!(!result.pareto_set.is_empty());
//! ```
//!
//! # References
//!
//! - Fonseca & Fleming (1993), "Genetic Algorithms for Multiobjective
//!   Optimization: Formulation, Discussion and Generalization"
//! - Eddy & Lewis (2001), "Effective generation of Pareto sets using genetic
//!   programming"

use super::algorithm::{GaResult, GeneticAlgorithm};
use super::multi_objective::{pareto_front, DominanceKey};
use crate::design::{lexical_cmp, Design, DesignId};
use crate::error::EvolveError;
use std::collections::HashSet;
use std::sync::Arc;

/// How [`Moga::best_design`] picks one design out of the Pareto set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BestDesignStrategy {
    /// Euclidean distance to the utopia point in minimization-adjusted
    /// objective space.
    UtopiaDistance,
    /// The same with every objective scaled by its utopia-nadir range.
    #[default]
    NormalizedUtopiaDistance,
}

/// Result of a MOGA run.
#[derive(Debug, Clone)]
pub struct MogaResult {
    /// Outcome of the underlying GA run.
    pub ga: GaResult,

    /// The design closest to the utopia point, per the configured strategy.
    pub best: Option<Design>,

    /// Non-dominated designs of population and discards, without value
    /// duplicates. Owned copies.
    pub pareto_set: Vec<Design>,

    /// Designs moved back from the discard pool after the run.
    pub reclaimed: usize,
}

/// Pareto-based genetic algorithm.
#[derive(Debug)]
pub struct Moga {
    ga: GeneticAlgorithm,
    strategy: BestDesignStrategy,
}

impl Moga {
    pub fn new(ga: GeneticAlgorithm) -> Self {
        Self {
            ga,
            strategy: BestDesignStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: BestDesignStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> BestDesignStrategy {
        self.strategy
    }

    pub fn ga(&self) -> &GeneticAlgorithm {
        &self.ga
    }

    pub fn ga_mut(&mut self) -> &mut GeneticAlgorithm {
        &mut self.ga
    }

    pub fn into_inner(self) -> GeneticAlgorithm {
        self.ga
    }

    /// Runs the GA, reclaims non-dominated discards and extracts the Pareto
    /// set.
    pub fn run(&mut self) -> Result<MogaResult, EvolveError> {
        let ga = self.ga.run()?;
        let reclaimed = self.reclaim_optimal();
        let pareto_set = self.current_solution();
        let best = self.best_design().cloned();
        log::info!(
            "MOGA finished after {} generations: {} Pareto designs, {reclaimed} reclaimed",
            ga.generations,
            pareto_set.len()
        );
        Ok(MogaResult {
            ga,
            best,
            pareto_set,
            reclaimed,
        })
    }

    // ------------------------------------------------------------------
    // Reference points
    // ------------------------------------------------------------------

    fn evaluated_keys(&self) -> Vec<(&Design, DominanceKey)> {
        let target = self.ga.target();
        self.ga
            .population()
            .iter()
            .filter(|d| d.is_evaluated() && !d.is_illconditioned())
            .map(|d| (d, DominanceKey::of(target, d)))
            .collect()
    }

    fn bound_point(&self, pick: fn(f64, f64) -> f64, start: f64) -> Option<Vec<f64>> {
        let keys = self.evaluated_keys();
        if keys.is_empty() {
            return None;
        }
        let mut point = vec![start; self.ga.target().nof()];
        for (_, key) in &keys {
            for (p, &f) in point.iter_mut().zip(&key.objectives) {
                *p = pick(*p, f);
            }
        }
        Some(point)
    }

    /// Best value of every objective over the population, in
    /// minimization-adjusted space.
    pub fn utopia_point(&self) -> Option<Vec<f64>> {
        self.bound_point(f64::min, f64::INFINITY)
    }

    /// Worst value of every objective over the population, in
    /// minimization-adjusted space.
    pub fn nadir_point(&self) -> Option<Vec<f64>> {
        self.bound_point(f64::max, f64::NEG_INFINITY)
    }

    /// The population member closest to the utopia point.
    ///
    /// Feasible designs are preferred; without any, only the least violating
    /// designs are considered.
    pub fn best_design(&self) -> Option<&Design> {
        let keys = self.evaluated_keys();
        let least_violation = keys.iter().map(|(_, k)| k.violation).fold(f64::INFINITY, f64::min);
        let utopia = self.utopia_point()?;
        let nadir = self.nadir_point()?;
        let scale: Vec<f64> = match self.strategy {
            BestDesignStrategy::UtopiaDistance => vec![1.0; utopia.len()],
            BestDesignStrategy::NormalizedUtopiaDistance => utopia
                .iter()
                .zip(&nadir)
                .map(|(u, n)| if n - u > 0.0 { n - u } else { 1.0 })
                .collect(),
        };
        let distance = |key: &DominanceKey| -> f64 {
            key.objectives
                .iter()
                .zip(&utopia)
                .zip(&scale)
                .map(|((f, u), s)| ((f - u) / s).powi(2))
                .sum::<f64>()
                .sqrt()
        };
        keys.iter()
            .filter(|(_, k)| k.violation == least_violation)
            .min_by(|a, b| distance(&a.1).total_cmp(&distance(&b.1)))
            .map(|(d, _)| *d)
    }

    // ------------------------------------------------------------------
    // Pareto set maintenance
    // ------------------------------------------------------------------

    /// Non-dominated designs of the population and the discard pool, as
    /// owned copies without value duplicates, sorted by variables.
    pub fn current_solution(&self) -> Vec<Design> {
        let target = self.ga.target();
        let pool = self.ga.discards().checkout();
        let candidates: Vec<&Design> = self
            .ga
            .population()
            .iter()
            .chain(pool.iter())
            .filter(|d| d.is_evaluated() && !d.is_illconditioned())
            .collect();
        let keys: Vec<DominanceKey> = candidates.iter().map(|d| DominanceKey::of(target, d)).collect();
        let mut front: Vec<&Design> = pareto_front(&keys).into_iter().map(|i| candidates[i]).collect();
        front.sort_by(|a, b| lexical_cmp(a.variables(), b.variables()));
        front.dedup_by(|a, b| lexical_cmp(a.variables(), b.variables()).is_eq());
        front.into_iter().cloned().collect()
    }

    /// Moves every discarded design that no population member dominates
    /// back into the population. Designs whose variables already occur in
    /// the population stay discarded, so repeated calls reclaim nothing
    /// new. Returns the number of designs moved.
    pub fn reclaim_optimal(&mut self) -> usize {
        let keys: Vec<DominanceKey> = self.evaluated_keys().into_iter().map(|(_, k)| k).collect();
        let target = Arc::clone(self.ga.target());
        let discards = Arc::clone(self.ga.discards());
        let mut pool = discards.checkout();

        let candidates: Vec<DesignId> = pool
            .iter()
            .filter(|d| d.is_evaluated() && !d.is_illconditioned())
            .filter(|d| {
                let key = DominanceKey::of(&target, d);
                !keys.iter().any(|k| k.dominates(&key))
            })
            .map(Design::id)
            .collect();

        let population = self.ga.population_mut();
        let mut reclaimed = 0;
        for id in candidates {
            let duplicate = pool
                .find(id)
                .is_some_and(|d| population.contains_variables(d.variables()));
            if !duplicate && pool.move_to(id, population) {
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            log::debug!("reclaimed {reclaimed} non-dominated designs from the discard pool");
        }
        reclaimed
    }

    /// Moves every population member dominated by another member to the
    /// discard pool. Returns the number moved.
    pub fn flush_non_optimal(&mut self) -> usize {
        let (front_ids, all): (HashSet<DesignId>, usize) = {
            let keyed = self.evaluated_keys();
            let keys: Vec<DominanceKey> = keyed.iter().map(|(_, k)| k.clone()).collect();
            let front = pareto_front(&keys).into_iter().map(|i| keyed[i].0.id()).collect();
            (front, keyed.len())
        };
        if front_ids.len() == all {
            return 0;
        }
        let dominated = self
            .ga
            .population_mut()
            .take_where(|d| d.is_evaluated() && !front_ids.contains(&d.id()));
        let n = dominated.len();
        self.ga.discards().checkout().extend(dominated);
        log::debug!("flushed {n} dominated designs from the population");
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::multi_objective::Dominance;
    use crate::ga::operators::Evaluation;
    use crate::ga::GaConfig;
    use crate::params::{tags, ParameterDatabase};
    use crate::space::{ConstraintInfo, DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};

    fn target(with_constraint: bool) -> Arc<DesignTarget> {
        let mut b = DesignTarget::builder()
            .variable(DesignVariableInfo::continuous("x", 0.0, 1.0))
            .objective(ObjectiveFunctionInfo::minimize("f1"))
            .objective(ObjectiveFunctionInfo::minimize("f2"));
        if with_constraint {
            b = b.constraint(ConstraintInfo::at_most("g", 0.0));
        }
        b.build().unwrap()
    }

    fn moga(t: &Arc<DesignTarget>) -> Moga {
        let ga = GeneticAlgorithm::builder(Arc::clone(t))
            .config(GaConfig::moga().with_seed(1))
            .evaluate_with(|x: &[f64]| Some(Evaluation::new(vec![x[0], 1.0 - x[0]])))
            .build()
            .unwrap();
        Moga::new(ga)
    }

    fn design(t: &Arc<DesignTarget>, x: f64, f: [f64; 2]) -> Design {
        let mut d = t.new_design();
        d.set_variables(&[x]);
        d.set_objective(0, f[0]);
        d.set_objective(1, f[1]);
        d.set_evaluated(true);
        t.update_feasibility(&mut d);
        d
    }

    // ---- reference points ----

    #[test]
    fn test_utopia_and_nadir() {
        let t = target(false);
        let mut m = moga(&t);
        assert!(m.utopia_point().is_none());
        let pop = m.ga_mut().population_mut();
        pop.insert(design(&t, 0.1, [1.0, 5.0]));
        pop.insert(design(&t, 0.2, [3.0, 2.0]));
        pop.insert(design(&t, 0.3, [2.0, 9.0]));
        assert_eq!(m.utopia_point().unwrap(), vec![1.0, 2.0]);
        assert_eq!(m.nadir_point().unwrap(), vec![3.0, 9.0]);
    }

    #[test]
    fn test_best_design_strategies_differ() {
        let t = target(false);
        let mut m = moga(&t);
        let pop = m.ga_mut().population_mut();
        pop.insert(design(&t, 0.1, [0.0, 10.0]));
        pop.insert(design(&t, 0.2, [1.0, 0.0]));
        pop.insert(design(&t, 0.3, [0.4, 4.0]));

        let normalized = m.best_design().unwrap().variables()[0];
        assert_eq!(normalized, 0.3);

        let m = m.with_strategy(BestDesignStrategy::UtopiaDistance);
        assert_eq!(m.best_design().unwrap().variables()[0], 0.2);
    }

    #[test]
    fn test_best_design_prefers_feasible() {
        let t = target(true);
        let mut m = moga(&t);
        let mut near = design(&t, 0.1, [0.0, 0.0]);
        near.set_constraint(0, 1.0);
        t.update_feasibility(&mut near);
        let far = design(&t, 0.2, [5.0, 5.0]);
        let pop = m.ga_mut().population_mut();
        pop.insert(near);
        pop.insert(far);
        assert_eq!(m.best_design().unwrap().variables()[0], 0.2);
    }

    // ---- Pareto maintenance ----

    #[test]
    fn test_reclaim_optimal_is_idempotent() {
        let t = target(false);
        let mut m = moga(&t);
        {
            let pop = m.ga_mut().population_mut();
            pop.insert(design(&t, 0.1, [1.0, 4.0]));
            pop.insert(design(&t, 0.2, [4.0, 1.0]));
        }
        {
            let mut pool = m.ga().discards().checkout();
            pool.insert(design(&t, 0.3, [2.0, 2.0])); // non-dominated
            pool.insert(design(&t, 0.4, [5.0, 5.0])); // dominated
            pool.insert(design(&t, 0.1, [1.0, 4.0])); // duplicate of a member
        }
        assert_eq!(m.reclaim_optimal(), 1);
        let after_first: Vec<DesignId> = m.ga().population().iter().map(Design::id).collect();
        assert_eq!(after_first.len(), 3);

        assert_eq!(m.reclaim_optimal(), 0);
        let after_second: Vec<DesignId> = m.ga().population().iter().map(Design::id).collect();
        assert_eq!(after_first, after_second);
        assert_eq!(m.ga().discards().len(), 2);
    }

    #[test]
    fn test_flush_non_optimal() {
        let t = target(false);
        let mut m = moga(&t);
        let pop = m.ga_mut().population_mut();
        pop.insert(design(&t, 0.1, [1.0, 4.0]));
        pop.insert(design(&t, 0.2, [4.0, 1.0]));
        pop.insert(design(&t, 0.3, [4.0, 4.0]));
        pop.insert(design(&t, 0.4, [4.0, 4.0]));
        assert_eq!(m.flush_non_optimal(), 2);
        assert_eq!(m.ga().population().len(), 2);
        assert_eq!(m.ga().discards().len(), 2);
        assert_eq!(m.flush_non_optimal(), 0);
    }

    #[test]
    fn test_current_solution_spans_discards_and_dedups() {
        let t = target(false);
        let mut m = moga(&t);
        m.ga_mut().population_mut().insert(design(&t, 0.1, [1.0, 4.0]));
        m.ga_mut().population_mut().insert(design(&t, 0.5, [3.0, 3.0]));
        {
            let mut pool = m.ga().discards().checkout();
            pool.insert(design(&t, 0.2, [4.0, 1.0]));
            pool.insert(design(&t, 0.1, [1.0, 4.0]));
        }
        let front = m.current_solution();
        let xs: Vec<f64> = front.iter().map(|d| d.variables()[0]).collect();
        assert_eq!(xs, vec![0.1, 0.2, 0.5]);
        // Copies are independent of the originals.
        assert!(front.iter().all(|d| !m.ga().population().contains(d.id())));
    }

    fn cached_niching_moga(t: &Arc<DesignTarget>) -> Moga {
        let ga = GeneticAlgorithm::builder(Arc::clone(t))
            .config(GaConfig::moga().with_niche_pressure_applicator("radial").with_seed(21))
            .params(
                ParameterDatabase::new()
                    .with(tags::POPULATION_SIZE, 40_i64)
                    .with(tags::MAX_GENERATIONS, 6_i64)
                    .with(tags::NICHE_VECTOR, vec![0.2, 0.2])
                    .with(tags::CACHE_NICHED_DESIGNS, true),
            )
            .evaluate_with(|x: &[f64]| Some(Evaluation::new(vec![x[0], 1.0 - x[0].sqrt()])))
            .build()
            .unwrap();
        Moga::new(ga)
    }

    #[test]
    fn test_run_hands_niche_cache_to_discards() {
        // Same seed, driven by hand: the cache is still held at the end.
        let t = target(false);
        let mut stepped = cached_niching_moga(&t);
        stepped.ga_mut().initialize().unwrap();
        while stepped.ga_mut().run_generation().unwrap() {}
        let held = stepped.ga_mut().release_niche_cache();
        assert!(held > 0, "radial niching cached nothing");
        stepped.reclaim_optimal();
        let expected: Vec<Vec<f64>> = stepped
            .current_solution()
            .iter()
            .map(|d| d.variables().to_vec())
            .collect();

        let t = target(false);
        let mut m = cached_niching_moga(&t);
        let result = m.run().unwrap();
        assert_eq!(m.ga_mut().release_niche_cache(), 0);
        assert_eq!(m.ga().discards().len(), stepped.ga().discards().len());
        let got: Vec<Vec<f64>> = result.pareto_set.iter().map(|d| d.variables().to_vec()).collect();
        assert_eq!(got, expected);

        // Nothing left in the pool is non-dominated and missing from the set.
        let pool = m.ga().discards().checkout();
        for d in pool.iter().filter(|d| d.is_evaluated()) {
            let key = DominanceKey::of(&t, d);
            let covered = result.pareto_set.iter().any(|p| {
                DominanceKey::of(&t, p).dominates(&key) || p.variables() == d.variables()
            });
            assert!(covered, "non-dominated design {:?} missing from the Pareto set", d.variables());
        }
    }

    #[test]
    fn test_run_yields_mutually_non_dominated_set() {
        let t = target(false);
        let ga = GeneticAlgorithm::builder(Arc::clone(&t))
            .config(GaConfig::moga().with_niche_pressure_applicator("radial").with_seed(8))
            .params(
                ParameterDatabase::new()
                    .with(tags::POPULATION_SIZE, 24_i64)
                    .with(tags::MAX_GENERATIONS, 8_i64),
            )
            .evaluate_with(|x: &[f64]| Some(Evaluation::new(vec![x[0] * x[0], (x[0] - 1.0).powi(2)])))
            .build()
            .unwrap();
        let mut m = Moga::new(ga);
        let result = m.run().unwrap();
        assert_eq!(result.ga.generations, 8);
        assert!(!result.pareto_set.is_empty());
        assert!(result.best.is_some());
        for a in &result.pareto_set {
            for b in &result.pareto_set {
                let cmp = crate::ga::multi_objective::design_dominance(&t, a, b);
                assert_eq!(cmp, Dominance::Neither);
            }
        }
    }
}
