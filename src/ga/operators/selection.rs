//! Selectors.
//!
//! Selection moves designs out of the candidate groups (population plus
//! offspring) into the next population. Whatever is left behind belongs to
//! the caller, which parks it in the discard pool.
//!
//! Larger fitness is better. Designs without a recorded fitness are never
//! selected.
//!
//! # References
//!
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"

use super::{GeneticAlgorithmOperator, OperatorContext, OperatorKind, Selector};
use crate::design::{Design, DesignGroup, DesignId, FitnessRecord};
use crate::error::ConfigError;
use crate::params::{poll_rate, tags, ParameterDatabase};
use rand::Rng;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
struct Candidate {
    group: usize,
    id: DesignId,
    fitness: f64,
}

/// All rated designs across `from`, best first. Ties keep group order.
fn ranked_candidates(from: &[&mut DesignGroup], fitnesses: &FitnessRecord) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = from
        .iter()
        .enumerate()
        .flat_map(|(g, group)| {
            group.iter().filter_map(move |d| {
                fitnesses.fitness(d).map(|fitness| Candidate {
                    group: g,
                    id: d.id(),
                    fitness,
                })
            })
        })
        .collect();
    out.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    out
}

/// Moves the picked designs into `into`, in pick order.
///
/// A design picked more than once is moved once and then duplicated as a
/// linked clone for each further pick.
fn move_picks(from: &mut [&mut DesignGroup], into: &mut DesignGroup, picks: &[Candidate]) {
    let mut wanted: Vec<HashSet<DesignId>> = vec![HashSet::new(); from.len()];
    for p in picks {
        wanted[p.group].insert(p.id);
    }
    let mut taken: HashMap<DesignId, Design> = HashMap::new();
    for (group, ids) in from.iter_mut().zip(&wanted) {
        if ids.is_empty() {
            continue;
        }
        for d in group.take_ids(ids) {
            taken.insert(d.id(), d);
        }
    }

    let mut placed: HashMap<DesignId, DesignId> = HashMap::new();
    for p in picks {
        if let Some(design) = taken.remove(&p.id) {
            placed.insert(p.id, design.id());
            into.insert(design);
        } else if let Some(first) = placed.get(&p.id).and_then(|&id| into.find(id)) {
            let copy = first.duplicate();
            into.insert(copy);
        }
    }
}

// ============================================================================
// Elitist
// ============================================================================

/// Keeps the `count` fittest designs.
#[derive(Debug, Clone, Default)]
pub struct ElitistSelector;

impl GeneticAlgorithmOperator for ElitistSelector {
    fn name(&self) -> &'static str {
        "elitist"
    }

    fn description(&self) -> &'static str {
        "Selects the designs with the best fitness."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Selector
    }
}

impl Selector for ElitistSelector {
    fn select(
        &mut self,
        _ctx: &mut OperatorContext<'_>,
        from: &mut [&mut DesignGroup],
        into: &mut DesignGroup,
        count: usize,
        fitnesses: &FitnessRecord,
    ) {
        let mut ranked = ranked_candidates(from, fitnesses);
        ranked.truncate(count);
        move_picks(from, into, &ranked);
    }

    fn can_select_same_design_more_than_once(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Roulette wheel
// ============================================================================

/// Fitness-proportionate selection with replacement.
///
/// Weights are `fitness - min_fitness + epsilon`, so the worst design keeps
/// a small chance. A design drawn several times occupies several slots as
/// linked clones.
#[derive(Debug, Clone, Default)]
pub struct RouletteWheelSelector;

const ROULETTE_EPSILON: f64 = 1e-10;

impl GeneticAlgorithmOperator for RouletteWheelSelector {
    fn name(&self) -> &'static str {
        "roulette_wheel"
    }

    fn description(&self) -> &'static str {
        "Fitness-proportionate selection with replacement."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Selector
    }
}

impl Selector for RouletteWheelSelector {
    fn select(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        from: &mut [&mut DesignGroup],
        into: &mut DesignGroup,
        count: usize,
        fitnesses: &FitnessRecord,
    ) {
        let candidates = ranked_candidates(from, fitnesses);
        if candidates.is_empty() || count == 0 {
            return;
        }
        let min = candidates
            .iter()
            .map(|c| c.fitness)
            .fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = candidates
            .iter()
            .map(|c| {
                let w = c.fitness - min + ROULETTE_EPSILON;
                if w.is_finite() && w > 0.0 {
                    w
                } else {
                    ROULETTE_EPSILON
                }
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let mut picks = Vec::with_capacity(count);
        for _ in 0..count {
            let threshold = ctx.rng.random_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = candidates.len() - 1;
            for (i, &w) in weights.iter().enumerate() {
                cumulative += w;
                if cumulative > threshold {
                    chosen = i;
                    break;
                }
            }
            picks.push(candidates[chosen]);
        }
        move_picks(from, into, &picks);
    }

    fn can_select_same_design_more_than_once(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Below limit
// ============================================================================

/// Keeps every design whose negated fitness is at most `fitness_limit`
/// (for layer or domination-count fitness: designs in the first layers, or
/// dominated by few others).
///
/// At least `shrinkage * count` designs survive; when the limit passes
/// fewer, the best remaining designs fill the gap.
#[derive(Debug, Clone)]
pub struct BelowLimitSelector {
    limit: f64,
    shrinkage: f64,
}

impl Default for BelowLimitSelector {
    fn default() -> Self {
        Self::new(6.0, 0.9)
    }
}

impl BelowLimitSelector {
    pub fn new(limit: f64, shrinkage: f64) -> Self {
        Self {
            limit,
            shrinkage: shrinkage.clamp(0.0, 1.0),
        }
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn shrinkage(&self) -> f64 {
        self.shrinkage
    }
}

impl GeneticAlgorithmOperator for BelowLimitSelector {
    fn name(&self) -> &'static str {
        "below_limit"
    }

    fn description(&self) -> &'static str {
        "Selects designs below a fitness limit, keeping a minimum share."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Selector
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        if let Some(limit) = db.get_double(tags::FITNESS_LIMIT)? {
            if !limit.is_finite() {
                log::error!("{}: `{}` must be finite", self.name(), tags::FITNESS_LIMIT);
                return Err(ConfigError::out_of_range(tags::FITNESS_LIMIT, "must be finite"));
            }
            self.limit = limit;
        }
        self.shrinkage = poll_rate(db, tags::SHRINKAGE_PERCENTAGE, self.shrinkage)?;
        log::debug!("{}: limit = {}, shrinkage = {}", self.name(), self.limit, self.shrinkage);
        Ok(())
    }
}

impl Selector for BelowLimitSelector {
    fn select(
        &mut self,
        _ctx: &mut OperatorContext<'_>,
        from: &mut [&mut DesignGroup],
        into: &mut DesignGroup,
        count: usize,
        fitnesses: &FitnessRecord,
    ) {
        let ranked = ranked_candidates(from, fitnesses);
        let minimum = (self.shrinkage * count as f64).ceil() as usize;
        let passing = ranked.iter().take_while(|c| -c.fitness <= self.limit).count();
        let keep = passing.max(minimum).min(ranked.len());
        move_picks(from, into, &ranked[..keep]);
    }

    fn can_select_same_design_more_than_once(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Selector> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{rng, two_var_target};
    use super::*;
    use std::sync::Arc;

    fn rated(t: &Arc<crate::space::DesignTarget>, fits: &[f64], rec: &mut FitnessRecord) -> DesignGroup {
        fits.iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut d = t.new_design();
                d.set_variables(&[i as f64 / 100.0, 0.5]);
                rec.add_fitness(&d, f);
                d
            })
            .collect()
    }

    #[test]
    fn test_elitist_takes_best_across_groups() {
        let t = two_var_target();
        let mut rec = FitnessRecord::new();
        let mut pop = rated(&t, &[-1.0, -5.0, 0.0], &mut rec);
        let mut kids = rated(&t, &[-2.0, -0.5], &mut rec);
        let mut next = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        ElitistSelector.select(&mut ctx, &mut [&mut pop, &mut kids], &mut next, 3, &rec);

        let got: Vec<f64> = next.iter().map(|d| rec.fitness(d).unwrap()).collect();
        assert_eq!(got, vec![0.0, -0.5, -1.0]);
        assert_eq!(pop.len() + kids.len(), 2);
    }

    #[test]
    fn test_unrated_designs_are_skipped() {
        let t = two_var_target();
        let mut rec = FitnessRecord::new();
        let mut pop = rated(&t, &[-1.0], &mut rec);
        pop.insert(t.new_design());
        let mut next = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        ElitistSelector.select(&mut ctx, &mut [&mut pop], &mut next, 5, &rec);
        assert_eq!(next.len(), 1);
        assert_eq!(pop.len(), 1);
    }

    #[test]
    fn test_roulette_duplicates_are_linked() {
        let t = two_var_target();
        let mut rec = FitnessRecord::new();
        let mut pop = rated(&t, &[0.0, -100.0], &mut rec);
        let mut next = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };
        RouletteWheelSelector.select(&mut ctx, &mut [&mut pop], &mut next, 6, &rec);
        assert_eq!(next.len(), 6);
        // The dominant design fills (nearly) every slot as linked clones.
        let first = next.get(0).unwrap();
        assert!(first.count_clones() >= 4);
        assert!(RouletteWheelSelector.can_select_same_design_more_than_once());
    }

    #[test]
    fn test_below_limit_with_shrinkage() {
        let t = two_var_target();
        let mut rec = FitnessRecord::new();
        let mut pop = rated(&t, &[0.0, 0.0, -1.0, -3.0, -8.0, -9.0], &mut rec);
        let mut next = DesignGroup::new();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 1, evaluations: 0 };

        // Limit 1 passes three designs; shrinkage needs ceil(0.5 * 6) = 3.
        BelowLimitSelector::new(1.0, 0.5).select(&mut ctx, &mut [&mut pop], &mut next, 6, &rec);
        assert_eq!(next.len(), 3);

        // Strict limit, minimum share wins.
        let mut rec = FitnessRecord::new();
        let mut pop = rated(&t, &[0.0, -2.0, -3.0, -4.0], &mut rec);
        let mut next = DesignGroup::new();
        BelowLimitSelector::new(0.0, 0.75).select(&mut ctx, &mut [&mut pop], &mut next, 4, &rec);
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_below_limit_poll() {
        let mut s = BelowLimitSelector::default();
        let db = ParameterDatabase::new()
            .with(tags::FITNESS_LIMIT, 2.0)
            .with(tags::SHRINKAGE_PERCENTAGE, 0.4);
        s.poll_for_parameters(&db).unwrap();
        assert_eq!((s.limit(), s.shrinkage()), (2.0, 0.4));

        let db = ParameterDatabase::new().with(tags::SHRINKAGE_PERCENTAGE, 1.4);
        assert!(s.poll_for_parameters(&db).is_err());
    }
}
