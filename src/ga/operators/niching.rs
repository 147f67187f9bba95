//! Niche pressure applicators.
//!
//! Run right after selection to keep the population from collapsing onto a
//! few points of the front.
//!
//! # References
//!
//! - Goldberg & Richardson (1987), "Genetic algorithms with sharing for
//!   multimodal function optimization"
//! - Deb & Goldberg (1989), "An investigation of niche and species formation
//!   in genetic function optimization"

use super::{GeneticAlgorithmOperator, NichePressureApplicator, OperatorContext, OperatorKind};
use crate::design::{Design, DesignGroup, DesignId, FitnessRecord};
use crate::error::ConfigError;
use crate::params::{tags, ParameterDatabase};
use std::collections::HashSet;

/// Leaves the population untouched.
#[derive(Debug, Clone, Default)]
pub struct NullNichePressureApplicator;

impl GeneticAlgorithmOperator for NullNichePressureApplicator {
    fn name(&self) -> &'static str {
        "null_niching"
    }

    fn description(&self) -> &'static str {
        "Does nothing."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::NichePressureApplicator
    }
}

impl NichePressureApplicator for NullNichePressureApplicator {
    fn apply_niche_pressure(
        &mut self,
        _ctx: &mut OperatorContext<'_>,
        _pop: &mut DesignGroup,
        _fitnesses: &FitnessRecord,
    ) -> Vec<Design> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn NichePressureApplicator> {
        Box::new(self.clone())
    }
}

/// Removes designs that fall inside the niche of a fitter design.
///
/// Objectives are normalized to `[0, 1]` over the population. A design lies
/// in the niche of another when `sum((delta_i / r_i)^2) < 1`, where `r` is
/// the niche vector (one radius per objective; a single value applies to
/// all). Designs are visited best first, so the fitter design of a crowded
/// pair survives.
///
/// With caching enabled, niched designs are held back and put back into the
/// population before the next selection instead of being discarded.
#[derive(Debug)]
pub struct RadialNichePressureApplicator {
    radii: Vec<f64>,
    cache_niched: bool,
    cache: Vec<Design>,
}

impl Default for RadialNichePressureApplicator {
    fn default() -> Self {
        Self::new(vec![0.01], false)
    }
}

impl Clone for RadialNichePressureApplicator {
    fn clone(&self) -> Self {
        Self::new(self.radii.clone(), self.cache_niched)
    }
}

impl RadialNichePressureApplicator {
    pub fn new(radii: Vec<f64>, cache_niched: bool) -> Self {
        Self {
            radii,
            cache_niched,
            cache: Vec::new(),
        }
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn radius(&self, objective: usize) -> f64 {
        self.radii
            .get(objective)
            .or(self.radii.last())
            .copied()
            .unwrap_or(0.01)
    }

    fn normalized_objectives(ctx: &OperatorContext<'_>, pop: &DesignGroup) -> Vec<Vec<f64>> {
        let raw: Vec<Vec<f64>> = pop.iter().map(|d| ctx.target.adjusted_objectives(d)).collect();
        let nof = ctx.target.nof();
        let mut lo = vec![f64::INFINITY; nof];
        let mut hi = vec![f64::NEG_INFINITY; nof];
        for row in &raw {
            for (i, &v) in row.iter().enumerate() {
                lo[i] = lo[i].min(v);
                hi[i] = hi[i].max(v);
            }
        }
        raw.into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let range = hi[i] - lo[i];
                        if range > 0.0 && range.is_finite() {
                            (v - lo[i]) / range
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn in_niche(&self, a: &[f64], b: &[f64]) -> bool {
        let dist: f64 = a
            .iter()
            .zip(b)
            .enumerate()
            .map(|(i, (x, y))| ((x - y) / self.radius(i)).powi(2))
            .sum();
        dist < 1.0
    }
}

impl GeneticAlgorithmOperator for RadialNichePressureApplicator {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn description(&self) -> &'static str {
        "Removes designs inside the hyper-ellipse niche of a fitter design."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::NichePressureApplicator
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        if let Some(radii) = db.get_vector(tags::NICHE_VECTOR)? {
            if radii.is_empty() {
                log::error!("{}: `{}` must not be empty", self.name(), tags::NICHE_VECTOR);
                return Err(ConfigError::EmptyVector {
                    tag: tags::NICHE_VECTOR.to_string(),
                });
            }
            if radii.iter().any(|r| !r.is_finite() || *r <= 0.0) {
                log::error!("{}: `{}` radii must be positive", self.name(), tags::NICHE_VECTOR);
                return Err(ConfigError::out_of_range(tags::NICHE_VECTOR, "radii must be positive"));
            }
            self.radii = radii.to_vec();
        }
        if let Some(cache) = db.get_bool(tags::CACHE_NICHED_DESIGNS)? {
            self.cache_niched = cache;
        }
        log::debug!("{}: radii = {:?}, cache = {}", self.name(), self.radii, self.cache_niched);
        Ok(())
    }
}

impl NichePressureApplicator for RadialNichePressureApplicator {
    fn apply_niche_pressure(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        pop: &mut DesignGroup,
        fitnesses: &FitnessRecord,
    ) -> Vec<Design> {
        if pop.len() < 2 {
            return Vec::new();
        }
        let coords = Self::normalized_objectives(ctx, pop);
        let mut order: Vec<usize> = (0..pop.len()).collect();
        let fitness_of = |i: usize| {
            pop.get(i)
                .and_then(|d| fitnesses.fitness(d))
                .unwrap_or(f64::NEG_INFINITY)
        };
        order.sort_by(|&a, &b| fitness_of(b).total_cmp(&fitness_of(a)));

        let mut kept: Vec<usize> = Vec::with_capacity(pop.len());
        let mut niched: HashSet<DesignId> = HashSet::new();
        for &i in &order {
            if kept.iter().any(|&k| self.in_niche(&coords[k], &coords[i])) {
                if let Some(d) = pop.get(i) {
                    niched.insert(d.id());
                }
            } else {
                kept.push(i);
            }
        }

        let removed = pop.take_ids(&niched);
        log::debug!("{}: {} designs niched out", self.name(), removed.len());
        if self.cache_niched {
            self.cache.extend(removed);
            Vec::new()
        } else {
            removed
        }
    }

    fn pre_selection(&mut self, _ctx: &mut OperatorContext<'_>, pop: &mut DesignGroup) {
        if !self.cache.is_empty() {
            log::debug!("{}: reinserting {} cached designs", self.name(), self.cache.len());
            pop.extend(self.cache.drain(..));
        }
    }

    fn take_cached(&mut self) -> Vec<Design> {
        std::mem::take(&mut self.cache)
    }

    fn clone_box(&self) -> Box<dyn NichePressureApplicator> {
        Box::new(self.clone())
    }
}
