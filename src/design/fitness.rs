//! Per-generation fitness values.
//!
//! A [`FitnessRecord`] maps design ids to a scalar fitness and keeps running
//! statistics (max, min, total, count). Larger fitness is always better.
//!
//! Bulk construction can [`suspend_statistics`](FitnessRecord::suspend_statistics)
//! so inserts skip the per-value statistic updates; a later
//! [`resume_statistics`](FitnessRecord::resume_statistics) recomputes them
//! in one pass.

use super::types::{Design, DesignId};
use std::collections::HashMap;

/// Fitness values of the designs of one generation.
#[derive(Debug, Clone)]
pub struct FitnessRecord {
    values: HashMap<DesignId, f64>,
    max: f64,
    min: f64,
    total: f64,
    suspended: bool,
}

impl Default for FitnessRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl FitnessRecord {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: HashMap::with_capacity(capacity),
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
            total: 0.0,
            suspended: false,
        }
    }

    /// Records the fitness of a design.
    ///
    /// Returns `false` (and leaves the record unchanged) if the design
    /// already has a fitness.
    pub fn add_fitness(&mut self, design: &Design, fitness: f64) -> bool {
        self.add_fitness_by_id(design.id(), fitness)
    }

    pub fn add_fitness_by_id(&mut self, id: DesignId, fitness: f64) -> bool {
        if self.values.contains_key(&id) {
            return false;
        }
        self.values.insert(id, fitness);
        if !self.suspended {
            self.absorb(fitness);
        }
        true
    }

    /// Fitness of a design, if recorded.
    pub fn fitness(&self, design: &Design) -> Option<f64> {
        self.values.get(&design.id()).copied()
    }

    pub fn fitness_by_id(&self, id: DesignId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn contains(&self, id: DesignId) -> bool {
        self.values.contains_key(&id)
    }

    /// Stops updating statistics on insert.
    pub fn suspend_statistics(&mut self) {
        self.suspended = true;
    }

    /// Recomputes statistics from all recorded values and resumes
    /// per-insert updates.
    pub fn resume_statistics(&mut self) {
        self.suspended = false;
        self.max = f64::NEG_INFINITY;
        self.min = f64::INFINITY;
        self.total = 0.0;
        let values: Vec<f64> = self.values.values().copied().collect();
        for f in values {
            self.absorb(f);
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn absorb(&mut self, fitness: f64) {
        self.max = self.max.max(fitness);
        self.min = self.min.min(fitness);
        self.total += fitness;
    }

    /// Largest recorded fitness; `-inf` when empty.
    pub fn max_fitness(&self) -> f64 {
        self.max
    }

    /// Smallest recorded fitness; `+inf` when empty.
    pub fn min_fitness(&self) -> f64 {
        self.min
    }

    pub fn total_fitness(&self) -> f64 {
        self.total
    }

    /// Mean fitness; `NaN` when empty.
    pub fn average_fitness(&self) -> f64 {
        if self.values.is_empty() {
            f64::NAN
        } else {
            self.total / self.values.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DesignId, f64)> + '_ {
        self.values.iter().map(|(&id, &f)| (id, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_sentinels() {
        let r = FitnessRecord::new();
        assert_eq!(r.max_fitness(), f64::NEG_INFINITY);
        assert_eq!(r.min_fitness(), f64::INFINITY);
        assert_eq!(r.total_fitness(), 0.0);
        assert_eq!(r.len(), 0);
        assert!(r.average_fitness().is_nan());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut r = FitnessRecord::new();
        assert!(r.add_fitness_by_id(1, 3.0));
        assert!(!r.add_fitness_by_id(1, 9.0));
        assert_eq!(r.fitness_by_id(1), Some(3.0));
        assert_eq!(r.total_fitness(), 3.0);
    }

    #[test]
    fn test_suspend_resume() {
        let mut r = FitnessRecord::new();
        r.suspend_statistics();
        r.add_fitness_by_id(1, -2.0);
        r.add_fitness_by_id(2, 5.0);
        assert_eq!(r.max_fitness(), f64::NEG_INFINITY);
        r.resume_statistics();
        assert!(!r.is_suspended());
        assert_eq!(r.max_fitness(), 5.0);
        assert_eq!(r.min_fitness(), -2.0);
        assert_eq!(r.total_fitness(), 3.0);
        r.add_fitness_by_id(3, 10.0);
        assert_eq!(r.max_fitness(), 10.0);
    }

    proptest! {
        #[test]
        fn prop_statistics_match(values in proptest::collection::vec(-1e6f64..1e6, 1..50)) {
            let mut r = FitnessRecord::new();
            for (i, &f) in values.iter().enumerate() {
                r.add_fitness_by_id(i as u64, f);
            }
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let sum: f64 = values.iter().sum();
            prop_assert_eq!(r.max_fitness(), max);
            prop_assert_eq!(r.min_fitness(), min);
            prop_assert!((r.total_fitness() - sum).abs() <= 1e-6 * (1.0 + sum.abs()));
            prop_assert_eq!(r.len(), values.len());
        }
    }
}
