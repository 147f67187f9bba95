//! Convergers.
//!
//! Every converger honors a generation budget and a function evaluation
//! budget. The trackers additionally stop once a fitness statistic has
//! stalled: the percent change between the oldest and newest value in a
//! window of `num_generations` generations falls to `percent_change` or
//! below.

use super::{Converger, GeneticAlgorithmOperator, OperatorContext, OperatorKind};
use crate::design::{DesignGroup, FitnessRecord};
use crate::error::ConfigError;
use crate::params::{tags, ParameterDatabase};
use std::collections::VecDeque;

// ============================================================================
// Budgets
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Budget {
    max_generations: usize,
    max_evaluations: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_generations: 100,
            max_evaluations: usize::MAX,
        }
    }
}

impl Budget {
    fn poll(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        if let Some(g) = db.get_size(tags::MAX_GENERATIONS)? {
            self.max_generations = g;
        }
        if let Some(e) = db.get_size(tags::MAX_EVALUATIONS)? {
            self.max_evaluations = e;
        }
        Ok(())
    }

    fn exhausted(&self, name: &str, ctx: &OperatorContext<'_>) -> bool {
        if ctx.generation >= self.max_generations {
            log::info!("{name}: generation budget of {} reached", self.max_generations);
            return true;
        }
        if ctx.evaluations >= self.max_evaluations {
            log::info!(
                "{name}: evaluation budget of {} reached ({} used)",
                self.max_evaluations,
                ctx.evaluations
            );
            return true;
        }
        false
    }
}

// ============================================================================
// Max generations
// ============================================================================

/// Stops on the generation or evaluation budget only.
#[derive(Debug, Clone, Default)]
pub struct MaxGenerationsConverger {
    budget: Budget,
}

impl MaxGenerationsConverger {
    pub fn new(max_generations: usize) -> Self {
        Self {
            budget: Budget {
                max_generations,
                ..Budget::default()
            },
        }
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.budget.max_evaluations = max_evaluations;
        self
    }

    pub fn max_generations(&self) -> usize {
        self.budget.max_generations
    }
}

impl GeneticAlgorithmOperator for MaxGenerationsConverger {
    fn name(&self) -> &'static str {
        "max_generations"
    }

    fn description(&self) -> &'static str {
        "Stops after a fixed number of generations or evaluations."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Converger
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.budget.poll(db)?;
        log::debug!("{}: {:?}", self.name(), self.budget);
        Ok(())
    }
}

impl Converger for MaxGenerationsConverger {
    fn check_convergence(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        _group: &DesignGroup,
        _fitnesses: &FitnessRecord,
    ) -> bool {
        self.budget.exhausted(self.name(), ctx)
    }

    fn clone_box(&self) -> Box<dyn Converger> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Windowed percent change
// ============================================================================

#[derive(Debug)]
struct StallWindow {
    percent_change: f64,
    num_generations: usize,
    history: VecDeque<f64>,
}

impl Default for StallWindow {
    fn default() -> Self {
        Self {
            percent_change: 0.1,
            num_generations: 10,
            history: VecDeque::new(),
        }
    }
}

impl Clone for StallWindow {
    fn clone(&self) -> Self {
        Self {
            percent_change: self.percent_change,
            num_generations: self.num_generations,
            history: VecDeque::new(),
        }
    }
}

impl StallWindow {
    fn poll(&mut self, name: &str, db: &ParameterDatabase) -> Result<(), ConfigError> {
        if let Some(p) = db.get_double(tags::PERCENT_CHANGE)? {
            if !p.is_finite() || p < 0.0 {
                log::error!("{name}: `{}` = {p} must be non-negative", tags::PERCENT_CHANGE);
                return Err(ConfigError::out_of_range(tags::PERCENT_CHANGE, "must be non-negative"));
            }
            self.percent_change = p;
        }
        if let Some(n) = db.get_size(tags::NUM_GENERATIONS)? {
            if n == 0 {
                log::error!("{name}: `{}` must be at least 1", tags::NUM_GENERATIONS);
                return Err(ConfigError::out_of_range(tags::NUM_GENERATIONS, "must be at least 1"));
            }
            self.num_generations = n;
        }
        Ok(())
    }

    /// Records a value and reports whether the window has stalled.
    fn record(&mut self, value: f64) -> bool {
        self.history.push_back(value);
        while self.history.len() > self.num_generations + 1 {
            self.history.pop_front();
        }
        if self.history.len() <= self.num_generations {
            return false;
        }
        match (self.history.front(), self.history.back()) {
            (Some(&old), Some(&new)) => percent_change(old, new) <= self.percent_change,
            _ => false,
        }
    }
}

/// Relative change from `old` to `new` as a fraction of `|old|`.
fn percent_change(old: f64, new: f64) -> f64 {
    let delta = (new - old).abs();
    if delta == 0.0 {
        0.0
    } else if old == 0.0 {
        f64::INFINITY
    } else {
        delta / old.abs()
    }
}

fn group_fitness(group: &DesignGroup, fitnesses: &FitnessRecord) -> Vec<f64> {
    group.iter().filter_map(|d| fitnesses.fitness(d)).collect()
}

// ---- trackers ----

/// Stops when the best fitness of the population stalls.
#[derive(Debug, Clone, Default)]
pub struct BestFitnessTracker {
    budget: Budget,
    window: StallWindow,
}

impl BestFitnessTracker {
    pub fn new(percent_change: f64, num_generations: usize) -> Self {
        Self {
            budget: Budget::default(),
            window: StallWindow {
                percent_change,
                num_generations,
                history: VecDeque::new(),
            },
        }
    }

    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.budget.max_generations = max_generations;
        self
    }
}

impl GeneticAlgorithmOperator for BestFitnessTracker {
    fn name(&self) -> &'static str {
        "best_fitness_tracker"
    }

    fn description(&self) -> &'static str {
        "Stops when the best fitness changes too little over a window of generations."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Converger
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.budget.poll(db)?;
        self.window.poll(self.name(), db)?;
        log::debug!("{}: {:?}, {:?}", self.name(), self.budget, self.window);
        Ok(())
    }
}

impl Converger for BestFitnessTracker {
    fn check_convergence(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        group: &DesignGroup,
        fitnesses: &FitnessRecord,
    ) -> bool {
        if self.budget.exhausted(self.name(), ctx) {
            return true;
        }
        let best = group_fitness(group, fitnesses)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() {
            return false;
        }
        let stalled = self.window.record(best);
        if stalled {
            log::info!("{}: best fitness stalled at {best}", self.name());
        }
        stalled
    }

    fn clone_box(&self) -> Box<dyn Converger> {
        Box::new(self.clone())
    }
}

/// Stops when the average fitness of the population stalls.
#[derive(Debug, Clone, Default)]
pub struct AverageFitnessTracker {
    budget: Budget,
    window: StallWindow,
}

impl AverageFitnessTracker {
    pub fn new(percent_change: f64, num_generations: usize) -> Self {
        Self {
            budget: Budget::default(),
            window: StallWindow {
                percent_change,
                num_generations,
                history: VecDeque::new(),
            },
        }
    }

    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.budget.max_generations = max_generations;
        self
    }
}

impl GeneticAlgorithmOperator for AverageFitnessTracker {
    fn name(&self) -> &'static str {
        "average_fitness_tracker"
    }

    fn description(&self) -> &'static str {
        "Stops when the average fitness changes too little over a window of generations."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Converger
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.budget.poll(db)?;
        self.window.poll(self.name(), db)?;
        log::debug!("{}: {:?}, {:?}", self.name(), self.budget, self.window);
        Ok(())
    }
}

impl Converger for AverageFitnessTracker {
    fn check_convergence(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        group: &DesignGroup,
        fitnesses: &FitnessRecord,
    ) -> bool {
        if self.budget.exhausted(self.name(), ctx) {
            return true;
        }
        let values = group_fitness(group, fitnesses);
        if values.is_empty() {
            return false;
        }
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        let stalled = self.window.record(avg);
        if stalled {
            log::info!("{}: average fitness stalled at {avg}", self.name());
        }
        stalled
    }

    fn clone_box(&self) -> Box<dyn Converger> {
        Box::new(self.clone())
    }
}
