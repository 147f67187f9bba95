//! The genetic algorithm.
//!
//! [`GeneticAlgorithm`] owns one operator of every kind, the current
//! population, the offspring of the running generation and a handle to the
//! shared discard pool. It exposes every stage of a generation as a step
//! method; a [`MainLoop`] decides the order in which they run.
//!
//! # Usage
//!
//! ```
//! use u_evolve::ga::operators::Evaluation;
//! use u_evolve::ga::{GaConfig, GeneticAlgorithm};
//! use u_evolve::params::{tags, ParameterDatabase};
//! use u_evolve::space::{DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};
//!
//! let target = DesignTarget::builder()
//!     .variable(DesignVariableInfo::continuous("x", -5.0, 5.0))
//!     .objective(ObjectiveFunctionInfo::minimize("x^2"))
//!     .build()
//!     .unwrap();
//!
//! let params = ParameterDatabase::new()
//!     .with(tags::POPULATION_SIZE, 20_i64)
//!     .with(tags::MAX_GENERATIONS, 10_i64);
//!
//! let mut ga = GeneticAlgorithm::builder(target)
//!     .config(GaConfig::soga().with_converger("max_generations").with_seed(1))
//!     .params(params)
//!     .evaluate_with(|x: &[f64]| Some(Evaluation::new(vec![x[0] * x[0]])))
//!     .build()
//!     .unwrap();
//!
//! let result = ga.run().unwrap();
//! assert_eq!(result.generations, 10);
//! assert!(result.best.is_some());
//! ```

use super::config::GaConfig;
use super::main_loop::MainLoop;
use super::operators::{
    best_index, Converger, Crosser, Evaluation, Evaluator, FitnessAssessor, FnEvaluator,
    GeneticAlgorithmOperator, Initializer, Mutator, NichePressureApplicator, OperatorContext,
    OperatorRegistry, Selector,
};
use crate::design::{Design, DesignGroup, DesignGroupVector, DesignId, DiscardPool, FitnessRecord};
use crate::error::{ConfigError, EvolveError};
use crate::params::ParameterDatabase;
use crate::random::{create_rng, EvolveRng};
use crate::space::DesignTarget;
use rand::Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type EvalFn = Box<dyn Fn(&[f64]) -> Option<Evaluation> + Send + Sync>;

/// Counters of one completed generation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationStats {
    /// Generation number (1-based; the initial selection pass is 1).
    pub generation: usize,
    pub population_size: usize,
    /// Offspring created by crossover and mutation.
    pub offspring: usize,
    /// Offspring removed because their variables could not be repaired.
    pub invalid_flushed: usize,
    /// Offspring removed because they could not be evaluated.
    pub illconditioned_flushed: usize,
    /// Offspring that took over the responses of an existing clone.
    pub clones_found: usize,
    /// Out-of-band designs merged from the evaluator.
    pub injected: usize,
    /// Designs removed by niche pressure.
    pub niched: usize,
    /// Designs put back to honor the population floor.
    pub restored: usize,
    /// Designs moved to the discard pool.
    pub discarded: usize,
    /// Evaluations performed so far.
    pub evaluations: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult {
    /// Copy of the fittest member of the final population.
    pub best: Option<Design>,

    /// Fitness of `best` (`-inf` when there is none).
    pub best_fitness: f64,

    /// Total number of generations executed.
    pub generations: usize,

    /// Total number of evaluations performed.
    pub evaluations: usize,

    /// Whether the converger stopped the run.
    pub converged: bool,

    /// Whether the run was cancelled externally.
    pub cancelled: bool,

    /// Best population fitness at the end of each generation.
    pub fitness_history: Vec<f64>,

    /// Per-generation counters.
    pub stats: Vec<GenerationStats>,
}

macro_rules! context {
    ($ga:ident) => {
        OperatorContext {
            target: &$ga.target,
            rng: &mut $ga.rng,
            generation: $ga.generation,
            evaluations: $ga.evaluator.evaluations(),
        }
    };
}

/// A configured genetic algorithm.
pub struct GeneticAlgorithm {
    target: Arc<DesignTarget>,
    config: GaConfig,
    rng: EvolveRng,

    main_loop: Option<Box<dyn MainLoop>>,
    initializer: Box<dyn Initializer>,
    crosser: Box<dyn Crosser>,
    mutator: Box<dyn Mutator>,
    assessor: Box<dyn FitnessAssessor>,
    selector: Box<dyn Selector>,
    niche: Box<dyn NichePressureApplicator>,
    converger: Box<dyn Converger>,
    evaluator: Box<dyn Evaluator>,

    population: DesignGroup,
    offspring: DesignGroup,
    unselected: DesignGroup,
    discards: Arc<DiscardPool>,
    fitnesses: Option<FitnessRecord>,

    initialized: bool,
    generation: usize,
    current: GenerationStats,
    stats: Vec<GenerationStats>,
    fitness_history: Vec<f64>,
}

impl std::fmt::Debug for GeneticAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneticAlgorithm")
            .field("config", &self.config)
            .field("generation", &self.generation)
            .field("population", &self.population.len())
            .field("offspring", &self.offspring.len())
            .field("discards", &self.discards.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl GeneticAlgorithm {
    pub fn builder(target: Arc<DesignTarget>) -> GeneticAlgorithmBuilder {
        GeneticAlgorithmBuilder::new(target)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn target(&self) -> &Arc<DesignTarget> {
        &self.target
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn population(&self) -> &DesignGroup {
        &self.population
    }

    /// Mutable population, for callers that manage membership themselves.
    pub fn population_mut(&mut self) -> &mut DesignGroup {
        &mut self.population
    }

    pub fn offspring(&self) -> &DesignGroup {
        &self.offspring
    }

    pub fn offspring_mut(&mut self) -> &mut DesignGroup {
        &mut self.offspring
    }

    /// The discard pool, possibly shared with sibling algorithms.
    pub fn discards(&self) -> &Arc<DiscardPool> {
        &self.discards
    }

    /// Fitness record of the current generation, if assessed.
    pub fn fitnesses(&self) -> Option<&FitnessRecord> {
        self.fitnesses.as_ref()
    }

    /// Generations completed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn evaluations(&self) -> usize {
        self.evaluator.evaluations()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stats(&self) -> &[GenerationStats] {
        &self.stats
    }

    /// Counters of the generation in progress.
    pub fn current_stats(&self) -> &GenerationStats {
        &self.current
    }

    pub fn crosser(&self) -> &dyn Crosser {
        self.crosser.as_ref()
    }

    pub fn mutator(&self) -> &dyn Mutator {
        self.mutator.as_ref()
    }

    pub fn selector(&self) -> &dyn Selector {
        self.selector.as_ref()
    }

    /// Copy of the fittest population member under the current record.
    pub fn best_design(&self) -> Option<Design> {
        let fitnesses = self.fitnesses.as_ref()?;
        best_index(&self.population, fitnesses).and_then(|i| self.population.get(i).cloned())
    }

    // ------------------------------------------------------------------
    // Running
    // ------------------------------------------------------------------

    /// Creates, repairs, clone-tests and evaluates the initial population.
    ///
    /// Calling it again starts the search over; the previous population is
    /// released and the main loop restarts at generation 0.
    pub fn initialize(&mut self) -> Result<(), EvolveError> {
        if self.initialized {
            log::info!("re-initializing; releasing {} designs", self.population.len());
            self.population.take_all();
            self.offspring.take_all();
            self.unselected.take_all();
            self.niche.take_cached();
            self.fitnesses = None;
            self.stats.clear();
            self.fitness_history.clear();
            self.generation = 0;
            self.main_loop = self.main_loop.as_ref().map(|m| m.clone_box());
        }

        let mut ctx = context!(self);
        self.initializer.initialize(&mut ctx, &mut self.population);
        let created = self.population.len();

        let mut invalid = 0;
        for d in self.population.iter_mut() {
            if !self.target.variables_in_bounds(d) && !self.target.repair_variables(d) {
                d.set_illconditioned(true);
                invalid += 1;
            }
        }
        self.population.test_within_list_for_clones();
        self.population.test_for_clones(&mut self.discards.checkout());
        self.evaluator.evaluate(&self.target, &mut self.population);
        let flushed = self.population.flush_illconditioned();
        if flushed > 0 {
            log::info!(
                "initialization: flushed {flushed} illconditioned designs ({invalid} with invalid variables)"
            );
        }

        if self.population.is_empty() {
            log::error!("initialization produced no usable designs ({created} created)");
            return Err(EvolveError::EmptyPopulation);
        }
        if self.population.len() < self.config.min_population_size {
            log::warn!(
                "initial population of {} is below the minimum of {}",
                self.population.len(),
                self.config.min_population_size
            );
        }
        log::info!(
            "initialized {} designs with {}; {} evaluations",
            self.population.len(),
            self.initializer.name(),
            self.evaluator.evaluations()
        );
        self.initialized = true;
        Ok(())
    }

    /// Runs one generation through the main loop.
    ///
    /// Returns `Ok(false)` once the search has converged.
    pub fn run_generation(&mut self) -> Result<bool, EvolveError> {
        if !self.initialized {
            return Err(EvolveError::NotInitialized);
        }
        let Some(mut main_loop) = self.main_loop.take() else {
            return Err(EvolveError::GenerationInProgress);
        };
        let outcome = main_loop.run_generation(self);
        self.main_loop = Some(main_loop);
        outcome
    }

    /// Runs until convergence, initializing first if needed.
    pub fn run(&mut self) -> Result<GaResult, EvolveError> {
        self.run_with_cancel(None)
    }

    /// Runs with an optional cancellation token.
    ///
    /// If `cancel` is `Some` and the flag is set to `true`, the run stops
    /// before the next generation starts.
    pub fn run_with_cancel(&mut self, cancel: Option<Arc<AtomicBool>>) -> Result<GaResult, EvolveError> {
        if !self.initialized {
            self.initialize()?;
        }
        let mut converged = false;
        let mut cancelled = false;
        loop {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    log::info!("run cancelled after {} generations", self.generation);
                    cancelled = true;
                    break;
                }
            }
            if !self.run_generation()? {
                converged = true;
                break;
            }
        }
        self.release_niche_cache();
        Ok(self.result(converged, cancelled))
    }

    /// Moves designs held back by the niche pressure applicator into the
    /// discard pool, where Pareto extraction and clone tests can see them.
    ///
    /// Returns how many were moved.
    pub fn release_niche_cache(&mut self) -> usize {
        let cached = self.niche.take_cached();
        let n = cached.len();
        if n > 0 {
            log::debug!("releasing {n} cached niched designs to the discard pool");
            self.discards.checkout().extend(cached);
        }
        n
    }

    fn result(&self, converged: bool, cancelled: bool) -> GaResult {
        let fittest = self
            .fitnesses
            .as_ref()
            .and_then(|f| best_index(&self.population, f).map(|i| (f, i)))
            .and_then(|(f, i)| self.population.get(i).map(|d| (d, f.fitness(d))));
        let (best, best_fitness) = match fittest {
            Some((d, fitness)) => (Some(d.clone()), fitness.unwrap_or(f64::NEG_INFINITY)),
            None => (None, f64::NEG_INFINITY),
        };
        GaResult {
            best,
            best_fitness,
            generations: self.generation,
            evaluations: self.evaluator.evaluations(),
            converged,
            cancelled,
            fitness_history: self.fitness_history.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Creates another algorithm for the same problem.
    ///
    /// The sibling shares the target and the discard pool, gets copies of
    /// every operator's tunables and its own generator seeded from this
    /// one. It starts uninitialized.
    pub fn spawn_sibling(&mut self, evaluator: Box<dyn Evaluator>) -> GeneticAlgorithm {
        let seed: u64 = self.rng.random();
        GeneticAlgorithm {
            target: Arc::clone(&self.target),
            config: self.config.clone(),
            rng: create_rng(seed),
            main_loop: self.main_loop.as_ref().map(|m| m.clone_box()),
            initializer: self.initializer.clone_box(),
            crosser: self.crosser.clone_box(),
            mutator: self.mutator.clone_box(),
            assessor: self.assessor.clone_box(),
            selector: self.selector.clone_box(),
            niche: self.niche.clone_box(),
            converger: self.converger.clone_box(),
            evaluator,
            population: DesignGroup::new(),
            offspring: DesignGroup::new(),
            unselected: DesignGroup::new(),
            discards: Arc::clone(&self.discards),
            fitnesses: None,
            initialized: false,
            generation: 0,
            current: GenerationStats::default(),
            stats: Vec::new(),
            fitness_history: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Generation steps
    // ------------------------------------------------------------------

    /// Resets the per-generation counters.
    pub fn begin_generation(&mut self) {
        self.current = GenerationStats::default();
    }

    /// Drops the fitness record of the previous generation.
    pub fn invalidate_fitness(&mut self) {
        self.fitnesses = None;
    }

    pub fn do_crossover(&mut self) -> usize {
        let before = self.offspring.len();
        let mut ctx = context!(self);
        self.crosser.crossover(&mut ctx, &self.population, &mut self.offspring);
        let created = self.offspring.len() - before;
        self.current.offspring += created;
        log::debug!("{}: {created} offspring", self.crosser.name());
        created
    }

    pub fn do_mutation(&mut self) -> usize {
        let before = self.offspring.len();
        let mut ctx = context!(self);
        self.mutator.mutate(&mut ctx, &self.population, &mut self.offspring);
        let created = self.offspring.len() - before;
        self.current.offspring += created;
        log::debug!("{}: {created} mutants", self.mutator.name());
        created
    }

    /// Repairs offspring variables when an operator may have left the
    /// domain, then flushes every illconditioned offspring.
    ///
    /// Returns the number of offspring removed.
    pub fn validate_offspring(&mut self) -> usize {
        if self.crosser.can_produce_invalid_variable_values() || self.mutator.can_produce_invalid_variable_values() {
            for d in self.offspring.iter_mut() {
                if !self.target.variables_in_bounds(d) && !self.target.repair_variables(d) {
                    d.set_illconditioned(true);
                }
            }
        }
        let flushed = self.offspring.flush_illconditioned();
        if flushed > 0 {
            log::info!(
                "generation {}: flushed {flushed} offspring with invalid variable values",
                self.generation + 1
            );
        }
        self.current.invalid_flushed += flushed;
        flushed
    }

    /// Clone-tests the offspring against the population, the discard pool
    /// and each other. Returns the number of offspring that picked up
    /// responses from an evaluated clone.
    pub fn test_offspring_for_clones(&mut self) -> usize {
        let pending = self.offspring.len() - self.offspring.evaluated_count();
        self.offspring.test_for_clones(&mut self.population);
        self.offspring.test_for_clones(&mut self.discards.checkout());
        self.offspring.test_within_list_for_clones();
        let found = pending - (self.offspring.len() - self.offspring.evaluated_count());
        if found > 0 {
            log::debug!("{found} offspring reuse the responses of a clone");
        }
        self.current.clones_found += found;
        found
    }

    /// Evaluates the offspring and flushes the ones that could not be scored.
    pub fn evaluate_offspring(&mut self) -> usize {
        let performed = self.evaluator.evaluate(&self.target, &mut self.offspring);
        let flushed = self.offspring.flush_illconditioned();
        if flushed > 0 {
            log::info!(
                "generation {}: flushed {flushed} offspring that could not be evaluated",
                self.generation + 1
            );
        }
        self.current.illconditioned_flushed += flushed;
        performed
    }

    /// Merges designs evaluated out of band into the offspring.
    pub fn absorb_injections(&mut self) -> usize {
        let injected = self.evaluator.take_injections(&self.target);
        let n = injected.len();
        if n > 0 {
            log::debug!("absorbing {n} injected designs");
            self.offspring.extend(injected);
        }
        self.current.injected += n;
        n
    }

    pub fn pre_selection(&mut self) {
        let mut ctx = context!(self);
        self.selector.pre_select(&mut ctx, &mut self.population);
        self.niche.pre_selection(&mut ctx, &mut self.population);
    }

    /// Assesses population and offspring together.
    pub fn assess_fitness(&mut self) {
        let mut ctx = context!(self);
        let groups: DesignGroupVector = [&self.population, &self.offspring].into_iter().collect();
        let record = self.assessor.assess_fitness(&mut ctx, &groups);
        debug_assert_eq!(record.len(), groups.total_design_count(), "every design must be rated");
        self.fitnesses = Some(record);
    }

    /// Selects the next population from population and offspring.
    ///
    /// Designs not chosen are held back until
    /// [`discard_unselected`](Self::discard_unselected).
    pub fn select(&mut self) {
        let Some(fitnesses) = self.fitnesses.as_ref() else {
            log::warn!("selection skipped: fitness has not been assessed");
            return;
        };
        let count = self.population.len().max(self.config.min_population_size);
        let mut current = std::mem::take(&mut self.population);
        let mut next = DesignGroup::with_capacity(count);
        let mut ctx = context!(self);
        self.selector
            .select(&mut ctx, &mut [&mut current, &mut self.offspring], &mut next, count, fitnesses);
        self.population = next;
        self.unselected.absorb(&mut current);
        self.unselected.absorb(&mut self.offspring);
    }

    pub fn apply_niche_pressure(&mut self) -> usize {
        let Some(fitnesses) = self.fitnesses.as_ref() else {
            return 0;
        };
        let mut ctx = context!(self);
        let removed = self.niche.apply_niche_pressure(&mut ctx, &mut self.population, fitnesses);
        let n = removed.len();
        self.unselected.extend(removed);
        self.current.niched += n;
        n
    }

    /// Puts the best unselected designs back while the population is below
    /// the configured floor. Returns how many were restored.
    pub fn enforce_population_floor(&mut self) -> usize {
        let floor = self.config.min_population_size;
        if self.population.len() >= floor || self.unselected.is_empty() {
            return 0;
        }
        let needed = floor - self.population.len();
        let fitness_of = |d: &Design| {
            self.fitnesses
                .as_ref()
                .and_then(|f| f.fitness(d))
                .unwrap_or(f64::NEG_INFINITY)
        };
        let mut ranked: Vec<(DesignId, f64)> = self.unselected.iter().map(|d| (d.id(), fitness_of(d))).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let ids: HashSet<DesignId> = ranked.into_iter().take(needed).map(|(id, _)| id).collect();
        let restored = self.unselected.take_ids(&ids);
        let n = restored.len();
        self.population.extend(restored);
        log::warn!(
            "population fell below the minimum of {floor}; restored {n} designs (now {})",
            self.population.len()
        );
        self.current.restored += n;
        n
    }

    /// Moves every unselected design into the discard pool.
    pub fn discard_unselected(&mut self) -> usize {
        let leftovers = self.unselected.take_all();
        let n = leftovers.len();
        self.discards.checkout().extend(leftovers);
        self.current.discarded += n;
        n
    }

    /// Records the statistics of a finished generation.
    pub fn finish_generation(&mut self, generation: usize) {
        self.generation = generation;
        let values: Vec<f64> = match &self.fitnesses {
            Some(f) => self.population.iter().filter_map(|d| f.fitness(d)).collect(),
            None => Vec::new(),
        };
        let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = if values.is_empty() {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };

        let mut stats = std::mem::take(&mut self.current);
        stats.generation = generation;
        stats.population_size = self.population.len();
        stats.evaluations = self.evaluator.evaluations();
        stats.best_fitness = best;
        stats.average_fitness = average;
        log::info!(
            "generation {generation}: population {}, offspring {}, discards {}, best {best:.6}, average {average:.6}",
            stats.population_size,
            stats.offspring,
            self.discards.len()
        );
        self.fitness_history.push(best);
        self.stats.push(stats);
    }

    pub fn check_convergence(&mut self) -> bool {
        let Some(fitnesses) = self.fitnesses.as_ref() else {
            return false;
        };
        let mut ctx = context!(self);
        self.converger.check_convergence(&mut ctx, &self.population, fitnesses)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`GeneticAlgorithm`].
///
/// Operators not supplied explicitly are created from the registry by the
/// names in [`GaConfig`]. Every operator then polls the parameter database.
pub struct GeneticAlgorithmBuilder {
    target: Arc<DesignTarget>,
    config: GaConfig,
    params: ParameterDatabase,
    registry: Option<OperatorRegistry>,
    evaluator: Option<Box<dyn Evaluator>>,
    eval_fn: Option<EvalFn>,
    main_loop: Option<Box<dyn MainLoop>>,
    initializer: Option<Box<dyn Initializer>>,
    crosser: Option<Box<dyn Crosser>>,
    mutator: Option<Box<dyn Mutator>>,
    assessor: Option<Box<dyn FitnessAssessor>>,
    selector: Option<Box<dyn Selector>>,
    niche: Option<Box<dyn NichePressureApplicator>>,
    converger: Option<Box<dyn Converger>>,
}

impl GeneticAlgorithmBuilder {
    fn new(target: Arc<DesignTarget>) -> Self {
        Self {
            target,
            config: GaConfig::default(),
            params: ParameterDatabase::new(),
            registry: None,
            evaluator: None,
            eval_fn: None,
            main_loop: None,
            initializer: None,
            crosser: None,
            mutator: None,
            assessor: None,
            selector: None,
            niche: None,
            converger: None,
        }
    }

    pub fn config(mut self, config: GaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn params(mut self, params: ParameterDatabase) -> Self {
        self.params = params;
        self
    }

    /// Uses `registry` instead of [`OperatorRegistry::standard`].
    pub fn registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    /// Evaluates with a closure over user-facing variable values.
    pub fn evaluate_with<F>(mut self, func: F) -> Self
    where
        F: Fn(&[f64]) -> Option<Evaluation> + Send + Sync + 'static,
    {
        self.eval_fn = Some(Box::new(func));
        self
    }

    pub fn main_loop(mut self, op: impl MainLoop + 'static) -> Self {
        self.main_loop = Some(Box::new(op));
        self
    }

    pub fn initializer(mut self, op: impl Initializer + 'static) -> Self {
        self.initializer = Some(Box::new(op));
        self
    }

    pub fn crosser(mut self, op: impl Crosser + 'static) -> Self {
        self.crosser = Some(Box::new(op));
        self
    }

    pub fn mutator(mut self, op: impl Mutator + 'static) -> Self {
        self.mutator = Some(Box::new(op));
        self
    }

    pub fn fitness_assessor(mut self, op: impl FitnessAssessor + 'static) -> Self {
        self.assessor = Some(Box::new(op));
        self
    }

    pub fn selector(mut self, op: impl Selector + 'static) -> Self {
        self.selector = Some(Box::new(op));
        self
    }

    pub fn niche_pressure_applicator(mut self, op: impl NichePressureApplicator + 'static) -> Self {
        self.niche = Some(Box::new(op));
        self
    }

    pub fn converger(mut self, op: impl Converger + 'static) -> Self {
        self.converger = Some(Box::new(op));
        self
    }

    pub fn build(self) -> Result<GeneticAlgorithm, ConfigError> {
        let params = self.params;
        let mut config = self.config;
        config.poll_for_parameters(&params)?;
        config.validate()?;
        let registry = self.registry.unwrap_or_else(OperatorRegistry::standard);

        let mut main_loop = match self.main_loop {
            Some(op) => op,
            None => registry.create_main_loop(&config.main_loop)?,
        };
        let mut initializer = match self.initializer {
            Some(op) => op,
            None => registry.create_initializer(&config.initializer)?,
        };
        let mut crosser = match self.crosser {
            Some(op) => op,
            None => registry.create_crosser(&config.crosser)?,
        };
        let mut mutator = match self.mutator {
            Some(op) => op,
            None => registry.create_mutator(&config.mutator)?,
        };
        let mut assessor = match self.assessor {
            Some(op) => op,
            None => registry.create_fitness_assessor(&config.fitness_assessor)?,
        };
        let mut selector = match self.selector {
            Some(op) => op,
            None => registry.create_selector(&config.selector)?,
        };
        let mut niche = match self.niche {
            Some(op) => op,
            None => registry.create_niche_pressure_applicator(&config.niche_pressure_applicator)?,
        };
        let mut converger = match self.converger {
            Some(op) => op,
            None => registry.create_converger(&config.converger)?,
        };

        main_loop.poll_for_parameters(&params)?;
        initializer.poll_for_parameters(&params)?;
        crosser.poll_for_parameters(&params)?;
        mutator.poll_for_parameters(&params)?;
        assessor.poll_for_parameters(&params)?;
        selector.poll_for_parameters(&params)?;
        niche.poll_for_parameters(&params)?;
        converger.poll_for_parameters(&params)?;

        let evaluator: Box<dyn Evaluator> = match (self.evaluator, self.eval_fn) {
            (Some(e), _) => e,
            (None, Some(f)) => Box::new(FnEvaluator::new(f).with_parallel(config.parallel)),
            (None, None) => {
                log::error!("no evaluator configured");
                return Err(ConfigError::Invalid("an evaluator is required".into()));
            }
        };

        let rng = create_rng(config.seed.unwrap_or_else(rand::random));
        log::debug!(
            "built GA: {} / {} / {} / {} / {} / {} / {} / {}",
            main_loop.name(),
            initializer.name(),
            crosser.name(),
            mutator.name(),
            assessor.name(),
            selector.name(),
            niche.name(),
            converger.name()
        );

        Ok(GeneticAlgorithm {
            target: self.target,
            config,
            rng,
            main_loop: Some(main_loop),
            initializer,
            crosser,
            mutator,
            assessor,
            selector,
            niche,
            converger,
            evaluator,
            population: DesignGroup::new(),
            offspring: DesignGroup::new(),
            unselected: DesignGroup::new(),
            discards: Arc::new(DiscardPool::new()),
            fitnesses: None,
            initialized: false,
            generation: 0,
            current: GenerationStats::default(),
            stats: Vec::new(),
            fitness_history: Vec::new(),
        })
    }
}
