//! Main loops.
//!
//! A main loop drives one generation of a [`GeneticAlgorithm`] by calling
//! its step methods in order and owns the generation counter.
//!
//! [`StandardMainLoop`] runs the state machine
//!
//! ```text
//! Idle -> Vary -> Evaluate -> PreSelect -> AssessFitness -> Select
//!      -> NichePressure -> CheckConverged -> Idle | Terminated
//! ```
//!
//! Generation 0 starts at `PreSelect`: the initial population was already
//! evaluated by [`GeneticAlgorithm::initialize`]. Invalid and unscored
//! offspring are flushed before fitness assessment so they never compete
//! for survival.

use super::algorithm::GeneticAlgorithm;
use super::operators::{GeneticAlgorithmOperator, OperatorKind};
use crate::error::EvolveError;

/// Drives generations.
pub trait MainLoop: GeneticAlgorithmOperator {
    /// Runs one generation. Returns `Ok(true)` to continue and `Ok(false)`
    /// once the search has converged.
    fn run_generation(&mut self, ga: &mut GeneticAlgorithm) -> Result<bool, EvolveError>;

    /// Generations completed so far.
    fn generation(&self) -> usize;

    fn clone_box(&self) -> Box<dyn MainLoop>;
}

/// Stage of the standard generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Vary,
    Evaluate,
    PreSelect,
    AssessFitness,
    Select,
    NichePressure,
    CheckConverged,
    Terminated,
}

/// The standard generational loop.
#[derive(Debug)]
pub struct StandardMainLoop {
    generation: usize,
    state: LoopState,
}

impl Default for StandardMainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardMainLoop {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        log::trace!("generation {}: {:?} -> {:?}", self.generation, self.state, next);
        self.state = next;
    }
}

impl GeneticAlgorithmOperator for StandardMainLoop {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn description(&self) -> &'static str {
        "Vary, evaluate, assess, select and niche once per generation."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::MainLoop
    }
}

impl MainLoop for StandardMainLoop {
    fn run_generation(&mut self, ga: &mut GeneticAlgorithm) -> Result<bool, EvolveError> {
        if self.state == LoopState::Terminated {
            return Ok(false);
        }
        ga.begin_generation();
        ga.invalidate_fitness();
        let first = if self.generation == 0 {
            LoopState::PreSelect
        } else {
            LoopState::Vary
        };
        self.transition(first);

        loop {
            match self.state {
                LoopState::Vary => {
                    ga.do_crossover();
                    ga.do_mutation();
                    ga.validate_offspring();
                    ga.test_offspring_for_clones();
                    self.transition(LoopState::Evaluate);
                }
                LoopState::Evaluate => {
                    ga.evaluate_offspring();
                    ga.absorb_injections();
                    self.transition(LoopState::PreSelect);
                }
                LoopState::PreSelect => {
                    ga.pre_selection();
                    self.transition(LoopState::AssessFitness);
                }
                LoopState::AssessFitness => {
                    ga.assess_fitness();
                    self.transition(LoopState::Select);
                }
                LoopState::Select => {
                    ga.select();
                    self.transition(LoopState::NichePressure);
                }
                LoopState::NichePressure => {
                    ga.apply_niche_pressure();
                    ga.enforce_population_floor();
                    ga.discard_unselected();
                    self.transition(LoopState::CheckConverged);
                }
                LoopState::CheckConverged => {
                    self.generation += 1;
                    ga.finish_generation(self.generation);
                    if ga.check_convergence() {
                        log::info!("converged after {} generations", self.generation);
                        self.transition(LoopState::Terminated);
                        return Ok(false);
                    }
                    self.transition(LoopState::Idle);
                    return Ok(true);
                }
                LoopState::Idle | LoopState::Terminated => return Ok(self.state == LoopState::Idle),
            }
        }
    }

    fn generation(&self) -> usize {
        self.generation
    }

    fn clone_box(&self) -> Box<dyn MainLoop> {
        Box::new(StandardMainLoop::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignGroup;
    use crate::ga::operators::{
        Crosser, ElitistSelector, Evaluation, MaxGenerationsConverger, MeritFunctionAssessor,
        NullMutator, OperatorContext,
    };
    use crate::ga::GaConfig;
    use crate::params::{tags, ParameterDatabase};
    use crate::space::{DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};
    use std::sync::Arc;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn two_objective_target() -> Arc<DesignTarget> {
        DesignTarget::builder()
            .variable(DesignVariableInfo::continuous("x", 0.0, 1.0).with_precision(6))
            .variable(DesignVariableInfo::continuous("y", 0.0, 1.0).with_precision(6))
            .objective(ObjectiveFunctionInfo::minimize("f1"))
            .objective(ObjectiveFunctionInfo::minimize("f2"))
            .build()
            .unwrap()
    }

    fn schaffer(x: &[f64]) -> Option<Evaluation> {
        Some(Evaluation::new(vec![x[0] * x[0] + x[1], (x[0] - 1.0).powi(2) + x[1]]))
    }

    // ---- state machine ----

    #[test]
    fn test_end_to_end_scenario() {
        init_logger();
        let params = ParameterDatabase::new()
            .with(tags::POPULATION_SIZE, 10_i64)
            .with(tags::CROSSOVER_RATE, 0.8)
            .with(tags::MUTATION_RATE, 0.1);
        let mut ga = GeneticAlgorithm::builder(two_objective_target())
            .config(GaConfig::moga().with_min_population_size(10).with_seed(2024))
            .params(params)
            .fitness_assessor(MeritFunctionAssessor::default())
            .selector(ElitistSelector)
            .converger(MaxGenerationsConverger::new(5))
            .evaluate_with(schaffer)
            .build()
            .unwrap();

        ga.initialize().unwrap();
        assert_eq!(ga.population().len(), 10);

        let mut keep_going = true;
        let mut generations = 0;
        while keep_going {
            keep_going = ga.run_generation().unwrap();
            generations += 1;
            assert!(ga.population().len() >= 10, "population shrank below the floor");
            assert!(generations <= 5, "ran past the convergence criterion");
        }
        assert_eq!(generations, 5);
        assert_eq!(ga.generation(), 5);

        let history: Vec<f64> = ga.stats().iter().map(|s| s.best_fitness).collect();
        assert_eq!(history.len(), 5);
        for w in history.windows(2) {
            assert!(w[1] >= w[0], "best fitness decreased: {history:?}");
        }
        assert!(!ga.run_generation().unwrap());
        assert_eq!(ga.generation(), 5);
    }

    #[test]
    fn test_generation_zero_skips_variation() {
        let mut ga = GeneticAlgorithm::builder(two_objective_target())
            .config(GaConfig::moga().with_seed(1))
            .params(ParameterDatabase::new().with(tags::POPULATION_SIZE, 8_i64))
            .evaluate_with(schaffer)
            .build()
            .unwrap();
        ga.initialize().unwrap();
        let before = ga.evaluations();
        assert!(ga.run_generation().unwrap());
        let first = &ga.stats()[0];
        assert_eq!(first.generation, 1);
        assert_eq!(first.offspring, 0);
        assert_eq!(ga.evaluations(), before);

        ga.run_generation().unwrap();
        assert!(ga.stats()[1].offspring > 0);
    }

    #[test]
    fn test_clone_box_starts_fresh() {
        let mut ml = StandardMainLoop::new();
        ml.generation = 4;
        ml.state = LoopState::Terminated;
        assert_eq!(ml.clone_box().generation(), 0);
        assert_eq!(ml.state(), LoopState::Terminated);
    }

    // ---- illconditioned flush accounting ----

    /// Copies every parent; poisons the first `bad` copies.
    #[derive(Debug, Clone)]
    struct PoisoningCrosser {
        bad: usize,
    }

    impl GeneticAlgorithmOperator for PoisoningCrosser {
        fn name(&self) -> &'static str {
            "poisoning"
        }

        fn description(&self) -> &'static str {
            "Copies parents, some with unrepairable variables."
        }

        fn kind(&self) -> OperatorKind {
            OperatorKind::Crosser
        }
    }

    impl Crosser for PoisoningCrosser {
        fn crossover(&mut self, _ctx: &mut OperatorContext<'_>, from: &DesignGroup, into: &mut DesignGroup) {
            for (i, parent) in from.iter().enumerate() {
                let mut child = parent.clone();
                if i < self.bad {
                    child.set_variable_rep(0, f64::NAN);
                } else {
                    child.set_variable_rep(0, (parent.variable_rep(0) + 0.25) % 1.0);
                }
                into.insert(child);
            }
        }

        fn rate(&self) -> f64 {
            1.0
        }

        fn can_produce_invalid_variable_values(&self) -> bool {
            true
        }

        fn clone_box(&self) -> Box<dyn Crosser> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn test_illconditioned_flush_accounting() {
        init_logger();
        let mut ga = GeneticAlgorithm::builder(two_objective_target())
            .config(GaConfig::moga().with_seed(9))
            .params(ParameterDatabase::new().with(tags::POPULATION_SIZE, 10_i64))
            .crosser(PoisoningCrosser { bad: 3 })
            .mutator(NullMutator)
            .evaluate_with(schaffer)
            .build()
            .unwrap();
        ga.initialize().unwrap();
        ga.run_generation().unwrap();

        ga.begin_generation();
        let n = ga.do_crossover();
        assert_eq!(n, ga.population().len());
        let flushed = ga.validate_offspring();
        assert_eq!(flushed, 3);
        assert_eq!(ga.offspring().len(), n - 3);
        assert_eq!(ga.current_stats().invalid_flushed, 3);
        assert!(ga.offspring().iter().all(|d| !d.is_illconditioned()));
    }

    #[test]
    fn test_unscored_offspring_are_flushed() {
        init_logger();
        let mut ga = GeneticAlgorithm::builder(two_objective_target())
            .config(GaConfig::moga().with_seed(11))
            .params(ParameterDatabase::new().with(tags::POPULATION_SIZE, 12_i64))
            .crosser(PoisoningCrosser { bad: 0 })
            .mutator(NullMutator)
            .evaluate_with(|x: &[f64]| if x[0] < 0.75 { schaffer(x) } else { None })
            .build()
            .unwrap();
        ga.initialize().unwrap();
        assert!(ga.population().iter().all(|d| d.is_evaluated()));
        for _ in 0..4 {
            ga.run_generation().unwrap();
            assert!(ga.population().iter().all(|d| d.is_evaluated() && !d.is_illconditioned()));
        }
        let flushed: usize = ga.stats().iter().map(|s| s.illconditioned_flushed).sum();
        assert!(flushed > 0, "no offspring landed in the rejected region");
        assert!(ga.discards().checkout().iter().all(|d| !d.is_illconditioned()));
    }
}
