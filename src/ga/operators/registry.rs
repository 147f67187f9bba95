//! Name-keyed operator constructors.
//!
//! [`OperatorRegistry::standard`] knows every operator shipped with the
//! crate. Callers may register their own constructors under new names and
//! refer to them from [`GaConfig`](crate::ga::GaConfig) or the parameter
//! database like any built-in operator.

use super::{
    AverageFitnessTracker, BelowLimitSelector, BestFitnessTracker, BitRandomMutator, Converger,
    Crosser, DominationCountAssessor, ElitistSelector, ExplicitInitializer, FitnessAssessor,
    Initializer, LayerRankAssessor, MaxGenerationsConverger, MeritFunctionAssessor,
    MultiPointBinaryCrosser, MultiPointRealCrosser, Mutator, NichePressureApplicator,
    NullCrosser, NullMutator, NullNichePressureApplicator, OffsetMutator, OperatorKind,
    RadialNichePressureApplicator, ReplaceUniformMutator, RouletteWheelSelector, Selector,
    ShuffleRandomCrosser, UniqueRandomInitializer,
};
use crate::error::ConfigError;
use crate::ga::{MainLoop, StandardMainLoop};
use std::collections::BTreeMap;

/// Constructors for every operator kind, keyed by name.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    main_loops: BTreeMap<&'static str, fn() -> Box<dyn MainLoop>>,
    initializers: BTreeMap<&'static str, fn() -> Box<dyn Initializer>>,
    crossers: BTreeMap<&'static str, fn() -> Box<dyn Crosser>>,
    mutators: BTreeMap<&'static str, fn() -> Box<dyn Mutator>>,
    assessors: BTreeMap<&'static str, fn() -> Box<dyn FitnessAssessor>>,
    selectors: BTreeMap<&'static str, fn() -> Box<dyn Selector>>,
    nichers: BTreeMap<&'static str, fn() -> Box<dyn NichePressureApplicator>>,
    convergers: BTreeMap<&'static str, fn() -> Box<dyn Converger>>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("main_loops", &self.main_loops.keys().collect::<Vec<_>>())
            .field("initializers", &self.initializers.keys().collect::<Vec<_>>())
            .field("crossers", &self.crossers.keys().collect::<Vec<_>>())
            .field("mutators", &self.mutators.keys().collect::<Vec<_>>())
            .field("assessors", &self.assessors.keys().collect::<Vec<_>>())
            .field("selectors", &self.selectors.keys().collect::<Vec<_>>())
            .field("nichers", &self.nichers.keys().collect::<Vec<_>>())
            .field("convergers", &self.convergers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn lookup<T: ?Sized>(
    table: &BTreeMap<&'static str, fn() -> Box<T>>,
    kind: OperatorKind,
    name: &str,
) -> Result<Box<T>, ConfigError> {
    match table.get(name) {
        Some(create) => Ok(create()),
        None => {
            log::error!("no {kind} named `{name}` is registered");
            Err(ConfigError::UnknownOperator {
                kind,
                name: name.to_string(),
            })
        }
    }
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in operator.
    pub fn standard() -> Self {
        let mut r = Self::new();

        r.register_main_loop("standard", || -> Box<dyn MainLoop> { Box::new(StandardMainLoop::new()) });

        r.register_initializer("unique_random", || -> Box<dyn Initializer> {
            Box::new(UniqueRandomInitializer::default())
        });
        r.register_initializer("explicit", || -> Box<dyn Initializer> {
            Box::new(ExplicitInitializer::default())
        });

        r.register_crosser("null_crossover", || -> Box<dyn Crosser> { Box::new(NullCrosser) });
        r.register_crosser("multi_point_binary", || -> Box<dyn Crosser> {
            Box::new(MultiPointBinaryCrosser::default())
        });
        r.register_crosser("multi_point_real", || -> Box<dyn Crosser> {
            Box::new(MultiPointRealCrosser::default())
        });
        r.register_crosser("shuffle_random", || -> Box<dyn Crosser> {
            Box::new(ShuffleRandomCrosser::default())
        });

        r.register_mutator("null_mutation", || -> Box<dyn Mutator> { Box::new(NullMutator) });
        r.register_mutator("bit_random", || -> Box<dyn Mutator> { Box::new(BitRandomMutator::default()) });
        r.register_mutator("replace_uniform", || -> Box<dyn Mutator> {
            Box::new(ReplaceUniformMutator::default())
        });
        r.register_mutator("offset_normal", || -> Box<dyn Mutator> { Box::new(OffsetMutator::normal()) });
        r.register_mutator("offset_cauchy", || -> Box<dyn Mutator> { Box::new(OffsetMutator::cauchy()) });
        r.register_mutator("offset_uniform", || -> Box<dyn Mutator> { Box::new(OffsetMutator::uniform()) });

        r.register_fitness_assessor("layer_rank", || -> Box<dyn FitnessAssessor> {
            Box::new(LayerRankAssessor)
        });
        r.register_fitness_assessor("domination_count", || -> Box<dyn FitnessAssessor> {
            Box::new(DominationCountAssessor)
        });
        r.register_fitness_assessor("merit_function", || -> Box<dyn FitnessAssessor> {
            Box::new(MeritFunctionAssessor::default())
        });

        r.register_selector("elitist", || -> Box<dyn Selector> { Box::new(ElitistSelector) });
        r.register_selector("roulette_wheel", || -> Box<dyn Selector> { Box::new(RouletteWheelSelector) });
        r.register_selector("below_limit", || -> Box<dyn Selector> {
            Box::new(BelowLimitSelector::default())
        });

        r.register_niche_pressure_applicator("null_niching", || -> Box<dyn NichePressureApplicator> {
            Box::new(NullNichePressureApplicator)
        });
        r.register_niche_pressure_applicator("radial", || -> Box<dyn NichePressureApplicator> {
            Box::new(RadialNichePressureApplicator::default())
        });

        r.register_converger("max_generations", || -> Box<dyn Converger> {
            Box::new(MaxGenerationsConverger::default())
        });
        r.register_converger("best_fitness_tracker", || -> Box<dyn Converger> {
            Box::new(BestFitnessTracker::default())
        });
        r.register_converger("average_fitness_tracker", || -> Box<dyn Converger> {
            Box::new(AverageFitnessTracker::default())
        });

        r
    }

    // ---- registration ----

    pub fn register_main_loop(&mut self, name: &'static str, create: fn() -> Box<dyn MainLoop>) {
        self.main_loops.insert(name, create);
    }

    pub fn register_initializer(&mut self, name: &'static str, create: fn() -> Box<dyn Initializer>) {
        self.initializers.insert(name, create);
    }

    pub fn register_crosser(&mut self, name: &'static str, create: fn() -> Box<dyn Crosser>) {
        self.crossers.insert(name, create);
    }

    pub fn register_mutator(&mut self, name: &'static str, create: fn() -> Box<dyn Mutator>) {
        self.mutators.insert(name, create);
    }

    pub fn register_fitness_assessor(&mut self, name: &'static str, create: fn() -> Box<dyn FitnessAssessor>) {
        self.assessors.insert(name, create);
    }

    pub fn register_selector(&mut self, name: &'static str, create: fn() -> Box<dyn Selector>) {
        self.selectors.insert(name, create);
    }

    pub fn register_niche_pressure_applicator(
        &mut self,
        name: &'static str,
        create: fn() -> Box<dyn NichePressureApplicator>,
    ) {
        self.nichers.insert(name, create);
    }

    pub fn register_converger(&mut self, name: &'static str, create: fn() -> Box<dyn Converger>) {
        self.convergers.insert(name, create);
    }

    // ---- creation ----

    pub fn create_main_loop(&self, name: &str) -> Result<Box<dyn MainLoop>, ConfigError> {
        lookup(&self.main_loops, OperatorKind::MainLoop, name)
    }

    pub fn create_initializer(&self, name: &str) -> Result<Box<dyn Initializer>, ConfigError> {
        lookup(&self.initializers, OperatorKind::Initializer, name)
    }

    pub fn create_crosser(&self, name: &str) -> Result<Box<dyn Crosser>, ConfigError> {
        lookup(&self.crossers, OperatorKind::Crosser, name)
    }

    pub fn create_mutator(&self, name: &str) -> Result<Box<dyn Mutator>, ConfigError> {
        lookup(&self.mutators, OperatorKind::Mutator, name)
    }

    pub fn create_fitness_assessor(&self, name: &str) -> Result<Box<dyn FitnessAssessor>, ConfigError> {
        lookup(&self.assessors, OperatorKind::FitnessAssessor, name)
    }

    pub fn create_selector(&self, name: &str) -> Result<Box<dyn Selector>, ConfigError> {
        lookup(&self.selectors, OperatorKind::Selector, name)
    }

    pub fn create_niche_pressure_applicator(
        &self,
        name: &str,
    ) -> Result<Box<dyn NichePressureApplicator>, ConfigError> {
        lookup(&self.nichers, OperatorKind::NichePressureApplicator, name)
    }

    pub fn create_converger(&self, name: &str) -> Result<Box<dyn Converger>, ConfigError> {
        lookup(&self.convergers, OperatorKind::Converger, name)
    }

    /// Registered names of one operator kind, in sorted order.
    pub fn names(&self, kind: OperatorKind) -> Vec<&'static str> {
        match kind {
            OperatorKind::MainLoop => self.main_loops.keys().copied().collect(),
            OperatorKind::Initializer => self.initializers.keys().copied().collect(),
            OperatorKind::Crosser => self.crossers.keys().copied().collect(),
            OperatorKind::Mutator => self.mutators.keys().copied().collect(),
            OperatorKind::FitnessAssessor => self.assessors.keys().copied().collect(),
            OperatorKind::Selector => self.selectors.keys().copied().collect(),
            OperatorKind::NichePressureApplicator => self.nichers.keys().copied().collect(),
            OperatorKind::Converger => self.convergers.keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::operators::GeneticAlgorithmOperator;

    #[test]
    fn test_registered_names_match_operator_names() {
        let r = OperatorRegistry::standard();
        for name in r.names(OperatorKind::Crosser) {
            assert_eq!(r.create_crosser(name).unwrap().name(), name);
        }
        for name in r.names(OperatorKind::Mutator) {
            assert_eq!(r.create_mutator(name).unwrap().name(), name);
        }
        for name in r.names(OperatorKind::FitnessAssessor) {
            assert_eq!(r.create_fitness_assessor(name).unwrap().name(), name);
        }
        for name in r.names(OperatorKind::Selector) {
            assert_eq!(r.create_selector(name).unwrap().name(), name);
        }
        for name in r.names(OperatorKind::NichePressureApplicator) {
            assert_eq!(r.create_niche_pressure_applicator(name).unwrap().name(), name);
        }
        for name in r.names(OperatorKind::Converger) {
            assert_eq!(r.create_converger(name).unwrap().name(), name);
        }
        for name in r.names(OperatorKind::Initializer) {
            assert_eq!(r.create_initializer(name).unwrap().name(), name);
        }
        assert_eq!(r.create_main_loop("standard").unwrap().name(), "standard");
    }

    #[test]
    fn test_kinds_are_reported() {
        let r = OperatorRegistry::standard();
        assert_eq!(r.create_selector("elitist").unwrap().kind(), OperatorKind::Selector);
        assert_eq!(r.create_converger("max_generations").unwrap().kind(), OperatorKind::Converger);
    }

    #[test]
    fn test_unknown_name() {
        let r = OperatorRegistry::standard();
        let err = r.create_mutator("gaussian_blur").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownOperator {
                kind: OperatorKind::Mutator,
                name: "gaussian_blur".into(),
            }
        );
        assert_eq!(err.to_string(), "unknown Mutator `gaussian_blur`");
    }

    #[test]
    fn test_custom_registration() {
        let mut r = OperatorRegistry::new();
        assert!(r.create_crosser("null_crossover").is_err());
        r.register_crosser("null_crossover", || -> Box<dyn Crosser> { Box::new(NullCrosser) });
        assert!(r.create_crosser("null_crossover").is_ok());
        assert_eq!(r.names(OperatorKind::Crosser), vec!["null_crossover"]);
    }
}
