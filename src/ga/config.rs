//! GA configuration.
//!
//! [`GaConfig`] names the operator used for every stage of the loop and
//! carries the few settings that belong to the algorithm itself rather than
//! to an operator. Operator tunables (rates, sizes, limits) live in the
//! [`ParameterDatabase`] and are read by each operator.

use crate::error::ConfigError;
use crate::params::{tags, ParameterDatabase};

/// Configuration for a [`GeneticAlgorithm`](super::GeneticAlgorithm).
///
/// # Defaults
///
/// ```
/// use u_evolve::ga::GaConfig;
///
/// let config = GaConfig::default();
/// assert_eq!(config.fitness_assessor, "domination_count");
/// assert_eq!(config.selector, "below_limit");
/// assert_eq!(config.min_population_size, 2);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_evolve::ga::GaConfig;
///
/// let config = GaConfig::soga()
///     .with_crosser("multi_point_real")
///     .with_mutator("offset_normal")
///     .with_min_population_size(10)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaConfig {
    pub main_loop: String,
    pub initializer: String,
    pub crosser: String,
    pub mutator: String,
    pub fitness_assessor: String,
    pub selector: String,
    pub niche_pressure_applicator: String,
    pub converger: String,

    /// Floor below which selection and niching may not shrink the population.
    ///
    /// When they would, the best unselected designs are put back.
    pub min_population_size: usize,

    /// Whether closure evaluators run with rayon (`parallel` feature).
    pub parallel: bool,

    /// Random seed for reproducibility.
    ///
    /// `None` uses a random seed.
    pub seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self::moga()
    }
}

impl GaConfig {
    /// Multi-objective preset: Pareto domination count fitness with
    /// below-limit selection.
    pub fn moga() -> Self {
        Self {
            main_loop: "standard".into(),
            initializer: "unique_random".into(),
            crosser: "shuffle_random".into(),
            mutator: "replace_uniform".into(),
            fitness_assessor: "domination_count".into(),
            selector: "below_limit".into(),
            niche_pressure_applicator: "null_niching".into(),
            converger: "max_generations".into(),
            min_population_size: 2,
            parallel: false,
            seed: None,
        }
    }

    /// Single-objective preset: merit function fitness with elitist
    /// selection, stopping when the average fitness stalls.
    pub fn soga() -> Self {
        Self {
            fitness_assessor: "merit_function".into(),
            selector: "elitist".into(),
            converger: "average_fitness_tracker".into(),
            ..Self::moga()
        }
    }

    pub fn with_main_loop(mut self, name: impl Into<String>) -> Self {
        self.main_loop = name.into();
        self
    }

    pub fn with_initializer(mut self, name: impl Into<String>) -> Self {
        self.initializer = name.into();
        self
    }

    pub fn with_crosser(mut self, name: impl Into<String>) -> Self {
        self.crosser = name.into();
        self
    }

    pub fn with_mutator(mut self, name: impl Into<String>) -> Self {
        self.mutator = name.into();
        self
    }

    pub fn with_fitness_assessor(mut self, name: impl Into<String>) -> Self {
        self.fitness_assessor = name.into();
        self
    }

    pub fn with_selector(mut self, name: impl Into<String>) -> Self {
        self.selector = name.into();
        self
    }

    pub fn with_niche_pressure_applicator(mut self, name: impl Into<String>) -> Self {
        self.niche_pressure_applicator = name.into();
        self
    }

    pub fn with_converger(mut self, name: impl Into<String>) -> Self {
        self.converger = name.into();
        self
    }

    /// Sets the population floor.
    pub fn with_min_population_size(mut self, n: usize) -> Self {
        self.min_population_size = n;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn names(&self) -> [(&'static str, &str); 8] {
        [
            ("main_loop", &self.main_loop),
            ("initializer", &self.initializer),
            ("crosser", &self.crosser),
            ("mutator", &self.mutator),
            ("fitness_assessor", &self.fitness_assessor),
            ("selector", &self.selector),
            ("niche_pressure_applicator", &self.niche_pressure_applicator),
            ("converger", &self.converger),
        ]
    }

    /// Validates the configuration.
    ///
    /// Operator names are only checked for presence here; unknown names are
    /// reported when the algorithm is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in self.names() {
            if name.trim().is_empty() {
                log::error!("GaConfig: no {field} configured");
                return Err(ConfigError::Invalid(format!("{field} name must not be empty")));
            }
        }
        if self.min_population_size == 0 {
            log::error!("GaConfig: min_population_size must be at least 1");
            return Err(ConfigError::Invalid("min_population_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Overrides operator names and the seed from the well-known tags.
    pub fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        let slots: [(&str, &mut String); 8] = [
            (tags::MAIN_LOOP_TYPE, &mut self.main_loop),
            (tags::INITIALIZATION_TYPE, &mut self.initializer),
            (tags::CROSSOVER_TYPE, &mut self.crosser),
            (tags::MUTATION_TYPE, &mut self.mutator),
            (tags::FITNESS_TYPE, &mut self.fitness_assessor),
            (tags::REPLACEMENT_TYPE, &mut self.selector),
            (tags::NICHING_TYPE, &mut self.niche_pressure_applicator),
            (tags::CONVERGENCE_TYPE, &mut self.converger),
        ];
        for (tag, slot) in slots {
            if let Some(name) = db.get_string(tag)? {
                *slot = name.to_string();
            }
        }
        if let Some(seed) = db.get_int(tags::RANDOM_SEED)? {
            if seed < 0 {
                log::error!("parameter `{}` = {seed} must be non-negative", tags::RANDOM_SEED);
                return Err(ConfigError::out_of_range(tags::RANDOM_SEED, "must be non-negative"));
            }
            self.seed = Some(seed as u64);
        }
        log::debug!("GaConfig after polling: {self:?}");
        Ok(())
    }
}
