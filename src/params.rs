//! Typed, tag-keyed parameter store.
//!
//! [`ParameterDatabase`] is the configuration source every operator reads
//! its tunables from during `poll_for_parameters`. Values are stored under
//! string tags (see [`tags`]) and retrieved through typed accessors.
//!
//! Accessors return `Ok(None)` for missing tags, leaving the operator's
//! default in place, and `Err` when the tag exists but holds a value of the
//! wrong type or one that does not fit the requested width.
//!
//! # Examples
//!
//! ```
//! use u_evolve::params::{tags, ParameterDatabase};
//!
//! let db = ParameterDatabase::new()
//!     .with(tags::CROSSOVER_RATE, 0.8)
//!     .with(tags::POPULATION_SIZE, 50_i64);
//!
//! assert_eq!(db.get_double(tags::CROSSOVER_RATE).unwrap(), Some(0.8));
//! assert_eq!(db.get_size(tags::POPULATION_SIZE).unwrap(), Some(50));
//! assert_eq!(db.get_double(tags::MUTATION_RATE).unwrap(), None);
//! ```

use crate::error::ConfigError;
use std::collections::BTreeMap;

/// Well-known parameter tags.
pub mod tags {
    pub const POPULATION_SIZE: &str = "method.population_size";
    pub const RANDOM_SEED: &str = "method.random_seed";
    pub const INITIAL_POINTS: &str = "method.jega.initial_points";

    pub const CROSSOVER_RATE: &str = "method.crossover_rate";
    pub const NUM_CROSS_POINTS: &str = "method.jega.num_cross_points";
    pub const NUM_PARENTS: &str = "method.jega.num_parents";
    pub const NUM_OFFSPRING: &str = "method.jega.num_offspring";

    pub const MUTATION_RATE: &str = "method.mutation_rate";
    pub const MUTATION_SCALE: &str = "method.mutation_scale";

    pub const WEIGHTS: &str = "method.jega.weights";
    pub const CONSTRAINT_PENALTY: &str = "method.jega.constraint_penalty";

    pub const FITNESS_LIMIT: &str = "method.jega.fitness_limit";
    pub const SHRINKAGE_PERCENTAGE: &str = "method.jega.shrinkage_percentage";

    pub const NICHE_VECTOR: &str = "method.jega.niche_vector";
    pub const CACHE_NICHED_DESIGNS: &str = "method.jega.cache_niched_designs";

    pub const MAX_GENERATIONS: &str = "method.max_iterations";
    pub const MAX_EVALUATIONS: &str = "method.max_function_evaluations";
    pub const PERCENT_CHANGE: &str = "method.jega.percent_change";
    pub const NUM_GENERATIONS: &str = "method.jega.num_generations";

    pub const INITIALIZATION_TYPE: &str = "method.initialization_type";
    pub const CROSSOVER_TYPE: &str = "method.crossover_type";
    pub const MUTATION_TYPE: &str = "method.mutation_type";
    pub const FITNESS_TYPE: &str = "method.fitness_type";
    pub const REPLACEMENT_TYPE: &str = "method.replacement_type";
    pub const NICHING_TYPE: &str = "method.jega.niching_type";
    pub const CONVERGENCE_TYPE: &str = "method.jega.convergence_type";
    pub const MAIN_LOOP_TYPE: &str = "method.jega.main_loop_type";
}

/// A single stored parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "integer",
            ParamValue::Double(_) => "double",
            ParamValue::Text(_) => "string",
            ParamValue::Vector(_) => "vector",
            ParamValue::Matrix(_) => "matrix",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Double(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::Vector(v)
    }
}

impl From<Vec<Vec<f64>>> for ParamValue {
    fn from(v: Vec<Vec<f64>>) -> Self {
        ParamValue::Matrix(v)
    }
}

/// String-keyed store of typed parameters.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterDatabase {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, returning the database for chaining.
    pub fn with(mut self, tag: &str, value: impl Into<ParamValue>) -> Self {
        self.set(tag, value);
        self
    }

    /// Stores a value, replacing any previous one under the same tag.
    pub fn set(&mut self, tag: &str, value: impl Into<ParamValue>) {
        self.values.insert(tag.to_string(), value.into());
    }

    /// Removes a value.
    pub fn remove(&mut self, tag: &str) -> Option<ParamValue> {
        self.values.remove(tag)
    }

    /// Raw access to a stored value.
    pub fn get(&self, tag: &str) -> Option<&ParamValue> {
        self.values.get(tag)
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the database holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_int_param(&self, tag: &str) -> bool {
        matches!(self.values.get(tag), Some(ParamValue::Int(_)))
    }

    pub fn has_double_param(&self, tag: &str) -> bool {
        matches!(
            self.values.get(tag),
            Some(ParamValue::Double(_)) | Some(ParamValue::Int(_))
        )
    }

    pub fn has_bool_param(&self, tag: &str) -> bool {
        matches!(self.values.get(tag), Some(ParamValue::Bool(_)))
    }

    pub fn has_string_param(&self, tag: &str) -> bool {
        matches!(self.values.get(tag), Some(ParamValue::Text(_)))
    }

    pub fn has_vector_param(&self, tag: &str) -> bool {
        matches!(self.values.get(tag), Some(ParamValue::Vector(_)))
    }

    pub fn has_matrix_param(&self, tag: &str) -> bool {
        matches!(self.values.get(tag), Some(ParamValue::Matrix(_)))
    }

    /// Reads a 64-bit integer.
    pub fn get_int(&self, tag: &str) -> Result<Option<i64>, ConfigError> {
        match self.values.get(tag) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_type(tag, "integer", other)),
        }
    }

    /// Reads an integer that must fit in 16 bits.
    pub fn get_short(&self, tag: &str) -> Result<Option<i16>, ConfigError> {
        self.get_int(tag)?
            .map(|v| {
                i16::try_from(v)
                    .map_err(|_| ConfigError::out_of_range(tag, format!("{v} does not fit a short")))
            })
            .transpose()
    }

    /// Reads a non-negative integer as a size.
    pub fn get_size(&self, tag: &str) -> Result<Option<usize>, ConfigError> {
        self.get_int(tag)?
            .map(|v| {
                usize::try_from(v)
                    .map_err(|_| ConfigError::out_of_range(tag, format!("{v} is not a valid size")))
            })
            .transpose()
    }

    /// Reads a double. Integers are widened.
    pub fn get_double(&self, tag: &str) -> Result<Option<f64>, ConfigError> {
        match self.values.get(tag) {
            None => Ok(None),
            Some(ParamValue::Double(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(wrong_type(tag, "double", other)),
        }
    }

    pub fn get_bool(&self, tag: &str) -> Result<Option<bool>, ConfigError> {
        match self.values.get(tag) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_type(tag, "bool", other)),
        }
    }

    pub fn get_string(&self, tag: &str) -> Result<Option<&str>, ConfigError> {
        match self.values.get(tag) {
            None => Ok(None),
            Some(ParamValue::Text(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(wrong_type(tag, "string", other)),
        }
    }

    pub fn get_vector(&self, tag: &str) -> Result<Option<&[f64]>, ConfigError> {
        match self.values.get(tag) {
            None => Ok(None),
            Some(ParamValue::Vector(v)) => Ok(Some(v.as_slice())),
            Some(other) => Err(wrong_type(tag, "vector", other)),
        }
    }

    pub fn get_matrix(&self, tag: &str) -> Result<Option<&[Vec<f64>]>, ConfigError> {
        match self.values.get(tag) {
            None => Ok(None),
            Some(ParamValue::Matrix(v)) => Ok(Some(v.as_slice())),
            Some(other) => Err(wrong_type(tag, "matrix", other)),
        }
    }
}

fn wrong_type(tag: &str, expected: &'static str, found: &ParamValue) -> ConfigError {
    log::error!(
        "parameter `{tag}` holds a {} but a {expected} was requested",
        found.type_name()
    );
    ConfigError::WrongType {
        tag: tag.to_string(),
        expected,
    }
}

/// Reads a rate parameter and checks it lies in `[0, 1]`.
pub(crate) fn poll_rate(db: &ParameterDatabase, tag: &str, current: f64) -> Result<f64, ConfigError> {
    match db.get_double(tag)? {
        None => Ok(current),
        Some(v) if (0.0..=1.0).contains(&v) => Ok(v),
        Some(v) => {
            log::error!("parameter `{tag}` = {v} lies outside [0, 1]");
            Err(ConfigError::out_of_range(tag, format!("{v} must lie in [0, 1]")))
        }
    }
}

/// Reads a size parameter and checks it is at least `min`.
pub(crate) fn poll_size_at_least(
    db: &ParameterDatabase,
    tag: &str,
    current: usize,
    min: usize,
) -> Result<usize, ConfigError> {
    match db.get_size(tag)? {
        None => Ok(current),
        Some(v) if v >= min => Ok(v),
        Some(v) => {
            log::error!("parameter `{tag}` = {v} is below the minimum of {min}");
            Err(ConfigError::out_of_range(tag, format!("{v} must be at least {min}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_is_none() {
        let db = ParameterDatabase::new();
        assert_eq!(db.get_int("x").unwrap(), None);
        assert_eq!(db.get_vector("x").unwrap(), None);
        assert!(!db.has_int_param("x"));
        assert!(db.is_empty());
    }

    #[test]
    fn test_typed_access() {
        let db = ParameterDatabase::new()
            .with("i", 12_i64)
            .with("d", 0.5)
            .with("b", true)
            .with("s", "layer_rank")
            .with("v", vec![1.0, 2.0])
            .with("m", vec![vec![1.0], vec![2.0, 3.0]]);

        assert_eq!(db.get_int("i").unwrap(), Some(12));
        assert_eq!(db.get_short("i").unwrap(), Some(12));
        assert_eq!(db.get_size("i").unwrap(), Some(12));
        assert_eq!(db.get_double("d").unwrap(), Some(0.5));
        assert_eq!(db.get_bool("b").unwrap(), Some(true));
        assert_eq!(db.get_string("s").unwrap(), Some("layer_rank"));
        assert_eq!(db.get_vector("v").unwrap(), Some(&[1.0, 2.0][..]));
        assert_eq!(db.get_matrix("m").unwrap().map(|m| m.len()), Some(2));
        assert_eq!(db.len(), 6);
    }

    #[test]
    fn test_int_widens_to_double() {
        let db = ParameterDatabase::new().with("x", 3_i64);
        assert!(db.has_double_param("x"));
        assert_eq!(db.get_double("x").unwrap(), Some(3.0));
    }

    #[test]
    fn test_wrong_type_is_error() {
        let db = ParameterDatabase::new().with("x", "text");
        let err = db.get_int("x").unwrap_err();
        assert_eq!(
            err,
            ConfigError::WrongType {
                tag: "x".into(),
                expected: "integer"
            }
        );
    }

    #[test]
    fn test_width_checks() {
        let db = ParameterDatabase::new().with("big", 100_000_i64).with("neg", -1_i64);
        assert!(db.get_short("big").is_err());
        assert!(db.get_size("neg").is_err());
        assert_eq!(db.get_int("neg").unwrap(), Some(-1));
    }

    #[test]
    fn test_poll_rate() {
        let db = ParameterDatabase::new().with("ok", 0.3).with("bad", 1.5);
        assert_eq!(poll_rate(&db, "ok", 0.9).unwrap(), 0.3);
        assert_eq!(poll_rate(&db, "missing", 0.9).unwrap(), 0.9);
        assert!(poll_rate(&db, "bad", 0.9).is_err());
    }

    #[test]
    fn test_poll_size_at_least() {
        let db = ParameterDatabase::new().with("n", 1_i64);
        assert_eq!(poll_size_at_least(&db, "n", 5, 1).unwrap(), 1);
        assert!(poll_size_at_least(&db, "n", 5, 2).is_err());
        assert_eq!(poll_size_at_least(&db, "other", 5, 2).unwrap(), 5);
    }

    #[test]
    fn test_set_replaces() {
        let mut db = ParameterDatabase::new();
        db.set("x", 1_i64);
        db.set("x", 2_i64);
        assert_eq!(db.get_int("x").unwrap(), Some(2));
        assert_eq!(db.remove("x"), Some(ParamValue::Int(2)));
        assert!(db.get("x").is_none());
    }
}
