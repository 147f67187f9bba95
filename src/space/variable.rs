//! Design variable metadata.
//!
//! A variable has a user-facing *value* and an internal *representation*.
//! Operators only ever manipulate representations:
//!
//! | Nature       | Representation                   | Value                    |
//! |--------------|----------------------------------|--------------------------|
//! | `Continuous` | the value, rounded to precision  | same                     |
//! | `Integer`    | the value                        | same                     |
//! | `Discrete`   | index into the allowed values    | `values[index]`          |
//! | `Boolean`    | `0.0` or `1.0`                   | same                     |

use crate::error::ConfigError;
use rand::Rng;

/// Kind and domain of a design variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableNature {
    /// Real value in `[lower, upper]`.
    Continuous { lower: f64, upper: f64 },
    /// Whole number in `[lower, upper]`.
    Integer { lower: i64, upper: i64 },
    /// One of an explicit, sorted set of values.
    Discrete { values: Vec<f64> },
    /// `false`/`true`, represented as `0.0`/`1.0`.
    Boolean,
}

/// Metadata for one design variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesignVariableInfo {
    label: String,
    nature: VariableNature,
    /// Decimal places kept for continuous variables. Ignored otherwise.
    precision: i32,
}

/// Default number of decimal places for continuous variables.
pub const DEFAULT_PRECISION: i32 = 6;

impl DesignVariableInfo {
    /// Continuous variable with the default precision.
    pub fn continuous(label: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            label: label.into(),
            nature: VariableNature::Continuous { lower, upper },
            precision: DEFAULT_PRECISION,
        }
    }

    /// Integer variable.
    pub fn integer(label: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self {
            label: label.into(),
            nature: VariableNature::Integer { lower, upper },
            precision: 0,
        }
    }

    /// Discrete variable over the given values. Values are sorted and
    /// deduplicated on construction.
    pub fn discrete(label: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        let mut values = values.into();
        values.sort_by(f64::total_cmp);
        values.dedup();
        Self {
            label: label.into(),
            nature: VariableNature::Discrete { values },
            precision: 0,
        }
    }

    /// Boolean variable.
    pub fn boolean(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            nature: VariableNature::Boolean,
            precision: 0,
        }
    }

    /// Sets the decimal precision (continuous variables only).
    pub fn with_precision(mut self, precision: i32) -> Self {
        if matches!(self.nature, VariableNature::Continuous { .. }) {
            self.precision = precision;
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn nature(&self) -> &VariableNature {
        &self.nature
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    /// Checks the metadata is self-consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidVariable {
            label: self.label.clone(),
            reason,
        };
        match &self.nature {
            VariableNature::Continuous { lower, upper } => {
                if !lower.is_finite() || !upper.is_finite() {
                    return Err(invalid("bounds must be finite".into()));
                }
                if lower > upper {
                    return Err(invalid(format!("lower bound {lower} exceeds upper bound {upper}")));
                }
                if !(0..=15).contains(&self.precision) {
                    return Err(invalid(format!("precision {} must lie in 0..=15", self.precision)));
                }
            }
            VariableNature::Integer { lower, upper } => {
                if lower > upper {
                    return Err(invalid(format!("lower bound {lower} exceeds upper bound {upper}")));
                }
            }
            VariableNature::Discrete { values } => {
                if values.is_empty() {
                    return Err(invalid("discrete value set is empty".into()));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(invalid("discrete values must be finite".into()));
                }
            }
            VariableNature::Boolean => {}
        }
        Ok(())
    }

    /// Replaces the bounds of a continuous or integer variable.
    pub(crate) fn set_bounds(&mut self, lower: f64, upper: f64) -> Result<(), ConfigError> {
        let previous = self.nature.clone();
        match &mut self.nature {
            VariableNature::Continuous { lower: lo, upper: hi } => {
                *lo = lower;
                *hi = upper;
            }
            VariableNature::Integer { lower: lo, upper: hi } => {
                *lo = lower.ceil() as i64;
                *hi = upper.floor() as i64;
            }
            _ => {
                return Err(ConfigError::InvalidVariable {
                    label: self.label.clone(),
                    reason: "only continuous and integer variables have adjustable bounds".into(),
                })
            }
        }
        if let Err(e) = self.validate() {
            self.nature = previous;
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn set_precision(&mut self, precision: i32) -> Result<(), ConfigError> {
        let previous = self.precision;
        self.precision = precision;
        if let Err(e) = self.validate() {
            self.precision = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Smallest legal representation.
    pub fn min_rep(&self) -> f64 {
        match &self.nature {
            VariableNature::Continuous { lower, .. } => *lower,
            VariableNature::Integer { lower, .. } => *lower as f64,
            VariableNature::Discrete { .. } | VariableNature::Boolean => 0.0,
        }
    }

    /// Largest legal representation.
    pub fn max_rep(&self) -> f64 {
        match &self.nature {
            VariableNature::Continuous { upper, .. } => *upper,
            VariableNature::Integer { upper, .. } => *upper as f64,
            VariableNature::Discrete { values } => (values.len() - 1) as f64,
            VariableNature::Boolean => 1.0,
        }
    }

    /// Width of the representation range.
    pub fn rep_range(&self) -> f64 {
        self.max_rep() - self.min_rep()
    }

    /// Decimal places that matter in the representation.
    pub fn rep_precision(&self) -> i32 {
        match self.nature {
            VariableNature::Continuous { .. } => self.precision,
            _ => 0,
        }
    }

    /// Draws a uniformly random legal representation.
    pub fn random_rep<R: Rng>(&self, rng: &mut R) -> f64 {
        match &self.nature {
            VariableNature::Continuous { lower, upper } => {
                if upper > lower {
                    self.round_to_precision(rng.random_range(*lower..=*upper))
                        .clamp(*lower, *upper)
                } else {
                    *lower
                }
            }
            VariableNature::Integer { lower, upper } => rng.random_range(*lower..=*upper) as f64,
            VariableNature::Discrete { values } => rng.random_range(0..values.len()) as f64,
            VariableNature::Boolean => {
                if rng.random_bool(0.5) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Converts a representation into the user-facing value.
    ///
    /// Out-of-range discrete indices are clamped.
    pub fn value_of(&self, rep: f64) -> f64 {
        match &self.nature {
            VariableNature::Discrete { values } => {
                let idx = rep.round().clamp(0.0, (values.len() - 1) as f64) as usize;
                values[idx]
            }
            _ => rep,
        }
    }

    /// Converts a user-facing value into a representation.
    ///
    /// Discrete values map to the index of the nearest allowed value.
    pub fn rep_of(&self, value: f64) -> f64 {
        match &self.nature {
            VariableNature::Discrete { values } => {
                let idx = values
                    .iter()
                    .enumerate()
                    .min_by(|a, b| (a.1 - value).abs().total_cmp(&(b.1 - value).abs()))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                idx as f64
            }
            VariableNature::Boolean => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            VariableNature::Integer { .. } => value.round(),
            VariableNature::Continuous { .. } => self.round_to_precision(value),
        }
    }

    /// Whether `rep` is a legal representation as-is.
    pub fn is_valid_rep(&self, rep: f64) -> bool {
        rep.is_finite()
            && rep >= self.min_rep()
            && rep <= self.max_rep()
            && (self.rep_precision() > 0 || rep.fract() == 0.0)
    }

    /// Brings `rep` into the legal domain by clamping and rounding.
    ///
    /// Returns `None` when the value cannot be repaired (non-finite).
    pub fn repair_rep(&self, rep: f64) -> Option<f64> {
        if !rep.is_finite() {
            return None;
        }
        let clamped = rep.clamp(self.min_rep(), self.max_rep());
        let repaired = match self.nature {
            VariableNature::Continuous { .. } => {
                self.round_to_precision(clamped).clamp(self.min_rep(), self.max_rep())
            }
            _ => clamped.round(),
        };
        Some(repaired)
    }

    fn round_to_precision(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.precision);
        (value * scale).round() / scale
    }
}
