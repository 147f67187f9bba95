//! Constraint metadata.

use crate::error::ConfigError;

/// Form of a constraint on a response value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintKind {
    /// `lower <= g <= upper`. Use infinities for one-sided constraints.
    Inequality { lower: f64, upper: f64 },
    /// `|g - target| <= tolerance`.
    Equality { target: f64, tolerance: f64 },
}

/// Metadata for one constraint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintInfo {
    label: String,
    kind: ConstraintKind,
}

impl ConstraintInfo {
    /// `g <= upper`.
    pub fn at_most(label: impl Into<String>, upper: f64) -> Self {
        Self::between(label, f64::NEG_INFINITY, upper)
    }

    /// `g >= lower`.
    pub fn at_least(label: impl Into<String>, lower: f64) -> Self {
        Self::between(label, lower, f64::INFINITY)
    }

    /// `lower <= g <= upper`.
    pub fn between(label: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            label: label.into(),
            kind: ConstraintKind::Inequality { lower, upper },
        }
    }

    /// `|g - target| <= tolerance`.
    pub fn equal_to(label: impl Into<String>, target: f64, tolerance: f64) -> Self {
        Self {
            label: label.into(),
            kind: ConstraintKind::Equality { target, tolerance },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidConstraint {
            label: self.label.clone(),
            reason: reason.to_string(),
        };
        match self.kind {
            ConstraintKind::Inequality { lower, upper } => {
                if lower.is_nan() || upper.is_nan() {
                    return Err(invalid("bounds must not be NaN"));
                }
                if lower > upper {
                    return Err(invalid("lower bound exceeds upper bound"));
                }
            }
            ConstraintKind::Equality { target, tolerance } => {
                if !target.is_finite() {
                    return Err(invalid("target must be finite"));
                }
                if tolerance.is_nan() || tolerance < 0.0 {
                    return Err(invalid("tolerance must be non-negative"));
                }
            }
        }
        Ok(())
    }

    /// Amount by which `value` violates the constraint (0 when satisfied).
    ///
    /// A NaN response is treated as an infinite violation.
    pub fn violation(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::INFINITY;
        }
        match self.kind {
            ConstraintKind::Inequality { lower, upper } => {
                if value < lower {
                    lower - value
                } else if value > upper {
                    value - upper
                } else {
                    0.0
                }
            }
            ConstraintKind::Equality { target, tolerance } => {
                ((value - target).abs() - tolerance).max(0.0)
            }
        }
    }

    pub fn is_satisfied(&self, value: f64) -> bool {
        self.violation(value) == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inequality_violation() {
        let c = ConstraintInfo::at_most("g", 1.0);
        assert_eq!(c.violation(0.5), 0.0);
        assert_eq!(c.violation(1.5), 0.5);
        assert!(c.is_satisfied(1.0));

        let c = ConstraintInfo::between("g", -1.0, 1.0);
        assert_eq!(c.violation(-3.0), 2.0);
    }

    #[test]
    fn test_equality_violation() {
        let c = ConstraintInfo::equal_to("h", 2.0, 0.1);
        assert_eq!(c.violation(2.05), 0.0);
        assert!((c.violation(2.5) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_nan_is_infinite_violation() {
        assert!(ConstraintInfo::at_least("g", 0.0).violation(f64::NAN).is_infinite());
    }

    #[test]
    fn test_validate() {
        assert!(ConstraintInfo::between("g", 2.0, 1.0).validate().is_err());
        assert!(ConstraintInfo::equal_to("h", 0.0, -1.0).validate().is_err());
        assert!(ConstraintInfo::at_most("g", 3.0).validate().is_ok());
    }
}
