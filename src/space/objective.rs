//! Objective function metadata.

/// Direction of optimization for one objective.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
    /// Get as close as possible to a target value.
    Seek(f64),
}

/// Metadata for one objective.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectiveFunctionInfo {
    label: String,
    sense: ObjectiveSense,
}

impl ObjectiveFunctionInfo {
    pub fn minimize(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sense: ObjectiveSense::Minimize,
        }
    }

    pub fn maximize(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sense: ObjectiveSense::Maximize,
        }
    }

    pub fn seek(label: impl Into<String>, target: f64) -> Self {
        Self {
            label: label.into(),
            sense: ObjectiveSense::Seek(target),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Maps a raw objective value into minimization space.
    ///
    /// All comparisons in the engine (dominance, weighted sums, utopia
    /// points) happen on adjusted values, where smaller is always better.
    pub fn adjusted(&self, value: f64) -> f64 {
        match self.sense {
            ObjectiveSense::Minimize => value,
            ObjectiveSense::Maximize => -value,
            ObjectiveSense::Seek(target) => (value - target).abs(),
        }
    }

    /// Whether raw value `a` is preferred over raw value `b`.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        self.adjusted(a) < self.adjusted(b)
    }
}
