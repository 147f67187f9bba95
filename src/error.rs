//! Error types.
//!
//! Two classes of failure exist in the engine:
//!
//! - **Configuration errors** ([`ConfigError`]): bad parameter values,
//!   unknown operator names, malformed design spaces. These are logged at
//!   `error!` where they are detected and returned to the caller, which is
//!   expected to abort the run.
//! - **Per-design problems** never surface as errors. A design that cannot
//!   be evaluated or repaired is marked illconditioned and flushed by the
//!   main loop.
//!
//! Programming errors (mixing designs of different targets, tagging a
//! design as its own clone) are assertions, not error values.

use crate::ga::operators::OperatorKind;

/// Configuration and parameter extraction errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("parameter `{tag}` has the wrong type: expected {expected}")]
    WrongType { tag: String, expected: &'static str },

    #[error("parameter `{tag}` is out of range: {reason}")]
    OutOfRange { tag: String, reason: String },

    #[error("parameter `{tag}` must not be empty")]
    EmptyVector { tag: String },

    #[error("unknown {kind} `{name}`")]
    UnknownOperator { kind: OperatorKind, name: String },

    #[error("design space must have at least one variable")]
    NoVariables,

    #[error("design space must have at least one objective")]
    NoObjectives,

    #[error("invalid variable `{label}`: {reason}")]
    InvalidVariable { label: String, reason: String },

    #[error("invalid constraint `{label}`: {reason}")]
    InvalidConstraint { label: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Shorthand for an [`OutOfRange`](ConfigError::OutOfRange) error.
    pub fn out_of_range(tag: &str, reason: impl Into<String>) -> Self {
        ConfigError::OutOfRange {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced while building or running an algorithm.
#[derive(Debug, thiserror::Error)]
pub enum EvolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("algorithm must be initialized before running generations")]
    NotInitialized,

    #[error("initial population is empty after flushing illconditioned designs")]
    EmptyPopulation,

    #[error("a generation is already running on this algorithm")]
    GenerationInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ConfigError::out_of_range("method.crossover_rate", "must be in [0, 1]");
        assert_eq!(
            err.to_string(),
            "parameter `method.crossover_rate` is out of range: must be in [0, 1]"
        );

        let err = ConfigError::UnknownOperator {
            kind: OperatorKind::Crosser,
            name: "bogus".into(),
        };
        assert_eq!(err.to_string(), "unknown Crosser `bogus`");
    }

    #[test]
    fn test_config_error_converts() {
        let err: EvolveError = ConfigError::NoObjectives.into();
        assert!(matches!(err, EvolveError::Config(ConfigError::NoObjectives)));
        assert_eq!(err.to_string(), "design space must have at least one objective");
    }
}
