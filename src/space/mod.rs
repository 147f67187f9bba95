//! Design-space metadata.
//!
//! Variables, objectives and constraints of one problem, and the shared
//! [`DesignTarget`] that owns them and mints designs.

mod constraint;
mod objective;
mod target;
mod variable;

pub use constraint::{ConstraintInfo, ConstraintKind};
pub use objective::{ObjectiveFunctionInfo, ObjectiveSense};
pub use target::{DesignTarget, DesignTargetBuilder, DisposeHook};
pub use variable::{DesignVariableInfo, VariableNature, DEFAULT_PRECISION};
