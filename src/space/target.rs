//! The design target: shared design-space context.
//!
//! A [`DesignTarget`] owns the metadata of one optimization problem
//! (variables, objectives, constraints) together with the state every
//! design of that problem shares:
//!
//! - the design id counter (atomic, so many algorithm instances may mint
//!   designs concurrently)
//! - the [`CloneRegistry`] holding all clone rings
//! - an optional [`DisposeHook`] notified whenever a design is released
//! - a metadata revision counter, bumped whenever variable bounds or
//!   precision change, so cached encodings can detect staleness
//!
//! Targets are shared through `Arc`; every [`Design`] keeps a reference to
//! the target that created it. Designs are never owned by the target.

use super::constraint::ConstraintInfo;
use super::objective::ObjectiveFunctionInfo;
use super::variable::DesignVariableInfo;
use crate::design::{CloneRegistry, Design, DesignId};
use crate::error::ConfigError;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

/// Callback invoked when a design is released.
pub trait DisposeHook: Send + Sync {
    fn on_dispose(&self, design: &Design);
}

/// Shared context for all designs of one problem.
pub struct DesignTarget {
    variables: RwLock<Vec<DesignVariableInfo>>,
    objectives: Vec<ObjectiveFunctionInfo>,
    constraints: Vec<ConstraintInfo>,
    ndv: usize,
    revision: AtomicU64,
    next_id: AtomicU64,
    clones: Mutex<CloneRegistry>,
    dispose_hook: RwLock<Option<Arc<dyn DisposeHook>>>,
}

impl fmt::Debug for DesignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignTarget")
            .field("ndv", &self.ndv)
            .field("nof", &self.objectives.len())
            .field("ncn", &self.constraints.len())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

/// Builder for [`DesignTarget`].
#[derive(Debug, Default, Clone)]
pub struct DesignTargetBuilder {
    variables: Vec<DesignVariableInfo>,
    objectives: Vec<ObjectiveFunctionInfo>,
    constraints: Vec<ConstraintInfo>,
}

impl DesignTargetBuilder {
    pub fn variable(mut self, info: DesignVariableInfo) -> Self {
        self.variables.push(info);
        self
    }

    pub fn objective(mut self, info: ObjectiveFunctionInfo) -> Self {
        self.objectives.push(info);
        self
    }

    pub fn constraint(mut self, info: ConstraintInfo) -> Self {
        self.constraints.push(info);
        self
    }

    /// Validates the metadata and creates the shared target.
    pub fn build(self) -> Result<Arc<DesignTarget>, ConfigError> {
        if self.variables.is_empty() {
            log::error!("design target has no variables");
            return Err(ConfigError::NoVariables);
        }
        if self.objectives.is_empty() {
            log::error!("design target has no objectives");
            return Err(ConfigError::NoObjectives);
        }
        for v in &self.variables {
            v.validate().inspect_err(|e| log::error!("{e}"))?;
        }
        for c in &self.constraints {
            c.validate().inspect_err(|e| log::error!("{e}"))?;
        }
        Ok(Arc::new(DesignTarget {
            ndv: self.variables.len(),
            variables: RwLock::new(self.variables),
            objectives: self.objectives,
            constraints: self.constraints,
            revision: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            clones: Mutex::new(CloneRegistry::new()),
            dispose_hook: RwLock::new(None),
        }))
    }
}

impl DesignTarget {
    pub fn builder() -> DesignTargetBuilder {
        DesignTargetBuilder::default()
    }

    /// Number of design variables.
    pub fn ndv(&self) -> usize {
        self.ndv
    }

    /// Number of objective functions.
    pub fn nof(&self) -> usize {
        self.objectives.len()
    }

    /// Number of constraints.
    pub fn ncn(&self) -> usize {
        self.constraints.len()
    }

    /// Read access to the variable metadata.
    pub fn variables(&self) -> RwLockReadGuard<'_, Vec<DesignVariableInfo>> {
        self.variables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn objectives(&self) -> &[ObjectiveFunctionInfo] {
        &self.objectives
    }

    pub fn constraints(&self) -> &[ConstraintInfo] {
        &self.constraints
    }

    /// Metadata revision. Changes whenever variable bounds or precision do.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Replaces the bounds of variable `index`.
    pub fn set_variable_bounds(&self, index: usize, lower: f64, upper: f64) -> Result<(), ConfigError> {
        let mut vars = self.variables.write().unwrap_or_else(PoisonError::into_inner);
        let var = vars.get_mut(index).ok_or_else(|| {
            ConfigError::Invalid(format!("variable index {index} out of range"))
        })?;
        var.set_bounds(lower, upper)?;
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Replaces the decimal precision of variable `index`.
    pub fn set_variable_precision(&self, index: usize, precision: i32) -> Result<(), ConfigError> {
        let mut vars = self.variables.write().unwrap_or_else(PoisonError::into_inner);
        let var = vars.get_mut(index).ok_or_else(|| {
            ConfigError::Invalid(format!("variable index {index} out of range"))
        })?;
        var.set_precision(precision)?;
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Installs (or clears) the dispose hook.
    pub fn set_dispose_hook(&self, hook: Option<Arc<dyn DisposeHook>>) {
        *self.dispose_hook.write().unwrap_or_else(PoisonError::into_inner) = hook;
    }

    // ------------------------------------------------------------------
    // Design factory
    // ------------------------------------------------------------------

    /// Creates a blank design sized for this target.
    pub fn new_design(self: &Arc<Self>) -> Design {
        Design::new(Arc::clone(self))
    }

    /// Creates a design with uniformly random variable representations.
    pub fn random_design<R: Rng>(self: &Arc<Self>, rng: &mut R) -> Design {
        let mut design = self.new_design();
        let vars = self.variables();
        for (i, v) in vars.iter().enumerate() {
            design.set_variable_rep(i, v.random_rep(rng));
        }
        design
    }

    /// Creates a design from user-facing variable values.
    ///
    /// # Panics
    /// Panics if `values.len() != ndv`.
    pub fn design_from_values(self: &Arc<Self>, values: &[f64]) -> Design {
        assert_eq!(values.len(), self.ndv, "variable count mismatch");
        let mut design = self.new_design();
        let vars = self.variables();
        for (i, (v, &value)) in vars.iter().zip(values).enumerate() {
            design.set_variable_rep(i, v.rep_of(value));
        }
        design
    }

    pub(crate) fn next_id(&self) -> DesignId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn clones(&self) -> MutexGuard<'_, CloneRegistry> {
        self.clones.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases a design: notifies the hook and unlinks it from its ring.
    pub(crate) fn dispose(&self, design: &Design) {
        let hook = self
            .dispose_hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook.on_dispose(design);
        }
        self.clones().detach(design.id());
    }

    // ------------------------------------------------------------------
    // Design validation
    // ------------------------------------------------------------------

    /// User-facing variable values of a design.
    pub fn variable_values(&self, design: &Design) -> Vec<f64> {
        let vars = self.variables();
        vars.iter()
            .zip(design.variables())
            .map(|(v, &rep)| v.value_of(rep))
            .collect()
    }

    /// Whether every variable representation is legal.
    pub fn variables_in_bounds(&self, design: &Design) -> bool {
        let vars = self.variables();
        vars.iter()
            .zip(design.variables())
            .all(|(v, &rep)| v.is_valid_rep(rep))
    }

    /// Repairs out-of-bounds variable representations in place.
    ///
    /// Returns `false` if some representation cannot be repaired; the
    /// design is left unchanged in that case.
    pub fn repair_variables(&self, design: &mut Design) -> bool {
        let repaired: Option<Vec<f64>> = {
            let vars = self.variables();
            vars.iter()
                .zip(design.variables())
                .map(|(v, &rep)| {
                    if v.is_valid_rep(rep) {
                        Some(rep)
                    } else {
                        v.repair_rep(rep)
                    }
                })
                .collect()
        };
        match repaired {
            Some(reps) => {
                for (i, rep) in reps.into_iter().enumerate() {
                    design.set_variable_rep(i, rep);
                }
                true
            }
            None => false,
        }
    }

    /// Sum of all constraint violations of an evaluated design.
    pub fn total_violation(&self, design: &Design) -> f64 {
        self.constraints
            .iter()
            .zip(design.constraints())
            .map(|(c, &g)| c.violation(g))
            .sum()
    }

    /// Recomputes the feasibility attribute of a design.
    pub fn update_feasibility(&self, design: &mut Design) {
        let feasible = self.variables_in_bounds(design) && self.total_violation(design) == 0.0;
        design.set_feasible(feasible);
    }

    /// Minimization-adjusted objective values of a design.
    pub fn adjusted_objectives(&self, design: &Design) -> Vec<f64> {
        self.objectives
            .iter()
            .zip(design.objectives())
            .map(|(o, &f)| o.adjusted(f))
            .collect()
    }
}
