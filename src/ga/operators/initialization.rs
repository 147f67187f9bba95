//! Initializers.
//!
//! - [`UniqueRandomInitializer`]: random designs, no two alike
//! - [`ExplicitInitializer`]: caller-supplied starting points, optionally
//!   topped up with unique random designs

use super::{GeneticAlgorithmOperator, Initializer, OperatorContext, OperatorKind};
use crate::design::DesignGroup;
use crate::error::ConfigError;
use crate::params::{poll_size_at_least, tags, ParameterDatabase};
use std::collections::HashSet;

/// Attempts per requested design before giving up on uniqueness.
const ATTEMPTS_PER_DESIGN: usize = 100;

fn variable_key(reps: &[f64]) -> Vec<u64> {
    reps.iter().map(|r| r.to_bits()).collect()
}

/// Adds unique random designs to `into` until it holds `size` designs.
fn fill_unique_random(ctx: &mut OperatorContext<'_>, into: &mut DesignGroup, size: usize) {
    let mut seen: HashSet<Vec<u64>> = into.iter().map(|d| variable_key(d.variables())).collect();
    let wanted = size.saturating_sub(into.len());
    let mut attempts = wanted * ATTEMPTS_PER_DESIGN;
    while into.len() < size && attempts > 0 {
        attempts -= 1;
        let design = ctx.target.random_design(ctx.rng);
        if seen.insert(variable_key(design.variables())) {
            into.insert(design);
        }
    }
    if into.len() < size {
        log::warn!(
            "could only create {} unique designs of the {} requested",
            into.len(),
            size
        );
    }
}

// ============================================================================
// Unique random
// ============================================================================

/// Creates `size` random designs with pairwise distinct variables.
#[derive(Debug, Clone)]
pub struct UniqueRandomInitializer {
    size: usize,
}

impl Default for UniqueRandomInitializer {
    fn default() -> Self {
        Self { size: 50 }
    }
}

impl UniqueRandomInitializer {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl GeneticAlgorithmOperator for UniqueRandomInitializer {
    fn name(&self) -> &'static str {
        "unique_random"
    }

    fn description(&self) -> &'static str {
        "Creates a population of unique, uniformly random designs."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Initializer
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        self.size = poll_size_at_least(db, tags::POPULATION_SIZE, self.size, 1)?;
        log::debug!("{}: size = {}", self.name(), self.size);
        Ok(())
    }
}

impl Initializer for UniqueRandomInitializer {
    fn initialize(&mut self, ctx: &mut OperatorContext<'_>, into: &mut DesignGroup) {
        fill_unique_random(ctx, into, into.len() + self.size);
    }

    fn clone_box(&self) -> Box<dyn Initializer> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Explicit points
// ============================================================================

/// Starts from caller-supplied points given as user-facing variable values.
///
/// When a population size is configured and exceeds the number of points,
/// the remainder is filled with unique random designs.
#[derive(Debug, Clone, Default)]
pub struct ExplicitInitializer {
    points: Vec<Vec<f64>>,
    size: Option<usize>,
}

impl ExplicitInitializer {
    pub fn new(points: Vec<Vec<f64>>) -> Self {
        Self { points, size: None }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

impl GeneticAlgorithmOperator for ExplicitInitializer {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn description(&self) -> &'static str {
        "Starts from explicitly supplied points, topped up with random designs."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Initializer
    }

    fn poll_for_parameters(&mut self, db: &ParameterDatabase) -> Result<(), ConfigError> {
        if let Some(points) = db.get_matrix(tags::INITIAL_POINTS)? {
            self.points = points.to_vec();
        }
        if self.points.is_empty() {
            log::error!("{}: `{}` must hold at least one point", self.name(), tags::INITIAL_POINTS);
            return Err(ConfigError::EmptyVector {
                tag: tags::INITIAL_POINTS.to_string(),
            });
        }
        if let Some(size) = db.get_size(tags::POPULATION_SIZE)? {
            self.size = Some(size);
        }
        log::debug!(
            "{}: {} points, size = {:?}",
            self.name(),
            self.points.len(),
            self.size
        );
        Ok(())
    }
}

impl Initializer for ExplicitInitializer {
    fn initialize(&mut self, ctx: &mut OperatorContext<'_>, into: &mut DesignGroup) {
        let ndv = ctx.target.ndv();
        let mut skipped = 0;
        for point in &self.points {
            if point.len() != ndv {
                skipped += 1;
                continue;
            }
            into.insert(ctx.target.design_from_values(point));
        }
        if skipped > 0 {
            log::warn!("{}: skipped {skipped} points without {ndv} values", self.name());
        }
        if let Some(size) = self.size {
            fill_unique_random(ctx, into, size);
        }
    }

    fn clone_box(&self) -> Box<dyn Initializer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{rng, two_var_target};
    use super::*;
    use crate::space::{DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};

    #[test]
    fn test_unique_random_size_and_uniqueness() {
        let t = two_var_target();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 0, evaluations: 0 };
        let mut pop = DesignGroup::new();
        UniqueRandomInitializer::new(30).initialize(&mut ctx, &mut pop);
        assert_eq!(pop.len(), 30);
        assert_eq!(pop.test_within_list_for_clones(), 0);
        assert!(pop.iter().all(|d| t.variables_in_bounds(d)));
    }

    #[test]
    fn test_unique_random_small_space() {
        // Only four distinct designs exist.
        let t = DesignTarget::builder()
            .variable(DesignVariableInfo::boolean("a"))
            .variable(DesignVariableInfo::boolean("b"))
            .objective(ObjectiveFunctionInfo::minimize("f"))
            .build()
            .unwrap();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 0, evaluations: 0 };
        let mut pop = DesignGroup::new();
        UniqueRandomInitializer::new(10).initialize(&mut ctx, &mut pop);
        assert_eq!(pop.len(), 4);
    }

    #[test]
    fn test_poll_size() {
        let mut init = UniqueRandomInitializer::default();
        let db = ParameterDatabase::new().with(tags::POPULATION_SIZE, 12_i64);
        init.poll_for_parameters(&db).unwrap();
        assert_eq!(init.size(), 12);

        let db = ParameterDatabase::new().with(tags::POPULATION_SIZE, 0_i64);
        assert!(init.poll_for_parameters(&db).is_err());
    }

    #[test]
    fn test_explicit_points_and_top_up() {
        let t = two_var_target();
        let mut r = rng();
        let mut ctx = OperatorContext { target: &t, rng: &mut r, generation: 0, evaluations: 0 };
        let mut init = ExplicitInitializer::new(vec![vec![0.1, 0.2], vec![0.5], vec![0.3, 0.4]])
            .with_size(6);
        let mut pop = DesignGroup::new();
        init.initialize(&mut ctx, &mut pop);
        assert_eq!(pop.len(), 6);
        assert_eq!(pop.get(0).unwrap().variables(), &[0.1, 0.2]);
        assert_eq!(pop.get(1).unwrap().variables(), &[0.3, 0.4]);
    }

    #[test]
    fn test_explicit_requires_points() {
        let mut init = ExplicitInitializer::default();
        let err = init.poll_for_parameters(&ParameterDatabase::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyVector { .. }));

        let db = ParameterDatabase::new().with(tags::INITIAL_POINTS, vec![vec![0.5, 0.5]]);
        init.poll_for_parameters(&db).unwrap();
    }
}
