//! Operator framework.
//!
//! Every stage of a generation is a swappable strategy. Each operator kind
//! is a trait extending the common [`GeneticAlgorithmOperator`] contract:
//!
//! | Kind | Trait | Responsibility |
//! |------|-------|----------------|
//! | Initializer | [`Initializer`] | create the initial population |
//! | Crosser | [`Crosser`] | recombine parents into offspring |
//! | Mutator | [`Mutator`] | perturb copies of population members |
//! | FitnessAssessor | [`FitnessAssessor`] | map every design to a scalar fitness |
//! | Selector | [`Selector`] | choose the next population |
//! | NichePressureApplicator | [`NichePressureApplicator`] | thin the population for diversity |
//! | Converger | [`Converger`] | decide when to stop |
//! | MainLoop | [`MainLoop`](super::MainLoop) | drive one generation |
//!
//! Operators are owned by exactly one [`GeneticAlgorithm`](super::GeneticAlgorithm).
//! `clone_box` copies the tunables of an operator for a sibling algorithm;
//! transient state (histories, caches) is never copied.
//!
//! Operators read their tunables in
//! [`poll_for_parameters`](GeneticAlgorithmOperator::poll_for_parameters).
//! A misconfiguration is logged at `error!` and returned as
//! [`ConfigError`]; per-design problems are signalled by marking the design
//! illconditioned instead.

mod convergence;
mod crossover;
mod evaluation;
mod fitness;
mod initialization;
mod mutation;
mod niching;
mod registry;
mod selection;

pub use convergence::{AverageFitnessTracker, BestFitnessTracker, MaxGenerationsConverger};
pub use crossover::{MultiPointBinaryCrosser, MultiPointRealCrosser, NullCrosser, ShuffleRandomCrosser};
pub use evaluation::{record_evaluation, Evaluation, Evaluator, FnEvaluator, InjectionQueue};
pub use fitness::{DominationCountAssessor, LayerRankAssessor, MeritFunctionAssessor};
pub use initialization::{ExplicitInitializer, UniqueRandomInitializer};
pub use mutation::{
    BitRandomMutator, NullMutator, OffsetDistribution, OffsetMutator, ReplaceUniformMutator,
};
pub use niching::{NullNichePressureApplicator, RadialNichePressureApplicator};
pub use registry::OperatorRegistry;
pub use selection::{BelowLimitSelector, ElitistSelector, RouletteWheelSelector};

use crate::design::{Design, DesignGroup, DesignGroupVector, FitnessRecord};
use crate::error::ConfigError;
use crate::params::ParameterDatabase;
use crate::random::EvolveRng;
use crate::space::DesignTarget;
use std::fmt;
use std::sync::Arc;

/// Category of an operator, used for registry lookup and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    MainLoop,
    Initializer,
    Crosser,
    Mutator,
    FitnessAssessor,
    Selector,
    NichePressureApplicator,
    Converger,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorKind::MainLoop => "MainLoop",
            OperatorKind::Initializer => "Initializer",
            OperatorKind::Crosser => "Crosser",
            OperatorKind::Mutator => "Mutator",
            OperatorKind::FitnessAssessor => "FitnessAssessor",
            OperatorKind::Selector => "Selector",
            OperatorKind::NichePressureApplicator => "NichePressureApplicator",
            OperatorKind::Converger => "Converger",
        };
        f.write_str(name)
    }
}

/// Shared state handed to every operator call.
pub struct OperatorContext<'a> {
    pub target: &'a Arc<DesignTarget>,
    pub rng: &'a mut EvolveRng,
    /// Generations completed so far.
    pub generation: usize,
    /// Function evaluations performed so far.
    pub evaluations: usize,
}

/// Contract common to all operators.
pub trait GeneticAlgorithmOperator: fmt::Debug + Send {
    /// Registry name. Identity only; never affects behavior.
    fn name(&self) -> &'static str;

    /// One-line human-readable description.
    fn description(&self) -> &'static str;

    fn kind(&self) -> OperatorKind;

    /// Reads and validates tunables. Missing parameters keep their defaults.
    fn poll_for_parameters(&mut self, _db: &ParameterDatabase) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Creates the initial population.
pub trait Initializer: GeneticAlgorithmOperator {
    fn initialize(&mut self, ctx: &mut OperatorContext<'_>, into: &mut DesignGroup);

    fn clone_box(&self) -> Box<dyn Initializer>;
}

/// Recombines designs of `from` into new offspring in `into`.
///
/// Never modifies `from`.
pub trait Crosser: GeneticAlgorithmOperator {
    fn crossover(&mut self, ctx: &mut OperatorContext<'_>, from: &DesignGroup, into: &mut DesignGroup);

    /// Probability of crossover per parent group.
    fn rate(&self) -> f64;

    /// Whether offspring may carry out-of-domain variable values.
    fn can_produce_invalid_variable_values(&self) -> bool;

    fn clone_box(&self) -> Box<dyn Crosser>;
}

/// Perturbs copies of population members into `children`.
pub trait Mutator: GeneticAlgorithmOperator {
    fn mutate(&mut self, ctx: &mut OperatorContext<'_>, pop: &DesignGroup, children: &mut DesignGroup);

    /// Fraction of genes (or bits) mutated.
    fn rate(&self) -> f64;

    /// Whether mutants may carry out-of-domain variable values.
    fn can_produce_invalid_variable_values(&self) -> bool;

    fn clone_box(&self) -> Box<dyn Mutator>;
}

/// Assigns a fitness to every design of every supplied group.
///
/// Larger fitness is better.
pub trait FitnessAssessor: GeneticAlgorithmOperator {
    fn assess_fitness(&mut self, ctx: &mut OperatorContext<'_>, groups: &DesignGroupVector<'_>) -> FitnessRecord;

    fn clone_box(&self) -> Box<dyn FitnessAssessor>;
}

/// Chooses the next population.
pub trait Selector: GeneticAlgorithmOperator {
    /// Moves (or duplicates) designs from `from` into `into`.
    ///
    /// `count` is advisory. Designs left in `from` are the caller's to
    /// dispose of.
    fn select(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        from: &mut [&mut DesignGroup],
        into: &mut DesignGroup,
        count: usize,
        fitnesses: &FitnessRecord,
    );

    /// Whether one design may occupy several slots of the next population.
    fn can_select_same_design_more_than_once(&self) -> bool;

    /// Hook run before fitness assessment of a generation.
    fn pre_select(&mut self, _ctx: &mut OperatorContext<'_>, _pop: &mut DesignGroup) {}

    fn clone_box(&self) -> Box<dyn Selector>;
}

/// Thins a selected population to preserve diversity.
pub trait NichePressureApplicator: GeneticAlgorithmOperator {
    /// Removes crowded designs from `pop` and returns the ones the operator
    /// does not keep for itself.
    fn apply_niche_pressure(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        pop: &mut DesignGroup,
        fitnesses: &FitnessRecord,
    ) -> Vec<Design>;

    /// Hook run before fitness assessment; may reinsert cached designs.
    fn pre_selection(&mut self, _ctx: &mut OperatorContext<'_>, _pop: &mut DesignGroup) {}

    /// Hands back any designs still held by the operator.
    fn take_cached(&mut self) -> Vec<Design> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn NichePressureApplicator>;
}

/// Decides when the search has converged.
pub trait Converger: GeneticAlgorithmOperator {
    fn check_convergence(
        &mut self,
        ctx: &mut OperatorContext<'_>,
        group: &DesignGroup,
        fitnesses: &FitnessRecord,
    ) -> bool;

    fn clone_box(&self) -> Box<dyn Converger>;
}

/// Index of the design with the best fitness in a group, if any is rated.
pub(crate) fn best_index(group: &DesignGroup, fitnesses: &FitnessRecord) -> Option<usize> {
    group
        .iter()
        .enumerate()
        .filter_map(|(i, d)| fitnesses.fitness(d).map(|f| (i, f)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::random::{create_rng, EvolveRng};
    use crate::space::{ConstraintInfo, DesignTarget, DesignVariableInfo, ObjectiveFunctionInfo};
    use std::sync::Arc;

    pub fn two_var_target() -> Arc<DesignTarget> {
        DesignTarget::builder()
            .variable(DesignVariableInfo::continuous("x", 0.0, 1.0).with_precision(4))
            .variable(DesignVariableInfo::continuous("y", 0.0, 1.0).with_precision(4))
            .objective(ObjectiveFunctionInfo::minimize("f1"))
            .objective(ObjectiveFunctionInfo::minimize("f2"))
            .build()
            .unwrap()
    }

    pub fn constrained_target() -> Arc<DesignTarget> {
        DesignTarget::builder()
            .variable(DesignVariableInfo::continuous("x", 0.0, 1.0))
            .objective(ObjectiveFunctionInfo::minimize("f"))
            .constraint(ConstraintInfo::at_most("g", 0.0))
            .build()
            .unwrap()
    }

    pub fn rng() -> EvolveRng {
        create_rng(42)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(OperatorKind::Crosser.to_string(), "Crosser");
        assert_eq!(
            OperatorKind::NichePressureApplicator.to_string(),
            "NichePressureApplicator"
        );
    }

    #[test]
    fn test_best_index() {
        let t = test_support::two_var_target();
        let mut g = DesignGroup::new();
        g.insert(t.new_design());
        g.insert(t.new_design());
        g.insert(t.new_design());
        let mut f = FitnessRecord::new();
        f.add_fitness(g.get(0).unwrap(), -3.0);
        f.add_fitness(g.get(2).unwrap(), -1.0);
        assert_eq!(best_index(&g, &f), Some(2));
        assert_eq!(best_index(&DesignGroup::new(), &f), None);
    }
}
