//! Clone-aware evolutionary optimization engine.
//!
//! A configurable genetic algorithm whose every stage (initialization,
//! crossover, mutation, fitness assessment, selection, niche pressure and
//! convergence) is a swappable operator, plus a Pareto-based multi-objective
//! specialization.
//!
//! - [`space`]: variables, objectives and constraints of a problem
//! - [`design`]: candidate solutions, clone tracking, groups and the
//!   discard pool
//! - [`params`]: tagged parameter database read by the operators
//! - [`ga`]: the algorithm, its main loop, operators and the MOGA
//!
//! Designs that share variable values are linked as clones so they are
//! evaluated once. Discarded designs are kept for clone detection and for
//! reclaiming non-dominated solutions at the end of a run.
//!
//! # Architecture
//!
//! The crate is domain-agnostic: the only problem-specific piece is the
//! evaluator, a closure or an [`Evaluator`](ga::operators::Evaluator)
//! implementation returning objective and constraint values.

pub mod design;
pub mod error;
pub mod ga;
pub mod params;
pub mod random;
pub mod space;
