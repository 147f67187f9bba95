//! Genetic algorithm framework.
//!
//! A [`GeneticAlgorithm`] owns a population of [`Design`](crate::design::Design)s
//! and one operator per stage of a generation. Operators are chosen by name
//! through [`GaConfig`] and an [`OperatorRegistry`](operators::OperatorRegistry),
//! or passed directly to the [`GeneticAlgorithmBuilder`].
//!
//! # Key Types
//!
//! - [`GaConfig`]: operator names, population floor, seed (presets `moga`/`soga`)
//! - [`GeneticAlgorithm`]: population, offspring, discards and the step methods
//! - [`MainLoop`] / [`StandardMainLoop`]: drives one generation
//! - [`Moga`]: Pareto-set extraction over population and discards
//!
//! # Submodules
//!
//! - [`operators`]: operator contracts and the built-in strategies
//! - [`multi_objective`]: constraint-aware Pareto dominance and layering
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*
//! - Fonseca & Fleming (1993), "Genetic Algorithms for Multiobjective Optimization"
//! - Deb (2000), "An efficient constraint handling method for genetic algorithms"

mod algorithm;
mod config;
mod main_loop;
mod moga;
pub mod multi_objective;
pub mod operators;

pub use algorithm::{GaResult, GenerationStats, GeneticAlgorithm, GeneticAlgorithmBuilder};
pub use config::GaConfig;
pub use main_loop::{LoopState, MainLoop, StandardMainLoop};
pub use moga::{BestDesignStrategy, Moga, MogaResult};
