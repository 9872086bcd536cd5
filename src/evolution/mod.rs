//! Population evolution (selection, crossover, mutation).
//!
//! Advances a [`Population`](crate::population::Population) one generation at
//! a time. Fitness is never computed here; the engine re-evaluates
//! offspring through the [`fitness`](crate::fitness) backends before the
//! next generation.
//!
//! # Key Types
//!
//! - [`EvolutionOperator`]: one-generation advance
//! - [`ParentSelection`]: how parents are drawn from the elite set
//! - [`GenerationStats`]: per-generation summary
//!
//! # Submodules
//!
//! - [`operators`]: single-point crossover and Gaussian mutation
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Edelman (1987), *Neural Darwinism*

pub mod operators;
mod runner;
mod selection;

pub use runner::{EvolutionOperator, GenerationStats, MUTATION_RATE, MUTATION_STD};
pub use selection::{elite_count, rank_descending, ParentSelection};
