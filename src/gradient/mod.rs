//! Gradient-based strategy.
//!
//! Instead of a population, a single differentiable [`ScoringNetwork`] is
//! trained by stochastic ascent on its own output with [`Adam`]. Gradients
//! are derived by hand; no autodiff dependency is needed.

mod adam;
mod network;
mod runner;

pub use adam::{Adam, BETA1, BETA2, EPSILON};
pub use network::{ScoringNetwork, DEFAULT_HIDDEN};
pub use runner::GradientOptimizer;
