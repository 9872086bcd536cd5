//! Adaptive multi-strategy optimization engine.
//!
//! Maintains populations of candidate weight vectors, one per sub-domain,
//! and improves them with a selectable strategy:
//!
//! - **Population evolution**: elitist selection, single-point crossover
//!   and Gaussian mutation, with fitness re-evaluated every iteration.
//! - **Evolutionary variant**: the same loop with tournament parent
//!   selection among the elites.
//! - **Gradient descent**: Adam ascent on a small scoring network.
//! - **Hybrid**: evolution for the first half of the iteration budget,
//!   gradient ascent for the rest.
//!
//! Fitness evaluation runs on a CPU or accelerator backend chosen per call
//! by the [`device`] dispatcher. Every run is convergence-checked,
//! cancellable, and reported to a [`MetricsSink`](engine::MetricsSink).
//!
//! # Quick start
//!
//! ```
//! use u_adaptive::{Engine, EngineConfig, OptimizationConfig, Strategy};
//!
//! let engine = Engine::new(
//!     EngineConfig::default()
//!         .with_feature_dim(16)
//!         .with_population_size(10)
//!         .with_domain("vision", 0.7)
//!         .with_domain("language", 0.3),
//! )?;
//!
//! let result = engine.run(
//!     OptimizationConfig::default()
//!         .with_strategy(Strategy::Hybrid)
//!         .with_max_iterations(20),
//! )?;
//! assert!(result.success);
//! # Ok::<(), u_adaptive::OptimizationError>(())
//! ```
//!
//! # Logging
//!
//! The crate emits `tracing` events and never installs a subscriber.
//! Per-run audit records use the target `u_adaptive::audit`.

pub mod convergence;
pub mod device;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod gradient;
pub mod population;
pub mod random;

pub use engine::{Engine, EngineConfig, OptimizationConfig, OptimizationResult, Strategy};
pub use error::{OptimizationError, Result};
