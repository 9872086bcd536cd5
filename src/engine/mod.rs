//! Engine orchestration.
//!
//! # Key Types
//!
//! - [`Engine`]: owns populations and devices, runs one optimization at a time
//! - [`OptimizationConfig`]: per-run parameters with presets
//! - [`EngineConfig`]: initialization parameters (feature width, domains)
//! - [`OptimizationResult`]: outcome of a run, including its history
//! - [`EngineMetrics`]: aggregate statistics across runs
//! - [`MetricsSink`]: destination for per-run audit events

mod config;
mod metrics;
mod runner;
mod types;

pub use config::{
    ConfigSource, DomainSpec, EngineConfig, OptimizationConfig, ProcessingMode, StaticConfigSource,
    Strategy, StrategyTag,
};
pub use metrics::{EngineMetrics, MetricsSink, RunEvent, TracingSink};
pub use runner::{Engine, IterationObserver};
pub use types::{performance_gain, OptimizationHistory, OptimizationResult, MIN_BASELINE};
