//! Run and engine configuration.
//!
//! [`OptimizationConfig`] describes one run; [`EngineConfig`] describes the
//! engine itself (feature dimension, sub-domains, seed).

use crate::error::{OptimizationError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// Elite-retaining population evolution with uniform parent choice.
    PopulationEvolution,
    /// Adam ascent on a single scoring network.
    GradientDescent,
    /// Population evolution with tournament parent choice among elites.
    EvolutionaryVariant,
    /// Recognized, but no handler is available.
    Reinforcement,
    /// Evolution for the first half of the budget, gradient for the rest.
    Hybrid,
}

impl Strategy {
    /// Every strategy, in tag order.
    pub const ALL: [Strategy; 5] = [
        Strategy::PopulationEvolution,
        Strategy::GradientDescent,
        Strategy::EvolutionaryVariant,
        Strategy::Reinforcement,
        Strategy::Hybrid,
    ];

    /// Canonical tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::PopulationEvolution => "population-evolution",
            Strategy::GradientDescent => "gradient-descent",
            Strategy::EvolutionaryVariant => "evolutionary-variant",
            Strategy::Reinforcement => "reinforcement",
            Strategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Strategy {
    type Err = OptimizationError;

    /// Parses a tag. Case-insensitive; `_` is accepted for `-`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Strategy::ALL
            .into_iter()
            .find(|st| st.tag() == normalized)
            .ok_or_else(|| OptimizationError::UnknownStrategy(s.to_string()))
    }
}

/// Strategy tag as supplied by a configuration source.
///
/// The tag is only resolved to a [`Strategy`] when a run starts, so a
/// config can carry a tag this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct StrategyTag(String);

impl StrategyTag {
    /// Wraps a raw tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The raw tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the tag, failing with [`OptimizationError::UnknownStrategy`].
    pub fn resolve(&self) -> Result<Strategy> {
        self.0.parse()
    }
}

impl From<Strategy> for StrategyTag {
    fn from(strategy: Strategy) -> Self {
        Self(strategy.tag().to_string())
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the caller intends to consume results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProcessingMode {
    /// Latency-sensitive: short runs.
    RealTime,
    /// Throughput-oriented offline runs.
    #[default]
    Batch,
    /// Continuous small increments.
    Streaming,
    /// Engine picks per run.
    Adaptive,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessingMode::RealTime => "real-time",
            ProcessingMode::Batch => "batch",
            ProcessingMode::Streaming => "streaming",
            ProcessingMode::Adaptive => "adaptive",
        })
    }
}

/// Configuration of a single optimization run.
///
/// Passed by value to [`Engine::run`](crate::engine::Engine::run) and never
/// mutated afterwards.
///
/// # Defaults
///
/// ```
/// use u_adaptive::engine::{OptimizationConfig, Strategy};
///
/// let config = OptimizationConfig::default();
/// assert_eq!(config.strategy.resolve().unwrap(), Strategy::PopulationEvolution);
/// assert_eq!(config.max_iterations, 100);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_adaptive::engine::{OptimizationConfig, Strategy};
///
/// let config = OptimizationConfig::default()
///     .with_strategy(Strategy::Hybrid)
///     .with_max_iterations(40)
///     .with_learning_rate(0.01)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationConfig {
    /// Strategy tag, resolved at run start.
    pub strategy: StrategyTag,

    /// Processing mode. Carried on logs and audit events.
    pub mode: ProcessingMode,

    /// Requested population size. Must be at least 2.
    ///
    /// Population shapes are fixed when the engine registers them; this
    /// value is validated and reported, not applied to existing populations.
    pub population_size: usize,

    /// Adam step size for gradient phases.
    pub learning_rate: f32,

    /// Synthetic samples per gradient iteration.
    pub batch_size: usize,

    /// Upper bound on recorded iterations.
    pub max_iterations: usize,

    /// Absolute metric change over the lookback window below which the
    /// run counts as converged.
    pub convergence_threshold: f32,

    /// Ask for accelerator evaluation when available.
    pub prefer_accelerator: bool,

    /// Memory budget in bytes; `0` means unlimited.
    pub memory_budget: u64,

    /// Random seed for reproducibility.
    ///
    /// `None` draws a seed from the engine's own RNG.
    pub seed: Option<u64>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::PopulationEvolution.into(),
            mode: ProcessingMode::Batch,
            population_size: 50,
            learning_rate: 0.001,
            batch_size: 32,
            max_iterations: 100,
            convergence_threshold: 0.001,
            prefer_accelerator: true,
            memory_budget: 0,
            seed: None,
        }
    }
}

impl OptimizationConfig {
    /// Sets the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy.into();
        self
    }

    /// Sets a raw strategy tag, resolved at run start.
    pub fn with_strategy_tag(mut self, tag: impl Into<String>) -> Self {
        self.strategy = StrategyTag::new(tag);
        self
    }

    /// Sets the processing mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the requested population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the learning rate.
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the gradient batch size.
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the convergence threshold (negative values clamp to 0).
    pub fn with_convergence_threshold(mut self, threshold: f32) -> Self {
        self.convergence_threshold = threshold.max(0.0);
        self
    }

    /// Enables or disables the accelerator preference.
    pub fn with_prefer_accelerator(mut self, prefer: bool) -> Self {
        self.prefer_accelerator = prefer;
        self
    }

    /// Sets the memory budget in bytes (`0` = unlimited).
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = bytes;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Preset for latency-sensitive callers.
    ///
    /// - Iterations: 20, Batch: 8, Threshold: 0.01
    pub fn real_time() -> Self {
        Self {
            mode: ProcessingMode::RealTime,
            max_iterations: 20,
            batch_size: 8,
            convergence_threshold: 0.01,
            ..Self::default()
        }
    }

    /// Preset for offline batch runs.
    ///
    /// - Iterations: 100, Batch: 32, Threshold: 0.001
    pub fn batch() -> Self {
        Self {
            mode: ProcessingMode::Batch,
            ..Self::default()
        }
    }

    /// Preset for quality over speed.
    ///
    /// - Iterations: 500, Batch: 64, Threshold: 0.0001
    pub fn thorough() -> Self {
        Self {
            mode: ProcessingMode::Batch,
            max_iterations: 500,
            batch_size: 64,
            convergence_threshold: 0.0001,
            ..Self::default()
        }
    }

    /// Picks a preset from the feature dimension.
    ///
    /// - `feature_dim < 50` → [`real_time()`](Self::real_time)
    /// - `50 ≤ feature_dim < 200` → [`batch()`](Self::batch)
    /// - `feature_dim ≥ 200` → [`thorough()`](Self::thorough)
    pub fn auto_select(feature_dim: usize) -> Self {
        if feature_dim < 50 {
            Self::real_time()
        } else if feature_dim < 200 {
            Self::batch()
        } else {
            Self::thorough()
        }
    }

    /// Validates field ranges.
    ///
    /// Returns [`OptimizationError::InvalidConfig`] with a description if
    /// any field is out of range. The strategy tag is not checked here.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(OptimizationError::InvalidConfig(msg.into()));
        if self.population_size < 2 {
            return invalid("population_size must be at least 2");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning_rate must be positive and finite");
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if !(self.convergence_threshold >= 0.0 && self.convergence_threshold.is_finite()) {
            return invalid("convergence_threshold must be non-negative and finite");
        }
        Ok(())
    }
}

/// Supplies default run configurations.
pub trait ConfigSource {
    /// The configuration to use when the caller supplies none.
    fn defaults(&self) -> OptimizationConfig;
}

/// A [`ConfigSource`] returning one fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: OptimizationConfig,
}

impl StaticConfigSource {
    /// Wraps `config`.
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }
}

impl ConfigSource for StaticConfigSource {
    fn defaults(&self) -> OptimizationConfig {
        self.config.clone()
    }
}

/// One named sub-domain and its share of the adaptation metric.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DomainSpec {
    /// Population id.
    pub id: String,
    /// Contribution weight in `[0, 1]`.
    pub contribution_weight: f32,
    /// Population size override; `None` uses [`EngineConfig::population_size`].
    pub size: Option<usize>,
}

/// Engine initialization parameters.
///
/// ```
/// use u_adaptive::engine::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_feature_dim(8)
///     .with_domain("vision", 0.6)
///     .with_domain("language", 0.4)
///     .with_seed(42);
/// assert_eq!(config.domains.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Length of every parameter vector.
    pub feature_dim: usize,

    /// Default population size for registered domains.
    pub population_size: usize,

    /// Sub-domains to create at initialization.
    pub domains: Vec<DomainSpec>,

    /// Seed for the engine's RNG. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feature_dim: 32,
            population_size: 20,
            domains: Vec::new(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Sets the feature dimension.
    pub fn with_feature_dim(mut self, dim: usize) -> Self {
        self.feature_dim = dim;
        self
    }

    /// Sets the default population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Adds a sub-domain using the default population size.
    pub fn with_domain(mut self, id: impl Into<String>, contribution_weight: f32) -> Self {
        self.domains.push(DomainSpec {
            id: id.into(),
            contribution_weight,
            size: None,
        });
        self
    }

    /// Adds a sub-domain with its own population size.
    pub fn with_sized_domain(
        mut self,
        id: impl Into<String>,
        size: usize,
        contribution_weight: f32,
    ) -> Self {
        self.domains.push(DomainSpec {
            id: id.into(),
            contribution_weight,
            size: Some(size),
        });
        self
    }

    /// Sets the engine seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the engine parameters.
    pub fn validate(&self) -> Result<()> {
        if self.feature_dim == 0 {
            return Err(OptimizationError::InvalidConfig(
                "feature_dim must be at least 1".into(),
            ));
        }
        if self.population_size < 2 {
            return Err(OptimizationError::InvalidConfig(
                "population_size must be at least 2".into(),
            ));
        }
        for domain in &self.domains {
            validate_contribution_weight(&domain.id, domain.contribution_weight)?;
            if domain.size.is_some_and(|s| s < 2) {
                return Err(OptimizationError::InvalidConfig(format!(
                    "domain {:?} needs at least 2 individuals",
                    domain.id
                )));
            }
        }
        Ok(())
    }
}

/// Rejects a contribution weight that is non-finite or outside `[0, 1]`.
pub(crate) fn validate_contribution_weight(id: &str, weight: f32) -> Result<()> {
    if (0.0..=1.0).contains(&weight) {
        Ok(())
    } else {
        Err(OptimizationError::InvalidConfig(format!(
            "domain {id:?} contribution_weight must be in [0, 1], got {weight}"
        )))
    }
}
