//! Error types shared by every component of the engine.

use crate::engine::Strategy;
use thiserror::Error;

/// Errors returned by the engine and its components.
///
/// Every failure is a value; none of these are used for normal control
/// flow. A run that executed but did not converge is *not* an error, it is
/// an [`OptimizationResult`](crate::engine::OptimizationResult) with
/// `converged == false`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizationError {
    /// A configuration field is out of range. Rejected before any state
    /// is touched.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Another run currently holds the run lock.
    #[error("an optimization run is already in progress")]
    RunInProgress,

    /// The strategy tag does not name any known strategy.
    #[error("unknown strategy tag: {0:?}")]
    UnknownStrategy(String),

    /// The strategy is known but has no handler in this build.
    #[error("strategy {0} is not supported")]
    StrategyUnsupported(Strategy),

    /// Non-finite value encountered in a population's weights.
    #[error("non-finite weights in population {population:?}")]
    NumericOverflow {
        /// Id of the offending population.
        population: String,
    },

    /// No execution device, not even the CPU, could take the workload.
    #[error("no device available: {0}")]
    DeviceUnavailable(String),

    /// A population with this id is already registered.
    #[error("population {0:?} already exists")]
    DuplicateId(String),

    /// No population with this id is registered.
    #[error("population {0:?} not found")]
    NotFound(String),

    /// The population is too small to form an elite set.
    #[error("population of size {size} cannot form an elite set (need at least 2)")]
    InvalidEliteCount {
        /// Offending population size.
        size: usize,
    },

    /// An input vector does not match the expected dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OptimizationError>;

impl OptimizationError {
    /// Whether retrying the same call later may succeed.
    ///
    /// Only contention is transient; everything else needs a changed
    /// config or environment.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OptimizationError::RunInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = OptimizationError::UnknownStrategy("quantum".into());
        assert_eq!(err.to_string(), "unknown strategy tag: \"quantum\"");

        let err = OptimizationError::NumericOverflow {
            population: "vision".into(),
        };
        assert!(err.to_string().contains("vision"));
    }

    #[test]
    fn test_only_contention_is_retryable() {
        assert!(OptimizationError::RunInProgress.is_retryable());
        assert!(!OptimizationError::InvalidConfig("x".into()).is_retryable());
        assert!(!OptimizationError::StrategyUnsupported(Strategy::Reinforcement).is_retryable());
    }
}
