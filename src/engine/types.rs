//! Run outputs.

use super::config::Strategy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metric value of every completed iteration, in order.
///
/// Append-only while a run is active; handed to the caller inside the
/// [`OptimizationResult`] once the run ends.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct OptimizationHistory {
    values: Vec<f32>,
}

impl OptimizationHistory {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            values: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, metric: f32) {
        self.values.push(metric);
    }

    /// All recorded values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First recorded value.
    pub fn first(&self) -> Option<f32> {
        self.values.first().copied()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<f32> {
        self.values.last().copied()
    }

    /// Highest recorded value.
    pub fn best(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::max)
    }
}

impl From<Vec<f32>> for OptimizationHistory {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationResult {
    /// The run completed without cancellation.
    pub success: bool,

    /// Strategy that ran.
    pub strategy: Strategy,

    /// Last recorded metric, `0.0` if none was recorded.
    pub final_metric: f32,

    /// Number of recorded iterations (equals `history.len()`).
    pub iterations_completed: usize,

    /// `final_metric / max(0.001, history[0])`, `0.0` for an empty history.
    pub performance_gain: f32,

    /// Bytes of state the run worked on.
    pub memory_used: u64,

    /// The convergence monitor ended the run.
    pub converged: bool,

    /// The run stopped on a cancellation request.
    pub cancelled: bool,

    /// Wall-clock duration of the run.
    pub processing_time: Duration,

    /// Per-iteration metric values.
    pub history: OptimizationHistory,
}

/// Lower bound on the baseline used for [`OptimizationResult::performance_gain`].
pub const MIN_BASELINE: f32 = 0.001;

/// Ratio of the final metric to the first, against a floor of
/// [`MIN_BASELINE`].
pub fn performance_gain(history: &OptimizationHistory) -> f32 {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) => last / first.max(MIN_BASELINE),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain() {
        let history = OptimizationHistory::from(vec![0.5, 0.6, 0.75]);
        assert!((performance_gain(&history) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_gain_floor() {
        let history = OptimizationHistory::from(vec![0.0, 0.01]);
        assert!((performance_gain(&history) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_gain_empty() {
        assert_eq!(performance_gain(&OptimizationHistory::default()), 0.0);
    }

    #[test]
    fn test_history_accessors() {
        let mut history = OptimizationHistory::with_capacity(3);
        assert!(history.is_empty());
        history.push(0.2);
        history.push(0.9);
        history.push(0.4);
        assert_eq!(history.len(), 3);
        assert_eq!(history.first(), Some(0.2));
        assert_eq!(history.last(), Some(0.4));
        assert_eq!(history.best(), Some(0.9));
    }
}
