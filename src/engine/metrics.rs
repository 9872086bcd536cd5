//! Engine-wide run statistics and the audit sink.

use super::config::{ProcessingMode, Strategy};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Aggregate counters over every run of one engine.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineMetrics {
    /// Runs that started (passed validation and acquired the lock).
    pub total_runs: u64,

    /// Runs that finished without cancellation or error.
    pub successful_runs: u64,

    /// Wall-clock time summed over all started runs.
    pub total_processing_time: Duration,

    /// Running mean of `performance_gain` over successful runs.
    pub average_performance_gain: f32,
}

impl EngineMetrics {
    /// Folds one finished run into the aggregate.
    pub(crate) fn record(&mut self, success: bool, gain: f32, elapsed: Duration) {
        self.total_runs += 1;
        self.total_processing_time += elapsed;
        if success {
            self.successful_runs += 1;
            let n = self.successful_runs as f32;
            self.average_performance_gain += (gain - self.average_performance_gain) / n;
        }
    }

    /// Fraction of started runs that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.successful_runs as f64 / self.total_runs as f64
        }
    }
}

/// One audit record, emitted after every started run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunEvent {
    /// Strategy that ran.
    pub strategy: Strategy,
    /// Processing mode of the run.
    pub mode: ProcessingMode,
    /// Whether the run succeeded.
    pub success: bool,
    /// Wall-clock duration.
    pub processing_time: Duration,
    /// Performance gain (`0.0` for failed runs).
    pub performance_gain: f32,
    /// Last recorded metric.
    pub final_metric: f32,
    /// Recorded iterations.
    pub iterations: usize,
}

/// Receiver of per-run audit events.
pub trait MetricsSink: Send + Sync {
    /// Records one event. Must not block for long; it runs on the caller's
    /// thread after the run lock is released.
    fn record(&self, event: &RunEvent);
}

/// Sink writing each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, event: &RunEvent) {
        info!(
            target: "u_adaptive::audit",
            strategy = %event.strategy,
            mode = %event.mode,
            success = event.success,
            processing_ms = event.processing_time.as_secs_f64() * 1e3,
            performance_gain = event.performance_gain,
            final_metric = event.final_metric,
            iterations = event.iterations,
            "optimization run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_over_successful_only() {
        let mut m = EngineMetrics::default();
        m.record(true, 2.0, Duration::from_millis(5));
        m.record(false, 100.0, Duration::from_millis(5));
        m.record(true, 4.0, Duration::from_millis(5));
        assert_eq!(m.total_runs, 3);
        assert_eq!(m.successful_runs, 2);
        assert!((m.average_performance_gain - 3.0).abs() < 1e-6);
        assert_eq!(m.total_processing_time, Duration::from_millis(15));
        assert!((m.success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_success_rate() {
        assert_eq!(EngineMetrics::default().success_rate(), 0.0);
    }

    #[test]
    fn test_tracing_sink_accepts_event() {
        TracingSink.record(&RunEvent {
            strategy: Strategy::Hybrid,
            mode: ProcessingMode::Adaptive,
            success: true,
            processing_time: Duration::from_millis(1),
            performance_gain: 1.0,
            final_metric: 0.5,
            iterations: 3,
        });
    }
}
