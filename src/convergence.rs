//! Convergence detection over a metric history.

/// Number of iterations the monitor looks back over.
pub const LOOKBACK: usize = 10;

/// Decides termination from recent metric history.
///
/// With more than [`LOOKBACK`] samples, the run has converged when
/// `|h[last] - h[last - LOOKBACK]| < threshold`. Shorter histories never
/// converge.
///
/// ```
/// use u_adaptive::convergence::ConvergenceMonitor;
///
/// let monitor = ConvergenceMonitor::new(0.01);
/// assert!(!monitor.check(&[0.5; 10]));
/// assert!(monitor.check(&[0.5; 11]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceMonitor {
    threshold: f32,
}

impl ConvergenceMonitor {
    /// Creates a monitor with the given absolute-change threshold.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// The absolute-change threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether `history` shows convergence.
    pub fn check(&self, history: &[f32]) -> bool {
        if history.len() <= LOOKBACK {
            return false;
        }
        let last = history.len() - 1;
        let delta = history[last] - history[last - LOOKBACK];
        delta.abs() < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_never_converges() {
        let monitor = ConvergenceMonitor::new(f32::INFINITY);
        for len in 0..=LOOKBACK {
            assert!(!monitor.check(&vec![0.3; len]), "len {len} converged");
        }
    }

    #[test]
    fn test_flat_history_converges() {
        let monitor = ConvergenceMonitor::new(0.001);
        assert!(monitor.check(&[0.7; 11]));
    }

    #[test]
    fn test_compares_against_tenth_previous() {
        let monitor = ConvergenceMonitor::new(0.05);
        // h[0] = 0.0, h[10] = 0.04; intermediate values are ignored
        let mut history = vec![0.0, 0.9, 0.1, 0.8, 0.2, 0.7, 0.3, 0.6, 0.4, 0.5];
        history.push(0.04);
        assert!(monitor.check(&history));

        history[10] = 0.06;
        assert!(!monitor.check(&history));
    }

    #[test]
    fn test_threshold_is_strict() {
        let monitor = ConvergenceMonitor::new(0.5);
        let mut history = vec![0.0; 11];
        history[10] = 0.5;
        assert!(!monitor.check(&history));
    }

    #[test]
    fn test_decreasing_metric_uses_abs() {
        let monitor = ConvergenceMonitor::new(0.1);
        let mut history = vec![0.5; 11];
        history[10] = 0.45;
        assert!(monitor.check(&history));
        history[10] = 0.3;
        assert!(!monitor.check(&history));
    }
}
