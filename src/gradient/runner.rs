//! Stochastic gradient ascent on the scoring network.

use super::adam::Adam;
use super::network::{ScoringNetwork, DEFAULT_HIDDEN};
use crate::error::{OptimizationError, Result};
use crate::random::standard_normal_vec;
use rand::Rng;
use tracing::trace;

/// Trains a [`ScoringNetwork`] to maximize its mean output.
///
/// Each [`step`](Self::step) draws a fresh standard-normal batch, measures
/// the mean output (the iteration's metric), and applies one Adam update
/// on `loss = -mean(output)`.
#[derive(Debug, Clone)]
pub struct GradientOptimizer {
    network: ScoringNetwork,
    adam: Adam,
    batch_size: usize,
}

impl GradientOptimizer {
    /// Creates an optimizer with a freshly initialized network.
    ///
    /// Fails with [`OptimizationError::InvalidConfig`] on a zero dimension,
    /// zero batch size or a non-positive learning rate.
    pub fn new<R: Rng + ?Sized>(
        feature_dim: usize,
        learning_rate: f32,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if feature_dim == 0 {
            return Err(OptimizationError::InvalidConfig(
                "feature_dim must be at least 1".into(),
            ));
        }
        if batch_size == 0 {
            return Err(OptimizationError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(OptimizationError::InvalidConfig(
                "learning_rate must be positive".into(),
            ));
        }
        let network = ScoringNetwork::new(feature_dim, DEFAULT_HIDDEN, DEFAULT_HIDDEN, rng);
        let adam = Adam::new(network.param_count(), learning_rate);
        Ok(Self {
            network,
            adam,
            batch_size,
        })
    }

    /// The model being trained.
    pub fn network(&self) -> &ScoringNetwork {
        &self.network
    }

    /// Runs one training iteration and returns the batch's mean output
    /// before the update.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<f32> {
        let batch = standard_normal_vec(self.batch_size * self.network.input_dim(), rng);
        let (metric, grad) = self.network.mean_output_and_grad(&batch)?;
        if !grad.iter().all(|g| g.is_finite()) {
            return Err(OptimizationError::NumericOverflow {
                population: "gradient-model".into(),
            });
        }
        self.adam.step(self.network.params_mut(), &grad);
        trace!(step = self.adam.steps(), metric, "gradient step");
        Ok(metric)
    }

    /// Bytes held by the model parameters and optimizer moments.
    pub fn memory_bytes(&self) -> u64 {
        self.network.memory_bytes() + self.adam.memory_bytes()
    }
}
