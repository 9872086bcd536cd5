//! Fitness evaluation backends.
//!
//! Both backends share one numeric contract:
//!
//! ```text
//! raw(w)   = Σ |w_i|
//! score(w) = sigmoid(raw(w) / 100)
//! ```
//!
//! The CPU backend adds small Gaussian exploration noise; the accelerator
//! backend is deterministic. Outputs are clamped to `[0, 1]` either way.

use crate::device::DeviceKind;
use crate::error::{OptimizationError, Result};
use crate::population::Population;
use crate::random::gaussian;
use rand::RngCore;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Divisor applied to the raw L1 score before the sigmoid.
pub const SCORE_SCALE: f32 = 100.0;

/// Standard deviation of the CPU exploration noise.
pub const CPU_NOISE_STD: f32 = 0.01;

/// CPU noise is truncated at this many standard deviations.
pub const NOISE_CLIP_SIGMAS: f32 = 3.0;

/// Maps a population's weight matrix to one fitness value per row.
///
/// Implementations must not mutate the population and must fail with
/// [`OptimizationError::NumericOverflow`] on non-finite weights instead of
/// producing NaN scores.
pub trait Evaluator: Send + Sync {
    /// The device class this backend runs on.
    fn kind(&self) -> DeviceKind;

    /// Scores every individual in `population`.
    fn evaluate(&self, population: &Population, rng: &mut dyn RngCore) -> Result<Vec<f32>>;
}

/// Noiseless score of one parameter vector.
#[inline]
pub fn score_row(row: &[f32]) -> f32 {
    let raw: f32 = row.iter().map(|w| w.abs()).sum();
    sigmoid(raw / SCORE_SCALE)
}

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn ensure_finite(population: &Population) -> Result<()> {
    if population.is_finite() {
        Ok(())
    } else {
        Err(OptimizationError::NumericOverflow {
            population: population.id().to_string(),
        })
    }
}

/// Sequential CPU backend with exploration noise.
#[derive(Debug, Clone)]
pub struct CpuEvaluator {
    noise_std: f32,
}

impl CpuEvaluator {
    /// Creates a CPU evaluator with the standard noise level.
    pub fn new() -> Self {
        Self {
            noise_std: CPU_NOISE_STD,
        }
    }

    /// Overrides the noise standard deviation (`0.0` disables noise).
    pub fn with_noise_std(mut self, std: f32) -> Self {
        self.noise_std = std.max(0.0);
        self
    }
}

impl Default for CpuEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for CpuEvaluator {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn evaluate(&self, population: &Population, rng: &mut dyn RngCore) -> Result<Vec<f32>> {
        ensure_finite(population)?;
        let clip = NOISE_CLIP_SIGMAS * self.noise_std;
        Ok(population
            .rows()
            .map(|row| {
                let noise = if self.noise_std > 0.0 {
                    gaussian(self.noise_std, rng).clamp(-clip, clip)
                } else {
                    0.0
                };
                (score_row(row) + noise).clamp(0.0, 1.0)
            })
            .collect())
    }
}

/// Deterministic data-parallel backend used for accelerator handles.
///
/// Rows are scored independently (in parallel with the `parallel`
/// feature), and the RNG is never touched.
#[derive(Debug, Clone, Default)]
pub struct AcceleratorEvaluator;

impl AcceleratorEvaluator {
    /// Creates an accelerator evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for AcceleratorEvaluator {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Accelerator
    }

    fn evaluate(&self, population: &Population, _rng: &mut dyn RngCore) -> Result<Vec<f32>> {
        ensure_finite(population)?;
        let dim = population.feature_dim();
        if dim == 0 {
            return Ok(vec![score_row(&[]); population.size()]);
        }

        #[cfg(feature = "parallel")]
        let scores = population
            .weights()
            .par_chunks_exact(dim)
            .map(|row| score_row(row).clamp(0.0, 1.0))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let scores = population
            .weights()
            .chunks_exact(dim)
            .map(|row| score_row(row).clamp(0.0, 1.0))
            .collect();

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    fn sample_population() -> Population {
        Population::from_rows(
            "p",
            vec![vec![0.0; 4], vec![10.0, -10.0, 5.0, -5.0], vec![100.0, 0.0, 0.0, 0.0]],
            vec![0.0; 3],
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_score_row_values() {
        assert!((score_row(&[0.0, 0.0]) - 0.5).abs() < 1e-6);
        // raw = 100 -> sigmoid(1)
        let expected = 1.0 / (1.0 + (-1.0f32).exp());
        assert!((score_row(&[60.0, -40.0]) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_accelerator_is_deterministic() {
        let pop = sample_population();
        let eval = AcceleratorEvaluator::new();
        let a = eval.evaluate(&pop, &mut create_rng(1)).unwrap();
        let b = eval.evaluate(&pop, &mut create_rng(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cpu_noiseless_matches_accelerator() {
        let pop = sample_population();
        let cpu = CpuEvaluator::new().with_noise_std(0.0);
        let acc = AcceleratorEvaluator::new();
        let mut rng = create_rng(42);
        let a = cpu.evaluate(&pop, &mut rng).unwrap();
        let b = acc.evaluate(&pop, &mut rng).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "cpu {x} vs accelerator {y}");
        }
    }

    #[test]
    fn test_cpu_noise_within_three_sigma() {
        let mut rng = create_rng(42);
        let pop = Population::random("p", 200, 8, 1.0, &mut rng);
        let cpu = CpuEvaluator::new();
        let scores = cpu.evaluate(&pop, &mut rng).unwrap();
        for (row, score) in pop.rows().zip(&scores) {
            let clean = score_row(row);
            assert!((score - clean).abs() <= 0.03 + 1e-6, "noise too large: {score} vs {clean}");
        }
        // noise is actually applied
        assert!(pop.rows().zip(&scores).any(|(row, s)| (s - score_row(row)).abs() > 1e-7));
    }

    #[test]
    fn test_cpu_same_seed_same_scores() {
        let mut rng = create_rng(3);
        let pop = Population::random("p", 16, 8, 1.0, &mut rng);
        let cpu = CpuEvaluator::new();
        let a = cpu.evaluate(&pop, &mut create_rng(9)).unwrap();
        let b = cpu.evaluate(&pop, &mut create_rng(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_outputs_clamped() {
        let pop = Population::from_rows("p", vec![vec![1.0e6; 4]], vec![0.0], 1.0).unwrap();
        let scores = CpuEvaluator::new()
            .evaluate(&pop, &mut create_rng(0))
            .unwrap();
        assert!(scores[0] <= 1.0 && scores[0] >= 0.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut pop = sample_population();
        pop.weights_mut()[0] = f32::INFINITY;
        let mut rng = create_rng(0);
        for eval in [
            Box::new(CpuEvaluator::new()) as Box<dyn Evaluator>,
            Box::new(AcceleratorEvaluator::new()),
        ] {
            let err = eval.evaluate(&pop, &mut rng).unwrap_err();
            assert_eq!(
                err,
                OptimizationError::NumericOverflow {
                    population: "p".into()
                }
            );
        }
    }
}
