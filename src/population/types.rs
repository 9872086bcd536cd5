//! Population data model.
//!
//! A [`Population`] is a dense `size × feature_dim` weight matrix (one row
//! per individual) plus one fitness score per row. Both live in row-major
//! `Vec`s so that a whole generation can be swapped in a single move.

use crate::error::{OptimizationError, Result};
use crate::random::standard_normal_vec;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named set of parameter vectors evolved together.
///
/// # Invariants
///
/// - `fitness.len() == size`
/// - `weights.len() == size * feature_dim`
/// - every fitness value lies in `[0, 1]`
///
/// The shape never changes after construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Population {
    id: String,
    size: usize,
    feature_dim: usize,
    weights: Vec<f32>,
    fitness: Vec<f32>,
    generation: u32,
    contribution_weight: f32,
}

impl Population {
    /// Creates a population with standard-normal weights and uniform
    /// `[0, 1)` fitness.
    ///
    /// `contribution_weight` is clamped to `[0, 1]`.
    pub fn random<R: Rng + ?Sized>(
        id: impl Into<String>,
        size: usize,
        feature_dim: usize,
        contribution_weight: f32,
        rng: &mut R,
    ) -> Self {
        let weights = standard_normal_vec(size * feature_dim, rng);
        let fitness = (0..size).map(|_| rng.random_range(0.0..1.0)).collect();
        Self {
            id: id.into(),
            size,
            feature_dim,
            weights,
            fitness,
            generation: 0,
            contribution_weight: clamp_weight(contribution_weight),
        }
    }

    /// Builds a population from explicit rows and fitness values.
    ///
    /// Fails with [`OptimizationError::DimensionMismatch`] if the rows are
    /// ragged or the fitness vector does not have one entry per row.
    /// Fitness values are clamped into `[0, 1]`.
    pub fn from_rows(
        id: impl Into<String>,
        rows: Vec<Vec<f32>>,
        fitness: Vec<f32>,
        contribution_weight: f32,
    ) -> Result<Self> {
        let size = rows.len();
        if fitness.len() != size {
            return Err(OptimizationError::DimensionMismatch {
                expected: size,
                actual: fitness.len(),
            });
        }
        let feature_dim = rows.first().map_or(0, Vec::len);
        let mut weights = Vec::with_capacity(size * feature_dim);
        for row in rows {
            if row.len() != feature_dim {
                return Err(OptimizationError::DimensionMismatch {
                    expected: feature_dim,
                    actual: row.len(),
                });
            }
            weights.extend(row);
        }
        Ok(Self {
            id: id.into(),
            size,
            feature_dim,
            weights,
            fitness: fitness.into_iter().map(|f| f.clamp(0.0, 1.0)).collect(),
            generation: 0,
            contribution_weight: clamp_weight(contribution_weight),
        })
    }

    /// Population id (the sub-domain name).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of individuals.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Length of each individual's parameter vector.
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Number of generations this population has been advanced.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Share of this population in the engine-wide adaptation metric.
    pub fn contribution_weight(&self) -> f32 {
        self.contribution_weight
    }

    /// Row-major weight matrix.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Fitness of every individual, indexed like [`row`](Self::row).
    pub fn fitness(&self) -> &[f32] {
        &self.fitness
    }

    /// Parameter vector of individual `i`.
    ///
    /// # Panics
    /// Panics if `i >= size`.
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.feature_dim;
        &self.weights[start..start + self.feature_dim]
    }

    /// Iterator over all parameter vectors in index order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.size).map(move |i| self.row(i))
    }

    /// Mean fitness across individuals, `0.0` for an empty population.
    pub fn mean_fitness(&self) -> f32 {
        if self.size == 0 {
            return 0.0;
        }
        self.fitness.iter().sum::<f32>() / self.size as f32
    }

    /// Highest fitness value, `0.0` for an empty population.
    pub fn best_fitness(&self) -> f32 {
        self.fitness.iter().copied().fold(0.0, f32::max)
    }

    /// Whether every weight is a finite number.
    pub fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite())
    }

    /// Bytes held by the weight matrix and fitness vector.
    pub fn memory_bytes(&self) -> u64 {
        ((self.weights.len() + self.fitness.len()) * std::mem::size_of::<f32>()) as u64
    }

    /// Replaces the fitness vector.
    ///
    /// Values are clamped into `[0, 1]`.
    pub fn set_fitness(&mut self, fitness: Vec<f32>) -> Result<()> {
        if fitness.len() != self.size {
            return Err(OptimizationError::DimensionMismatch {
                expected: self.size,
                actual: fitness.len(),
            });
        }
        self.fitness = fitness.into_iter().map(|f| f.clamp(0.0, 1.0)).collect();
        Ok(())
    }

    /// Mutable access to one weight. Test and fault-injection hook.
    #[cfg(test)]
    pub(crate) fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    /// Swaps in a complete next generation and bumps the generation counter.
    ///
    /// Callers guarantee the shapes match; the evolution operator builds
    /// these buffers from this population's own dimensions.
    pub(crate) fn commit_generation(&mut self, weights: Vec<f32>, fitness: Vec<f32>) {
        debug_assert_eq!(weights.len(), self.weights.len());
        debug_assert_eq!(fitness.len(), self.fitness.len());
        self.weights = weights;
        self.fitness = fitness;
        self.generation += 1;
    }
}

/// Clamps into `[0, 1]`; NaN becomes `0.0`.
fn clamp_weight(weight: f32) -> f32 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_random_shape() {
        let mut rng = create_rng(42);
        let pop = Population::random("vision", 6, 4, 0.5, &mut rng);
        assert_eq!(pop.size(), 6);
        assert_eq!(pop.feature_dim(), 4);
        assert_eq!(pop.weights().len(), 24);
        assert_eq!(pop.fitness().len(), 6);
        assert_eq!(pop.generation(), 0);
        assert!(pop.fitness().iter().all(|f| (0.0..=1.0).contains(f)));
        assert_eq!(pop.rows().count(), 6);
    }

    #[test]
    fn test_contribution_weight_clamped() {
        let mut rng = create_rng(1);
        let pop = Population::random("x", 2, 2, 3.0, &mut rng);
        assert!((pop.contribution_weight() - 1.0).abs() < f32::EPSILON);

        let pop = Population::from_rows("y", vec![vec![1.0]], vec![0.5], f32::NAN).unwrap();
        assert_eq!(pop.contribution_weight(), 0.0);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = Population::from_rows("r", vec![vec![1.0, 2.0], vec![1.0]], vec![0.1, 0.2], 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            OptimizationError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_from_rows_rejects_fitness_length() {
        let err = Population::from_rows("r", vec![vec![1.0]], vec![], 1.0).unwrap_err();
        assert!(matches!(err, OptimizationError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_row_access() {
        let pop = Population::from_rows(
            "r",
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![0.2, 0.8],
            1.0,
        )
        .unwrap();
        assert_eq!(pop.row(1), &[3.0, 4.0]);
        assert!((pop.mean_fitness() - 0.5).abs() < 1e-6);
        assert!((pop.best_fitness() - 0.8).abs() < 1e-6);
        assert_eq!(pop.memory_bytes(), 6 * 4);
    }

    #[test]
    fn test_set_fitness_clamps_and_checks_len() {
        let mut pop =
            Population::from_rows("r", vec![vec![0.0], vec![0.0]], vec![0.0, 0.0], 1.0).unwrap();
        pop.set_fitness(vec![1.5, -0.2]).unwrap();
        assert_eq!(pop.fitness(), &[1.0, 0.0]);
        assert!(pop.set_fitness(vec![0.5]).is_err());
    }

    #[test]
    fn test_is_finite() {
        let mut pop = Population::from_rows("r", vec![vec![1.0, 2.0]], vec![0.0], 1.0).unwrap();
        assert!(pop.is_finite());
        pop.weights_mut()[1] = f32::NAN;
        assert!(!pop.is_finite());
    }
}
