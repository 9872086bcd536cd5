//! One-generation advance of a population.
//!
//! [`EvolutionOperator::advance`] performs: rank → keep elites →
//! breed offspring (selection, crossover, mutation) → commit.

use super::operators::{gaussian_mutation, single_point_crossover};
use super::selection::{elite_count, rank_descending, ParentSelection};
use crate::error::{OptimizationError, Result};
use crate::population::Population;
use rand::Rng;
use tracing::trace;

/// Per-gene mutation probability.
pub const MUTATION_RATE: f64 = 0.1;

/// Standard deviation of mutation noise.
pub const MUTATION_STD: f32 = 0.1;

/// Summary of one completed generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStats {
    /// Generation number after the advance.
    pub generation: u32,

    /// Individuals carried over unchanged.
    pub elites: usize,

    /// Individuals bred this generation.
    pub offspring: usize,

    /// Genes touched by mutation across all offspring.
    pub mutated_genes: usize,

    /// Fitness of the top-ranked elite going in.
    pub best_fitness: f32,
}

/// Advances a population by one generation.
///
/// The top `ceil(size / 2)` individuals survive unchanged, fitness
/// included. Every other slot is filled by an offspring of two elites with
/// fitness `0.0`, pending the next evaluation pass.
///
/// # Usage
///
/// ```
/// use u_adaptive::evolution::EvolutionOperator;
/// use u_adaptive::population::Population;
/// use u_adaptive::random::create_rng;
///
/// let mut rng = create_rng(42);
/// let mut pop = Population::random("vision", 8, 4, 1.0, &mut rng);
/// let stats = EvolutionOperator::new().advance(&mut pop, &mut rng).unwrap();
/// assert_eq!(stats.elites, 4);
/// assert_eq!(pop.generation(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EvolutionOperator {
    selection: ParentSelection,
    mutation_rate: f64,
    mutation_std: f32,
}

impl EvolutionOperator {
    /// Operator with uniform elite selection and the standard mutation
    /// parameters.
    pub fn new() -> Self {
        Self {
            selection: ParentSelection::Uniform,
            mutation_rate: MUTATION_RATE,
            mutation_std: MUTATION_STD,
        }
    }

    /// Sets the parent selection scheme.
    pub fn with_selection(mut self, selection: ParentSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the per-gene mutation probability.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation noise standard deviation.
    pub fn with_mutation_std(mut self, std: f32) -> Self {
        self.mutation_std = std.max(0.0);
        self
    }

    /// Parent selection in use.
    pub fn selection(&self) -> ParentSelection {
        self.selection
    }

    /// Runs one generation on `population`.
    ///
    /// The next generation is assembled in scratch buffers and only
    /// committed if every weight is finite; on error the population is left
    /// exactly as it was.
    ///
    /// # Errors
    /// - [`OptimizationError::InvalidEliteCount`] if `size < 2`
    /// - [`OptimizationError::NumericOverflow`] if an offspring is non-finite
    pub fn advance<R: Rng + ?Sized>(
        &self,
        population: &mut Population,
        rng: &mut R,
    ) -> Result<GenerationStats> {
        let size = population.size();
        if size < 2 {
            return Err(OptimizationError::InvalidEliteCount { size });
        }
        let dim = population.feature_dim();

        let ranked = rank_descending(population.fitness());
        let n_elite = elite_count(size);
        let elites = &ranked[..n_elite];

        let mut weights = Vec::with_capacity(size * dim);
        let mut fitness = Vec::with_capacity(size);

        for &idx in elites {
            weights.extend_from_slice(population.row(idx));
            fitness.push(population.fitness()[idx]);
        }

        let mut mutated_genes = 0;
        for _ in n_elite..size {
            let a = elites[self.selection.select(elites, rng)];
            let b = elites[self.selection.select(elites, rng)];
            let mut child = single_point_crossover(population.row(a), population.row(b), rng);
            mutated_genes += gaussian_mutation(&mut child, self.mutation_rate, self.mutation_std, rng);
            weights.extend(child);
            fitness.push(0.0);
        }

        if !weights.iter().all(|w| w.is_finite()) {
            return Err(OptimizationError::NumericOverflow {
                population: population.id().to_string(),
            });
        }

        let best_fitness = population.best_fitness();
        population.commit_generation(weights, fitness);

        let stats = GenerationStats {
            generation: population.generation(),
            elites: n_elite,
            offspring: size - n_elite,
            mutated_genes,
            best_fitness,
        };
        trace!(population = population.id(), ?stats, "generation advanced");
        Ok(stats)
    }
}

impl Default for EvolutionOperator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
