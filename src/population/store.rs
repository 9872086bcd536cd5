//! Population storage.

use super::types::Population;
use crate::error::{OptimizationError, Result};
use rand::Rng;
use std::collections::BTreeMap;

/// Owns every registered population, keyed by id.
///
/// The store has no locking of its own. The engine keeps it behind the run
/// lock, so holding `&mut PopulationStore` already implies exclusive access.
///
/// Iteration is in id order, which keeps RNG consumption (and therefore
/// seeded runs) reproducible.
#[derive(Debug, Clone, Default)]
pub struct PopulationStore {
    populations: BTreeMap<String, Population>,
}

impl PopulationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a randomly initialized population.
    ///
    /// Fails with [`OptimizationError::DuplicateId`] if `id` is taken.
    pub fn create<R: Rng + ?Sized>(
        &mut self,
        id: &str,
        size: usize,
        feature_dim: usize,
        contribution_weight: f32,
        rng: &mut R,
    ) -> Result<&Population> {
        if self.populations.contains_key(id) {
            return Err(OptimizationError::DuplicateId(id.to_string()));
        }
        let population = Population::random(id, size, feature_dim, contribution_weight, rng);
        Ok(self.populations.entry(id.to_string()).or_insert(population))
    }

    /// Registers an already built population.
    pub fn insert(&mut self, population: Population) -> Result<()> {
        if self.populations.contains_key(population.id()) {
            return Err(OptimizationError::DuplicateId(population.id().to_string()));
        }
        self.populations.insert(population.id().to_string(), population);
        Ok(())
    }

    /// Looks up a population by id.
    pub fn get(&self, id: &str) -> Result<&Population> {
        self.populations
            .get(id)
            .ok_or_else(|| OptimizationError::NotFound(id.to_string()))
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Population> {
        self.populations
            .get_mut(id)
            .ok_or_else(|| OptimizationError::NotFound(id.to_string()))
    }

    /// All populations in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Population> {
        self.populations.values()
    }

    /// Mutable iteration in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Population> {
        self.populations.values_mut()
    }

    /// Registered ids in iteration order.
    pub fn ids(&self) -> Vec<String> {
        self.populations.keys().cloned().collect()
    }

    /// Number of registered populations.
    pub fn len(&self) -> usize {
        self.populations.len()
    }

    /// Whether no population is registered.
    pub fn is_empty(&self) -> bool {
        self.populations.is_empty()
    }

    /// Total bytes held by all populations.
    pub fn memory_bytes(&self) -> u64 {
        self.iter().map(Population::memory_bytes).sum()
    }

    /// Contribution-weighted mean of each population's mean fitness.
    ///
    /// Falls back to the plain mean when every weight is zero, and to `0.0`
    /// for an empty store.
    pub fn adaptation_level(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let total_weight: f32 = self.iter().map(Population::contribution_weight).sum();
        if total_weight <= 0.0 {
            return self.iter().map(Population::mean_fitness).sum::<f32>() / self.len() as f32;
        }
        self.iter()
            .map(|p| p.contribution_weight() * p.mean_fitness())
            .sum::<f32>()
            / total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_create_and_get() {
        let mut store = PopulationStore::new();
        let mut rng = create_rng(42);
        store.create("language", 4, 8, 0.5, &mut rng).unwrap();
        let pop = store.get("language").unwrap();
        assert_eq!(pop.size(), 4);
        assert_eq!(pop.feature_dim(), 8);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_id() {
        let mut store = PopulationStore::new();
        let mut rng = create_rng(42);
        store.create("a", 2, 2, 1.0, &mut rng).unwrap();
        let err = store.create("a", 2, 2, 1.0, &mut rng).unwrap_err();
        assert_eq!(err, OptimizationError::DuplicateId("a".into()));
    }

    #[test]
    fn test_not_found() {
        let store = PopulationStore::new();
        assert_eq!(
            store.get("missing").unwrap_err(),
            OptimizationError::NotFound("missing".into())
        );
    }

    #[test]
    fn test_adaptation_level_weighted() {
        let mut store = PopulationStore::new();
        store
            .insert(Population::from_rows("a", vec![vec![0.0]; 2], vec![1.0, 1.0], 0.75).unwrap())
            .unwrap();
        store
            .insert(Population::from_rows("b", vec![vec![0.0]; 2], vec![0.0, 0.0], 0.25).unwrap())
            .unwrap();
        assert!((store.adaptation_level() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_adaptation_level_zero_weights() {
        let mut store = PopulationStore::new();
        store
            .insert(Population::from_rows("a", vec![vec![0.0]], vec![0.2], 0.0).unwrap())
            .unwrap();
        store
            .insert(Population::from_rows("b", vec![vec![0.0]], vec![0.6], 0.0).unwrap())
            .unwrap();
        assert!((store.adaptation_level() - 0.4).abs() < 1e-6);
        assert_eq!(PopulationStore::new().adaptation_level(), 0.0);
    }
}
