//! Elite ranking and parent selection.
//!
//! Unlike a classic GA, parents are only ever drawn from the elite half of
//! the population, and fitness is **maximized**.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a parent is picked from the elite set.
///
/// # Examples
///
/// ```
/// use u_adaptive::evolution::ParentSelection;
///
/// // Uniform with replacement (the standard strategy)
/// let sel = ParentSelection::Uniform;
///
/// // Binary tournament among elites
/// let sel = ParentSelection::Tournament(2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParentSelection {
    /// Every elite is equally likely; sampling is with replacement.
    #[default]
    Uniform,

    /// Draw `k` elites uniformly, keep the fittest.
    ///
    /// Ties go to the elite ranked higher.
    Tournament(usize),
}

impl ParentSelection {
    /// Picks a position in `elites` (which is ranked best-first).
    ///
    /// # Panics
    /// Panics if `elites` is empty.
    pub fn select<R: Rng + ?Sized>(&self, elites: &[usize], rng: &mut R) -> usize {
        assert!(!elites.is_empty(), "cannot select from an empty elite set");
        let n = elites.len();
        match *self {
            ParentSelection::Uniform => rng.random_range(0..n),
            ParentSelection::Tournament(k) => {
                // elites are sorted best-first, so the lowest position wins
                let mut best = rng.random_range(0..n);
                for _ in 1..k.max(1) {
                    best = best.min(rng.random_range(0..n));
                }
                best
            }
        }
    }
}

/// Number of elites kept from a population of `size`: `ceil(size / 2)`.
pub fn elite_count(size: usize) -> usize {
    size.div_ceil(2)
}

/// Ranks individual indices by descending fitness.
///
/// The sort is stable, so equal fitness keeps the lower index first.
pub fn rank_descending(fitness: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_elite_count() {
        assert_eq!(elite_count(2), 1);
        assert_eq!(elite_count(4), 2);
        assert_eq!(elite_count(5), 3);
        assert_eq!(elite_count(1), 1);
    }

    #[test]
    fn test_rank_descending() {
        assert_eq!(rank_descending(&[0.1, 0.9, 0.5]), vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_ties_prefer_lower_index() {
        assert_eq!(rank_descending(&[0.5, 0.7, 0.5, 0.7]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_uniform_covers_all_elites() {
        let elites = [3, 1, 0, 2];
        let mut rng = create_rng(42);
        let mut counts = [0u32; 4];
        let n = 10_000;
        for _ in 0..n {
            counts[ParentSelection::Uniform.select(&elites, &mut rng)] += 1;
        }
        for &c in &counts {
            assert!(c > 2000, "expected roughly uniform, got {counts:?}");
        }
    }

    #[test]
    fn test_tournament_favors_top_rank() {
        let elites = [0, 1, 2, 3];
        let mut rng = create_rng(42);
        let mut counts = [0u32; 4];
        for _ in 0..10_000 {
            counts[ParentSelection::Tournament(3).select(&elites, &mut rng)] += 1;
        }
        assert!(counts[0] > counts[3], "expected bias to rank 0: {counts:?}");
    }

    #[test]
    fn test_single_elite() {
        let mut rng = create_rng(42);
        assert_eq!(ParentSelection::Uniform.select(&[7], &mut rng), 0);
        assert_eq!(ParentSelection::Tournament(4).select(&[7], &mut rng), 0);
    }

    #[test]
    #[should_panic(expected = "cannot select from an empty elite set")]
    fn test_empty_elites_panics() {
        let mut rng = create_rng(42);
        ParentSelection::Uniform.select(&[], &mut rng);
    }
}
