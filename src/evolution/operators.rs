//! Real-valued crossover and mutation.
//!
//! # Crossover Operators
//!
//! - [`single_point_crossover`]: prefix from one parent, suffix from the other
//!
//! # Mutation Operators
//!
//! - [`gaussian_mutation`]: per-gene additive Gaussian noise

use crate::random::gaussian;
use rand::Rng;

/// Single-point crossover of two equal-length parameter vectors.
///
/// The cut point is drawn uniformly from `[1, n - 1]`; the child takes
/// `parent_a[..cut]` followed by `parent_b[cut..]`, so both parents always
/// contribute at least one gene. Vectors shorter than 2 have no interior
/// cut point and are copied from `parent_a`.
///
/// # Panics
/// Panics if parents have different lengths.
pub fn single_point_crossover<R: Rng + ?Sized>(
    parent_a: &[f32],
    parent_b: &[f32],
    rng: &mut R,
) -> Vec<f32> {
    let n = parent_a.len();
    assert_eq!(n, parent_b.len(), "parents must have equal length");

    if n < 2 {
        return parent_a.to_vec();
    }

    let cut = rng.random_range(1..n);
    let mut child = Vec::with_capacity(n);
    child.extend_from_slice(&parent_a[..cut]);
    child.extend_from_slice(&parent_b[cut..]);
    child
}

/// Adds `N(0, sigma²)` noise to each gene independently with probability
/// `rate`. Returns the number of mutated genes.
pub fn gaussian_mutation<R: Rng + ?Sized>(
    genes: &mut [f32],
    rate: f64,
    sigma: f32,
    rng: &mut R,
) -> usize {
    let mut mutated = 0;
    for gene in genes.iter_mut() {
        if rng.random_bool(rate) {
            *gene += gaussian(sigma, rng);
            mutated += 1;
        }
    }
    mutated
}
