//! Seeded random number generation.
//!
//! Every stochastic component draws from a [`StdRng`] created here so that
//! a fixed seed reproduces a whole run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Creates a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Creates an RNG from `seed`, or from OS entropy when `None`.
pub fn rng_from_option(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => create_rng(seed),
        None => create_rng(rand::random()),
    }
}

/// Draws `n` independent standard-normal values.
pub fn standard_normal_vec<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f32> {
    (0..n).map(|_| rng.sample::<f32, _>(StandardNormal)).collect()
}

/// Draws one Gaussian sample with mean 0 and standard deviation `sigma`.
#[inline]
pub fn gaussian<R: Rng + ?Sized>(sigma: f32, rng: &mut R) -> f32 {
    rng.sample::<f32, _>(StandardNormal) * sigma
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = create_rng(7);
        let mut b = create_rng(7);
        assert_eq!(standard_normal_vec(16, &mut a), standard_normal_vec(16, &mut b));
    }

    #[test]
    fn test_gaussian_scale() {
        let mut rng = create_rng(42);
        let n = 10_000;
        let sigma = 0.1;
        let mean_sq: f32 = (0..n).map(|_| gaussian(sigma, &mut rng).powi(2)).sum::<f32>() / n as f32;
        let std = mean_sq.sqrt();
        assert!((std - sigma).abs() < 0.01, "sample std {std} far from {sigma}");
    }
}
