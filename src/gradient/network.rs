//! Dense two-hidden-layer scoring network with hand-derived gradients.
//!
//! ```text
//! x (input_dim) → tanh(W1·x + b1) (h1) → tanh(W2·a1 + b2) (h2) → sigmoid(w3·a2 + b3)
//! ```
//!
//! All parameters live in one flat vector so the optimizer can update them
//! in a single pass. Layout: `W1 | b1 | W2 | b2 | w3 | b3`, matrices
//! row-major with one row per output unit.

use crate::error::{OptimizationError, Result};
use crate::fitness::sigmoid;
use crate::random::gaussian;
use rand::Rng;

/// Default width of both hidden layers.
pub const DEFAULT_HIDDEN: usize = 16;

/// Scoring model mapping a parameter vector to a value in `(0, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringNetwork {
    input_dim: usize,
    h1: usize,
    h2: usize,
    params: Vec<f32>,
}

struct Offsets {
    w1: usize,
    b1: usize,
    w2: usize,
    b2: usize,
    w3: usize,
    b3: usize,
    len: usize,
}

impl ScoringNetwork {
    /// Creates a network with scaled-normal weights and zero biases.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, h1: usize, h2: usize, rng: &mut R) -> Self {
        let mut net = Self {
            input_dim,
            h1,
            h2,
            params: Vec::new(),
        };
        let o = net.offsets();
        net.params = vec![0.0; o.len];

        fill_scaled(&mut net.params[o.w1..o.b1], input_dim, rng);
        fill_scaled(&mut net.params[o.w2..o.b2], h1, rng);
        fill_scaled(&mut net.params[o.w3..o.b3], h2, rng);
        net
    }

    fn offsets(&self) -> Offsets {
        let w1 = 0;
        let b1 = w1 + self.h1 * self.input_dim;
        let w2 = b1 + self.h1;
        let b2 = w2 + self.h2 * self.h1;
        let w3 = b2 + self.h2;
        let b3 = w3 + self.h2;
        Offsets {
            w1,
            b1,
            w2,
            b2,
            w3,
            b3,
            len: b3 + 1,
        }
    }

    /// Input dimension.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Total number of trainable parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Flat parameter vector.
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    /// Evaluates the network on a single input.
    pub fn forward(&self, x: &[f32]) -> Result<f32> {
        self.check_input(x.len())?;
        let (_a1, _a2, y) = self.activations(x);
        Ok(y)
    }

    fn check_input(&self, len: usize) -> Result<()> {
        if len != self.input_dim {
            return Err(OptimizationError::DimensionMismatch {
                expected: self.input_dim,
                actual: len,
            });
        }
        Ok(())
    }

    fn activations(&self, x: &[f32]) -> (Vec<f32>, Vec<f32>, f32) {
        let o = self.offsets();
        let p = &self.params;

        let a1: Vec<f32> = (0..self.h1)
            .map(|j| {
                let row = &p[o.w1 + j * self.input_dim..o.w1 + (j + 1) * self.input_dim];
                let z = dot(row, x) + p[o.b1 + j];
                z.tanh()
            })
            .collect();

        let a2: Vec<f32> = (0..self.h2)
            .map(|k| {
                let row = &p[o.w2 + k * self.h1..o.w2 + (k + 1) * self.h1];
                let z = dot(row, &a1) + p[o.b2 + k];
                z.tanh()
            })
            .collect();

        let z3 = dot(&p[o.w3..o.b3], &a2) + p[o.b3];
        (a1, a2, sigmoid(z3))
    }

    /// Mean output over a row-major batch and the gradient of
    /// `loss = -mean(output)` with respect to every parameter.
    ///
    /// Fails with [`OptimizationError::DimensionMismatch`] if the batch
    /// length is not a multiple of the input dimension, or is empty.
    pub fn mean_output_and_grad(&self, batch: &[f32]) -> Result<(f32, Vec<f32>)> {
        if self.input_dim == 0 || batch.is_empty() || batch.len() % self.input_dim != 0 {
            return Err(OptimizationError::DimensionMismatch {
                expected: self.input_dim,
                actual: batch.len(),
            });
        }
        let o = self.offsets();
        let p = &self.params;
        let n = batch.len() / self.input_dim;
        let inv_n = 1.0 / n as f32;

        let mut grad = vec![0.0f32; o.len];
        let mut total = 0.0f32;
        let mut d2 = vec![0.0f32; self.h2];
        let mut d1 = vec![0.0f32; self.h1];

        for x in batch.chunks_exact(self.input_dim) {
            let (a1, a2, y) = self.activations(x);
            total += y;

            // dL/dz3 for L = -mean(y)
            let d3 = -inv_n * y * (1.0 - y);
            for k in 0..self.h2 {
                grad[o.w3 + k] += d3 * a2[k];
                d2[k] = d3 * p[o.w3 + k] * (1.0 - a2[k] * a2[k]);
            }
            grad[o.b3] += d3;

            d1.iter_mut().for_each(|d| *d = 0.0);
            for k in 0..self.h2 {
                let row = o.w2 + k * self.h1;
                for j in 0..self.h1 {
                    grad[row + j] += d2[k] * a1[j];
                    d1[j] += d2[k] * p[row + j];
                }
                grad[o.b2 + k] += d2[k];
            }

            for j in 0..self.h1 {
                let dz = d1[j] * (1.0 - a1[j] * a1[j]);
                let row = o.w1 + j * self.input_dim;
                for (i, &xi) in x.iter().enumerate() {
                    grad[row + i] += dz * xi;
                }
                grad[o.b1 + j] += dz;
            }
        }

        Ok((total * inv_n, grad))
    }

    /// Bytes held by the parameter vector.
    pub fn memory_bytes(&self) -> u64 {
        (self.params.len() * std::mem::size_of::<f32>()) as u64
    }
}

/// Normal init scaled by `1 / sqrt(fan_in)`.
fn fill_scaled<R: Rng + ?Sized>(slice: &mut [f32], fan_in: usize, rng: &mut R) {
    let scale = (1.0 / fan_in.max(1) as f32).sqrt();
    for p in slice {
        *p = gaussian(scale, rng);
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
