//! Adam optimizer.
//!
//! # Reference
//!
//! Kingma & Ba (2015), "Adam: A Method for Stochastic Optimization"

/// First-moment decay.
pub const BETA1: f32 = 0.9;
/// Second-moment decay.
pub const BETA2: f32 = 0.999;
/// Denominator stabilizer.
pub const EPSILON: f32 = 1e-8;

/// Adam state for a flat parameter vector.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    m: Vec<f32>,
    v: Vec<f32>,
    t: i32,
}

impl Adam {
    /// Creates zeroed moment buffers for `n` parameters.
    pub fn new(n: usize, learning_rate: f32) -> Self {
        Self {
            learning_rate,
            m: vec![0.0; n],
            v: vec![0.0; n],
            t: 0,
        }
    }

    /// Number of steps taken.
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Applies one bias-corrected descent step to `params`.
    ///
    /// # Panics
    /// Panics if `params`, `grad` and the moment buffers differ in length.
    pub fn step(&mut self, params: &mut [f32], grad: &[f32]) {
        assert_eq!(params.len(), self.m.len(), "parameter count changed");
        assert_eq!(grad.len(), self.m.len(), "gradient length mismatch");

        self.t = self.t.saturating_add(1);
        let bias1 = 1.0 - BETA1.powi(self.t);
        let bias2 = 1.0 - BETA2.powi(self.t);

        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }
    }

    /// Bytes held by both moment buffers.
    pub fn memory_bytes(&self) -> u64 {
        ((self.m.len() + self.v.len()) * std::mem::size_of::<f32>()) as u64
    }
}
