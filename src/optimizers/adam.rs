//! Adam (Adaptive Moment Estimation) optimizer implementation
//!
//! This module provides the Adam optimizer, which combines momentum and
//! adaptive learning rates with bias correction for improved convergence.

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind, EPSILON};

pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;

/// Adam (Adaptive Moment Estimation) optimizer.
///
/// Adam combines ideas from momentum optimization and RMSprop to provide
/// adaptive learning rates for each parameter. It maintains two moving
/// averages for each parameter:
///
/// 1. First moment (mean) of gradients (momentum)
/// 2. Second moment (uncentered variance) of gradients (adaptive learning rate)
///
/// The update rule is:
///
/// ```text
/// m_t = β1 * m_{t-1} + (1 - β1) * gradient
/// v_t = β2 * v_{t-1} + (1 - β2) * gradient²
/// m_hat = m_t / (1 - β1^t)
/// v_hat = v_t / (1 - β2^t)
/// update = α * m_hat / (√v_hat + ε)
/// ```
///
/// where:
/// - α (alpha) is the learning rate
/// - β1 (beta1) is the exponential decay rate for first moment estimates
/// - β2 (beta2) is the exponential decay rate for second moment estimates
/// - ε (epsilon) is a small constant for numerical stability
/// - t is the time step
///
/// # Fields
///
/// * `m` - First moment estimates (momentum) for each parameter
/// * `v` - Second moment estimates (adaptive learning rate) for each parameter
/// * `t` - Time step counter for bias correction
///
/// # Example
///
/// ```ignore
/// use mlnn::optimizers::{Adam, Optimizer};
///
/// let mut optimizer = Adam::new(3, 0.001);
/// let mut weights = vec![1.0, 2.0, 3.0];
/// let gradients = vec![0.1, 0.2, 0.3];
///
/// optimizer.update(&mut weights, &gradients, 0.0)?;
/// // weights are updated using adaptive learning rates
/// ```
///
/// # Reference
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
/// arXiv preprint arXiv:1412.6980.
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    /// First moment estimates (momentum)
    m: Vec<f64>,
    /// Second moment estimates (adaptive learning rate)
    v: Vec<f64>,
    /// Time step counter for bias correction
    t: i32,
    delta: Vec<f64>,
}

impl Adam {
    /// Creates an Adam optimizer for `size` parameters with β1 = 0.9 and
    /// β2 = 0.999, the values recommended by the paper.
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            m: vec![0.0; size],
            v: vec![0.0; size],
            t: 0,
            delta: vec![0.0; size],
        }
    }

    /// Overrides the moment decay rates (0 < β < 1).
    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Number of updates since construction or the last reset.
    pub fn step(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    /// Computes the Adam step with bias correction:
    /// 1. Update biased first moment estimate (momentum)
    /// 2. Update biased second moment estimate (adaptive learning rate)
    /// 3. Compute bias-corrected first and second moment estimates
    /// 4. Scale the corrected momentum by the corrected RMS
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;

        // Increment time step
        self.t += 1;

        // Compute bias correction factors
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);

        for (i, &g) in gradients.iter().enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.m[i] / bias_correction1;
            let v_hat = self.v[i] / bias_correction2;

            self.delta[i] = self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }
        Ok(&self.delta)
    }

    /// Clears all momentum and adaptive learning rate statistics,
    /// and resets the time step counter.
    fn reset(&mut self) {
        clear(&mut [&mut self.m, &mut self.v, &mut self.delta]);
        self.t = 0;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::Adam
    }

    fn size(&self) -> usize {
        self.delta.len()
    }
}
