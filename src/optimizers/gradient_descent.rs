//! Gradient descent optimizer implementation
//!
//! This module provides vanilla gradient descent, which performs the basic
//! update `parameter = parameter - learning_rate * gradient`.

use crate::error::Result;
use crate::optimizers::{check_gradients, Optimizer, OptimizerKind};

/// Gradient Descent optimizer.
///
/// Implements the basic gradient descent update rule without momentum or
/// adaptive learning rates:
///
/// `w = w - η * ∇L/∂w`
///
/// where w is the parameter, η (eta) is the learning rate, and ∇L/∂w is the gradient.
///
/// # Example
///
/// ```ignore
/// use mlnn::optimizers::{GradientDescent, Optimizer};
///
/// let mut optimizer = GradientDescent::new(3, 0.01);
/// let mut weights = vec![1.0, 2.0, 3.0];
/// let gradients = vec![0.1, 0.2, 0.3];
///
/// optimizer.update(&mut weights, &gradients, 0.0)?;
/// // weights are now: [0.999, 1.998, 2.997]
/// ```
pub struct GradientDescent {
    learning_rate: f64,
    delta: Vec<f64>,
}

impl GradientDescent {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            delta: vec![0.0; size],
        }
    }
}

impl Optimizer for GradientDescent {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        for (d, &g) in self.delta.iter_mut().zip(gradients) {
            *d = self.learning_rate * g;
        }
        Ok(&self.delta)
    }

    /// Stateless; nothing to clear.
    fn reset(&mut self) {}

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::GradientDescent
    }

    fn size(&self) -> usize {
        self.delta.len()
    }
}
