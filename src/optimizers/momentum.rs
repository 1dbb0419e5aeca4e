//! Momentum optimizer implementation

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind};

pub const DEFAULT_MOMENTUM: f64 = 0.9;

/// Gradient descent with a velocity term.
///
/// ```text
/// v = μ * v + η * g
/// u = v
/// ```
pub struct Momentum {
    learning_rate: f64,
    momentum: f64,
    velocity: Vec<f64>,
}

impl Momentum {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            momentum: DEFAULT_MOMENTUM,
            velocity: vec![0.0; size],
        }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }
}

impl Optimizer for Momentum {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.velocity.len(), gradients)?;
        for (v, &g) in self.velocity.iter_mut().zip(gradients) {
            *v = self.momentum * *v + self.learning_rate * g;
        }
        Ok(&self.velocity)
    }

    fn reset(&mut self) {
        clear(&mut [&mut self.velocity]);
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::Momentum
    }

    fn size(&self) -> usize {
        self.velocity.len()
    }
}
