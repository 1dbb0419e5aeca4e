//! RMSProp optimizer implementation

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind, EPSILON};

pub const DEFAULT_DECAY: f64 = 0.9;

/// Root mean square propagation.
///
/// ```text
/// E[g²] = ρ * E[g²] + (1 - ρ) * g²
/// u     = η * g / (√E[g²] + ε)
/// ```
pub struct RMSProp {
    learning_rate: f64,
    rho: f64,
    mean_square: Vec<f64>,
    delta: Vec<f64>,
}

impl RMSProp {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            rho: DEFAULT_DECAY,
            mean_square: vec![0.0; size],
            delta: vec![0.0; size],
        }
    }

    pub fn with_decay(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }
}

impl Optimizer for RMSProp {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        for ((d, ms), &g) in self.delta.iter_mut().zip(&mut self.mean_square).zip(gradients) {
            *ms = self.rho * *ms + (1.0 - self.rho) * g * g;
            *d = self.learning_rate * g / (ms.sqrt() + EPSILON);
        }
        Ok(&self.delta)
    }

    fn reset(&mut self) {
        clear(&mut [&mut self.mean_square, &mut self.delta]);
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::RMSProp
    }

    fn size(&self) -> usize {
        self.delta.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_step_is_scaled() {
        let mut optimizer = RMSProp::new(1, 0.01);
        // E[g²] = 0.1 * 4, u = 0.01 * 2 / √0.4
        let u = optimizer.calculate_update(&[2.0]).unwrap()[0];
        assert_abs_diff_eq!(u, 0.02 / 0.4f64.sqrt(), epsilon = 1e-9);
    }
}
