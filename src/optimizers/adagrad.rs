//! AdaGrad optimizer implementation

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind, EPSILON};

/// Adaptive gradient: every element is scaled by its accumulated squared
/// gradient.
///
/// ```text
/// G = G + g²
/// u = η * g / (√G + ε)
/// ```
pub struct AdaGrad {
    learning_rate: f64,
    /// Sum of squared gradients
    accumulator: Vec<f64>,
    delta: Vec<f64>,
}

impl AdaGrad {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            accumulator: vec![0.0; size],
            delta: vec![0.0; size],
        }
    }
}

impl Optimizer for AdaGrad {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        for ((d, acc), &g) in self.delta.iter_mut().zip(&mut self.accumulator).zip(gradients) {
            *acc += g * g;
            *d = self.learning_rate * g / (acc.sqrt() + EPSILON);
        }
        Ok(&self.delta)
    }

    fn reset(&mut self) {
        clear(&mut [&mut self.accumulator, &mut self.delta]);
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::AdaGrad
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
    fn test_step_shrinks_with_history() {
        let mut optimizer = AdaGrad::new(1, 0.1);
        let first = optimizer.calculate_update(&[2.0]).unwrap()[0];
        let second = optimizer.calculate_update(&[2.0]).unwrap()[0];
        // first step is η regardless of the gradient scale
        assert_abs_diff_eq!(first, 0.1, epsilon = 1e-8);
        assert_abs_diff_eq!(second, 0.1 / 2f64.sqrt(), epsilon = 1e-8);
    }
}
