//! AdaGrad-normalised PID optimizer implementation

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind, EPSILON};

pub const DEFAULT_DECAY: f64 = 0.9;

/// PID control of the gradient with unit gains, scaled by the learning rate
/// and normalised per element like AdaGrad.
///
/// ```text
/// G = G + g²
/// I = ρ * I + (1 - ρ) * g
/// u = η * (g + I + (g - g_prev)) / (√G + ε)
/// ```
pub struct AdaGradPID {
    learning_rate: f64,
    rho: f64,
    accumulator: Vec<f64>,
    integral: Vec<f64>,
    previous: Vec<f64>,
    delta: Vec<f64>,
}

impl AdaGradPID {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            rho: DEFAULT_DECAY,
            accumulator: vec![0.0; size],
            integral: vec![0.0; size],
            previous: vec![0.0; size],
            delta: vec![0.0; size],
        }
    }
}

impl Optimizer for AdaGradPID {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        for (i, &g) in gradients.iter().enumerate() {
            self.accumulator[i] += g * g;
            self.integral[i] = self.rho * self.integral[i] + (1.0 - self.rho) * g;
            let control = g + self.integral[i] + (g - self.previous[i]);
            self.delta[i] = self.learning_rate * control / (self.accumulator[i].sqrt() + EPSILON);
            self.previous[i] = g;
        }
        Ok(&self.delta)
    }

    fn reset(&mut self) {
        clear(&mut [
            &mut self.accumulator,
            &mut self.integral,
            &mut self.previous,
            &mut self.delta,
        ]);
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::AdaGradPID
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
    fn test_first_step() {
        let mut optimizer = AdaGradPID::new(1, 0.01);
        // G = 4, I = 0.2, control = 2 + 0.2 + 2
        let u = optimizer.calculate_update(&[2.0]).unwrap()[0];
        assert_abs_diff_eq!(u, 0.01 * 4.2 / 2.0, epsilon = 1e-9);
    }
}
