//! AdaDelta optimizer implementation

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind, EPSILON};

pub const DEFAULT_DECAY: f64 = 0.9;

/// AdaDelta: the step size is the ratio of the running RMS of past updates to
/// the running RMS of gradients, times the learning rate (1 by default).
///
/// ```text
/// E[g²] = ρ * E[g²] + (1 - ρ) * g²
/// u     = η * g * √(E[Δ²] + ε) / √(E[g²] + ε)
/// E[Δ²] = ρ * E[Δ²] + (1 - ρ) * u²
/// ```
pub struct AdaDelta {
    learning_rate: f64,
    rho: f64,
    mean_square_gradient: Vec<f64>,
    mean_square_delta: Vec<f64>,
    delta: Vec<f64>,
}

impl AdaDelta {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            rho: DEFAULT_DECAY,
            mean_square_gradient: vec![0.0; size],
            mean_square_delta: vec![0.0; size],
            delta: vec![0.0; size],
        }
    }

    pub fn with_decay(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }
}

impl Optimizer for AdaDelta {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        let rho = self.rho;
        for (i, &g) in gradients.iter().enumerate() {
            let eg = &mut self.mean_square_gradient[i];
            *eg = rho * *eg + (1.0 - rho) * g * g;
            let ed = &mut self.mean_square_delta[i];
            let u = self.learning_rate * g * (*ed + EPSILON).sqrt()
                / (self.mean_square_gradient[i] + EPSILON).sqrt();
            *ed = rho * *ed + (1.0 - rho) * u * u;
            self.delta[i] = u;
        }
        Ok(&self.delta)
    }

    fn reset(&mut self) {
        clear(&mut [
            &mut self.mean_square_gradient,
            &mut self.mean_square_delta,
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
        OptimizerKind::AdaDelta
    }

    fn size(&self) -> usize {
        self.delta.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_steps_are_small_and_grow() {
        let mut optimizer = AdaDelta::new(1, 1.0);
        let first = optimizer.calculate_update(&[1.0]).unwrap()[0];
        let second = optimizer.calculate_update(&[1.0]).unwrap()[0];
        assert!(first > 0.0 && first < 1e-3);
        assert!(second > first);
    }
}
