//! Gradient PID optimizer implementation

use crate::error::Result;
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind};

pub const DEFAULT_DECAY: f64 = 0.9;

/// Treats the gradient as the error signal of a PID controller.
///
/// ```text
/// I = ρ * I + (1 - ρ) * g
/// u = Kp * g + Ki * I + Kd * (g - g_prev)
/// ```
///
/// with gains derived from the learning rate: `Kp = η⁴`, `Ki = η`, `Kd = η³`.
pub struct GradPID {
    learning_rate: f64,
    rho: f64,
    integral: Vec<f64>,
    previous: Vec<f64>,
    delta: Vec<f64>,
}

impl GradPID {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            rho: DEFAULT_DECAY,
            integral: vec![0.0; size],
            previous: vec![0.0; size],
            delta: vec![0.0; size],
        }
    }

    /// Proportional, integral and derivative gains.
    pub fn gains(&self) -> (f64, f64, f64) {
        let eta = self.learning_rate;
        (eta.powi(4), eta, eta.powi(3))
    }
}

impl Optimizer for GradPID {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        let (kp, ki, kd) = self.gains();
        for (i, &g) in gradients.iter().enumerate() {
            self.integral[i] = self.rho * self.integral[i] + (1.0 - self.rho) * g;
            self.delta[i] = kp * g + ki * self.integral[i] + kd * (g - self.previous[i]);
            self.previous[i] = g;
        }
        Ok(&self.delta)
    }

    fn reset(&mut self) {
        clear(&mut [&mut self.integral, &mut self.previous, &mut self.delta]);
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::GradPID
    }

    fn size(&self) -> usize {
        self.delta.len()
    }
}
