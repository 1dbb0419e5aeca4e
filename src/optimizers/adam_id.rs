//! AdamID optimizer implementation
//!
//! Adam's second moment normalisation combined with an integral-derivative
//! controller in the numerator.

use crate::error::Result;
use crate::optimizers::adam::{DEFAULT_BETA1, DEFAULT_BETA2};
use crate::optimizers::{check_gradients, clear, Optimizer, OptimizerKind, EPSILON};

/// Adam with an integral-derivative numerator.
///
/// The first moment `m` acts as the integral term and the gradient change as
/// the derivative term:
///
/// ```text
/// m = β1 * m + (1 - β1) * g
/// v = β2 * v + (1 - β2) * g²
/// u = (η * m + η² * (g - g_prev)) / (1 - β1^t) / (√(v / (1 - β2^t)) + ε)
/// ```
pub struct AdamID {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    previous: Vec<f64>,
    t: i32,
    delta: Vec<f64>,
}

impl AdamID {
    pub fn new(size: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            m: vec![0.0; size],
            v: vec![0.0; size],
            previous: vec![0.0; size],
            t: 0,
            delta: vec![0.0; size],
        }
    }
}

impl Optimizer for AdamID {
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]> {
        check_gradients(self.kind(), self.delta.len(), gradients)?;
        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);
        let (ki, kd) = (self.learning_rate, self.learning_rate * self.learning_rate);

        for (i, &g) in gradients.iter().enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let control = (ki * self.m[i] + kd * (g - self.previous[i])) / bias_correction1;
            let v_hat = self.v[i] / bias_correction2;
            self.delta[i] = control / (v_hat.sqrt() + EPSILON);
            self.previous[i] = g;
        }
        Ok(&self.delta)
    }

    fn reset(&mut self) {
        clear(&mut [&mut self.m, &mut self.v, &mut self.previous, &mut self.delta]);
        self.t = 0;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    fn kind(&self) -> OptimizerKind {
        OptimizerKind::AdamID
    }

    fn size(&self) -> usize {
        self.delta.len()
    }
}
