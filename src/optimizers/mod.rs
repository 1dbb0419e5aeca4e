//! Optimizer abstractions for neural network parameter updates
//!
//! This module provides the Optimizer trait and implementations for different
//! optimization algorithms used to update neural network parameters during training.
//!
//! # Overview
//!
//! Optimizers turn gradients into parameter updates. Every optimizer instance
//! is bound to one parameter tensor: its state vectors are sized like the tensor
//! and allocated at construction. The update `u` is computed first and then
//! applied as `p = (1 - decay) * p - u`, where `decay` is an optional weight
//! decay factor.
//!
//! # Available Optimizers
//!
//! - GradientDescent: vanilla gradient descent
//! - Momentum: gradient descent with a velocity term
//! - AdaGrad, AdaDelta, RMSProp: per-element adaptive learning rates
//! - Adam: adaptive moment estimation with bias correction
//! - AdamID: Adam moments with an integral-derivative controlled numerator
//! - GradPID, AdaGradPID: PID controllers acting on the gradient signal
//!
//! # Example
//!
//! ```ignore
//! use mlnn::optimizers::{Optimizer, OptimizerKind};
//!
//! let mut optimizer = OptimizerKind::Adam.build(weights.len(), 0.001);
//!
//! // Update parameters after computing gradients
//! optimizer.update(&mut weights, &gradients, 0.0)?;
//! ```

pub mod adadelta;
pub mod adagrad;
pub mod adagrad_pid;
pub mod adam;
pub mod adam_id;
pub mod array;
pub mod grad_pid;
pub mod gradient_descent;
pub mod momentum;
pub mod rmsprop;

pub use adadelta::AdaDelta;
pub use adagrad::AdaGrad;
pub use adagrad_pid::AdaGradPID;
pub use adam::Adam;
pub use adam_id::AdamID;
pub use array::OptimizationArray;
pub use grad_pid::GradPID;
pub use gradient_descent::GradientDescent;
pub use momentum::Momentum;
pub use rmsprop::RMSProp;

use crate::error::{ensure_len, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Guard added to every denominator.
pub const EPSILON: f64 = 1e-8;

/// Selectable optimization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizerKind {
    #[serde(rename = "gradient_descent")]
    GradientDescent,
    #[serde(rename = "momentum")]
    Momentum,
    #[serde(rename = "adagrad")]
    AdaGrad,
    #[serde(rename = "adadelta")]
    AdaDelta,
    #[serde(rename = "rmsprop")]
    RMSProp,
    #[serde(rename = "adam")]
    Adam,
    #[serde(rename = "adam_id")]
    AdamID,
    #[serde(rename = "grad_pid")]
    GradPID,
    #[serde(rename = "adagrad_pid")]
    AdaGradPID,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 9] = [
        OptimizerKind::GradientDescent,
        OptimizerKind::Momentum,
        OptimizerKind::AdaGrad,
        OptimizerKind::AdaDelta,
        OptimizerKind::RMSProp,
        OptimizerKind::Adam,
        OptimizerKind::AdamID,
        OptimizerKind::GradPID,
        OptimizerKind::AdaGradPID,
    ];

    /// Learning rate used when none is configured.
    pub fn default_learning_rate(self) -> f64 {
        match self {
            OptimizerKind::GradientDescent => 0.001,
            OptimizerKind::Momentum => 0.001,
            OptimizerKind::AdaGrad => 0.01,
            OptimizerKind::AdaDelta => 1.0,
            OptimizerKind::RMSProp => 0.001,
            OptimizerKind::Adam => 0.001,
            OptimizerKind::AdamID => 0.1,
            OptimizerKind::GradPID => 0.01,
            OptimizerKind::AdaGradPID => 0.01,
        }
    }

    /// Builds an optimizer bound to a tensor of `size` values.
    pub fn build(self, size: usize, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::GradientDescent => Box::new(GradientDescent::new(size, learning_rate)),
            OptimizerKind::Momentum => Box::new(Momentum::new(size, learning_rate)),
            OptimizerKind::AdaGrad => Box::new(AdaGrad::new(size, learning_rate)),
            OptimizerKind::AdaDelta => Box::new(AdaDelta::new(size, learning_rate)),
            OptimizerKind::RMSProp => Box::new(RMSProp::new(size, learning_rate)),
            OptimizerKind::Adam => Box::new(Adam::new(size, learning_rate)),
            OptimizerKind::AdamID => Box::new(AdamID::new(size, learning_rate)),
            OptimizerKind::GradPID => Box::new(GradPID::new(size, learning_rate)),
            OptimizerKind::AdaGradPID => Box::new(AdaGradPID::new(size, learning_rate)),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Core trait for neural network optimizers.
///
/// All optimizer types implement this trait to provide a uniform interface
/// for parameter updates during training.
///
/// # State Management
///
/// Some optimizers maintain internal state across updates:
/// - Momentum estimates
/// - Adaptive learning rate statistics
/// - Previous gradients and integral terms
/// - Time step counters
///
/// The state belongs to exactly one parameter tensor and is never shared.
///
/// # Example
///
/// ```ignore
/// let mut optimizer = OptimizerKind::Momentum.build(layer_weights.len(), 0.01);
///
/// // In training loop:
/// for epoch in 0..num_epochs {
///     // Forward pass and backward pass accumulate gradients
///     network.backward(&grad_output)?;
///
///     // Update parameters using optimizer
///     optimizer.update(&mut weights, &weight_gradients, 0.0)?;
/// }
/// ```
pub trait Optimizer {
    /// Computes the update to subtract from the parameters.
    ///
    /// Advances the internal state; the returned slice stays valid until the
    /// next call.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when `gradients` is not sized like the bound tensor.
    fn calculate_update(&mut self, gradients: &[f64]) -> Result<&[f64]>;

    /// Update parameters using gradients.
    ///
    /// Applies `parameter = (1 - decay) * parameter - update` in place.
    ///
    /// # Arguments
    ///
    /// * `parameters` - Mutable slice of parameters to update (weights or biases)
    /// * `gradients` - Gradient of loss with respect to each parameter
    /// * `decay` - Weight decay factor in [0, 1); 0 disables decay
    fn update(&mut self, parameters: &mut [f64], gradients: &[f64], decay: f64) -> Result<()> {
        ensure_len("optimizer parameters", gradients.len(), parameters.len())?;
        let delta = self.calculate_update(gradients)?;
        for (p, u) in parameters.iter_mut().zip(delta) {
            *p = (1.0 - decay) * *p - u;
        }
        Ok(())
    }

    /// Reset optimizer state.
    ///
    /// Clears accumulated momentum, adaptive statistics, previous gradients
    /// and step counters. For stateless optimizers this is a no-op.
    fn reset(&mut self);

    /// Get the learning rate for this optimizer.
    fn learning_rate(&self) -> f64;

    /// Set the learning rate for this optimizer.
    fn set_learning_rate(&mut self, learning_rate: f64);

    fn kind(&self) -> OptimizerKind;

    /// Number of values of the bound tensor.
    fn size(&self) -> usize;
}

/// Length check shared by every `calculate_update`.
pub(crate) fn check_gradients(kind: OptimizerKind, expected: usize, gradients: &[f64]) -> Result<()> {
    ensure_len(&format!("{} gradients", kind), expected, gradients.len())
}

/// Zeroes every value of each state vector.
pub(crate) fn clear(states: &mut [&mut Vec<f64>]) {
    for state in states.iter_mut() {
        state.iter_mut().for_each(|v| *v = 0.0);
    }
}
