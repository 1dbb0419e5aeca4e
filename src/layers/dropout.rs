//! Dropout layer implementation for regularization
//!
//! This module provides a Dropout layer that randomly drops (sets to zero) a
//! fraction of input units during training to prevent overfitting. In
//! evaluation mode (`test == true`) all units are kept and the input is passed
//! through unchanged.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, NetworkError, Result};
use crate::layers::store::{Buffers, Shape};
use crate::layers::{Layer, LayerKind};
use crate::utils::rng::SimpleRng;

/// Dropout layer for regularization.
///
/// During training, each unit is dropped with probability `drop_rate` and the
/// survivors are scaled by 1/(1-drop_rate) to keep the expected value. The
/// mask is regenerated on every training forward pass and reused by the
/// backward pass.
///
/// # Fields
///
/// * `drop_rate` - Probability of dropping each unit (0.0 = no dropout)
/// * `mask` - Scale applied to each unit in the last forward pass (0 or 1/(1-drop_rate))
/// * `rng` - Private random stream for mask generation
///
/// # Example
///
/// ```ignore
/// use mlnn::layers::{Dropout, Shape};
/// use mlnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = Dropout::new(Shape::flat(512), 0.5, &mut rng)?;
/// assert_eq!(layer.parameter_count(), 0);
/// ```
pub struct Dropout {
    name: String,
    drop_rate: f64,
    mask: Vec<f64>,
    rng: SimpleRng,
    buffers: Buffers,
}

impl Dropout {
    /// Creates a new dropout layer with specified shape and drop rate.
    ///
    /// # Arguments
    ///
    /// * `shape` - Shape of the input (and output)
    /// * `drop_rate` - Probability of dropping each unit, in [0.0, 1.0)
    /// * `rng` - Random number generator the layer derives its own stream from
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when `shape` is empty or `drop_rate` is
    /// outside [0.0, 1.0).
    pub fn new(shape: Shape, drop_rate: f64, rng: &mut SimpleRng) -> Result<Self> {
        ensure_positive("Dropout", "shape size", shape.size())?;
        if !(0.0..1.0).contains(&drop_rate) {
            return Err(NetworkError::config(format!(
                "drop_rate must be in range [0.0, 1.0), got {}",
                drop_rate
            )));
        }

        Ok(Self {
            name: "Dropout".to_string(),
            drop_rate,
            mask: vec![1.0; shape.size()],
            rng: rng.fork(),
            buffers: Buffers::new(shape, shape),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the dropout rate.
    pub fn drop_rate(&self) -> f64 {
        self.drop_rate
    }

    /// Mask used by the last forward pass.
    pub fn mask(&self) -> &[f64] {
        &self.mask
    }
}

impl Layer for Dropout {
    fn kind(&self) -> LayerKind {
        LayerKind::Dropout
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut Buffers {
        &mut self.buffers
    }

    fn resize_batch(&mut self, batch_size: usize) {
        if self.buffers.resize_batch(batch_size) {
            self.mask = vec![1.0; self.buffers.input_shape().size() * batch_size];
        }
    }

    fn forward(&mut self, input: &[f64], test: bool) -> Result<()> {
        self.buffers.store_input(&self.name, input)?;

        if test {
            // Evaluation mode: pass through unchanged
            self.mask.iter_mut().for_each(|m| *m = 1.0);
        } else {
            let scale = 1.0 / (1.0 - self.drop_rate);
            for m in self.mask.iter_mut() {
                *m = if self.rng.next_f64() >= self.drop_rate {
                    scale
                } else {
                    0.0
                };
            }
        }

        for ((y, &x), &m) in self.buffers.y.iter_mut().zip(input).zip(&self.mask) {
            *y = x * m;
        }
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        for ((dx, &g), &m) in self.buffers.dx.iter_mut().zip(grad_output).zip(&self.mask) {
            *dx = g * m;
        }
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Dropout {
            shape: self.input_shape(),
            drop_rate: self.drop_rate,
        }
    }
}
