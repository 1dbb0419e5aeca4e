//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that all layer types implement,
//! together with the [`LayerKind`] tag identifying each variant.

use crate::architecture::LayerConfig;
use crate::error::{NetworkError, Result};
use crate::layers::store::{Buffers, Parameter, Shape};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of layer variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    ReLU,
    Sigmoid,
    ELU,
    Linear,
    SparseLinear,
    Convolution,
    Padding,
    Cropping,
    MaxPooling,
    Softmax,
    Dropout,
    HebbianLinear,
    BinaryCorrelator,
    ConvHebbian,
}

impl LayerKind {
    /// True for the elementwise activation family.
    pub fn is_activation(&self) -> bool {
        matches!(self, LayerKind::ReLU | LayerKind::Sigmoid | LayerKind::ELU)
    }

    /// True for layers trained by a local correlation rule.
    pub fn is_hebbian(&self) -> bool {
        matches!(
            self,
            LayerKind::HebbianLinear | LayerKind::BinaryCorrelator | LayerKind::ConvHebbian
        )
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Core trait for neural network layers.
///
/// A layer owns its parameters, its gradient accumulators and the activation
/// buffers of the current batch. Data moves between layers as flat slices of
/// `batch_size × sample_size` values.
///
/// # Example
///
/// ```ignore
/// layer.resize_batch(batch_size);
/// layer.forward(&input, false)?;
/// let output = layer.output();
///
/// layer.backward(&grad_output)?;
/// let grad_input = layer.input_gradient();
/// ```
pub trait Layer {
    /// Variant tag.
    fn kind(&self) -> LayerKind;

    /// Human readable name used in diagnostics.
    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// Activation buffers of the current batch.
    fn buffers(&self) -> &Buffers;

    fn buffers_mut(&mut self) -> &mut Buffers;

    /// Forward propagation through the layer.
    ///
    /// Caches the input and fills the output buffer.
    ///
    /// # Arguments
    ///
    /// * `input` - Input batch (batch_size × input_size)
    /// * `test` - Evaluation mode; disables stochastic behaviour such as dropout
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when `input` does not hold exactly one batch.
    fn forward(&mut self, input: &[f64], test: bool) -> Result<()>;

    /// Backward propagation through the layer.
    ///
    /// Computes the gradient with respect to the input of the last forward
    /// call and adds the parameter gradients to the accumulators.
    ///
    /// # Arguments
    ///
    /// * `grad_output` - Gradient of the loss w.r.t. the layer output (batch_size × output_size)
    fn backward(&mut self, grad_output: &[f64]) -> Result<()>;

    /// Output of the last forward call.
    fn output(&self) -> &[f64] {
        &self.buffers().y
    }

    /// Input gradient produced by the last backward call.
    fn input_gradient(&self) -> &[f64] {
        &self.buffers().dx
    }

    fn input_shape(&self) -> Shape {
        self.buffers().input_shape()
    }

    fn output_shape(&self) -> Shape {
        self.buffers().output_shape()
    }

    /// Number of input values per sample.
    fn input_size(&self) -> usize {
        self.input_shape().size()
    }

    /// Number of output values per sample.
    fn output_size(&self) -> usize {
        self.output_shape().size()
    }

    fn batch_size(&self) -> usize {
        self.buffers().batch_size()
    }

    /// Reallocates batch-dependent buffers; does nothing when unchanged.
    fn resize_batch(&mut self, batch_size: usize) {
        self.buffers_mut().resize_batch(batch_size);
    }

    /// Parameter tensors, trainable ones and fixed masks alike.
    fn parameters(&self) -> &[Parameter] {
        &[]
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut []
    }

    /// Total number of learnable values.
    fn parameter_count(&self) -> usize {
        self.parameters()
            .iter()
            .filter(|p| p.is_trainable())
            .map(Parameter::len)
            .sum()
    }

    /// Zeroes all accumulated parameter gradients.
    fn reset_grads(&mut self) {
        for parameter in self.parameters_mut() {
            parameter.zero_gradients();
        }
    }

    /// Re-applies structural constraints after the parameters changed.
    fn after_update(&mut self) {}

    fn is_hebbian(&self) -> bool {
        self.kind().is_hebbian()
    }

    /// Applies the layer's local learning rule to the last forward pass.
    fn hebbian_update(&mut self, _learning_rate: f64) -> Result<()> {
        if self.is_hebbian() {
            return Err(NetworkError::config(format!(
                "Hebbian layer '{}' does not define a learning rule",
                self.name()
            )));
        }
        Ok(())
    }

    /// Topology description used for persistence.
    fn config(&self) -> LayerConfig;
}
