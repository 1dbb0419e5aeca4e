//! Elementwise activation layers (ReLU, Sigmoid, ELU)
//!
//! Activation layers keep the shape of their input and have no parameters.
//! The backward pass multiplies the incoming gradient by the derivative
//! evaluated at the cached output.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, Result};
use crate::layers::store::{Buffers, Shape};
use crate::layers::{Layer, LayerKind};
use crate::utils::activations::{elu, elu_derivative, relu, relu_derivative, sigmoid, sigmoid_derivative};
use serde::{Deserialize, Serialize};

/// Supported elementwise nonlinearities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Relu,
    Sigmoid,
    Elu,
}

impl ActivationFunction {
    fn apply(self, x: f64) -> f64 {
        match self {
            ActivationFunction::Relu => relu(x),
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::Elu => elu(x),
        }
    }

    fn derivative(self, y: f64) -> f64 {
        match self {
            ActivationFunction::Relu => relu_derivative(y),
            ActivationFunction::Sigmoid => sigmoid_derivative(y),
            ActivationFunction::Elu => elu_derivative(y),
        }
    }

    fn kind(self) -> LayerKind {
        match self {
            ActivationFunction::Relu => LayerKind::ReLU,
            ActivationFunction::Sigmoid => LayerKind::Sigmoid,
            ActivationFunction::Elu => LayerKind::ELU,
        }
    }
}

/// Elementwise activation layer.
///
/// # Example
///
/// ```ignore
/// use mlnn::layers::{Activation, Shape};
///
/// let layer = Activation::relu(Shape::new(28, 28, 1)).unwrap();
/// assert_eq!(layer.output_shape(), Shape::new(28, 28, 1));
/// ```
pub struct Activation {
    name: String,
    function: ActivationFunction,
    buffers: Buffers,
}

impl Activation {
    /// # Errors
    ///
    /// `InvalidConfiguration` when `shape` holds no elements.
    pub fn new(function: ActivationFunction, shape: Shape) -> Result<Self> {
        let name = format!("{}", function.kind());
        ensure_positive(&name, "shape size", shape.size())?;
        Ok(Self {
            name,
            function,
            buffers: Buffers::new(shape, shape),
        })
    }

    pub fn relu(shape: Shape) -> Result<Self> {
        Self::new(ActivationFunction::Relu, shape)
    }

    pub fn sigmoid(shape: Shape) -> Result<Self> {
        Self::new(ActivationFunction::Sigmoid, shape)
    }

    pub fn elu(shape: Shape) -> Result<Self> {
        Self::new(ActivationFunction::Elu, shape)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn function(&self) -> ActivationFunction {
        self.function
    }
}

impl Layer for Activation {
    fn kind(&self) -> LayerKind {
        self.function.kind()
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

    fn forward(&mut self, input: &[f64], _test: bool) -> Result<()> {
        self.buffers.store_input(&self.name, input)?;
        let function = self.function;
        for (y, &x) in self.buffers.y.iter_mut().zip(input) {
            *y = function.apply(x);
        }
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let function = self.function;
        let Buffers { y, dx, .. } = &mut self.buffers;
        for ((dx, &y), &dy) in dx.iter_mut().zip(y.iter()).zip(grad_output) {
            *dx = dy * function.derivative(y);
        }
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Activation {
            function: self.function,
            shape: self.input_shape(),
        }
    }
}
