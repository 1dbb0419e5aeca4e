//! Fully connected (Linear) layer implementation
//!
//! This module provides the Linear layer, which performs the transformation
//! `y = W·x + b` for every sample of a batch, and the matrix kernels shared
//! with the sparse and Hebbian fully connected variants.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, Result};
use crate::layers::store::{Buffers, Parameter, Shape};
use crate::layers::{Layer, LayerKind};
use crate::utils::SimpleRng;

pub(crate) const WEIGHTS: usize = 0;
pub(crate) const BIAS: usize = 1;

/// Linear (fully connected) layer with weights and biases.
///
/// Performs the linear transformation: y = W·x + b
/// where x is one input sample (inputs),
/// W is the weight matrix (outputs × inputs, row-major),
/// and b is the bias vector (outputs).
///
/// The backward pass accumulates
/// - `dW += dy · xᵀ` summed over the batch
/// - `db += dy` summed over the batch
///
/// and produces `dx = Wᵀ · dy`.
///
/// # Example
///
/// ```ignore
/// use mlnn::layers::Linear;
/// use mlnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = Linear::new(784, 512, &mut rng).unwrap();
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 512);
/// ```
pub struct Linear {
    name: String,
    inputs: usize,
    outputs: usize,
    parameters: Vec<Parameter>,
    buffers: Buffers,
}

impl Linear {
    /// Create a new Linear layer with Xavier initialization.
    ///
    /// Weights are sampled uniformly from [-limit, limit]
    /// where limit = sqrt(6 / (inputs + outputs)); biases start at zero.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Number of input features
    /// * `outputs` - Number of output features
    /// * `rng` - Random number generator for weight initialization
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when either dimension is zero.
    pub fn new(inputs: usize, outputs: usize, rng: &mut SimpleRng) -> Result<Self> {
        ensure_positive("Linear", "inputs", inputs)?;
        ensure_positive("Linear", "outputs", outputs)?;
        let mut weights = Parameter::new("W", outputs, inputs);
        rng.fill_xavier(weights.values_mut(), inputs, outputs);
        let bias = Parameter::new("b", outputs, 1);

        Ok(Self {
            name: "Linear".to_string(),
            inputs,
            outputs,
            parameters: vec![weights, bias],
            buffers: Buffers::new(Shape::flat(inputs), Shape::flat(outputs)),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn weights(&self) -> &Parameter {
        &self.parameters[WEIGHTS]
    }

    pub fn weights_mut(&mut self) -> &mut Parameter {
        &mut self.parameters[WEIGHTS]
    }

    pub fn bias(&self) -> &Parameter {
        &self.parameters[BIAS]
    }

    pub fn bias_mut(&mut self) -> &mut Parameter {
        &mut self.parameters[BIAS]
    }
}

/// `y_s = W·x_s (+ b)` for every sample `s`.
pub(crate) fn matmul_forward(
    weights: &[f64],
    bias: Option<&[f64]>,
    x: &[f64],
    y: &mut [f64],
    inputs: usize,
    outputs: usize,
) {
    for (xs, ys) in x.chunks_exact(inputs).zip(y.chunks_exact_mut(outputs)) {
        for (o, out) in ys.iter_mut().enumerate() {
            let row = &weights[o * inputs..(o + 1) * inputs];
            let mut sum = bias.map_or(0.0, |b| b[o]);
            for (w, xi) in row.iter().zip(xs) {
                sum += w * xi;
            }
            *out = sum;
        }
    }
}

/// Accumulates `dW += dy·xᵀ` (and `db += dy`) and writes `dx = Wᵀ·dy`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn matmul_backward(
    weights: &[f64],
    weight_grads: &mut [f64],
    mut bias_grads: Option<&mut [f64]>,
    x: &[f64],
    dy: &[f64],
    dx: &mut [f64],
    inputs: usize,
    outputs: usize,
) {
    dx.iter_mut().for_each(|v| *v = 0.0);
    for ((xs, dys), dxs) in x
        .chunks_exact(inputs)
        .zip(dy.chunks_exact(outputs))
        .zip(dx.chunks_exact_mut(inputs))
    {
        for (o, &g) in dys.iter().enumerate() {
            if let Some(db) = bias_grads.as_deref_mut() {
                db[o] += g;
            }
            let row = o * inputs;
            for i in 0..inputs {
                weight_grads[row + i] += g * xs[i];
                dxs[i] += weights[row + i] * g;
            }
        }
    }
}

impl Layer for Linear {
    fn kind(&self) -> LayerKind {
        LayerKind::Linear
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
        matmul_forward(
            &self.parameters[WEIGHTS].values,
            Some(self.parameters[BIAS].values.as_slice()),
            input,
            &mut self.buffers.y,
            self.inputs,
            self.outputs,
        );
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let (weights, bias) = self.parameters.split_at_mut(BIAS);
        let weights = &mut weights[WEIGHTS];
        matmul_backward(
            &weights.values,
            &mut weights.gradients,
            Some(bias[0].gradients.as_mut_slice()),
            &self.buffers.x,
            grad_output,
            &mut self.buffers.dx,
            self.inputs,
            self.outputs,
        );
        Ok(())
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Linear {
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }
}
