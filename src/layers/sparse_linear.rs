//! Sparsely connected fully connected layer
//!
//! SparseLinear behaves like [`Linear`](crate::layers::Linear) but only a random
//! subset of the weights exists. The connectivity pattern is a fixed binary
//! mask stored as a non-trainable parameter so it survives save/load.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, NetworkError, Result};
use crate::layers::linear::{matmul_backward, matmul_forward, BIAS, WEIGHTS};
use crate::layers::store::{Buffers, Parameter, Shape};
use crate::layers::{Layer, LayerKind};
use crate::utils::SimpleRng;

const MASK: usize = 2;

/// Fully connected layer with a fixed sparsity mask on its weights.
///
/// Masked weights are zero after construction, receive zero gradient and are
/// zeroed again after every optimizer step.
pub struct SparseLinear {
    name: String,
    inputs: usize,
    outputs: usize,
    connectivity: f64,
    parameters: Vec<Parameter>,
    buffers: Buffers,
}

impl SparseLinear {
    /// Creates the layer; every weight is kept with probability `connectivity`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when a dimension is zero or unless
    /// `0 < connectivity <= 1`.
    pub fn new(inputs: usize, outputs: usize, connectivity: f64, rng: &mut SimpleRng) -> Result<Self> {
        ensure_positive("SparseLinear", "inputs", inputs)?;
        ensure_positive("SparseLinear", "outputs", outputs)?;
        if !(connectivity > 0.0 && connectivity <= 1.0) {
            return Err(NetworkError::config(format!(
                "SparseLinear connectivity must be in (0, 1], got {}",
                connectivity
            )));
        }

        let mut weights = Parameter::new("W", outputs, inputs);
        rng.fill_xavier(weights.values_mut(), inputs, outputs);
        let bias = Parameter::new("b", outputs, 1);
        let mut mask = Parameter::fixed("mask", outputs, inputs);
        for m in mask.values_mut() {
            *m = if rng.next_f64() < connectivity { 1.0 } else { 0.0 };
        }

        let mut layer = Self {
            name: "SparseLinear".to_string(),
            inputs,
            outputs,
            connectivity,
            parameters: vec![weights, bias, mask],
            buffers: Buffers::new(Shape::flat(inputs), Shape::flat(outputs)),
        };
        layer.apply_mask();
        Ok(layer)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn connectivity(&self) -> f64 {
        self.connectivity
    }

    pub fn weights(&self) -> &Parameter {
        &self.parameters[WEIGHTS]
    }

    pub fn mask(&self) -> &Parameter {
        &self.parameters[MASK]
    }

    /// Number of existing (unmasked) connections.
    pub fn active_connections(&self) -> usize {
        self.parameters[MASK].values.iter().filter(|&&m| m != 0.0).count()
    }

    fn apply_mask(&mut self) {
        let (head, tail) = self.parameters.split_at_mut(MASK);
        let mask = &tail[0].values;
        for (w, m) in head[WEIGHTS].values.iter_mut().zip(mask) {
            *w *= m;
        }
    }
}

impl Layer for SparseLinear {
    fn kind(&self) -> LayerKind {
        LayerKind::SparseLinear
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
        let (weights, rest) = self.parameters.split_at_mut(BIAS);
        let (bias, mask) = rest.split_at_mut(1);
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
        for (g, m) in weights.gradients.iter_mut().zip(&mask[0].values) {
            *g *= m;
        }
        Ok(())
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    fn after_update(&mut self) {
        self.apply_mask();
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::SparseLinear {
            inputs: self.inputs,
            outputs: self.outputs,
            connectivity: self.connectivity,
        }
    }
}
