//! Fully connected layer trained by a local learning rule

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, NetworkError, Result};
use crate::layers::linear::{matmul_forward, WEIGHTS};
use crate::layers::store::{Buffers, Parameter, Shape};
use crate::layers::{Layer, LayerKind};
use crate::learning::{LearningRule, LearningRuleKind};
use crate::utils::SimpleRng;

/// `y = W·x` without bias, updated by a [`LearningRule`] instead of gradients.
///
/// The layer has no gradient path; backpropagation networks refuse it.
pub struct HebbianLinear {
    name: String,
    inputs: usize,
    outputs: usize,
    rule: Box<dyn LearningRule>,
    parameters: Vec<Parameter>,
    buffers: Buffers,
}

impl HebbianLinear {
    /// Creates the layer with Xavier-initialised weights and the plain
    /// Hebbian rule.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when either dimension is zero.
    pub fn new(inputs: usize, outputs: usize, rng: &mut SimpleRng) -> Result<Self> {
        ensure_positive("HebbianLinear", "inputs", inputs)?;
        ensure_positive("HebbianLinear", "outputs", outputs)?;
        let mut weights = Parameter::new("W", outputs, inputs);
        rng.fill_xavier(weights.values_mut(), inputs, outputs);

        Ok(Self {
            name: "HebbianLinear".to_string(),
            inputs,
            outputs,
            rule: LearningRuleKind::Hebbian.build(),
            parameters: vec![weights],
            buffers: Buffers::new(Shape::flat(inputs), Shape::flat(outputs)),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rule(mut self, rule: LearningRuleKind) -> Self {
        self.rule = rule.build();
        self
    }

    pub fn rule(&self) -> LearningRuleKind {
        self.rule.kind()
    }

    pub fn weights(&self) -> &Parameter {
        &self.parameters[WEIGHTS]
    }

    pub fn weights_mut(&mut self) -> &mut Parameter {
        &mut self.parameters[WEIGHTS]
    }
}

impl Layer for HebbianLinear {
    fn kind(&self) -> LayerKind {
        LayerKind::HebbianLinear
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
            None,
            input,
            &mut self.buffers.y,
            self.inputs,
            self.outputs,
        );
        Ok(())
    }

    fn backward(&mut self, _grad_output: &[f64]) -> Result<()> {
        Err(NetworkError::BackwardUnsupported(self.name.clone()))
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    fn hebbian_update(&mut self, learning_rate: f64) -> Result<()> {
        let Buffers { x, y, .. } = &self.buffers;
        let samples = self.buffers.batch_size();
        self.rule.update(
            &mut self.parameters[WEIGHTS].values,
            self.outputs,
            self.inputs,
            x,
            y,
            samples,
            learning_rate,
        );
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::HebbianLinear {
            inputs: self.inputs,
            outputs: self.outputs,
            rule: self.rule.kind(),
        }
    }
}
