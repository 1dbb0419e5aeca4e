//! Per-layer collection of optimizers

use crate::error::{NetworkError, Result};
use crate::layers::Layer;
use crate::optimizers::{Optimizer, OptimizerKind};

/// One optimizer per trainable parameter tensor of a layer, keyed by the
/// parameter's name.
///
/// Works for every layer kind: the array only looks at the layer's parameter
/// list, so Linear weights, convolution filters and biases are all handled by
/// the same code.
pub struct OptimizationArray {
    kind: OptimizerKind,
    entries: Vec<(String, Box<dyn Optimizer>)>,
}

impl OptimizationArray {
    /// Allocates optimizer state for every trainable parameter of `layer`.
    pub fn for_layer(layer: &dyn Layer, kind: OptimizerKind, learning_rate: f64) -> Self {
        let entries = layer
            .parameters()
            .iter()
            .filter(|p| p.is_trainable())
            .map(|p| (p.name().to_string(), kind.build(p.len(), learning_rate)))
            .collect();
        Self { kind, entries }
    }

    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Optimizer bound to the parameter called `name`.
    pub fn get(&self, name: &str) -> Option<&dyn Optimizer> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o.as_ref())
    }

    /// Applies one optimizer step to every trainable parameter of `layer`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the layer's parameters no longer match the
    /// array, `ShapeMismatch` when a tensor changed size.
    pub fn update(&mut self, layer: &mut dyn Layer, decay: f64) -> Result<()> {
        let layer_name = layer.name().to_string();
        let mut optimizers = self.entries.iter_mut();
        for parameter in layer.parameters_mut().iter_mut().filter(|p| p.is_trainable()) {
            let (name, optimizer) = optimizers.next().ok_or_else(|| {
                NetworkError::config(format!(
                    "no optimizer for parameter '{}' of layer '{}'",
                    parameter.name(),
                    layer_name
                ))
            })?;
            if name != parameter.name() {
                return Err(NetworkError::config(format!(
                    "optimizer for '{}' applied to parameter '{}' of layer '{}'",
                    name,
                    parameter.name(),
                    layer_name
                )));
            }
            let (values, gradients) = parameter.split_mut();
            optimizer.update(values, gradients, decay)?;
        }
        Ok(())
    }

    /// Clears the state of every optimizer.
    pub fn reset(&mut self) {
        for (_, optimizer) in self.entries.iter_mut() {
            optimizer.reset();
        }
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        for (_, optimizer) in self.entries.iter_mut() {
            optimizer.set_learning_rate(learning_rate);
        }
    }
}
