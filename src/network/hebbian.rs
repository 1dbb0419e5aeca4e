//! Local (Hebbian) training of a layer chain

use crate::error::{ensure_learning_rate, NetworkError, Result};
use crate::layers::Layer;
use crate::network::{MultiLayerNeuralNetwork, Trainer};
use crate::persistence::NetworkArchive;
use log::{info, warn};
use std::path::Path;

/// A network whose layers learn from their own input and output, without a
/// loss or a backward pass.
///
/// Only Hebbian layers and parameterless layers (activations, padding,
/// pooling, ...) can be part of it.
pub struct HebbianNeuralNetwork {
    network: MultiLayerNeuralNetwork,
    learning_rate: f64,
}

impl HebbianNeuralNetwork {
    /// # Errors
    ///
    /// `InvalidConfiguration` unless `learning_rate` is finite and positive.
    pub fn new(name: impl Into<String>, learning_rate: f64) -> Result<Self> {
        ensure_learning_rate(learning_rate)?;
        Ok(Self {
            network: MultiLayerNeuralNetwork::new(name),
            learning_rate,
        })
    }

    pub fn network(&self) -> &MultiLayerNeuralNetwork {
        &self.network
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut (dyn Layer + 'static)> {
        self.network.layer_mut(index)
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        ensure_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    /// Appends a layer.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for layers with learnable parameters but no
    /// local learning rule, `ShapeMismatch` when the layer does not connect.
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        if !layer.is_hebbian() && layer.parameter_count() > 0 {
            return Err(NetworkError::config(format!(
                "layer '{}' ({}) has parameters but no local learning rule",
                layer.name(),
                layer.kind()
            )));
        }
        self.network.push_layer(layer)
    }

    pub fn pop_layer(&mut self, count: usize) -> Vec<Box<dyn Layer>> {
        self.network.pop_layer(count)
    }

    pub fn forward(&mut self, batch: &[f64], test: bool) -> Result<&[f64]> {
        self.network.forward(batch, test)
    }

    /// Forward pass where every layer applies its learning rule right after
    /// computing its output. Returns the network output.
    ///
    /// # Errors
    ///
    /// `NonFinite` as soon as a learning rule leaves a NaN or infinite weight;
    /// the layers after it are not run.
    pub fn train(&mut self, batch: &[f64]) -> Result<&[f64]> {
        let learning_rate = self.learning_rate;
        self.network
            .forward_each(batch, false, |layer| learn(layer, learning_rate))
    }

    /// Evaluation forward pass without learning.
    pub fn test(&mut self, batch: &[f64]) -> Result<&[f64]> {
        self.network.forward(batch, true)
    }

    /// Applies every layer's learning rule to the activations of the last
    /// forward pass.
    pub fn update(&mut self) -> Result<()> {
        let learning_rate = self.learning_rate;
        for layer in self.network.layers_mut() {
            learn(&mut **layer, learning_rate)?;
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut archive = NetworkArchive::from_network(&self.network);
        archive.hebbian_learning_rate = Some(self.learning_rate);
        archive.write(path)?;
        info!(
            "saved network '{}' ({} layers) to {}",
            self.network.name(),
            self.network.len(),
            path.display()
        );
        Ok(())
    }

    /// Restores a network written by [`save`](Self::save).
    ///
    /// An archive without a Hebbian learning rate is rejected with `Format`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let archive = NetworkArchive::read(path)?;
        let learning_rate = archive.hebbian_learning_rate.ok_or_else(|| {
            NetworkError::Format("archive has no Hebbian learning rate".to_string())
        })?;
        let mut network = archive.restore_network()?;
        let mut trainer = Self::new(network.name(), learning_rate)
            .map_err(|e| NetworkError::Format(e.to_string()))?;
        for layer in network.pop_layer(network.len()) {
            trainer
                .push_layer(layer)
                .map_err(|e| NetworkError::Format(e.to_string()))?;
        }
        info!(
            "loaded network '{}' ({} layers) from {}",
            trainer.network.name(),
            trainer.network.len(),
            path.display()
        );
        Ok(trainer)
    }
}

fn learn(layer: &mut dyn Layer, learning_rate: f64) -> Result<()> {
    layer.hebbian_update(learning_rate)?;
    if layer.parameters().iter().any(|p| !p.values_are_finite()) {
        warn!("layer '{}': non-finite weights after local update", layer.name());
        return Err(NetworkError::NonFinite(format!("parameters of layer '{}'", layer.name())));
    }
    Ok(())
}

impl Trainer for HebbianNeuralNetwork {
    fn network(&self) -> &MultiLayerNeuralNetwork {
        HebbianNeuralNetwork::network(self)
    }

    fn forward(&mut self, batch: &[f64], test: bool) -> Result<&[f64]> {
        HebbianNeuralNetwork::forward(self, batch, test)
    }

    fn update(&mut self) -> Result<()> {
        HebbianNeuralNetwork::update(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Activation, BinaryCorrelator, HebbianLinear, Linear, Shape};
    use crate::utils::SimpleRng;

    #[test]
    fn test_rejects_parameterized_layer() {
        let mut rng = SimpleRng::new(1);
        let mut net = HebbianNeuralNetwork::new("h", 0.1).unwrap();
        let result = net.push_layer(Box::new(Linear::new(3, 2, &mut rng).unwrap()));
        assert!(matches!(result, Err(NetworkError::InvalidConfiguration(_))));
        net.push_layer(Box::new(Activation::relu(Shape::flat(3)).unwrap())).unwrap();
        net.push_layer(Box::new(HebbianLinear::new(3, 2, &mut rng).unwrap())).unwrap();
        assert_eq!(net.network().len(), 2);
    }

    #[test]
    fn test_train_changes_weights() {
        let mut rng = SimpleRng::new(4);
        let mut net = HebbianNeuralNetwork::new("h", 0.5).unwrap();
        net.push_layer(Box::new(HebbianLinear::new(2, 2, &mut rng).unwrap())).unwrap();
        let before = net.network().layers()[0].parameters()[0].values().to_vec();
        let output = net.train(&[1.0, 1.0]).unwrap().to_vec();
        assert_eq!(output.len(), 2);
        let after = net.network().layers()[0].parameters()[0].values().to_vec();
        // W += lr * y x^T with x = [1, 1]
        for (o, row) in after.chunks(2).enumerate() {
            for (i, w) in row.iter().enumerate() {
                let expected = before[o * 2 + i] + 0.5 * output[o];
                assert!((w - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_test_does_not_learn() {
        let mut rng = SimpleRng::new(4);
        let mut net = HebbianNeuralNetwork::new("h", 0.5).unwrap();
        net.push_layer(Box::new(BinaryCorrelator::new(4, 3, &mut rng).unwrap()))
            .unwrap();
        let before = net.network().layers()[0].parameters()[0].values().to_vec();
        let output = net.test(&[1.0, 0.0, 1.0, 1.0]).unwrap();
        assert!(output.iter().all(|&y| y == 0.0 || y == 1.0));
        assert_eq!(net.network().layers()[0].parameters()[0].values(), before.as_slice());
    }

    #[test]
    fn test_invalid_learning_rate() {
        for rate in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                HebbianNeuralNetwork::new("h", rate),
                Err(NetworkError::InvalidConfiguration(_))
            ));
        }
        let mut net = HebbianNeuralNetwork::new("h", 0.1).unwrap();
        assert!(net.set_learning_rate(f64::NAN).is_err());
        assert_eq!(net.learning_rate(), 0.1);
        net.set_learning_rate(0.2).unwrap();
        assert_eq!(net.learning_rate(), 0.2);
    }

    fn exploding_network() -> HebbianNeuralNetwork {
        let mut rng = SimpleRng::new(4);
        let mut net = HebbianNeuralNetwork::new("h", 1e300).unwrap();
        net.push_layer(Box::new(HebbianLinear::new(2, 2, &mut rng).unwrap())).unwrap();
        net.layer_mut(0).unwrap().parameters_mut()[0]
            .set_values(&[1.0; 4])
            .unwrap();
        net
    }

    #[test]
    fn test_train_reports_overflowing_weights() {
        let mut net = exploding_network();
        // y = 2e10, dW = 1e300 * 2e10 * 1e10 overflows
        let result = net.train(&[1e10, 1e10]);
        assert!(matches!(result, Err(NetworkError::NonFinite(_))));
    }

    #[test]
    fn test_update_reports_overflowing_weights() {
        let mut net = exploding_network();
        net.forward(&[1e10, 1e10], false).unwrap();
        assert!(matches!(net.update(), Err(NetworkError::NonFinite(_))));
    }
}

