//! Gradient-based training of a layer chain

use crate::architecture::{build_network, ArchitectureConfig};
use crate::config::TrainingConfig;
use crate::error::{ensure_learning_rate, NetworkError, Result};
use crate::layers::{Layer, LayerKind};
use crate::loss::{Loss, LossKind};
use crate::network::{MultiLayerNeuralNetwork, Trainer};
use crate::optimizers::{OptimizationArray, OptimizerKind};
use crate::persistence::{NetworkArchive, OptimizerArchive};
use crate::utils::SimpleRng;
use log::{info, trace, warn};
use std::path::Path;

/// A network trained by backpropagation with a loss and one optimizer per
/// parameter tensor.
///
/// Every layer gets an [`OptimizationArray`] when it is pushed; replacing the
/// optimizer rebuilds all arrays and discards their state.
///
/// # Example
///
/// ```ignore
/// let mut net = BackpropagationNeuralNetwork::new("mlp");
/// net.push_layer(Box::new(Linear::new(784, 128, &mut rng)?))?;
/// net.push_layer(Box::new(Activation::relu(Shape::flat(128))?))?;
/// net.push_layer(Box::new(Linear::new(128, 10, &mut rng)?))?;
/// net.push_layer(Box::new(Softmax::new(10)?))?;
/// net.set_optimization(OptimizerKind::Adam, 0.001)?;
///
/// for (images, labels) in batches {
///     let loss = net.train(images, labels)?;
/// }
/// ```
pub struct BackpropagationNeuralNetwork {
    network: MultiLayerNeuralNetwork,
    loss: Box<dyn Loss>,
    optimizer: OptimizerKind,
    learning_rate: f64,
    weight_decay: f64,
    optimizers: Vec<OptimizationArray>,
}

impl BackpropagationNeuralNetwork {
    /// Empty network with cross-entropy loss and plain gradient descent.
    pub fn new(name: impl Into<String>) -> Self {
        let optimizer = OptimizerKind::GradientDescent;
        Self {
            network: MultiLayerNeuralNetwork::new(name),
            loss: LossKind::CrossEntropy.build(),
            optimizer,
            learning_rate: optimizer.default_learning_rate(),
            weight_decay: 0.0,
            optimizers: Vec::new(),
        }
    }

    /// Takes over an assembled network.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the network contains a Hebbian layer.
    pub fn from_network(mut network: MultiLayerNeuralNetwork) -> Result<Self> {
        let mut trainer = Self::new(network.name());
        for layer in network.pop_layer(network.len()) {
            trainer.push_layer(layer)?;
        }
        Ok(trainer)
    }

    /// Builds the network described by `architecture` and configures loss
    /// and optimizer from `training`. Weights are initialised from
    /// `training.seed`.
    pub fn from_config(
        name: &str,
        architecture: &ArchitectureConfig,
        training: &TrainingConfig,
    ) -> Result<Self> {
        training.validate()?;
        let mut rng = SimpleRng::new(training.seed);
        let network = build_network(name, architecture, &mut rng)?;
        let mut trainer = Self::from_network(network)?;
        trainer.set_loss(training.loss);
        trainer.set_optimization(training.optimizer, training.learning_rate())?;
        trainer.set_weight_decay(training.weight_decay)?;
        Ok(trainer)
    }

    pub fn network(&self) -> &MultiLayerNeuralNetwork {
        &self.network
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut (dyn Layer + 'static)> {
        self.network.layer_mut(index)
    }

    pub fn loss(&self) -> LossKind {
        self.loss.kind()
    }

    pub fn set_loss(&mut self, kind: LossKind) {
        self.loss = kind.build();
    }

    pub fn optimizer(&self) -> OptimizerKind {
        self.optimizer
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Replaces the optimizer of every layer; accumulated optimizer state is lost.
    pub fn set_optimization(&mut self, kind: OptimizerKind, learning_rate: f64) -> Result<()> {
        ensure_learning_rate(learning_rate)?;
        self.optimizer = kind;
        self.learning_rate = learning_rate;
        self.optimizers = self
            .network
            .layers()
            .iter()
            .map(|l| OptimizationArray::for_layer(&**l, kind, learning_rate))
            .collect();
        info!(
            "network '{}': optimizer {} with learning rate {}",
            self.network.name(),
            kind,
            learning_rate
        );
        Ok(())
    }

    pub fn weight_decay(&self) -> f64 {
        self.weight_decay
    }

    /// Sets the factor by which parameters shrink at every update, in `[0, 1)`.
    pub fn set_weight_decay(&mut self, weight_decay: f64) -> Result<()> {
        if !(0.0..1.0).contains(&weight_decay) {
            return Err(NetworkError::config(format!(
                "weight decay must be in [0, 1), got {}",
                weight_decay
            )));
        }
        self.weight_decay = weight_decay;
        Ok(())
    }

    /// Appends a layer and allocates its optimizers.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for Hebbian layers, which have no backward pass;
    /// `ShapeMismatch` when the layer does not connect.
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        if layer.is_hebbian() {
            return Err(NetworkError::config(format!(
                "Hebbian layer '{}' ({}) cannot be trained by backpropagation",
                layer.name(),
                layer.kind()
            )));
        }
        let optimizers = OptimizationArray::for_layer(&*layer, self.optimizer, self.learning_rate);
        self.network.push_layer(layer)?;
        self.optimizers.push(optimizers);
        Ok(())
    }

    /// Removes the last `count` layers together with their optimizer state.
    pub fn pop_layer(&mut self, count: usize) -> Vec<Box<dyn Layer>> {
        let popped = self.network.pop_layer(count);
        self.optimizers.truncate(self.network.len());
        popped
    }

    pub fn forward(&mut self, batch: &[f64], test: bool) -> Result<&[f64]> {
        self.network.forward(batch, test)
    }

    /// Propagates a gradient with respect to the network output back through
    /// every layer, accumulating parameter gradients.
    pub fn backward(&mut self, gradient: &[f64]) -> Result<&[f64]> {
        self.network.backward(gradient)
    }

    /// Applies one optimizer step to every layer, re-applies structural
    /// constraints and clears the gradients.
    ///
    /// # Errors
    ///
    /// `NonFinite` when any accumulated gradient is NaN or infinite; nothing
    /// is updated in that case and the gradients are cleared.
    pub fn update(&mut self) -> Result<()> {
        let broken = self
            .network
            .layers()
            .iter()
            .find(|l| l.parameters().iter().any(|p| p.is_trainable() && !p.gradients_are_finite()))
            .map(|l| l.name().to_string());
        if let Some(name) = broken {
            warn!("network '{}': non-finite gradient in layer '{}'", self.network.name(), name);
            self.network.reset_grads();
            return Err(NetworkError::NonFinite(format!("gradients of layer '{}'", name)));
        }

        let decay = self.weight_decay;
        for (layer, optimizers) in self.network.layers_mut().iter_mut().zip(self.optimizers.iter_mut()) {
            optimizers.update(&mut **layer, decay)?;
            layer.after_update();
        }
        self.network.reset_grads();
        Ok(())
    }

    /// One training step on a batch: forward, loss gradient, backward, update.
    ///
    /// Returns the mean loss of the batch before the update.
    pub fn train(&mut self, batch: &[f64], targets: &[f64]) -> Result<f64> {
        self.network.forward(batch, false)?;
        let batch_size = self.network.batch_size();
        let predictions = self.network.predictions();
        let loss = self.loss.calculate_loss(predictions, targets, batch_size)?;
        if !loss.is_finite() {
            warn!("network '{}': {} loss is {}", self.network.name(), self.loss.kind(), loss);
            return Err(NetworkError::NonFinite(format!("{} loss", self.loss.kind())));
        }

        let fused = self.loss.fuses_with_softmax()
            && self
                .network
                .layers()
                .last()
                .is_some_and(|l| l.kind() == LayerKind::Softmax);
        if fused {
            let gradient = self
                .loss
                .calculate_softmax_gradient(predictions, targets, batch_size)?;
            self.network.backward_skipping_last(&gradient)?;
        } else {
            let gradient = self.loss.calculate_gradient(predictions, targets, batch_size)?;
            self.network.backward(&gradient)?;
        }
        self.update()?;

        let mean = loss / batch_size as f64;
        trace!("network '{}': train loss {:.6}", self.network.name(), mean);
        Ok(mean)
    }

    /// Evaluation forward pass; returns the mean loss of the batch.
    pub fn test(&mut self, batch: &[f64], targets: &[f64]) -> Result<f64> {
        self.network.forward(batch, true)?;
        let mean = self.calculate_mean_loss(targets)?;
        trace!("network '{}': test loss {:.6}", self.network.name(), mean);
        Ok(mean)
    }

    /// Mean loss of the last forward pass against `targets`.
    pub fn calculate_mean_loss(&self, targets: &[f64]) -> Result<f64> {
        self.loss
            .calculate_mean_loss(self.network.predictions(), targets, self.network.batch_size())
    }

    /// Correctly classified samples of the last forward pass.
    pub fn count_correct_predictions(&self, targets: &[f64]) -> Result<usize> {
        self.network
            .count_correct_predictions(targets, self.network.predictions())
    }

    /// Writes topology, parameters, loss and optimizer settings to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut archive = NetworkArchive::from_network(&self.network);
        archive.loss = Some(self.loss.kind());
        archive.optimizer = Some(OptimizerArchive {
            kind: self.optimizer,
            learning_rate: self.learning_rate,
            weight_decay: self.weight_decay,
        });
        archive.write(path)?;
        info!(
            "saved network '{}' ({} layers) to {}",
            self.network.name(),
            self.network.len(),
            path.display()
        );
        Ok(())
    }

    /// Restores a network written by [`save`](Self::save). Optimizer state
    /// starts fresh.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let archive = NetworkArchive::read(path)?;
        let network = archive.restore_network()?;
        let mut trainer =
            Self::from_network(network).map_err(|e| NetworkError::Format(e.to_string()))?;
        if let Some(loss) = archive.loss {
            trainer.set_loss(loss);
        }
        if let Some(optimizer) = archive.optimizer {
            trainer
                .set_optimization(optimizer.kind, optimizer.learning_rate)
                .and_then(|_| trainer.set_weight_decay(optimizer.weight_decay))
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

impl Trainer for BackpropagationNeuralNetwork {
    fn network(&self) -> &MultiLayerNeuralNetwork {
        BackpropagationNeuralNetwork::network(self)
    }

    fn forward(&mut self, batch: &[f64], test: bool) -> Result<&[f64]> {
        BackpropagationNeuralNetwork::forward(self, batch, test)
    }

    fn update(&mut self) -> Result<()> {
        BackpropagationNeuralNetwork::update(self)
    }
}
