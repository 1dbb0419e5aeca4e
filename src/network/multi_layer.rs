//! Ordered chain of layers driven as one network

use crate::error::{ensure_len, NetworkError, Result};
use crate::layers::{Layer, Shape};
use crate::persistence::NetworkArchive;
use crate::utils::activations::argmax;
use log::{debug, info};
use std::fmt;
use std::path::Path;

/// A sequence of layers where the output of layer `i` feeds layer `i + 1`.
///
/// The network owns its layers exclusively and keeps every layer at the same
/// batch size. Sizes are checked when a layer is pushed: the number of values
/// produced per sample by the current last layer must equal the number of
/// values the new layer consumes per sample.
pub struct MultiLayerNeuralNetwork {
    name: String,
    layers: Vec<Box<dyn Layer>>,
    batch_size: usize,
}

impl MultiLayerNeuralNetwork {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
            batch_size: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a layer after checking that it connects to the current last layer.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the layer's input size differs from the output
    /// size of the last layer.
    pub fn push_layer(&mut self, mut layer: Box<dyn Layer>) -> Result<()> {
        if let Some(last) = self.layers.last() {
            if last.output_size() != layer.input_size() {
                return Err(NetworkError::shape(
                    format!(
                        "connection '{}' ({}) -> '{}' ({})",
                        last.name(),
                        last.output_shape(),
                        layer.name(),
                        layer.input_shape()
                    ),
                    last.output_size(),
                    layer.input_size(),
                ));
            }
        }
        layer.resize_batch(self.batch_size);
        self.layers.push(layer);
        Ok(())
    }

    /// Removes the last `count` layers and returns them in network order.
    pub fn pop_layer(&mut self, count: usize) -> Vec<Box<dyn Layer>> {
        let keep = self.layers.len().saturating_sub(count);
        self.layers.split_off(keep)
    }

    pub fn layer(&self, index: usize) -> Option<&dyn Layer> {
        self.layers.get(index).map(|l| &**l)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut (dyn Layer + 'static)> {
        self.layers.get_mut(index).map(|l| &mut **l)
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn input_shape(&self) -> Option<Shape> {
        self.layers.first().map(|l| l.input_shape())
    }

    pub fn output_shape(&self) -> Option<Shape> {
        self.layers.last().map(|l| l.output_shape())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total number of learnable values over all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Resizes every layer to `batch_size` samples. Repeated calls with the
    /// same size leave the buffers untouched.
    pub fn resize_batch(&mut self, batch_size: usize) {
        if batch_size != self.batch_size {
            debug!("network '{}': batch size {} -> {}", self.name, self.batch_size, batch_size);
        }
        self.batch_size = batch_size;
        for layer in self.layers.iter_mut() {
            layer.resize_batch(batch_size);
        }
    }

    pub fn reset_grads(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.reset_grads();
        }
    }

    /// Output of the last forward pass; empty for an empty network.
    pub fn predictions(&self) -> &[f64] {
        self.layers.last().map(|l| l.output()).unwrap_or(&[])
    }

    /// Runs `batch` through every layer and returns the last output.
    ///
    /// The batch size is derived from the input length, which must be a
    /// positive multiple of the first layer's input size.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for an empty network, `ShapeMismatch` for a
    /// malformed batch.
    pub fn forward(&mut self, batch: &[f64], test: bool) -> Result<&[f64]> {
        self.forward_each(batch, test, |_| Ok(()))
    }

    /// Forward fold calling `after` on every layer right after its forward.
    pub(crate) fn forward_each<F>(&mut self, batch: &[f64], test: bool, mut after: F) -> Result<&[f64]>
    where
        F: FnMut(&mut dyn Layer) -> Result<()>,
    {
        let input_size = match self.layers.first() {
            Some(first) => first.input_size(),
            None => {
                return Err(NetworkError::config(format!(
                    "network '{}' has no layers",
                    self.name
                )))
            }
        };
        if batch.is_empty() || input_size == 0 || batch.len() % input_size != 0 {
            let expected = (batch.len() / input_size.max(1)).max(1) * input_size;
            return Err(NetworkError::shape(
                format!("network '{}' input batch", self.name),
                expected,
                batch.len(),
            ));
        }
        self.resize_batch(batch.len() / input_size);

        let Some((first, rest)) = self.layers.split_first_mut() else {
            return Ok(&[]);
        };
        debug!("forward '{}' {} -> {}", first.name(), first.input_shape(), first.output_shape());
        first.forward(batch, test)?;
        after(&mut **first)?;
        let mut previous: &dyn Layer = &**first;
        for layer in rest.iter_mut() {
            debug!("forward '{}' {} -> {}", layer.name(), layer.input_shape(), layer.output_shape());
            layer.forward(previous.output(), test)?;
            after(&mut **layer)?;
            previous = &**layer;
        }
        Ok(previous.output())
    }

    /// Propagates `gradient` (with respect to the network output) back
    /// through every layer and returns the gradient with respect to the
    /// network input.
    pub fn backward(&mut self, gradient: &[f64]) -> Result<&[f64]> {
        if self.layers.is_empty() {
            return Err(NetworkError::config(format!(
                "network '{}' has no layers",
                self.name
            )));
        }
        backward_fold(&mut self.layers, gradient)?;
        Ok(self.input_gradient())
    }

    /// Backward pass where `gradient` is already the gradient with respect to
    /// the input of the last layer, e.g. a softmax fused with its loss.
    pub(crate) fn backward_skipping_last(&mut self, gradient: &[f64]) -> Result<&[f64]> {
        let Some((last, rest)) = self.layers.split_last_mut() else {
            return Err(NetworkError::config(format!(
                "network '{}' has no layers",
                self.name
            )));
        };
        ensure_len(
            &format!("'{}' input gradient", last.name()),
            last.buffers().dx.len(),
            gradient.len(),
        )?;
        last.buffers_mut().dx.copy_from_slice(gradient);
        backward_fold(rest, last.input_gradient())?;
        Ok(self.input_gradient())
    }

    fn input_gradient(&self) -> &[f64] {
        self.layers.first().map(|l| l.input_gradient()).unwrap_or(&[])
    }

    /// Number of samples whose predicted class (arg-max) matches the target class.
    pub fn count_correct_predictions(&self, targets: &[f64], predictions: &[f64]) -> Result<usize> {
        ensure_len("predicted classes", targets.len(), predictions.len())?;
        let size = self.layers.last().map(|l| l.output_size()).unwrap_or(0);
        if size == 0 {
            return Err(NetworkError::config(format!(
                "network '{}' has no output",
                self.name
            )));
        }
        if predictions.len() % size != 0 {
            return Err(NetworkError::shape(
                format!("network '{}' predictions", self.name),
                predictions.len() / size * size,
                predictions.len(),
            ));
        }
        Ok(predictions
            .chunks_exact(size)
            .zip(targets.chunks_exact(size))
            .filter(|(p, t)| argmax(p) == argmax(t))
            .count())
    }

    /// Writes topology and parameters to `path` as a JSON archive.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        NetworkArchive::from_network(self).write(path)?;
        info!("saved network '{}' ({} layers) to {}", self.name, self.len(), path.display());
        Ok(())
    }

    /// Restores a network written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Format` when its content is not a
    /// valid archive.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let network = NetworkArchive::read(path)?.restore_network()?;
        info!("loaded network '{}' ({} layers) from {}", network.name, network.len(), path.display());
        Ok(network)
    }
}

/// Reverse fold: the last layer receives `gradient`, every other layer the
/// input gradient of its successor.
fn backward_fold(layers: &mut [Box<dyn Layer>], gradient: &[f64]) -> Result<()> {
    let Some((last, rest)) = layers.split_last_mut() else {
        return Ok(());
    };
    debug!("backward '{}' {} <- {}", last.name(), last.input_shape(), last.output_shape());
    last.backward(gradient)?;
    let mut next: &dyn Layer = &**last;
    for layer in rest.iter_mut().rev() {
        debug!("backward '{}' {} <- {}", layer.name(), layer.input_shape(), layer.output_shape());
        layer.backward(next.input_gradient())?;
        next = &**layer;
    }
    Ok(())
}

impl fmt::Display for MultiLayerNeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network '{}' (batch size {})", self.name, self.batch_size)?;
        for (i, layer) in self.layers.iter().enumerate() {
            writeln!(
                f,
                "  {:>2}: {:<16} {:<16} {} -> {}  params: {}",
                i,
                layer.name(),
                layer.kind(),
                layer.input_shape(),
                layer.output_shape(),
                layer.parameter_count()
            )?;
        }
        write!(f, "Total parameters: {}", self.parameter_count())
    }
}
