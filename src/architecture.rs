//! Architecture configuration structures
//!
//! This module provides configuration structures for defining neural network architectures
//! via JSON configuration files, and the builder that turns them into layers. The same
//! [`LayerConfig`] description is what every layer reports about itself, so it also
//! serves as the topology part of saved networks.

use crate::error::{NetworkError, Result};
use crate::layers::binary_correlator::{DEFAULT_PERMANENCE_THRESHOLD, DEFAULT_PROXIMAL_THRESHOLD};
use crate::layers::{
    Activation, ActivationFunction, BinaryCorrelator, ConvHebbian, Convolution, Cropping, Dropout,
    HebbianLinear, Layer, Linear, MaxPooling, Padding, Shape, Softmax, SparseLinear,
};
use crate::learning::LearningRuleKind;
use crate::network::MultiLayerNeuralNetwork;
use crate::utils::rng::SimpleRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_stride() -> usize {
    1
}

fn default_hebbian_rule() -> LearningRuleKind {
    LearningRuleKind::Hebbian
}

fn default_conv_hebbian_rule() -> LearningRuleKind {
    LearningRuleKind::NormalizedZerosumHebbian
}

fn default_permanence_threshold() -> f64 {
    DEFAULT_PERMANENCE_THRESHOLD
}

fn default_proximal_threshold() -> f64 {
    DEFAULT_PROXIMAL_THRESHOLD
}

/// Configuration for a single layer in the neural network.
///
/// The `layer_type` tag selects the variant; the remaining fields are the
/// explicit shape parameters of that layer. Shapes are written as
/// `{"height": H, "width": W, "depth": D}`.
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "linear",
///   "inputs": 784,
///   "outputs": 512
/// }
/// ```
///
/// ```json
/// {
///   "layer_type": "convolution",
///   "input": {"height": 28, "width": 28, "depth": 1},
///   "filter_size": 5,
///   "filters": 8,
///   "stride": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer_type", rename_all = "snake_case")]
pub enum LayerConfig {
    Activation {
        function: ActivationFunction,
        shape: Shape,
    },
    Linear {
        inputs: usize,
        outputs: usize,
    },
    SparseLinear {
        inputs: usize,
        outputs: usize,
        /// Probability that a connection exists, in (0, 1]
        connectivity: f64,
    },
    Convolution {
        input: Shape,
        filter_size: usize,
        filters: usize,
        #[serde(default = "default_stride")]
        stride: usize,
    },
    Padding {
        input: Shape,
        padding: usize,
    },
    Cropping {
        input: Shape,
        cropping: usize,
    },
    MaxPooling {
        input: Shape,
        window_size: usize,
    },
    Softmax {
        size: usize,
    },
    Dropout {
        shape: Shape,
        /// Probability of dropping units, range [0.0, 1.0)
        drop_rate: f64,
    },
    HebbianLinear {
        inputs: usize,
        outputs: usize,
        #[serde(default = "default_hebbian_rule")]
        rule: LearningRuleKind,
    },
    BinaryCorrelator {
        inputs: usize,
        outputs: usize,
        #[serde(default = "default_permanence_threshold")]
        permanence_threshold: f64,
        #[serde(default = "default_proximal_threshold")]
        proximal_threshold: f64,
    },
    ConvHebbian {
        input: Shape,
        filter_size: usize,
        filters: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default = "default_conv_hebbian_rule")]
        rule: LearningRuleKind,
    },
}

/// A layer description with an optional display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub layer: LayerConfig,
}

impl From<LayerConfig> for LayerSpec {
    fn from(layer: LayerConfig) -> Self {
        Self { name: None, layer }
    }
}

/// Configuration for the entire neural network architecture.
///
/// Contains a sequence of layer configurations that define the network structure.
/// Layers are applied in the order they appear in the configuration.
///
/// # Example
///
/// ```json
/// {
///   "layers": [
///     {"layer_type": "linear", "name": "hidden", "inputs": 784, "outputs": 256},
///     {"layer_type": "activation", "function": "sigmoid",
///      "shape": {"height": 256, "width": 1, "depth": 1}},
///     {"layer_type": "dropout", "drop_rate": 0.2,
///      "shape": {"height": 256, "width": 1, "depth": 1}},
///     {"layer_type": "linear", "inputs": 256, "outputs": 10},
///     {"layer_type": "softmax", "size": 10}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerSpec>,
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into an
/// `ArchitectureConfig` and validates it.
///
/// # Errors
///
/// `Io` when the file cannot be read, `Json` when it is not a valid
/// description, and `InvalidConfiguration`/`ShapeMismatch` when the layers
/// cannot be built or do not connect.
pub fn load_architecture(path: impl AsRef<Path>) -> Result<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - Architecture has at least one layer
/// - Every layer can be constructed from its parameters
/// - Layer connections are valid (output size of layer i matches input size of layer i+1)
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<()> {
    if config.layers.is_empty() {
        return Err(NetworkError::config("architecture must have at least one layer"));
    }
    let mut rng = SimpleRng::new(0);
    build_network("validation", config, &mut rng).map(|_| ())
}

/// Builds a single layer from its configuration.
///
/// # Arguments
///
/// * `config` - Layer description
/// * `rng` - Random number generator for weight initialization
///
/// # Errors
///
/// `InvalidConfiguration` when a size is zero or the layer rejects its
/// parameters.
pub fn build_layer(config: &LayerConfig, rng: &mut SimpleRng) -> Result<Box<dyn Layer>> {
    let layer: Box<dyn Layer> = match *config {
        LayerConfig::Activation { function, shape } => Box::new(Activation::new(function, shape)?),
        LayerConfig::Linear { inputs, outputs } => Box::new(Linear::new(inputs, outputs, rng)?),
        LayerConfig::SparseLinear {
            inputs,
            outputs,
            connectivity,
        } => Box::new(SparseLinear::new(inputs, outputs, connectivity, rng)?),
        LayerConfig::Convolution {
            input,
            filter_size,
            filters,
            stride,
        } => Box::new(Convolution::new(input, filter_size, filters, stride, rng)?),
        LayerConfig::Padding { input, padding } => Box::new(Padding::new(input, padding)?),
        LayerConfig::Cropping { input, cropping } => Box::new(Cropping::new(input, cropping)?),
        LayerConfig::MaxPooling { input, window_size } => Box::new(MaxPooling::new(input, window_size)?),
        LayerConfig::Softmax { size } => Box::new(Softmax::new(size)?),
        LayerConfig::Dropout { shape, drop_rate } => Box::new(Dropout::new(shape, drop_rate, rng)?),
        LayerConfig::HebbianLinear {
            inputs,
            outputs,
            rule,
        } => Box::new(HebbianLinear::new(inputs, outputs, rng)?.with_rule(rule)),
        LayerConfig::BinaryCorrelator {
            inputs,
            outputs,
            permanence_threshold,
            proximal_threshold,
        } => {
            Box::new(
                BinaryCorrelator::new(inputs, outputs, rng)?
                    .with_thresholds(permanence_threshold, proximal_threshold)?,
            )
        }
        LayerConfig::ConvHebbian {
            input,
            filter_size,
            filters,
            stride,
            rule,
        } => Box::new(ConvHebbian::new(input, filter_size, filters, stride, rng)?.with_rule(rule)),
    };
    Ok(layer)
}

/// Builds a neural network from an architecture configuration.
///
/// Each layer is initialized with the parameters from its description and
/// uses the provided RNG for weight initialization. Named layers keep their
/// names; the others are named after their kind.
///
/// # Examples
///
/// ```no_run
/// use mlnn::architecture::{build_network, load_architecture};
/// use mlnn::utils::rng::SimpleRng;
///
/// let config = load_architecture("architectures/mlp.json").unwrap();
/// let mut rng = SimpleRng::new(42);
/// let network = build_network("mlp", &config, &mut rng).unwrap();
/// assert_eq!(network.len(), config.layers.len());
/// ```
pub fn build_network(
    name: &str,
    config: &ArchitectureConfig,
    rng: &mut SimpleRng,
) -> Result<MultiLayerNeuralNetwork> {
    let mut network = MultiLayerNeuralNetwork::new(name);
    for (i, spec) in config.layers.iter().enumerate() {
        let mut layer = build_layer(&spec.layer, rng).map_err(|e| match e {
            NetworkError::InvalidConfiguration(message) => {
                NetworkError::InvalidConfiguration(format!("layer {}: {}", i, message))
            }
            other => other,
        })?;
        if let Some(name) = &spec.name {
            layer.set_name(name);
        }
        network.push_layer(layer)?;
    }
    Ok(network)
}
