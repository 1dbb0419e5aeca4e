//! Versioned JSON archives of networks
//!
//! An archive stores each layer's topology ([`LayerConfig`]) and every
//! parameter tensor by name, plus the training settings of the strategy that
//! saved it. `serde_json` writes `f64` values with full round-trip precision,
//! so a restored network computes exactly the same outputs.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "name": "mlp",
//!   "loss": "cross_entropy",
//!   "optimizer": {"kind": "adam", "learning_rate": 0.001, "weight_decay": 0.0},
//!   "layers": [
//!     {"name": "Linear",
//!      "config": {"layer_type": "linear", "inputs": 2, "outputs": 1},
//!      "parameters": [{"name": "W", "values": [0.5, -0.25]}, {"name": "b", "values": [0.0]}]}
//!   ]
//! }
//! ```

use crate::architecture::{build_layer, LayerConfig};
use crate::error::{NetworkError, Result};
use crate::layers::Layer;
use crate::loss::LossKind;
use crate::network::MultiLayerNeuralNetwork;
use crate::optimizers::OptimizerKind;
use crate::utils::SimpleRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Version written by this crate; other versions are rejected on load.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkArchive {
    pub format_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<LossKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<OptimizerArchive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hebbian_learning_rate: Option<f64>,
    pub layers: Vec<LayerArchive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerArchive {
    pub kind: OptimizerKind,
    pub learning_rate: f64,
    pub weight_decay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerArchive {
    pub name: String,
    pub config: LayerConfig,
    pub parameters: Vec<ParameterArchive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterArchive {
    pub name: String,
    pub values: Vec<f64>,
}

impl NetworkArchive {
    /// Captures topology and parameter values of `network`.
    pub fn from_network(network: &MultiLayerNeuralNetwork) -> Self {
        let layers = network
            .layers()
            .iter()
            .map(|layer| LayerArchive {
                name: layer.name().to_string(),
                config: layer.config(),
                parameters: layer
                    .parameters()
                    .iter()
                    .map(|p| ParameterArchive {
                        name: p.name().to_string(),
                        values: p.values().to_vec(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            name: network.name().to_string(),
            loss: None,
            optimizer: None,
            hebbian_learning_rate: None,
            layers,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads and decodes an archive.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Format` when the content is not an
    /// archive of a supported version.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let archive: NetworkArchive = serde_json::from_str(&contents)
            .map_err(|e| NetworkError::Format(format!("{}: {}", path.display(), e)))?;
        if archive.format_version != FORMAT_VERSION {
            return Err(NetworkError::Format(format!(
                "unsupported format version {} (expected {})",
                archive.format_version, FORMAT_VERSION
            )));
        }
        Ok(archive)
    }

    /// Rebuilds the network and copies every stored tensor into it.
    ///
    /// Either the whole network is restored or `Format` is returned.
    pub fn restore_network(&self) -> Result<MultiLayerNeuralNetwork> {
        // Initial values are overwritten, the seed only has to be fixed.
        let mut rng = SimpleRng::new(0);
        let mut network = MultiLayerNeuralNetwork::new(self.name.clone());
        for (index, entry) in self.layers.iter().enumerate() {
            let layer = restore_layer(entry, &mut rng)
                .map_err(|e| NetworkError::Format(format!("layer {} '{}': {}", index, entry.name, e)))?;
            network
                .push_layer(layer)
                .map_err(|e| NetworkError::Format(format!("layer {} '{}': {}", index, entry.name, e)))?;
        }
        Ok(network)
    }
}

fn restore_layer(entry: &LayerArchive, rng: &mut SimpleRng) -> Result<Box<dyn Layer>> {
    let mut layer = build_layer(&entry.config, rng)?;
    layer.set_name(&entry.name);

    let parameters = layer.parameters_mut();
    if parameters.len() != entry.parameters.len() {
        return Err(NetworkError::Format(format!(
            "expected {} parameter tensors, found {}",
            parameters.len(),
            entry.parameters.len()
        )));
    }
    for (parameter, stored) in parameters.iter_mut().zip(&entry.parameters) {
        if parameter.name() != stored.name {
            return Err(NetworkError::Format(format!(
                "expected parameter '{}', found '{}'",
                parameter.name(),
                stored.name
            )));
        }
        parameter.set_values(&stored.values)?;
    }
    layer.after_update();
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Linear, SparseLinear};

    fn network() -> MultiLayerNeuralNetwork {
        let mut rng = SimpleRng::new(8);
        let mut network = MultiLayerNeuralNetwork::new("archive");
        network
            .push_layer(Box::new(SparseLinear::new(3, 4, 0.5, &mut rng).unwrap()))
            .unwrap();
        network
            .push_layer(Box::new(Linear::new(4, 2, &mut rng).unwrap().with_name("out")))
            .unwrap();
        network
    }

    #[test]
    fn test_archive_captures_parameters() {
        let archive = NetworkArchive::from_network(&network());
        assert_eq!(archive.format_version, FORMAT_VERSION);
        assert_eq!(archive.layers.len(), 2);
        let names: Vec<_> = archive.layers[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["W", "b", "mask"]);
        assert_eq!(archive.layers[1].name, "out");
    }

    #[test]
    fn test_restore_reproduces_values() {
        let original = network();
        let restored = NetworkArchive::from_network(&original).restore_network().unwrap();
        for (a, b) in original.layers().iter().zip(restored.layers()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.parameters(), b.parameters());
        }
    }

    #[test]
    fn test_restore_rejects_wrong_length() {
        let mut archive = NetworkArchive::from_network(&network());
        archive.layers[1].parameters[0].values.pop();
        assert!(matches!(archive.restore_network(), Err(NetworkError::Format(_))));
    }

    #[test]
    fn test_restore_rejects_missing_tensor() {
        let mut archive = NetworkArchive::from_network(&network());
        archive.layers[0].parameters.truncate(2);
        assert!(matches!(archive.restore_network(), Err(NetworkError::Format(_))));
    }
}
