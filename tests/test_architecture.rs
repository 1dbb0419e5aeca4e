//! Tests for architecture parsing and building
//!
//! This file tests the architecture module including:
//! - Loading valid JSON architecture configs
//! - Parsing every layer type and its defaults
//! - Building networks from configs
//! - Handling invalid JSON and missing files
//! - Validating layer parameters and connections

use mlnn::architecture::{
    build_layer, build_network, load_architecture, validate_architecture, ArchitectureConfig,
    LayerConfig,
};
use mlnn::layers::{ActivationFunction, LayerKind, Shape};
use mlnn::learning::LearningRuleKind;
use mlnn::network::BackpropagationNeuralNetwork;
use mlnn::utils::SimpleRng;
use mlnn::NetworkError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

const CNN: &str = r#"{
  "layers": [
    {"layer_type": "padding", "input": {"height": 6, "width": 6, "depth": 1}, "padding": 1},
    {"layer_type": "convolution", "name": "features",
     "input": {"height": 8, "width": 8, "depth": 1}, "filter_size": 3, "filters": 4},
    {"layer_type": "activation", "function": "relu", "shape": {"height": 6, "width": 6, "depth": 4}},
    {"layer_type": "cropping", "input": {"height": 6, "width": 6, "depth": 4}, "cropping": 1},
    {"layer_type": "max_pooling", "input": {"height": 4, "width": 4, "depth": 4}, "window_size": 2},
    {"layer_type": "dropout", "shape": {"height": 2, "width": 2, "depth": 4}, "drop_rate": 0.25},
    {"layer_type": "sparse_linear", "inputs": 16, "outputs": 8, "connectivity": 0.5},
    {"layer_type": "activation", "function": "elu", "shape": {"height": 8, "width": 1, "depth": 1}},
    {"layer_type": "linear", "inputs": 8, "outputs": 3},
    {"layer_type": "softmax", "size": 3}
  ]
}"#;

// ============================================================================
// Valid Architecture Loading Tests
// ============================================================================

mod valid_architecture_tests {
    use super::*;

    #[test]
    fn test_load_convolutional_network() {
        let file = write_temp_config(CNN);
        let config = load_architecture(file.path()).unwrap();
        assert_eq!(config.layers.len(), 10);
        assert_eq!(config.layers[1].name.as_deref(), Some("features"));
        assert_eq!(
            config.layers[1].layer,
            LayerConfig::Convolution {
                input: Shape::new(8, 8, 1),
                filter_size: 3,
                filters: 4,
                stride: 1,
            }
        );

        let mut rng = SimpleRng::new(42);
        let network = build_network("cnn", &config, &mut rng).unwrap();
        let kinds: Vec<LayerKind> = network.layers().iter().map(|l| l.kind()).collect();
        assert_eq!(
            kinds,
            [
                LayerKind::Padding,
                LayerKind::Convolution,
                LayerKind::ReLU,
                LayerKind::Cropping,
                LayerKind::MaxPooling,
                LayerKind::Dropout,
                LayerKind::SparseLinear,
                LayerKind::ELU,
                LayerKind::Linear,
                LayerKind::Softmax,
            ]
        );
        assert_eq!(network.layers()[1].name(), "features");
        assert_eq!(network.output_shape(), Some(Shape::flat(3)));
    }

    #[test]
    fn test_load_hebbian_network_with_defaults() {
        let file = write_temp_config(
            r#"{
  "layers": [
    {"layer_type": "conv_hebbian", "input": {"height": 5, "width": 5, "depth": 1},
     "filter_size": 3, "filters": 2},
    {"layer_type": "hebbian_linear", "inputs": 18, "outputs": 6},
    {"layer_type": "binary_correlator", "inputs": 6, "outputs": 2}
  ]
}"#,
        );
        let config = load_architecture(file.path()).unwrap();
        assert_eq!(
            config.layers[0].layer,
            LayerConfig::ConvHebbian {
                input: Shape::new(5, 5, 1),
                filter_size: 3,
                filters: 2,
                stride: 1,
                rule: LearningRuleKind::NormalizedZerosumHebbian,
            }
        );
        assert_eq!(
            config.layers[1].layer,
            LayerConfig::HebbianLinear {
                inputs: 18,
                outputs: 6,
                rule: LearningRuleKind::Hebbian,
            }
        );
        assert_eq!(
            config.layers[2].layer,
            LayerConfig::BinaryCorrelator {
                inputs: 6,
                outputs: 2,
                permanence_threshold: 0.5,
                proximal_threshold: 0.5,
            }
        );
    }

    #[test]
    fn test_explicit_learning_rule() {
        let file = write_temp_config(
            r#"{"layers": [{"layer_type": "hebbian_linear", "inputs": 4, "outputs": 2,
                           "rule": "normalized_hebbian"}]}"#,
        );
        let config = load_architecture(file.path()).unwrap();
        let mut rng = SimpleRng::new(1);
        let layer = build_layer(&config.layers[0].layer, &mut rng).unwrap();
        assert_eq!(layer.config(), config.layers[0].layer);
    }

    #[test]
    fn test_single_layer() {
        let config = ArchitectureConfig {
            layers: vec![LayerConfig::Softmax { size: 10 }.into()],
        };
        assert!(validate_architecture(&config).is_ok());
    }

    #[test]
    fn test_built_layers_describe_themselves() {
        let file = write_temp_config(CNN);
        let config = load_architecture(file.path()).unwrap();
        let mut rng = SimpleRng::new(7);
        let network = build_network("cnn", &config, &mut rng).unwrap();
        for (layer, spec) in network.layers().iter().zip(&config.layers) {
            assert_eq!(layer.config(), spec.layer);
        }
    }

    #[test]
    fn test_same_seed_same_network() {
        let file = write_temp_config(CNN);
        let config = load_architecture(file.path()).unwrap();
        let a = build_network("a", &config, &mut SimpleRng::new(5)).unwrap();
        let b = build_network("b", &config, &mut SimpleRng::new(5)).unwrap();
        for (x, y) in a.layers().iter().zip(b.layers()) {
            assert_eq!(x.parameters(), y.parameters());
        }
    }
}

// ============================================================================
// Invalid Architecture Tests
// ============================================================================

mod invalid_architecture_tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_architecture("does/not/exist.json"),
            Err(NetworkError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_temp_config(r#"{"layers": [ {"layer_type": "linear", "inputs": 4"#);
        assert!(matches!(load_architecture(file.path()), Err(NetworkError::Json(_))));
    }

    #[test]
    fn test_unknown_layer_type() {
        let file = write_temp_config(r#"{"layers": [{"layer_type": "lstm", "size": 4}]}"#);
        assert!(matches!(load_architecture(file.path()), Err(NetworkError::Json(_))));
    }

    #[test]
    fn test_unknown_activation() {
        let file = write_temp_config(
            r#"{"layers": [{"layer_type": "activation", "function": "tanh",
                           "shape": {"height": 4, "width": 1, "depth": 1}}]}"#,
        );
        assert!(matches!(load_architecture(file.path()), Err(NetworkError::Json(_))));
    }

    #[test]
    fn test_empty_architecture() {
        let file = write_temp_config(r#"{"layers": []}"#);
        assert!(matches!(
            load_architecture(file.path()),
            Err(NetworkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_connection_mismatch() {
        let file = write_temp_config(
            r#"{"layers": [
                {"layer_type": "linear", "inputs": 4, "outputs": 3},
                {"layer_type": "linear", "inputs": 5, "outputs": 2}
            ]}"#,
        );
        assert!(matches!(
            load_architecture(file.path()),
            Err(NetworkError::ShapeMismatch { expected: 3, actual: 5, .. })
        ));
    }

    #[test]
    fn test_invalid_layer_parameters() {
        let invalid = [
            LayerConfig::Linear { inputs: 0, outputs: 3 },
            LayerConfig::Softmax { size: 0 },
            LayerConfig::Dropout {
                shape: Shape::flat(4),
                drop_rate: 1.0,
            },
            LayerConfig::SparseLinear {
                inputs: 4,
                outputs: 4,
                connectivity: 0.0,
            },
            // 3x3 filters with stride 2 do not tile a 6x6 input
            LayerConfig::Convolution {
                input: Shape::new(6, 6, 1),
                filter_size: 3,
                filters: 1,
                stride: 2,
            },
            LayerConfig::MaxPooling {
                input: Shape::new(5, 5, 1),
                window_size: 2,
            },
            LayerConfig::Cropping {
                input: Shape::new(2, 2, 1),
                cropping: 1,
            },
            LayerConfig::BinaryCorrelator {
                inputs: 4,
                outputs: 2,
                permanence_threshold: 1.5,
                proximal_threshold: 0.5,
            },
            LayerConfig::Activation {
                function: ActivationFunction::Sigmoid,
                shape: Shape::new(3, 0, 1),
            },
            LayerConfig::Padding {
                input: Shape::new(4, 4, 0),
                padding: 1,
            },
            LayerConfig::HebbianLinear {
                inputs: 4,
                outputs: 0,
                rule: LearningRuleKind::Hebbian,
            },
        ];
        let mut rng = SimpleRng::new(1);
        for config in invalid {
            assert!(
                matches!(
                    build_layer(&config, &mut rng),
                    Err(NetworkError::InvalidConfiguration(_))
                ),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_error_names_the_layer() {
        let config = ArchitectureConfig {
            layers: vec![
                LayerConfig::Linear { inputs: 4, outputs: 4 }.into(),
                LayerConfig::Softmax { size: 0 }.into(),
            ],
        };
        match validate_architecture(&config) {
            Err(NetworkError::InvalidConfiguration(message)) => assert!(message.starts_with("layer 1:")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_backpropagation_refuses_hebbian_architecture() {
        let config = ArchitectureConfig {
            layers: vec![LayerConfig::HebbianLinear {
                inputs: 4,
                outputs: 2,
                rule: LearningRuleKind::Hebbian,
            }
            .into()],
        };
        let mut rng = SimpleRng::new(1);
        let network = build_network("h", &config, &mut rng).unwrap();
        assert!(BackpropagationNeuralNetwork::from_network(network).is_err());
    }
}
