//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait, the shared shape/buffer/parameter
//! storage and every layer variant a network can be assembled from.

mod r#trait;
pub mod activation;
pub mod binary_correlator;
pub mod conv_hebbian;
pub mod convolution;
pub mod dropout;
pub mod hebbian_linear;
pub mod linear;
pub mod max_pooling;
pub mod padding;
pub mod softmax;
pub mod sparse_linear;
pub mod store;

// Re-export the Layer trait for convenience
pub use r#trait::{Layer, LayerKind};
pub use store::{Buffers, Parameter, Shape};

pub use activation::{Activation, ActivationFunction};
pub use binary_correlator::{BinaryCorrelator, SynapseState};
pub use conv_hebbian::ConvHebbian;
pub use convolution::Convolution;
pub use dropout::Dropout;
pub use hebbian_linear::HebbianLinear;
pub use linear::Linear;
pub use max_pooling::MaxPooling;
pub use padding::{Cropping, Padding};
pub use softmax::Softmax;
pub use sparse_linear::SparseLinear;
