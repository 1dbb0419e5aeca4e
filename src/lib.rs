//! Multi-layer neural network library
//!
//! This library provides composable layers, a network container that drives
//! forward and backward passes over them, gradient-based optimizers, loss
//! functions and local Hebbian learning rules.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Linear, Convolution, MaxPooling, Hebbian, etc.)
//! - `network`: Layer chain plus the backpropagation and Hebbian training strategies
//! - `optimizers`: Optimizer trait and implementations (GradientDescent, Adam, GradPID, etc.)
//! - `loss`: Loss functions (squared error, cross-entropy, log-likelihood)
//! - `learning`: Hebbian learning rules
//! - `gradient_check`: Finite-difference gradients for validating backward passes
//! - `persistence`: JSON archives of trained networks
//! - `utils`: Shared utilities (RNG, activation functions)
//! - `config`: Training configuration structures
//! - `architecture`: Architecture configuration and network building

pub mod architecture;
pub mod config;
pub mod error;
pub mod gradient_check;
pub mod layers;
pub mod learning;
pub mod loss;
pub mod network;
pub mod optimizers;
pub mod persistence;
pub mod utils;

pub use error::{NetworkError, Result};
