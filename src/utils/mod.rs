//! Shared utilities for layers and networks
//!
//! This module provides the random number generator used for initialisation
//! and dropout, plus the elementwise activation helpers.

pub mod activations;
pub mod rng;

pub use rng::SimpleRng;
