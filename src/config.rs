//! Configuration structures for training
//!
//! This module provides configuration structures for setting up training parameters:
//! the loss, the optimizer with its learning rate and weight decay, and the batch
//! schedule.

use crate::error::{NetworkError, Result};
use crate::loss::LossKind;
use crate::optimizers::OptimizerKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for training a backpropagation network
///
/// This structure is used to parse training configuration from JSON files.
/// Only `learning_rate` and `weight_decay` are optional:
///
/// - **learning_rate**: defaults to the optimizer's own default
/// - **weight_decay**: defaults to 0 (no decay)
///
/// # Example
///
/// ```json
/// {
///   "loss": "cross_entropy",
///   "optimizer": "adam",
///   "learning_rate": 0.001,
///   "weight_decay": 0.0001,
///   "batch_size": 32,
///   "epochs": 10,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Loss function: "squared_error", "cross_entropy" or "log_likelihood"
    pub loss: LossKind,

    /// Optimization algorithm, e.g. "gradient_descent", "adam" or "grad_pid"
    pub optimizer: OptimizerKind,

    /// Step size; `None` uses the optimizer's default
    #[serde(default)]
    pub learning_rate: Option<f64>,

    /// Weight decay factor applied at every update, range [0.0, 1.0)
    #[serde(default)]
    pub weight_decay: f64,

    /// Number of samples per training batch
    pub batch_size: usize,

    /// Number of passes over the training data
    pub epochs: usize,

    /// Seed of the weight initialisation
    pub seed: u64,
}

impl TrainingConfig {
    /// Learning rate to use: the configured one or the optimizer's default.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
            .unwrap_or_else(|| self.optimizer.default_learning_rate())
    }

    /// Checks the numeric ranges of every field.
    pub fn validate(&self) -> Result<()> {
        if let Some(learning_rate) = self.learning_rate {
            if !(learning_rate.is_finite() && learning_rate > 0.0) {
                return Err(NetworkError::config(format!(
                    "learning_rate must be positive, got {}",
                    learning_rate
                )));
            }
        }

        if !(0.0..1.0).contains(&self.weight_decay) {
            return Err(NetworkError::config(format!(
                "weight_decay must be in [0, 1), got {}",
                self.weight_decay
            )));
        }

        if self.batch_size == 0 {
            return Err(NetworkError::config("batch_size must be greater than 0"));
        }

        if self.epochs == 0 {
            return Err(NetworkError::config("epochs must be greater than 0"));
        }

        Ok(())
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into a `TrainingConfig`
/// and validates it.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success; `Io` if the file cannot be read, `Json` if the
/// JSON is invalid and `InvalidConfiguration` if a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use mlnn::config::load_config;
///
/// let cfg = load_config("config/adam.json").unwrap();
/// assert!(cfg.learning_rate() > 0.0);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TrainingConfig> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
