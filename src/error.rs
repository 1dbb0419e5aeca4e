//! Error types shared by layers, networks, optimizers and persistence.

use thiserror::Error;

/// Errors raised while building, running or persisting a network.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A buffer handed to a layer, loss or optimizer has the wrong length.
    #[error("shape mismatch in {context}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A layer or network was configured with impossible parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A loss value or gradient became NaN or infinite.
    #[error("non-finite value detected in {0}")]
    NonFinite(String),

    /// The layer is trained by a local rule and has no backward pass.
    #[error("layer '{0}' does not support backward propagation")]
    BackwardUnsupported(String),

    /// A network archive could not be decoded.
    #[error("malformed network archive: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

impl NetworkError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        NetworkError::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        NetworkError::InvalidConfiguration(message.into())
    }
}

/// Fails with `ShapeMismatch` unless `actual == expected`.
pub(crate) fn ensure_len(context: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(NetworkError::shape(context, expected, actual))
    }
}

/// Fails with `InvalidConfiguration` unless `learning_rate` is finite and
/// positive.
pub(crate) fn ensure_learning_rate(learning_rate: f64) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(NetworkError::config(format!(
            "learning rate must be positive, got {}",
            learning_rate
        )));
    }
    Ok(())
}

/// Fails with `InvalidConfiguration` when a layer dimension is zero.
pub(crate) fn ensure_positive(layer: &str, field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(NetworkError::config(format!(
            "{} layer: {} must be greater than 0",
            layer, field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = NetworkError::shape("Linear forward", 6, 4);
        assert_eq!(
            err.to_string(),
            "shape mismatch in Linear forward: expected 6 values, got 4"
        );
    }

    #[test]
    fn test_ensure_len() {
        assert!(ensure_len("x", 3, 3).is_ok());
        assert!(matches!(
            ensure_len("x", 3, 2),
            Err(NetworkError::ShapeMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: NetworkError = io.into();
        assert!(matches!(err, NetworkError::Io(_)));
    }
}
