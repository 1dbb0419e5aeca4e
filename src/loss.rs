//! Loss functions
//!
//! A loss maps a batch of predictions and targets to a scalar and to the
//! gradient with respect to the predictions. Losses are stateless.

use crate::error::{ensure_len, NetworkError, Result};
use crate::utils::activations::argmax;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound applied to probabilities before taking logarithms.
pub const EPSILON: f64 = 1e-10;

/// Selectable loss functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    SquaredError,
    CrossEntropy,
    LogLikelihood,
}

impl LossKind {
    pub fn build(self) -> Box<dyn Loss> {
        match self {
            LossKind::SquaredError => Box::new(SquaredError),
            LossKind::CrossEntropy => Box::new(CrossEntropy),
            LossKind::LogLikelihood => Box::new(LogLikelihood),
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Scalar objective over a batch.
///
/// `predictions` and `targets` are flat `batch_size × sample_size` slices.
pub trait Loss {
    /// Summed loss over the batch.
    fn calculate_loss(&self, predictions: &[f64], targets: &[f64], batch_size: usize) -> Result<f64>;

    /// Gradient of the summed loss with respect to every prediction.
    fn calculate_gradient(
        &self,
        predictions: &[f64],
        targets: &[f64],
        batch_size: usize,
    ) -> Result<Vec<f64>>;

    /// Loss divided by the batch size.
    fn calculate_mean_loss(&self, predictions: &[f64], targets: &[f64], batch_size: usize) -> Result<f64> {
        let loss = self.calculate_loss(predictions, targets, batch_size)?;
        Ok(loss / batch_size.max(1) as f64)
    }

    fn kind(&self) -> LossKind;

    /// True when the loss provides [`Loss::calculate_softmax_gradient`], so
    /// a trailing softmax can be skipped during backpropagation.
    fn fuses_with_softmax(&self) -> bool {
        false
    }

    /// Gradient with respect to the logits of the softmax that produced
    /// `predictions`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` unless the loss fuses with softmax.
    fn calculate_softmax_gradient(
        &self,
        _predictions: &[f64],
        _targets: &[f64],
        _batch_size: usize,
    ) -> Result<Vec<f64>> {
        Err(NetworkError::config(format!(
            "{} loss does not fuse with softmax",
            self.kind()
        )))
    }
}

fn check(kind: LossKind, predictions: &[f64], targets: &[f64], batch_size: usize) -> Result<()> {
    ensure_len(&format!("{} targets", kind), predictions.len(), targets.len())?;
    if predictions.is_empty() {
        return Err(NetworkError::shape(format!("{} predictions", kind), batch_size.max(1), 0));
    }
    if batch_size == 0 || predictions.len() % batch_size != 0 {
        // closest length that splits into `batch_size` equal samples
        let expected = predictions.len().div_ceil(batch_size.max(1)) * batch_size;
        return Err(NetworkError::shape(
            format!("{} batch of {} samples", kind, batch_size),
            expected,
            predictions.len(),
        ));
    }
    Ok(())
}

/// `½ Σ (p - t)²`, gradient `p - t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl Loss for SquaredError {
    fn calculate_loss(&self, predictions: &[f64], targets: &[f64], batch_size: usize) -> Result<f64> {
        check(self.kind(), predictions, targets, batch_size)?;
        Ok(0.5
            * predictions
                .iter()
                .zip(targets)
                .map(|(p, t)| (p - t) * (p - t))
                .sum::<f64>())
    }

    fn calculate_gradient(
        &self,
        predictions: &[f64],
        targets: &[f64],
        batch_size: usize,
    ) -> Result<Vec<f64>> {
        check(self.kind(), predictions, targets, batch_size)?;
        Ok(predictions.iter().zip(targets).map(|(p, t)| p - t).collect())
    }

    fn kind(&self) -> LossKind {
        LossKind::SquaredError
    }
}

/// `-Σ t · ln(p)`, gradient `-t / p`.
///
/// Behind a softmax the gradient with respect to the logits collapses to
/// `p - t`, see [`Loss::calculate_softmax_gradient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl Loss for CrossEntropy {
    fn calculate_loss(&self, predictions: &[f64], targets: &[f64], batch_size: usize) -> Result<f64> {
        check(self.kind(), predictions, targets, batch_size)?;
        Ok(-predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| t * p.max(EPSILON).ln())
            .sum::<f64>())
    }

    fn calculate_gradient(
        &self,
        predictions: &[f64],
        targets: &[f64],
        batch_size: usize,
    ) -> Result<Vec<f64>> {
        check(self.kind(), predictions, targets, batch_size)?;
        Ok(predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| -t / p.max(EPSILON))
            .collect())
    }

    fn kind(&self) -> LossKind {
        LossKind::CrossEntropy
    }

    fn fuses_with_softmax(&self) -> bool {
        true
    }

    fn calculate_softmax_gradient(
        &self,
        predictions: &[f64],
        targets: &[f64],
        batch_size: usize,
    ) -> Result<Vec<f64>> {
        check(self.kind(), predictions, targets, batch_size)?;
        Ok(predictions.iter().zip(targets).map(|(p, t)| p - t).collect())
    }
}

/// Negative log-likelihood of the target class: `-ln(p_k)` with `k = argmax t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLikelihood;

impl Loss for LogLikelihood {
    fn calculate_loss(&self, predictions: &[f64], targets: &[f64], batch_size: usize) -> Result<f64> {
        check(self.kind(), predictions, targets, batch_size)?;
        let size = predictions.len() / batch_size;
        Ok(predictions
            .chunks_exact(size)
            .zip(targets.chunks_exact(size))
            .map(|(ps, ts)| -ps[argmax(ts)].max(EPSILON).ln())
            .sum())
    }

    fn calculate_gradient(
        &self,
        predictions: &[f64],
        targets: &[f64],
        batch_size: usize,
    ) -> Result<Vec<f64>> {
        check(self.kind(), predictions, targets, batch_size)?;
        let size = predictions.len() / batch_size;
        let mut gradient = vec![0.0; predictions.len()];
        for ((ps, ts), gs) in predictions
            .chunks_exact(size)
            .zip(targets.chunks_exact(size))
            .zip(gradient.chunks_exact_mut(size))
        {
            let k = argmax(ts);
            gs[k] = -1.0 / ps[k].max(EPSILON);
        }
        Ok(gradient)
    }

    fn kind(&self) -> LossKind {
        LossKind::LogLikelihood
    }
}
