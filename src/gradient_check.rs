//! Finite-difference gradients for validating backward passes
//!
//! Both functions evaluate the loss of a single layer's output with central
//! differences, `(L(θ + δ) - L(θ - δ)) / 2δ`, running every forward pass in
//! evaluation mode so stochastic layers stay deterministic.

use crate::error::{ensure_len, NetworkError, Result};
use crate::layers::Layer;
use crate::loss::Loss;

fn batch_size_of(layer: &dyn Layer, input: &[f64]) -> Result<usize> {
    let size = layer.input_size();
    if size == 0 || input.is_empty() || input.len() % size != 0 {
        return Err(NetworkError::shape(
            format!("'{}' gradient check input", layer.name()),
            size.max(1) * (input.len() / size.max(1)).max(1),
            input.len(),
        ));
    }
    Ok(input.len() / size)
}

fn evaluate(
    layer: &mut dyn Layer,
    input: &[f64],
    targets: &[f64],
    loss: &dyn Loss,
    batch_size: usize,
) -> Result<f64> {
    layer.forward(input, true)?;
    loss.calculate_loss(layer.output(), targets, batch_size)
}

/// Numerical gradient of the loss with respect to the parameter tensor at
/// `parameter` (an index into `layer.parameters()`).
///
/// Every perturbed value is passed through [`Layer::after_update`], so
/// structurally fixed entries (masked sparse weights) get a zero gradient
/// like their analytic counterpart. The tensor is restored afterwards, also
/// when an evaluation fails.
///
/// # Errors
///
/// `InvalidConfiguration` when `parameter` is out of range; any error of
/// the forward pass or the loss.
pub fn calculate_numerical_gradient(
    layer: &mut dyn Layer,
    input: &[f64],
    targets: &[f64],
    loss: &dyn Loss,
    parameter: usize,
    delta: f64,
) -> Result<Vec<f64>> {
    let batch_size = batch_size_of(layer, input)?;
    layer.resize_batch(batch_size);
    let original = match layer.parameters().get(parameter) {
        Some(p) => p.values().to_vec(),
        None => {
            return Err(NetworkError::config(format!(
                "layer '{}' has no parameter tensor {}",
                layer.name(),
                parameter
            )))
        }
    };

    let mut gradient = Vec::with_capacity(original.len());
    for (i, &value) in original.iter().enumerate() {
        let evaluate_at = |layer: &mut dyn Layer, v: f64| {
            layer.parameters_mut()[parameter].values_mut()[i] = v;
            layer.after_update();
            let result = evaluate(layer, input, targets, loss, batch_size);
            layer.parameters_mut()[parameter].values_mut()[i] = value;
            layer.after_update();
            result
        };
        let plus = evaluate_at(layer, value + delta)?;
        let minus = evaluate_at(layer, value - delta)?;
        gradient.push((plus - minus) / (2.0 * delta));
    }
    Ok(gradient)
}

/// Numerical gradient of the loss with respect to every input value.
pub fn calculate_numerical_input_gradient(
    layer: &mut dyn Layer,
    input: &[f64],
    targets: &[f64],
    loss: &dyn Loss,
    delta: f64,
) -> Result<Vec<f64>> {
    let batch_size = batch_size_of(layer, input)?;
    ensure_len(
        &format!("'{}' gradient check targets", layer.name()),
        layer.output_size() * batch_size,
        targets.len(),
    )?;
    layer.resize_batch(batch_size);

    let mut perturbed = input.to_vec();
    let mut gradient = Vec::with_capacity(input.len());
    for i in 0..input.len() {
        perturbed[i] = input[i] + delta;
        let plus = evaluate(layer, &perturbed, targets, loss, batch_size)?;
        perturbed[i] = input[i] - delta;
        let minus = evaluate(layer, &perturbed, targets, loss, batch_size)?;
        perturbed[i] = input[i];
        gradient.push((plus - minus) / (2.0 * delta));
    }
    Ok(gradient)
}
