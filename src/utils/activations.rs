//! Elementwise activation functions and their derivatives
//!
//! Derivatives are expressed in terms of the activation *output*, which is
//! what layers cache during the forward pass:
//! - Sigmoid: y * (1 - y)
//! - ReLU: 1 where y > 0
//! - ELU (alpha = 1): 1 where y > 0, y + 1 elsewhere
//!
//! Softmax and arg-max operate on one sample (row) at a time.

/// Sigmoid activation: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming y = sigmoid(x).
pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1.0 - y)
}

/// Rectified linear unit.
pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// ReLU derivative assuming y = relu(x).
pub fn relu_derivative(y: f64) -> f64 {
    if y > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Exponential linear unit with alpha = 1.
pub fn elu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        x.exp() - 1.0
    }
}

/// ELU derivative assuming y = elu(x): for x <= 0, d/dx (e^x - 1) = e^x = y + 1.
pub fn elu_derivative(y: f64) -> f64 {
    if y > 0.0 {
        1.0
    } else {
        y + 1.0
    }
}

/// Softmax applied in place to every `cols`-long row of `values`.
///
/// Uses the max-subtraction trick so large logits do not overflow.
pub fn softmax_rows(values: &mut [f64], cols: usize) {
    if cols == 0 {
        return;
    }
    for row in values.chunks_exact_mut(cols) {
        let max_value = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }
        let inv_sum = 1.0 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
}

/// Index of the first largest value; `0` for an empty slice.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = i;
        }
    }
    best
}
