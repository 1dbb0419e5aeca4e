//! Shapes, activation buffers and parameter tensors owned by layers
//!
//! Every layer keeps its forward cache and input gradient in a [`Buffers`]
//! value sized by `shape × batch_size`, and its learnable tensors in
//! [`Parameter`] values that pair the tensor with an equally sized gradient.
//!
//! Samples are stored one after another. Inside a sample, values are laid out
//! channel by channel, each channel row by row: `c * height * width + h * width + w`.

use crate::error::{ensure_len, NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial shape of one sample: height × width × depth (channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
    pub depth: usize,
}

impl Shape {
    pub fn new(height: usize, width: usize, depth: usize) -> Self {
        Self {
            height,
            width,
            depth,
        }
    }

    /// A flat vector shape, as used by fully connected layers.
    pub fn flat(size: usize) -> Self {
        Self::new(size, 1, 1)
    }

    /// Number of values in one sample.
    pub fn size(&self) -> usize {
        self.height * self.width * self.depth
    }

    /// Number of values in one channel.
    pub fn channel_size(&self) -> usize {
        self.height * self.width
    }

    /// Flat index of `(channel, row, column)` inside one sample.
    #[inline]
    pub fn index(&self, channel: usize, row: usize, column: usize) -> usize {
        channel * self.height * self.width + row * self.width + column
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.depth)
    }
}

/// Batch-sized activation storage of a single layer.
///
/// * `x` - copy of the last forward input (batch × input size)
/// * `y` - last forward output (batch × output size)
/// * `dx` - gradient with respect to the input (batch × input size)
#[derive(Debug, Clone)]
pub struct Buffers {
    input_shape: Shape,
    output_shape: Shape,
    batch_size: usize,
    pub(crate) x: Vec<f64>,
    pub(crate) y: Vec<f64>,
    pub(crate) dx: Vec<f64>,
}

impl Buffers {
    /// Allocates buffers for a batch of one sample.
    pub fn new(input_shape: Shape, output_shape: Shape) -> Self {
        Self {
            input_shape,
            output_shape,
            batch_size: 1,
            x: vec![0.0; input_shape.size()],
            y: vec![0.0; output_shape.size()],
            dx: vec![0.0; input_shape.size()],
        }
    }

    pub fn input_shape(&self) -> Shape {
        self.input_shape
    }

    pub fn output_shape(&self) -> Shape {
        self.output_shape
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Reallocates the buffers for `batch_size` samples.
    ///
    /// Returns `false` without touching anything when the batch size is
    /// already current, so repeated calls are free.
    pub fn resize_batch(&mut self, batch_size: usize) -> bool {
        if batch_size == self.batch_size {
            return false;
        }
        self.batch_size = batch_size;
        let input_len = self.input_shape.size() * batch_size;
        let output_len = self.output_shape.size() * batch_size;
        self.x = vec![0.0; input_len];
        self.y = vec![0.0; output_len];
        self.dx = vec![0.0; input_len];
        true
    }

    /// Copies a forward input of layer `layer` into the cache after checking its length.
    pub(crate) fn store_input(&mut self, layer: &str, input: &[f64]) -> Result<()> {
        if input.len() != self.x.len() {
            return Err(NetworkError::shape(
                format!("'{}' forward", layer),
                self.x.len(),
                input.len(),
            ));
        }
        self.x.copy_from_slice(input);
        Ok(())
    }

    /// Checks the length of a gradient arriving at the output of layer `layer`.
    pub(crate) fn check_output_gradient(&self, layer: &str, grad_output: &[f64]) -> Result<()> {
        if grad_output.len() != self.y.len() {
            return Err(NetworkError::shape(
                format!("'{}' backward", layer),
                self.y.len(),
                grad_output.len(),
            ));
        }
        Ok(())
    }
}

/// A named parameter tensor paired with its accumulated gradient.
///
/// The tensor is a `rows × cols` row-major matrix. Non-trainable tensors
/// (masks) are persisted with the layer but skipped by optimizers.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    rows: usize,
    cols: usize,
    trainable: bool,
    pub(crate) values: Vec<f64>,
    pub(crate) gradients: Vec<f64>,
}

impl Parameter {
    /// Creates a zero-initialised trainable tensor.
    pub fn new(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
            trainable: true,
            values: vec![0.0; rows * cols],
            gradients: vec![0.0; rows * cols],
        }
    }

    /// Creates a tensor that optimizers leave alone.
    pub fn fixed(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            trainable: false,
            ..Self::new(name, rows, cols)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    /// Replaces all values, e.g. when restoring an archive.
    pub fn set_values(&mut self, values: &[f64]) -> Result<()> {
        ensure_len(&format!("parameter '{}'", self.name), self.values.len(), values.len())?;
        self.values.copy_from_slice(values);
        Ok(())
    }

    pub fn zero_gradients(&mut self) {
        self.gradients.iter_mut().for_each(|g| *g = 0.0);
    }

    /// Splits the tensor into disjoint value and gradient borrows.
    pub fn split_mut(&mut self) -> (&mut [f64], &[f64]) {
        (&mut self.values, &self.gradients)
    }

    pub fn gradients_are_finite(&self) -> bool {
        self.gradients.iter().all(|g| g.is_finite())
    }

    pub fn values_are_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_index_is_channel_major() {
        let shape = Shape::new(2, 3, 2);
        assert_eq!(shape.size(), 12);
        assert_eq!(shape.index(0, 0, 0), 0);
        assert_eq!(shape.index(0, 1, 2), 5);
        assert_eq!(shape.index(1, 0, 0), 6);
        assert_eq!(shape.to_string(), "2x3x2");
    }

    #[test]
    fn test_resize_batch_is_lazy() {
        let mut buffers = Buffers::new(Shape::flat(3), Shape::flat(2));
        assert!(!buffers.resize_batch(1));
        assert!(buffers.resize_batch(4));
        assert_eq!(buffers.x.len(), 12);
        assert_eq!(buffers.y.len(), 8);
        buffers.y[0] = 7.0;
        assert!(!buffers.resize_batch(4));
        assert_eq!(buffers.y[0], 7.0);
    }

    #[test]
    fn test_store_input_checks_length() {
        let mut buffers = Buffers::new(Shape::flat(3), Shape::flat(2));
        assert!(buffers.store_input("test", &[1.0, 2.0]).is_err());
        buffers.store_input("test", &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(buffers.x, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parameter_set_values() {
        let mut p = Parameter::new("W", 2, 2);
        assert!(p.set_values(&[1.0]).is_err());
        p.set_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(p.get(1, 0), 3.0);
        assert!(p.is_trainable());
        assert!(!Parameter::fixed("mask", 1, 1).is_trainable());
    }
}
