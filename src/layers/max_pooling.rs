//! Max pooling layer
//!
//! Non-overlapping `window × window` pooling applied to every channel. The
//! forward pass remembers where each maximum came from; the backward pass
//! sends the gradient back to exactly that position.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, NetworkError, Result};
use crate::layers::store::{Buffers, Shape};
use crate::layers::{Layer, LayerKind};

/// Max pooling with square, non-overlapping windows.
///
/// Output shape: `(H / k, W / k, D)`.
pub struct MaxPooling {
    name: String,
    window_size: usize,
    /// For every output value, the index of its maximum within the input batch.
    pooling_map: Vec<usize>,
    buffers: Buffers,
}

impl MaxPooling {
    /// # Errors
    ///
    /// `InvalidConfiguration` when the window does not divide both spatial
    /// dimensions.
    pub fn new(input: Shape, window_size: usize) -> Result<Self> {
        ensure_positive("MaxPooling", "input size", input.size())?;
        if window_size == 0 || input.height % window_size != 0 || input.width % window_size != 0 {
            return Err(NetworkError::config(format!(
                "pooling window {} does not divide input {}",
                window_size, input
            )));
        }
        let output = Shape::new(input.height / window_size, input.width / window_size, input.depth);
        Ok(Self {
            name: "MaxPooling".to_string(),
            window_size,
            pooling_map: vec![0; output.size()],
            buffers: Buffers::new(input, output),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Input index (within the batch) selected for every output value.
    pub fn pooling_map(&self) -> &[usize] {
        &self.pooling_map
    }
}

impl Layer for MaxPooling {
    fn kind(&self) -> LayerKind {
        LayerKind::MaxPooling
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut Buffers {
        &mut self.buffers
    }

    fn resize_batch(&mut self, batch_size: usize) {
        if self.buffers.resize_batch(batch_size) {
            self.pooling_map = vec![0; self.buffers.output_shape().size() * batch_size];
        }
    }

    fn forward(&mut self, input: &[f64], _test: bool) -> Result<()> {
        self.buffers.store_input(&self.name, input)?;
        let (ins, outs) = (self.input_shape(), self.output_shape());
        let k = self.window_size;
        let batch_size = self.buffers.batch_size();
        let y = &mut self.buffers.y;

        for b in 0..batch_size {
            let in_base = b * ins.size();
            let out_base = b * outs.size();
            for c in 0..outs.depth {
                for oy in 0..outs.height {
                    for ox in 0..outs.width {
                        let mut best = in_base + ins.index(c, oy * k, ox * k);
                        for wy in 0..k {
                            for wx in 0..k {
                                let i = in_base + ins.index(c, oy * k + wy, ox * k + wx);
                                if input[i] > input[best] {
                                    best = i;
                                }
                            }
                        }
                        let o = out_base + outs.index(c, oy, ox);
                        y[o] = input[best];
                        self.pooling_map[o] = best;
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let dx = &mut self.buffers.dx;
        dx.iter_mut().for_each(|v| *v = 0.0);
        for (&source, &g) in self.pooling_map.iter().zip(grad_output) {
            dx[source] = g;
        }
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::MaxPooling {
            input: self.input_shape(),
            window_size: self.window_size,
        }
    }
}
