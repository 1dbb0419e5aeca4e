//! Softmax output layer
//!
//! Converts every sample into a probability distribution. Usually the last
//! layer of a classifier; combined with the cross-entropy loss the network
//! skips the Jacobian below and routes `p - t` straight to the logits.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, Result};
use crate::layers::store::{Buffers, Shape};
use crate::layers::{Layer, LayerKind};
use crate::utils::activations::softmax_rows;

/// Per-sample softmax.
pub struct Softmax {
    name: String,
    buffers: Buffers,
}

impl Softmax {
    /// # Errors
    ///
    /// `InvalidConfiguration` when `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        ensure_positive("Softmax", "size", size)?;
        Ok(Self {
            name: "Softmax".to_string(),
            buffers: Buffers::new(Shape::flat(size), Shape::flat(size)),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Layer for Softmax {
    fn kind(&self) -> LayerKind {
        LayerKind::Softmax
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

    fn forward(&mut self, input: &[f64], _test: bool) -> Result<()> {
        self.buffers.store_input(&self.name, input)?;
        let size = self.input_size();
        let y = &mut self.buffers.y;
        y.copy_from_slice(input);
        softmax_rows(y, size);
        Ok(())
    }

    /// Jacobian-vector product: `dx_i = y_i * (g_i - Σ_j g_j y_j)`.
    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let size = self.input_size();
        let Buffers { y, dx, .. } = &mut self.buffers;
        for ((ys, gs), dxs) in y
            .chunks_exact(size)
            .zip(grad_output.chunks_exact(size))
            .zip(dx.chunks_exact_mut(size))
        {
            let dot: f64 = ys.iter().zip(gs).map(|(y, g)| y * g).sum();
            for ((dx, &y), &g) in dxs.iter_mut().zip(ys).zip(gs) {
                *dx = y * (g - dot);
            }
        }
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Softmax {
            size: self.input_size(),
        }
    }
}
