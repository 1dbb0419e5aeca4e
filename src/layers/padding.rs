//! Zero padding and cropping layers
//!
//! Both are pure geometric transforms without parameters, and each one's
//! backward pass is the other one's forward pass: padding crops the gradient,
//! cropping zero-pads it.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, NetworkError, Result};
use crate::layers::store::{Buffers, Shape};
use crate::layers::{Layer, LayerKind};

/// Moves the centre window between a `large` and a `small` shape.
///
/// `margin` is the border width on each side. With `shrink` the source is the
/// large batch and the destination the small one; otherwise the small batch is
/// written into the centre of the large one and the border is left untouched.
fn copy_window(large: Shape, small: Shape, margin: usize, src: &[f64], dst: &mut [f64], shrink: bool) {
    let (src_size, dst_size) = if shrink {
        (large.size(), small.size())
    } else {
        (small.size(), large.size())
    };
    let width = small.width;
    for (s, d) in src.chunks_exact(src_size).zip(dst.chunks_exact_mut(dst_size)) {
        for c in 0..small.depth {
            for h in 0..small.height {
                let li = large.index(c, h + margin, margin);
                let si = small.index(c, h, 0);
                if shrink {
                    d[si..si + width].copy_from_slice(&s[li..li + width]);
                } else {
                    d[li..li + width].copy_from_slice(&s[si..si + width]);
                }
            }
        }
    }
}

/// Surrounds every channel with a zero border of `padding` cells.
///
/// Output shape: `(H + 2p, W + 2p, D)`.
pub struct Padding {
    name: String,
    padding: usize,
    buffers: Buffers,
}

impl Padding {
    pub fn new(input: Shape, padding: usize) -> Result<Self> {
        ensure_positive("Padding", "input size", input.size())?;
        let output = Shape::new(input.height + 2 * padding, input.width + 2 * padding, input.depth);
        Ok(Self {
            name: "Padding".to_string(),
            padding,
            buffers: Buffers::new(input, output),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn padding(&self) -> usize {
        self.padding
    }
}

impl Layer for Padding {
    fn kind(&self) -> LayerKind {
        LayerKind::Padding
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
        let (inner, outer) = (self.input_shape(), self.output_shape());
        let Buffers { x, y, .. } = &mut self.buffers;
        y.iter_mut().for_each(|v| *v = 0.0);
        copy_window(outer, inner, self.padding, x, y, false);
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let (inner, outer) = (self.input_shape(), self.output_shape());
        copy_window(outer, inner, self.padding, grad_output, &mut self.buffers.dx, true);
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Padding {
            input: self.input_shape(),
            padding: self.padding,
        }
    }
}

/// Removes a border of `cropping` cells from every channel.
///
/// Output shape: `(H - 2c, W - 2c, D)`.
pub struct Cropping {
    name: String,
    cropping: usize,
    buffers: Buffers,
}

impl Cropping {
    /// # Errors
    ///
    /// `InvalidConfiguration` when the input is empty or nothing would remain
    /// after cropping.
    pub fn new(input: Shape, cropping: usize) -> Result<Self> {
        ensure_positive("Cropping", "input size", input.size())?;
        if 2 * cropping >= input.height || 2 * cropping >= input.width {
            return Err(NetworkError::config(format!(
                "cropping {} leaves nothing of input {}",
                cropping, input
            )));
        }
        let output = Shape::new(input.height - 2 * cropping, input.width - 2 * cropping, input.depth);
        Ok(Self {
            name: "Cropping".to_string(),
            cropping,
            buffers: Buffers::new(input, output),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn cropping(&self) -> usize {
        self.cropping
    }
}

impl Layer for Cropping {
    fn kind(&self) -> LayerKind {
        LayerKind::Cropping
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
        let (outer, inner) = (self.input_shape(), self.output_shape());
        let Buffers { x, y, .. } = &mut self.buffers;
        copy_window(outer, inner, self.cropping, x, y, true);
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let (outer, inner) = (self.input_shape(), self.output_shape());
        let dx = &mut self.buffers.dx;
        dx.iter_mut().for_each(|v| *v = 0.0);
        copy_window(outer, inner, self.cropping, grad_output, dx, false);
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Cropping {
            input: self.input_shape(),
            cropping: self.cropping,
        }
    }
}
