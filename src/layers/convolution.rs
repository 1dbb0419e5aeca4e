//! 2D convolutional layer implementation
//!
//! This module provides the Convolution layer, which slides square filters
//! over a (height × width × depth) input with a fixed stride, and the
//! geometry helper shared with the Hebbian convolution.

use crate::architecture::LayerConfig;
use crate::error::{NetworkError, Result};
use crate::layers::store::{Buffers, Parameter, Shape};
use crate::layers::{Layer, LayerKind};
use crate::utils::SimpleRng;

const WEIGHTS: usize = 0;
const BIAS: usize = 1;

/// Validated geometry of a strided, unpadded convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConvGeometry {
    pub input: Shape,
    pub filter_size: usize,
    pub filters: usize,
    pub stride: usize,
    pub output: Shape,
}

impl ConvGeometry {
    /// Checks that the filters tile the input exactly:
    /// `(input - filter_size) % stride == 0` in both spatial dimensions.
    pub fn new(input: Shape, filter_size: usize, filters: usize, stride: usize) -> Result<Self> {
        if input.size() == 0 || filter_size == 0 || filters == 0 || stride == 0 {
            return Err(NetworkError::config(format!(
                "convolution sizes must be positive (input {}, filter {}, filters {}, stride {})",
                input, filter_size, filters, stride
            )));
        }
        if filter_size > input.height || filter_size > input.width {
            return Err(NetworkError::config(format!(
                "filter {}x{} does not fit into input {}",
                filter_size, filter_size, input
            )));
        }
        let rows = input.height - filter_size;
        let cols = input.width - filter_size;
        if rows % stride != 0 || cols % stride != 0 {
            return Err(NetworkError::config(format!(
                "filter {} with stride {} does not tile input {} exactly",
                filter_size, stride, input
            )));
        }
        Ok(Self {
            input,
            filter_size,
            filters,
            stride,
            output: Shape::new(rows / stride + 1, cols / stride + 1, filters),
        })
    }

    /// Length of one receptive field: depth × filter_size².
    pub fn patch_size(&self) -> usize {
        self.input.depth * self.filter_size * self.filter_size
    }

    /// Number of filter positions per channel.
    pub fn positions(&self) -> usize {
        self.output.height * self.output.width
    }

    /// Index inside a sample of patch element `(c, fy, fx)` at output `(oy, ox)`.
    #[inline]
    pub fn input_index(&self, c: usize, fy: usize, fx: usize, oy: usize, ox: usize) -> usize {
        self.input
            .index(c, oy * self.stride + fy, ox * self.stride + fx)
    }

    /// Copies the receptive field at output position `(oy, ox)` into `patch`,
    /// laid out `[channel][fy][fx]`.
    pub fn gather_patch(&self, sample: &[f64], oy: usize, ox: usize, patch: &mut [f64]) {
        let f = self.filter_size;
        let mut p = 0;
        for c in 0..self.input.depth {
            for fy in 0..f {
                for fx in 0..f {
                    patch[p] = sample[self.input_index(c, fy, fx, oy, ox)];
                    p += 1;
                }
            }
        }
    }
}

/// Convolutional layer with learnable filters and one bias per filter.
///
/// Output shape: `((H - f) / s + 1, (W - f) / s + 1, filters)`.
///
/// # Fields
///
/// * `W` - filters (filters × depth·f·f), each row laid out `[channel][fy][fx]`
/// * `b` - bias of each filter (filters)
///
/// # Example
///
/// ```ignore
/// use mlnn::layers::{Convolution, Shape};
/// use mlnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = Convolution::new(Shape::new(28, 28, 1), 5, 8, 1, &mut rng)?;
/// assert_eq!(layer.output_shape(), Shape::new(24, 24, 8));
/// ```
pub struct Convolution {
    name: String,
    geometry: ConvGeometry,
    parameters: Vec<Parameter>,
    buffers: Buffers,
}

impl Convolution {
    /// Create a new Convolution layer with Xavier initialization.
    ///
    /// fan_in = depth × f², fan_out = filters × f².
    ///
    /// # Arguments
    ///
    /// * `input` - Input shape (height, width, depth)
    /// * `filter_size` - Side of the square filter
    /// * `filters` - Number of filters (output channels)
    /// * `stride` - Step between neighbouring filter positions
    /// * `rng` - Random number generator for weight initialization
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the filters do not tile the input exactly.
    pub fn new(
        input: Shape,
        filter_size: usize,
        filters: usize,
        stride: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        let geometry = ConvGeometry::new(input, filter_size, filters, stride)?;
        let mut weights = Parameter::new("W", filters, geometry.patch_size());
        rng.fill_xavier(
            weights.values_mut(),
            geometry.patch_size(),
            filters * filter_size * filter_size,
        );
        let bias = Parameter::new("b", filters, 1);

        Ok(Self {
            name: "Convolution".to_string(),
            geometry,
            parameters: vec![weights, bias],
            buffers: Buffers::new(input, geometry.output),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn filter_size(&self) -> usize {
        self.geometry.filter_size
    }

    pub fn filters(&self) -> usize {
        self.geometry.filters
    }

    pub fn stride(&self) -> usize {
        self.geometry.stride
    }

    pub fn weights(&self) -> &Parameter {
        &self.parameters[WEIGHTS]
    }

    pub fn weights_mut(&mut self) -> &mut Parameter {
        &mut self.parameters[WEIGHTS]
    }

    pub fn bias(&self) -> &Parameter {
        &self.parameters[BIAS]
    }

    pub fn bias_mut(&mut self) -> &mut Parameter {
        &mut self.parameters[BIAS]
    }
}

impl Layer for Convolution {
    fn kind(&self) -> LayerKind {
        LayerKind::Convolution
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
        let g = self.geometry;
        let f = g.filter_size;
        let weights = &self.parameters[WEIGHTS].values;
        let bias = &self.parameters[BIAS].values;
        let patch_size = g.patch_size();

        for (xs, ys) in input
            .chunks_exact(g.input.size())
            .zip(self.buffers.y.chunks_exact_mut(g.output.size()))
        {
            for k in 0..g.filters {
                let filter = &weights[k * patch_size..(k + 1) * patch_size];
                for oy in 0..g.output.height {
                    for ox in 0..g.output.width {
                        let mut sum = bias[k];
                        let mut p = 0;
                        for c in 0..g.input.depth {
                            for fy in 0..f {
                                for fx in 0..f {
                                    sum += filter[p] * xs[g.input_index(c, fy, fx, oy, ox)];
                                    p += 1;
                                }
                            }
                        }
                        ys[g.output.index(k, oy, ox)] = sum;
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(&mut self, grad_output: &[f64]) -> Result<()> {
        self.buffers.check_output_gradient(&self.name, grad_output)?;
        let g = self.geometry;
        let f = g.filter_size;
        let patch_size = g.patch_size();
        let (head, tail) = self.parameters.split_at_mut(BIAS);
        let weights = &mut head[WEIGHTS];
        let bias = &mut tail[0];
        let Buffers { x, dx, .. } = &mut self.buffers;

        dx.iter_mut().for_each(|v| *v = 0.0);
        for ((xs, dys), dxs) in x
            .chunks_exact(g.input.size())
            .zip(grad_output.chunks_exact(g.output.size()))
            .zip(dx.chunks_exact_mut(g.input.size()))
        {
            for k in 0..g.filters {
                let row = k * patch_size;
                for oy in 0..g.output.height {
                    for ox in 0..g.output.width {
                        let dy = dys[g.output.index(k, oy, ox)];
                        bias.gradients[k] += dy;
                        let mut p = row;
                        for c in 0..g.input.depth {
                            for fy in 0..f {
                                for fx in 0..f {
                                    let i = g.input_index(c, fy, fx, oy, ox);
                                    // correlation of the patch with the output gradient
                                    weights.gradients[p] += dy * xs[i];
                                    // scatter form of the full correlation with flipped filters
                                    dxs[i] += weights.values[p] * dy;
                                    p += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Convolution {
            input: self.geometry.input,
            filter_size: self.geometry.filter_size,
            filters: self.geometry.filters,
            stride: self.geometry.stride,
        }
    }
}
