//! Convolutional layer trained by a local learning rule
//!
//! Shares its geometry with [`Convolution`](crate::layers::Convolution) but has
//! no bias and a ReLU output. Every receptive field of every sample counts as
//! one pre-synaptic sample for the learning rule, so all positions update the
//! same filter bank.

use crate::architecture::LayerConfig;
use crate::error::{NetworkError, Result};
use crate::layers::convolution::ConvGeometry;
use crate::layers::store::{Buffers, Parameter, Shape};
use crate::layers::{Layer, LayerKind};
use crate::learning::{center, normalize, LearningRule, LearningRuleKind};
use crate::utils::activations::relu;
use crate::utils::SimpleRng;

const WEIGHTS: usize = 0;

/// Hebbian convolution: `y = relu(W ⋆ x)` with square filters and a stride.
pub struct ConvHebbian {
    name: String,
    geometry: ConvGeometry,
    rule: Box<dyn LearningRule>,
    parameters: Vec<Parameter>,
    buffers: Buffers,
}

impl ConvHebbian {
    /// Creates the layer with zero-sum, unit-norm random filters and the
    /// normalized zero-sum Hebbian rule.
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
        for row in weights.values_mut().chunks_exact_mut(geometry.patch_size()) {
            for w in row.iter_mut() {
                *w = rng.gen_range(-1.0, 1.0);
            }
            center(row);
            normalize(row);
        }

        Ok(Self {
            name: "ConvHebbian".to_string(),
            geometry,
            rule: LearningRuleKind::NormalizedZerosumHebbian.build(),
            parameters: vec![weights],
            buffers: Buffers::new(input, geometry.output),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rule(mut self, rule: LearningRuleKind) -> Self {
        self.rule = rule.build();
        self
    }

    pub fn rule(&self) -> LearningRuleKind {
        self.rule.kind()
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
}

impl Layer for ConvHebbian {
    fn kind(&self) -> LayerKind {
        LayerKind::ConvHebbian
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
        let patch_size = g.patch_size();
        let weights = &self.parameters[WEIGHTS].values;
        let mut patch = vec![0.0; patch_size];

        for (xs, ys) in input
            .chunks_exact(g.input.size())
            .zip(self.buffers.y.chunks_exact_mut(g.output.size()))
        {
            for oy in 0..g.output.height {
                for ox in 0..g.output.width {
                    g.gather_patch(xs, oy, ox, &mut patch);
                    for (k, filter) in weights.chunks_exact(patch_size).enumerate() {
                        let sum: f64 = filter.iter().zip(&patch).map(|(w, x)| w * x).sum();
                        ys[g.output.index(k, oy, ox)] = relu(sum);
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(&mut self, _grad_output: &[f64]) -> Result<()> {
        Err(NetworkError::BackwardUnsupported(self.name.clone()))
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    fn hebbian_update(&mut self, learning_rate: f64) -> Result<()> {
        let g = self.geometry;
        let patch_size = g.patch_size();
        let positions = g.positions();
        let samples = self.buffers.batch_size() * positions;

        // one row per (sample, position): patches as pre, filter responses as post
        let mut pre = vec![0.0; samples * patch_size];
        let mut post = vec![0.0; samples * g.filters];
        let Buffers { x, y, .. } = &self.buffers;
        let mut s = 0;
        for (xs, ys) in x
            .chunks_exact(g.input.size())
            .zip(y.chunks_exact(g.output.size()))
        {
            for oy in 0..g.output.height {
                for ox in 0..g.output.width {
                    g.gather_patch(xs, oy, ox, &mut pre[s * patch_size..(s + 1) * patch_size]);
                    for k in 0..g.filters {
                        post[s * g.filters + k] = ys[g.output.index(k, oy, ox)];
                    }
                    s += 1;
                }
            }
        }

        self.rule.update(
            &mut self.parameters[WEIGHTS].values,
            g.filters,
            patch_size,
            &pre,
            &post,
            samples,
            learning_rate,
        );
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::ConvHebbian {
            input: self.geometry.input,
            filter_size: self.geometry.filter_size,
            filters: self.geometry.filters,
            stride: self.geometry.stride,
            rule: self.rule.kind(),
        }
    }
}
