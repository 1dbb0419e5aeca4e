//! Binary correlator layer
//!
//! A layer of binary units whose synapses carry a permanence in [0, 1]. A
//! synapse conducts once its permanence exceeds the permanence threshold; a
//! unit fires when the sum of its conducting inputs exceeds the proximal
//! threshold. Permanences are adjusted by the binary correlator learning rule.

use crate::architecture::LayerConfig;
use crate::error::{ensure_positive, NetworkError, Result};
use crate::layers::store::{Buffers, Parameter, Shape};
use crate::layers::{Layer, LayerKind};
use crate::learning::{BinaryCorrelatorLearningRule, LearningRule};
use crate::utils::SimpleRng;

const PERMANENCE: usize = 0;

pub const DEFAULT_PERMANENCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_PROXIMAL_THRESHOLD: f64 = 0.5;

/// State of a single synapse derived from its permanence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynapseState {
    /// Permanence is exactly zero.
    Dormant,
    /// Permanence is positive but not above the threshold.
    Disconnected,
    Connected,
}

/// Binary units with thresholded, permanence-gated synapses.
///
/// # Fields
///
/// * `P` - permanences (outputs × inputs), uniform in [0, 1) at construction
/// * `connected` - cached `P > permanence_threshold`, refreshed after updates
pub struct BinaryCorrelator {
    name: String,
    inputs: usize,
    outputs: usize,
    permanence_threshold: f64,
    proximal_threshold: f64,
    connected: Vec<bool>,
    parameters: Vec<Parameter>,
    buffers: Buffers,
}

impl BinaryCorrelator {
    /// Creates the layer with the default thresholds.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when either dimension is zero.
    pub fn new(inputs: usize, outputs: usize, rng: &mut SimpleRng) -> Result<Self> {
        ensure_positive("BinaryCorrelator", "inputs", inputs)?;
        ensure_positive("BinaryCorrelator", "outputs", outputs)?;
        let mut permanence = Parameter::new("P", outputs, inputs);
        for p in permanence.values_mut() {
            *p = rng.next_f64();
        }

        let mut layer = Self {
            name: "BinaryCorrelator".to_string(),
            inputs,
            outputs,
            permanence_threshold: DEFAULT_PERMANENCE_THRESHOLD,
            proximal_threshold: DEFAULT_PROXIMAL_THRESHOLD,
            connected: vec![false; inputs * outputs],
            parameters: vec![permanence],
            buffers: Buffers::new(Shape::flat(inputs), Shape::flat(outputs)),
        };
        layer.refresh_connectivity();
        Ok(layer)
    }

    /// Overrides both thresholds.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the permanence threshold lies outside
    /// [0, 1] or the proximal threshold is negative.
    pub fn with_thresholds(mut self, permanence_threshold: f64, proximal_threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&permanence_threshold) || proximal_threshold.is_nan() || proximal_threshold < 0.0 {
            return Err(NetworkError::config(format!(
                "invalid BinaryCorrelator thresholds: permanence {}, proximal {}",
                permanence_threshold, proximal_threshold
            )));
        }
        self.permanence_threshold = permanence_threshold;
        self.proximal_threshold = proximal_threshold;
        self.refresh_connectivity();
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn permanence_threshold(&self) -> f64 {
        self.permanence_threshold
    }

    pub fn proximal_threshold(&self) -> f64 {
        self.proximal_threshold
    }

    pub fn permanences(&self) -> &Parameter {
        &self.parameters[PERMANENCE]
    }

    /// Replaces the permanences and recomputes connectivity.
    pub fn set_permanences(&mut self, values: &[f64]) -> Result<()> {
        self.parameters[PERMANENCE].set_values(values)?;
        self.clamp_permanences();
        self.refresh_connectivity();
        Ok(())
    }

    pub fn is_connected(&self, output: usize, input: usize) -> bool {
        self.connected[output * self.inputs + input]
    }

    pub fn synapse_state(&self, output: usize, input: usize) -> SynapseState {
        let p = self.parameters[PERMANENCE].get(output, input);
        if p == 0.0 {
            SynapseState::Dormant
        } else if p > self.permanence_threshold {
            SynapseState::Connected
        } else {
            SynapseState::Disconnected
        }
    }

    fn clamp_permanences(&mut self) {
        for p in self.parameters[PERMANENCE].values.iter_mut() {
            *p = p.clamp(0.0, 1.0);
        }
    }

    fn refresh_connectivity(&mut self) {
        let threshold = self.permanence_threshold;
        for (c, &p) in self
            .connected
            .iter_mut()
            .zip(&self.parameters[PERMANENCE].values)
        {
            *c = p > threshold;
        }
    }
}

impl Layer for BinaryCorrelator {
    fn kind(&self) -> LayerKind {
        LayerKind::BinaryCorrelator
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
        let inputs = self.inputs;
        for (xs, ys) in input
            .chunks_exact(inputs)
            .zip(self.buffers.y.chunks_exact_mut(self.outputs))
        {
            for (o, y) in ys.iter_mut().enumerate() {
                let row = &self.connected[o * inputs..(o + 1) * inputs];
                let overlap: f64 = row
                    .iter()
                    .zip(xs)
                    .filter_map(|(&c, &x)| c.then_some(x))
                    .sum();
                *y = if overlap > self.proximal_threshold { 1.0 } else { 0.0 };
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

    fn after_update(&mut self) {
        self.clamp_permanences();
        self.refresh_connectivity();
    }

    fn hebbian_update(&mut self, learning_rate: f64) -> Result<()> {
        let samples = self.buffers.batch_size();
        BinaryCorrelatorLearningRule.update(
            &mut self.parameters[PERMANENCE].values,
            self.outputs,
            self.inputs,
            &self.buffers.x,
            &self.buffers.y,
            samples,
            learning_rate,
        );
        self.after_update();
        Ok(())
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::BinaryCorrelator {
            inputs: self.inputs,
            outputs: self.outputs,
            permanence_threshold: self.permanence_threshold,
            proximal_threshold: self.proximal_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with(permanences: &[f64], inputs: usize, outputs: usize) -> BinaryCorrelator {
        let mut rng = SimpleRng::new(3);
        let mut layer = BinaryCorrelator::new(inputs, outputs, &mut rng).unwrap();
        layer.set_permanences(permanences).unwrap();
        layer
    }

    #[test]
    fn test_initial_permanences_in_unit_interval() {
        let mut rng = SimpleRng::new(3);
        let layer = BinaryCorrelator::new(20, 10, &mut rng).unwrap();
        assert!(layer
            .permanences()
            .values()
            .iter()
            .all(|&p| (0.0..1.0).contains(&p)));
    }

    #[test]
    fn test_forward_thresholds_overlap() {
        // unit 0 connected to inputs 0 and 1, unit 1 only to input 2
        let mut layer = layer_with(&[0.9, 0.6, 0.1, 0.0, 0.2, 0.7], 3, 2);
        layer.forward(&[1.0, 1.0, 0.0], false).unwrap();
        assert_eq!(layer.output(), &[1.0, 0.0]);
        layer.forward(&[0.0, 0.0, 1.0], false).unwrap();
        assert_eq!(layer.output(), &[0.0, 1.0]);
    }

    #[test]
    fn test_synapse_states() {
        let layer = layer_with(&[0.0, 0.3, 0.8], 3, 1);
        assert_eq!(layer.synapse_state(0, 0), SynapseState::Dormant);
        assert_eq!(layer.synapse_state(0, 1), SynapseState::Disconnected);
        assert_eq!(layer.synapse_state(0, 2), SynapseState::Connected);
        assert!(layer.is_connected(0, 2));
        assert!(!layer.is_connected(0, 1));
    }

    #[test]
    fn test_update_clamps_and_reconnects() {
        // x = [1, 1, 0, 0] fires the unit through inputs 0 and 1
        let mut layer = layer_with(&[0.95, 0.9, 0.55, 0.05], 4, 1);
        layer.forward(&[1.0, 1.0, 0.0, 0.0], false).unwrap();
        assert_eq!(layer.output(), &[1.0]);
        // active = 2, depression = 0.1 * 2 / 2
        layer.hebbian_update(0.1).unwrap();
        let p = layer.permanences().values();
        assert_eq!(p[0], 1.0);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!((p[2] - 0.45).abs() < 1e-12);
        assert_eq!(p[3], 0.0);
        assert!(!layer.is_connected(0, 2));
        assert_eq!(layer.synapse_state(0, 3), SynapseState::Dormant);
    }

    #[test]
    fn test_invalid_thresholds() {
        let mut rng = SimpleRng::new(3);
        let layer = BinaryCorrelator::new(2, 2, &mut rng).unwrap();
        assert!(layer.with_thresholds(1.5, 0.5).is_err());
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let mut rng = SimpleRng::new(3);
        assert!(BinaryCorrelator::new(0, 2, &mut rng).is_err());
        assert!(BinaryCorrelator::new(2, 0, &mut rng).is_err());
    }
}
