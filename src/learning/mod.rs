//! Local (Hebbian) learning rules
//!
//! A learning rule updates a `rows × cols` weight matrix from the pre-synaptic
//! activity (`samples × cols`) and post-synaptic activity (`samples × rows`)
//! of one forward pass. No loss and no backward pass are involved.

use serde::{Deserialize, Serialize};
use std::fmt;

const NORM_EPS: f64 = 1e-12;

/// Selectable learning rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRuleKind {
    Hebbian,
    NormalizedHebbian,
    NormalizedZerosumHebbian,
    BinaryCorrelator,
}

impl LearningRuleKind {
    /// Builds a fresh instance of the rule.
    pub fn build(self) -> Box<dyn LearningRule> {
        match self {
            LearningRuleKind::Hebbian => Box::new(Hebbian),
            LearningRuleKind::NormalizedHebbian => Box::new(NormalizedHebbian),
            LearningRuleKind::NormalizedZerosumHebbian => Box::new(NormalizedZerosumHebbian),
            LearningRuleKind::BinaryCorrelator => Box::new(BinaryCorrelatorLearningRule),
        }
    }
}

impl fmt::Display for LearningRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A local weight update computed from pre- and post-synaptic activity.
///
/// # Arguments
///
/// * `weights` - Row-major `rows × cols` matrix, updated in place
/// * `pre` - Pre-synaptic activity, `samples × cols`
/// * `post` - Post-synaptic activity, `samples × rows`
pub trait LearningRule {
    #[allow(clippy::too_many_arguments)]
    fn update(
        &self,
        weights: &mut [f64],
        rows: usize,
        cols: usize,
        pre: &[f64],
        post: &[f64],
        samples: usize,
        learning_rate: f64,
    );

    fn kind(&self) -> LearningRuleKind;
}

/// Adds `scale · Σ_s post_s · pre_sᵀ` to `weights`.
fn add_outer_products(
    weights: &mut [f64],
    rows: usize,
    cols: usize,
    pre: &[f64],
    post: &[f64],
    samples: usize,
    scale: f64,
) {
    for s in 0..samples {
        let xs = &pre[s * cols..(s + 1) * cols];
        let ys = &post[s * rows..(s + 1) * rows];
        for (r, &y) in ys.iter().enumerate() {
            if y == 0.0 {
                continue;
            }
            let row = &mut weights[r * cols..(r + 1) * cols];
            for (w, &x) in row.iter_mut().zip(xs) {
                *w += scale * y * x;
            }
        }
    }
}

/// Rescales `values` to unit L2 norm; zero vectors are left alone.
pub(crate) fn normalize(values: &mut [f64]) {
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > NORM_EPS {
        values.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Subtracts the mean so that `values` sums to zero.
pub(crate) fn center(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter_mut().for_each(|v| *v -= mean);
}

/// Plain Hebb: `W += η · Σ_s post_s · pre_sᵀ`.
///
/// Unbounded; weights grow as long as pre and post are correlated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hebbian;

impl LearningRule for Hebbian {
    fn update(
        &self,
        weights: &mut [f64],
        rows: usize,
        cols: usize,
        pre: &[f64],
        post: &[f64],
        samples: usize,
        learning_rate: f64,
    ) {
        add_outer_products(weights, rows, cols, pre, post, samples, learning_rate);
    }

    fn kind(&self) -> LearningRuleKind {
        LearningRuleKind::Hebbian
    }
}

/// Batch-averaged Hebb followed by unit-norm rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedHebbian;

impl LearningRule for NormalizedHebbian {
    fn update(
        &self,
        weights: &mut [f64],
        rows: usize,
        cols: usize,
        pre: &[f64],
        post: &[f64],
        samples: usize,
        learning_rate: f64,
    ) {
        if samples == 0 {
            return;
        }
        let scale = learning_rate / samples as f64;
        add_outer_products(weights, rows, cols, pre, post, samples, scale);
        for row in weights.chunks_exact_mut(cols) {
            normalize(row);
        }
    }

    fn kind(&self) -> LearningRuleKind {
        LearningRuleKind::NormalizedHebbian
    }
}

/// Competitive Hebb: the most active output of each sample moves towards the
/// centred, normalised input; all rows stay zero-sum and unit-norm.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedZerosumHebbian;

impl LearningRule for NormalizedZerosumHebbian {
    fn update(
        &self,
        weights: &mut [f64],
        rows: usize,
        cols: usize,
        pre: &[f64],
        post: &[f64],
        samples: usize,
        learning_rate: f64,
    ) {
        let mut delta = vec![0.0; cols];
        for s in 0..samples {
            let ys = &post[s * rows..(s + 1) * rows];
            let winner = crate::utils::activations::argmax(ys);
            delta.copy_from_slice(&pre[s * cols..(s + 1) * cols]);
            center(&mut delta);
            normalize(&mut delta);
            let row = &mut weights[winner * cols..(winner + 1) * cols];
            for (w, d) in row.iter_mut().zip(&delta) {
                *w += learning_rate * d;
            }
        }
        for row in weights.chunks_exact_mut(cols) {
            center(row);
            normalize(row);
        }
    }

    fn kind(&self) -> LearningRuleKind {
        LearningRuleKind::NormalizedZerosumHebbian
    }
}

/// Potentiation/depression rule for binary activity.
///
/// A synapse whose input and output are both active gains `η`. When exactly
/// one side is active it loses `η · N_on / (N − N_on)`, where `N_on` counts
/// the active inputs of the sample and `N` all inputs, so that potentiation
/// and depression balance over one sample. Inputs and outputs are active
/// when strictly positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCorrelatorLearningRule;

impl LearningRule for BinaryCorrelatorLearningRule {
    fn update(
        &self,
        weights: &mut [f64],
        rows: usize,
        cols: usize,
        pre: &[f64],
        post: &[f64],
        samples: usize,
        learning_rate: f64,
    ) {
        for s in 0..samples {
            let xs = &pre[s * cols..(s + 1) * cols];
            let ys = &post[s * rows..(s + 1) * rows];
            let active = xs.iter().filter(|&&x| x > 0.0).count();
            let depression = if active < cols {
                learning_rate * active as f64 / (cols - active) as f64
            } else {
                0.0
            };
            for (r, &y) in ys.iter().enumerate() {
                let post_on = y > 0.0;
                let row = &mut weights[r * cols..(r + 1) * cols];
                for (w, &x) in row.iter_mut().zip(xs) {
                    match (post_on, x > 0.0) {
                        (true, true) => *w += learning_rate,
                        (true, false) | (false, true) => *w -= depression,
                        (false, false) => {}
                    }
                }
            }
        }
    }

    fn kind(&self) -> LearningRuleKind {
        LearningRuleKind::BinaryCorrelator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn row_norm(row: &[f64]) -> f64 {
        row.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    #[test]
    fn test_hebbian_outer_product() {
        let mut w = vec![0.0; 6];
        // 2 samples, 3 inputs, 2 outputs
        let pre = [1.0, 0.0, 2.0, 0.0, 1.0, 1.0];
        let post = [1.0, 0.0, 2.0, 1.0];
        Hebbian.update(&mut w, 2, 3, &pre, &post, 2, 0.5);
        assert_eq!(w, vec![0.5, 1.0, 2.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_normalized_hebbian_rows_are_unit_norm() {
        let mut w = vec![0.3, -0.2, 0.1, 0.4, 0.5, -0.6];
        let pre = [1.0, 2.0, 3.0];
        let post = [0.5, -1.0];
        NormalizedHebbian.update(&mut w, 2, 3, &pre, &post, 1, 0.1);
        for row in w.chunks(3) {
            assert_abs_diff_eq!(row_norm(row), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zerosum_rows_sum_to_zero() {
        let mut w = vec![0.3, -0.2, 0.1, 0.4, 0.5, -0.6, 0.0, 0.0, 0.0];
        let pre = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let post = [0.1, 0.9, 0.2, 0.7, 0.1, 0.0];
        NormalizedZerosumHebbian.update(&mut w, 3, 3, &pre, &post, 2, 0.2);
        for row in w.chunks(3).take(2) {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(row_norm(row), 1.0, epsilon = 1e-12);
        }
        // a row that never had any weight stays zero
        assert!(w[6..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_binary_correlator_balance() {
        let mut w = vec![0.5; 4];
        // one sample, inputs [1, 0, 0, 0], output on
        let pre = [1.0, 0.0, 0.0, 0.0];
        let post = [1.0];
        BinaryCorrelatorLearningRule.update(&mut w, 1, 4, &pre, &post, 1, 0.3);
        assert_abs_diff_eq!(w[0], 0.8, epsilon = 1e-12);
        for &v in &w[1..] {
            assert_abs_diff_eq!(v, 0.4, epsilon = 1e-12);
        }
        // total change is zero: +η once, -η/3 three times
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            LearningRuleKind::Hebbian,
            LearningRuleKind::NormalizedHebbian,
            LearningRuleKind::NormalizedZerosumHebbian,
            LearningRuleKind::BinaryCorrelator,
        ] {
            assert_eq!(kind.build().kind(), kind);
        }
    }
}
