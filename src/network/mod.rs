//! Networks: the layer chain and the strategies that train it
//!
//! [`MultiLayerNeuralNetwork`] owns an ordered sequence of layers and folds
//! batches through them. The training strategies wrap it:
//!
//! - [`BackpropagationNeuralNetwork`]: loss gradient, reverse fold, optimizers
//! - [`HebbianNeuralNetwork`]: every layer learns locally during the forward fold
//!
//! Both implement [`Trainer`], so code driving training does not need to know
//! which strategy it runs.

pub mod backpropagation;
pub mod hebbian;
pub mod multi_layer;

pub use backpropagation::BackpropagationNeuralNetwork;
pub use hebbian::HebbianNeuralNetwork;
pub use multi_layer::MultiLayerNeuralNetwork;

use crate::error::Result;

/// Common surface of the training strategies.
pub trait Trainer {
    /// The layer chain being trained.
    fn network(&self) -> &MultiLayerNeuralNetwork;

    /// Runs a batch through the network and returns its output.
    fn forward(&mut self, batch: &[f64], test: bool) -> Result<&[f64]>;

    /// Applies the strategy's parameter update using the state left by the
    /// last forward (and, for backpropagation, backward) pass.
    fn update(&mut self) -> Result<()>;

    /// Output of the last forward pass.
    fn predictions(&self) -> &[f64] {
        self.network().predictions()
    }
}
