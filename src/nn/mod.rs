use ndarray::Array2;

pub mod layers;
pub mod loss;
pub mod network;
pub mod optim;

pub use layers::{Dropout, Linear, ReLU};
pub use loss::{CrossEntropy, Loss, accuracy, predictions, softmax};
pub use network::{Network, NetworkSpec};
pub use optim::{Adam, Optimizer, SGD};

/// Whether a forward pass runs under training or evaluation semantics.
///
/// There is no ambient flag stored on the network; every forward call states
/// its mode explicitly. `Train` caches the intermediates the backward pass
/// needs and keeps dropout active; `Eval` caches nothing and passes inputs
/// through dropout unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

/// One stage of a feed-forward pipeline.
///
/// `forward` maps a `(batch, in)` activation matrix to `(batch, out)`.
/// `backward` consumes the cache left by the most recent `Mode::Train`
/// forward, accumulates parameter gradients where the stage has parameters,
/// and returns the gradient with respect to the stage input.
pub trait Layer {
    fn forward(&mut self, input: &Array2<f32>, mode: Mode) -> Array2<f32>;
    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32>;
}

/// Mutable view of one parameter buffer paired with its accumulated gradient.
///
/// Produced by [`Network::for_each_param`](network::Network::for_each_param)
/// in a fixed order (hidden stages first, weight before bias, output last), so
/// optimizers can keep per-parameter state in a plain `Vec` indexed by visit
/// position.
pub struct ParamView<'a> {
    pub value: &'a mut [f32],
    pub grad: &'a [f32],
}
