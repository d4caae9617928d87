use crate::nn::network::Network;

pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::SGD;

/// A gradient-based parameter update rule.
///
/// Optimizers hold their own per-parameter state, sized from the network at
/// construction and indexed by the fixed visit order of
/// [`Network::for_each_param`]. `step` consumes whatever gradients have been
/// accumulated; callers zero them between batches.
pub trait Optimizer {
    fn step(&mut self, model: &mut Network);
}
