use ndarray::Array2;

use crate::nn::{Layer, Mode};

/// Rectified linear activation: y = max(x, 0).
///
/// The backward pass uses the subgradient 0 at x = 0.
#[derive(Debug, Default)]
pub struct ReLU {
    mask: Option<Array2<f32>>,
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for ReLU {
    fn forward(&mut self, input: &Array2<f32>, mode: Mode) -> Array2<f32> {
        if mode.is_train() {
            self.mask = Some(input.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }));
        }
        input.mapv(|v| v.max(0.0))
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        let mask = self
            .mask
            .take()
            .expect("backward called without a training-mode forward");
        grad_output * &mask
    }
}
