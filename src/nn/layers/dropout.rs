use ndarray::Array2;
use rand::Rng;

use crate::nn::{Layer, Mode};

/// Inverted dropout.
///
/// During training each element is zeroed with probability `p` and the
/// survivors are scaled by `1 / (1 - p)`, so activations keep the same
/// expected magnitude and evaluation needs no rescaling. Under `Mode::Eval`
/// (or with `p == 0`) the layer is the identity.
#[derive(Debug)]
pub struct Dropout {
    p: f32,
    mask: Option<Array2<f32>>,
}

impl Dropout {
    /// Create a new Dropout layer
    ///
    /// # Panics
    /// `p` must be in `[0, 1)`; `p = 1` would zero every activation and make
    /// the inverted scale undefined.
    #[must_use]
    pub fn new(p: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1)"
        );
        Self { p, mask: None }
    }

    pub fn p(&self) -> f32 {
        self.p
    }
}

impl Layer for Dropout {
    fn forward(&mut self, input: &Array2<f32>, mode: Mode) -> Array2<f32> {
        if !mode.is_train() || self.p == 0.0 {
            return input.clone();
        }

        let keep_prob = 1.0 - self.p;
        let scale = 1.0 / keep_prob;

        // Mask entries are `scale` with probability (1-p), 0 with probability p
        let mut rng = rand::rng();
        let mask = Array2::from_shape_fn(input.raw_dim(), |_| {
            if rng.random::<f32>() < keep_prob {
                scale
            } else {
                0.0
            }
        });

        let output = input * &mask;
        self.mask = Some(mask);
        output
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        // With dropout disabled the forward pass stored no mask.
        if self.p == 0.0 {
            return grad_output.clone();
        }
        let mask = self
            .mask
            .take()
            .expect("backward called without a training-mode forward");
        grad_output * &mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_eval_is_identity() {
        let mut dropout = Dropout::new(0.5);
        let x = Array2::from_elem((4, 4), 2.0);
        let y = dropout.forward(&x, Mode::Eval);
        assert_eq!(y, x);
        assert!(dropout.mask.is_none());
    }

    #[test]
    fn test_zero_probability_is_identity_in_train() {
        let mut dropout = Dropout::new(0.0);
        let x = Array2::from_elem((4, 4), 2.0);
        let y = dropout.forward(&x, Mode::Train);
        assert_eq!(y, x);
    }

    #[test]
    fn test_backward_is_identity_when_disabled() {
        let mut dropout = Dropout::new(0.0);
        let x = Array2::from_elem((4, 4), 2.0);
        dropout.forward(&x, Mode::Train);
        let grad = Array2::from_elem((4, 4), 0.25);
        assert_eq!(dropout.backward(&grad), grad);
    }

    #[test]
    fn test_train_zeroes_or_scales() {
        let mut dropout = Dropout::new(0.5);
        let x = Array2::from_elem((8, 8), 3.0);
        let y = dropout.forward(&x, Mode::Train);
        // Each element is either dropped or scaled by 1/keep_prob.
        assert!(y.iter().all(|&v| v == 0.0 || v == 6.0));
    }

    #[test]
    fn test_backward_reuses_forward_mask() {
        let mut dropout = Dropout::new(0.5);
        let x = Array2::from_elem((8, 8), 1.0);
        let y = dropout.forward(&x, Mode::Train);
        let grad = dropout.backward(&Array2::from_elem((8, 8), 1.0));
        // Gradient flows exactly where the activation survived.
        for (g, v) in grad.iter().zip(y.iter()) {
            assert_eq!(*g == 0.0, *v == 0.0);
        }
    }

    #[test]
    #[should_panic(expected = "Dropout probability")]
    fn test_rejects_probability_one() {
        Dropout::new(1.0);
    }
}
