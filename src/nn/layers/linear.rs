use ndarray::{Array1, Array2, Axis};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;

use crate::nn::{Layer, Mode, ParamView};

/// Fully-connected (dense/linear) layer
///
/// Computes: y = xWᵀ + b
/// where x is (batch, in_features), W is (out_features, in_features),
/// b is (out_features).
#[derive(Debug)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
    grad_weight: Array2<f32>,
    grad_bias: Array1<f32>,
    // Input cached by the most recent `Mode::Train` forward, consumed by
    // `backward`. `Mode::Eval` leaves it untouched.
    input: Option<Array2<f32>>,
}

impl Linear {
    /// Create a new linear layer with random initialization
    ///
    /// Weights use He-uniform initialization, U(±sqrt(6/in_features)),
    /// which suits the ReLU activations that follow every hidden layer.
    /// Biases start at zero.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        assert!(
            in_features > 0 && out_features > 0,
            "Linear layer dimensions must be positive"
        );
        let limit = (6.0 / in_features as f32).sqrt();
        let dist = Uniform::new(-limit, limit).expect("initialization bounds are finite");
        let weight = Array2::random_using((out_features, in_features), dist, rng);

        Linear {
            weight,
            bias: Array1::zeros(out_features),
            grad_weight: Array2::zeros((out_features, in_features)),
            grad_bias: Array1::zeros(out_features),
            input: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    /// Reset accumulated gradients to zero. Idempotent.
    pub fn zero_grad(&mut self) {
        self.grad_weight.fill(0.0);
        self.grad_bias.fill(0.0);
    }

    /// Replace the parameters wholesale. Shapes must already be verified.
    pub(crate) fn load_parameters(&mut self, weight: Array2<f32>, bias: Array1<f32>) {
        debug_assert_eq!(weight.dim(), self.weight.dim());
        debug_assert_eq!(bias.len(), self.bias.len());
        self.weight = weight;
        self.bias = bias;
    }

    pub(crate) fn visit_params<F: FnMut(ParamView<'_>)>(&mut self, f: &mut F) {
        f(ParamView {
            value: self
                .weight
                .as_slice_mut()
                .expect("weight is stored contiguously"),
            grad: self
                .grad_weight
                .as_slice()
                .expect("gradient is stored contiguously"),
        });
        f(ParamView {
            value: self
                .bias
                .as_slice_mut()
                .expect("bias is stored contiguously"),
            grad: self
                .grad_bias
                .as_slice()
                .expect("gradient is stored contiguously"),
        });
    }
}

impl Layer for Linear {
    fn forward(&mut self, input: &Array2<f32>, mode: Mode) -> Array2<f32> {
        assert_eq!(
            input.ncols(),
            self.in_features(),
            "Linear layer expects {} input features, got {}",
            self.in_features(),
            input.ncols()
        );
        if mode.is_train() {
            self.input = Some(input.clone());
        }
        input.dot(&self.weight.t()) + &self.bias
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        let input = self
            .input
            .take()
            .expect("backward called without a training-mode forward");

        // grad_output is (batch, out). Accumulate into the parameter
        // gradients; the loss gradient already carries the 1/batch factor.
        self.grad_weight += &grad_output.t().dot(&input);
        self.grad_bias += &grad_output.sum_axis(Axis(0));

        grad_output.dot(&self.weight)
    }
}
