use std::collections::BTreeSet;

use bincode::{Decode, Encode};
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::error::{GalvaniError, Result};
use crate::io::{StateDict, TensorData};
use crate::nn::layers::{Dropout, Linear, ReLU};
use crate::nn::{Layer, Mode, ParamView};

/// Architecture of a feed-forward classifier: layer widths only.
///
/// `hidden_layers` may be empty, in which case the network is a single
/// linear map from input to output.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct NetworkSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub hidden_layers: Vec<usize>,
}

impl NetworkSpec {
    pub fn new(input_size: usize, output_size: usize, hidden_layers: Vec<usize>) -> Self {
        NetworkSpec {
            input_size,
            output_size,
            hidden_layers,
        }
    }

    /// Check that every width is positive.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(GalvaniError::InvalidSpecification {
                reason: "input_size must be positive".to_string(),
            });
        }
        if self.output_size == 0 {
            return Err(GalvaniError::InvalidSpecification {
                reason: "output_size must be positive".to_string(),
            });
        }
        if let Some(i) = self.hidden_layers.iter().position(|&w| w == 0) {
            return Err(GalvaniError::InvalidSpecification {
                reason: format!("hidden layer {i} has zero width"),
            });
        }
        Ok(())
    }

    /// The `(fan_in, fan_out)` of every linear stage in order. The last
    /// entry is always the output stage; the ones before it are hidden
    /// stages. This sequence is the single source the builder consumes.
    pub fn stage_shapes(&self) -> Vec<(usize, usize)> {
        let mut shapes = Vec::with_capacity(self.hidden_layers.len() + 1);
        let mut fan_in = self.input_size;
        for &width in &self.hidden_layers {
            shapes.push((fan_in, width));
            fan_in = width;
        }
        shapes.push((fan_in, self.output_size));
        shapes
    }
}

/// One hidden stage: affine map, ReLU, dropout.
#[derive(Debug)]
struct HiddenStage {
    linear: Linear,
    relu: ReLU,
    dropout: Dropout,
}

/// Feed-forward classifier built from a [`NetworkSpec`].
///
/// Hidden stages apply `Linear -> ReLU -> Dropout`; the output stage is a
/// bare linear map, so `forward` returns raw logits. Pair it with
/// [`CrossEntropy`](crate::nn::CrossEntropy), which expects logits rather
/// than probabilities.
#[derive(Debug)]
pub struct Network {
    spec: NetworkSpec,
    dropout: f32,
    hidden: Vec<HiddenStage>,
    output: Linear,
}

impl Network {
    /// Build a network with freshly initialized parameters.
    ///
    /// `dropout` is the probability applied after every hidden activation;
    /// pass 0.0 to disable it. Fails with `InvalidSpecification` if any
    /// width is zero or `dropout` falls outside `[0, 1)`.
    pub fn new(spec: NetworkSpec, dropout: f32) -> Result<Self> {
        Self::with_rng(spec, dropout, &mut rand::rng())
    }

    /// Like [`Network::new`] but drawing initial weights from `rng`, for
    /// reproducible experiments.
    pub fn with_rng<R: Rng + ?Sized>(spec: NetworkSpec, dropout: f32, rng: &mut R) -> Result<Self> {
        spec.validate()?;
        if !(0.0..1.0).contains(&dropout) {
            return Err(GalvaniError::InvalidSpecification {
                reason: format!("dropout probability must be in [0, 1), got {dropout}"),
            });
        }

        let shapes = spec.stage_shapes();
        let (&(out_fan_in, out_fan_out), hidden_shapes) = shapes
            .split_last()
            .expect("stage_shapes always contains the output stage");

        let hidden = hidden_shapes
            .iter()
            .map(|&(fan_in, fan_out)| HiddenStage {
                linear: Linear::new(fan_in, fan_out, rng),
                relu: ReLU::new(),
                dropout: Dropout::new(dropout),
            })
            .collect();

        Ok(Network {
            output: Linear::new(out_fan_in, out_fan_out, rng),
            spec,
            dropout,
            hidden,
        })
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    pub fn dropout(&self) -> f32 {
        self.dropout
    }

    /// Run a batch through the network and return logits of shape
    /// `(batch, output_size)`.
    pub fn forward(&mut self, input: &Array2<f32>, mode: Mode) -> Array2<f32> {
        assert_eq!(
            input.ncols(),
            self.spec.input_size,
            "network expects {} input features, got {}",
            self.spec.input_size,
            input.ncols()
        );

        let mut activation = input.clone();
        for stage in &mut self.hidden {
            activation = stage.linear.forward(&activation, mode);
            activation = stage.relu.forward(&activation, mode);
            activation = stage.dropout.forward(&activation, mode);
        }
        self.output.forward(&activation, mode)
    }

    /// Propagate the loss gradient back through every stage, accumulating
    /// parameter gradients. Requires a preceding `Mode::Train` forward on
    /// the same batch.
    pub fn backward(&mut self, grad_logits: &Array2<f32>) {
        assert_eq!(
            grad_logits.ncols(),
            self.spec.output_size,
            "gradient has {} columns but the network produces {} logits",
            grad_logits.ncols(),
            self.spec.output_size
        );

        let mut grad = self.output.backward(grad_logits);
        for stage in self.hidden.iter_mut().rev() {
            grad = stage.dropout.backward(&grad);
            grad = stage.relu.backward(&grad);
            grad = stage.linear.backward(&grad);
        }
    }

    /// Reset every accumulated gradient to zero. Idempotent, and
    /// independent of any pending forward caches.
    pub fn zero_grad(&mut self) {
        for stage in &mut self.hidden {
            stage.linear.zero_grad();
        }
        self.output.zero_grad();
    }

    /// Visit every parameter in a fixed order: hidden stages in sequence,
    /// weight before bias, output stage last. Optimizers rely on this order
    /// to index their per-parameter state.
    pub fn for_each_param<F: FnMut(ParamView<'_>)>(&mut self, mut f: F) {
        for stage in &mut self.hidden {
            stage.linear.visit_params(&mut f);
        }
        self.output.visit_params(&mut f);
    }

    /// Element counts of the parameters in visit order.
    pub fn param_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(2 * (self.hidden.len() + 1));
        for (_, linear) in self.stage_entries() {
            sizes.push(linear.out_features() * linear.in_features());
            sizes.push(linear.out_features());
        }
        sizes
    }

    /// Total number of trainable scalars.
    pub fn num_params(&self) -> usize {
        self.param_sizes().iter().sum()
    }

    /// Snapshot every parameter under its canonical key:
    /// `hidden_layers.{i}.weight`, `hidden_layers.{i}.bias`, ...,
    /// `output.weight`, `output.bias`.
    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (name, linear) in self.stage_entries() {
            state.insert(
                format!("{name}.weight"),
                TensorData::from_array2(linear.weight()),
            );
            state.insert(
                format!("{name}.bias"),
                TensorData::from_array1(linear.bias()),
            );
        }
        state
    }

    /// Load parameters from a state dict, strictly.
    ///
    /// The dict must carry exactly the keys this architecture defines, each
    /// with exactly the matching shape. Every tensor is resolved and
    /// verified before any parameter is written, so a failed load leaves
    /// the network byte-for-byte as it was.
    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        let mut pending: Vec<(Array2<f32>, Array1<f32>)> =
            Vec::with_capacity(self.hidden.len() + 1);
        let mut expected_keys = BTreeSet::new();

        for (name, linear) in self.stage_entries() {
            let weight_key = format!("{name}.weight");
            let bias_key = format!("{name}.bias");
            let weight = expect_matrix(
                state,
                &weight_key,
                linear.out_features(),
                linear.in_features(),
            )?;
            let bias = expect_vector(state, &bias_key, linear.out_features())?;
            expected_keys.insert(weight_key);
            expected_keys.insert(bias_key);
            pending.push((weight, bias));
        }
        for key in state.keys() {
            if !expected_keys.contains(key) {
                return Err(GalvaniError::UnexpectedParameter { key: key.clone() });
            }
        }

        // Everything checked out; assignment cannot fail from here on.
        let mut pending = pending.into_iter();
        for stage in &mut self.hidden {
            let (weight, bias) = pending.next().expect("one pending entry per hidden stage");
            stage.linear.load_parameters(weight, bias);
        }
        let (weight, bias) = pending.next().expect("pending entry for the output stage");
        self.output.load_parameters(weight, bias);
        Ok(())
    }

    /// Stage name and linear layer pairs, in forward order.
    fn stage_entries(&self) -> Vec<(String, &Linear)> {
        let mut entries: Vec<(String, &Linear)> = self
            .hidden
            .iter()
            .enumerate()
            .map(|(i, stage)| (format!("hidden_layers.{i}"), &stage.linear))
            .collect();
        entries.push(("output".to_string(), &self.output));
        entries
    }
}

fn expect_matrix(state: &StateDict, key: &str, rows: usize, cols: usize) -> Result<Array2<f32>> {
    let td = state.get(key).ok_or_else(|| GalvaniError::MissingParameter {
        key: key.to_string(),
    })?;
    let expected = vec![rows, cols];
    if td.shape != expected {
        return Err(GalvaniError::ShapeMismatch {
            key: key.to_string(),
            expected,
            found: td.shape.clone(),
        });
    }
    if td.data.len() != rows * cols {
        return Err(GalvaniError::InvalidTensorData {
            key: key.to_string(),
            declared: rows * cols,
            actual: td.data.len(),
        });
    }
    Array2::from_shape_vec((rows, cols), td.data.clone()).map_err(|_| {
        GalvaniError::InvalidTensorData {
            key: key.to_string(),
            declared: rows * cols,
            actual: td.data.len(),
        }
    })
}

fn expect_vector(state: &StateDict, key: &str, len: usize) -> Result<Array1<f32>> {
    let td = state.get(key).ok_or_else(|| GalvaniError::MissingParameter {
        key: key.to_string(),
    })?;
    let expected = vec![len];
    if td.shape != expected {
        return Err(GalvaniError::ShapeMismatch {
            key: key.to_string(),
            expected,
            found: td.shape.clone(),
        });
    }
    if td.data.len() != len {
        return Err(GalvaniError::InvalidTensorData {
            key: key.to_string(),
            declared: len,
            actual: td.data.len(),
        });
    }
    Ok(Array1::from_vec(td.data.clone()))
}
