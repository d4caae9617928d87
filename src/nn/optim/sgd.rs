use crate::nn::Optimizer;
use crate::nn::network::Network;

/// Stochastic Gradient Descent optimizer with optional momentum
///
/// Update rule:
/// - Without momentum: θ ← θ - lr·∇θ
/// - With momentum: v ← β·v - lr·∇θ, θ ← θ + v
///
/// Momentum helps accelerate convergence and dampen oscillations.
pub struct SGD {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocity: Vec<Vec<f32>>,
}

impl SGD {
    /// Create a new SGD optimizer
    ///
    /// # Arguments
    /// * `model` - Network to optimize; its parameter layout sizes the momentum state
    /// * `lr` - Learning rate (typical: 0.01 to 0.1)
    /// * `momentum` - Momentum coefficient (typical: 0.9, or 0.0 for no momentum)
    /// * `weight_decay` - L2 penalty (typical: 1e-4, or 0.0 for none)
    pub fn new(model: &Network, lr: f32, momentum: f32, weight_decay: f32) -> Self {
        let velocity = if momentum > 0.0 {
            model.param_sizes().iter().map(|&n| vec![0.0; n]).collect()
        } else {
            vec![]
        };

        SGD {
            lr,
            momentum,
            weight_decay,
            velocity,
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, model: &mut Network) {
        let lr = self.lr;
        let momentum = self.momentum;
        let weight_decay = self.weight_decay;
        let velocity = &mut self.velocity;

        let mut i = 0;
        model.for_each_param(|p| {
            if momentum > 0.0 {
                let state = &mut velocity[i];
                assert_eq!(
                    state.len(),
                    p.value.len(),
                    "optimizer state does not match the model"
                );
                for ((theta, &grad), v) in p.value.iter_mut().zip(p.grad).zip(state.iter_mut()) {
                    // Weight decay folds into the gradient: g = ∇θ + wd·θ
                    let g = grad + weight_decay * *theta;
                    *v = momentum * *v - lr * g;
                    *theta += *v;
                }
            } else {
                for (theta, &grad) in p.value.iter_mut().zip(p.grad) {
                    let g = grad + weight_decay * *theta;
                    *theta -= lr * g;
                }
            }
            i += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{StateDict, TensorData};
    use crate::nn::Mode;
    use crate::nn::network::NetworkSpec;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // A 1-in 1-out network with a known weight and zero bias, so every
    // update is checkable by hand.
    fn unit_network(weight: f32) -> Network {
        let mut rng = StdRng::seed_from_u64(0);
        let mut net = Network::with_rng(NetworkSpec::new(1, 1, vec![]), 0.0, &mut rng).unwrap();
        let mut state = StateDict::new();
        state.insert(
            "output.weight".to_string(),
            TensorData {
                data: vec![weight],
                shape: vec![1, 1],
            },
        );
        state.insert(
            "output.bias".to_string(),
            TensorData {
                data: vec![0.0],
                shape: vec![1],
            },
        );
        net.load_state_dict(&state).unwrap();
        net
    }

    // Puts a gradient of exactly 1.0 on both the weight and the bias.
    fn accumulate_unit_grad(net: &mut Network) {
        net.zero_grad();
        net.forward(&array![[1.0]], Mode::Train);
        net.backward(&array![[1.0]]);
    }

    fn weight_of(net: &Network) -> f32 {
        net.state_dict()["output.weight"].data[0]
    }

    fn bias_of(net: &Network) -> f32 {
        net.state_dict()["output.bias"].data[0]
    }

    #[test]
    fn test_plain_step() {
        let mut net = unit_network(2.0);
        let mut opt = SGD::new(&net, 0.1, 0.0, 0.0);
        accumulate_unit_grad(&mut net);
        opt.step(&mut net);
        assert!((weight_of(&net) - 1.9).abs() < 1e-6);
        assert!((bias_of(&net) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_momentum_accumulates_velocity() {
        let mut net = unit_network(2.0);
        let mut opt = SGD::new(&net, 0.1, 0.9, 0.0);

        accumulate_unit_grad(&mut net);
        opt.step(&mut net);
        // v1 = -0.1, θ = 1.9
        assert!((weight_of(&net) - 1.9).abs() < 1e-6);

        accumulate_unit_grad(&mut net);
        opt.step(&mut net);
        // v2 = 0.9·(-0.1) - 0.1 = -0.19, θ = 1.71
        assert!((weight_of(&net) - 1.71).abs() < 1e-6);
    }

    #[test]
    fn test_weight_decay_shrinks_parameters() {
        let mut net = unit_network(2.0);
        let mut opt = SGD::new(&net, 0.1, 0.0, 0.5);
        accumulate_unit_grad(&mut net);
        opt.step(&mut net);
        // g = 1 + 0.5·2 = 2, θ = 2 - 0.1·2 = 1.8
        assert!((weight_of(&net) - 1.8).abs() < 1e-6);
    }
}
