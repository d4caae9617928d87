use crate::nn::Optimizer;
use crate::nn::network::Network;

/// Adam optimizer (Kingma & Ba, 2015) with decoupled state per parameter.
///
/// Keeps exponential moving averages of the gradient (`m`) and its square
/// (`v`), bias-corrected by the step count.
pub struct Adam {
    lr: f32,
    betas: (f32, f32),
    eps: f32,
    weight_decay: f32,
    m: Vec<Vec<f32>>, // 1st moment
    v: Vec<Vec<f32>>, // 2nd moment
    t: usize,         // timestep
}

impl Adam {
    /// Create a new Adam optimizer
    ///
    /// # Arguments
    /// * `model` - Network to optimize; its parameter layout sizes the moment state
    /// * `lr` - Learning rate (typical: 1e-3)
    /// * `betas` - Moment decay rates (typical: (0.9, 0.999))
    /// * `eps` - Denominator fuzz (typical: 1e-8)
    /// * `weight_decay` - L2 penalty (typical: 0.0)
    #[must_use]
    pub fn new(model: &Network, lr: f32, betas: (f32, f32), eps: f32, weight_decay: f32) -> Self {
        let sizes = model.param_sizes();
        let m = sizes.iter().map(|&n| vec![0.0; n]).collect();
        let v = sizes.iter().map(|&n| vec![0.0; n]).collect();

        Adam {
            lr,
            betas,
            eps,
            weight_decay,
            m,
            v,
            t: 0,
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut Network) {
        self.t += 1;

        // Bias correction is identical for every parameter at a given step
        let m_hat_scale = 1.0 / (1.0 - self.betas.0.powi(self.t as i32));
        let v_hat_scale = 1.0 / (1.0 - self.betas.1.powi(self.t as i32));

        let (beta1, beta2) = self.betas;
        let lr = self.lr;
        let eps = self.eps;
        let weight_decay = self.weight_decay;
        let m_state = &mut self.m;
        let v_state = &mut self.v;

        let mut i = 0;
        model.for_each_param(|p| {
            let m = &mut m_state[i];
            let v = &mut v_state[i];
            assert_eq!(
                m.len(),
                p.value.len(),
                "optimizer state does not match the model"
            );

            for (j, (theta, &grad)) in p.value.iter_mut().zip(p.grad).enumerate() {
                let g = grad + weight_decay * *theta;

                // Update biased moments
                m[j] = beta1 * m[j] + (1.0 - beta1) * g;
                v[j] = beta2 * v[j] + (1.0 - beta2) * g.powi(2);

                let m_hat = m[j] * m_hat_scale;
                let v_hat = v[j] * v_hat_scale;
                *theta -= lr * m_hat / (v_hat.sqrt() + eps);
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

    fn accumulate_unit_grad(net: &mut Network) {
        net.zero_grad();
        net.forward(&array![[1.0]], Mode::Train);
        net.backward(&array![[1.0]]);
    }

    fn weight_of(net: &Network) -> f32 {
        net.state_dict()["output.weight"].data[0]
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut net = unit_network(2.0);
        let mut opt = Adam::new(&net, 0.001, (0.9, 0.999), 1e-8, 0.0);
        accumulate_unit_grad(&mut net);
        opt.step(&mut net);
        // After bias correction the first update is lr·g/(|g| + eps) ≈ lr.
        assert!((weight_of(&net) - 1.999).abs() < 1e-4);
    }

    #[test]
    fn test_steps_keep_shrinking_the_gap() {
        let mut net = unit_network(1.0);
        let mut opt = Adam::new(&net, 0.01, (0.9, 0.999), 1e-8, 0.0);
        let mut last = weight_of(&net);
        for _ in 0..5 {
            accumulate_unit_grad(&mut net);
            opt.step(&mut net);
            let now = weight_of(&net);
            assert!(now < last);
            last = now;
        }
    }
}
