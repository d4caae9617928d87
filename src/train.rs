use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::Dataset;
use crate::nn::network::Network;
use crate::nn::{Loss, Mode, Optimizer, accuracy};
use crate::utils::ProgressBar;

/// Knobs for [`Trainer::fit`].
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Full passes over the training set.
    pub epochs: usize,
    /// Mini-batch size; the final batch of an epoch may be smaller.
    pub batch_size: usize,
    /// Record and print the running training loss every this many steps.
    /// 0 disables interval logging.
    pub log_every: usize,
    /// Evaluate every this many epochs when an eval set is supplied.
    /// 0 disables evaluation.
    pub eval_every: usize,
    /// Reshuffle the training set each epoch.
    pub shuffle: bool,
    /// Seed for the shuffle order. `None` draws from the thread RNG.
    pub seed: Option<u64>,
    /// Render a per-epoch progress bar on stderr.
    pub progress: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 10,
            batch_size: 32,
            log_every: 40,
            eval_every: 1,
            shuffle: true,
            seed: None,
            progress: false,
        }
    }
}

/// One entry of the training log. Interval records carry the running
/// training loss; evaluation records additionally carry eval metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Epoch the record was taken in, 1-based.
    pub epoch: usize,
    /// Global step count at the time of the record, 1-based.
    pub step: usize,
    pub train_loss: f32,
    pub eval_loss: Option<f32>,
    pub eval_accuracy: Option<f32>,
}

/// Loss and accuracy over one dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalStats {
    pub loss: f32,
    pub accuracy: f32,
}

/// Everything [`Trainer::fit`] measured: records in the order they were
/// taken, plus the mean training loss of each epoch.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub records: Vec<StepRecord>,
    pub epoch_loss: Vec<f32>,
}

impl History {
    pub fn final_train_loss(&self) -> Option<f32> {
        self.epoch_loss.last().copied()
    }

    /// The most recent record that carries evaluation metrics.
    pub fn last_eval(&self) -> Option<&StepRecord> {
        self.records.iter().rev().find(|r| r.eval_loss.is_some())
    }
}

/// Drives epochs of mini-batch gradient descent over a [`Network`].
///
/// Every step runs the same sequence: zero gradients, forward under
/// `Mode::Train`, loss, backward, optimizer step. Evaluation runs under
/// `Mode::Eval`, so it neither produces gradients nor disturbs the ones
/// being accumulated by training.
pub struct Trainer<L: Loss, O: Optimizer> {
    loss: L,
    optimizer: O,
    config: TrainConfig,
}

impl<L: Loss, O: Optimizer> Trainer<L, O> {
    pub fn new(loss: L, optimizer: O, config: TrainConfig) -> Self {
        Trainer {
            loss,
            optimizer,
            config,
        }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train `model` on `train`, optionally evaluating on `eval` between
    /// epochs, and return the full log.
    pub fn fit(&mut self, model: &mut Network, train: &Dataset, eval: Option<&Dataset>) -> History {
        assert_eq!(
            train.num_features(),
            model.spec().input_size,
            "training set has {} features but the network expects {}",
            train.num_features(),
            model.spec().input_size
        );
        if let Some(eval_set) = eval {
            assert_eq!(
                eval_set.num_features(),
                model.spec().input_size,
                "eval set has {} features but the network expects {}",
                eval_set.num_features(),
                model.spec().input_size
            );
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut history = History::default();
        let mut step = 0;
        let num_batches = train.num_batches(self.config.batch_size);

        for epoch in 1..=self.config.epochs {
            let mut bar = self
                .config
                .progress
                .then(|| ProgressBar::new(num_batches, &format!("epoch {epoch}")));

            let batches = if self.config.shuffle {
                train.shuffled_batches(self.config.batch_size, &mut rng)
            } else {
                train.batches(self.config.batch_size)
            };

            let mut epoch_sum = 0.0;
            let mut epoch_count = 0usize;
            let mut running_sum = 0.0;
            let mut running_count = 0usize;

            for batch in batches {
                model.zero_grad();
                let logits = model.forward(&batch.inputs, Mode::Train);
                let loss = self.loss.loss(&logits, &batch.labels);
                let grad = self.loss.grad(&logits, &batch.labels);
                model.backward(&grad);
                self.optimizer.step(model);

                step += 1;
                epoch_sum += loss * batch.len() as f32;
                epoch_count += batch.len();
                running_sum += loss;
                running_count += 1;

                if let Some(bar) = bar.as_mut() {
                    bar.set_message(format!("loss = {loss:.4}"));
                    bar.inc();
                }

                if self.config.log_every > 0 && step % self.config.log_every == 0 {
                    let mean = running_sum / running_count as f32;
                    running_sum = 0.0;
                    running_count = 0;
                    history.records.push(StepRecord {
                        epoch,
                        step,
                        train_loss: mean,
                        eval_loss: None,
                        eval_accuracy: None,
                    });
                    println!(
                        "Epoch {epoch}/{}, step {step}: loss = {mean:.6}",
                        self.config.epochs
                    );
                }
            }
            drop(bar);

            let epoch_mean = epoch_sum / epoch_count as f32;
            history.epoch_loss.push(epoch_mean);

            let should_eval = self.config.eval_every > 0 && epoch % self.config.eval_every == 0;
            let stats = match eval {
                Some(eval_set) if should_eval => Some(evaluate(
                    model,
                    eval_set,
                    &self.loss,
                    self.config.batch_size,
                )),
                _ => None,
            };

            match stats {
                Some(stats) => {
                    history.records.push(StepRecord {
                        epoch,
                        step,
                        train_loss: epoch_mean,
                        eval_loss: Some(stats.loss),
                        eval_accuracy: Some(stats.accuracy),
                    });
                    println!(
                        "Epoch {epoch}/{}: train loss = {epoch_mean:.6}, eval loss = {:.6}, eval accuracy = {:.3}",
                        self.config.epochs, stats.loss, stats.accuracy
                    );
                }
                None => {
                    println!(
                        "Epoch {epoch}/{}: train loss = {epoch_mean:.6}",
                        self.config.epochs
                    );
                }
            }
        }

        history
    }
}

/// Mean per-example loss and accuracy over `data`, under `Mode::Eval`.
///
/// Batches are weighted by their sample count, so the result does not
/// depend on `batch_size`.
pub fn evaluate<L: Loss>(
    model: &mut Network,
    data: &Dataset,
    loss: &L,
    batch_size: usize,
) -> EvalStats {
    let mut loss_sum = 0.0;
    let mut correct = 0.0;
    let mut count = 0usize;

    for batch in data.batches(batch_size) {
        let logits = model.forward(&batch.inputs, Mode::Eval);
        let n = batch.len() as f32;
        loss_sum += loss.loss(&logits, &batch.labels) * n;
        correct += accuracy(&logits, &batch.labels) * n;
        count += batch.len();
    }

    EvalStats {
        loss: loss_sum / count as f32,
        accuracy: correct / count as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::network::NetworkSpec;
    use crate::nn::{CrossEntropy, SGD};
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // Two well-separated clusters with deterministic jitter: class 0 near
    // the origin, class 1 near (4, 4).
    fn two_cluster_dataset(n_per_class: usize) -> Dataset {
        let n = 2 * n_per_class;
        let mut rows = Vec::with_capacity(n * 2);
        let mut labels = Vec::with_capacity(n);
        for i in 0..n_per_class {
            let jitter = (i % 5) as f32 * 0.1;
            rows.extend_from_slice(&[jitter, 0.5 - jitter]);
            labels.push(0);
            rows.extend_from_slice(&[4.0 + jitter, 4.0 - jitter]);
            labels.push(1);
        }
        Dataset::new(Array2::from_shape_vec((n, 2), rows).unwrap(), labels).unwrap()
    }

    fn seeded_net(seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        Network::with_rng(NetworkSpec::new(2, 2, vec![8]), 0.0, &mut rng).unwrap()
    }

    fn quiet_config() -> TrainConfig {
        TrainConfig {
            epochs: 15,
            batch_size: 8,
            log_every: 0,
            eval_every: 1,
            shuffle: true,
            seed: Some(1),
            progress: false,
        }
    }

    #[test]
    fn test_fit_reduces_loss_on_separable_data() {
        let data = two_cluster_dataset(20);
        let mut model = seeded_net(42);
        let optimizer = SGD::new(&model, 0.1, 0.9, 0.0);
        let mut trainer = Trainer::new(CrossEntropy, optimizer, quiet_config());

        let history = trainer.fit(&mut model, &data, Some(&data));

        let first = history.epoch_loss[0];
        let last = history.final_train_loss().unwrap();
        assert!(last < first * 0.5, "loss did not drop: {first} -> {last}");
        assert!(last < 0.3);

        let eval = history.last_eval().unwrap();
        assert!(eval.eval_accuracy.unwrap() >= 0.95);
    }

    #[test]
    fn test_history_layout() {
        let data = two_cluster_dataset(3); // 6 samples -> 3 batches of 2
        let mut model = seeded_net(7);
        let optimizer = SGD::new(&model, 0.05, 0.0, 0.0);
        let config = TrainConfig {
            epochs: 2,
            batch_size: 2,
            log_every: 1,
            eval_every: 1,
            shuffle: false,
            seed: None,
            progress: false,
        };
        let mut trainer = Trainer::new(CrossEntropy, optimizer, config);

        let history = trainer.fit(&mut model, &data, Some(&data));

        assert_eq!(history.epoch_loss.len(), 2);
        let interval: Vec<&StepRecord> = history
            .records
            .iter()
            .filter(|r| r.eval_loss.is_none())
            .collect();
        let evals: Vec<&StepRecord> = history
            .records
            .iter()
            .filter(|r| r.eval_loss.is_some())
            .collect();
        assert_eq!(interval.len(), 6);
        assert_eq!(
            interval.iter().map(|r| r.step).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert_eq!(evals.len(), 2);
        assert_eq!(evals[0].step, 3);
        assert_eq!(evals[1].step, 6);
        assert!(evals.iter().all(|r| r.eval_accuracy.is_some()));
    }

    #[test]
    fn test_no_eval_records_without_eval_set() {
        let data = two_cluster_dataset(3);
        let mut model = seeded_net(7);
        let optimizer = SGD::new(&model, 0.05, 0.0, 0.0);
        let config = TrainConfig {
            epochs: 1,
            batch_size: 2,
            log_every: 1,
            ..TrainConfig::default()
        };
        let mut trainer = Trainer::new(CrossEntropy, optimizer, config);

        let history = trainer.fit(&mut model, &data, None);
        assert!(history.records.iter().all(|r| r.eval_loss.is_none()));
        assert!(history.last_eval().is_none());
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let data = two_cluster_dataset(10);
        let config = TrainConfig {
            epochs: 3,
            batch_size: 4,
            log_every: 0,
            eval_every: 0,
            shuffle: true,
            seed: Some(3),
            progress: false,
        };

        let run = |seed| {
            let mut model = seeded_net(seed);
            let optimizer = SGD::new(&model, 0.05, 0.9, 0.0);
            Trainer::new(CrossEntropy, optimizer, config.clone()).fit(&mut model, &data, None)
        };

        let a = run(11);
        let b = run(11);
        assert_eq!(a.epoch_loss, b.epoch_loss);
    }

    #[test]
    fn test_evaluate_is_batch_size_invariant() {
        let data = two_cluster_dataset(10);
        let mut model = seeded_net(5);

        let whole = evaluate(&mut model, &data, &CrossEntropy, 20);
        let chunked = evaluate(&mut model, &data, &CrossEntropy, 3);

        assert!((whole.loss - chunked.loss).abs() < 1e-4);
        assert!((whole.accuracy - chunked.accuracy).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "features")]
    fn test_fit_rejects_feature_width_mismatch() {
        let data = two_cluster_dataset(4);
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = Network::with_rng(NetworkSpec::new(3, 2, vec![4]), 0.0, &mut rng).unwrap();
        let optimizer = SGD::new(&model, 0.05, 0.0, 0.0);
        Trainer::new(CrossEntropy, optimizer, TrainConfig::default()).fit(&mut model, &data, None);
    }
}
