use ndarray::{Array2, ArrayView1};

/// A loss over a batch of logits and integer class labels.
///
/// `loss` returns the mean per-example loss; `grad` returns the gradient of
/// that mean with respect to the logits, so downstream backward passes need
/// no extra batch scaling.
pub trait Loss {
    fn loss(&self, logits: &Array2<f32>, labels: &[usize]) -> f32;
    fn grad(&self, logits: &Array2<f32>, labels: &[usize]) -> Array2<f32>;
}

/// Softmax cross-entropy computed directly from logits.
///
/// Uses the max-subtracted log-sum-exp form, so large logits do not
/// overflow `exp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl Loss for CrossEntropy {
    fn loss(&self, logits: &Array2<f32>, labels: &[usize]) -> f32 {
        check_labels(logits, labels);
        let mut total = 0.0;
        for (row, &label) in logits.rows().into_iter().zip(labels) {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let sum_exp: f32 = row.iter().map(|&v| (v - max).exp()).sum();
            total += max + sum_exp.ln() - row[label];
        }
        total / labels.len() as f32
    }

    fn grad(&self, logits: &Array2<f32>, labels: &[usize]) -> Array2<f32> {
        check_labels(logits, labels);
        let batch = labels.len() as f32;
        let mut grad = softmax(logits);
        for (i, &label) in labels.iter().enumerate() {
            grad[[i, label]] -= 1.0;
        }
        grad /= batch;
        grad
    }
}

/// Row-wise softmax with max subtraction for numerical stability.
pub fn softmax(logits: &Array2<f32>) -> Array2<f32> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

/// Predicted class per row: the index of the largest logit, keeping the
/// first occurrence when several logits tie.
pub fn predictions(logits: &Array2<f32>) -> Vec<usize> {
    assert!(logits.ncols() > 0, "logits must have at least one class");
    logits.rows().into_iter().map(|row| argmax(&row)).collect()
}

/// Fraction of rows whose predicted class equals the label.
pub fn accuracy(logits: &Array2<f32>, labels: &[usize]) -> f32 {
    check_labels(logits, labels);
    let preds = predictions(logits);
    let correct = preds.iter().zip(labels).filter(|(p, l)| p == l).count();
    correct as f32 / labels.len() as f32
}

fn argmax(row: &ArrayView1<f32>) -> usize {
    // Strict comparison keeps the first occurrence on ties.
    let mut best = 0;
    let mut best_val = row[0];
    for (i, &v) in row.iter().enumerate().skip(1) {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

fn check_labels(logits: &Array2<f32>, labels: &[usize]) {
    assert_eq!(
        logits.nrows(),
        labels.len(),
        "got {} logit rows for {} labels",
        logits.nrows(),
        labels.len()
    );
    let classes = logits.ncols();
    assert!(
        labels.iter().all(|&l| l < classes),
        "label out of range for {classes} classes"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::f32::consts::LN_2;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let probs = softmax(&array![[1.0, 2.0, 3.0], [-1.0, 0.0, 1.0]]);
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_survives_large_logits() {
        let probs = softmax(&array![[1000.0, 0.0]]);
        assert!(probs.iter().all(|v| v.is_finite()));
        assert!((probs[[0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_logits_loss_is_log_classes() {
        let loss = CrossEntropy.loss(&array![[0.0, 0.0]], &[0]);
        assert!((loss - LN_2).abs() < 1e-6);

        let loss4 = CrossEntropy.loss(&array![[1.5, 1.5, 1.5, 1.5]], &[2]);
        assert!((loss4 - 4.0_f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_grad_is_softmax_minus_onehot_over_batch() {
        let grad = CrossEntropy.grad(&array![[0.0, 0.0]], &[0]);
        assert_eq!(grad, array![[-0.5, 0.5]]);

        // Across a batch of two, each row picks up a 1/2 factor.
        let grad2 = CrossEntropy.grad(&array![[0.0, 0.0], [0.0, 0.0]], &[0, 1]);
        assert_eq!(grad2, array![[-0.25, 0.25], [0.25, -0.25]]);
    }

    #[test]
    fn test_grad_rows_sum_to_zero() {
        let grad = CrossEntropy.grad(&array![[2.0, -1.0, 0.5], [0.0, 3.0, 1.0]], &[0, 2]);
        for row in grad.rows() {
            assert!(row.sum().abs() < 1e-6);
        }
    }

    #[test]
    fn test_loss_decreases_as_correct_logit_grows() {
        let low = CrossEntropy.loss(&array![[0.0, 0.0]], &[0]);
        let high = CrossEntropy.loss(&array![[2.0, 0.0]], &[0]);
        assert!(high < low);
    }

    #[test]
    fn test_predictions_break_ties_toward_first() {
        let preds = predictions(&array![[1.0, 1.0], [0.0, 0.0], [0.5, 2.0]]);
        assert_eq!(preds, vec![0, 0, 1]);
    }

    #[test]
    fn test_accuracy_counts_matches() {
        let logits = array![[2.0, 0.0], [0.0, 2.0], [2.0, 0.0], [2.0, 2.0]];
        // Predictions: 0, 1, 0, 0 (tie on the last row goes to class 0).
        assert_eq!(accuracy(&logits, &[0, 1, 1, 0]), 0.75);
    }
}
