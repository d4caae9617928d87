use ndarray::{Array2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{GalvaniError, Result};

/// One mini-batch: a `(batch, features)` input matrix plus one class label
/// per row.
#[derive(Debug)]
pub struct Batch {
    pub inputs: Array2<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// An in-memory classification dataset.
///
/// Construction checks that the dataset is non-empty and that inputs and
/// labels agree on the sample count, so batch iteration never has to.
#[derive(Debug)]
pub struct Dataset {
    inputs: Array2<f32>,
    labels: Vec<usize>,
}

impl Dataset {
    pub fn new(inputs: Array2<f32>, labels: Vec<usize>) -> Result<Self> {
        if inputs.nrows() == 0 {
            return Err(GalvaniError::EmptyDataset);
        }
        if inputs.nrows() != labels.len() {
            return Err(GalvaniError::SampleCountMismatch {
                inputs: inputs.nrows(),
                labels: labels.len(),
            });
        }
        Ok(Dataset { inputs, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn inputs(&self) -> &Array2<f32> {
        &self.inputs
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// How many batches one pass yields; the final batch may be smaller.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        assert!(batch_size > 0, "batch_size must be positive");
        self.len().div_ceil(batch_size)
    }

    /// Iterate mini-batches in dataset order.
    pub fn batches(&self, batch_size: usize) -> Batches<'_> {
        assert!(batch_size > 0, "batch_size must be positive");
        Batches {
            dataset: self,
            order: (0..self.len()).collect(),
            batch_size,
            cursor: 0,
        }
    }

    /// Iterate mini-batches in a fresh random order drawn from `rng`.
    pub fn shuffled_batches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Batches<'_> {
        assert!(batch_size > 0, "batch_size must be positive");
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        Batches {
            dataset: self,
            order,
            batch_size,
            cursor: 0,
        }
    }
}

/// Iterator over the mini-batches of a [`Dataset`].
pub struct Batches<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let picked = &self.order[self.cursor..end];
        self.cursor = end;

        Some(Batch {
            inputs: self.dataset.inputs.select(Axis(0), picked),
            labels: picked.iter().map(|&i| self.dataset.labels[i]).collect(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.cursor).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}
