//! Feed-forward classifier training with architecture-aware checkpoints.
//!
//! A [`Network`] is built from a [`NetworkSpec`] (layer widths only):
//! hidden stages of `Linear -> ReLU -> Dropout` followed by a linear output
//! stage that yields logits. [`Trainer`] drives mini-batch gradient descent
//! over a [`Dataset`], and [`Checkpoint`] snapshots the architecture next to
//! the parameters so files restore without the caller re-stating widths and
//! mismatched files fail loudly instead of half-loading.
//!
//! ```no_run
//! use galvani::{
//!     Checkpoint, CrossEntropy, Dataset, Network, NetworkSpec, SGD, TrainConfig, Trainer,
//! };
//! use ndarray::Array2;
//!
//! # fn main() -> galvani::Result<()> {
//! let mut model = Network::new(NetworkSpec::new(784, 10, vec![512, 256, 128]), 0.2)?;
//! let train = Dataset::new(Array2::zeros((64, 784)), vec![0; 64])?;
//!
//! let optimizer = SGD::new(&model, 0.1, 0.9, 0.0);
//! let mut trainer = Trainer::new(CrossEntropy, optimizer, TrainConfig::default());
//! let history = trainer.fit(&mut model, &train, None);
//!
//! Checkpoint::capture(&model).save("model.bin")?;
//! let restored = Checkpoint::load("model.bin")?.restore()?;
//! # let _ = (history, restored);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod io;
pub mod nn;
pub mod train;
pub mod utils;

pub use data::{Batch, Batches, Dataset};
pub use error::{GalvaniError, Result};
pub use io::{Checkpoint, SCHEMA_VERSION, StateDict, TensorData, TrainingMeta};
pub use nn::{
    Adam, CrossEntropy, Dropout, Layer, Linear, Loss, Mode, Network, NetworkSpec, Optimizer,
    ParamView, ReLU, SGD, accuracy, predictions, softmax,
};
pub use train::{EvalStats, History, StepRecord, TrainConfig, Trainer, evaluate};
pub use utils::ProgressBar;
