use bincode::{Decode, Encode, config};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{GalvaniError, Result};
use crate::nn::network::{Network, NetworkSpec};

/// Parameter name -> tensor payload, ordered by key.
pub type StateDict = BTreeMap<String, TensorData>;

/// Schema revision written into every checkpoint. Bump on any change to the
/// record layout; `Checkpoint::load` refuses revisions it does not know.
pub const SCHEMA_VERSION: u32 = 1;

// Serializable representation of tensor data
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct TensorData {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

impl TensorData {
    pub fn from_array2(a: &Array2<f32>) -> Self {
        TensorData {
            data: a.iter().copied().collect(),
            shape: a.shape().to_vec(),
        }
    }

    pub fn from_array1(a: &Array1<f32>) -> Self {
        TensorData {
            data: a.to_vec(),
            shape: vec![a.len()],
        }
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Optional training provenance carried inside a checkpoint.
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct TrainingMeta {
    pub epochs: usize,
    pub loss_history: Vec<f32>,
}

/// A complete, self-describing snapshot of a [`Network`].
///
/// Records the architecture next to the parameters, so a file can be
/// restored without the caller re-stating the layer widths, and a file from
/// a different architecture is rejected instead of half-loaded.
#[derive(Encode, Decode, Clone, Debug)]
pub struct Checkpoint {
    pub schema_version: u32,
    pub spec: NetworkSpec,
    pub dropout: f32,
    pub state_dict: StateDict,
    pub meta: Option<TrainingMeta>,
}

impl Checkpoint {
    /// Snapshot the model's architecture and parameters.
    pub fn capture(model: &Network) -> Self {
        Checkpoint {
            schema_version: SCHEMA_VERSION,
            spec: model.spec().clone(),
            dropout: model.dropout(),
            state_dict: model.state_dict(),
            meta: None,
        }
    }

    #[must_use]
    pub fn with_meta(mut self, meta: TrainingMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let encoded = bincode::encode_to_vec(self, config::standard())?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let (checkpoint, _): (Checkpoint, usize) =
            bincode::decode_from_slice(&buffer, config::standard())?;
        if checkpoint.schema_version != SCHEMA_VERSION {
            return Err(GalvaniError::UnsupportedSchema {
                found: checkpoint.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(checkpoint)
    }

    /// Rebuild a network from this checkpoint.
    ///
    /// Constructs the recorded architecture (re-validating it), then loads
    /// every parameter strictly. Any failure leaves nothing half-built.
    pub fn restore(&self) -> Result<Network> {
        let mut network = Network::new(self.spec.clone(), self.dropout)?;
        network.load_state_dict(&self.state_dict)?;
        Ok(network)
    }
}
