use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalvaniError {
    #[error("invalid network specification: {reason}")]
    InvalidSpecification { reason: String },

    #[error("shape mismatch for `{key}`: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        key: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("state dict is missing parameter `{key}`")]
    MissingParameter { key: String },

    #[error("state dict contains unexpected parameter `{key}`")]
    UnexpectedParameter { key: String },

    #[error("tensor `{key}` declares {declared} elements but carries {actual}")]
    InvalidTensorData {
        key: String,
        declared: usize,
        actual: usize,
    },

    #[error("unsupported checkpoint schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("dataset has {inputs} input rows but {labels} labels")]
    SampleCountMismatch { inputs: usize, labels: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

pub type Result<T> = std::result::Result<T, GalvaniError>;
