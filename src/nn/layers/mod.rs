pub mod dropout;
pub mod linear;
pub mod relu;

pub use dropout::Dropout;
pub use linear::Linear;
pub use relu::ReLU;
