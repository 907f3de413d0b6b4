//! Error types for dataset model invariants.

use thiserror::Error;

use crate::time::TimeParseError;

/// Result type alias using DatasetError.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Violations of the dataset model's shape and dimension invariants.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("variable '{name}' declares {dims} dimensions but a shape of rank {rank}")]
    RankMismatch {
        name: String,
        dims: usize,
        rank: usize,
    },

    #[error("variable '{name}' holds {actual} values but its shape requires {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("dimension '{dim}' has length {existing} but variable '{name}' uses length {found}")]
    DimensionConflict {
        dim: String,
        name: String,
        existing: usize,
        found: usize,
    },

    #[error("variable '{name}' has no dimension '{dim}'")]
    UnknownDimension { name: String, dim: String },

    #[error("index {index} is out of bounds for dimension '{dim}' of length {len}")]
    IndexOutOfBounds { dim: String, index: usize, len: usize },

    #[error("cannot concatenate along '{dim}': {reason}")]
    Concat { dim: String, reason: String },

    #[error(transparent)]
    Time(#[from] TimeParseError),
}
