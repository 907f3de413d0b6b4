//! Error types for grid processing.

use forcing_common::DatasetError;
use thiserror::Error;

/// Errors that can occur during grid processing.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Grid coordinates or a field do not have the expected rank/extent.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A cached weight mapping was built for different grids.
    #[error("cached weights in {location} were built for {found}, requested {expected}")]
    WeightCacheStale {
        location: String,
        expected: String,
        found: String,
    },

    /// Weight file could not be read or written.
    #[error("weight store error: {0}")]
    WeightStore(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl GridProcessorError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create a WeightStore error.
    pub fn weight_store(msg: impl Into<String>) -> Self {
        Self::WeightStore(msg.into())
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch(_))
    }

    pub fn is_stale_cache(&self) -> bool {
        matches!(self, Self::WeightCacheStale { .. })
    }
}

impl From<netcdf::Error> for GridProcessorError {
    fn from(err: netcdf::Error) -> Self {
        Self::WeightStore(err.to_string())
    }
}

impl From<std::io::Error> for GridProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::WeightStore(err.to_string())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
