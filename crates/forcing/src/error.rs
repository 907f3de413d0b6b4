//! Error types for the forcing crate.

use forcing_common::DatasetError;
use grid_processor::GridProcessorError;
use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors that can occur while producing forcing files.
#[derive(Error, Debug)]
pub enum ForcingError {
    #[error("Missing source variables: {}", names.join(", "))]
    MissingVariable { names: Vec<String> },

    #[error("Dimension '{dim}' has length {found}, spatial metadata provides {expected}")]
    DimensionSizeMismatch {
        dim: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid dataset: {0}")]
    Format(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    NetCdf(#[from] NetCdfError),

    #[error(transparent)]
    Regrid(#[from] GridProcessorError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

impl ForcingError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn is_missing_variable(&self) -> bool {
        matches!(self, Self::MissingVariable { .. })
    }

    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionSizeMismatch { .. })
    }

    /// True for missing or unreadable input files.
    pub fn is_file_access(&self) -> bool {
        matches!(self, Self::NetCdf(e) if e.is_file_access())
    }

    /// True when an input was readable but malformed.
    pub fn is_format(&self) -> bool {
        match self {
            Self::Format(_) | Self::Dataset(_) => true,
            Self::NetCdf(e) => e.is_format(),
            _ => false,
        }
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::Regrid(e) if e.is_shape_mismatch())
    }

    pub fn is_stale_cache(&self) -> bool {
        matches!(self, Self::Regrid(e) if e.is_stale_cache())
    }
}

/// Result type for forcing operations.
pub type Result<T> = std::result::Result<T, ForcingError>;
