//! Error types for NetCDF reading and writing.

use std::path::{Path, PathBuf};

use forcing_common::{DatasetError, TimeParseError};
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// Input file missing, unreadable or not creatable
    #[error("Cannot access {}: {reason}", path.display())]
    FileAccess { path: PathBuf, reason: String },

    /// File pattern could not be parsed
    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Error reported by libnetcdf
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Time(#[from] TimeParseError),
}

impl NetCdfError {
    pub fn file_access(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// True for missing or unreadable inputs.
    pub fn is_file_access(&self) -> bool {
        matches!(self, Self::FileAccess { .. } | Self::IoError(_))
    }

    /// True when the file was read but lacks or mangles expected content.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Self::MissingData(_) | Self::InvalidFormat(_) | Self::Dataset(_) | Self::Time(_)
        )
    }
}
