//! Common types shared across the forcing regridder crates.
//!
//! A [`GriddedDataset`] is the in-memory form of one (or several
//! concatenated) NetCDF files: named dimensions, coordinate and data
//! variables stored as flat row-major `f64` buffers, free-form string
//! attributes and an optional decoded [`TimeAxis`].

pub mod dataset;
pub mod error;
pub mod spatial;
pub mod time;

pub use dataset::{Attributes, Dimension, GriddedDataset, Variable};
pub use error::{DatasetError, DatasetResult};
pub use spatial::SpatialMetadata;
pub use time::{format_timestamp, TimeAxis, TimeEncoding, TimeParseError, TimeUnit, TIME_DIM};
