//! NetCDF reading and writing for gridded forcing data.
//!
//! Files are read fully into a [`GriddedDataset`] through the `netcdf` crate
//! (libnetcdf/HDF5). Handles are scoped to each call, so nothing stays open
//! between operations.
//!
//! - [`open_dataset`] / [`open_mfdataset`]: source forcing files, one file or
//!   a glob combined along `time`.
//! - [`load_target_grid`]: WPS `geo_em` grid definition, as `lon`/`lat`.
//! - [`load_spatial_metadata`]: projected `x`/`y` and the ESRI projection
//!   string of a WRF-Hydro domain.
//! - [`write_dataset`]: one dataset to one file.
//!
//! # Requirements
//!
//! System libraries: `libhdf5-dev libnetcdf-dev`.

mod error;
mod grid;
mod multifile;
mod native;
mod reader;
mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use grid::{
    load_spatial_metadata, load_target_grid, ESRI_PE_STRING, GEO_EM_LAT, GEO_EM_LON,
    GEO_EM_TIME_DIM,
};
pub use multifile::{expand_pattern, open_mfdataset, MultiFileDataset};
pub use native::silence_hdf5_errors;
pub use reader::open_dataset;
pub use writer::{write_dataset, FILL_VALUE_F32};

pub use forcing_common::GriddedDataset;
