//! Bilinear regridding between lat/lon grids.
//!
//! Weights are computed once per pair of grids and stored as a sparse
//! matrix, then applied to every 2-D slice of every variable.
//!
//! # Architecture
//!
//! ```text
//! source lat/lon ──┐
//!                  ├─► build_bilinear_weights ─► WeightMapping ◄─► WeightStore
//! target lat/lon ──┘                                 │             (memory / NetCDF)
//!                                                    ▼
//!                     GriddedDataset ──► Regridder::regrid_dataset ──► GriddedDataset
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{LatLonGrid, MemoryWeightStore, RegridMode, Regridder};
//!
//! let source = LatLonGrid::from_dataset(&forcing)?;
//! let target = LatLonGrid::from_dataset(&geo_em)?;
//! let mut store = MemoryWeightStore::new();
//! let regridder = Regridder::new(source, target, RegridMode::Recompute, &mut store)?;
//! let regridded = regridder.regrid_dataset(&forcing, &config.drop_coords)?;
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod regrid;
pub mod store;
pub mod weights;

// Re-export commonly used types at crate root
pub use config::{RegridConfig, RegridMode};
pub use error::{GridProcessorError, Result};
pub use grid::{GridShape, LatLonGrid, SourceGrid, TargetGrid};
pub use interpolation::{bilinear_interpolate, bilinear_weights, invert_bilinear};
pub use regrid::Regridder;
pub use store::{MemoryWeightStore, NetcdfWeightStore, WeightStore};
pub use weights::{build_bilinear_weights, GridSignature, WeightMapping};
