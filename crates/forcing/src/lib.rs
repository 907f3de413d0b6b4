//! WRF-Hydro forcing generation from RDRS/CaPA reanalysis files.
//!
//! # Architecture
//!
//! A run of [`ForcingPipeline`] goes through these stages:
//!
//! - open one file or a time-ordered set of files (`netcdf-parser`)
//! - keep and rename the product's variables ([`select_variables`])
//! - convert units in place ([`convert_units`])
//! - regrid onto the `geo_em` grid (`grid-processor`)
//! - attach projected `x`/`y` and the projection string ([`annotate`])
//! - write one file per timestep ([`write_time_slices`])
//!
//! The variable tables of each product live in [`variables`] and the run
//! profiles in [`config`].

pub mod annotate;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod select;
pub mod units;
pub mod variables;
pub mod writer;

// Re-exports
pub use annotate::annotate;
pub use config::{ForcingConfig, Profile};
pub use error::{ForcingError, Result};
pub use pipeline::{FieldStats, ForcingPipeline, RunSummary, WeightsSummary};
pub use select::select_variables;
pub use units::convert_units;
pub use variables::{find_target, ldasin_variables, precip_variables, VariableSpec};
pub use writer::{
    output_file_name, select_time_slice, write_time_slices, LDASIN_SUFFIX, PRECIP_SUFFIX,
};
