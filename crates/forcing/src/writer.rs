//! Writing one NetCDF file per timestep.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use forcing_common::{format_timestamp, GriddedDataset, TIME_DIM};
use netcdf_parser::write_dataset;
use tracing::{debug, info, warn};

use crate::error::{ForcingError, Result};

/// Suffix of WRF-Hydro LDASIN forcing files.
pub const LDASIN_SUFFIX: &str = "00.LDASIN_DOMAIN1";
/// Suffix of WRF-Hydro precipitation forcing files.
pub const PRECIP_SUFFIX: &str = "00.PRECIP_FORCING.nc";

/// Output file name for a timestep: `YYYYMMDDHH` followed by `suffix`.
pub fn output_file_name(time: &DateTime<Utc>, suffix: &str) -> String {
    format!("{}{}", format_timestamp(time), suffix)
}

/// Extract time index `index` as a dataset with a length-1 `time` dimension.
pub fn select_time_slice(ds: &GriddedDataset, index: usize) -> Result<GriddedDataset> {
    let axis = ds
        .time
        .as_ref()
        .ok_or_else(|| ForcingError::format("dataset has no time axis"))?;
    let sliced_axis = axis.select(index).ok_or_else(|| {
        ForcingError::format(format!(
            "time index {} out of range for axis of length {}",
            index,
            axis.len()
        ))
    })?;

    let mut slice = GriddedDataset {
        dimensions: ds.dimensions.clone(),
        attributes: ds.attributes.clone(),
        ..GriddedDataset::default()
    };
    slice.set_dimension(TIME_DIM, 1);

    for (name, coord) in &ds.coords {
        let coord = if coord.has_dim(TIME_DIM) {
            coord.select_index(TIME_DIM, index, true)?
        } else {
            coord.clone()
        };
        slice.add_coord(name, coord)?;
    }
    for (name, var) in &ds.data_vars {
        let var = if var.has_dim(TIME_DIM) {
            var.select_index(TIME_DIM, index, true)?
        } else {
            var.clone()
        };
        slice.add_data_var(name, var)?;
    }
    slice.set_time(sliced_axis)?;

    Ok(slice)
}

/// Write every timestep of `ds` to its own file in `output_dir`.
///
/// Files are written in time-index order. Existing files are replaced, so
/// two timesteps that format to the same name leave the later one on disk.
/// The returned paths follow write order and keep such duplicates.
pub fn write_time_slices(
    ds: &GriddedDataset,
    output_dir: &Path,
    suffix: &str,
) -> Result<Vec<PathBuf>> {
    let axis = ds
        .time
        .as_ref()
        .ok_or_else(|| ForcingError::format("dataset has no time axis"))?;

    let mut written = Vec::with_capacity(axis.len());
    for (index, instant) in axis.instants().iter().enumerate() {
        let path = output_dir.join(output_file_name(instant, suffix));
        if written.contains(&path) {
            warn!(path = %path.display(), index, "Overwriting output from an earlier timestep");
        }

        let slice = select_time_slice(ds, index)?;
        write_dataset(&slice, &path)?;
        debug!(path = %path.display(), index, time = %instant, "Wrote timestep");
        written.push(path);
    }

    info!(
        files = written.len(),
        dir = %output_dir.display(),
        suffix,
        "Wrote forcing files"
    );

    Ok(written)
}
