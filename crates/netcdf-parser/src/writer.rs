//! Writing [`GriddedDataset`]s to NetCDF.

use std::path::Path;

use forcing_common::{Attributes, GriddedDataset, Variable, TIME_DIM};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::silence_hdf5_errors;

/// Fill value for data variables written as `f32`.
pub const FILL_VALUE_F32: f32 = f32::NAN;

/// Write a dataset to `path`, replacing any existing file.
///
/// Coordinates are stored as `f64`, data variables as `f32` with a NaN
/// `_FillValue`. The time axis is written back with its raw values, `units`
/// and `calendar`.
pub fn write_dataset<P: AsRef<Path>>(dataset: &GriddedDataset, path: P) -> NetCdfResult<()> {
    let path = path.as_ref();
    silence_hdf5_errors();
    dataset.validate()?;

    let mut file = netcdf::create(path)
        .map_err(|e| NetCdfError::file_access(path, format!("cannot create: {}", e)))?;

    for dim in &dataset.dimensions {
        file.add_dimension(&dim.name, dim.len)?;
    }

    for (name, value) in &dataset.attributes {
        file.add_attribute(name, value.as_str())?;
    }

    if let Some(axis) = &dataset.time {
        let mut time_var = file.add_variable::<f64>(TIME_DIM, &[TIME_DIM])?;
        time_var.put_attribute("standard_name", "time")?;
        time_var.put_attribute("units", axis.units())?;
        if let Some(calendar) = axis.calendar() {
            time_var.put_attribute("calendar", calendar)?;
        }
        time_var.put_values(axis.values(), ..)?;
    }

    for (name, var) in &dataset.coords {
        let dims = dim_names(var);
        let mut nc_var = file.add_variable::<f64>(name, &dims)?;
        put_attributes(&mut nc_var, &var.attributes)?;
        nc_var.put_values(&var.data, ..)?;
    }

    for (name, var) in &dataset.data_vars {
        let dims = dim_names(var);
        let mut nc_var = file.add_variable::<f32>(name, &dims)?;
        nc_var.put_attribute("_FillValue", FILL_VALUE_F32)?;
        put_attributes(&mut nc_var, &var.attributes)?;

        let data: Vec<f32> = var.data.iter().map(|&v| v as f32).collect();
        nc_var.put_values(&data, ..)?;
    }

    debug!(
        path = %path.display(),
        data_vars = dataset.data_vars.len(),
        timesteps = dataset.time_len(),
        "Wrote NetCDF dataset"
    );

    Ok(())
}

fn dim_names(var: &Variable) -> Vec<&str> {
    var.dims.iter().map(String::as_str).collect()
}

fn put_attributes(nc_var: &mut netcdf::VariableMut, attributes: &Attributes) -> NetCdfResult<()> {
    for (key, value) in attributes {
        if key == "_FillValue" {
            continue;
        }
        nc_var.put_attribute(key, value.as_str())?;
    }
    Ok(())
}
