//! Reading NetCDF files into [`GriddedDataset`]s.

use std::path::Path;

use forcing_common::{GriddedDataset, TimeAxis, Variable, TIME_DIM};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{
    get_f64_attr, get_string_attr, open_file, read_attributes, read_global_attributes,
};

/// Attributes consumed while decoding and not carried on the variable.
const ENCODING_ATTRIBUTES: &[&str] = &[
    "_FillValue",
    "missing_value",
    "scale_factor",
    "add_offset",
    "coordinates",
];

/// Variables treated as coordinates even without a `coordinates` reference.
const COORDINATE_NAMES: &[&str] = &["lat", "lon", "latitude", "longitude"];

/// Open a single NetCDF file and read it fully into memory.
///
/// Numeric variables are unpacked (`_FillValue`/`missing_value` become NaN,
/// then `scale_factor`/`add_offset` apply). The `time` variable, if any, is
/// decoded into the dataset's [`TimeAxis`]. The file handle is closed
/// before this returns.
pub fn open_dataset<P: AsRef<Path>>(path: P) -> NetCdfResult<GriddedDataset> {
    let path = path.as_ref();
    let file = open_file(path)?;

    let dataset = read_dataset(&file)?;

    debug!(
        path = %path.display(),
        dimensions = dataset.dimensions.len(),
        coords = dataset.coords.len(),
        data_vars = dataset.data_vars.len(),
        timesteps = dataset.time_len(),
        "Read NetCDF dataset"
    );

    Ok(dataset)
}

fn read_dataset(file: &netcdf::File) -> NetCdfResult<GriddedDataset> {
    let mut dataset = GriddedDataset::new();

    for dim in file.dimensions() {
        dataset.set_dimension(&dim.name(), dim.len());
    }

    let referenced = referenced_coordinates(file);
    let mut time = None;

    for var in file.variables() {
        let name = var.name();

        if name == TIME_DIM {
            time = Some(read_time_axis(&var)?);
            continue;
        }

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let raw: Vec<f64> = match var.get_values(..) {
            Ok(values) => values,
            Err(e) => {
                debug!(variable = %name, error = %e, "Skipping non-numeric variable");
                continue;
            }
        };

        let mut variable = Variable::new(dims, shape, unpack(&var, raw))?;
        variable.attributes = read_attributes(&var, ENCODING_ATTRIBUTES);

        let is_dimension_coord = variable.rank() == 1 && variable.dims[0] == name;
        if is_dimension_coord
            || referenced.contains(&name)
            || COORDINATE_NAMES.contains(&name.as_str())
        {
            dataset.add_coord(&name, variable)?;
        } else {
            dataset.add_data_var(&name, variable)?;
        }
    }

    dataset.attributes = read_global_attributes(file);
    if let Some(axis) = time {
        dataset.set_time(axis)?;
    }

    Ok(dataset)
}

/// Names listed in any variable's `coordinates` attribute.
fn referenced_coordinates(file: &netcdf::File) -> Vec<String> {
    file.variables()
        .filter_map(|var| get_string_attr(&var, "coordinates"))
        .flat_map(|list| {
            list.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn read_time_axis(var: &netcdf::Variable) -> NetCdfResult<TimeAxis> {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    if dims != [TIME_DIM] {
        return Err(NetCdfError::invalid(format!(
            "time variable must be one-dimensional over '{}', found {:?}",
            TIME_DIM, dims
        )));
    }

    let values: Vec<f64> = var.get_values(..)?;
    let units = get_string_attr(var, "units")
        .ok_or_else(|| NetCdfError::missing("units attribute on time variable"))?;
    let calendar = get_string_attr(var, "calendar");

    Ok(TimeAxis::decode(values, &units, calendar.as_deref())?)
}

/// Mask fill values and apply CF packing.
fn unpack(var: &netcdf::Variable, raw: Vec<f64>) -> Vec<f64> {
    let fill_value = get_f64_attr(var, "_FillValue");
    let missing_value = get_f64_attr(var, "missing_value");
    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);

    raw.into_iter()
        .map(|val| {
            if Some(val) == fill_value || Some(val) == missing_value {
                f64::NAN
            } else {
                val * scale_factor + add_offset
            }
        })
        .collect()
}
