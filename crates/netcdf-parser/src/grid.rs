//! Static grid definitions: the target model grid and its spatial metadata.

use std::path::Path;

use forcing_common::{GriddedDataset, SpatialMetadata};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{get_string_attr, open_file};
use crate::reader::open_dataset;

/// Longitude variable in WPS `geo_em` files.
pub const GEO_EM_LON: &str = "XLONG_M";
/// Latitude variable in WPS `geo_em` files.
pub const GEO_EM_LAT: &str = "XLAT_M";
/// Degenerate leading axis of `geo_em` fields.
pub const GEO_EM_TIME_DIM: &str = "Time";

/// Attribute carrying the ESRI projection string.
pub const ESRI_PE_STRING: &str = "esri_pe_string";

/// Load a target grid definition as a dataset holding `lon`/`lat` coordinates.
///
/// `lon_var`/`lat_var` name the native coordinate variables (`XLONG_M` and
/// `XLAT_M` for WPS output); files that already use `lon`/`lat` are accepted
/// too. A leading singleton `Time` axis is selected at index 0 and dropped.
pub fn load_target_grid<P: AsRef<Path>>(
    path: P,
    lon_var: &str,
    lat_var: &str,
) -> NetCdfResult<GriddedDataset> {
    let path = path.as_ref();
    let source = open_dataset(path)?;

    let mut grid = GriddedDataset::new();
    for (native, canonical) in [(lon_var, "lon"), (lat_var, "lat")] {
        let var = source
            .variable(native)
            .or_else(|| source.variable(canonical))
            .ok_or_else(|| {
                NetCdfError::missing(format!(
                    "'{}' (or '{}') in target grid {}",
                    native,
                    canonical,
                    path.display()
                ))
            })?;

        let var = if var.has_dim(GEO_EM_TIME_DIM) {
            var.select_index(GEO_EM_TIME_DIM, 0, false)?
        } else {
            var.clone()
        };

        if var.rank() != 2 {
            return Err(NetCdfError::invalid(format!(
                "target grid '{}' must be 2-D after dropping '{}', found dims {:?}",
                native, GEO_EM_TIME_DIM, var.dims
            )));
        }

        grid.add_coord(canonical, var)?;
    }

    debug!(
        path = %path.display(),
        dims = ?grid.dimensions,
        "Loaded target grid"
    );

    Ok(grid)
}

/// Read projected `x`/`y` coordinates and the ESRI projection string.
///
/// The projection string is taken from the first variable in
/// `projection_vars` that exists in the file and carries `esri_pe_string`.
pub fn load_spatial_metadata<P: AsRef<Path>>(
    path: P,
    projection_vars: &[String],
) -> NetCdfResult<SpatialMetadata> {
    let path = path.as_ref();
    let file = open_file(path)?;

    let read_axis = |name: &str| -> NetCdfResult<Vec<f64>> {
        let var = file.variable(name).ok_or_else(|| {
            NetCdfError::missing(format!("'{}' in spatial metadata {}", name, path.display()))
        })?;
        Ok(var.get_values(..)?)
    };

    let x = read_axis("x")?;
    let y = read_axis("y")?;

    let esri_pe_string = projection_vars
        .iter()
        .filter_map(|name| file.variable(name))
        .find_map(|var| get_string_attr(&var, ESRI_PE_STRING))
        .ok_or_else(|| {
            NetCdfError::missing(format!(
                "'{}' attribute on any of {:?} in {}",
                ESRI_PE_STRING,
                projection_vars,
                path.display()
            ))
        })?;

    debug!(
        path = %path.display(),
        nx = x.len(),
        ny = y.len(),
        "Loaded spatial metadata"
    );

    Ok(SpatialMetadata::new(x, y, esri_pe_string))
}
