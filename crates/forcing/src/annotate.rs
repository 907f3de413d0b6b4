//! Attaching target-domain metadata to regridded output.

use forcing_common::{GriddedDataset, SpatialMetadata, Variable};
use netcdf_parser::ESRI_PE_STRING;
use tracing::debug;

use crate::error::{ForcingError, Result};
use crate::variables::{find_target, VariableSpec};

/// Row dimension of regridded output before annotation.
pub const SOUTH_NORTH: &str = "south_north";
/// Column dimension of regridded output before annotation.
pub const WEST_EAST: &str = "west_east";

/// Replace the `south_north`/`west_east` dims with projected `y`/`x`
/// coordinates, set each variable's `units` from the table and copy the
/// projection string onto every data variable.
pub fn annotate(
    mut ds: GriddedDataset,
    metadata: &SpatialMetadata,
    specs: &[VariableSpec],
) -> Result<GriddedDataset> {
    for (dim, renamed, values) in [
        (SOUTH_NORTH, "y", &metadata.y),
        (WEST_EAST, "x", &metadata.x),
    ] {
        let found = ds.dimension(dim).ok_or_else(|| {
            ForcingError::format(format!("regridded dataset has no '{}' dimension", dim))
        })?;
        if found != values.len() {
            return Err(ForcingError::DimensionSizeMismatch {
                dim: dim.to_string(),
                expected: values.len(),
                found,
            });
        }

        ds.rename_dim(dim, renamed);
        ds.add_coord(renamed, Variable::from_vec(renamed, values.clone()))?;
    }

    for (name, var) in ds.data_vars.iter_mut() {
        if let Some(spec) = find_target(specs, name) {
            var.attributes
                .insert("units".to_string(), spec.units.to_string());
        }
        var.attributes
            .insert(ESRI_PE_STRING.to_string(), metadata.esri_pe_string.clone());
    }

    let (ny, nx) = metadata.shape();
    debug!(
        ny,
        nx,
        variables = ds.data_vars.len(),
        "Annotated dataset"
    );

    ds.validate()?;
    Ok(ds)
}
