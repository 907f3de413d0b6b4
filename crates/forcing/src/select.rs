//! Selecting and renaming the variables of a product.

use forcing_common::GriddedDataset;
use tracing::debug;

use crate::error::{ForcingError, Result};
use crate::variables::VariableSpec;

/// Keep only the data variables named in `specs`, renamed to their targets.
///
/// Coordinates, dimensions, global attributes and the time axis are carried
/// over unchanged. If any source variable is absent nothing is returned and
/// the error lists every missing name.
pub fn select_variables(ds: &GriddedDataset, specs: &[VariableSpec]) -> Result<GriddedDataset> {
    let missing: Vec<String> = specs
        .iter()
        .filter(|spec| !ds.data_vars.contains_key(spec.source))
        .map(|spec| spec.source.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ForcingError::MissingVariable { names: missing });
    }

    let mut out = GriddedDataset {
        dimensions: ds.dimensions.clone(),
        coords: ds.coords.clone(),
        attributes: ds.attributes.clone(),
        time: ds.time.clone(),
        ..GriddedDataset::default()
    };

    for spec in specs {
        let var = &ds.data_vars[spec.source];
        debug!(source = spec.source, target = spec.target, "Selecting variable");
        out.add_data_var(spec.target, var.clone())?;
    }

    Ok(out)
}
