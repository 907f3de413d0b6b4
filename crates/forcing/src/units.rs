//! Unit conversion of selected variables.

use forcing_common::GriddedDataset;
use tracing::debug;

use crate::variables::{find_target, VariableSpec};

/// Convert every data variable listed in `specs` in place.
///
/// Variables are matched by their output (target) name, so this runs after
/// [`select_variables`](crate::select_variables). Variables not in the table
/// are left untouched. Applying the conversion twice converts twice.
///
/// Returns the number of variables whose values changed.
pub fn convert_units(ds: &mut GriddedDataset, specs: &[VariableSpec]) -> usize {
    let mut converted = 0;
    for (name, var) in ds.data_vars.iter_mut() {
        let Some(spec) = find_target(specs, name) else {
            continue;
        };
        if spec.is_identity() {
            continue;
        }
        var.map_in_place(|v| spec.apply(v));
        converted += 1;
        debug!(
            variable = %name,
            scale = spec.scale,
            offset = spec.offset,
            "Converted units"
        );
    }
    converted
}
