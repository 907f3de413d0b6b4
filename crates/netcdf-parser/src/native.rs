//! Thin helpers over the native netcdf library.
//!
//! Attribute access goes through [`has_attr`] first: asking libnetcdf for an
//! attribute that does not exist makes HDF5 print a diagnostic stack even
//! though the Rust side handles the miss.

use std::path::Path;
use std::sync::Once;

use forcing_common::Attributes;
use netcdf::AttributeValue;

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Call early, before the first HDF5/NetCDF operation. Safe to call repeatedly.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Open `path` for reading.
///
/// Missing or unreadable files are access errors; a readable file libnetcdf
/// rejects is a format error.
pub(crate) fn open_file(path: &Path) -> NetCdfResult<netcdf::File> {
    silence_hdf5_errors();

    if !path.is_file() {
        return Err(NetCdfError::file_access(path, "no such file"));
    }
    std::fs::File::open(path).map_err(|e| NetCdfError::file_access(path, e.to_string()))?;

    netcdf::open(path)
        .map_err(|e| NetCdfError::invalid(format!("failed to open {}: {}", path.display(), e)))
}

/// Check if a variable has an attribute with the given name.
pub(crate) fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Numeric attribute as f64.
pub(crate) fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Text attribute.
pub(crate) fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(v) => Some(v.join("")),
        _ => None,
    }
}

/// All attributes of a variable as strings, skipping the listed names.
pub(crate) fn read_attributes(var: &netcdf::Variable, skip: &[&str]) -> Attributes {
    var.attributes()
        .filter(|attr| !skip.contains(&attr.name()))
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), attribute_to_string(&value)))
        })
        .collect()
}

/// Global attributes of a file as strings.
pub(crate) fn read_global_attributes(file: &netcdf::File) -> Attributes {
    file.attributes()
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), attribute_to_string(&value)))
        })
        .collect()
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render an attribute value the way `ncdump` would, minus type suffixes.
pub(crate) fn attribute_to_string(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s.clone(),
        AttributeValue::Strs(v) => v.join(", "),
        AttributeValue::Double(v) => v.to_string(),
        AttributeValue::Doubles(v) => join(v),
        AttributeValue::Float(v) => v.to_string(),
        AttributeValue::Floats(v) => join(v),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Ints(v) => join(v),
        AttributeValue::Short(v) => v.to_string(),
        AttributeValue::Shorts(v) => join(v),
        AttributeValue::Longlong(v) => v.to_string(),
        AttributeValue::Longlongs(v) => join(v),
        AttributeValue::Uchar(v) => v.to_string(),
        AttributeValue::Uchars(v) => join(v),
        AttributeValue::Schar(v) => v.to_string(),
        AttributeValue::Schars(v) => join(v),
        other => format!("{:?}", other),
    }
}
