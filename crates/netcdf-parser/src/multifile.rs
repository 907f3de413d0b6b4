//! Multi-file aggregation along the time dimension.

use std::path::{Path, PathBuf};

use forcing_common::{GriddedDataset, TimeAxis, Variable, TIME_DIM};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::reader::open_dataset;

/// Expand a path or glob pattern into the sorted list of matching files.
///
/// An existing file path is returned as-is, even if it contains glob
/// metacharacters.
pub fn expand_pattern(pattern: &str) -> NetCdfResult<Vec<PathBuf>> {
    let direct = Path::new(pattern);
    if direct.is_file() {
        return Ok(vec![direct.to_path_buf()]);
    }

    let entries = glob::glob(pattern).map_err(|e| NetCdfError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(NetCdfError::file_access(pattern, "no files match"));
    }

    Ok(paths)
}

/// Files combined into one dataset.
#[derive(Debug, Clone)]
pub struct MultiFileDataset {
    /// Source files, in the order their time steps were concatenated.
    pub files: Vec<PathBuf>,
    pub dataset: GriddedDataset,
}

/// Open every file matching `pattern` and combine them along `time`.
///
/// Files are ordered by their first timestamp (ties broken by file name).
/// Variables without a time dimension are taken from the first file and
/// must have the same shape in every other file. Time values are re-encoded
/// in the first file's units.
pub fn open_mfdataset(pattern: &str) -> NetCdfResult<MultiFileDataset> {
    let paths = expand_pattern(pattern)?;
    info!(pattern = %pattern, files = paths.len(), "Opening input files");

    let mut parts = Vec::with_capacity(paths.len());
    for path in &paths {
        parts.push((path.clone(), open_dataset(path)?));
    }

    parts.sort_by(|(pa, a), (pb, b)| {
        let ta = a.time.as_ref().and_then(TimeAxis::first);
        let tb = b.time.as_ref().and_then(TimeAxis::first);
        ta.cmp(&tb).then_with(|| pa.cmp(pb))
    });

    let files = parts.iter().map(|(path, _)| path.clone()).collect();
    let dataset = combine_by_time(parts)?;
    Ok(MultiFileDataset { files, dataset })
}

fn combine_by_time(parts: Vec<(PathBuf, GriddedDataset)>) -> NetCdfResult<GriddedDataset> {
    let mut parts = parts.into_iter();
    let (first_path, mut combined) = parts
        .next()
        .ok_or_else(|| NetCdfError::missing("input files"))?;

    let rest: Vec<(PathBuf, GriddedDataset)> = parts.collect();
    if rest.is_empty() {
        return Ok(combined);
    }

    let first_axis = combined.time.clone().ok_or_else(|| {
        NetCdfError::missing(format!(
            "time coordinate in {} (required to combine files)",
            first_path.display()
        ))
    })?;

    let mut axes = vec![first_axis];
    for (path, part) in &rest {
        let axis = part.time.clone().ok_or_else(|| {
            NetCdfError::missing(format!(
                "time coordinate in {} (required to combine files)",
                path.display()
            ))
        })?;
        axes.push(axis);
    }

    for (name, var) in combined
        .data_vars
        .iter_mut()
        .chain(combined.coords.iter_mut())
    {
        if var.has_dim(TIME_DIM) {
            let mut pieces = vec![var.clone()];
            for (path, part) in &rest {
                let piece = part.variable(name).ok_or_else(|| {
                    NetCdfError::missing(format!("variable '{}' in {}", name, path.display()))
                })?;
                pieces.push(piece.clone());
            }
            *var = Variable::concat(&pieces, TIME_DIM)?;
        } else {
            for (path, part) in &rest {
                if let Some(other) = part.variable(name) {
                    if other.shape != var.shape {
                        return Err(NetCdfError::invalid(format!(
                            "variable '{}' has shape {:?} in {} but {:?} in the first file",
                            name,
                            other.shape,
                            path.display(),
                            var.shape
                        )));
                    }
                }
            }
        }
    }

    let axis = TimeAxis::concat(&axes)?;
    debug!(
        files = rest.len() + 1,
        timesteps = axis.len(),
        "Combined datasets along time"
    );
    combined.set_dimension(TIME_DIM, axis.len());
    combined.set_time(axis)?;
    combined.validate()?;

    Ok(combined)
}
