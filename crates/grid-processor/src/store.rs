//! Persistence of weight mappings between runs.
//!
//! Stores are keyed by grid shapes only. A stored mapping whose coordinate
//! fingerprint differs from the request is still returned so the caller can
//! reject it as stale instead of silently rebuilding over it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use netcdf::AttributeValue;
use tracing::{debug, info};

use crate::error::{GridProcessorError, Result};
use crate::grid::GridShape;
use crate::weights::{GridSignature, WeightMapping};

/// A place weight mappings can be loaded from and saved to.
pub trait WeightStore {
    /// Mapping stored for the request's grid shapes, if any.
    fn load(&self, request: &GridSignature) -> Result<Option<WeightMapping>>;

    /// Store a mapping, replacing any mapping for the same shapes.
    fn save(&mut self, mapping: &WeightMapping) -> Result<()>;

    /// Human-readable location of the entry for `signature`.
    fn location(&self, signature: &GridSignature) -> String;
}

/// In-process store, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryWeightStore {
    entries: HashMap<(GridShape, GridShape), WeightMapping>,
}

impl MemoryWeightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WeightStore for MemoryWeightStore {
    fn load(&self, request: &GridSignature) -> Result<Option<WeightMapping>> {
        Ok(self.entries.get(&(request.source, request.target)).cloned())
    }

    fn save(&mut self, mapping: &WeightMapping) -> Result<()> {
        let sig = mapping.signature();
        self.entries.insert((sig.source, sig.target), mapping.clone());
        Ok(())
    }

    fn location(&self, signature: &GridSignature) -> String {
        format!("memory:{}", signature)
    }
}

/// Weight files on disk, one NetCDF file per pair of grid shapes.
///
/// Files follow the ESMF sparse-matrix layout: 1-based `row` (target) and
/// `col` (source) indices with weights `S`, plus the grid shapes and
/// coordinate fingerprint as global attributes.
#[derive(Debug, Clone)]
pub struct NetcdfWeightStore {
    dir: PathBuf,
}

impl NetcdfWeightStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `bilinear_<sny>x<snx>_<dny>x<dnx>.nc`
    pub fn file_name(signature: &GridSignature) -> String {
        format!("bilinear_{}_{}.nc", signature.source, signature.target)
    }

    pub fn path_for(&self, signature: &GridSignature) -> PathBuf {
        self.dir.join(Self::file_name(signature))
    }

    fn read(path: &Path) -> Result<WeightMapping> {
        netcdf_parser::silence_hdf5_errors();
        let file = netcdf::open(path)?;

        let source = GridShape {
            ny: global_usize(&file, "src_ny")?,
            nx: global_usize(&file, "src_nx")?,
        };
        let target = GridShape {
            ny: global_usize(&file, "dst_ny")?,
            nx: global_usize(&file, "dst_nx")?,
        };
        let fingerprint = match global_value(&file, "fingerprint")? {
            AttributeValue::Str(hex) => u32::from_str_radix(&hex, 16).map_err(|e| {
                GridProcessorError::weight_store(format!("bad fingerprint '{}': {}", hex, e))
            })?,
            other => {
                return Err(GridProcessorError::weight_store(format!(
                    "fingerprint must be a string, found {:?}",
                    other
                )))
            }
        };

        let rows = read_indices(&file, "row")?;
        let cols = read_indices(&file, "col")?;
        let weights: Vec<f64> = variable(&file, "S")?.get_values(..)?;

        let signature = GridSignature {
            source,
            target,
            fingerprint,
        };
        WeightMapping::from_triplets(signature, &rows, &cols, &weights)
    }

    fn write(path: &Path, mapping: &WeightMapping) -> Result<()> {
        netcdf_parser::silence_hdf5_errors();
        let sig = mapping.signature();
        let (rows, cols, weights) = mapping.to_triplets();
        let to_one_based = |v: Vec<usize>| -> Vec<i64> { v.into_iter().map(|i| i as i64 + 1).collect() };

        let mut file = netcdf::create(path)?;
        file.add_attribute("method", "bilinear")?;
        file.add_attribute("src_ny", sig.source.ny as i64)?;
        file.add_attribute("src_nx", sig.source.nx as i64)?;
        file.add_attribute("dst_ny", sig.target.ny as i64)?;
        file.add_attribute("dst_nx", sig.target.nx as i64)?;
        file.add_attribute("fingerprint", format!("{:08x}", sig.fingerprint).as_str())?;

        // A zero-length dimension would be created as unlimited.
        if mapping.nnz() == 0 {
            file.add_unlimited_dimension("n_s")?;
        } else {
            file.add_dimension("n_s", mapping.nnz())?;
        }

        {
            let mut row = file.add_variable::<i64>("row", &["n_s"])?;
            if !rows.is_empty() {
                row.put_values(&to_one_based(rows), ..)?;
            }
        }
        {
            let mut col = file.add_variable::<i64>("col", &["n_s"])?;
            if !cols.is_empty() {
                col.put_values(&to_one_based(cols), ..)?;
            }
        }
        {
            let mut s = file.add_variable::<f64>("S", &["n_s"])?;
            if !weights.is_empty() {
                s.put_values(&weights, ..)?;
            }
        }

        Ok(())
    }
}

impl WeightStore for NetcdfWeightStore {
    fn load(&self, request: &GridSignature) -> Result<Option<WeightMapping>> {
        let path = self.path_for(request);
        if !path.is_file() {
            debug!(path = %path.display(), "No weight file");
            return Ok(None);
        }

        let mapping = Self::read(&path).map_err(|e| {
            GridProcessorError::weight_store(format!("{}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), weights = mapping.nnz(), "Loaded weights");
        Ok(Some(mapping))
    }

    fn save(&mut self, mapping: &WeightMapping) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(mapping.signature());
        Self::write(&path, mapping).map_err(|e| {
            GridProcessorError::weight_store(format!("{}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), weights = mapping.nnz(), "Saved weights");
        Ok(())
    }

    fn location(&self, signature: &GridSignature) -> String {
        self.path_for(signature).display().to_string()
    }
}

fn global_value(file: &netcdf::File, name: &str) -> Result<AttributeValue> {
    let attr = file
        .attribute(name)
        .ok_or_else(|| GridProcessorError::weight_store(format!("missing attribute '{}'", name)))?;
    Ok(attr.value()?)
}

fn global_usize(file: &netcdf::File, name: &str) -> Result<usize> {
    let value = match global_value(file, name)? {
        AttributeValue::Longlong(v) => v,
        AttributeValue::Int(v) => v as i64,
        other => {
            return Err(GridProcessorError::weight_store(format!(
                "attribute '{}' must be an integer, found {:?}",
                name, other
            )))
        }
    };
    usize::try_from(value)
        .map_err(|_| GridProcessorError::weight_store(format!("attribute '{}' is negative", name)))
}

fn variable<'f>(file: &'f netcdf::File, name: &str) -> Result<netcdf::Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| GridProcessorError::weight_store(format!("missing variable '{}'", name)))
}

fn read_indices(file: &netcdf::File, name: &str) -> Result<Vec<usize>> {
    let values: Vec<i64> = variable(file, name)?.get_values(..)?;
    values
        .into_iter()
        .map(|v| {
            usize::try_from(v - 1).map_err(|_| {
                GridProcessorError::weight_store(format!("'{}' holds non-positive index {}", name, v))
            })
        })
        .collect()
}
