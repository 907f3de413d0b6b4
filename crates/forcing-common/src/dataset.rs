//! In-memory gridded datasets.

use std::collections::BTreeMap;

use crate::error::{DatasetError, DatasetResult};
use crate::time::{TimeAxis, TIME_DIM};

/// Free-form string attributes attached to a dataset or variable.
pub type Attributes = BTreeMap<String, String>;

/// A named dimension and its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

/// A multi-dimensional array stored as a flat row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
    pub attributes: Attributes,
}

impl Variable {
    /// Create a variable, checking that `data` fills `shape` exactly.
    pub fn new(
        dims: Vec<String>,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> DatasetResult<Self> {
        let var = Self {
            dims,
            shape,
            data,
            attributes: Attributes::new(),
        };
        var.check("<unnamed>")?;
        Ok(var)
    }

    /// Convenience constructor for a 1-D coordinate.
    pub fn from_vec(dim: &str, data: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            shape: vec![data.len()],
            data,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Position of `dim` in this variable's dimension list.
    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis(dim).is_some()
    }

    /// Rename a dimension in place. No-op when absent.
    pub fn rename_dim(&mut self, from: &str, to: &str) {
        for d in self.dims.iter_mut() {
            if d == from {
                *d = to.to_string();
            }
        }
    }

    /// Apply `f` to every element.
    pub fn map_in_place(&mut self, f: impl Fn(f64) -> f64) {
        for v in self.data.iter_mut() {
            *v = f(*v);
        }
    }

    /// Select one index along `dim`.
    ///
    /// With `keep_dim` the dimension survives with length 1; otherwise it is
    /// dropped from the result.
    pub fn select_index(&self, dim: &str, index: usize, keep_dim: bool) -> DatasetResult<Self> {
        let axis = self.axis(dim).ok_or_else(|| DatasetError::UnknownDimension {
            name: "<variable>".to_string(),
            dim: dim.to_string(),
        })?;
        let len = self.shape[axis];
        if index >= len {
            return Err(DatasetError::IndexOutOfBounds {
                dim: dim.to_string(),
                index,
                len,
            });
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();

        let mut data = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let start = (o * len + index) * inner;
            data.extend_from_slice(&self.data[start..start + inner]);
        }

        let mut dims = self.dims.clone();
        let mut shape = self.shape.clone();
        if keep_dim {
            shape[axis] = 1;
        } else {
            dims.remove(axis);
            shape.remove(axis);
        }

        Ok(Self {
            dims,
            shape,
            data,
            attributes: self.attributes.clone(),
        })
    }

    /// Concatenate variables along `dim`. All other dims must agree.
    pub fn concat(parts: &[Variable], dim: &str) -> DatasetResult<Self> {
        let concat_err = |reason: String| DatasetError::Concat {
            dim: dim.to_string(),
            reason,
        };

        let first = parts
            .first()
            .ok_or_else(|| concat_err("no variables given".to_string()))?;
        let axis = first
            .axis(dim)
            .ok_or_else(|| concat_err(format!("dimension missing from {:?}", first.dims)))?;

        for part in &parts[1..] {
            let same_layout = part.dims == first.dims
                && part
                    .shape
                    .iter()
                    .zip(&first.shape)
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !same_layout {
                return Err(concat_err(format!(
                    "shape {:?} {:?} does not match {:?} {:?}",
                    part.dims, part.shape, first.dims, first.shape
                )));
            }
        }

        let outer: usize = first.shape[..axis].iter().product();
        let inner: usize = first.shape[axis + 1..].iter().product();
        let total: usize = parts.iter().map(|p| p.shape[axis]).sum();

        let mut data = Vec::with_capacity(outer * total * inner);
        for o in 0..outer {
            for part in parts {
                let block = part.shape[axis] * inner;
                data.extend_from_slice(&part.data[o * block..(o + 1) * block]);
            }
        }

        let mut shape = first.shape.clone();
        shape[axis] = total;

        Ok(Self {
            dims: first.dims.clone(),
            shape,
            data,
            attributes: first.attributes.clone(),
        })
    }

    fn check(&self, name: &str) -> DatasetResult<()> {
        if self.dims.len() != self.shape.len() {
            return Err(DatasetError::RankMismatch {
                name: name.to_string(),
                dims: self.dims.len(),
                rank: self.shape.len(),
            });
        }
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(DatasetError::LengthMismatch {
                name: name.to_string(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// A collection of named variables sharing a set of dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GriddedDataset {
    /// Dimensions in declaration order.
    pub dimensions: Vec<Dimension>,
    /// Coordinate variables (lat/lon, projected x/y, ...). Time lives in `time`.
    pub coords: BTreeMap<String, Variable>,
    /// Data variables.
    pub data_vars: BTreeMap<String, Variable>,
    /// Global attributes.
    pub attributes: Attributes,
    /// Decoded `time` coordinate, when the dataset has one.
    pub time: Option<TimeAxis>,
}

impl GriddedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of a dimension.
    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().find(|d| d.name == name).map(|d| d.len)
    }

    /// Declare a dimension, or update its length if it already exists.
    pub fn set_dimension(&mut self, name: &str, len: usize) {
        match self.dimensions.iter_mut().find(|d| d.name == name) {
            Some(dim) => dim.len = len,
            None => self.dimensions.push(Dimension {
                name: name.to_string(),
                len,
            }),
        }
    }

    /// Add a coordinate variable, registering any new dimensions it uses.
    pub fn add_coord(&mut self, name: &str, var: Variable) -> DatasetResult<()> {
        self.register_dims(name, &var)?;
        self.coords.insert(name.to_string(), var);
        Ok(())
    }

    /// Add a data variable, registering any new dimensions it uses.
    pub fn add_data_var(&mut self, name: &str, var: Variable) -> DatasetResult<()> {
        self.register_dims(name, &var)?;
        self.data_vars.insert(name.to_string(), var);
        Ok(())
    }

    /// Attach a time axis, declaring the `time` dimension.
    pub fn set_time(&mut self, axis: TimeAxis) -> DatasetResult<()> {
        if let Some(existing) = self.dimension(TIME_DIM) {
            if existing != axis.len() && self.variables().any(|(_, v)| v.has_dim(TIME_DIM)) {
                return Err(DatasetError::DimensionConflict {
                    dim: TIME_DIM.to_string(),
                    name: TIME_DIM.to_string(),
                    existing,
                    found: axis.len(),
                });
            }
        }
        self.set_dimension(TIME_DIM, axis.len());
        self.time = Some(axis);
        Ok(())
    }

    /// Look a variable up among data variables first, then coordinates.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name).or_else(|| self.coords.get(name))
    }

    /// Iterate over coordinates and data variables.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.coords.iter().chain(self.data_vars.iter())
    }

    /// Number of time steps (0 when there is no time axis).
    pub fn time_len(&self) -> usize {
        self.time.as_ref().map_or(0, TimeAxis::len)
    }

    /// Rename a dimension everywhere it appears.
    pub fn rename_dim(&mut self, from: &str, to: &str) {
        for dim in self.dimensions.iter_mut() {
            if dim.name == from {
                dim.name = to.to_string();
            }
        }
        for var in self.coords.values_mut().chain(self.data_vars.values_mut()) {
            var.rename_dim(from, to);
        }
    }

    /// Check every variable against the declared dimensions.
    pub fn validate(&self) -> DatasetResult<()> {
        for (name, var) in self.variables() {
            var.check(name)?;
            for (dim, len) in var.dims.iter().zip(&var.shape) {
                match self.dimension(dim) {
                    Some(existing) if existing == *len => {}
                    Some(existing) => {
                        return Err(DatasetError::DimensionConflict {
                            dim: dim.clone(),
                            name: name.clone(),
                            existing,
                            found: *len,
                        })
                    }
                    None => {
                        return Err(DatasetError::UnknownDimension {
                            name: name.clone(),
                            dim: dim.clone(),
                        })
                    }
                }
            }
        }
        if let (Some(axis), Some(len)) = (&self.time, self.dimension(TIME_DIM)) {
            if axis.len() != len {
                return Err(DatasetError::DimensionConflict {
                    dim: TIME_DIM.to_string(),
                    name: TIME_DIM.to_string(),
                    existing: len,
                    found: axis.len(),
                });
            }
        }
        Ok(())
    }

    fn register_dims(&mut self, name: &str, var: &Variable) -> DatasetResult<()> {
        var.check(name)?;
        for (dim, len) in var.dims.iter().zip(&var.shape) {
            match self.dimension(dim) {
                Some(existing) if existing != *len => {
                    return Err(DatasetError::DimensionConflict {
                        dim: dim.clone(),
                        name: name.to_string(),
                        existing,
                        found: *len,
                    })
                }
                Some(_) => {}
                None => self.set_dimension(dim, *len),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn cube() -> Variable {
        // time=2, y=2, x=3 ; value = t*100 + y*10 + x
        let mut data = Vec::new();
        for t in 0..2 {
            for y in 0..2 {
                for x in 0..3 {
                    data.push((t * 100 + y * 10 + x) as f64);
                }
            }
        }
        Variable::new(dims(&["time", "y", "x"]), vec![2, 2, 3], data).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = Variable::new(dims(&["x"]), vec![3], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, DatasetError::LengthMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_select_index_keep_dim() {
        let v = cube().select_index("time", 1, true).unwrap();
        assert_eq!(v.dims, dims(&["time", "y", "x"]));
        assert_eq!(v.shape, vec![1, 2, 3]);
        assert_eq!(v.data, vec![100.0, 101.0, 102.0, 110.0, 111.0, 112.0]);
    }

    #[test]
    fn test_select_index_drop_dim() {
        let v = cube().select_index("y", 1, false).unwrap();
        assert_eq!(v.dims, dims(&["time", "x"]));
        assert_eq!(v.data, vec![10.0, 11.0, 12.0, 110.0, 111.0, 112.0]);

        assert!(matches!(
            cube().select_index("time", 2, true),
            Err(DatasetError::IndexOutOfBounds { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_concat_along_time() {
        let a = cube().select_index("time", 0, true).unwrap();
        let b = cube().select_index("time", 1, true).unwrap();
        let joined = Variable::concat(&[a, b], "time").unwrap();
        assert_eq!(joined, cube());
    }

    #[test]
    fn test_concat_rejects_mismatched_shape() {
        let a = cube();
        let b = Variable::new(dims(&["time", "y", "x"]), vec![1, 1, 3], vec![0.0; 3]).unwrap();
        assert!(Variable::concat(&[a, b], "time").is_err());
    }

    #[test]
    fn test_dataset_dimension_conflict() {
        let mut ds = GriddedDataset::new();
        ds.add_data_var("a", cube()).unwrap();
        let bad = Variable::from_vec("x", vec![0.0; 4]);
        assert!(matches!(
            ds.add_coord("x", bad),
            Err(DatasetError::DimensionConflict { existing: 3, found: 4, .. })
        ));
    }

    #[test]
    fn test_rename_dim() {
        let mut ds = GriddedDataset::new();
        ds.add_data_var("a", cube()).unwrap();

        ds.rename_dim("x", "west_east");
        assert_eq!(ds.dimension("west_east"), Some(3));
        assert!(ds.data_vars["a"].has_dim("west_east"));
        ds.validate().unwrap();
    }
}
