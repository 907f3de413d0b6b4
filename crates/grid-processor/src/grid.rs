//! Lat/lon grid geometry extracted from datasets.

use forcing_common::GriddedDataset;
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// Names searched for latitude coordinates, in order.
pub const LAT_NAMES: &[&str] = &["lat", "latitude"];
/// Names searched for longitude coordinates, in order.
pub const LON_NAMES: &[&str] = &["lon", "longitude"];

/// Node coordinates of a (possibly curvilinear) lat/lon grid.
///
/// Coordinates are stored row-major as `(ny, nx)`; `y_dim`/`x_dim` name the
/// dataset dimensions the grid spans.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    pub ny: usize,
    pub nx: usize,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub y_dim: String,
    pub x_dim: String,
}

/// Grid the data is regridded from.
pub type SourceGrid = LatLonGrid;
/// Grid the data is regridded onto.
pub type TargetGrid = LatLonGrid;

/// Shape of a grid as `(ny, nx)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub ny: usize,
    pub nx: usize,
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.ny, self.nx)
    }
}

impl LatLonGrid {
    /// Build a grid from explicit 2-D coordinates.
    pub fn new(
        ny: usize,
        nx: usize,
        lat: Vec<f64>,
        lon: Vec<f64>,
        y_dim: impl Into<String>,
        x_dim: impl Into<String>,
    ) -> Result<Self> {
        if lat.len() != ny * nx || lon.len() != ny * nx {
            return Err(GridProcessorError::shape_mismatch(format!(
                "grid {}x{} needs {} points, got lat={} lon={}",
                ny,
                nx,
                ny * nx,
                lat.len(),
                lon.len()
            )));
        }
        Ok(Self {
            ny,
            nx,
            lat,
            lon,
            y_dim: y_dim.into(),
            x_dim: x_dim.into(),
        })
    }

    /// Extract the grid from a dataset's `lat`/`lon` coordinates.
    ///
    /// Accepts 2-D coordinates sharing the same dims, or 1-D coordinates
    /// on two different dims (rectilinear), which are expanded to 2-D.
    pub fn from_dataset(ds: &GriddedDataset) -> Result<Self> {
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| ds.coords.get(*n).or_else(|| ds.data_vars.get(*n)))
        };
        let lat = find(LAT_NAMES).ok_or_else(|| {
            GridProcessorError::shape_mismatch("dataset has no latitude coordinate")
        })?;
        let lon = find(LON_NAMES).ok_or_else(|| {
            GridProcessorError::shape_mismatch("dataset has no longitude coordinate")
        })?;

        match (lat.rank(), lon.rank()) {
            (2, 2) => {
                if lat.dims != lon.dims || lat.shape != lon.shape {
                    return Err(GridProcessorError::shape_mismatch(format!(
                        "lat {:?}{:?} and lon {:?}{:?} disagree",
                        lat.dims, lat.shape, lon.dims, lon.shape
                    )));
                }
                Self::new(
                    lat.shape[0],
                    lat.shape[1],
                    lat.data.clone(),
                    lon.data.clone(),
                    lat.dims[0].clone(),
                    lat.dims[1].clone(),
                )
            }
            (1, 1) => {
                if lat.dims[0] == lon.dims[0] {
                    return Err(GridProcessorError::shape_mismatch(format!(
                        "1-D lat and lon share dimension '{}'",
                        lat.dims[0]
                    )));
                }
                let (ny, nx) = (lat.len(), lon.len());
                let mut lat2 = Vec::with_capacity(ny * nx);
                let mut lon2 = Vec::with_capacity(ny * nx);
                for &la in &lat.data {
                    for &lo in &lon.data {
                        lat2.push(la);
                        lon2.push(lo);
                    }
                }
                Self::new(ny, nx, lat2, lon2, lat.dims[0].clone(), lon.dims[0].clone())
            }
            (a, b) => Err(GridProcessorError::shape_mismatch(format!(
                "lat/lon must both be 1-D or 2-D, found ranks {} and {}",
                a, b
            ))),
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            ny: self.ny,
            nx: self.nx,
        }
    }

    pub fn size(&self) -> usize {
        self.ny * self.nx
    }

    /// CRC-32 of the grid shape and the IEEE bit patterns of the node
    /// coordinates.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&(self.ny as u64).to_le_bytes());
        hasher.update(&(self.nx as u64).to_le_bytes());
        for v in self.lat.iter().chain(&self.lon) {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forcing_common::Variable;

    fn var2d(dims: [&str; 2], shape: [usize; 2], data: Vec<f64>) -> Variable {
        Variable::new(
            dims.iter().map(|s| s.to_string()).collect(),
            shape.to_vec(),
            data,
        )
        .unwrap()
    }

    #[test]
    fn test_from_dataset_2d() {
        let mut ds = GriddedDataset::new();
        ds.add_coord("lat", var2d(["rlat", "rlon"], [2, 2], vec![0.0, 0.0, 1.0, 1.0]))
            .unwrap();
        ds.add_coord("lon", var2d(["rlat", "rlon"], [2, 2], vec![0.0, 1.0, 0.0, 1.0]))
            .unwrap();

        let grid = LatLonGrid::from_dataset(&ds).unwrap();
        assert_eq!(grid.shape(), GridShape { ny: 2, nx: 2 });
        assert_eq!(grid.y_dim, "rlat");
        assert_eq!(grid.x_dim, "rlon");
    }

    #[test]
    fn test_from_dataset_1d_expands() {
        let mut ds = GriddedDataset::new();
        ds.add_coord("lat", Variable::from_vec("lat", vec![10.0, 20.0]))
            .unwrap();
        ds.add_coord("lon", Variable::from_vec("lon", vec![1.0, 2.0, 3.0]))
            .unwrap();

        let grid = LatLonGrid::from_dataset(&ds).unwrap();
        assert_eq!((grid.ny, grid.nx), (2, 3));
        assert_eq!(grid.lat, vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0]);
        assert_eq!(grid.lon, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_dataset_inconsistent_rank() {
        let mut ds = GriddedDataset::new();
        ds.add_coord("lat", var2d(["y", "x"], [2, 2], vec![0.0; 4]))
            .unwrap();
        ds.add_coord("lon", Variable::from_vec("x", vec![0.0, 1.0]))
            .unwrap();

        let err = LatLonGrid::from_dataset(&ds).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_from_dataset_inconsistent_extent() {
        let mut ds = GriddedDataset::new();
        ds.add_coord("lat", var2d(["y", "x"], [2, 2], vec![0.0; 4]))
            .unwrap();
        ds.add_coord("lon", var2d(["x", "y"], [2, 2], vec![0.0; 4]))
            .unwrap();

        assert!(LatLonGrid::from_dataset(&ds).unwrap_err().is_shape_mismatch());
        assert!(LatLonGrid::new(2, 3, vec![0.0; 6], vec![0.0; 5], "y", "x")
            .unwrap_err()
            .is_shape_mismatch());
    }

    #[test]
    fn test_fingerprint_changes_with_coordinates() {
        let a = LatLonGrid::new(1, 2, vec![0.0, 0.0], vec![0.0, 1.0], "y", "x").unwrap();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.lon[1] = 1.5;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_stable_crc32() {
        // Persisted in weight files, so the value must not drift.
        let grid = LatLonGrid::new(1, 2, vec![0.0, 0.0], vec![0.0, 1.0], "y", "x").unwrap();
        assert_eq!(grid.fingerprint(), 0xe81b_b106);
    }
}
