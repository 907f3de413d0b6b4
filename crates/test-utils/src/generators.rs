//! Test data generators for synthetic grids and fields.
//!
//! These generators create predictable, verifiable patterns. Fields that are
//! linear in longitude and latitude are reproduced exactly by bilinear
//! regridding, which makes them the workhorse of the regridding tests.

/// A 2-D lat/lon grid stored row-major as `(ny, nx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvilinearGrid {
    pub ny: usize,
    pub nx: usize,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl CurvilinearGrid {
    /// A regular grid starting at `(lat0, lon0)` with the given spacing.
    pub fn regular(ny: usize, nx: usize, lat0: f64, lon0: f64, dlat: f64, dlon: f64) -> Self {
        Self::skewed(ny, nx, lat0, lon0, dlat, dlon, 0.0)
    }

    /// A sheared grid: every column shifts latitude by `skew` and every row
    /// shifts longitude by `skew`, like a mildly rotated model grid.
    pub fn skewed(
        ny: usize,
        nx: usize,
        lat0: f64,
        lon0: f64,
        dlat: f64,
        dlon: f64,
        skew: f64,
    ) -> Self {
        let mut lat = Vec::with_capacity(ny * nx);
        let mut lon = Vec::with_capacity(ny * nx);
        for j in 0..ny {
            for i in 0..nx {
                lat.push(lat0 + j as f64 * dlat + i as f64 * skew);
                lon.push(lon0 + i as f64 * dlon + j as f64 * skew);
            }
        }
        Self { ny, nx, lat, lon }
    }

    pub fn size(&self) -> usize {
        self.ny * self.nx
    }

    /// Evaluate `f(lat, lon)` at every node.
    pub fn field(&self, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        self.lat.iter().zip(&self.lon).map(|(&la, &lo)| f(la, lo)).collect()
    }

    /// Evaluate [`linear_field`] at every node.
    pub fn linear_field(&self, offset: f64) -> Vec<f64> {
        self.field(|la, lo| linear_field(la, lo) + offset)
    }
}

/// A field linear in latitude and longitude.
pub fn linear_field(lat: f64, lon: f64) -> f64 {
    2.0 * lat + 0.5 * lon + 10.0
}

/// Evenly spaced values, `n` of them starting at `start`.
pub fn linspace_from(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}
