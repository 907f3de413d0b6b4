//! Target-domain spatial reference information.

/// Projected coordinates and projection descriptor of a model domain.
///
/// Loaded from a WRF-Hydro spatial metadata file and copied verbatim onto
/// regridded output.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialMetadata {
    /// Projected x coordinate of each grid column (west-east).
    pub x: Vec<f64>,
    /// Projected y coordinate of each grid row (south-north).
    pub y: Vec<f64>,
    /// ESRI well-known-text projection string.
    pub esri_pe_string: String,
}

impl SpatialMetadata {
    pub fn new(x: Vec<f64>, y: Vec<f64>, esri_pe_string: impl Into<String>) -> Self {
        Self {
            x,
            y,
            esri_pe_string: esri_pe_string.into(),
        }
    }

    /// Grid extent as `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }
}
