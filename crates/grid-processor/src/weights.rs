//! Bilinear weight generation and the sparse weight matrix.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GridProcessorError, Result};
use crate::grid::{GridShape, LatLonGrid};
use crate::interpolation::{bilinear_weights, invert_bilinear};

/// Slack on `(s, t)` when deciding whether a point lies inside a cell.
const CELL_TOLERANCE: f64 = 1e-9;

/// Identifies the pair of grids a [`WeightMapping`] was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSignature {
    pub source: GridShape,
    pub target: GridShape,
    /// Combined fingerprint of source and target coordinates.
    pub fingerprint: u32,
}

impl GridSignature {
    pub fn new(source: &LatLonGrid, target: &LatLonGrid) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&source.fingerprint().to_le_bytes());
        hasher.update(&target.fingerprint().to_le_bytes());
        Self {
            source: source.shape(),
            target: target.shape(),
            fingerprint: hasher.finalize(),
        }
    }

    /// True when both signatures describe the same grid shapes.
    pub fn same_shapes(&self, other: &GridSignature) -> bool {
        self.source == other.source && self.target == other.target
    }
}

impl std::fmt::Display for GridSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({:08x})",
            self.source, self.target, self.fingerprint
        )
    }
}

/// Sparse interpolation matrix from source nodes to target nodes.
///
/// Row `i` (a target node) holds the source node indices and weights stored
/// at `offsets[i]..offsets[i + 1]`. Target nodes outside the source grid
/// have empty rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMapping {
    signature: GridSignature,
    offsets: Vec<usize>,
    columns: Vec<usize>,
    weights: Vec<f64>,
}

impl WeightMapping {
    /// Assemble a mapping from `(row, column, weight)` triplets.
    ///
    /// Triplets may come in any order; indices are checked against the
    /// signature's shapes.
    pub fn from_triplets(
        signature: GridSignature,
        rows: &[usize],
        columns: &[usize],
        weights: &[f64],
    ) -> Result<Self> {
        if rows.len() != columns.len() || rows.len() != weights.len() {
            return Err(GridProcessorError::weight_store(format!(
                "triplet arrays differ in length: rows={} cols={} weights={}",
                rows.len(),
                columns.len(),
                weights.len()
            )));
        }

        let n_target = signature.target.ny * signature.target.nx;
        let n_source = signature.source.ny * signature.source.nx;

        let mut counts = vec![0usize; n_target + 1];
        for (&row, &col) in rows.iter().zip(columns) {
            if row >= n_target || col >= n_source {
                return Err(GridProcessorError::weight_store(format!(
                    "weight entry ({}, {}) outside {}",
                    row, col, signature
                )));
            }
            counts[row + 1] += 1;
        }
        for i in 0..n_target {
            counts[i + 1] += counts[i];
        }
        let offsets = counts;

        let mut cursor = offsets.clone();
        let mut sorted_columns = vec![0usize; rows.len()];
        let mut sorted_weights = vec![0.0f64; rows.len()];
        for ((&row, &col), &w) in rows.iter().zip(columns).zip(weights) {
            let at = cursor[row];
            sorted_columns[at] = col;
            sorted_weights[at] = w;
            cursor[row] += 1;
        }

        Ok(Self {
            signature,
            offsets,
            columns: sorted_columns,
            weights: sorted_weights,
        })
    }

    /// Flatten back into `(rows, columns, weights)`.
    pub fn to_triplets(&self) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        let mut rows = Vec::with_capacity(self.nnz());
        for i in 0..self.n_target() {
            rows.extend(std::iter::repeat(i).take(self.offsets[i + 1] - self.offsets[i]));
        }
        (rows, self.columns.clone(), self.weights.clone())
    }

    pub fn signature(&self) -> &GridSignature {
        &self.signature
    }

    pub fn n_source(&self) -> usize {
        self.signature.source.ny * self.signature.source.nx
    }

    pub fn n_target(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of stored weights.
    pub fn nnz(&self) -> usize {
        self.weights.len()
    }

    /// Source indices and weights contributing to target node `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.offsets[i]..self.offsets[i + 1];
        (&self.columns[range.clone()], &self.weights[range])
    }

    /// Target nodes with no source contribution.
    pub fn unmapped_count(&self) -> usize {
        self.offsets.windows(2).filter(|w| w[0] == w[1]).count()
    }

    /// Apply the mapping to one 2-D source field.
    ///
    /// Unmapped targets and targets touching a NaN source node become NaN.
    pub fn apply(&self, source: &[f64], target: &mut [f64]) -> Result<()> {
        if source.len() != self.n_source() || target.len() != self.n_target() {
            return Err(GridProcessorError::shape_mismatch(format!(
                "weights for {} applied to {} source and {} target values",
                self.signature,
                source.len(),
                target.len()
            )));
        }

        for (i, out) in target.iter_mut().enumerate() {
            let (cols, weights) = self.row(i);
            *out = if cols.is_empty() {
                f64::NAN
            } else {
                cols.iter()
                    .zip(weights)
                    .map(|(&c, &w)| source[c] * w)
                    .sum()
            };
        }
        Ok(())
    }
}

/// Uniform bucket index over source cell bounding boxes.
struct CellIndex {
    lon_min: f64,
    lat_min: f64,
    lon_step: f64,
    lat_step: f64,
    n_lon: usize,
    n_lat: usize,
    buckets: Vec<Vec<usize>>,
    bounds: Vec<[f64; 4]>,
}

impl CellIndex {
    fn new(cells: &[Cell]) -> Self {
        let bounds: Vec<[f64; 4]> = cells.iter().map(Cell::bounds).collect();

        let lon_min = bounds.iter().map(|b| b[0]).fold(f64::INFINITY, f64::min);
        let lat_min = bounds.iter().map(|b| b[1]).fold(f64::INFINITY, f64::min);
        let lon_max = bounds.iter().map(|b| b[2]).fold(f64::NEG_INFINITY, f64::max);
        let lat_max = bounds.iter().map(|b| b[3]).fold(f64::NEG_INFINITY, f64::max);

        let side = ((cells.len() as f64).sqrt().ceil() as usize).max(1);
        let n_lon = side;
        let n_lat = side;
        let lon_step = ((lon_max - lon_min) / n_lon as f64).max(f64::MIN_POSITIVE);
        let lat_step = ((lat_max - lat_min) / n_lat as f64).max(f64::MIN_POSITIVE);

        let mut index = Self {
            lon_min,
            lat_min,
            lon_step,
            lat_step,
            n_lon,
            n_lat,
            buckets: vec![Vec::new(); n_lon * n_lat],
            bounds,
        };

        for cell_id in 0..cells.len() {
            let [x0, y0, x1, y1] = index.bounds[cell_id];
            let (i0, j0) = index.bucket_of(x0, y0);
            let (i1, j1) = index.bucket_of(x1, y1);
            for j in j0..=j1 {
                for i in i0..=i1 {
                    index.buckets[j * n_lon + i].push(cell_id);
                }
            }
        }

        index
    }

    fn bucket_of(&self, lon: f64, lat: f64) -> (usize, usize) {
        let clamp = |v: f64, n: usize| (v.floor().max(0.0) as usize).min(n - 1);
        (
            clamp((lon - self.lon_min) / self.lon_step, self.n_lon),
            clamp((lat - self.lat_min) / self.lat_step, self.n_lat),
        )
    }

    /// Cells whose bounding box contains the point.
    fn candidates(&self, lon: f64, lat: f64) -> impl Iterator<Item = usize> + '_ {
        let (i, j) = self.bucket_of(lon, lat);
        self.buckets[j * self.n_lon + i]
            .iter()
            .copied()
            .filter(move |&c| {
                let [x0, y0, x1, y1] = self.bounds[c];
                lon >= x0 - 1e-9 && lon <= x1 + 1e-9 && lat >= y0 - 1e-9 && lat <= y1 + 1e-9
            })
    }
}

/// One quadrilateral of four neighbouring source nodes.
struct Cell {
    nodes: [usize; 4],
    lon: [f64; 4],
    lat: [f64; 4],
}

impl Cell {
    /// Cells between rows `j, j+1` and columns `i, i+1`, with longitudes
    /// unwrapped relative to the first corner.
    fn all(grid: &LatLonGrid) -> Vec<Cell> {
        let nx = grid.nx;
        let mut cells = Vec::with_capacity(grid.ny.saturating_sub(1) * nx.saturating_sub(1));
        for j in 0..grid.ny.saturating_sub(1) {
            for i in 0..nx.saturating_sub(1) {
                let nodes = [j * nx + i, j * nx + i + 1, (j + 1) * nx + i, (j + 1) * nx + i + 1];
                let reference = grid.lon[nodes[0]];
                let lon = nodes.map(|n| unwrap_lon(grid.lon[n], reference));
                let lat = nodes.map(|n| grid.lat[n]);
                cells.push(Cell { nodes, lon, lat });
            }
        }
        cells
    }

    fn bounds(&self) -> [f64; 4] {
        let min = |v: &[f64; 4]| v.iter().copied().fold(f64::INFINITY, f64::min);
        let max = |v: &[f64; 4]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        [min(&self.lon), min(&self.lat), max(&self.lon), max(&self.lat)]
    }

    fn is_finite(&self) -> bool {
        self.lon.iter().chain(&self.lat).all(|v| v.is_finite())
    }

    /// Fractional position of the point inside this cell, if it is inside.
    fn locate(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let lon = unwrap_lon(lon, self.lon[0]);
        let (s, t) = invert_bilinear(&self.lon, &self.lat, lon, lat)?;
        let inside = |v: f64| (-CELL_TOLERANCE..=1.0 + CELL_TOLERANCE).contains(&v);
        if inside(s) && inside(t) {
            Some((s.clamp(0.0, 1.0), t.clamp(0.0, 1.0)))
        } else {
            None
        }
    }
}

/// Shift `lon` by multiples of 360 to within 180 degrees of `reference`.
fn unwrap_lon(lon: f64, reference: f64) -> f64 {
    reference + (lon - reference + 180.0).rem_euclid(360.0) - 180.0
}

/// Build bilinear weights from `source` nodes to `target` nodes.
///
/// Each target node is located in a source cell; its weights are the
/// bilinear weights of the four cell corners. Nodes outside every cell are
/// left unmapped.
pub fn build_bilinear_weights(source: &LatLonGrid, target: &LatLonGrid) -> Result<WeightMapping> {
    if source.ny < 2 || source.nx < 2 {
        return Err(GridProcessorError::shape_mismatch(format!(
            "source grid {} needs at least 2x2 nodes for bilinear weights",
            source.shape()
        )));
    }

    let signature = GridSignature::new(source, target);
    let cells: Vec<Cell> = Cell::all(source)
        .into_iter()
        .filter(Cell::is_finite)
        .collect();
    if cells.is_empty() {
        return Err(GridProcessorError::shape_mismatch(
            "source grid has no cells with finite coordinates",
        ));
    }
    let index = CellIndex::new(&cells);

    let mut offsets = Vec::with_capacity(target.size() + 1);
    let mut columns = Vec::with_capacity(target.size() * 4);
    let mut weights = Vec::with_capacity(target.size() * 4);
    offsets.push(0);

    for (&lat, &lon) in target.lat.iter().zip(&target.lon) {
        if lat.is_finite() && lon.is_finite() {
            let hit = [lon, lon - 360.0, lon + 360.0].iter().find_map(|&l| {
                index
                    .candidates(l, lat)
                    .find_map(|c| cells[c].locate(l, lat).map(|st| (c, st)))
            });

            if let Some((c, (s, t))) = hit {
                columns.extend_from_slice(&cells[c].nodes);
                weights.extend_from_slice(&bilinear_weights(s, t));
            }
        }
        offsets.push(columns.len());
    }

    let mapping = WeightMapping {
        signature,
        offsets,
        columns,
        weights,
    };

    info!(
        signature = %mapping.signature,
        weights = mapping.nnz(),
        unmapped = mapping.unmapped_count(),
        "Built bilinear weights"
    );
    debug!(cells = cells.len(), "Source cells indexed");

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(ny: usize, nx: usize, lat0: f64, lon0: f64, step: f64) -> LatLonGrid {
        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                lat.push(lat0 + j as f64 * step);
                lon.push(lon0 + i as f64 * step);
            }
        }
        LatLonGrid::new(ny, nx, lat, lon, "y", "x").unwrap()
    }

    #[test]
    fn test_rows_sum_to_one() {
        let source = regular(4, 5, 40.0, -100.0, 1.0);
        let target = regular(5, 6, 40.3, -99.7, 0.5);
        let mapping = build_bilinear_weights(&source, &target).unwrap();

        for i in 0..mapping.n_target() {
            let (_, w) = mapping.row(i);
            if !w.is_empty() {
                assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9, "row {}", i);
            }
        }
    }

    #[test]
    fn test_points_outside_are_unmapped() {
        let source = regular(3, 3, 0.0, 0.0, 1.0);
        let target = LatLonGrid::new(1, 2, vec![0.5, 10.0], vec![0.5, 10.0], "y", "x").unwrap();
        let mapping = build_bilinear_weights(&source, &target).unwrap();

        assert_eq!(mapping.unmapped_count(), 1);
        let mut out = vec![0.0; 2];
        mapping.apply(&[1.0; 9], &mut out).unwrap();
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!(out[1].is_nan());
    }

    #[test]
    fn test_nan_source_node_propagates() {
        let source = regular(2, 2, 0.0, 0.0, 1.0);
        let target = LatLonGrid::new(1, 1, vec![0.5], vec![0.5], "y", "x").unwrap();
        let mapping = build_bilinear_weights(&source, &target).unwrap();

        let mut out = vec![0.0];
        mapping.apply(&[1.0, f64::NAN, 3.0, 4.0], &mut out).unwrap();
        assert!(out[0].is_nan());
    }

    #[test]
    fn test_dateline_crossing() {
        // Source cells straddle 180 degrees, target uses -180..180 longitudes.
        let source = regular(2, 3, 0.0, 179.0, 1.0);
        let target = LatLonGrid::new(1, 1, vec![0.5], vec![-179.5], "y", "x").unwrap();
        let mapping = build_bilinear_weights(&source, &target).unwrap();

        assert_eq!(mapping.unmapped_count(), 0);
        let (cols, w) = mapping.row(0);
        assert_eq!(cols, &[1, 2, 4, 5]);
        for weight in w {
            assert!((weight - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_triplets_roundtrip() {
        let source = regular(3, 3, 0.0, 0.0, 1.0);
        let target = regular(2, 2, 0.25, 0.25, 1.0);
        let mapping = build_bilinear_weights(&source, &target).unwrap();

        let (rows, cols, weights) = mapping.to_triplets();
        let rebuilt =
            WeightMapping::from_triplets(*mapping.signature(), &rows, &cols, &weights).unwrap();
        assert_eq!(rebuilt, mapping);
    }

    #[test]
    fn test_from_triplets_rejects_out_of_range() {
        let source = regular(2, 2, 0.0, 0.0, 1.0);
        let signature = GridSignature::new(&source, &source);
        assert!(WeightMapping::from_triplets(signature, &[0], &[7], &[1.0]).is_err());
        assert!(WeightMapping::from_triplets(signature, &[0, 1], &[0], &[1.0]).is_err());
    }

    #[test]
    fn test_source_too_small() {
        let source = regular(1, 3, 0.0, 0.0, 1.0);
        let err = build_bilinear_weights(&source, &source).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_unwrap_lon() {
        assert_eq!(unwrap_lon(-179.0, 179.0), 181.0);
        assert_eq!(unwrap_lon(10.0, 0.0), 10.0);
        assert_eq!(unwrap_lon(350.0, 0.0), -10.0);
    }
}
