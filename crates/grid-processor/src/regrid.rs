//! Applying weight mappings to variables and datasets.

use forcing_common::{GriddedDataset, Variable};
use tracing::{debug, info, warn};

use crate::config::RegridMode;
use crate::error::{GridProcessorError, Result};
use crate::grid::{SourceGrid, TargetGrid};
use crate::store::WeightStore;
use crate::weights::{build_bilinear_weights, GridSignature, WeightMapping};

/// Regrids fields from a source grid onto a target grid.
#[derive(Debug, Clone)]
pub struct Regridder {
    source: SourceGrid,
    target: TargetGrid,
    mapping: WeightMapping,
    reused: bool,
}

impl Regridder {
    /// Create a regridder, building or loading weights according to `mode`.
    ///
    /// In [`RegridMode::Reuse`] a stored mapping is used only if it was built
    /// for exactly these grids; any other stored mapping is an error. When
    /// nothing is stored the weights are built and saved.
    pub fn new(
        source: SourceGrid,
        target: TargetGrid,
        mode: RegridMode,
        store: &mut dyn WeightStore,
    ) -> Result<Self> {
        let request = GridSignature::new(&source, &target);

        let (mapping, reused) = match mode {
            RegridMode::Recompute => (build_bilinear_weights(&source, &target)?, false),
            RegridMode::Reuse => match store.load(&request)? {
                Some(stored) => {
                    if stored.signature() != &request {
                        return Err(GridProcessorError::WeightCacheStale {
                            location: store.location(&request),
                            expected: request.to_string(),
                            found: stored.signature().to_string(),
                        });
                    }
                    (stored, true)
                }
                None => {
                    let built = build_bilinear_weights(&source, &target)?;
                    store.save(&built)?;
                    (built, false)
                }
            },
        };

        info!(
            mode = %mode,
            reused = reused,
            signature = %request,
            "Regridder ready"
        );

        Ok(Self {
            source,
            target,
            mapping,
            reused,
        })
    }

    pub fn mapping(&self) -> &WeightMapping {
        &self.mapping
    }

    /// Whether the weights came from the store.
    pub fn reused_weights(&self) -> bool {
        self.reused
    }

    pub fn source(&self) -> &SourceGrid {
        &self.source
    }

    pub fn target(&self) -> &TargetGrid {
        &self.target
    }

    /// Regrid one variable whose last two dims are the source grid dims.
    ///
    /// Leading dims (typically `time`) are preserved. Attributes are not
    /// carried over.
    pub fn regrid_variable(&self, name: &str, var: &Variable) -> Result<Variable> {
        let rank = var.rank();
        let trailing_ok = rank >= 2
            && var.dims[rank - 2] == self.source.y_dim
            && var.dims[rank - 1] == self.source.x_dim
            && var.shape[rank - 2] == self.source.ny
            && var.shape[rank - 1] == self.source.nx;
        if !trailing_ok {
            return Err(GridProcessorError::shape_mismatch(format!(
                "variable '{}' has dims {:?}{:?}, expected trailing ({}, {}) of {}x{}",
                name,
                var.dims,
                var.shape,
                self.source.y_dim,
                self.source.x_dim,
                self.source.ny,
                self.source.nx
            )));
        }

        let n_src = self.source.size();
        let n_dst = self.target.size();
        let slices = var.len() / n_src.max(1);

        let mut data = vec![0.0f64; slices * n_dst];
        for (src, dst) in var.data.chunks(n_src).zip(data.chunks_mut(n_dst)) {
            self.mapping.apply(src, dst)?;
        }

        let mut dims = var.dims[..rank - 2].to_vec();
        dims.push(self.target.y_dim.clone());
        dims.push(self.target.x_dim.clone());
        let mut shape = var.shape[..rank - 2].to_vec();
        shape.push(self.target.ny);
        shape.push(self.target.nx);

        Ok(Variable::new(dims, shape, data)?)
    }

    /// Regrid every data variable on the source grid.
    ///
    /// Source spatial coordinates (`drop_coords` plus anything on the source
    /// grid dims) are dropped, the time axis is kept, and global and variable
    /// attributes are cleared. Data variables that do not span the source
    /// grid are dropped.
    pub fn regrid_dataset(
        &self,
        ds: &GriddedDataset,
        drop_coords: &[String],
    ) -> Result<GriddedDataset> {
        let mut out = GriddedDataset::new();

        for (name, coord) in &ds.coords {
            let spatial = drop_coords.contains(name)
                || coord.has_dim(&self.source.y_dim)
                || coord.has_dim(&self.source.x_dim);
            if !spatial {
                let mut coord = coord.clone();
                coord.attributes.clear();
                out.add_coord(name, coord)?;
            }
        }

        for (name, var) in &ds.data_vars {
            if !var.has_dim(&self.source.y_dim) || !var.has_dim(&self.source.x_dim) {
                debug!(variable = %name, dims = ?var.dims, "Dropping variable without grid dims");
                continue;
            }
            let regridded = self.regrid_variable(name, var)?;
            out.add_data_var(name, regridded)?;
        }

        if out.data_vars.is_empty() {
            warn!("No data variables on the source grid were regridded");
        }

        if let Some(axis) = &ds.time {
            out.set_time(axis.clone())?;
        }
        out.validate()?;

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::LatLonGrid;
    use crate::store::MemoryWeightStore;
    use forcing_common::TimeAxis;

    fn regular(ny: usize, nx: usize, step: f64, y_dim: &str, x_dim: &str) -> LatLonGrid {
        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                lat.push(j as f64 * step);
                lon.push(i as f64 * step);
            }
        }
        LatLonGrid::new(ny, nx, lat, lon, y_dim, x_dim).unwrap()
    }

    fn regridder(mode: RegridMode, store: &mut dyn WeightStore) -> Regridder {
        Regridder::new(
            regular(3, 3, 1.0, "rlat", "rlon"),
            regular(2, 2, 0.5, "south_north", "west_east"),
            mode,
            store,
        )
        .unwrap()
    }

    #[test]
    fn test_regrid_variable_keeps_leading_dims() {
        let mut store = MemoryWeightStore::new();
        let r = regridder(RegridMode::Recompute, &mut store);
        assert!(store.is_empty());

        // value = lon + 10 * lat, two time steps offset by 100
        let mut data = Vec::new();
        for t in 0..2 {
            for j in 0..3 {
                for i in 0..3 {
                    data.push(i as f64 + 10.0 * j as f64 + 100.0 * t as f64);
                }
            }
        }
        let var = Variable::new(
            vec!["time".into(), "rlat".into(), "rlon".into()],
            vec![2, 3, 3],
            data,
        )
        .unwrap()
        .with_attribute("units", "K");

        let out = r.regrid_variable("T", &var).unwrap();
        assert_eq!(out.dims, vec!["time", "south_north", "west_east"]);
        assert_eq!(out.shape, vec![2, 2, 2]);
        assert!(out.attributes.is_empty());
        // target (lat 0.5, lon 0.5) -> 0.5 + 5
        assert!((out.data[3] - 5.5).abs() < 1e-9);
        assert!((out.data[4] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_regrid_variable_rejects_wrong_dims() {
        let mut store = MemoryWeightStore::new();
        let r = regridder(RegridMode::Recompute, &mut store);

        let var = Variable::new(vec!["y".into(), "x".into()], vec![3, 3], vec![0.0; 9]).unwrap();
        assert!(r.regrid_variable("bad", &var).unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn test_reuse_builds_then_reuses() {
        let mut store = MemoryWeightStore::new();
        let first = regridder(RegridMode::Reuse, &mut store);
        assert!(!first.reused_weights());
        assert_eq!(store.len(), 1);

        let second = regridder(RegridMode::Reuse, &mut store);
        assert!(second.reused_weights());
        assert_eq!(second.mapping(), first.mapping());
    }

    #[test]
    fn test_reuse_rejects_stale_weights() {
        let mut store = MemoryWeightStore::new();
        regridder(RegridMode::Reuse, &mut store);

        // Same shapes, shifted coordinates.
        let mut moved = regular(2, 2, 0.5, "south_north", "west_east");
        moved.lon.iter_mut().for_each(|v| *v += 0.25);
        let err = Regridder::new(
            regular(3, 3, 1.0, "rlat", "rlon"),
            moved,
            RegridMode::Reuse,
            &mut store,
        )
        .unwrap_err();
        assert!(err.is_stale_cache());
    }

    #[test]
    fn test_regrid_dataset_drops_source_coords() {
        let mut store = MemoryWeightStore::new();
        let r = regridder(RegridMode::Recompute, &mut store);

        let mut ds = GriddedDataset::new();
        ds.attributes.insert("title".into(), "RDRS".into());
        ds.add_coord("rlat", Variable::from_vec("rlat", vec![0.0, 1.0, 2.0])).unwrap();
        ds.add_coord("rlon", Variable::from_vec("rlon", vec![0.0, 1.0, 2.0])).unwrap();
        ds.add_data_var(
            "PR",
            Variable::new(
                vec!["time".into(), "rlat".into(), "rlon".into()],
                vec![1, 3, 3],
                vec![1.0; 9],
            )
            .unwrap(),
        )
        .unwrap();
        ds.add_data_var("rotated_pole", Variable::new(vec![], vec![], vec![0.0]).unwrap())
            .unwrap();
        ds.set_time(TimeAxis::decode(vec![0.0], "hours since 2011-01-01", None).unwrap())
            .unwrap();

        let drop: Vec<String> = vec!["lat".into(), "lon".into()];
        let out = r.regrid_dataset(&ds, &drop).unwrap();

        assert!(out.coords.is_empty());
        assert!(out.attributes.is_empty());
        assert_eq!(out.data_vars.keys().collect::<Vec<_>>(), vec!["PR"]);
        assert_eq!(out.dimension("south_north"), Some(2));
        assert_eq!(out.time_len(), 1);
        assert!(out.dimension("rlat").is_none());
    }
}
