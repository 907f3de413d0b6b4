//! End-to-end forcing generation.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use forcing_common::{GriddedDataset, SpatialMetadata};
use grid_processor::{
    LatLonGrid, MemoryWeightStore, NetcdfWeightStore, Regridder, WeightStore,
};
use netcdf_parser::{load_spatial_metadata, load_target_grid, open_mfdataset};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotate::annotate;
use crate::config::{ForcingConfig, Profile};
use crate::error::{ForcingError, Result};
use crate::select::select_variables;
use crate::units::convert_units;
use crate::variables::VariableSpec;
use crate::writer::{select_time_slice, write_time_slices};

/// Result of a forcing run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Profile that was run
    pub profile: Profile,
    /// Source files, in the order they were combined
    pub input_files: Vec<PathBuf>,
    /// Output variable names
    pub variables: Vec<String>,
    /// Number of timesteps regridded
    pub timesteps: usize,
    /// First and last timestep
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Files written, in write order
    pub files_written: Vec<PathBuf>,
    /// Whether weights came from the weight store
    pub weights_reused: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Summary statistics of one regridded field, ignoring NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of finite values
    pub valid: usize,
    /// Number of NaN values (target points outside the source grid)
    pub missing: usize,
}

impl FieldStats {
    /// Statistics of `values`, `None` when no value is finite.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut valid = 0usize;

        for &v in values.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            valid += 1;
        }

        (valid > 0).then(|| Self {
            min,
            max,
            mean: sum / valid as f64,
            valid,
            missing: values.len() - valid,
        })
    }
}

/// Result of the weight generation run.
#[derive(Debug, Clone, Serialize)]
pub struct WeightsSummary {
    /// Source file the source grid was read from
    pub input_files: Vec<PathBuf>,
    /// Grids the weights were built for
    pub signature: String,
    /// Non-zero weights
    pub weights: usize,
    /// Target points outside the source grid
    pub unmapped: usize,
    /// Weight file, when a weight directory is configured
    pub saved_to: Option<PathBuf>,
    /// Statistics of the first regridded timestep, per variable
    pub first_slice: Vec<(String, Option<FieldStats>)>,
}

/// Runs a profile from source files to forcing files.
pub struct ForcingPipeline {
    config: ForcingConfig,
    specs: Vec<VariableSpec>,
}

impl ForcingPipeline {
    /// Create a pipeline, validating the configuration.
    pub fn new(config: ForcingConfig) -> Result<Self> {
        config.validate().map_err(ForcingError::invalid_config)?;
        if config.weights_dir_ignored() {
            warn!(
                profile = %config.profile,
                weights_mode = %config.regrid.mode,
                "Weights directory is ignored in recompute mode"
            );
        }
        let specs = config.profile.variables();
        Ok(Self { config, specs })
    }

    pub fn config(&self) -> &ForcingConfig {
        &self.config
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.specs
    }

    /// Produce forcing files: load, select, convert, regrid, annotate, write.
    pub fn run(&self) -> Result<RunSummary> {
        let profile = self.config.profile;
        let suffix = profile.output_suffix().ok_or_else(|| {
            ForcingError::invalid_config(format!("profile '{}' writes no forcing files", profile))
        })?;
        let start = Instant::now();

        let (input_files, mut selected) = self.load_selected()?;
        let metadata = self.load_metadata()?;

        let converted = convert_units(&mut selected, &self.specs);
        debug!(converted, "Applied unit conversions");

        let regridder = self.build_regridder(&selected, &mut *self.weight_store())?;
        let regridded = regridder.regrid_dataset(&selected, &self.config.regrid.drop_coords)?;
        let annotated = annotate(regridded, &metadata, &self.specs)?;

        std::fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            ForcingError::format(format!(
                "cannot create output directory {}: {}",
                self.config.output_dir.display(),
                e
            ))
        })?;
        let files_written = write_time_slices(&annotated, &self.config.output_dir, suffix)?;

        let time_range = annotated
            .time
            .as_ref()
            .and_then(|axis| Some((*axis.first()?, *axis.instants().last()?)));

        let summary = RunSummary {
            profile,
            input_files,
            variables: annotated.data_vars.keys().cloned().collect(),
            timesteps: annotated.time_len(),
            time_range,
            files_written,
            weights_reused: regridder.reused_weights(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            profile = %profile,
            timesteps = summary.timesteps,
            files = summary.files_written.len(),
            weights_reused = summary.weights_reused,
            duration_ms = summary.duration_ms,
            "Forcing run complete"
        );

        Ok(summary)
    }

    /// Build weights for the configured grids, store them, and report the
    /// first regridded timestep.
    pub fn generate_weights(&self) -> Result<WeightsSummary> {
        let (input_files, mut selected) = self.load_selected()?;
        convert_units(&mut selected, &self.specs);

        let mut store = self.weight_store();
        let regridder = self.build_regridder(&selected, &mut *store)?;
        let mapping = regridder.mapping();

        let saved_to = match &self.config.regrid.weights_dir {
            Some(dir) => {
                store.save(mapping)?;
                Some(NetcdfWeightStore::new(dir).path_for(mapping.signature()))
            }
            None => {
                warn!("No weights directory configured; weights are not persisted");
                None
            }
        };

        let first = select_time_slice(&selected, 0)?;
        let regridded = regridder.regrid_dataset(&first, &self.config.regrid.drop_coords)?;

        let mut first_slice = Vec::new();
        for (name, var) in &regridded.data_vars {
            let stats = FieldStats::compute(&var.data);
            match &stats {
                Some(s) => info!(
                    variable = %name,
                    min = s.min,
                    max = s.max,
                    mean = s.mean,
                    missing = s.missing,
                    "First regridded timestep"
                ),
                None => warn!(variable = %name, "First regridded timestep has no valid values"),
            }
            first_slice.push((name.clone(), stats));
        }

        Ok(WeightsSummary {
            input_files,
            signature: mapping.signature().to_string(),
            weights: mapping.nnz(),
            unmapped: mapping.unmapped_count(),
            saved_to,
            first_slice,
        })
    }

    /// Open the configured input and keep only the profile's variables.
    fn load_selected(&self) -> Result<(Vec<PathBuf>, GriddedDataset)> {
        let pattern = self
            .config
            .input
            .as_deref()
            .ok_or_else(|| ForcingError::invalid_config("no input configured"))?;

        info!(profile = %self.config.profile, pattern, "Opening source data");

        let source = open_mfdataset(pattern)?;
        let selected = select_variables(&source.dataset, &self.specs)?;
        Ok((source.files, selected))
    }

    fn load_metadata(&self) -> Result<SpatialMetadata> {
        Ok(load_spatial_metadata(
            &self.config.spatial_metadata,
            &self.config.projection_vars,
        )?)
    }

    fn weight_store(&self) -> Box<dyn WeightStore> {
        match &self.config.regrid.weights_dir {
            Some(dir) => Box::new(NetcdfWeightStore::new(dir)),
            None => Box::new(MemoryWeightStore::new()),
        }
    }

    fn build_regridder(
        &self,
        source: &GriddedDataset,
        store: &mut dyn WeightStore,
    ) -> Result<Regridder> {
        let target = load_target_grid(
            &self.config.geo_em,
            &self.config.target_lon_var,
            &self.config.target_lat_var,
        )?;

        let source_grid = LatLonGrid::from_dataset(source)?;
        let target_grid = LatLonGrid::from_dataset(&target)?;
        debug!(
            source = %source_grid.shape(),
            target = %target_grid.shape(),
            "Grids loaded"
        );

        Ok(Regridder::new(
            source_grid,
            target_grid,
            self.config.regrid.mode,
            store,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_stats_ignores_nan() {
        let stats = FieldStats::compute(&[1.0, f64::NAN, 3.0, 5.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.missing, 1);
    }

    #[test]
    fn test_field_stats_all_nan() {
        assert!(FieldStats::compute(&[f64::NAN, f64::NAN]).is_none());
        assert!(FieldStats::compute(&[]).is_none());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ForcingConfig::for_profile(Profile::Precip);
        let err = ForcingPipeline::new(config).err().unwrap();
        assert!(matches!(err, ForcingError::InvalidConfig(_)));
    }

    #[test]
    fn test_weights_profile_cannot_run() {
        let pipeline = ForcingPipeline::new(ForcingConfig::for_profile(Profile::Weights)).unwrap();
        assert!(matches!(
            pipeline.run().unwrap_err(),
            ForcingError::InvalidConfig(_)
        ));
    }
}
