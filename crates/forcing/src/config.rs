//! Pipeline configuration and run profiles.
//!
//! Settings are layered: profile defaults, then an optional YAML document,
//! then `FORCING_*` environment variables. The CLI applies its own flags on
//! top.

use std::path::PathBuf;

use grid_processor::{RegridConfig, RegridMode};
use netcdf_parser::{GEO_EM_LAT, GEO_EM_LON};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::Result;
use crate::variables::{ldasin_variables, precip_variables, VariableSpec};
use crate::writer::{LDASIN_SUFFIX, PRECIP_SUFFIX};

/// Default RDRS/CaPA forcing input of the `ldasin` profile.
pub const DEFAULT_LDASIN_INPUT: &str = "RDRS_CaPA24hr_forcings_final.nc";
/// Default hourly CaPA file used to build precipitation weights.
pub const DEFAULT_WEIGHTS_INPUT: &str = "../hourly/2011/2011010112_024.nc";
/// Default WPS geogrid file defining the target grid.
pub const DEFAULT_GEO_EM: &str = "geo_em.d01.nc";
/// Default WRF-Hydro spatial metadata file.
pub const DEFAULT_SPATIAL_METADATA: &str = "GEOGRID_LDASOUT_Spatial_Metadata.nc";

/// Which product a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Eight RDRS fields to `LDASIN_DOMAIN1` files.
    Ldasin,
    /// CaPA precipitation to `PRECIP_FORCING` files, reusing stored weights.
    Precip,
    /// Build and store precipitation weights without writing forcing files.
    Weights,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ldasin => "ldasin",
            Self::Precip => "precip",
            Self::Weights => "weights",
        }
    }

    /// Variable table of the product.
    pub fn variables(&self) -> Vec<VariableSpec> {
        match self {
            Self::Ldasin => ldasin_variables(),
            Self::Precip | Self::Weights => precip_variables(),
        }
    }

    /// Output file suffix, `None` when the profile writes no forcing files.
    pub fn output_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Ldasin => Some(LDASIN_SUFFIX),
            Self::Precip => Some(PRECIP_SUFFIX),
            Self::Weights => None,
        }
    }

    pub fn weights_mode(&self) -> RegridMode {
        match self {
            Self::Ldasin | Self::Weights => RegridMode::Recompute,
            Self::Precip => RegridMode::Reuse,
        }
    }

    /// Where weights are kept unless configured otherwise.
    pub fn default_weights_dir(&self) -> Option<PathBuf> {
        match self {
            Self::Ldasin => None,
            Self::Precip | Self::Weights => Some(PathBuf::from(".")),
        }
    }

    pub fn default_input(&self) -> Option<&'static str> {
        match self {
            Self::Ldasin => Some(DEFAULT_LDASIN_INPUT),
            Self::Precip => None,
            Self::Weights => Some(DEFAULT_WEIGHTS_INPUT),
        }
    }

    /// Whether the run needs the spatial metadata file.
    pub fn needs_spatial_metadata(&self) -> bool {
        self.output_suffix().is_some()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingConfig {
    /// Product to generate.
    pub profile: Profile,

    /// Source file path or glob pattern.
    pub input: Option<String>,

    /// Target grid file (`geo_em`).
    pub geo_em: PathBuf,

    /// Longitude variable in the target grid file.
    pub target_lon_var: String,

    /// Latitude variable in the target grid file.
    pub target_lat_var: String,

    /// WRF-Hydro spatial metadata file.
    pub spatial_metadata: PathBuf,

    /// Variables searched, in order, for the `esri_pe_string` attribute.
    pub projection_vars: Vec<String>,

    /// Directory forcing files are written to.
    pub output_dir: PathBuf,

    /// Weight generation and storage.
    pub regrid: RegridConfig,
}

impl Default for ForcingConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Ldasin)
    }
}

impl ForcingConfig {
    /// Defaults for a profile.
    pub fn for_profile(profile: Profile) -> Self {
        let regrid = RegridConfig {
            mode: profile.weights_mode(),
            weights_dir: profile.default_weights_dir(),
            ..RegridConfig::default()
        };

        Self {
            profile,
            input: profile.default_input().map(str::to_string),
            geo_em: PathBuf::from(DEFAULT_GEO_EM),
            target_lon_var: GEO_EM_LON.to_string(),
            target_lat_var: GEO_EM_LAT.to_string(),
            spatial_metadata: PathBuf::from(DEFAULT_SPATIAL_METADATA),
            projection_vars: vec!["crs".to_string(), "ProjectionCoordinateSystem".to_string()],
            output_dir: PathBuf::from("."),
            regrid,
        }
    }

    /// Profile defaults overlaid with a YAML document.
    ///
    /// Keys absent from the document keep the profile default, so a file
    /// holding only `output_dir: out` is valid. The profile itself is not
    /// taken from the document.
    pub fn from_yaml_str(yaml: &str, profile: Profile) -> Result<Self> {
        let overlay: Value = serde_yaml::from_str(yaml)?;
        let mut merged = serde_yaml::to_value(Self::for_profile(profile))?;
        merge_yaml(&mut merged, overlay);

        let mut config: Self = serde_yaml::from_value(merged)?;
        config.profile = profile;
        Ok(config)
    }

    /// Apply overrides from environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("FORCING_INPUT") {
            if !val.is_empty() {
                self.input = Some(val);
            }
        }

        if let Ok(val) = std::env::var("FORCING_GEO_EM") {
            if !val.is_empty() {
                self.geo_em = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("FORCING_SPATIAL_METADATA") {
            if !val.is_empty() {
                self.spatial_metadata = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("FORCING_OUTPUT_DIR") {
            if !val.is_empty() {
                self.output_dir = PathBuf::from(val);
            }
        }

        self.regrid.apply_env();
    }

    /// Profile defaults with environment overrides applied.
    pub fn from_env(profile: Profile) -> Self {
        let mut config = Self::for_profile(profile);
        config.apply_env();
        config
    }

    /// True when a weights directory is set but the run never reads or
    /// writes it: recompute mode outside the `weights` profile.
    pub fn weights_dir_ignored(&self) -> bool {
        self.regrid.weights_dir.is_some()
            && self.regrid.mode == RegridMode::Recompute
            && self.profile != Profile::Weights
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match &self.input {
            None => {
                return Err(format!("profile '{}' requires an input file or pattern", self.profile))
            }
            Some(input) if input.trim().is_empty() => {
                return Err("input must not be empty".to_string())
            }
            Some(_) => {}
        }

        if self.geo_em.as_os_str().is_empty() {
            return Err("geo_em must not be empty".to_string());
        }
        if self.target_lon_var.is_empty() || self.target_lat_var.is_empty() {
            return Err("target_lon_var and target_lat_var must not be empty".to_string());
        }

        if self.profile.needs_spatial_metadata() {
            if self.spatial_metadata.as_os_str().is_empty() {
                return Err("spatial_metadata must not be empty".to_string());
            }
            if self.projection_vars.is_empty() {
                return Err("projection_vars must name at least one variable".to_string());
            }
            if self.output_dir.is_file() {
                return Err(format!("output_dir {} is a file", self.output_dir.display()));
            }
        }

        self.regrid.validate()
    }
}

/// Recursively overlay `overlay` onto `base`. Mappings merge key by key;
/// any other value replaces the base value. A null document changes nothing.
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults() {
        let ldasin = ForcingConfig::for_profile(Profile::Ldasin);
        assert_eq!(ldasin.input.as_deref(), Some(DEFAULT_LDASIN_INPUT));
        assert_eq!(ldasin.regrid.mode, RegridMode::Recompute);
        assert!(ldasin.regrid.weights_dir.is_none());
        assert_eq!(ldasin.target_lon_var, "XLONG_M");
        assert_eq!(ldasin.projection_vars, vec!["crs", "ProjectionCoordinateSystem"]);
        assert!(ldasin.validate().is_ok());

        let precip = ForcingConfig::for_profile(Profile::Precip);
        assert_eq!(precip.regrid.mode, RegridMode::Reuse);
        assert_eq!(precip.regrid.weights_dir, Some(PathBuf::from(".")));
        assert!(precip.input.is_none());
        assert!(precip.validate().is_err());

        let weights = ForcingConfig::for_profile(Profile::Weights);
        assert_eq!(weights.regrid.mode, RegridMode::Recompute);
        assert_eq!(weights.input.as_deref(), Some(DEFAULT_WEIGHTS_INPUT));
        assert_eq!(Profile::Weights.output_suffix(), None);
    }

    #[test]
    fn test_weights_dir_ignored_only_in_recompute_runs() {
        let mut ldasin = ForcingConfig::for_profile(Profile::Ldasin);
        assert!(!ldasin.weights_dir_ignored());
        ldasin.regrid.weights_dir = Some(PathBuf::from("w"));
        assert!(ldasin.weights_dir_ignored());
        ldasin.regrid.mode = RegridMode::Reuse;
        assert!(!ldasin.weights_dir_ignored());

        assert!(!ForcingConfig::for_profile(Profile::Precip).weights_dir_ignored());
        assert!(!ForcingConfig::for_profile(Profile::Weights).weights_dir_ignored());
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::Ldasin.to_string(), "ldasin");
        assert_eq!(Profile::Precip.as_str(), "precip");
        assert_eq!(Profile::Weights.to_string(), "weights");
    }

    #[test]
    fn test_yaml_overlays_profile_defaults() {
        let yaml = r#"
input: "capa/*.nc"
output_dir: out
regrid:
  weights_dir: weights
"#;
        let config = ForcingConfig::from_yaml_str(yaml, Profile::Precip).unwrap();
        assert_eq!(config.profile, Profile::Precip);
        assert_eq!(config.input.as_deref(), Some("capa/*.nc"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.regrid.weights_dir, Some(PathBuf::from("weights")));
        // Untouched keys keep the profile defaults.
        assert_eq!(config.regrid.mode, RegridMode::Reuse);
        assert_eq!(config.geo_em, PathBuf::from(DEFAULT_GEO_EM));
        assert!(config.regrid.drop_coords.contains(&"rlat".to_string()));
    }

    #[test]
    fn test_yaml_cannot_switch_profile() {
        let config = ForcingConfig::from_yaml_str("profile: precip\n", Profile::Ldasin).unwrap();
        assert_eq!(config.profile, Profile::Ldasin);
    }

    #[test]
    fn test_empty_yaml_is_profile_defaults() {
        let config = ForcingConfig::from_yaml_str("", Profile::Weights).unwrap();
        assert_eq!(config, ForcingConfig::for_profile(Profile::Weights));
    }

    #[test]
    fn test_yaml_rejects_bad_mode() {
        let err = ForcingConfig::from_yaml_str("regrid:\n  mode: sometimes\n", Profile::Ldasin)
            .unwrap_err();
        assert!(err.to_string().contains("configuration"));
    }

    #[test]
    fn test_validate_rejects_empty_projection_vars() {
        let config = ForcingConfig {
            projection_vars: Vec::new(),
            ..ForcingConfig::for_profile(Profile::Ldasin)
        };
        assert!(config.validate().is_err());

        // The weights profile never reads spatial metadata.
        let config = ForcingConfig {
            projection_vars: Vec::new(),
            ..ForcingConfig::for_profile(Profile::Weights)
        };
        assert!(config.validate().is_ok());
    }
}
