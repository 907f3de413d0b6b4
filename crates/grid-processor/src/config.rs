//! Configuration for the regridder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for regridding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegridConfig {
    /// Whether weights are rebuilt or taken from the weight store.
    pub mode: RegridMode,

    /// Directory holding weight files. `None` keeps weights in memory only.
    pub weights_dir: Option<PathBuf>,

    /// Source spatial coordinates dropped from regridded output.
    pub drop_coords: Vec<String>,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            mode: RegridMode::Recompute,
            weights_dir: None,
            drop_coords: ["rlat", "rlon", "lat", "lon"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RegridConfig {
    /// Apply overrides from environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("FORCING_WEIGHTS_MODE") {
            if let Some(mode) = RegridMode::from_str(&val) {
                self.mode = mode;
            }
        }

        if let Ok(val) = std::env::var("FORCING_WEIGHTS_DIR") {
            if !val.is_empty() {
                self.weights_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dir) = &self.weights_dir {
            if dir.as_os_str().is_empty() {
                return Err("weights_dir must not be empty".to_string());
            }
            if dir.is_file() {
                return Err(format!("weights_dir {} is a file", dir.display()));
            }
        }
        Ok(())
    }
}

/// How a regridder obtains its weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegridMode {
    /// Always build weights from the current grids.
    #[default]
    Recompute,
    /// Use stored weights when present, building and storing them otherwise.
    Reuse,
}

impl RegridMode {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "recompute" => Some(Self::Recompute),
            "reuse" => Some(Self::Reuse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recompute => "recompute",
            Self::Reuse => "reuse",
        }
    }
}

impl std::fmt::Display for RegridMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegridConfig::default();
        assert_eq!(config.mode, RegridMode::Recompute);
        assert!(config.weights_dir.is_none());
        assert!(config.drop_coords.contains(&"rlat".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(RegridMode::from_str("REUSE"), Some(RegridMode::Reuse));
        assert_eq!(RegridMode::from_str("recompute"), Some(RegridMode::Recompute));
        assert_eq!(RegridMode::from_str("sometimes"), None);
    }

    #[test]
    fn test_deserialize_partial_yaml_like_json() {
        let config: RegridConfig = serde_json::from_str(r#"{"mode": "reuse"}"#).unwrap();
        assert_eq!(config.mode, RegridMode::Reuse);
        assert_eq!(config.weights_dir, None);
    }

    #[test]
    fn test_validate_rejects_file_as_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = RegridConfig {
            weights_dir: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
