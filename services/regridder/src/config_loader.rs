//! Configuration loader for the regridder.
//!
//! Builds a [`ForcingConfig`] from, in increasing precedence:
//! - the defaults of the selected profile
//! - an optional YAML file (with `${VAR}` substitution)
//! - `FORCING_*` environment variables
//!
//! Command-line flags are applied by the caller.

use anyhow::{Context, Result};
use forcing::{ForcingConfig, Profile};
use std::fs;
use std::path::Path;

/// Load the configuration for `profile`, reading `path` when given.
pub fn load_config(path: Option<&Path>, profile: Profile) -> Result<ForcingConfig> {
    let Some(path) = path else {
        return Ok(ForcingConfig::from_env(profile));
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let content = expand_env_vars(&content)
        .with_context(|| format!("Failed to expand variables in {:?}", path))?;
    let mut config = ForcingConfig::from_yaml_str(&content, profile)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;

    config.apply_env();
    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_expand_default_for_unset_variable() {
        let out = expand_env_vars("output_dir: ${REGRIDDER_TEST_UNSET_DIR:-forcing}\n").unwrap();
        assert_eq!(out, "output_dir: forcing\n");
    }

    #[test]
    fn test_expand_set_variable() {
        std::env::set_var("REGRIDDER_TEST_GEO_EM", "/domains/geo_em.d02.nc");
        let out = expand_env_vars("geo_em: ${REGRIDDER_TEST_GEO_EM}").unwrap();
        assert_eq!(out, "geo_em: /domains/geo_em.d02.nc");
    }

    #[test]
    fn test_expand_errors() {
        assert!(expand_env_vars("input: ${REGRIDDER_TEST_NEVER_SET}").is_err());
        assert!(expand_env_vars("input: ${UNCLOSED").is_err());
        assert_eq!(expand_env_vars("cost: $5").unwrap(), "cost: $5");
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regridder.yaml");
        fs::write(
            &path,
            "geo_em: ${REGRIDDER_TEST_UNSET_DOMAIN:-domain}/geo_em.d01.nc\nprojection_vars: [ProjectionCoordinateSystem]\n",
        )
        .unwrap();

        let config = load_config(Some(&path), Profile::Ldasin).unwrap();
        assert_eq!(config.geo_em, PathBuf::from("domain/geo_em.d01.nc"));
        assert_eq!(config.projection_vars, vec!["ProjectionCoordinateSystem"]);
        assert_eq!(config.profile, Profile::Ldasin);
    }

    #[test]
    fn test_load_missing_config_file() {
        let err = load_config(Some(Path::new("/nonexistent/regridder.yaml")), Profile::Precip)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }
}
