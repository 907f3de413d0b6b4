//! Variable tables for each output product.
//!
//! Each entry names a source variable, the name it is written under, the
//! affine transform taking source units to output units, and the output
//! `units` attribute.

use serde::Serialize;

/// Knots to metres per second.
pub const KNOTS_TO_MS: f64 = 0.514444;

/// Degrees Celsius to kelvin, as used by the WRF-Hydro forcing tools.
pub const CELSIUS_TO_KELVIN: f64 = 273.16;

/// Metres per hour to millimetres per second.
pub const PRECIP_M_PER_HOUR_TO_MM_PER_S: f64 = 1000.0 / 3600.0;

/// Hectopascal to pascal.
pub const HPA_TO_PA: f64 = 100.0;

/// One variable to extract, rename and convert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSpec {
    /// Variable name in the source files (e.g., "RDRS_TT_40m")
    pub source: &'static str,
    /// Variable name in the output files (e.g., "T2D")
    pub target: &'static str,
    /// Multiplier applied to source values
    pub scale: f64,
    /// Added after scaling
    pub offset: f64,
    /// Output `units` attribute
    pub units: &'static str,
}

impl VariableSpec {
    /// A variable copied without conversion.
    pub const fn identity(source: &'static str, target: &'static str, units: &'static str) -> Self {
        Self {
            source,
            target,
            scale: 1.0,
            offset: 0.0,
            units,
        }
    }

    /// A variable converted with `value * scale + offset`.
    pub const fn affine(
        source: &'static str,
        target: &'static str,
        scale: f64,
        offset: f64,
        units: &'static str,
    ) -> Self {
        Self {
            source,
            target,
            scale,
            offset,
            units,
        }
    }

    /// Convert one value. NaN stays NaN.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// Variables written to `LDASIN_DOMAIN1` files.
pub fn ldasin_variables() -> Vec<VariableSpec> {
    vec![
        // Precipitation
        VariableSpec::affine(
            "RDRS_PR0_SFC",
            "RAINRATE",
            PRECIP_M_PER_HOUR_TO_MM_PER_S,
            0.0,
            "mm/s",
        ),
        // Wind at 40 m
        VariableSpec::affine("RDRS_UUC_40m", "U2D", KNOTS_TO_MS, 0.0, "m/s"),
        VariableSpec::affine("RDRS_VVC_40m", "V2D", KNOTS_TO_MS, 0.0, "m/s"),
        // Humidity and temperature at 40 m
        VariableSpec::identity("RDRS_HU_40m", "Q2D", "kg/kg"),
        VariableSpec::affine("RDRS_TT_40m", "T2D", 1.0, CELSIUS_TO_KELVIN, "K"),
        // Radiation
        VariableSpec::identity("RDRS_FB_SFC", "SWDOWN", "W/m^2"),
        VariableSpec::identity("RDRS_FI_SFC", "LWDOWN", "W/m^2"),
        // Surface pressure
        VariableSpec::affine("RDRS_P0_SFC", "PSFC", HPA_TO_PA, 0.0, "Pa"),
    ]
}

/// Variables written to `PRECIP_FORCING` files.
pub fn precip_variables() -> Vec<VariableSpec> {
    vec![VariableSpec::affine(
        "PR0_SFC",
        "precip_rate",
        PRECIP_M_PER_HOUR_TO_MM_PER_S,
        0.0,
        "mm/s",
    )]
}

/// Find the entry whose output name is `target`.
pub fn find_target<'a>(specs: &'a [VariableSpec], target: &str) -> Option<&'a VariableSpec> {
    specs.iter().find(|s| s.target == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ldasin(target: &str) -> VariableSpec {
        find_target(&ldasin_variables(), target).cloned().unwrap()
    }

    #[test]
    fn test_ldasin_table_is_complete() {
        let specs = ldasin_variables();
        assert_eq!(specs.len(), 8);
        let targets: Vec<_> = specs.iter().map(|s| s.target).collect();
        assert_eq!(
            targets,
            vec!["RAINRATE", "U2D", "V2D", "Q2D", "T2D", "SWDOWN", "LWDOWN", "PSFC"]
        );
    }

    #[test]
    fn test_precip_conversion() {
        let spec = ldasin("RAINRATE");
        assert!((spec.apply(1.0) - 0.277_777_8).abs() < 1e-6);
        assert!((spec.apply(0.001) - 0.000_277_8).abs() < 1e-7);
        assert_eq!(spec.units, "mm/s");
    }

    #[test]
    fn test_wind_conversion() {
        assert!((ldasin("U2D").apply(10.0) - 5.14444).abs() < 1e-9);
        assert!((ldasin("V2D").apply(-2.0) + 1.028888).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_and_pressure() {
        assert!((ldasin("T2D").apply(0.0) - 273.16).abs() < 1e-9);
        assert!((ldasin("T2D").apply(-40.0) - 233.16).abs() < 1e-9);
        assert!((ldasin("PSFC").apply(1013.25) - 101_325.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_variables() {
        for target in ["Q2D", "SWDOWN", "LWDOWN"] {
            let spec = ldasin(target);
            assert!(spec.is_identity(), "{} should pass through", target);
            assert_eq!(spec.apply(0.0123), 0.0123);
        }
    }

    #[test]
    fn test_nan_stays_nan() {
        for spec in ldasin_variables() {
            assert!(spec.apply(f64::NAN).is_nan());
        }
    }

    #[test]
    fn test_precip_table() {
        let specs = precip_variables();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].source, "PR0_SFC");
        assert_eq!(specs[0].target, "precip_rate");
        assert!((specs[0].apply(3.6) - 1.0).abs() < 1e-12);
    }
}
