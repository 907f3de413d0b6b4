//! NetCDF fixtures shaped like the real inputs.
//!
//! - [`write_source_file`]: RDRS/CaPA-style forcing file on a rotated grid
//!   (`time`, `rlat`, `rlon` with 2-D `lat`/`lon`).
//! - [`write_geo_em`]: WPS `geo_em` target grid with a singleton `Time` axis.
//! - [`write_spatial_metadata`]: WRF-Hydro spatial metadata (`x`, `y`, CRS).

use std::path::Path;

use crate::generators::{linear_field, linspace_from, CurvilinearGrid};

/// Time units used by the source fixtures unless a test needs others.
pub const FIXTURE_TIME_UNITS: &str = "hours since 1980-01-01 00:00:00";

/// A short ESRI projection string for metadata fixtures.
pub const FIXTURE_ESRI_PE_STRING: &str = "PROJCS[\"Lambert_Conformal_Conic\",GEOGCS[\"GCS_Sphere\",DATUM[\"D_Sphere\",SPHEROID[\"Sphere\",6370000.0,0.0]]]]";

/// Description of a source forcing file.
#[derive(Debug, Clone)]
pub struct SourceFixture<'a> {
    pub grid: &'a CurvilinearGrid,
    pub variables: &'a [&'a str],
    pub time_values: &'a [f64],
    pub time_units: &'a str,
}

impl<'a> SourceFixture<'a> {
    pub fn new(grid: &'a CurvilinearGrid, variables: &'a [&'a str], time_values: &'a [f64]) -> Self {
        Self {
            grid,
            variables,
            time_values,
            time_units: FIXTURE_TIME_UNITS,
        }
    }
}

/// Value written for variable number `var_index` at a time coordinate.
///
/// Linear in lat/lon, so bilinear regridding reproduces it exactly, and
/// offset by the raw time value so slices can be told apart.
pub fn source_value(var_index: usize, time_value: f64, lat: f64, lon: f64) -> f64 {
    linear_field(lat, lon) + 100.0 * var_index as f64 + time_value
}

/// Write an RDRS-like source file.
pub fn write_source_file(path: &Path, fixture: &SourceFixture) -> Result<(), netcdf::Error> {
    let grid = fixture.grid;
    let nt = fixture.time_values.len();
    let mut file = netcdf::create(path)?;

    file.add_dimension("time", nt)?;
    file.add_dimension("rlat", grid.ny)?;
    file.add_dimension("rlon", grid.nx)?;
    file.add_attribute("title", "Synthetic RDRS forcing")?;

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("units", fixture.time_units)?;
        time.put_attribute("calendar", "proleptic_gregorian")?;
        time.put_values(fixture.time_values, ..)?;
    }
    {
        let mut rlat = file.add_variable::<f64>("rlat", &["rlat"])?;
        rlat.put_attribute("units", "degrees")?;
        rlat.put_values(&linspace_from(-1.0, 0.1, grid.ny), ..)?;
    }
    {
        let mut rlon = file.add_variable::<f64>("rlon", &["rlon"])?;
        rlon.put_attribute("units", "degrees")?;
        rlon.put_values(&linspace_from(-2.0, 0.1, grid.nx), ..)?;
    }
    {
        let mut lat = file.add_variable::<f64>("lat", &["rlat", "rlon"])?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_values(&grid.lat, ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["rlat", "rlon"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_values(&grid.lon, ..)?;
    }
    {
        let mut pole = file.add_variable::<i32>("rotated_pole", &[])?;
        pole.put_attribute("grid_mapping_name", "rotated_latitude_longitude")?;
        pole.put_attribute("grid_north_pole_latitude", 31.758_312_225_341_8_f64)?;
    }

    for (var_index, name) in fixture.variables.iter().enumerate() {
        let mut data = Vec::with_capacity(nt * grid.size());
        for &t in fixture.time_values {
            data.extend(
                grid.field(|la, lo| source_value(var_index, t, la, lo))
                    .into_iter()
                    .map(|v| v as f32),
            );
        }

        let mut var = file.add_variable::<f32>(name, &["time", "rlat", "rlon"])?;
        var.put_attribute("coordinates", "lon lat")?;
        var.put_attribute("grid_mapping", "rotated_pole")?;
        var.put_attribute("units", "source-units")?;
        var.put_values(&data, ..)?;
    }

    Ok(())
}

/// Write a `geo_em`-style target grid with `XLAT_M`/`XLONG_M`.
pub fn write_geo_em(path: &Path, grid: &CurvilinearGrid) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("Time", 1)?;
    file.add_dimension("south_north", grid.ny)?;
    file.add_dimension("west_east", grid.nx)?;
    file.add_attribute("MAP_PROJ", 1i32)?;

    let dims = ["Time", "south_north", "west_east"];
    {
        let mut lat = file.add_variable::<f32>("XLAT_M", &dims)?;
        lat.put_attribute("units", "degrees latitude")?;
        let data: Vec<f32> = grid.lat.iter().map(|&v| v as f32).collect();
        lat.put_values(&data, ..)?;
    }
    {
        let mut lon = file.add_variable::<f32>("XLONG_M", &dims)?;
        lon.put_attribute("units", "degrees longitude")?;
        let data: Vec<f32> = grid.lon.iter().map(|&v| v as f32).collect();
        lon.put_values(&data, ..)?;
    }
    {
        let mut hgt = file.add_variable::<f32>("HGT_M", &dims)?;
        hgt.put_values(&vec![100.0f32; grid.size()], ..)?;
    }

    Ok(())
}

/// Write a spatial metadata file with `x`, `y` and a projection variable.
pub fn write_spatial_metadata(
    path: &Path,
    x: &[f64],
    y: &[f64],
    projection_var: &str,
    esri_pe_string: &str,
) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("y", y.len())?;
    file.add_dimension("x", x.len())?;

    {
        let mut xv = file.add_variable::<f64>("x", &["x"])?;
        xv.put_attribute("standard_name", "projection_x_coordinate")?;
        xv.put_attribute("units", "m")?;
        xv.put_values(x, ..)?;
    }
    {
        let mut yv = file.add_variable::<f64>("y", &["y"])?;
        yv.put_attribute("standard_name", "projection_y_coordinate")?;
        yv.put_attribute("units", "m")?;
        yv.put_values(y, ..)?;
    }
    {
        let mut crs = file.add_variable::<i32>(projection_var, &[])?;
        crs.put_attribute("grid_mapping_name", "lambert_conformal_conic")?;
        crs.put_attribute("esri_pe_string", esri_pe_string)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_value_offsets() {
        let base = source_value(0, 0.0, 45.0, -100.0);
        assert_eq!(source_value(1, 0.0, 45.0, -100.0), base + 100.0);
        assert_eq!(source_value(0, 3.0, 45.0, -100.0), base + 3.0);
    }

    #[test]
    fn test_write_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let grid = CurvilinearGrid::regular(3, 4, 45.0, -100.0, 0.5, 0.5);

        let source = dir.path().join("source.nc");
        write_source_file(&source, &SourceFixture::new(&grid, &["A", "B"], &[0.0, 1.0])).unwrap();
        assert!(source.exists());

        let geo = dir.path().join("geo_em.d01.nc");
        write_geo_em(&geo, &grid).unwrap();
        assert!(geo.exists());

        let meta = dir.path().join("meta.nc");
        write_spatial_metadata(&meta, &[0.0, 1.0], &[0.0], "crs", FIXTURE_ESRI_PE_STRING).unwrap();
        assert!(meta.exists());
    }
}
