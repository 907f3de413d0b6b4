//! Integration tests: regridding synthetic fields between curvilinear grids.

use grid_processor::{
    LatLonGrid, MemoryWeightStore, NetcdfWeightStore, RegridConfig, RegridMode, Regridder,
    WeightStore,
};
use netcdf_parser::{load_target_grid, open_dataset, GEO_EM_LAT, GEO_EM_LON};
use test_utils::{
    assert_approx_eq, linear_field, source_value, write_geo_em, write_source_file,
    CurvilinearGrid, SourceFixture,
};

fn to_grid(g: &CurvilinearGrid, y_dim: &str, x_dim: &str) -> LatLonGrid {
    LatLonGrid::new(g.ny, g.nx, g.lat.clone(), g.lon.clone(), y_dim, x_dim).unwrap()
}

/// Rotated-looking source covering the target comfortably.
fn source_grid() -> CurvilinearGrid {
    CurvilinearGrid::skewed(12, 14, 39.0, -106.0, 0.5, 0.5, 0.05)
}

/// Regular target strictly inside the source grid.
fn target_grid() -> CurvilinearGrid {
    CurvilinearGrid::regular(6, 8, 41.0, -104.0, 0.3, 0.3)
}

#[test]
fn test_identity_regrid_reproduces_source() {
    let grid = source_grid();
    let mut store = MemoryWeightStore::new();
    let regridder = Regridder::new(
        to_grid(&grid, "rlat", "rlon"),
        to_grid(&grid, "south_north", "west_east"),
        RegridMode::Recompute,
        &mut store,
    )
    .unwrap();

    // Any field, not only linear ones, must come back unchanged.
    let field = grid.field(|la, lo| (la * 0.7).sin() * 30.0 + (lo * 1.3).cos() * 5.0);
    let mut out = vec![0.0; grid.size()];
    regridder.mapping().apply(&field, &mut out).unwrap();

    assert_eq!(regridder.mapping().unmapped_count(), 0);
    for (a, b) in out.iter().zip(&field) {
        assert_approx_eq!(*a, *b, 1e-6);
    }
}

#[test]
fn test_linear_field_is_exact_between_grids() {
    let source = source_grid();
    let target = target_grid();
    let mut store = MemoryWeightStore::new();
    let regridder = Regridder::new(
        to_grid(&source, "rlat", "rlon"),
        to_grid(&target, "south_north", "west_east"),
        RegridMode::Recompute,
        &mut store,
    )
    .unwrap();

    let mut out = vec![0.0; target.size()];
    regridder
        .mapping()
        .apply(&source.linear_field(0.0), &mut out)
        .unwrap();

    for ((&la, &lo), v) in target.lat.iter().zip(&target.lon).zip(&out) {
        assert_approx_eq!(*v, linear_field(la, lo), 1e-8);
    }
}

#[test]
fn test_netcdf_store_reuse_and_stale_detection() {
    let dir = tempfile::tempdir().unwrap();
    let source = to_grid(&source_grid(), "rlat", "rlon");
    let target = to_grid(&target_grid(), "south_north", "west_east");

    let mut store = NetcdfWeightStore::new(dir.path());
    let built = Regridder::new(source.clone(), target.clone(), RegridMode::Reuse, &mut store)
        .unwrap();
    assert!(!built.reused_weights());
    assert!(dir.path().join("bilinear_12x14_6x8.nc").is_file());

    // A fresh store on the same directory picks the file up.
    let mut reopened = NetcdfWeightStore::new(dir.path());
    let reused = Regridder::new(source.clone(), target.clone(), RegridMode::Reuse, &mut reopened)
        .unwrap();
    assert!(reused.reused_weights());
    assert_eq!(reused.mapping(), built.mapping());

    // Same shapes, different coordinates: the stored file must not be used.
    let shifted = to_grid(
        &CurvilinearGrid::regular(6, 8, 41.1, -104.0, 0.3, 0.3),
        "south_north",
        "west_east",
    );
    let err = Regridder::new(source.clone(), shifted.clone(), RegridMode::Reuse, &mut reopened)
        .unwrap_err();
    assert!(err.is_stale_cache(), "unexpected error: {}", err);

    // Recompute neither reads nor overwrites the stored file.
    let recomputed =
        Regridder::new(source, shifted, RegridMode::Recompute, &mut reopened).unwrap();
    assert!(!recomputed.reused_weights());
    let stored = reopened
        .load(recomputed.mapping().signature())
        .unwrap()
        .unwrap();
    assert_eq!(stored.signature(), built.mapping().signature());
}

#[test]
fn test_regrid_dataset_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_grid();
    let target = target_grid();

    let source_path = dir.path().join("rdrs.nc");
    write_source_file(
        &source_path,
        &SourceFixture::new(&source, &["RDRS_TT_40m", "RDRS_P0_SFC"], &[0.0, 1.0, 2.0]),
    )
    .unwrap();
    let geo_path = dir.path().join("geo_em.d01.nc");
    write_geo_em(&geo_path, &target).unwrap();

    let ds = open_dataset(&source_path).unwrap();
    let geo = load_target_grid(&geo_path, GEO_EM_LON, GEO_EM_LAT).unwrap();

    let config = RegridConfig::default();
    let mut store = MemoryWeightStore::new();
    let regridder = Regridder::new(
        LatLonGrid::from_dataset(&ds).unwrap(),
        LatLonGrid::from_dataset(&geo).unwrap(),
        config.mode,
        &mut store,
    )
    .unwrap();
    let out = regridder.regrid_dataset(&ds, &config.drop_coords).unwrap();

    assert!(out.coords.is_empty());
    assert!(!out.data_vars.contains_key("rotated_pole"));
    let tt = &out.data_vars["RDRS_TT_40m"];
    assert_eq!(tt.dims, vec!["time", "south_north", "west_east"]);
    assert_eq!(tt.shape, vec![3, 6, 8]);

    // Source values were stored as f32, so allow for that rounding.
    let slice = target.size();
    for (k, (&la, &lo)) in target.lat.iter().zip(&target.lon).enumerate() {
        assert_approx_eq!(tt.data[k], source_value(0, 0.0, la, lo), 1e-3);
        assert_approx_eq!(tt.data[2 * slice + k], source_value(0, 2.0, la, lo), 1e-3);
    }
    let p0 = &out.data_vars["RDRS_P0_SFC"];
    assert_approx_eq!(p0.data[0], source_value(1, 0.0, target.lat[0], target.lon[0]), 1e-3);
}
