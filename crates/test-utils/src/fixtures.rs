//! Common test fixtures for regional balance tests.

/// Region bounds as `(down, up, left, right)` in degrees.
pub mod region {
    /// East Siberian box used in the reference analyses.
    pub const SIBERIA: (f64, f64, f64, f64) = (55.0, 65.0, 130.0, 140.0);

    /// 2x2 degree box on the equator.
    pub const EQUATOR_2X2: (f64, f64, f64, f64) = (-1.0, 1.0, 30.0, 32.0);

    /// Box straddling the first/last column of the default grid (column 0 is at 20.125).
    pub const COLUMN_SEAM: (f64, f64, f64, f64) = (0.0, 2.0, 19.0, 21.0);

    /// Box crossing the antimeridian.
    pub const ANTIMERIDIAN: (f64, f64, f64, f64) = (10.0, 12.0, 179.0, -179.0);

    /// Near the north pole, where parallels are short.
    pub const POLAR: (f64, f64, f64, f64) = (85.0, 89.0, 60.0, 70.0);

    /// Invalid region (down above up).
    pub const INVERTED: (f64, f64, f64, f64) = (10.0, 5.0, 0.0, 1.0);
}

/// Small grid definitions as `(height, width, step_degrees, lon_base)`.
pub mod grid {
    /// Default global 0.25 degree grid.
    pub const GLOBAL_0P25: (usize, usize, f64, f64) = (720, 1440, 0.25, 20.125);

    /// 1 degree cells covering -10..10 latitude, 0..20 longitude.
    pub const SMALL_1DEG: (usize, usize, f64, f64) = (20, 20, 1.0, 0.5);
}

/// Time axis settings.
pub mod time {
    /// Legacy `stime` string of the first sample in the reference dataset.
    pub const FIRST_STIME: &str = "b'2022-07-10 00'";

    /// Three-hourly sampling.
    pub const STEP_3H_SECONDS: i64 = 3 * 3600;

    /// Daily sampling.
    pub const STEP_DAY_SECONDS: i64 = 86_400;
}

/// Names of optional sample datasets.
pub mod datasets {
    /// Three-hourly PWV/U/V sample in `[lon, lat, time]` layout.
    pub const BALANCE_SAMPLE: &str = "balance_sample.nc";
}
