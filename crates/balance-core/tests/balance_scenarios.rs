//! End-to-end balance scenarios on synthetic fields.
//!
//! A 1 degree global grid keeps the in-memory sources small while
//! exercising the same code paths as the 0.25 degree default.

use std::sync::atomic::{AtomicUsize, Ordering};

use balance_common::{BalanceError, BalanceResult, DateRange, Grid, GridConfig, Region, TimeAxis};
use balance_core::{
    BalanceSeriesBuilder, CancelToken, DataSource, Execution, Field2D, FluxMode, MemorySource,
    Quantity, RegionData,
};
use chrono::{TimeZone, Utc};
use test_utils::{
    assert_rel_eq, create_constant_grid, create_grid_with_nans, create_linear_growth_grid,
    create_meridional_wind_grid, create_noise_grid, create_zonal_wind_grid, region, time,
};

const HEIGHT: usize = 180;
const WIDTH: usize = 360;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn one_degree_config() -> GridConfig {
    GridConfig {
        width: WIDTH,
        height: HEIGHT,
        step_degrees: 1.0,
        lon_base: 0.5,
        ..GridConfig::default()
    }
}

fn axis(steps: usize) -> TimeAxis {
    let start = Utc.with_ymd_and_hms(2022, 7, 10, 0, 0, 0).unwrap();
    TimeAxis::regular(start, time::STEP_3H_SECONDS, steps).unwrap()
}

fn region_data(bounds: (f64, f64, f64, f64)) -> RegionData {
    let config = one_degree_config();
    let grid = Grid::build(&config).unwrap();
    let (down, up, left, right) = bounds;
    RegionData::new(Region::new(down, up, left, right), &grid, &config).unwrap()
}

fn field(data: Vec<f64>) -> Field2D {
    Field2D::new(data, HEIGHT, WIDTH).unwrap()
}

fn source_with(
    steps: usize,
    target: impl Fn(usize) -> Vec<f64>,
    u: impl Fn(usize) -> Vec<f64>,
    v: impl Fn(usize) -> Vec<f64>,
) -> MemorySource {
    let build = |f: &dyn Fn(usize) -> Vec<f64>| -> Vec<Field2D> {
        (0..steps).map(|t| field(f(t))).collect()
    };
    MemorySource::new((HEIGHT, WIDTH), axis(steps))
        .with_quantity(Quantity::Target, build(&target))
        .unwrap()
        .with_quantity(Quantity::U, build(&u))
        .unwrap()
        .with_quantity(Quantity::V, build(&v))
        .unwrap()
}

fn still_air(_: usize) -> Vec<f64> {
    create_constant_grid(HEIGHT, WIDTH, 0.0)
}

#[test]
fn test_uniform_field_zero_velocity() {
    init_tracing();
    let concentration = 3.5;
    let data = region_data(region::EQUATOR_2X2);
    let source = source_with(
        4,
        |_| create_constant_grid(HEIGHT, WIDTH, concentration),
        still_air,
        still_air,
    );
    let range = DateRange::full(source.time_axis());

    let report = BalanceSeriesBuilder::new()
        .build_report(&data, &source, &range)
        .unwrap();

    for mass in &report.masses {
        assert_rel_eq!(*mass, concentration * data.areas.total(), 1e-12);
    }
    assert_eq!(report.series.values(), &[0.0, 0.0, 0.0]);
}

#[test]
fn test_linear_growth_zero_velocity() {
    let delta = 0.25;
    let data = region_data(region::SIBERIA);
    let source = source_with(
        5,
        |t| create_linear_growth_grid(HEIGHT, WIDTH, 1.0, delta, t),
        still_air,
        still_air,
    );
    let range = DateRange::full(source.time_axis());

    let report = BalanceSeriesBuilder::new()
        .build_report(&data, &source, &range)
        .unwrap();

    assert_eq!(report.diff_sums.len(), 4);
    for (diff, balance) in report.diff_sums.iter().zip(report.series.values()) {
        assert_rel_eq!(*diff, delta * data.areas.total(), 1e-9);
        assert_eq!(balance, diff);
    }
}

#[test]
fn test_uniform_wind_is_conserved() {
    // Constant concentration carried by a uniform eastward wind: what enters
    // through the left edge leaves through the right edge.
    let data = region_data(region::SIBERIA);
    let source = source_with(
        3,
        |_| create_constant_grid(HEIGHT, WIDTH, 2.0),
        |_| create_constant_grid(HEIGHT, WIDTH, 7.5),
        still_air,
    );
    let range = DateRange::full(source.time_axis());

    let report = BalanceSeriesBuilder::new()
        .with_flux_mode(FluxMode::Separated)
        .build_report(&data, &source, &range)
        .unwrap();

    let rows = data.areas.shape().0 as f64;
    let expected_income = 2.0 * 7.5 * data.cell.left * rows * time::STEP_3H_SECONDS as f64;
    let income = report.income.unwrap();
    let outcome = report.outcome.unwrap();
    assert_rel_eq!(income[0], expected_income, 1e-12);
    assert_eq!(income, outcome);
    assert_eq!(report.series.values(), &[0.0, 0.0]);
}

#[test]
fn test_series_length_matches_range() {
    let data = region_data(region::EQUATOR_2X2);
    let source = source_with(
        8,
        |t| create_linear_growth_grid(HEIGHT, WIDTH, 1.0, 0.1, t),
        still_air,
        still_air,
    );
    let builder = BalanceSeriesBuilder::new();

    for (start, end) in [(0, 7), (2, 5), (3, 4), (6, 6)] {
        let range = DateRange::from_indices(source.time_axis(), start, end).unwrap();
        let series = builder.build(&data, &source, &range).unwrap();
        assert_eq!(series.len(), end - start);
    }
}

#[test]
fn test_build_is_idempotent() {
    let data = region_data(region::SIBERIA);
    let source = source_with(
        4,
        |t| create_noise_grid(HEIGHT, WIDTH, t as u32, 1.0, 0.5),
        |t| create_noise_grid(HEIGHT, WIDTH, 100 + t as u32, -10.0, 20.0),
        |t| create_noise_grid(HEIGHT, WIDTH, 200 + t as u32, -10.0, 20.0),
    );
    let range = DateRange::full(source.time_axis());
    let builder = BalanceSeriesBuilder::new();

    let first = builder.build(&data, &source, &range).unwrap();
    let second = builder.build(&data, &source, &range).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_matches_sequential() {
    let data = region_data(region::POLAR);
    let source = source_with(
        6,
        |t| create_noise_grid(HEIGHT, WIDTH, t as u32, 1.0, 0.5),
        |t| create_noise_grid(HEIGHT, WIDTH, 100 + t as u32, -10.0, 20.0),
        |t| create_noise_grid(HEIGHT, WIDTH, 200 + t as u32, -10.0, 20.0),
    );
    let range = DateRange::full(source.time_axis());

    let sequential = BalanceSeriesBuilder::new()
        .with_flux_mode(FluxMode::Separated)
        .build_report(&data, &source, &range)
        .unwrap();
    let parallel = BalanceSeriesBuilder::new()
        .with_flux_mode(FluxMode::Separated)
        .with_execution(Execution::Parallel)
        .build_report(&data, &source, &range)
        .unwrap();

    assert_eq!(sequential, parallel);
}

#[test]
fn test_income_and_outcome_partition_boundary() {
    let data = region_data(region::SIBERIA);
    let source = source_with(
        4,
        |t| create_noise_grid(HEIGHT, WIDTH, t as u32, 1.0, 0.5),
        |t| create_noise_grid(HEIGHT, WIDTH, 300 + t as u32, -5.0, 10.0),
        |t| create_noise_grid(HEIGHT, WIDTH, 400 + t as u32, -5.0, 10.0),
    );
    let range = DateRange::full(source.time_axis());

    let report = BalanceSeriesBuilder::new()
        .build_report(&data, &source, &range)
        .unwrap();

    assert_eq!(report.cell_counts.len(), 3);
    for (income_cells, outcome_cells) in &report.cell_counts {
        assert_eq!(income_cells + outcome_cells, data.boundary_cell_count());
        assert!(*income_cells > 0);
        assert!(*outcome_cells > 0);
    }
    assert!(report.income.is_none());
}

/// Sum of `|values|` along one row of a map, over the region's columns.
fn row_magnitude(values: &[f64], data: &RegionData, row: usize) -> f64 {
    data.id
        .columns(WIDTH)
        .map(|c| values[row * WIDTH + c].abs())
        .sum()
}

#[test]
fn test_meridional_wind_enters_through_lower_or_upper_edge() {
    // Columns 184..=189 all sit east of the V sign change at column 180
    let data = region_data((0.5, 2.5, -175.5, -170.5));
    let seconds = time::STEP_3H_SECONDS as f64;

    for speed in [12.0, -12.0] {
        let v = create_meridional_wind_grid(HEIGHT, WIDTH, speed);
        let source = source_with(
            3,
            |_| create_constant_grid(HEIGHT, WIDTH, 1.0),
            still_air,
            |_| v.clone(),
        );
        let range = DateRange::full(source.time_axis());
        let report = BalanceSeriesBuilder::new()
            .with_flux_mode(FluxMode::Separated)
            .build_report(&data, &source, &range)
            .unwrap();

        let through_down = row_magnitude(&v, &data, data.id.down) * data.cell.down * seconds;
        let through_up = row_magnitude(&v, &data, data.id.up) * data.cell.up * seconds;
        let income = report.income.unwrap();
        let outcome = report.outcome.unwrap();

        if speed > 0.0 {
            // Northward: in through the down edge, out through the up edge
            assert_rel_eq!(income[0], through_down, 1e-12);
            assert_rel_eq!(outcome[0], through_up, 1e-12);
            assert!(report.series.values().iter().all(|&b| b < 0.0));
        } else {
            assert_rel_eq!(income[0], through_up, 1e-12);
            assert_rel_eq!(outcome[0], through_down, 1e-12);
            assert!(report.series.values().iter().all(|&b| b > 0.0));
        }
        // One edge of income, the other plus the still left/right edges of outcome
        assert_eq!(report.cell_counts, vec![(6, 12); 2]);
    }
}

#[test]
fn test_meridional_wind_changing_sign_across_region() {
    // Columns 170..=190: V < 0 west of column 180, zero at it, V > 0 east of it
    let data = region_data((0.5, 2.5, 170.5, -169.5));
    assert_eq!(data.id.column_count(WIDTH), 21);

    let v = create_meridional_wind_grid(HEIGHT, WIDTH, 12.0);
    let source = source_with(
        3,
        |_| create_constant_grid(HEIGHT, WIDTH, 1.0),
        still_air,
        |_| v.clone(),
    );
    let range = DateRange::full(source.time_axis());
    let report = BalanceSeriesBuilder::new()
        .with_flux_mode(FluxMode::Separated)
        .build_report(&data, &source, &range)
        .unwrap();

    // Down edge takes in the eastern half, up edge the western half
    assert_eq!(report.cell_counts, vec![(20, 28); 2]);

    let income = report.income.unwrap();
    let outcome = report.outcome.unwrap();
    let eastern: f64 = data
        .id
        .columns(WIDTH)
        .filter(|&c| c > 180)
        .map(|c| v[data.id.down * WIDTH + c])
        .sum();
    let expected = eastern * (data.cell.down + data.cell.up) * time::STEP_3H_SECONDS as f64;
    assert_rel_eq!(income[0], expected, 1e-12);
    assert_rel_eq!(income[0], outcome[0], 1e-12);
    for balance in report.series.values() {
        assert!(balance.abs() <= 1e-9 * income[0]);
    }
}

#[test]
fn test_zonal_wind_changing_sign_across_region() {
    // Rows 88..=92: U < 0 north of row 90, zero at it, U > 0 south of it
    let data = region_data((-2.5, 1.5, 10.5, 14.5));
    assert_eq!(data.areas.shape(), (5, 5));

    let source = source_with(
        3,
        |_| create_constant_grid(HEIGHT, WIDTH, 1.0),
        |_| create_zonal_wind_grid(HEIGHT, WIDTH, 20.0),
        still_air,
    );
    let range = DateRange::full(source.time_axis());
    let report = BalanceSeriesBuilder::new()
        .with_flux_mode(FluxMode::Separated)
        .build_report(&data, &source, &range)
        .unwrap();

    // Right edge takes in the two northern rows, left edge the two southern
    assert_eq!(report.cell_counts, vec![(4, 16); 2]);

    let income = report.income.unwrap();
    let outcome = report.outcome.unwrap();
    assert!(income[0] > 0.0);
    assert_rel_eq!(income[0], outcome[0], 1e-12);
}

#[test]
fn test_missing_wind_cell_left_out_of_flux() {
    init_tracing();
    let data = region_data((0.5, 2.5, -175.5, -170.5));
    let hole = (data.id.down, data.id.left);
    let seconds = time::STEP_3H_SECONDS as f64;

    let source = source_with(
        3,
        |_| create_constant_grid(HEIGHT, WIDTH, 1.0),
        still_air,
        |_| create_grid_with_nans(HEIGHT, WIDTH, 3.0, &[hole]),
    );
    let range = DateRange::full(source.time_axis());
    let report = BalanceSeriesBuilder::new()
        .with_flux_mode(FluxMode::Separated)
        .build_report(&data, &source, &range)
        .unwrap();

    for (income_cells, outcome_cells) in &report.cell_counts {
        assert_eq!(*income_cells, 5);
        assert_eq!(income_cells + outcome_cells, data.boundary_cell_count() - 1);
    }

    let income = report.income.unwrap();
    let outcome = report.outcome.unwrap();
    assert_rel_eq!(income[0], 5.0 * 3.0 * data.cell.down * seconds, 1e-12);
    assert_rel_eq!(outcome[0], 6.0 * 3.0 * data.cell.up * seconds, 1e-12);
    assert!(report.series.values().iter().all(|b| b.is_finite()));
}

#[test]
fn test_wrapping_region_balances() {
    // Eastward wind through a region that straddles the first/last column
    let config = one_degree_config();
    let grid = Grid::build(&config).unwrap();
    let data = RegionData::new(Region::new(0.0, 2.0, -2.0, 2.0), &grid, &config).unwrap();
    assert!(data.id.left > data.id.right);

    let source = source_with(
        3,
        |_| create_constant_grid(HEIGHT, WIDTH, 1.0),
        |_| create_constant_grid(HEIGHT, WIDTH, 4.0),
        |_| create_constant_grid(HEIGHT, WIDTH, -1.0),
    );
    let range = DateRange::full(source.time_axis());
    let series = BalanceSeriesBuilder::new().build(&data, &source, &range).unwrap();
    assert_eq!(series.len(), 2);
    assert!(series.values().iter().all(|v| v.is_finite()));
}

/// Source that cancels a token once a given time step has been read.
struct CancellingSource {
    inner: MemorySource,
    token: CancelToken,
    cancel_at: usize,
    reads: AtomicUsize,
}

impl DataSource for CancellingSource {
    fn grid_shape(&self) -> (usize, usize) {
        self.inner.grid_shape()
    }

    fn time_axis(&self) -> &TimeAxis {
        self.inner.time_axis()
    }

    fn map_at(&self, quantity: Quantity, time_index: usize) -> BalanceResult<Field2D> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if quantity == Quantity::Target && time_index == self.cancel_at {
            self.token.cancel();
        }
        self.inner.map_at(quantity, time_index)
    }
}

#[test]
fn test_cancel_between_time_steps() {
    init_tracing();
    let data = region_data(region::EQUATOR_2X2);
    let token = CancelToken::new();
    let source = CancellingSource {
        inner: source_with(
            6,
            |_| create_constant_grid(HEIGHT, WIDTH, 1.0),
            still_air,
            still_air,
        ),
        token: token.clone(),
        cancel_at: 2,
        reads: AtomicUsize::new(0),
    };
    let range = DateRange::full(source.time_axis());

    let err = BalanceSeriesBuilder::new()
        .with_cancel_token(token)
        .build(&data, &source, &range)
        .unwrap_err();

    // Step 2 finishes, the loop stops before step 3
    assert!(matches!(
        err,
        BalanceError::Cancelled {
            completed: 3,
            total: 6
        }
    ));
    // Mass snapshot plus target/U/V boundaries for each completed step
    assert_eq!(source.reads.load(Ordering::SeqCst), 12);
}

#[test]
fn test_mismatched_source_shape_rejected() {
    let data = region_data(region::EQUATOR_2X2);
    let source = MemorySource::new((10, 10), axis(3))
        .with_generated(Quantity::Target, |_, _, _| 1.0)
        .unwrap();
    let range = DateRange::full(source.time_axis());

    let err = BalanceSeriesBuilder::new()
        .build(&data, &source, &range)
        .unwrap_err();
    assert_eq!(err.code(), "ShapeMismatch");
}

#[test]
fn test_missing_wind_variable_propagates() {
    let data = region_data(region::EQUATOR_2X2);
    let source = MemorySource::new((HEIGHT, WIDTH), axis(3))
        .with_quantity(
            Quantity::Target,
            (0..3).map(|_| Field2D::filled(HEIGHT, WIDTH, 1.0)).collect(),
        )
        .unwrap();
    let range = DateRange::full(source.time_axis());

    let err = BalanceSeriesBuilder::new()
        .build(&data, &source, &range)
        .unwrap_err();
    assert_eq!(err.code(), "DataSourceError");
}
