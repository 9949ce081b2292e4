//! Balance time series assembly.
//!
//! For a date range with `N` time samples the builder integrates the mass at
//! every sample, differences consecutive masses (`N − 1` values), computes
//! the net boundary flux at the start of every interval (`N − 1` values) and
//! subtracts the two.

use std::sync::atomic::{AtomicUsize, Ordering};

use balance_common::{BalanceError, BalanceResult, DateRange};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::{BalanceConfig, Execution, FluxMode};
use crate::flux::{flux, FluxBreakdown};
use crate::geometry::RegionData;
use crate::mass::integrate;
use crate::source::{boundary_arrays, DataSource, Quantity};

/// One row of a balance series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    /// Start of the interval.
    pub time: DateTime<Utc>,
    /// Mass change minus net boundary flux over the interval.
    pub balance: f64,
}

/// Balance values labelled with the start time of their interval.
///
/// Serializes as a list of `{time, balance}` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<BalanceRow>", from = "Vec<BalanceRow>")]
pub struct BalanceSeries {
    times: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl BalanceSeries {
    pub fn new(times: Vec<DateTime<Utc>>, values: Vec<f64>) -> BalanceResult<Self> {
        if times.len() != values.len() {
            return Err(BalanceError::shape_mismatch(
                "balance series times vs values",
                values.len(),
                times.len(),
            ));
        }
        Ok(Self { times, values })
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = BalanceRow> + '_ {
        self.times
            .iter()
            .zip(&self.values)
            .map(|(&time, &balance)| BalanceRow { time, balance })
    }
}

impl From<BalanceSeries> for Vec<BalanceRow> {
    fn from(series: BalanceSeries) -> Self {
        series.rows().collect()
    }
}

impl From<Vec<BalanceRow>> for BalanceSeries {
    fn from(rows: Vec<BalanceRow>) -> Self {
        let (times, values) = rows.into_iter().map(|r| (r.time, r.balance)).unzip();
        Self { times, values }
    }
}

/// Every intermediate series of a balance computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Time samples covered, `N` values.
    pub times: Vec<DateTime<Utc>>,
    /// Region mass at every sample, `N` values.
    pub masses: Vec<f64>,
    /// `masses[i + 1] − masses[i]`, `N − 1` values.
    pub diff_sums: Vec<f64>,
    /// Net boundary flux per interval, `N − 1` values.
    pub convs: Vec<f64>,
    /// Income per interval; only in separated mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<Vec<f64>>,
    /// Outcome per interval; only in separated mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Vec<f64>>,
    /// Boundary cells classified as income/outcome per interval.
    pub cell_counts: Vec<(usize, usize)>,
    pub series: BalanceSeries,
}

/// Result of one time step.
#[derive(Debug, Clone, Copy, Default)]
struct StepSample {
    mass: f64,
    flux: Option<FluxBreakdown>,
}

/// Builds balance series for a region over a date range.
#[derive(Debug, Clone, Default)]
pub struct BalanceSeriesBuilder {
    execution: Execution,
    flux_mode: FluxMode,
    cancel: CancelToken,
}

impl BalanceSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BalanceConfig) -> Self {
        Self {
            execution: config.execution,
            flux_mode: config.flux_mode,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_flux_mode(mut self, flux_mode: FluxMode) -> Self {
        self.flux_mode = flux_mode;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Balance series of `region` over `range`.
    pub fn build<S: DataSource + ?Sized>(
        &self,
        region: &RegionData,
        source: &S,
        range: &DateRange,
    ) -> BalanceResult<BalanceSeries> {
        self.build_report(region, source, range).map(|report| report.series)
    }

    /// Balance series together with every intermediate series.
    pub fn build_report<S: DataSource + ?Sized>(
        &self,
        region: &RegionData,
        source: &S,
        range: &DateRange,
    ) -> BalanceResult<BalanceReport> {
        check_inputs(region, source, range)?;

        let seconds = range.seconds as f64;
        let samples = self.run_steps(range, |t| {
            let snapshot = source.map_at(Quantity::Target, t)?;
            let mass = integrate(&snapshot, region)?;
            let flux = if t < range.end_id {
                let boundary = boundary_arrays(source, t, &region.id)?;
                Some(flux(&boundary, &region.cell, seconds)?)
            } else {
                None
            };
            Ok(StepSample { mass, flux })
        })?;

        let masses: Vec<f64> = samples.iter().map(|s| s.mass).collect();
        let diff_sums: Vec<f64> = masses.windows(2).map(|w| w[1] - w[0]).collect();
        let fluxes: Vec<FluxBreakdown> = samples.iter().filter_map(|s| s.flux).collect();
        let convs: Vec<f64> = fluxes.iter().map(FluxBreakdown::net).collect();

        if diff_sums.len() != convs.len() {
            return Err(BalanceError::shape_mismatch(
                "mass differences vs boundary flux",
                diff_sums.len(),
                convs.len(),
            ));
        }

        let balance: Vec<f64> = diff_sums.iter().zip(&convs).map(|(d, c)| d - c).collect();
        let series = BalanceSeries::new(range.interval_starts().to_vec(), balance)?;

        let (income, outcome) = match self.flux_mode {
            FluxMode::Total => (None, None),
            FluxMode::Separated => (
                Some(fluxes.iter().map(|f| f.income).collect()),
                Some(fluxes.iter().map(|f| f.outcome).collect()),
            ),
        };

        info!(
            region = %region.region,
            start = %range.start,
            end = %range.end,
            intervals = series.len(),
            execution = %self.execution,
            "Built balance series"
        );

        Ok(BalanceReport {
            times: range.times.clone(),
            masses,
            diff_sums,
            convs,
            income,
            outcome,
            cell_counts: fluxes.iter().map(|f| (f.income_cells, f.outcome_cells)).collect(),
            series,
        })
    }

    /// Run `step` for every time index in the range, in order of index.
    fn run_steps<F>(&self, range: &DateRange, step: F) -> BalanceResult<Vec<StepSample>>
    where
        F: Fn(usize) -> BalanceResult<StepSample> + Sync,
    {
        let total = range.timesize();
        let cancelled = |completed: usize| {
            warn!(completed, total, "Balance series build cancelled");
            BalanceError::Cancelled { completed, total }
        };

        match self.execution {
            Execution::Sequential => {
                let mut samples = Vec::with_capacity(total);
                for t in range.start_id..=range.end_id {
                    if self.cancel.is_cancelled() {
                        return Err(cancelled(samples.len()));
                    }
                    samples.push(step(t)?);
                }
                Ok(samples)
            }
            Execution::Parallel => {
                let completed = AtomicUsize::new(0);
                let mut samples = vec![StepSample::default(); total];
                samples
                    .par_iter_mut()
                    .enumerate()
                    .try_for_each(|(offset, slot)| {
                        if self.cancel.is_cancelled() {
                            return Err(cancelled(completed.load(Ordering::SeqCst)));
                        }
                        *slot = step(range.start_id + offset)?;
                        completed.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })?;
                debug!(steps = total, "Parallel time-step loop finished");
                Ok(samples)
            }
        }
    }
}

fn check_inputs<S: DataSource + ?Sized>(
    region: &RegionData,
    source: &S,
    range: &DateRange,
) -> BalanceResult<()> {
    if source.grid_shape() != region.map_shape {
        return Err(BalanceError::shape_mismatch(
            "data source grid",
            region.map_shape,
            source.grid_shape(),
        ));
    }

    let axis_len = source.time_axis().len();
    if range.end_id >= axis_len {
        return Err(BalanceError::InvalidTime(format!(
            "range ends at index {} but the source has {} time steps",
            range.end_id, axis_len
        )));
    }

    if range.seconds != source.seconds_per_step() {
        return Err(BalanceError::InvalidTime(format!(
            "range step of {}s does not match the source step of {}s",
            range.seconds,
            source.seconds_per_step()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_common::{Grid, GridConfig, Region, TimeAxis};
    use chrono::TimeZone;

    use crate::source::MemorySource;

    fn setup(steps: usize) -> (RegionData, MemorySource, DateRange) {
        let config = GridConfig {
            width: 12,
            height: 10,
            step_degrees: 1.0,
            lon_base: 0.5,
            ..GridConfig::default()
        };
        let grid = Grid::build(&config).unwrap();
        let region = RegionData::new(Region::new(-1.5, 1.5, 3.5, 6.5), &grid, &config).unwrap();

        let start = Utc.with_ymd_and_hms(2022, 7, 10, 0, 0, 0).unwrap();
        let axis = TimeAxis::regular(start, 3600, steps).unwrap();
        let range = DateRange::full(&axis);
        let source = MemorySource::new((10, 12), axis)
            .with_generated(Quantity::Target, |t, _, _| 1.0 + t as f64)
            .unwrap()
            .with_generated(Quantity::U, |_, _, _| 0.0)
            .unwrap()
            .with_generated(Quantity::V, |_, _, _| 0.0)
            .unwrap();
        (region, source, range)
    }

    #[test]
    fn test_series_length_and_times() {
        let (region, source, range) = setup(5);
        let series = BalanceSeriesBuilder::new().build(&region, &source, &range).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.times(), range.interval_starts());
    }

    #[test]
    fn test_report_in_separated_mode() {
        let (region, source, range) = setup(3);
        let report = BalanceSeriesBuilder::new()
            .with_flux_mode(FluxMode::Separated)
            .build_report(&region, &source, &range)
            .unwrap();
        assert_eq!(report.masses.len(), 3);
        assert_eq!(report.diff_sums.len(), 2);
        assert_eq!(report.convs, vec![0.0, 0.0]);
        assert_eq!(report.income, Some(vec![0.0, 0.0]));
        assert_eq!(report.cell_counts.len(), 2);
        assert_eq!(report.cell_counts[0].1, region.boundary_cell_count());
    }

    #[test]
    fn test_single_sample_range_is_empty() {
        let (region, source, _) = setup(3);
        let range = DateRange::from_indices(source.time_axis(), 1, 1).unwrap();
        let series = BalanceSeriesBuilder::new().build(&region, &source, &range).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_cancelled_before_start() {
        let (region, source, range) = setup(4);
        let builder = BalanceSeriesBuilder::new();
        builder.cancel_token().cancel();
        let err = builder.build(&region, &source, &range).unwrap_err();
        assert!(matches!(err, BalanceError::Cancelled { completed: 0, total: 4 }));
    }

    #[test]
    fn test_range_beyond_source_rejected() {
        let (region, source, _) = setup(3);
        let longer = TimeAxis::regular(source.time_axis().times()[0], 3600, 6).unwrap();
        let range = DateRange::full(&longer);
        let err = BalanceSeriesBuilder::new().build(&region, &source, &range).unwrap_err();
        assert_eq!(err.code(), "InvalidTime");
    }

    #[test]
    fn test_series_rows_serialize() {
        let t0 = Utc.with_ymd_and_hms(2022, 7, 10, 0, 0, 0).unwrap();
        let series = BalanceSeries::new(vec![t0], vec![1.5]).unwrap();
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json[0]["balance"], 1.5);
        assert_eq!(json[0]["time"], "2022-07-10T00:00:00Z");

        let back: BalanceSeries = serde_json::from_value(json).unwrap();
        assert_eq!(back, series);

        assert!(BalanceSeries::new(vec![t0], vec![]).is_err());
    }
}
