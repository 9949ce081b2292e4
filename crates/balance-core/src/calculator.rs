//! High-level entry point: region in, labelled balance series out.

use balance_common::{BalanceError, BalanceResult, DateRange, Grid, Region};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::BalanceConfig;
use crate::geometry::RegionData;
use crate::series::{BalanceReport, BalanceSeries, BalanceSeriesBuilder};
use crate::source::DataSource;

/// Balance series of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionBalance {
    pub region: Region,
    pub series: BalanceSeries,
}

/// Computes region balances against a data source using one configuration.
#[derive(Debug, Clone)]
pub struct BalanceCalculator {
    config: BalanceConfig,
    cancel: CancelToken,
}

impl BalanceCalculator {
    pub fn new(config: BalanceConfig) -> BalanceResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Token that cancels builds started by this calculator.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// The grid to resolve regions on: the source's own axes when it has
    /// them, otherwise the configured grid.
    pub fn grid_for<S: DataSource + ?Sized>(&self, source: &S) -> BalanceResult<Grid> {
        let grid = match source.grid() {
            Some(grid) => grid,
            None => Grid::build(&self.config.grid)?,
        };

        if grid.shape() != source.grid_shape() {
            return Err(BalanceError::shape_mismatch(
                "configured grid vs data source",
                source.grid_shape(),
                grid.shape(),
            ));
        }
        Ok(grid)
    }

    /// Resolve `region` against the source's grid.
    pub fn region_data<S: DataSource + ?Sized>(
        &self,
        region: Region,
        source: &S,
    ) -> BalanceResult<RegionData> {
        let grid = self.grid_for(source)?;
        RegionData::new(region, &grid, &self.config.grid)
    }

    /// Balance series of `region` over `range`, or over the whole time axis
    /// when `range` is `None`.
    pub fn region_balance<S: DataSource + ?Sized>(
        &self,
        region: Region,
        source: &S,
        range: Option<&DateRange>,
    ) -> BalanceResult<RegionBalance> {
        let report = self.region_report(region, source, range)?;
        Ok(RegionBalance {
            region,
            series: report.series,
        })
    }

    /// Full diagnostic report of `region` over `range`.
    pub fn region_report<S: DataSource + ?Sized>(
        &self,
        region: Region,
        source: &S,
        range: Option<&DateRange>,
    ) -> BalanceResult<BalanceReport> {
        let data = self.region_data(region, source)?;
        let full;
        let range = match range {
            Some(range) => range,
            None => {
                full = DateRange::full(source.time_axis());
                &full
            }
        };

        debug!(region = %region, id = ?data.id, "Computing region balance");
        self.builder().build_report(&data, source, range)
    }

    fn builder(&self) -> BalanceSeriesBuilder {
        BalanceSeriesBuilder::from_config(&self.config).with_cancel_token(self.cancel.clone())
    }
}
