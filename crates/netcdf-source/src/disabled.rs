//! Stand-in used when the crate is built without the `native` feature.

use std::path::Path;

use balance_common::{BalanceResult, Id, TimeAxis};
use balance_core::{DataSource, EdgeArrays, Field2D, Quantity, VariableNames};
use tracing::warn;

use crate::error::{NetCdfError, NetCdfResult};

/// A NetCDF data source. Without the `native` feature it cannot be opened.
#[derive(Debug)]
pub enum NetCdfSource {}

impl NetCdfSource {
    /// Always fails with [`NetCdfError::FeatureDisabled`].
    pub fn open(path: impl AsRef<Path>, names: &VariableNames) -> NetCdfResult<Self> {
        warn!(
            path = %path.as_ref().display(),
            target_variable = %names.target,
            "NetCDF support not compiled in"
        );
        Err(NetCdfError::FeatureDisabled)
    }

    pub fn path(&self) -> &Path {
        match *self {}
    }
}

impl DataSource for NetCdfSource {
    fn grid_shape(&self) -> (usize, usize) {
        match *self {}
    }

    fn time_axis(&self) -> &TimeAxis {
        match *self {}
    }

    fn map_at(&self, _quantity: Quantity, _time_index: usize) -> BalanceResult<Field2D> {
        match *self {}
    }

    fn boundary_at(&self, _quantity: Quantity, _time_index: usize, _id: &Id) -> BalanceResult<EdgeArrays> {
        match *self {}
    }
}

/// No-op without the `native` feature.
pub fn silence_hdf5_errors() {}
