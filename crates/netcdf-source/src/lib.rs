//! NetCDF-backed data source for regional mass-balance series.
//!
//! Datasets store the target concentration and the U/V wind components as
//! `[lon, lat, time]` variables next to a time variable holding either
//! legacy `stime` labels (`b'2022-07-10 03'`) or CF numeric offsets.
//! [`NetCdfSource`] implements [`balance_core::DataSource`] over such a file.
//!
//! Reading needs the system libnetcdf/HDF5 libraries and is only compiled
//! with the `native` feature. Without it [`NetCdfSource::open`] returns
//! [`NetCdfError::FeatureDisabled`].
//!
//! # Example
//!
//! ```ignore
//! use balance_core::{BalanceCalculator, BalanceConfig};
//! use netcdf_source::NetCdfSource;
//!
//! let config = BalanceConfig::from_env()?;
//! let source = NetCdfSource::open("yule_2022.nc", &config.variables)?;
//! let calculator = BalanceCalculator::new(config)?;
//! let report = calculator.region_report(region, &source, None)?;
//! ```

pub mod error;
pub mod layout;

#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::{silence_hdf5_errors, NetCdfSource};

#[cfg(not(feature = "native"))]
mod disabled;
#[cfg(not(feature = "native"))]
pub use disabled::{silence_hdf5_errors, NetCdfSource};

pub use error::{NetCdfError, NetCdfResult};
pub use layout::{column_segments, decode_time_axis, RawTime};
