//! Common types for regional mass-balance computations.
//!
//! This crate holds the pieces shared by every part of the workspace:
//! the global grid model, region and index types, nearest-grid-point
//! resolution, time axes, and the error type.

pub mod error;
pub mod grid;
pub mod region;
pub mod resolve;
pub mod time;

pub use error::{BalanceError, BalanceResult};
pub use grid::{grids, Grid, GridConfig, LatitudeOrigin};
pub use region::{Id, Region};
pub use resolve::{nearest_index, nearest_value, resolve_grid_region, resolve_id};
pub use time::{parse_stime, CfTimeUnits, DateRange, TimeAxis};
