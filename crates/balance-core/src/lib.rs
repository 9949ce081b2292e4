//! Regional mass balance over gridded concentration and wind fields.
//!
//! The balance of a region at each time step is the change in the
//! substance mass it holds minus the net flux through its boundary. For data
//! that conserves mass it stays near zero; residuals point at sources,
//! sinks or data error.
//!
//! # Architecture
//!
//! ```text
//! Region ──► RegionData::new (snap to grid, edge lengths, area matrix)
//!                 │
//!                 ▼
//! BalanceSeriesBuilder::build(region_data, source, range)
//!      │
//!      ├─► for every time step: integrate(map_at(Target, t))   ─► masses
//!      │
//!      ├─► for every interval start: flux(boundary_at(.., t))  ─► convs
//!      │
//!      └─► diff(masses) − convs ─► BalanceSeries
//! ```
//!
//! # Example
//!
//! ```ignore
//! use balance_core::{BalanceCalculator, BalanceConfig};
//! use balance_common::Region;
//!
//! let calculator = BalanceCalculator::new(BalanceConfig::default())?;
//! let result = calculator.region_balance(Region::new(55.0, 65.0, 130.0, 140.0), &source, None)?;
//! for row in result.series.rows() {
//!     println!("{} {}", row.time, row.balance);
//! }
//! ```

pub mod calculator;
pub mod cancel;
pub mod config;
pub mod field;
pub mod flux;
pub mod geometry;
pub mod mass;
pub mod series;
pub mod source;

pub use calculator::{BalanceCalculator, RegionBalance};
pub use cancel::CancelToken;
pub use config::{BalanceConfig, Execution, FluxMode, VariableNames};
pub use field::Field2D;
pub use flux::{flux, flux_value, BoundaryArrays, EdgeArrays, FluxBreakdown, FluxValue};
pub use geometry::{AreaMatrix, Cell, RegionData};
pub use mass::integrate;
pub use series::{BalanceReport, BalanceRow, BalanceSeries, BalanceSeriesBuilder};
pub use source::{boundary_arrays, DataSource, MemorySource, Quantity};
