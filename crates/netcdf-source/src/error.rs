//! Error types for NetCDF-backed data sources.

use balance_common::BalanceError;
use thiserror::Error;

/// Result type for NetCDF source operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for reading balance inputs from NetCDF files.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required variable or dimension
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Built without the `native` feature
    #[error("NetCDF support not enabled (build with the `native` feature)")]
    FeatureDisabled,

    /// Error from the balance value types (time axis, grid axes, field shapes)
    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// NetCDF library error
    #[cfg(feature = "native")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}

impl From<NetCdfError> for BalanceError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::Balance(inner) => inner,
            other => BalanceError::DataSource(other.to_string()),
        }
    }
}
