//! Error types for regional mass-balance computations.

use thiserror::Error;

/// Result type alias using BalanceError.
pub type BalanceResult<T> = Result<T, BalanceError>;

/// Primary error type for balance operations.
///
/// Every variant is fatal for the call that produced it; nothing here is
/// retried or downgraded to a default value.
#[derive(Debug, Error)]
pub enum BalanceError {
    // === Shape / geometry errors ===
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    // === Parameter errors ===
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Data errors ===
    #[error("Data source error: {0}")]
    DataSource(String),

    // === Control flow ===
    #[error("Computation cancelled after {completed} of {total} time steps")]
    Cancelled { completed: usize, total: usize },
}

impl BalanceError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Create an InvalidRegion error.
    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    /// Create an InvalidMode error.
    pub fn invalid_mode(msg: impl Into<String>) -> Self {
        Self::InvalidMode(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a DataSource error.
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            BalanceError::ShapeMismatch { .. } => "ShapeMismatch",
            BalanceError::InvalidRegion(_) => "InvalidRegion",
            BalanceError::InvalidMode(_) => "InvalidMode",
            BalanceError::InvalidConfig(_) => "InvalidConfig",
            BalanceError::InvalidTime(_) => "InvalidTime",
            BalanceError::DataSource(_) => "DataSourceError",
            BalanceError::Cancelled { .. } => "Cancelled",
        }
    }
}

impl From<std::io::Error> for BalanceError {
    fn from(err: std::io::Error) -> Self {
        BalanceError::DataSource(err.to_string())
    }
}

impl From<serde_json::Error> for BalanceError {
    fn from(err: serde_json::Error) -> Self {
        BalanceError::InvalidConfig(format!("JSON error: {}", err))
    }
}
