//! Fixed global latitude/longitude grid definitions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BalanceError, BalanceResult};

/// Row ordering of the latitude axis.
///
/// With `Top`, row 0 holds the northernmost latitude (image convention), so the
/// index of a region's upper bound is smaller than the index of its lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatitudeOrigin {
    /// Row 0 is the northernmost latitude.
    #[default]
    Top,
    /// Row 0 is the southernmost latitude.
    Bottom,
}

impl LatitudeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl FromStr for LatitudeOrigin {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" | "top0" | "north" => Ok(Self::Top),
            "bottom" | "btm0" | "south" => Ok(Self::Bottom),
            other => Err(BalanceError::invalid_config(format!(
                "unknown latitude origin '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LatitudeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters of the discretized global grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of longitude steps.
    pub width: usize,
    /// Number of latitude steps.
    pub height: usize,
    /// Cell side in degrees.
    pub step_degrees: f64,
    /// Longitude of column 0.
    pub lon_base: f64,
    /// Latitude row ordering.
    pub latitude_origin: LatitudeOrigin,
    /// Length of one degree of latitude in meters.
    pub degree_length_m: f64,
    /// Extra columns added to resolved longitude indices (legacy datasets use 1).
    pub lon_index_offset: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 720,
            step_degrees: 0.25,
            lon_base: 20.125,
            latitude_origin: LatitudeOrigin::Top,
            degree_length_m: 111_000.0,
            lon_index_offset: 0,
        }
    }
}

impl GridConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> BalanceResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BalanceError::invalid_config(format!(
                "grid dimensions must be > 0, got {}x{}",
                self.width, self.height
            )));
        }

        if !(self.step_degrees.is_finite() && self.step_degrees > 0.0) {
            return Err(BalanceError::invalid_config(format!(
                "step_degrees must be > 0, got {}",
                self.step_degrees
            )));
        }

        if !(self.degree_length_m.is_finite() && self.degree_length_m > 0.0) {
            return Err(BalanceError::invalid_config(format!(
                "degree_length_m must be > 0, got {}",
                self.degree_length_m
            )));
        }

        if !self.lon_base.is_finite() {
            return Err(BalanceError::invalid_config("lon_base must be finite"));
        }

        if self.lon_index_offset >= self.width {
            return Err(BalanceError::invalid_config(format!(
                "lon_index_offset {} must be smaller than the grid width {}",
                self.lon_index_offset, self.width
            )));
        }

        Ok(())
    }

    /// Number of grid cells per degree.
    pub fn cells_per_degree(&self) -> f64 {
        1.0 / self.step_degrees
    }

    /// Length in meters of one grid step along a meridian.
    pub fn cell_length_m(&self) -> f64 {
        self.degree_length_m / self.cells_per_degree()
    }

    /// Shape of a full map snapshot as (rows, columns).
    pub fn map_shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// First column whose longitude wraps to the negative side of the antimeridian.
    pub fn lon_split_index(&self) -> usize {
        let steps_to_antimeridian = ((180.0 - self.lon_base) / self.step_degrees).ceil();
        steps_to_antimeridian.clamp(0.0, self.width as f64) as usize
    }
}

/// The fixed discretized grid: latitude and longitude of every row and column.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    lat: Vec<f64>,
    lon: Vec<f64>,
    step: f64,
    origin: LatitudeOrigin,
}

impl Grid {
    /// Generate the grid described by `config`.
    pub fn build(config: &GridConfig) -> BalanceResult<Self> {
        config.validate()?;

        let step = config.step_degrees;
        let split = config.lon_split_index();
        let width = config.width as f64;

        let lon = (0..config.width)
            .map(|x| {
                if x < split {
                    config.lon_base + x as f64 * step
                } else {
                    config.lon_base + (x as f64 - width) * step
                }
            })
            .collect();

        let last = config.height - 1;
        let half_span = last as f64 * step / 2.0;
        let lat = (0..config.height)
            .map(|y| match config.latitude_origin {
                LatitudeOrigin::Top => (last - y) as f64 * step - half_span,
                LatitudeOrigin::Bottom => half_span - (last - y) as f64 * step,
            })
            .collect();

        Ok(Self {
            lat,
            lon,
            step,
            origin: config.latitude_origin,
        })
    }

    /// Build a grid from coordinate axes read from a dataset.
    ///
    /// The step is taken from the first latitude interval and the origin from
    /// the direction of the latitude axis.
    pub fn from_axes(lat: Vec<f64>, lon: Vec<f64>) -> BalanceResult<Self> {
        if lat.len() < 2 || lon.is_empty() {
            return Err(BalanceError::invalid_config(format!(
                "grid axes too short: {} latitudes, {} longitudes",
                lat.len(),
                lon.len()
            )));
        }

        let delta = lat[1] - lat[0];
        if !(delta.is_finite() && delta != 0.0) {
            return Err(BalanceError::invalid_config(format!(
                "latitude axis is not strictly monotonic (first step {})",
                delta
            )));
        }

        let origin = if delta < 0.0 {
            LatitudeOrigin::Top
        } else {
            LatitudeOrigin::Bottom
        };

        Ok(Self {
            lat,
            lon,
            step: delta.abs(),
            origin,
        })
    }

    /// Latitude of every row.
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Longitude of every column.
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.lon.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.lat.len()
    }

    /// Map shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Grid step in degrees.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn origin(&self) -> LatitudeOrigin {
        self.origin
    }
}

/// Common grid definitions.
pub mod grids {
    use super::*;

    /// 0.25° global grid, 1440x720, north row first.
    pub fn global_0p25() -> GridConfig {
        GridConfig::default()
    }

    /// 0.5° global grid starting at 0°E.
    pub fn global_0p50() -> GridConfig {
        GridConfig {
            width: 720,
            height: 360,
            step_degrees: 0.5,
            lon_base: 0.25,
            ..GridConfig::default()
        }
    }
}
