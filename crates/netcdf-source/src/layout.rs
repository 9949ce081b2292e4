//! File layout helpers that do not need the NetCDF library.
//!
//! Variables are stored `[lon, lat, time]`. A snapshot read at one time index
//! therefore arrives column-major with respect to the `[lat, lon]` maps used
//! by the balance engine, and edge reads map onto contiguous hyperslabs.

use std::ops::Range;

use balance_common::{parse_stime, CfTimeUnits, Id, TimeAxis};
use chrono::{DateTime, Utc};

use crate::error::{NetCdfError, NetCdfResult};

/// Raw contents of a dataset's time variable.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTime {
    /// Timestamp labels such as `b'2022-07-10 03'`.
    Labels(Vec<String>),
    /// Numeric offsets with CF units, e.g. `hours since 1900-01-01`.
    Offsets { values: Vec<f64>, units: String },
}

impl RawTime {
    pub fn len(&self) -> usize {
        match self {
            RawTime::Labels(labels) => labels.len(),
            RawTime::Offsets { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode and validate a time variable.
pub fn decode_time_axis(raw: RawTime) -> NetCdfResult<TimeAxis> {
    let times: Vec<DateTime<Utc>> = match raw {
        RawTime::Labels(labels) => labels
            .iter()
            .map(|label| parse_stime(label))
            .collect::<Result<_, _>>()?,
        RawTime::Offsets { values, units } => {
            let units = CfTimeUnits::parse(&units)?;
            if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                return Err(NetCdfError::InvalidFormat(format!(
                    "non-finite time offset {}",
                    bad
                )));
            }
            values
                .iter()
                .map(|&v| units.to_datetime(v))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(TimeAxis::new(times)?)
}

/// Dimension lengths of a `[lon, lat, time]` variable as (height, width, steps).
pub fn map_dimensions(name: &str, dims: &[usize]) -> NetCdfResult<(usize, usize, usize)> {
    match dims {
        [lon, lat, time] => Ok((*lat, *lon, *time)),
        _ => Err(NetCdfError::InvalidFormat(format!(
            "variable '{}' has {} dimensions, expected [lon, lat, time]",
            name,
            dims.len()
        ))),
    }
}

/// Row indices of an id's vertical edges as one range.
pub fn row_range(id: &Id) -> Range<usize> {
    id.first_row()..id.last_row() + 1
}

/// Column indices of an id's horizontal edges as contiguous ranges.
///
/// A region that wraps past the last column yields two ranges, read in order.
pub fn column_segments(id: &Id, width: usize) -> Vec<Range<usize>> {
    if id.left <= id.right {
        vec![id.left..id.right + 1]
    } else {
        vec![id.left..width, 0..id.right + 1]
    }
}
