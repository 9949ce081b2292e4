//! Time axis handling for gridded time series.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BalanceError, BalanceResult};

/// An ordered, uniformly spaced sequence of timestamps.
///
/// Uniformity is checked once at construction and not re-validated per query.
/// Serializes as the plain list of timestamps; deserializing re-runs the
/// same validation as [`TimeAxis::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DateTime<Utc>>", into = "Vec<DateTime<Utc>>")]
pub struct TimeAxis {
    times: Vec<DateTime<Utc>>,
    step_seconds: i64,
}

impl TimeAxis {
    /// Build a time axis, rejecting axes with fewer than 2 samples or
    /// non-uniform spacing.
    pub fn new(times: Vec<DateTime<Utc>>) -> BalanceResult<Self> {
        if times.len() < 2 {
            return Err(BalanceError::data_source(format!(
                "time axis needs at least 2 samples, got {}",
                times.len()
            )));
        }

        let step_seconds = (times[1] - times[0]).num_seconds();
        if step_seconds <= 0 {
            return Err(BalanceError::data_source(format!(
                "time axis is not increasing ({} -> {})",
                times[0], times[1]
            )));
        }

        if let Some(pos) = times
            .windows(2)
            .position(|w| (w[1] - w[0]).num_seconds() != step_seconds)
        {
            return Err(BalanceError::data_source(format!(
                "time axis is not uniform: step {} -> {} differs from {}s",
                times[pos],
                times[pos + 1],
                step_seconds
            )));
        }

        Ok(Self {
            times,
            step_seconds,
        })
    }

    /// Build a uniform axis of `len` samples starting at `start`.
    pub fn regular(start: DateTime<Utc>, step_seconds: i64, len: usize) -> BalanceResult<Self> {
        let times = (0..len)
            .map(|i| start + Duration::seconds(step_seconds * i as i64))
            .collect();
        Self::new(times)
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Seconds between consecutive samples.
    pub fn seconds_per_step(&self) -> i64 {
        self.step_seconds
    }

    /// Index of the sample closest to `time`; ties go to the lowest index.
    pub fn nearest_index(&self, time: DateTime<Utc>) -> usize {
        let mut best = 0;
        let mut best_distance = i64::MAX;
        for (i, t) in self.times.iter().enumerate() {
            let distance = (*t - time).num_seconds().abs();
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }
}

impl TryFrom<Vec<DateTime<Utc>>> for TimeAxis {
    type Error = BalanceError;

    fn try_from(times: Vec<DateTime<Utc>>) -> BalanceResult<Self> {
        Self::new(times)
    }
}

impl From<TimeAxis> for Vec<DateTime<Utc>> {
    fn from(axis: TimeAxis) -> Self {
        axis.times
    }
}

/// A resolved time range on a [`TimeAxis`].
///
/// Only built through the constructors below, so it is not deserializable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_id: usize,
    pub end_id: usize,
    /// Seconds per time step.
    pub seconds: i64,
    /// Axis timestamps from `start_id` to `end_id` inclusive.
    pub times: Vec<DateTime<Utc>>,
}

impl DateRange {
    /// Snap `start` and `end` to the nearest axis samples.
    pub fn resolve(
        axis: &TimeAxis,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BalanceResult<Self> {
        Self::from_indices(axis, axis.nearest_index(start), axis.nearest_index(end))
    }

    /// The whole axis.
    pub fn full(axis: &TimeAxis) -> Self {
        let end_id = axis.len() - 1;
        Self {
            start: axis.times[0],
            end: axis.times[end_id],
            start_id: 0,
            end_id,
            seconds: axis.step_seconds,
            times: axis.times.clone(),
        }
    }

    /// Range between two axis indices, both inclusive.
    pub fn from_indices(axis: &TimeAxis, start_id: usize, end_id: usize) -> BalanceResult<Self> {
        if end_id < start_id {
            return Err(BalanceError::InvalidTime(format!(
                "end index {} precedes start index {}",
                end_id, start_id
            )));
        }

        if end_id >= axis.len() {
            return Err(BalanceError::InvalidTime(format!(
                "end index {} outside time axis of {} samples",
                end_id,
                axis.len()
            )));
        }

        Ok(Self {
            start: axis.times[start_id],
            end: axis.times[end_id],
            start_id,
            end_id,
            seconds: axis.step_seconds,
            times: axis.times[start_id..=end_id].to_vec(),
        })
    }

    /// Number of time samples covered.
    pub fn timesize(&self) -> usize {
        self.end_id - self.start_id + 1
    }

    /// Number of consecutive sample pairs (balance values).
    pub fn interval_count(&self) -> usize {
        self.end_id - self.start_id
    }

    /// Timestamp at the start of every interval.
    pub fn interval_starts(&self) -> &[DateTime<Utc>] {
        &self.times[..self.interval_count()]
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

/// Parse a timestamp from a dataset time variable.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, and the
/// legacy `stime` form `b'YYYY-MM-DD HH...'` where only the hour is kept.
pub fn parse_stime(raw: &str) -> BalanceResult<DateTime<Utc>> {
    let s = raw
        .trim()
        .trim_start_matches("b'")
        .trim_start_matches("b\"")
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    let invalid = || BalanceError::InvalidTime(format!("unrecognized timestamp '{}'", raw));

    let date = s
        .get(0..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(invalid)?;

    let hour = match s.get(11..13) {
        Some(h) => h.parse::<u32>().map_err(|_| invalid())?,
        None if s.len() == 10 => 0,
        None => return Err(invalid()),
    };

    date.and_hms_opt(hour, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .ok_or_else(invalid)
}

/// CF-convention numeric time units, e.g. `hours since 1900-01-01 00:00:00`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    pub seconds_per_unit: f64,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> BalanceResult<Self> {
        let invalid = || BalanceError::InvalidTime(format!("unsupported time units '{}'", units));

        let (unit, reference) = units.split_once(" since ").ok_or_else(invalid)?;
        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "s" => 1.0,
            "minutes" | "minute" | "min" => 60.0,
            "hours" | "hour" | "h" => 3600.0,
            "days" | "day" | "d" => 86_400.0,
            _ => return Err(invalid()),
        };

        let reference = reference.trim();
        let reference = parse_stime(reference)
            .or_else(|_| parse_stime(reference.trim_end_matches(" UTC")))
            .map_err(|_| invalid())?;

        Ok(Self {
            seconds_per_unit,
            reference,
        })
    }

    /// Convert an offset in these units to a timestamp (millisecond precision).
    ///
    /// Offsets that do not fit a timestamp are a `DataSourceError`.
    pub fn to_datetime(&self, value: f64) -> BalanceResult<DateTime<Utc>> {
        let out_of_range = || {
            BalanceError::data_source(format!(
                "time offset {} ({}s per unit) is outside the representable range",
                value, self.seconds_per_unit
            ))
        };

        let millis = (value * self.seconds_per_unit * 1000.0).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }

        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| self.reference.checked_add_signed(offset))
            .ok_or_else(out_of_range)
    }
}
