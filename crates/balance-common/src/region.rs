//! Region types: user-specified rectangles and their grid-index counterparts.

use serde::{Deserialize, Serialize};

use crate::error::{BalanceError, BalanceResult};

/// A rectangular geographic region in degrees.
///
/// The same type carries both the user's coordinates and the grid-snapped
/// coordinates (see [`crate::resolve::resolve_grid_region`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Minimum latitude.
    pub down: f64,
    /// Maximum latitude.
    pub up: f64,
    /// Minimum longitude.
    pub left: f64,
    /// Maximum longitude.
    pub right: f64,
}

impl Region {
    pub fn new(down: f64, up: f64, left: f64, right: f64) -> Self {
        Self {
            down,
            up,
            left,
            right,
        }
    }

    /// Build a region of the given size around a (lat, lon) center.
    pub fn around_center(center: (f64, f64), height: f64, width: f64) -> Self {
        let (lat, lon) = center;
        let (half_height, half_width) = (height / 2.0, width / 2.0);
        Self {
            down: lat - half_height,
            up: lat + half_height,
            left: lon - half_width,
            right: lon + half_width,
        }
    }

    /// Check the region bounds are usable.
    pub fn validate(&self) -> BalanceResult<()> {
        let bounds = [self.down, self.up, self.left, self.right];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(BalanceError::invalid_region(format!(
                "non-finite bound in {:?}",
                self
            )));
        }

        if self.down > self.up {
            return Err(BalanceError::invalid_region(format!(
                "down ({}) is above up ({})",
                self.down, self.up
            )));
        }

        if self.down < -90.0 || self.up > 90.0 {
            return Err(BalanceError::invalid_region(format!(
                "latitudes [{}, {}] outside [-90, 90]",
                self.down, self.up
            )));
        }

        Ok(())
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        (self.up - self.down).abs()
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        (self.right - self.left).abs()
    }

    /// Center point as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.down + self.up) / 2.0,
            (self.left + self.right) / 2.0,
        )
    }

    /// The same region moved by the given offsets in degrees.
    pub fn shifted(&self, lat_offset: f64, lon_offset: f64) -> Self {
        Self {
            down: self.down + lat_offset,
            up: self.up + lat_offset,
            left: self.left + lon_offset,
            right: self.right + lon_offset,
        }
    }

    /// A region of a new size sharing this region's center.
    pub fn centered_resize(&self, height: f64, width: f64) -> Self {
        Self::around_center(self.center(), height, width)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Region(down={}, up={}, left={}, right={})",
            self.down, self.up, self.left, self.right
        )
    }
}

/// Positions of a region's bounds within the grid axes.
///
/// All four indices are inclusive. On a top-origin grid `up <= down`; on a
/// bottom-origin grid `down <= up`. `left > right` means the region wraps
/// across the last column back to column 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id {
    pub down: usize,
    pub up: usize,
    pub left: usize,
    pub right: usize,
}

impl Id {
    pub fn new(down: usize, up: usize, left: usize, right: usize) -> Self {
        Self {
            down,
            up,
            left,
            right,
        }
    }

    /// First row (lowest index) covered by the region.
    pub fn first_row(&self) -> usize {
        self.up.min(self.down)
    }

    /// Last row (highest index) covered by the region.
    pub fn last_row(&self) -> usize {
        self.up.max(self.down)
    }

    /// Number of rows covered.
    pub fn row_count(&self) -> usize {
        self.last_row() - self.first_row() + 1
    }

    /// Row indices in snapshot order.
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first_row()..=self.last_row()
    }

    /// Number of columns covered on a grid `width` columns wide.
    pub fn column_count(&self, width: usize) -> usize {
        (self.right + width - self.left) % width + 1
    }

    /// Column indices from left to right, wrapping at `width`.
    pub fn columns(&self, width: usize) -> impl Iterator<Item = usize> {
        let left = self.left;
        (0..self.column_count(width)).map(move |k| (left + k) % width)
    }

    /// Check that every index fits inside a map of `shape` (rows, columns).
    pub fn check_within(&self, shape: (usize, usize)) -> BalanceResult<()> {
        let (height, width) = shape;
        if self.last_row() >= height || self.left >= width || self.right >= width {
            return Err(BalanceError::invalid_region(format!(
                "index region {:?} exceeds map shape {:?}",
                self, shape
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_dimensions() {
        let region = Region::new(55.0, 65.0, 130.0, 140.0);
        assert_eq!(region.height(), 10.0);
        assert_eq!(region.width(), 10.0);
        assert_eq!(region.center(), (60.0, 135.0));
    }

    #[test]
    fn test_region_shift_and_resize() {
        let region = Region::new(59.0, 65.0, 59.5, 66.0);
        let moved = region.shifted(0.25, -0.5);
        assert_eq!(moved, Region::new(59.25, 65.25, 59.0, 65.5));

        let resized = region.centered_resize(4.0, 5.0);
        assert_eq!(resized.center(), region.center());
        assert_eq!(resized.height(), 4.0);
        assert_eq!(resized.width(), 5.0);
    }

    #[test]
    fn test_region_validation() {
        assert!(Region::new(55.0, 65.0, 130.0, 140.0).validate().is_ok());
        assert!(Region::new(65.0, 55.0, 130.0, 140.0).validate().is_err());
        assert!(Region::new(55.0, 95.0, 130.0, 140.0).validate().is_err());
        assert!(Region::new(f64::NAN, 65.0, 130.0, 140.0).validate().is_err());
    }

    #[test]
    fn test_id_rows_either_orientation() {
        let top = Id::new(140, 100, 10, 20);
        assert_eq!(top.row_count(), 41);
        assert_eq!(top.rows(), 100..=140);

        let bottom = Id::new(100, 140, 10, 20);
        assert_eq!(bottom.row_count(), 41);
        assert_eq!(bottom.rows(), 100..=140);
    }

    #[test]
    fn test_id_columns_wrap() {
        let id = Id::new(5, 1, 8, 1);
        assert_eq!(id.column_count(10), 4);
        assert_eq!(id.columns(10).collect::<Vec<_>>(), vec![8, 9, 0, 1]);

        let plain = Id::new(5, 1, 2, 4);
        assert_eq!(plain.columns(10).collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_id_check_within() {
        let id = Id::new(5, 1, 2, 4);
        assert!(id.check_within((6, 5)).is_ok());
        assert!(id.check_within((5, 5)).is_err());
        assert!(id.check_within((6, 4)).is_err());
    }
}
