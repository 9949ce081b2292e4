//! Dense 2D fields (one full-map snapshot of a quantity).

use balance_common::{BalanceError, BalanceResult};

/// A row-major 2D array of values.
///
/// Rows follow the grid's latitude ordering and columns its longitude
/// ordering, so `get(row, col)` addresses the same cell as `grid.lat()[row]`,
/// `grid.lon()[col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    data: Vec<f64>,
    height: usize,
    width: usize,
}

impl Field2D {
    /// Wrap row-major data of the given shape.
    pub fn new(data: Vec<f64>, height: usize, width: usize) -> BalanceResult<Self> {
        if data.len() != height * width {
            return Err(BalanceError::shape_mismatch(
                "field data length",
                height * width,
                data.len(),
            ));
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    /// Build from column-major data, i.e. a `[lon, lat]` block as stored on disk.
    pub fn from_column_major(data: Vec<f64>, height: usize, width: usize) -> BalanceResult<Self> {
        if data.len() != height * width {
            return Err(BalanceError::shape_mismatch(
                "field data length",
                height * width,
                data.len(),
            ));
        }
        Ok(Self::from_fn(height, width, |row, col| data[col * height + row]))
    }

    /// A field with every cell set to `value`.
    pub fn filled(height: usize, width: usize, value: f64) -> Self {
        Self {
            data: vec![value; height * width],
            height,
            width,
        }
    }

    /// A field whose cells are computed from their (row, col) position.
    pub fn from_fn(height: usize, width: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            data,
            height,
            width,
        }
    }

    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// One row of the field.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.height {
            return None;
        }
        let start = row * self.width;
        Some(&self.data[start..start + self.width])
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Fail with `ShapeMismatch` unless the field has exactly `expected` shape.
    pub fn check_shape(&self, expected: (usize, usize), what: &str) -> BalanceResult<()> {
        if self.shape() != expected {
            return Err(BalanceError::shape_mismatch(what, expected, self.shape()));
        }
        Ok(())
    }

    /// Number of non-finite cells.
    pub fn count_non_finite(&self) -> usize {
        self.data.iter().filter(|v| !v.is_finite()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Field2D::new(vec![0.0; 6], 2, 3).is_ok());
        let err = Field2D::new(vec![0.0; 5], 2, 3).unwrap_err();
        assert_eq!(err.code(), "ShapeMismatch");
    }

    #[test]
    fn test_row_major_access() {
        let field = Field2D::from_fn(3, 4, |r, c| (r * 10 + c) as f64);
        assert_eq!(field.get(0, 0), Some(0.0));
        assert_eq!(field.get(2, 3), Some(23.0));
        assert_eq!(field.get(3, 0), None);
        assert_eq!(field.get(0, 4), None);
        assert_eq!(field.row(1), Some(&[10.0, 11.0, 12.0, 13.0][..]));
        assert_eq!(field.row(3), None);
    }

    #[test]
    fn test_column_major_transpose() {
        // [lon, lat] layout: lon 0 holds lat 0..2, then lon 1
        let field = Field2D::from_column_major(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2).unwrap();
        assert_eq!(field.shape(), (3, 2));
        assert_eq!(field.row(0), Some(&[1.0, 4.0][..]));
        assert_eq!(field.row(2), Some(&[3.0, 6.0][..]));
    }

    #[test]
    fn test_check_shape() {
        let field = Field2D::filled(2, 2, 1.0);
        assert!(field.check_shape((2, 2), "snapshot").is_ok());
        assert!(field.check_shape((720, 1440), "snapshot").is_err());
    }
}
