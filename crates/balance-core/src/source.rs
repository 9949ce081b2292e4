//! Data source abstraction for time-indexed gridded fields.

use std::collections::HashMap;

use balance_common::{BalanceError, BalanceResult, Grid, Id, TimeAxis};
use chrono::{DateTime, Utc};

use crate::field::Field2D;
use crate::flux::{BoundaryArrays, EdgeArrays};

/// A physical quantity read from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Concentration of the traced substance.
    Target,
    /// Eastward velocity.
    U,
    /// Northward velocity.
    V,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [Quantity::Target, Quantity::U, Quantity::V];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::U => "U",
            Self::V => "V",
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for time-indexed 2D field storage.
///
/// Implementations must be safe to share between threads; sources backed by
/// a single non-thread-safe handle serialize reads internally.
pub trait DataSource: Send + Sync {
    /// Map shape as (rows, columns).
    fn grid_shape(&self) -> (usize, usize);

    /// The source's own coordinate axes, if it carries them.
    fn grid(&self) -> Option<Grid> {
        None
    }

    /// The validated, uniformly spaced time axis.
    fn time_axis(&self) -> &TimeAxis;

    /// Full-map snapshot of `quantity` at `time_index`.
    fn map_at(&self, quantity: Quantity, time_index: usize) -> BalanceResult<Field2D>;

    /// The four edges of `id` for `quantity` at `time_index`.
    ///
    /// The default slices [`DataSource::map_at`]; sources that can read
    /// partial blocks should override it.
    fn boundary_at(&self, quantity: Quantity, time_index: usize, id: &Id) -> BalanceResult<EdgeArrays> {
        let map = self.map_at(quantity, time_index)?;
        map.check_shape(self.grid_shape(), "boundary source map")?;
        EdgeArrays::from_field(&map, id)
    }

    /// Index of the time sample closest to `time`; ties go to the lowest index.
    fn nearest_time_index(&self, time: DateTime<Utc>) -> usize {
        self.time_axis().nearest_index(time)
    }

    /// Seconds between consecutive time samples.
    fn seconds_per_step(&self) -> i64 {
        self.time_axis().seconds_per_step()
    }
}

/// Read the concentration, U and V edges needed for one flux step.
pub fn boundary_arrays<S: DataSource + ?Sized>(
    source: &S,
    time_index: usize,
    id: &Id,
) -> BalanceResult<BoundaryArrays> {
    Ok(BoundaryArrays {
        concentration: source.boundary_at(Quantity::Target, time_index, id)?,
        u: source.boundary_at(Quantity::U, time_index, id)?,
        v: source.boundary_at(Quantity::V, time_index, id)?,
    })
}

/// A data source holding every snapshot in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    shape: (usize, usize),
    grid: Option<Grid>,
    time_axis: TimeAxis,
    maps: HashMap<Quantity, Vec<Field2D>>,
}

impl MemorySource {
    /// An empty source of the given map shape; add quantities with
    /// [`MemorySource::with_quantity`].
    pub fn new(shape: (usize, usize), time_axis: TimeAxis) -> Self {
        Self {
            shape,
            grid: None,
            time_axis,
            maps: HashMap::new(),
        }
    }

    /// Attach coordinate axes. The grid shape must match the map shape.
    pub fn with_grid(mut self, grid: Grid) -> BalanceResult<Self> {
        if grid.shape() != self.shape {
            return Err(BalanceError::shape_mismatch("source grid", self.shape, grid.shape()));
        }
        self.grid = Some(grid);
        Ok(self)
    }

    /// Store one snapshot per time step for `quantity`.
    pub fn with_quantity(mut self, quantity: Quantity, maps: Vec<Field2D>) -> BalanceResult<Self> {
        if maps.len() != self.time_axis.len() {
            return Err(BalanceError::shape_mismatch(
                format!("{} time steps", quantity),
                self.time_axis.len(),
                maps.len(),
            ));
        }
        for map in &maps {
            map.check_shape(self.shape, &format!("{} snapshot", quantity))?;
        }
        self.maps.insert(quantity, maps);
        Ok(self)
    }

    /// Build every snapshot of `quantity` from (time index, row, col).
    pub fn with_generated(
        self,
        quantity: Quantity,
        f: impl Fn(usize, usize, usize) -> f64,
    ) -> BalanceResult<Self> {
        let (height, width) = self.shape;
        let maps = (0..self.time_axis.len())
            .map(|t| Field2D::from_fn(height, width, |row, col| f(t, row, col)))
            .collect();
        self.with_quantity(quantity, maps)
    }
}

impl DataSource for MemorySource {
    fn grid_shape(&self) -> (usize, usize) {
        self.shape
    }

    fn grid(&self) -> Option<Grid> {
        self.grid.clone()
    }

    fn time_axis(&self) -> &TimeAxis {
        &self.time_axis
    }

    fn map_at(&self, quantity: Quantity, time_index: usize) -> BalanceResult<Field2D> {
        let maps = self
            .maps
            .get(&quantity)
            .ok_or_else(|| BalanceError::data_source(format!("variable '{}' not found", quantity)))?;

        maps.get(time_index).cloned().ok_or_else(|| {
            BalanceError::data_source(format!(
                "time index {} out of range for '{}' ({} steps)",
                time_index,
                quantity,
                maps.len()
            ))
        })
    }
}
