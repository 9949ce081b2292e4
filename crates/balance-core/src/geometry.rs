//! Physical geometry of grid-aligned regions: edge lengths and cell areas.

use balance_common::{
    resolve_grid_region, resolve_id, BalanceError, BalanceResult, Grid, GridConfig, Id, Region,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerance when checking that a degree span is a whole number of grid steps.
const ALIGNMENT_TOLERANCE: f64 = 1e-6;

/// Physical length in meters of one grid step along each region boundary.
///
/// `left`/`right` run along meridians and have a fixed length. `up`/`down`
/// run along parallels and shrink with cos(latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub down: f64,
    pub up: f64,
    pub left: f64,
    pub right: f64,
}

impl Cell {
    /// Edge lengths for a grid-snapped region.
    pub fn edge_lengths(grid_region: &Region, cell_length_m: f64) -> Self {
        Self {
            down: cell_length_m * grid_region.down.abs().to_radians().cos(),
            up: cell_length_m * grid_region.up.abs().to_radians().cos(),
            left: cell_length_m,
            right: cell_length_m,
        }
    }
}

/// Area of every grid cell inside a region, in m².
///
/// Rows follow the snapshot row order of the region's [`Id`]. Every cell in
/// a row shares the same area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaMatrix {
    row_areas: Vec<f64>,
    columns: usize,
}

impl AreaMatrix {
    /// Build the area matrix of a grid-snapped region.
    ///
    /// Fails with `InvalidRegion` if the region's degree spans are not a
    /// positive whole number of grid steps, or disagree with the index counts.
    pub fn build(grid_region: &Region, id: &Id, grid: &Grid, cell_length_m: f64) -> BalanceResult<Self> {
        let step = grid.step();
        let rows = step_count(grid_region.up - grid_region.down, step, "rows")?;

        let mut lon_span = grid_region.right - grid_region.left;
        if lon_span < 0.0 {
            lon_span += 360.0;
        }
        let columns = step_count(lon_span, step, "columns")?;

        if rows != id.row_count() || columns != id.column_count(grid.width()) {
            return Err(BalanceError::invalid_region(format!(
                "area matrix {}x{} does not match index region {}x{}",
                rows,
                columns,
                id.row_count(),
                id.column_count(grid.width())
            )));
        }

        let row_areas = id
            .rows()
            .map(|row| cell_length_m * cell_length_m * grid.lat()[row].abs().to_radians().cos())
            .collect();

        Ok(Self { row_areas, columns })
    }

    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.row_areas.len(), self.columns)
    }

    /// Area of every cell in `row`.
    pub fn row_area(&self, row: usize) -> Option<f64> {
        self.row_areas.get(row).copied()
    }

    pub fn row_areas(&self) -> &[f64] {
        &self.row_areas
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if col >= self.columns {
            return None;
        }
        self.row_area(row)
    }

    /// Sum of all cell areas.
    pub fn total(&self) -> f64 {
        self.row_areas
            .iter()
            .map(|area| area * self.columns as f64)
            .sum()
    }

    /// Dense row-major copy.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.row_areas
            .iter()
            .map(|&area| vec![area; self.columns])
            .collect()
    }
}

fn step_count(span: f64, step: f64, what: &str) -> BalanceResult<usize> {
    let count = span / step + 1.0;
    let rounded = count.round();
    if !count.is_finite() || (count - rounded).abs() > ALIGNMENT_TOLERANCE || rounded < 1.0 {
        return Err(BalanceError::invalid_region(format!(
            "{} count {} is not a positive integer; region is not grid-aligned",
            what, count
        )));
    }
    Ok(rounded as usize)
}

/// Everything needed to integrate a snapshot over one region.
///
/// Built once per region and reused for every time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionData {
    /// The caller's region.
    pub region: Region,
    /// The region snapped to grid coordinates.
    pub grid_region: Region,
    /// Grid indices of the region bounds.
    pub id: Id,
    /// Boundary edge lengths.
    pub cell: Cell,
    /// Per-cell areas.
    pub areas: AreaMatrix,
    /// Shape of the full map the indices refer to.
    pub map_shape: (usize, usize),
}

impl RegionData {
    /// Resolve `region` on `grid`.
    ///
    /// The meridian cell length is `degree_length_m` times the grid step.
    pub fn new(region: Region, grid: &Grid, config: &GridConfig) -> BalanceResult<Self> {
        let grid_region = resolve_grid_region(&region, grid)?;
        let id = resolve_id(&region, grid, config.lon_index_offset)?;
        id.check_within(grid.shape())?;

        let cell_length_m = config.degree_length_m * grid.step();
        let cell = Cell::edge_lengths(&grid_region, cell_length_m);
        let areas = AreaMatrix::build(&grid_region, &id, grid, cell_length_m)?;

        debug!(
            region = %region,
            grid_region = %grid_region,
            rows = areas.shape().0,
            columns = areas.shape().1,
            "Built region data"
        );

        Ok(Self {
            region,
            grid_region,
            id,
            cell,
            areas,
            map_shape: grid.shape(),
        })
    }

    /// Number of grid cells on the four boundary edges combined.
    pub fn boundary_cell_count(&self) -> usize {
        let (rows, columns) = self.areas.shape();
        2 * rows + 2 * columns
    }
}
