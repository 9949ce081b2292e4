//! Nearest-neighbour snapping of region bounds onto the grid.

use tracing::{debug, warn};

use crate::error::{BalanceError, BalanceResult};
use crate::grid::Grid;
use crate::region::{Id, Region};

/// Index of the axis entry closest to `value`.
///
/// Ties go to the lowest index. NaN entries never match. Returns `None` for
/// an empty axis.
pub fn nearest_index(value: f64, axis: &[f64]) -> Option<usize> {
    axis.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| {
            let distance = (v - value).abs();
            match best {
                _ if distance.is_nan() => best,
                Some((_, best_distance)) if distance >= best_distance => best,
                _ => Some((i, distance)),
            }
        })
        .map(|(i, _)| i)
}

/// Axis entry closest to `value`.
pub fn nearest_value(value: f64, axis: &[f64]) -> Option<f64> {
    nearest_index(value, axis).map(|i| axis[i])
}

fn index_on(axis: &[f64], value: f64, name: &str) -> BalanceResult<usize> {
    nearest_index(value, axis).ok_or_else(|| {
        BalanceError::invalid_region(format!("no {} value near {} on the grid", name, value))
    })
}

/// Resolve a region's bounds to grid indices.
///
/// `lon_index_offset` is added to both longitude indices, modulo the grid width.
pub fn resolve_id(region: &Region, grid: &Grid, lon_index_offset: usize) -> BalanceResult<Id> {
    region.validate()?;

    let width = grid.width();
    let shift = |i: usize| (i + lon_index_offset) % width;

    let id = Id {
        down: index_on(grid.lat(), region.down, "latitude")?,
        up: index_on(grid.lat(), region.up, "latitude")?,
        left: shift(index_on(grid.lon(), region.left, "longitude")?),
        right: shift(index_on(grid.lon(), region.right, "longitude")?),
    };

    let columns = id.column_count(width);
    if region.left > region.right && columns > width / 2 {
        warn!(
            region = %region,
            columns = columns,
            width = width,
            "Region crosses the antimeridian and spans most of the globe; check left/right order"
        );
    }

    debug!(region = %region, id = ?id, "Resolved region indices");
    Ok(id)
}

/// Snap a region's bounds to the nearest grid coordinates.
pub fn resolve_grid_region(region: &Region, grid: &Grid) -> BalanceResult<Region> {
    region.validate()?;

    let snap = |axis: &[f64], value: f64, name: &str| -> BalanceResult<f64> {
        index_on(axis, value, name).map(|i| axis[i])
    };

    Ok(Region {
        down: snap(grid.lat(), region.down, "latitude")?,
        up: snap(grid.lat(), region.up, "latitude")?,
        left: snap(grid.lon(), region.left, "longitude")?,
        right: snap(grid.lon(), region.right, "longitude")?,
    })
}
