//! Integration of a concentration snapshot over a region.

use balance_common::{BalanceError, BalanceResult};
use tracing::warn;

use crate::field::Field2D;
use crate::geometry::RegionData;

/// Total substance mass inside the region.
///
/// `snapshot` must have the full map shape the region was resolved on. The
/// block bounded by the region's indices (inclusive on both ends) is
/// multiplied element-wise by the area matrix and summed.
pub fn integrate(snapshot: &Field2D, region: &RegionData) -> BalanceResult<f64> {
    snapshot.check_shape(region.map_shape, "concentration snapshot")?;

    let id = &region.id;
    let width = snapshot.width();
    let block_shape = (id.row_count(), id.column_count(width));
    if block_shape != region.areas.shape() {
        return Err(BalanceError::shape_mismatch(
            "region block vs area matrix",
            region.areas.shape(),
            block_shape,
        ));
    }

    let mut mass = 0.0;
    for (area_row, row) in id.rows().enumerate() {
        let area = region.areas.row_areas()[area_row];
        let values = snapshot.row(row).ok_or_else(|| {
            BalanceError::invalid_region(format!("row {} outside snapshot", row))
        })?;
        for col in id.columns(width) {
            mass += values[col] * area;
        }
    }

    if !mass.is_finite() {
        warn!(region = %region.region, mass, "Non-finite mass; snapshot contains missing values");
    }

    Ok(mass)
}
