//! Boundary flux engine.
//!
//! Flux through each of the four region edges is `concentration × velocity ×
//! edge length`, summed over the edge cells. U (eastward) velocity drives the
//! left/right edges and V (northward) velocity the up/down edges. Velocity is
//! positive along increasing longitude and latitude, so substance enters the
//! region when:
//!
//! | edge  | income     | outcome    |
//! |-------|------------|------------|
//! | right | value < 0  | value ≥ 0  |
//! | left  | value > 0  | value ≤ 0  |
//! | up    | value < 0  | value ≥ 0  |
//! | down  | value > 0  | value ≤ 0  |
//!
//! Income and outcome are accumulated as positive magnitudes, so every
//! finite boundary cell lands in exactly one bucket. NaN cells (missing data)
//! land in neither and are counted in `skipped_cells`.

use balance_common::{BalanceError, BalanceResult, Id};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::FluxMode;
use crate::field::Field2D;
use crate::geometry::Cell;

/// Values sampled along the four edges of a region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeArrays {
    /// Column `id.right`, one value per region row.
    pub right: Vec<f64>,
    /// Column `id.left`, one value per region row.
    pub left: Vec<f64>,
    /// Row `id.down`, one value per region column.
    pub down: Vec<f64>,
    /// Row `id.up`, one value per region column.
    pub up: Vec<f64>,
}

impl EdgeArrays {
    /// Slice the four edges of `id` out of a full map.
    pub fn from_field(field: &Field2D, id: &Id) -> BalanceResult<Self> {
        id.check_within(field.shape())?;

        let width = field.width();
        let value = |row: usize, col: usize| {
            field.get(row, col).ok_or_else(|| {
                BalanceError::invalid_region(format!("cell ({}, {}) outside field", row, col))
            })
        };

        Ok(Self {
            right: id.rows().map(|r| value(r, id.right)).collect::<BalanceResult<_>>()?,
            left: id.rows().map(|r| value(r, id.left)).collect::<BalanceResult<_>>()?,
            down: id.columns(width).map(|c| value(id.down, c)).collect::<BalanceResult<_>>()?,
            up: id.columns(width).map(|c| value(id.up, c)).collect::<BalanceResult<_>>()?,
        })
    }

    /// Total number of edge cells.
    pub fn len(&self) -> usize {
        self.right.len() + self.left.len() + self.down.len() + self.up.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lengths(&self) -> [usize; 4] {
        [self.right.len(), self.left.len(), self.down.len(), self.up.len()]
    }
}

/// Edge samples of every quantity needed for one time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryArrays {
    pub concentration: EdgeArrays,
    pub u: EdgeArrays,
    pub v: EdgeArrays,
}

impl BoundaryArrays {
    /// Check that all three quantities were sampled on the same edges.
    pub fn check_aligned(&self) -> BalanceResult<()> {
        let expected = self.concentration.lengths();
        for (what, edges) in [("U boundary", &self.u), ("V boundary", &self.v)] {
            if edges.lengths() != expected {
                return Err(BalanceError::shape_mismatch(what, expected, edges.lengths()));
            }
        }
        Ok(())
    }
}

/// Income/outcome totals of one time step, with cell counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxBreakdown {
    /// Substance entering the region over the step.
    pub income: f64,
    /// Substance leaving the region over the step.
    pub outcome: f64,
    /// Boundary cells classified as income.
    pub income_cells: usize,
    /// Boundary cells classified as outcome.
    pub outcome_cells: usize,
    /// NaN boundary cells left out of both totals.
    #[serde(default)]
    pub skipped_cells: usize,
}

impl FluxBreakdown {
    /// Net flux into the region.
    pub fn net(&self) -> f64 {
        self.income - self.outcome
    }

    pub fn cell_count(&self) -> usize {
        self.income_cells + self.outcome_cells
    }

    /// Report in the requested mode.
    pub fn value(&self, mode: FluxMode) -> FluxValue {
        match mode {
            FluxMode::Total => FluxValue::Total(self.net()),
            FluxMode::Separated => FluxValue::Separated {
                income: self.income,
                outcome: self.outcome,
            },
        }
    }

    fn accumulate(&mut self, concentration: &[f64], velocity: &[f64], length: f64, inflow: Inflow) {
        for (c, v) in concentration.iter().zip(velocity) {
            let value = c * v * length;
            if value.is_nan() {
                self.skipped_cells += 1;
                continue;
            }
            let entering = match inflow {
                Inflow::Positive => value > 0.0,
                Inflow::Negative => value < 0.0,
            };
            if entering {
                self.income += value.abs();
                self.income_cells += 1;
            } else {
                self.outcome += value.abs();
                self.outcome_cells += 1;
            }
        }
    }
}

/// Sign of an edge value that carries substance into the region.
#[derive(Clone, Copy)]
enum Inflow {
    Positive,
    Negative,
}

/// Flux of one time step, in the caller's chosen mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluxValue {
    Total(f64),
    Separated { income: f64, outcome: f64 },
}

impl FluxValue {
    /// Net flux into the region.
    pub fn net(&self) -> f64 {
        match *self {
            FluxValue::Total(net) => net,
            FluxValue::Separated { income, outcome } => income - outcome,
        }
    }
}

/// Classify boundary flux into income and outcome over `seconds`.
pub fn flux(boundary: &BoundaryArrays, cell: &Cell, seconds: f64) -> BalanceResult<FluxBreakdown> {
    boundary.check_aligned()?;

    let conc = &boundary.concentration;
    let mut breakdown = FluxBreakdown::default();
    breakdown.accumulate(&conc.right, &boundary.u.right, cell.right, Inflow::Negative);
    breakdown.accumulate(&conc.left, &boundary.u.left, cell.left, Inflow::Positive);
    breakdown.accumulate(&conc.down, &boundary.v.down, cell.down, Inflow::Positive);
    breakdown.accumulate(&conc.up, &boundary.v.up, cell.up, Inflow::Negative);

    breakdown.income *= seconds;
    breakdown.outcome *= seconds;

    if breakdown.skipped_cells > 0 {
        warn!(
            skipped = breakdown.skipped_cells,
            cells = boundary.concentration.len(),
            "NaN boundary cells left out of flux"
        );
    }

    if !(breakdown.income.is_finite() && breakdown.outcome.is_finite()) {
        warn!(
            income = breakdown.income,
            outcome = breakdown.outcome,
            "Non-finite boundary flux"
        );
    }

    Ok(breakdown)
}

/// [`flux`] reported in `mode`.
pub fn flux_value(
    boundary: &BoundaryArrays,
    cell: &Cell,
    seconds: f64,
    mode: FluxMode,
) -> BalanceResult<FluxValue> {
    flux(boundary, cell, seconds).map(|b| b.value(mode))
}
