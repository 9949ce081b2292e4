//! Native NetCDF reading using the netcdf library.
//!
//! The netcdf/HDF5 handle is not safe for concurrent use, so every read goes
//! through one mutex-guarded `netcdf::File`. Parallel balance builds still
//! overlap their arithmetic; only the I/O is serialized.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, Once};

use balance_common::{BalanceResult, Grid, Id, TimeAxis};
use balance_core::{DataSource, EdgeArrays, Field2D, Quantity, VariableNames};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::layout::{column_segments, decode_time_axis, map_dimensions, row_range, RawTime};

/// Silence HDF5's automatic error printing to stderr.
///
/// HDF5 reports handled errors (e.g. probing for an optional attribute) on
/// stderr. Call once early, before any HDF5/NetCDF operation; repeated calls
/// are no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

const LAT_NAMES: [&str; 2] = ["lat", "latitude"];
const LON_NAMES: [&str; 2] = ["lon", "longitude"];

/// A [`DataSource`] reading `[lon, lat, time]` variables from a NetCDF file.
pub struct NetCdfSource {
    path: PathBuf,
    file: Mutex<netcdf::File>,
    names: VariableNames,
    shape: (usize, usize),
    grid: Option<Grid>,
    time_axis: TimeAxis,
}

impl std::fmt::Debug for NetCdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCdfSource")
            .field("path", &self.path)
            .field("names", &self.names)
            .field("shape", &self.shape)
            .field("time_steps", &self.time_axis.len())
            .finish()
    }
}

impl NetCdfSource {
    /// Open a dataset and validate its layout and time axis.
    pub fn open(path: impl AsRef<Path>, names: &VariableNames) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e)))?;

        let dims = variable_dims(&file, &names.target)?;
        let (height, width, steps) = map_dimensions(&names.target, &dims)?;

        for name in [&names.u, &names.v] {
            let var_dims = variable_dims(&file, name)?;
            if var_dims != dims {
                return Err(NetCdfError::InvalidFormat(format!(
                    "variable '{}' has dimensions {:?}, '{}' has {:?}",
                    name, var_dims, names.target, dims
                )));
            }
        }

        let time_axis = decode_time_axis(read_time(&file, &names.time)?)?;
        if time_axis.len() != steps {
            return Err(NetCdfError::InvalidFormat(format!(
                "time variable '{}' has {} samples, data has {}",
                names.time,
                time_axis.len(),
                steps
            )));
        }

        let grid = read_grid(&file)?;
        if let Some(grid) = &grid {
            if grid.shape() != (height, width) {
                return Err(NetCdfError::InvalidFormat(format!(
                    "coordinate axes {:?} do not match data shape {:?}",
                    grid.shape(),
                    (height, width)
                )));
            }
        }

        info!(
            path = %path.display(),
            height = height,
            width = width,
            time_steps = steps,
            step_seconds = time_axis.seconds_per_step(),
            has_axes = grid.is_some(),
            "Opened NetCDF source"
        );

        Ok(Self {
            path,
            file: Mutex::new(file),
            names: names.clone(),
            shape: (height, width),
            grid,
            time_axis,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable_name(&self, quantity: Quantity) -> &str {
        match quantity {
            Quantity::Target => &self.names.target,
            Quantity::U => &self.names.u,
            Quantity::V => &self.names.v,
        }
    }

    fn lock(&self) -> NetCdfResult<MutexGuard<'_, netcdf::File>> {
        self.file
            .lock()
            .map_err(|_| NetCdfError::InvalidFormat("NetCDF handle lock poisoned".to_string()))
    }

    fn check_time_index(&self, time_index: usize) -> NetCdfResult<()> {
        if time_index >= self.time_axis.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "time index {} outside {} samples",
                time_index,
                self.time_axis.len()
            )));
        }
        Ok(())
    }

    fn read_map(&self, quantity: Quantity, time_index: usize) -> NetCdfResult<Field2D> {
        self.check_time_index(time_index)?;
        let name = self.variable_name(quantity);
        let (height, width) = self.shape;

        let values: Vec<f64> = {
            let file = self.lock()?;
            let var = file
                .variable(name)
                .ok_or_else(|| NetCdfError::MissingVariable(name.to_string()))?;
            var.get_values((.., .., time_index))?
        };

        Ok(Field2D::from_column_major(values, height, width)?)
    }

    fn read_edges(&self, quantity: Quantity, time_index: usize, id: &Id) -> NetCdfResult<EdgeArrays> {
        self.check_time_index(time_index)?;
        id.check_within(self.shape)?;
        let name = self.variable_name(quantity);
        let rows = row_range(id);
        let segments = column_segments(id, self.shape.1);

        let file = self.lock()?;
        let var = file
            .variable(name)
            .ok_or_else(|| NetCdfError::MissingVariable(name.to_string()))?;

        let right: Vec<f64> = var.get_values((id.right, rows.clone(), time_index))?;
        let left: Vec<f64> = var.get_values((id.left, rows, time_index))?;

        let mut down = Vec::with_capacity(id.column_count(self.shape.1));
        let mut up = Vec::with_capacity(id.column_count(self.shape.1));
        for columns in segments {
            down.extend(var.get_values::<f64, _>((columns.clone(), id.down, time_index))?);
            up.extend(var.get_values::<f64, _>((columns, id.up, time_index))?);
        }

        debug!(
            variable = name,
            time_index = time_index,
            cells = right.len() + left.len() + down.len() + up.len(),
            "Read boundary slices"
        );

        Ok(EdgeArrays {
            right,
            left,
            down,
            up,
        })
    }
}

impl DataSource for NetCdfSource {
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
        Ok(self.read_map(quantity, time_index)?)
    }

    fn boundary_at(&self, quantity: Quantity, time_index: usize, id: &Id) -> BalanceResult<EdgeArrays> {
        Ok(self.read_edges(quantity, time_index, id)?)
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn variable_dims(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<usize>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingVariable(name.to_string()))?;
    Ok(var.dimensions().iter().map(|d| d.len()).collect())
}

/// Read the time variable as labels or CF offsets, depending on its units.
fn read_time(file: &netcdf::File, name: &str) -> NetCdfResult<RawTime> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingVariable(name.to_string()))?;

    if var.dimensions().len() != 1 {
        return Err(NetCdfError::InvalidFormat(format!(
            "time variable '{}' has {} dimensions, expected 1",
            name,
            var.dimensions().len()
        )));
    }

    if let Some(units) = get_string_attr(&var, "units").filter(|u| u.contains(" since ")) {
        let values: Vec<f64> = var.get_values(..)?;
        return Ok(RawTime::Offsets { values, units });
    }

    let len = var.dimensions()[0].len();
    let labels = (0..len)
        .map(|i| var.get_string([i]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RawTime::Labels(labels))
}

/// Read 1-D latitude/longitude axes when the file carries them.
fn read_grid(file: &netcdf::File) -> NetCdfResult<Option<Grid>> {
    let lat = read_axis(file, &LAT_NAMES)?;
    let lon = read_axis(file, &LON_NAMES)?;
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(Grid::from_axes(lat, lon)?)),
        _ => Ok(None),
    }
}

fn read_axis(file: &netcdf::File, names: &[&str]) -> NetCdfResult<Option<Vec<f64>>> {
    for name in names {
        if let Some(var) = file.variable(name) {
            return Ok(Some(var.get_values(..)?));
        }
    }
    Ok(None)
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
