//! Synthetic concentration and wind fields.
//!
//! Every generator returns a row-major `Vec<f64>` of `height * width`
//! values (row 0 first), matching the map layout used by the balance crates.

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(height: usize, width: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// Concentration grid at time step `step` of a field growing by `delta` per step.
pub fn create_linear_growth_grid(
    height: usize,
    width: usize,
    base: f64,
    delta: f64,
    step: usize,
) -> Vec<f64> {
    create_constant_grid(height, width, base + delta * step as f64)
}

/// U (eastward) wind varying by row from `-speed` to `+speed`.
///
/// Simulates a banded, trade-wind-like pattern.
pub fn create_zonal_wind_grid(height: usize, width: usize, speed: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let lat_factor = (row as f64 / height.max(1) as f64 - 0.5) * 2.0; // -1 to 1
        data.extend(std::iter::repeat(lat_factor * speed).take(width));
    }
    data
}

/// V (northward) wind varying by column from `-speed` to `+speed`.
pub fn create_meridional_wind_grid(height: usize, width: usize, speed: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let lon_factor = (col as f64 / width.max(1) as f64 - 0.5) * 2.0; // -1 to 1
            data.push(lon_factor * speed);
        }
    }
    data
}

/// Deterministic pseudo-random values in `[base, base + amplitude)`.
///
/// The same `(seed, row, col)` always produces the same value.
pub fn create_noise_grid(
    height: usize,
    width: usize,
    seed: u32,
    base: f64,
    amplitude: f64,
) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            data.push(base + amplitude * (hash % 10_000) as f64 / 10_000.0);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Creates a grid of `value` with NaN at the given (row, col) positions.
pub fn create_grid_with_nans(
    height: usize,
    width: usize,
    value: f64,
    nan_positions: &[(usize, usize)],
) -> Vec<f64> {
    let mut data = vec![value; width * height];
    for &(row, col) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f64::NAN;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_growth() {
        let t0 = create_linear_growth_grid(2, 2, 1.0, 0.5, 0);
        let t3 = create_linear_growth_grid(2, 2, 1.0, 0.5, 3);
        assert!(t0.iter().all(|&v| v == 1.0));
        assert!(t3.iter().all(|&v| v == 2.5));
    }

    #[test]
    fn test_wind_grids_span_both_signs() {
        let u = create_zonal_wind_grid(10, 4, 20.0);
        assert_eq!(u[0], -20.0);
        assert!(u.iter().any(|&v| v > 0.0));
        // Constant along a row
        assert!(u[..4].iter().all(|&v| v == u[0]));

        let v = create_meridional_wind_grid(4, 10, 15.0);
        assert_eq!(v[0], -15.0);
        assert!(v.iter().any(|&x| x > 0.0));
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = create_noise_grid(8, 8, 42, 1.0, 0.5);
        let b = create_noise_grid(8, 8, 42, 1.0, 0.5);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| (1.0..1.5).contains(&v)));
        assert_ne!(a, create_noise_grid(8, 8, 7, 1.0, 0.5));
    }

    #[test]
    fn test_grid_with_nans() {
        let grid = create_grid_with_nans(3, 3, 1.0, &[(1, 1), (5, 5)]);
        assert!(grid[4].is_nan());
        assert_eq!(grid.iter().filter(|v| v.is_nan()).count(), 1);
    }
}
