//! Array shapes and column layout shared by every pipeline stage
//!
//! Sample-indexed batch arrays are `ndarray` types (row = sample index);
//! per-sample vectors handed to attitude estimators are `nalgebra` types.

use nalgebra::Vector3;
use ndarray::{Array1, Array2, ArrayView1};

// ===== Dimensions =====
pub const AXES: usize = 3;
pub const INPUT_COLUMNS: usize = 10;

// ===== Input table column layout =====
pub const COL_TIMESTAMP: usize = 0;
pub const COL_ACCEL: usize = 1; // x, y, z
pub const COL_GYRO: usize = 4; // x, y, z [rad/s]
pub const COL_ORIENTATION: usize = 7; // roll, pitch, yaw [rad]

// ===== Type aliases =====
pub type Vec3 = Vector3<f64>;
/// Sample timestamps [seconds], length N
pub type Timestamps = Array1<f64>;
/// Per-sample 3-vectors, shape (N, 3)
pub type AxisSeries = Array2<f64>;
/// Per-sample motion flags, length N
pub type MotionFlags = Vec<bool>;

/// Read row `index` of an (N, 3) array as a vector
pub fn row_vec3(series: &AxisSeries, index: usize) -> Vec3 {
    Vec3::new(
        series[[index, 0]],
        series[[index, 1]],
        series[[index, 2]],
    )
}

/// Write a vector into row `index` of an (N, 3) array
pub fn set_row_vec3(series: &mut AxisSeries, index: usize, value: &Vec3) {
    for axis in 0..AXES {
        series[[index, axis]] = value[axis];
    }
}

/// Euclidean norm of a row view
pub fn row_norm(row: ArrayView1<f64>) -> f64 {
    row.iter().map(|v| v * v).sum::<f64>().sqrt()
}
