pub mod linalg;

pub use linalg::*;

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};

/// Validated raw sample batch, still in recorder units
///
/// Timestamps are milliseconds, gyroscope rates rad/s and orientation radians.
/// Accelerometer readings are passed through untouched.
#[derive(Clone, Debug)]
pub struct RawSeries {
    pub timestamp_ms: Array1<f64>,
    pub accel: AxisSeries,
    pub gyro_rad: AxisSeries,
    pub orientation_rad: AxisSeries,
}

impl RawSeries {
    /// Build from parsed JSON rows (`[timestamp_ms, ax, ay, az, gx, gy, gz, roll, pitch, yaw]`)
    pub fn from_rows(rows: &[Vec<f64>]) -> TraceResult<Self> {
        if rows.is_empty() {
            return Err(TraceError::EmptyInput);
        }
        let mut table = Array2::<f64>::zeros((rows.len(), INPUT_COLUMNS));
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != INPUT_COLUMNS {
                return Err(TraceError::ColumnCount {
                    row: row_idx,
                    found: row.len(),
                    expected: INPUT_COLUMNS,
                });
            }
            for (col, value) in row.iter().enumerate() {
                table[[row_idx, col]] = *value;
            }
        }
        Self::from_table(table.view())
    }

    /// Build from an (N, 10) table, rejecting bad shapes, NaN/inf and
    /// timestamps that fail to strictly increase
    pub fn from_table(table: ArrayView2<f64>) -> TraceResult<Self> {
        let (rows, cols) = table.dim();
        if rows == 0 {
            return Err(TraceError::EmptyInput);
        }
        if cols != INPUT_COLUMNS {
            return Err(TraceError::ColumnCount {
                row: 0,
                found: cols,
                expected: INPUT_COLUMNS,
            });
        }

        for ((row, column), value) in table.indexed_iter() {
            if !value.is_finite() {
                return Err(TraceError::NonFinite { row, column });
            }
        }

        for row in 1..rows {
            let previous = table[[row - 1, COL_TIMESTAMP]];
            let current = table[[row, COL_TIMESTAMP]];
            if current <= previous {
                return Err(TraceError::NonMonotonicTimestamp {
                    row,
                    previous,
                    current,
                });
            }
        }

        let take3 = |start: usize| -> AxisSeries {
            table
                .slice(ndarray::s![.., start..start + AXES])
                .to_owned()
        };

        Ok(Self {
            timestamp_ms: table.column(COL_TIMESTAMP).to_owned(),
            accel: take3(COL_ACCEL),
            gyro_rad: take3(COL_GYRO),
            orientation_rad: take3(COL_ORIENTATION),
        })
    }

    pub fn len(&self) -> usize {
        self.timestamp_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp_ms.is_empty()
    }
}

/// Sample batch after unit conversion and orientation/gyroscope conditioning
#[derive(Clone, Debug)]
pub struct SampleSeries {
    /// Seconds
    pub timestamp: Timestamps,
    /// Forwarded to the attitude estimator as-is
    pub accel: AxisSeries,
    /// deg/s-equivalent, recomputed from the smoothed orientation
    pub gyro: AxisSeries,
    /// Degrees, smoothed
    pub orientation: AxisSeries,
}

impl SampleSeries {
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    /// `delta_time[i] = t[i] - t[i-1]`, with `delta_time[0] = 0`
    pub fn delta_time(&self) -> Array1<f64> {
        let mut dt = Array1::<f64>::zeros(self.len());
        for i in 1..self.len() {
            dt[i] = self.timestamp[i] - self.timestamp[i - 1];
        }
        dt
    }
}

/// One contiguous rising/falling edge pair in the motion flag sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovingPeriod {
    pub start_index: usize,
    pub stop_index: usize,
}

impl MovingPeriod {
    /// Number of samples covered, both ends inclusive
    pub fn len(&self) -> usize {
        self.stop_index.saturating_sub(self.start_index) + 1
    }

    pub fn is_degenerate(&self) -> bool {
        self.start_index >= self.stop_index
    }
}
