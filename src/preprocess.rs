//! Unit conversion and orientation/gyroscope conditioning
//!
//! Converts the recorder's units (ms, rad) into the degree/second units the
//! attitude estimators expect, then replaces the gyroscope channel with the
//! sample-to-sample difference of a smoothed orientation.

use ndarray::Array1;

use crate::error::{TraceError, TraceResult};
use crate::integration::trapezoid;
use crate::types::{AxisSeries, RawSeries, SampleSeries, AXES};

const MS_PER_SECOND: f64 = 1000.0;

/// Run the full conditioning step on a validated batch
pub fn preprocess(raw: &RawSeries) -> TraceResult<SampleSeries> {
    if raw.is_empty() {
        return Err(TraceError::EmptyInput);
    }
    let timestamp: Array1<f64> = raw.timestamp_ms.mapv(|t| t / MS_PER_SECOND);
    let gyro_deg = raw.gyro_rad.mapv(f64::to_degrees);
    let orientation_deg = raw.orientation_rad.mapv(f64::to_degrees);

    let orientation = smooth_orientation(&orientation_deg, &gyro_deg, &timestamp)?;
    let gyro = orientation_rate(&orientation, &gyro_deg);

    log::debug!(
        "preprocessed {} samples spanning {:.3} s",
        timestamp.len(),
        timestamp[timestamp.len() - 1] - timestamp[0]
    );

    Ok(SampleSeries {
        timestamp,
        accel: raw.accel.clone(),
        gyro,
        orientation,
    })
}

/// Average the supplied orientation with the gyroscope integral, per axis
///
/// The gyroscope rate is integrated over the whole batch into one scalar per
/// axis, and that same scalar is averaged into every sample:
/// `orientation[i] = (orientation[i] + integral[axis]) / 2`.
/// This is a constant offset per axis, not a running integral.
// TODO: switch to a cumulative gyro integral once recorded sessions confirm
// the constant per-axis offset is unintended.
pub fn smooth_orientation(
    orientation_deg: &AxisSeries,
    gyro_deg: &AxisSeries,
    timestamp: &Array1<f64>,
) -> TraceResult<AxisSeries> {
    let mut smoothed = orientation_deg.clone();
    for axis in 0..AXES {
        let integral = trapezoid(gyro_deg.column(axis), timestamp.view())?;
        smoothed
            .column_mut(axis)
            .mapv_inplace(|angle| (angle + integral) / 2.0);
    }
    Ok(smoothed)
}

/// Per-sample difference of the smoothed orientation
///
/// The first sample differences against the original first gyroscope reading,
/// so there is no leading edge artifact. The result is a per-sample angle
/// step; it is not divided by the sample interval.
pub fn orientation_rate(orientation: &AxisSeries, gyro_deg: &AxisSeries) -> AxisSeries {
    let mut rate = AxisSeries::zeros(orientation.raw_dim());
    let n = orientation.nrows();
    for axis in 0..AXES {
        if n == 0 {
            break;
        }
        rate[[0, axis]] = orientation[[0, axis]] - gyro_deg[[0, axis]];
        for i in 1..n {
            rate[[i, axis]] = orientation[[i, axis]] - orientation[[i - 1, axis]];
        }
    }
    rate
}
