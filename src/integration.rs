//! Numerical integration and interpolation over sample-indexed arrays
//!
//! These replace library cumulative/definite integration so each step of the
//! dead-reckoning chain can be tested on its own.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{TraceError, TraceResult};

fn check_lengths(values: usize, timestamps: usize) -> TraceResult<()> {
    if values != timestamps {
        return Err(TraceError::LengthMismatch(format!(
            "{} values against {} timestamps",
            values, timestamps
        )));
    }
    Ok(())
}

/// Definite trapezoidal integral of `values` over `timestamps`
///
/// A single sample integrates to 0.
pub fn trapezoid(values: ArrayView1<f64>, timestamps: ArrayView1<f64>) -> TraceResult<f64> {
    check_lengths(values.len(), timestamps.len())?;
    let mut total = 0.0;
    for i in 1..values.len() {
        total += (values[i] + values[i - 1]) / 2.0 * (timestamps[i] - timestamps[i - 1]);
    }
    Ok(total)
}

/// Running trapezoidal integral with initial value 0 at index 0
///
/// `out[i] = out[i-1] + (y[i] + y[i-1]) / 2 * (t[i] - t[i-1])`
pub fn cumulative_trapezoid(
    values: ArrayView1<f64>,
    timestamps: ArrayView1<f64>,
) -> TraceResult<Array1<f64>> {
    check_lengths(values.len(), timestamps.len())?;
    let mut out = Array1::<f64>::zeros(values.len());
    for i in 1..values.len() {
        out[i] = out[i - 1] + (values[i] + values[i - 1]) / 2.0 * (timestamps[i] - timestamps[i - 1]);
    }
    Ok(out)
}

/// Column-wise [`cumulative_trapezoid`] of an (N, k) array
pub fn cumulative_trapezoid_axes(
    series: &Array2<f64>,
    timestamps: ArrayView1<f64>,
) -> TraceResult<Array2<f64>> {
    check_lengths(series.nrows(), timestamps.len())?;
    let mut out = Array2::<f64>::zeros(series.raw_dim());
    for (axis, column) in series.axis_iter(Axis(1)).enumerate() {
        let integrated = cumulative_trapezoid(column, timestamps)?;
        out.column_mut(axis).assign(&integrated);
    }
    Ok(out)
}

/// Straight line through `(t0, y0)` and `(t1, y1)` evaluated at `t`
///
/// Written as a weighted sum so the endpoints are reproduced exactly:
/// `t == t0` yields `y0` and `t == t1` yields `y1` bit-for-bit.
pub fn interpolate_linear(t0: f64, y0: f64, t1: f64, y1: f64, t: f64) -> f64 {
    let w = (t - t0) / (t1 - t0);
    y0 * (1.0 - w) + y1 * w
}
