use ndarray::{Array1, ArrayView1, Axis};

use crate::types::AxisSeries;

/// Box-car (moving-average) smoothing over a complete batch
///
/// Centred convolution with a uniform kernel, output the same length as the
/// input; samples beyond either end count as zero, so the first and last
/// `window / 2` outputs are pulled toward zero.
pub struct BoxcarSmoother {
    window_size: usize,
    weight: f64,
}

impl BoxcarSmoother {
    /// Create a smoother with the given window (15 in the default pipeline)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        BoxcarSmoother {
            window_size,
            weight: 1.0 / window_size as f64,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Smooth one channel
    pub fn apply(&self, values: ArrayView1<f64>) -> Array1<f64> {
        let n = values.len() as isize;
        let w = self.window_size as isize;
        // kernel centre for a 'same'-length convolution; even windows lean left
        let lead = (w - 1) / 2;
        let mut out = Array1::<f64>::zeros(values.len());

        for i in 0..n {
            let hi = i + lead;
            let lo = hi - (w - 1);
            let mut sum = 0.0;
            for k in lo.max(0)..=hi.min(n - 1) {
                sum += values[k as usize] * self.weight;
            }
            out[i as usize] = sum;
        }
        out
    }

    /// Smooth every column of an (N, k) array independently
    pub fn apply_axes(&self, series: &AxisSeries) -> AxisSeries {
        let mut out = AxisSeries::zeros(series.raw_dim());
        for (axis, column) in series.axis_iter(Axis(1)).enumerate() {
            out.column_mut(axis).assign(&self.apply(column));
        }
        out
    }
}

/// Earth-frame acceleration in g → smoothed acceleration in m/s²
pub fn condition_acceleration(
    earth_acceleration_g: &AxisSeries,
    gravity: f64,
    smoother: &BoxcarSmoother,
) -> AxisSeries {
    let scaled = earth_acceleration_g.mapv(|a| a * gravity);
    smoother.apply_axes(&scaled)
}
