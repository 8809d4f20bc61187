//! Moving / stationary classification
//!
//! A sample is moving when its acceleration magnitude exceeds the threshold.
//! The flags are then widened by two in-place passes over the same sequence:
//!
//! 1. forward, `i = 0 .. N - margin`: `flag[i] = any(flag[i .. i + margin])`
//! 2. backward, `i = N - 1 down to margin + 1`: `flag[i] = any(flag[i - margin .. i])`
//!
//! The backward pass reads the output of the forward pass and excludes the
//! sample itself, so the result is an asymmetric dilation. For a lone moving
//! sample at `k` the final run is `k - margin + 2 ..= k + margin`.

use crate::types::{row_norm, AxisSeries, MotionFlags};

pub struct MotionDetector {
    threshold: f64,
    margin: usize,
}

impl MotionDetector {
    /// * `threshold` - acceleration magnitude above which a sample is moving [m/s²]
    /// * `margin` - dilation width in samples
    pub fn new(threshold: f64, margin: usize) -> Self {
        Self { threshold, margin }
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Classify and dilate in one go
    pub fn detect(&self, acceleration: &AxisSeries) -> MotionFlags {
        let mut flags = self.classify(acceleration);
        let raw_count = count(&flags);
        self.dilate_forward(&mut flags);
        self.dilate_backward(&mut flags);
        log::debug!(
            "motion: {} raw moving samples, {} after dilation (margin {})",
            raw_count,
            count(&flags),
            self.margin
        );
        flags
    }

    /// `‖a[i]‖ > threshold`
    pub fn classify(&self, acceleration: &AxisSeries) -> MotionFlags {
        acceleration
            .rows()
            .into_iter()
            .map(|row| row_norm(row) > self.threshold)
            .collect()
    }

    /// Leading margin: each flag becomes the OR of itself and the next `margin - 1`
    pub fn dilate_forward(&self, flags: &mut [bool]) {
        let n = flags.len();
        for i in 0..n.saturating_sub(self.margin) {
            flags[i] = flags[i..i + self.margin].iter().any(|&f| f);
        }
    }

    /// Trailing margin: each flag becomes the OR of the `margin` flags before it
    pub fn dilate_backward(&self, flags: &mut [bool]) {
        let n = flags.len();
        for i in (self.margin + 1..n).rev() {
            flags[i] = flags[i - self.margin..i].iter().any(|&f| f);
        }
    }
}

fn count(flags: &[bool]) -> usize {
    flags.iter().filter(|&&f| f).count()
}
