use crate::types::Vec3;

const CUTOFF_FREQUENCY: f64 = 0.02; // Hz
const TIMEOUT_SECONDS: f64 = 5.0;
const THRESHOLD: f64 = 3.0; // deg/s

/// Runtime gyroscope bias estimation
///
/// While every axis stays under 3 deg/s for 5 s the bias estimate is
/// low-pass filtered toward the corrected reading; any larger rate resets
/// the stationary timer.
#[derive(Debug, Clone, Copy)]
pub struct GyroOffset {
    filter_coefficient: f64,
    /// Stationary samples required before estimation starts
    timeout: u32,
    timer: u32,
    gyroscope_offset: Vec3,
}

impl GyroOffset {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            filter_coefficient: 2.0 * std::f64::consts::PI * CUTOFF_FREQUENCY / sample_rate_hz,
            timeout: (TIMEOUT_SECONDS * sample_rate_hz) as u32,
            timer: 0,
            gyroscope_offset: Vec3::zeros(),
        }
    }

    /// Return the bias-corrected reading, refining the bias when stationary
    pub fn update(&mut self, gyroscope: Vec3) -> Vec3 {
        let corrected = gyroscope - self.gyroscope_offset;

        if corrected.iter().any(|rate| rate.abs() > THRESHOLD) {
            self.timer = 0;
            return corrected;
        }

        if self.timer < self.timeout {
            self.timer += 1;
            return corrected;
        }

        self.gyroscope_offset += corrected * self.filter_coefficient;
        corrected
    }

    pub fn offset(&self) -> Vec3 {
        self.gyroscope_offset
    }

    pub fn is_active(&self) -> bool {
        self.timer >= self.timeout
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }
}
