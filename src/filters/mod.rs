//! Attitude estimators
//!
//! The drift-correction core only sees the [`AttitudeEstimator`] contract, so
//! any fusion algorithm (Fusion-style AHRS, complementary, Mahony, Kalman)
//! can be swapped in without touching the rest of the pipeline.

pub mod ahrs;
pub mod complementary;
pub mod offset;

use serde::{Deserialize, Serialize};

use crate::config::{EstimatorKind, TraceConfig};
use crate::types::Vec3;

pub use ahrs::FusionAhrs;
pub use complementary::ComplementaryFilter;
pub use offset::GyroOffset;

/// Per-sample estimator diagnostics, recorded but never acted on by the core
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AhrsDiagnostics {
    /// Angle between measured and expected gravity [degrees]
    pub acceleration_error: f64,
    /// Accelerometer was not used for this update
    pub accelerometer_ignored: bool,
    /// Acceleration rejection timer [samples]
    pub rejection_timer: f64,
}

/// Stateful sensor-fusion collaborator, driven once per sample in timestamp order
pub trait AttitudeEstimator {
    /// Remove the estimated constant gyroscope bias [deg/s]
    fn offset_correct(&mut self, gyroscope: Vec3) -> Vec3;

    /// Advance the orientation estimate by one sample
    ///
    /// * `gyroscope` - bias-corrected rate [deg/s]
    /// * `accelerometer` - sensor-frame specific force [g]
    /// * `delta_time` - seconds since the previous sample (0 for the first)
    fn update(&mut self, gyroscope: Vec3, accelerometer: Vec3, delta_time: f64);

    /// Roll, pitch, yaw [degrees]
    fn euler_angles(&self) -> Vec3;

    /// Gravity-removed acceleration in the earth frame [g]
    fn earth_acceleration(&self) -> Vec3;

    fn diagnostics(&self) -> AhrsDiagnostics;
}

/// Fresh estimator for one pipeline run
pub fn build_estimator(config: &TraceConfig) -> Box<dyn AttitudeEstimator> {
    match config.estimator {
        EstimatorKind::Fusion => Box::new(FusionAhrs::new(&config.ahrs, config.sample_rate_hz)),
        EstimatorKind::Complementary => Box::new(ComplementaryFilter::new(&config.complementary)),
    }
}
