use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};

// ─── Attitude estimator settings ────────────────────────────────────────────

/// Which attitude estimator the pipeline instantiates per run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    #[default]
    Fusion,
    Complementary,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AhrsConfig {
    /// Fusion gain once initialisation has finished
    pub gain: f64,
    /// Accelerometer rejection threshold [degrees], 0 disables rejection
    pub acceleration_rejection: f64,
    /// Magnetometer rejection threshold [degrees]; the magnetometer is never fused
    pub magnetic_rejection: f64,
    /// Rejection timeout [seconds], converted to samples with the sample rate
    pub rejection_timeout_secs: f64,
}

impl Default for AhrsConfig {
    fn default() -> Self {
        Self {
            gain: 0.5,
            acceleration_rejection: 10.0,
            magnetic_rejection: 0.0,
            rejection_timeout_secs: 5.0,
        }
    }
}

impl AhrsConfig {
    /// Rejection timeout in samples (`5 × sample_rate` by default)
    pub fn recovery_trigger_period(&self, sample_rate_hz: f64) -> u32 {
        (self.rejection_timeout_secs * sample_rate_hz) as u32
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplementaryConfig {
    /// Fraction of the accelerometer tilt error corrected per update (0 = gyro only)
    pub accel_weight: f64,
}

impl Default for ComplementaryConfig {
    fn default() -> Self {
        Self { accel_weight: 0.02 }
    }
}

// ─── Pipeline configuration ─────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    // ── Sampling ──
    pub sample_rate_hz: f64,

    // ── Acceleration conditioning ──
    pub gravity: f64,
    pub smoothing_window: usize,

    // ── Motion detection ──
    pub motion_threshold: f64,
    pub motion_margin_secs: f64,

    // ── Position policy ──
    /// Force the last position equal to the first
    pub loop_closure: bool,

    // ── Attitude estimation ──
    pub estimator: EstimatorKind,
    pub ahrs: AhrsConfig,
    pub complementary: ComplementaryConfig,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 400.0,
            gravity: 9.81,
            smoothing_window: 15,
            motion_threshold: 1.5,
            motion_margin_secs: 0.02,
            loop_closure: false,
            estimator: EstimatorKind::Fusion,
            ahrs: AhrsConfig::default(),
            complementary: ComplementaryConfig::default(),
        }
    }
}

impl TraceConfig {
    /// Load a (possibly partial) JSON config; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> TraceResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: TraceConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Dilation margin in samples (20 ms at 400 Hz = 8)
    pub fn motion_margin(&self) -> usize {
        (self.motion_margin_secs * self.sample_rate_hz).floor() as usize
    }

    pub fn validate(&self) -> TraceResult<()> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "sample_rate_hz must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "gravity must be positive, got {}",
                self.gravity
            )));
        }
        if self.smoothing_window == 0 {
            return Err(TraceError::InvalidConfig(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        if !(self.motion_threshold.is_finite() && self.motion_threshold >= 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "motion_threshold must be non-negative, got {}",
                self.motion_threshold
            )));
        }
        if !self.motion_margin_secs.is_finite() || self.motion_margin() == 0 {
            return Err(TraceError::InvalidConfig(format!(
                "motion margin of {} s is shorter than one sample at {} Hz",
                self.motion_margin_secs, self.sample_rate_hz
            )));
        }
        if !(self.ahrs.gain.is_finite() && self.ahrs.gain >= 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "ahrs.gain must be non-negative, got {}",
                self.ahrs.gain
            )));
        }
        if !(self.ahrs.rejection_timeout_secs.is_finite() && self.ahrs.rejection_timeout_secs >= 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "ahrs.rejection_timeout_secs must be non-negative, got {}",
                self.ahrs.rejection_timeout_secs
            )));
        }
        let weight = self.complementary.accel_weight;
        if !(0.0..=1.0).contains(&weight) {
            return Err(TraceError::InvalidConfig(format!(
                "complementary.accel_weight must be within [0, 1], got {}",
                weight
            )));
        }
        Ok(())
    }
}
