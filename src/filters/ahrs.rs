//! Gain-ramped complementary AHRS (gyroscope + accelerometer, NWU earth frame)
//!
//! Starts with a high gain that ramps down to the configured gain over the
//! initialisation period, rejects the accelerometer while its error exceeds
//! the rejection threshold, and forces it back in after the rejection
//! timeout. The magnetometer is never fused, so heading is held at zero
//! during initialisation.

use nalgebra::{Quaternion, UnitQuaternion};

use super::offset::GyroOffset;
use super::{AhrsDiagnostics, AttitudeEstimator};
use crate::config::AhrsConfig;
use crate::types::Vec3;

const INITIAL_GAIN: f64 = 10.0;
const INITIALISATION_PERIOD: f64 = 3.0; // seconds
const RECOVERY_DECREMENT: i64 = 9;

pub struct FusionAhrs {
    gain: f64,
    /// `(0.5 * sin(threshold))^2`, or `f64::MAX` when rejection is disabled
    acceleration_rejection_squared: f64,
    recovery_trigger_period: i64,

    quaternion: UnitQuaternion<f64>,
    accelerometer: Vec3,
    initialising: bool,
    ramped_gain: f64,
    ramped_gain_step: f64,
    half_accelerometer_feedback: Vec3,
    accelerometer_ignored: bool,
    acceleration_recovery_trigger: i64,
    acceleration_recovery_timeout: i64,

    offset: GyroOffset,
}

impl FusionAhrs {
    pub fn new(config: &AhrsConfig, sample_rate_hz: f64) -> Self {
        let recovery_trigger_period = config.recovery_trigger_period(sample_rate_hz) as i64;

        let acceleration_rejection_squared = if config.acceleration_rejection == 0.0
            || config.gain == 0.0
            || recovery_trigger_period == 0
        {
            f64::MAX
        } else {
            (0.5 * config.acceleration_rejection.to_radians().sin()).powi(2)
        };

        Self {
            gain: config.gain,
            acceleration_rejection_squared,
            recovery_trigger_period,
            quaternion: UnitQuaternion::identity(),
            accelerometer: Vec3::zeros(),
            initialising: true,
            ramped_gain: INITIAL_GAIN,
            ramped_gain_step: (INITIAL_GAIN - config.gain) / INITIALISATION_PERIOD,
            half_accelerometer_feedback: Vec3::zeros(),
            accelerometer_ignored: false,
            acceleration_recovery_trigger: 0,
            acceleration_recovery_timeout: recovery_trigger_period,
            offset: GyroOffset::new(sample_rate_hz),
        }
    }

    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    pub fn is_initialising(&self) -> bool {
        self.initialising
    }

    /// Unit gravity direction in the sensor frame
    pub fn gravity(&self) -> Vec3 {
        self.half_gravity() * 2.0
    }

    /// Accelerometer reading with gravity removed, sensor frame [g]
    pub fn linear_acceleration(&self) -> Vec3 {
        self.accelerometer - self.gravity()
    }

    fn half_gravity(&self) -> Vec3 {
        let q = self.quaternion.as_ref();
        let (qw, qx, qy, qz) = (q.w, q.i, q.j, q.k);
        // third column of the rotation matrix transposed, halved
        Vec3::new(
            qx * qz - qw * qy,
            qy * qz + qw * qx,
            qw * qw - 0.5 + qz * qz,
        )
    }

    fn feedback(sensor: Vec3, reference: Vec3) -> Vec3 {
        let cross = sensor.cross(&reference);
        if sensor.dot(&reference) < 0.0 {
            // opposing vectors: full-magnitude correction
            safe_normalize(cross)
        } else {
            cross
        }
    }

    fn integrate(&mut self, half_gyroscope: Vec3, delta_time: f64) {
        let rate = Quaternion::from_parts(0.0, half_gyroscope);
        let derivative = self.quaternion.as_ref() * rate;
        let next = self.quaternion.as_ref() + derivative * delta_time;
        self.quaternion = UnitQuaternion::from_quaternion(next);
    }

    fn zero_heading(&mut self) {
        let (roll, pitch, _) = self.quaternion.euler_angles();
        self.quaternion = UnitQuaternion::from_euler_angles(roll, pitch, 0.0);
    }
}

impl AttitudeEstimator for FusionAhrs {
    fn offset_correct(&mut self, gyroscope: Vec3) -> Vec3 {
        self.offset.update(gyroscope)
    }

    fn update(&mut self, gyroscope: Vec3, accelerometer: Vec3, delta_time: f64) {
        self.accelerometer = accelerometer;

        if self.initialising {
            self.ramped_gain -= self.ramped_gain_step * delta_time;
            if self.ramped_gain < self.gain || self.gain == 0.0 {
                self.ramped_gain = self.gain;
                self.initialising = false;
            }
        }

        let half_gravity = self.half_gravity();

        let mut half_accelerometer_feedback = Vec3::zeros();
        self.accelerometer_ignored = true;
        if accelerometer.norm() > 0.0 {
            self.half_accelerometer_feedback =
                Self::feedback(safe_normalize(accelerometer), half_gravity);

            if self.initialising
                || self.half_accelerometer_feedback.norm_squared()
                    <= self.acceleration_rejection_squared
            {
                self.accelerometer_ignored = false;
                self.acceleration_recovery_trigger -= RECOVERY_DECREMENT;
            } else {
                self.acceleration_recovery_trigger += 1;
            }

            if self.acceleration_recovery_trigger > self.acceleration_recovery_timeout {
                self.acceleration_recovery_timeout = 0;
                self.accelerometer_ignored = false;
            } else {
                self.acceleration_recovery_timeout = self.recovery_trigger_period;
            }
            self.acceleration_recovery_trigger = self
                .acceleration_recovery_trigger
                .clamp(0, self.recovery_trigger_period);

            if !self.accelerometer_ignored {
                half_accelerometer_feedback = self.half_accelerometer_feedback * 0.5;
            }
        }

        let half_gyroscope = gyroscope.map(f64::to_radians) * 0.5;
        let adjusted = half_gyroscope + half_accelerometer_feedback * self.ramped_gain;
        self.integrate(adjusted, delta_time);

        if self.initialising {
            self.zero_heading();
        }
    }

    fn euler_angles(&self) -> Vec3 {
        let (roll, pitch, yaw) = self.quaternion.euler_angles();
        Vec3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }

    fn earth_acceleration(&self) -> Vec3 {
        self.quaternion * self.linear_acceleration()
    }

    fn diagnostics(&self) -> AhrsDiagnostics {
        let sine = (2.0 * self.half_accelerometer_feedback.norm()).min(1.0);
        AhrsDiagnostics {
            acceleration_error: sine.asin().to_degrees(),
            accelerometer_ignored: self.accelerometer_ignored,
            rejection_timer: self.acceleration_recovery_trigger as f64,
        }
    }
}

fn safe_normalize(v: Vec3) -> Vec3 {
    v.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::zeros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DT: f64 = 1.0 / 400.0;

    fn ahrs() -> FusionAhrs {
        FusionAhrs::new(&AhrsConfig::default(), 400.0)
    }

    fn settle(ahrs: &mut FusionAhrs, accel: Vec3, samples: usize) {
        for _ in 0..samples {
            ahrs.update(Vec3::zeros(), accel, DT);
        }
    }

    #[test]
    fn test_starts_level_and_initialising() {
        let ahrs = ahrs();
        assert!(ahrs.is_initialising());
        assert_abs_diff_eq!(ahrs.gravity().z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_initialisation_finishes_after_ramp() {
        let mut ahrs = ahrs();
        settle(&mut ahrs, Vec3::new(0.0, 0.0, 1.0), 4 * 400);
        assert!(!ahrs.is_initialising());
    }

    #[test]
    fn test_level_rest_has_zero_earth_acceleration() {
        let mut ahrs = ahrs();
        settle(&mut ahrs, Vec3::new(0.0, 0.0, 1.0), 400);
        assert!(ahrs.earth_acceleration().norm() < 1e-12);
        assert!(!ahrs.diagnostics().accelerometer_ignored);
    }

    #[test]
    fn test_converges_to_tilt() {
        // gravity along +y in the sensor frame: 90 degrees of roll
        let mut ahrs = ahrs();
        settle(&mut ahrs, Vec3::new(0.0, 1.0, 0.0), 4 * 400);
        let gravity = ahrs.gravity();
        assert_abs_diff_eq!(gravity.y, 1.0, epsilon = 1e-3);
        assert!(ahrs.earth_acceleration().norm() < 1e-3);
    }

    #[test]
    fn test_rejects_large_acceleration_after_initialisation() {
        let mut ahrs = ahrs();
        settle(&mut ahrs, Vec3::new(0.0, 0.0, 1.0), 4 * 400);

        ahrs.update(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0), DT);
        let diagnostics = ahrs.diagnostics();
        assert!(diagnostics.accelerometer_ignored);
        assert_abs_diff_eq!(diagnostics.acceleration_error, 45.0, epsilon = 0.5);
        assert_eq!(diagnostics.rejection_timer, 1.0);
    }

    #[test]
    fn test_rejection_times_out() {
        let config = AhrsConfig {
            rejection_timeout_secs: 0.1, // 40 samples at 400 Hz
            ..Default::default()
        };
        let mut ahrs = FusionAhrs::new(&config, 400.0);
        settle(&mut ahrs, Vec3::new(0.0, 0.0, 1.0), 4 * 400);

        let mut forced_back = false;
        for _ in 0..100 {
            ahrs.update(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0), DT);
            if !ahrs.diagnostics().accelerometer_ignored {
                forced_back = true;
                break;
            }
        }
        assert!(forced_back);
    }

    #[test]
    fn test_gyro_integration_yaw() {
        // 90 deg/s about z for 1 s, after initialisation so heading is free
        let mut ahrs = ahrs();
        settle(&mut ahrs, Vec3::new(0.0, 0.0, 1.0), 4 * 400);
        for _ in 0..400 {
            ahrs.update(Vec3::new(0.0, 0.0, 90.0), Vec3::new(0.0, 0.0, 1.0), DT);
        }
        assert_abs_diff_eq!(ahrs.euler_angles().z, 90.0, epsilon = 0.5);
    }
}
