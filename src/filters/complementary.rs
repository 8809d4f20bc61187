use nalgebra::UnitQuaternion;

use super::{AhrsDiagnostics, AttitudeEstimator};
use crate::config::ComplementaryConfig;
use crate::types::Vec3;

/// Gyro-integrating attitude filter with a fixed accelerometer tilt blend
///
/// Each update integrates the gyroscope, then rotates a fixed fraction
/// (`accel_weight`) of the way toward the tilt implied by the accelerometer.
/// With `accel_weight = 0` the filter is pure gyro integration, which keeps a
/// non-rotating device exactly level regardless of linear acceleration.
/// No gyroscope bias is estimated.
pub struct ComplementaryFilter {
    accel_weight: f64,
    quaternion: UnitQuaternion<f64>,
    accelerometer: Vec3,
    acceleration_error: f64,
    accelerometer_ignored: bool,
}

impl ComplementaryFilter {
    pub fn new(config: &ComplementaryConfig) -> Self {
        Self {
            accel_weight: config.accel_weight,
            quaternion: UnitQuaternion::identity(),
            accelerometer: Vec3::zeros(),
            acceleration_error: 0.0,
            accelerometer_ignored: false,
        }
    }

    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    /// Expected gravity direction in the sensor frame
    fn gravity(&self) -> Vec3 {
        self.quaternion.inverse() * Vec3::z()
    }
}

impl AttitudeEstimator for ComplementaryFilter {
    fn offset_correct(&mut self, gyroscope: Vec3) -> Vec3 {
        gyroscope
    }

    fn update(&mut self, gyroscope: Vec3, accelerometer: Vec3, delta_time: f64) {
        self.accelerometer = accelerometer;

        let rotation = gyroscope.map(f64::to_radians) * delta_time;
        self.quaternion *= UnitQuaternion::from_scaled_axis(rotation);

        let expected = self.gravity();
        self.accelerometer_ignored = true;
        self.acceleration_error = 0.0;
        if let Some(measured) = accelerometer.try_normalize(f64::EPSILON) {
            self.acceleration_error = expected.angle(&measured).to_degrees();
            if self.accel_weight > 0.0 {
                // Rotation taking the expected gravity onto the measured one,
                // in the sensor frame; apply its inverse on the right.
                if let Some(correction) =
                    UnitQuaternion::scaled_rotation_between(&expected, &measured, self.accel_weight)
                {
                    self.quaternion *= correction.inverse();
                }
                self.accelerometer_ignored = false;
            }
        }
    }

    fn euler_angles(&self) -> Vec3 {
        let (roll, pitch, yaw) = self.quaternion.euler_angles();
        Vec3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }

    fn earth_acceleration(&self) -> Vec3 {
        self.quaternion * self.accelerometer - Vec3::z()
    }

    fn diagnostics(&self) -> AhrsDiagnostics {
        AhrsDiagnostics {
            acceleration_error: self.acceleration_error,
            accelerometer_ignored: self.accelerometer_ignored,
            rejection_timer: 0.0,
        }
    }
}
