// pipeline.rs: batch ZUPT dead reckoning
//
// Pure computation over one in-memory sample batch:
//   preprocess → attitude estimation → acceleration conditioning
//   → motion detection ┐
//   → velocity ────────┴→ drift removal → position
//
// No I/O happens here; every run owns its arrays and its estimator, so the
// same input always produces bit-identical output.

use ndarray::{Array2, ArrayView2};

use crate::config::TraceConfig;
use crate::drift::{find_moving_periods, remove_drift};
use crate::error::TraceResult;
use crate::filters::{build_estimator, AhrsDiagnostics, AttitudeEstimator};
use crate::integration::cumulative_trapezoid_axes;
use crate::motion::MotionDetector;
use crate::preprocess::preprocess;
use crate::smoothing::{condition_acceleration, BoxcarSmoother};
use crate::types::{
    row_vec3, set_row_vec3, AxisSeries, MotionFlags, MovingPeriod, RawSeries, Timestamps, AXES,
};

// ─── Output ─────────────────────────────────────────────────────────────────

/// Every intermediate array of one run; only `position` is authoritative
#[derive(Clone, Debug)]
pub struct TraceOutput {
    /// Seconds
    pub timestamps: Timestamps,
    /// Estimator roll/pitch/yaw [degrees], diagnostic only
    pub euler_angles: AxisSeries,
    pub diagnostics: Vec<AhrsDiagnostics>,
    /// Gravity-removed, smoothed earth-frame acceleration [m/s²]
    pub acceleration: AxisSeries,
    pub is_moving: MotionFlags,
    pub moving_periods: Vec<MovingPeriod>,
    /// Drift-corrected velocity [m/s]
    pub velocity: AxisSeries,
    /// Position [m]
    pub position: AxisSeries,
}

impl TraceOutput {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

// ─── Attitude stage ─────────────────────────────────────────────────────────

struct AttitudeTrace {
    euler_angles: AxisSeries,
    earth_acceleration: AxisSeries,
    diagnostics: Vec<AhrsDiagnostics>,
}

/// Drive the estimator once per sample, strictly in timestamp order
fn run_estimator(
    estimator: &mut dyn AttitudeEstimator,
    gyro: &AxisSeries,
    accel: &AxisSeries,
    delta_time: &[f64],
) -> AttitudeTrace {
    let n = delta_time.len();
    let mut euler_angles = AxisSeries::zeros((n, AXES));
    let mut earth_acceleration = AxisSeries::zeros((n, AXES));
    let mut diagnostics = Vec::with_capacity(n);

    for (index, &dt) in delta_time.iter().enumerate() {
        let corrected = estimator.offset_correct(row_vec3(gyro, index));
        estimator.update(corrected, row_vec3(accel, index), dt);

        set_row_vec3(&mut euler_angles, index, &estimator.euler_angles());
        set_row_vec3(&mut earth_acceleration, index, &estimator.earth_acceleration());
        diagnostics.push(estimator.diagnostics());
    }

    AttitudeTrace {
        euler_angles,
        earth_acceleration,
        diagnostics,
    }
}

// ─── The tracer ─────────────────────────────────────────────────────────────

pub struct PositionTracer {
    config: TraceConfig,
}

impl PositionTracer {
    pub fn new(config: TraceConfig) -> TraceResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Trace with a fresh estimator built from the configuration
    pub fn trace(&self, raw: &RawSeries) -> TraceResult<TraceOutput> {
        let mut estimator = build_estimator(&self.config);
        self.trace_with(raw, estimator.as_mut())
    }

    /// Trace with a caller-supplied estimator, which must not have seen samples yet
    pub fn trace_with(
        &self,
        raw: &RawSeries,
        estimator: &mut dyn AttitudeEstimator,
    ) -> TraceResult<TraceOutput> {
        let config = &self.config;
        let series = preprocess(raw)?;
        let timestamps = series.timestamp.clone();
        let delta_time = series.delta_time().to_vec();

        let attitude = run_estimator(estimator, &series.gyro, &series.accel, &delta_time);
        let ignored = attitude
            .diagnostics
            .iter()
            .filter(|d| d.accelerometer_ignored)
            .count();
        if ignored > 0 {
            log::warn!(
                "estimator ignored the accelerometer for {} of {} samples",
                ignored,
                series.len()
            );
        }

        let smoother = BoxcarSmoother::new(config.smoothing_window);
        let acceleration =
            condition_acceleration(&attitude.earth_acceleration, config.gravity, &smoother);

        let detector = MotionDetector::new(config.motion_threshold, config.motion_margin());
        let is_moving = detector.detect(&acceleration);

        let mut velocity = cumulative_trapezoid_axes(&acceleration, timestamps.view())?;

        let moving_periods = find_moving_periods(&is_moving);
        let corrected = remove_drift(&mut velocity, timestamps.view(), &moving_periods)?;
        if moving_periods.is_empty() && is_moving.iter().any(|&m| m) {
            log::warn!("motion detected but no complete moving period; velocity left uncorrected");
        }
        log::debug!("drift removed over {} moving periods", corrected);

        let mut position = cumulative_trapezoid_axes(&velocity, timestamps.view())?;
        if config.loop_closure {
            close_loop(&mut position);
        }

        log::info!(
            "traced {} samples, {} moving periods",
            timestamps.len(),
            moving_periods.len()
        );

        Ok(TraceOutput {
            timestamps,
            euler_angles: attitude.euler_angles,
            diagnostics: attitude.diagnostics,
            acceleration,
            is_moving,
            moving_periods,
            velocity,
            position,
        })
    }
}

/// Force the last position sample onto the first
fn close_loop(position: &mut AxisSeries) {
    let n = position.nrows();
    if n < 2 {
        return;
    }
    let first = position.row(0).to_owned();
    position.row_mut(n - 1).assign(&first);
}

/// Validate an (N, 10) table and return its (N, 3) position trajectory
pub fn trace_position(table: ArrayView2<f64>, config: &TraceConfig) -> TraceResult<Array2<f64>> {
    let tracer = PositionTracer::new(config.clone())?;
    let raw = RawSeries::from_table(table)?;
    Ok(tracer.trace(&raw)?.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComplementaryConfig, EstimatorKind};
    use crate::error::TraceError;
    use approx::assert_abs_diff_eq;

    const RATE: f64 = 400.0;
    const G: f64 = 9.81;

    /// (n, 10) table at 400 Hz, level and non-rotating, with x acceleration `accel_x(t)` [m/s²]
    fn level_table(n: usize, accel_x: impl Fn(f64) -> f64) -> Array2<f64> {
        let mut table = Array2::<f64>::zeros((n, 10));
        for i in 0..n {
            let t = i as f64 / RATE;
            table[[i, 0]] = t * 1000.0;
            table[[i, 1]] = accel_x(t) / G;
            table[[i, 3]] = 1.0;
        }
        table
    }

    fn gyro_only_config() -> TraceConfig {
        TraceConfig {
            estimator: EstimatorKind::Complementary,
            complementary: ComplementaryConfig { accel_weight: 0.0 },
            ..Default::default()
        }
    }

    fn trace(table: &Array2<f64>, config: TraceConfig) -> TraceOutput {
        let raw = RawSeries::from_table(table.view()).unwrap();
        PositionTracer::new(config).unwrap().trace(&raw).unwrap()
    }

    /// Rest 0.5 s, ramp to 2 m/s² over 0.1 s, hold 0.5 s, ramp down 0.1 s, rest
    fn single_pulse(t: f64) -> f64 {
        match t {
            t if t < 0.5 => 0.0,
            t if t < 0.6 => 20.0 * (t - 0.5),
            t if t < 1.1 => 2.0,
            t if t < 1.2 => 2.0 - 20.0 * (t - 1.1),
            _ => 0.0,
        }
    }

    /// Rest 0.5 s, push at 2 m/s² then brake at -2 m/s², rest; travels ~0.1517 m
    fn move_and_stop(t: f64) -> f64 {
        match t {
            t if t < 0.5 => 0.0,
            t if t < 0.55 => 40.0 * (t - 0.5),
            t if t < 0.8 => 2.0,
            t if t < 1.05 => -2.0,
            t if t < 1.1 => -40.0 * (1.1 - t),
            _ => 0.0,
        }
    }

    #[test]
    fn test_zero_motion_gives_zero_trajectory() {
        let table = level_table(400, |_| 0.0);
        let output = trace(&table, TraceConfig::default());
        assert!(output.velocity.iter().all(|&v| v == 0.0));
        assert!(output.position.iter().all(|&p| p == 0.0));
        assert!(output.moving_periods.is_empty());
        assert_eq!(output.position.dim(), (400, 3));
    }

    #[test]
    fn test_single_pulse_period_and_boundaries() {
        let table = level_table(800, single_pulse);
        let output = trace(&table, gyro_only_config());

        assert_eq!(output.moving_periods.len(), 1);
        let period = output.moving_periods[0];
        let t_start = output.timestamps[period.start_index];
        let t_stop = output.timestamps[period.stop_index];
        // |a| > 1.5 between 0.575 s and 1.125 s, widened by the 20 ms margin
        assert!((0.54..=0.58).contains(&t_start), "start {}", t_start);
        assert!((1.13..=1.16).contains(&t_stop), "stop {}", t_stop);

        for axis in 0..AXES {
            assert_eq!(output.velocity[[period.start_index, axis]], 0.0);
            assert_eq!(output.velocity[[period.stop_index, axis]], 0.0);
        }
        for i in period.start_index..=period.stop_index {
            assert!(output.velocity[[i, 0]].abs() < 0.1, "v[{}]", i);
        }
        // the pulse never decelerates, so raw velocity persists after the period
        assert!(output.velocity[[output.len() - 1, 0]] > 1.0);
    }

    #[test]
    fn test_move_and_stop_displacement() {
        let table = level_table(800, move_and_stop);
        let output = trace(&table, gyro_only_config());

        assert_eq!(output.moving_periods.len(), 1);
        let last = output.len() - 1;
        assert_abs_diff_eq!(output.velocity[[last, 0]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output.position[[last, 0]], 0.1517, epsilon = 0.015);
        assert_eq!(output.position[[last, 1]], 0.0);
        assert_eq!(output.position[[last, 2]], 0.0);
    }

    #[test]
    fn test_no_period_leaves_raw_velocity() {
        // 1 m/s² never crosses the 1.5 m/s² threshold
        let table = level_table(400, |t| if (0.3..0.6).contains(&t) { 1.0 } else { 0.0 });
        let output = trace(&table, gyro_only_config());

        assert!(output.is_moving.iter().all(|&m| !m));
        let raw_velocity =
            cumulative_trapezoid_axes(&output.acceleration, output.timestamps.view()).unwrap();
        assert_eq!(output.velocity, raw_velocity);
    }

    #[test]
    fn test_loop_closure() {
        let table = level_table(800, single_pulse);
        let config = TraceConfig {
            loop_closure: true,
            ..gyro_only_config()
        };
        let output = trace(&table, config);
        let last = output.len() - 1;
        assert_eq!(output.position.row(last), output.position.row(0));
        // only the final sample is overridden
        assert!(output.position[[last - 1, 0]] > 0.5);
    }

    #[test]
    fn test_deterministic_with_fusion_estimator() {
        let table = level_table(600, |t| 3.0 * (t * 9.0).sin());
        let first = trace(&table, TraceConfig::default());
        let second = trace(&table, TraceConfig::default());
        assert_eq!(first.position, second.position);
        assert_eq!(first.velocity, second.velocity);
        assert_eq!(first.is_moving, second.is_moving);
    }

    #[test]
    fn test_single_sample() {
        let table = level_table(1, |_| 0.0);
        let output = trace(&table, TraceConfig::default());
        assert_eq!(output.position.dim(), (1, 3));
        assert!(output.position.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_trace_position_validates_first() {
        let mut table = level_table(40, |_| 0.0);
        table[[10, 0]] = table[[9, 0]];
        assert!(matches!(
            trace_position(table.view(), &TraceConfig::default()),
            Err(TraceError::NonMonotonicTimestamp { row: 10, .. })
        ));

        let narrow = Array2::<f64>::zeros((5, 7));
        assert!(matches!(
            trace_position(narrow.view(), &TraceConfig::default()),
            Err(TraceError::ColumnCount { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TraceConfig {
            smoothing_window: 0,
            ..Default::default()
        };
        assert!(PositionTracer::new(config).is_err());
    }

    #[test]
    fn test_trace_position_matches_tracer() {
        let table = level_table(800, move_and_stop);
        let config = gyro_only_config();
        let position = trace_position(table.view(), &config).unwrap();
        assert_eq!(position, trace(&table, config).position);
    }
}
