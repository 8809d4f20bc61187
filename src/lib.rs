//! Dead-reckoning position tracing for inertial sample batches
//!
//! A recorded batch of accelerometer, gyroscope and orientation samples is
//! turned into a position trajectory by integrating earth-frame acceleration
//! twice, with zero-velocity updates applied around every detected moving
//! burst to cancel the velocity drift that plain integration accumulates.
//!
//! ```no_run
//! use zupt_trace::{load_samples, PositionTracer, TraceConfig};
//!
//! # fn main() -> Result<(), zupt_trace::TraceError> {
//! let raw = load_samples(std::path::Path::new("walk.json"))?;
//! let output = PositionTracer::new(TraceConfig::default())?.trace(&raw)?;
//! println!("{} moving periods", output.moving_periods.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drift;
pub mod error;
pub mod filters;
pub mod integration;
pub mod io;
pub mod motion;
pub mod pipeline;
pub mod preprocess;
pub mod smoothing;
pub mod types;

pub use config::{AhrsConfig, ComplementaryConfig, EstimatorKind, TraceConfig};
pub use error::{TraceError, TraceResult};
pub use filters::{build_estimator, AhrsDiagnostics, AttitudeEstimator};
pub use io::{load_samples, write_positions, TraceSummary};
pub use pipeline::{trace_position, PositionTracer, TraceOutput};
pub use types::{MovingPeriod, RawSeries, SampleSeries};
