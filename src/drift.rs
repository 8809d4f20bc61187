//! Zero-velocity drift removal
//!
//! The device is assumed at rest immediately before and after every detected
//! moving burst. Over each burst the straight line joining the boundary
//! velocities is treated as accumulated integration drift and subtracted,
//! which pins velocity to exactly zero at both ends. Samples outside every
//! burst keep their raw integrated velocity.

use ndarray::ArrayView1;

use crate::error::{TraceError, TraceResult};
use crate::integration::interpolate_linear;
use crate::types::{AxisSeries, MovingPeriod, AXES};

/// Rising (+1) / falling (-1) edges of the motion flags; the last entry is 0
pub fn edges(flags: &[bool]) -> Vec<i8> {
    let mut diff = vec![0i8; flags.len()];
    for i in 0..flags.len().saturating_sub(1) {
        diff[i] = flags[i + 1] as i8 - flags[i] as i8;
    }
    diff
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    WaitingStart,
    WaitingStop { start_index: usize },
}

/// Pair each rising edge with the next falling edge
///
/// A rising edge with no falling edge before the end of the batch is dropped.
/// A batch that starts already moving has no rising edge for its first burst,
/// so that burst is not corrected either.
pub fn find_moving_periods(flags: &[bool]) -> Vec<MovingPeriod> {
    let mut periods = Vec::new();
    let mut state = ScanState::WaitingStart;

    for (index, edge) in edges(flags).into_iter().enumerate() {
        state = match state {
            ScanState::WaitingStart if edge == 1 => ScanState::WaitingStop { start_index: index },
            ScanState::WaitingStop { start_index } if edge == -1 => {
                periods.push(MovingPeriod {
                    start_index,
                    stop_index: index,
                });
                ScanState::WaitingStart
            }
            unchanged => unchanged,
        };
    }

    if let ScanState::WaitingStop { start_index } = state {
        log::debug!("discarding unterminated moving period starting at {}", start_index);
    }
    periods
}

/// Subtract the linear drift model of every period from `velocity` in place
///
/// Degenerate periods (`start_index >= stop_index`) are skipped. Returns the
/// number of periods actually corrected.
pub fn remove_drift(
    velocity: &mut AxisSeries,
    timestamps: ArrayView1<f64>,
    periods: &[MovingPeriod],
) -> TraceResult<usize> {
    let n = velocity.nrows();
    if timestamps.len() != n {
        return Err(TraceError::LengthMismatch(format!(
            "{} velocity rows against {} timestamps",
            n,
            timestamps.len()
        )));
    }

    let mut corrected = 0;
    for period in periods {
        if period.is_degenerate() {
            log::debug!("skipping degenerate moving period {:?}", period);
            continue;
        }
        if period.stop_index >= n {
            return Err(TraceError::LengthMismatch(format!(
                "moving period {:?} exceeds {} samples",
                period, n
            )));
        }

        let (s, e) = (period.start_index, period.stop_index);
        let (t0, t1) = (timestamps[s], timestamps[e]);
        for axis in 0..AXES {
            let (v0, v1) = (velocity[[s, axis]], velocity[[e, axis]]);
            for i in s..=e {
                velocity[[i, axis]] -= interpolate_linear(t0, v0, t1, v1, timestamps[i]);
            }
        }
        corrected += 1;
    }
    Ok(corrected)
}
