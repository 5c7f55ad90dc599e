//! # Utility module

use std::time::Duration;

/// Compute total time in seconds and average time in milliseconds.
pub fn calc_perf(times: &[Duration]) -> (f32, f32) {
    let total = times.iter().map(Duration::as_secs_f32).sum::<f32>();
    let len = times.len();

    let len = if len > 0 { len as f32 } else { 1.0 };

    (total, total * 1000.0 / len)
}

/// Frames per second for a single step duration.
///
/// A zero duration reports zero instead of infinity.
pub fn step_fps(elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        1.0 / secs
    } else {
        0.0
    }
}
