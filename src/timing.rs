//! Wall-clock instrumentation around a single call.

use std::time::Instant;

use chrono::Local;
use tracing::info;

/// Runs `op`, logging a start marker, an end marker, and the elapsed time.
///
/// The return value of `op` is passed through untouched, so errors still
/// propagate to the caller after the end marker has been logged.
pub fn timed<T>(label: &str, op: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    info!(operation = label, at = %Local::now().format("%H:%M:%S"), "Start");

    let result = op();

    let elapsed = start.elapsed();
    info!(operation = label, at = %Local::now().format("%H:%M:%S"), "End");
    info!(
        operation = label,
        elapsed_secs = %format!("{:.2}", elapsed.as_secs_f64()),
        "Elapsed"
    );

    result
}
