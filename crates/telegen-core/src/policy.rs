//! Emission policy: when to flush the open batch and when the run is over.
//!
//! Both checks are pure. Every ceiling is independent and OR'd with the
//! others; a zero ceiling is disabled.

use std::time::Duration;

use crate::config::BatchLimits;

/// Whether the open batch must be flushed now.
///
/// - batching window elapsed (`since_last_flush >= batching`)
/// - batch bytes strictly above `max_batch_bytes`
/// - batch records at or above `max_batch_records`
/// - total records at or above `max_total_records`
pub fn should_flush(
    since_last_flush: Duration,
    batch_bytes: u64,
    batch_records: u64,
    total_records: u64,
    limits: &BatchLimits,
) -> bool {
    (!limits.batching.is_zero() && since_last_flush >= limits.batching)
        || (limits.max_batch_bytes > 0 && batch_bytes > limits.max_batch_bytes)
        || (limits.max_batch_records > 0 && batch_records >= limits.max_batch_records)
        || (limits.max_total_records > 0 && total_records >= limits.max_total_records)
}

/// Whether the run has reached its total-record or runtime ceiling
pub fn is_run_complete(elapsed: Duration, total_records: u64, limits: &BatchLimits) -> bool {
    (limits.max_total_records > 0 && total_records >= limits.max_total_records)
        || (!limits.max_runtime.is_zero() && elapsed >= limits.max_runtime)
}
