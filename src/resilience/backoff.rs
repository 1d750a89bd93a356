//! Exponential backoff.

use std::time::Duration;

/// Calculate the delay before the attempt that follows `attempt`.
///
/// `min(base * multiplier^(attempt-1), max)`, attempt numbering starting
/// at 1. Deterministic so the delay sequence is predictable.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, multiplier: f64) -> Duration {
    if attempt == 0 || base_ms == 0 {
        return Duration::from_millis(0);
    }

    let exponent = attempt.saturating_sub(1).min(1024) as i32;
    let factor = multiplier.max(1.0).powi(exponent);
    let delay_ms = (base_ms as f64 * factor).min(max_ms as f64);

    Duration::from_millis(delay_ms as u64)
}
