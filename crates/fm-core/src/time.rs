//! Time utilities for FleetMon
//!
//! Provides the timestamp and label helpers used by the registry and the
//! update settings.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in seconds.
///
/// # Panics
/// Panics if the system time is before the Unix epoch (1970-01-01),
/// which would indicate a severely misconfigured system.
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_secs()
}

/// Calculate elapsed time as a Duration since a given second timestamp.
///
/// Returns Duration::ZERO if the given time is in the future.
pub fn elapsed_since(since_secs: u64) -> Duration {
    Duration::from_secs(current_time_secs().saturating_sub(since_secs))
}

/// Format a Unix timestamp as a "HH:MM:SS" wall-clock label (UTC).
///
/// History points are charted by time of day, so the date is dropped.
pub fn clock_label(timestamp_secs: u64) -> String {
    let secs = timestamp_secs % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3_600,
        (secs % 3_600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_secs_is_positive() {
        assert!(current_time_secs() > 0);
    }

    #[test]
    fn test_elapsed_since_future_time() {
        let future = current_time_secs() + 1_000_000;
        assert_eq!(elapsed_since(future), Duration::ZERO);
    }

    #[test]
    fn test_clock_label_format() {
        // 1970-01-01 01:02:03 UTC
        assert_eq!(clock_label(3_723), "01:02:03");
        assert_eq!(clock_label(0), "00:00:00");
        // Day boundary wraps
        assert_eq!(clock_label(86_400 + 59), "00:00:59");
    }
}
