//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for `sent_at` and latency reporting.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Elapsed milliseconds between two instants, clamped at zero.
#[must_use]
pub fn elapsed_ms(since: Timestamp, until: Timestamp) -> i64 {
    (until - since).max(TimeDelta::zero()).num_milliseconds()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_measure_elapsed_milliseconds() {
        let start = now();
        let end = start + TimeDelta::milliseconds(1500);
        assert_eq!(elapsed_ms(start, end), 1500);
    }

    #[test]
    fn should_clamp_negative_elapsed_to_zero() {
        let start = now();
        let end = start - TimeDelta::seconds(3);
        assert_eq!(elapsed_ms(start, end), 0);
    }
}
