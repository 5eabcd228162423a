//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a rate in Hz into a period in seconds.
///
/// Returns `None` for non-positive or non-finite rates.
pub fn rate_to_period_s(rate_hz: f64) -> Option<f64> {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        Some(1.0 / rate_hz)
    }
    else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }

    #[test]
    fn test_rate_to_period() {
        assert_eq!(rate_to_period_s(50.0), Some(0.02));
        assert_eq!(rate_to_period_s(0.0), None);
        assert_eq!(rate_to_period_s(-1.0), None);
        assert_eq!(rate_to_period_s(f64::NAN), None);
    }
}
