//! Time and duration conversion utilities.
//!
//! This module provides safe conversion functions for durations,
//! avoiding truncation issues with explicit saturation behavior.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Convert duration to milliseconds as i64, saturating at `i64::MAX`.
    ///
    /// Useful for epoch-millisecond arithmetic on persisted timestamps.
    fn as_millis_i64(&self) -> i64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Convert fractional seconds (as reported by subtitle payloads) to whole
/// milliseconds, rounding to the nearest millisecond.
///
/// Negative, NaN and infinite inputs map to 0; values past `u64::MAX` ms saturate.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn secs_f64_to_millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    let millis = (secs * 1000.0).round();
    if millis >= u64::MAX as f64 {
        u64::MAX
    } else {
        millis as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis_u64() {
        let duration = Duration::from_millis(1234);
        assert_eq!(duration.as_millis_u64(), 1234);
    }

    #[test]
    fn test_as_millis_i64() {
        let duration = Duration::from_millis(5000);
        assert_eq!(duration.as_millis_i64(), 5000);
    }

    #[test]
    fn test_as_millis_i64_zero() {
        assert_eq!(Duration::ZERO.as_millis_i64(), 0);
    }

    #[test]
    fn test_secs_to_millis_rounds() {
        assert_eq!(secs_f64_to_millis(12.3456), 12346);
        assert_eq!(secs_f64_to_millis(0.0004), 0);
        assert_eq!(secs_f64_to_millis(1.0), 1000);
    }

    #[test]
    fn test_secs_to_millis_invalid_inputs() {
        assert_eq!(secs_f64_to_millis(-3.0), 0);
        assert_eq!(secs_f64_to_millis(f64::NAN), 0);
        assert_eq!(secs_f64_to_millis(f64::INFINITY), 0);
    }
}
