//! Throughput metrics derived from a running or finished session.
//!
//! "Units" are streamed fragments that carried text, not real tokenizer
//! tokens; the rate is a display approximation and is labelled as such by the
//! UI layer.

use serde::Serialize;

/// Units per second, rounded to two decimal places.
///
/// Returns `None` when either input is zero: a rate computed over zero
/// elapsed time or zero units is meaningless (and, for elapsed, undefined).
pub fn rate_per_second(elapsed_ms: u64, unit_count: u64) -> Option<f64> {
    if elapsed_ms == 0 || unit_count == 0 {
        return None;
    }
    Some((unit_count as f64 / elapsed_ms as f64 * 1000.0 * 100.0).round() / 100.0)
}

/// Snapshot of a session's metrics, taken per update and at termination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionMetrics {
    /// Milliseconds since the session started.
    pub elapsed_ms: u64,
    /// Fragments that carried text so far.
    pub unit_count: u64,
    /// Units per second, when computable.
    pub rate_per_second: Option<f64>,
    /// Milliseconds from start to the first text fragment.
    pub first_unit_ms: Option<u64>,
}

impl SessionMetrics {
    pub fn snapshot(elapsed_ms: u64, unit_count: u64, first_unit_ms: Option<u64>) -> Self {
        Self {
            elapsed_ms,
            unit_count,
            rate_per_second: rate_per_second(elapsed_ms, unit_count),
            first_unit_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_undefined_without_time_or_units() {
        assert_eq!(rate_per_second(0, 10), None);
        assert_eq!(rate_per_second(1500, 0), None);
        assert_eq!(rate_per_second(0, 0), None);
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        assert_eq!(rate_per_second(2000, 10), Some(5.0));
        assert_eq!(rate_per_second(3000, 7), Some(2.33));
        assert_eq!(rate_per_second(1, 1), Some(1000.0));
        assert_eq!(rate_per_second(333, 1), Some(3.0));
    }

    #[test]
    fn snapshot_carries_the_rate_rule() {
        let m = SessionMetrics::snapshot(0, 5, None);
        assert_eq!(m.rate_per_second, None);
        let m = SessionMetrics::snapshot(1000, 5, Some(120));
        assert_eq!(m.rate_per_second, Some(5.0));
        assert_eq!(m.first_unit_ms, Some(120));
    }
}
