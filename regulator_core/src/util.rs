//! Small numeric and time helpers for regulator_core.

use std::time::Duration;

/// Signed fractional difference of `reference` relative to `measured`.
#[inline]
pub fn percent_difference(measured: f64, reference: f64) -> f64 {
    (reference - measured) / measured
}

/// True when `current` is within `bound` (fractional) of `final_setpoint`.
///
/// A zero or non-finite measurement never counts as converged.
#[inline]
pub fn is_converged(final_setpoint: f64, current: f64, bound: f64) -> bool {
    let diff = percent_difference(current, final_setpoint);
    diff.is_finite() && diff.abs() < bound
}

/// Convert seconds to a `Duration`, clamping nonsense to at least 1 ms.
pub fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs)
        .unwrap_or(Duration::from_millis(1))
        .max(Duration::from_millis(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converged_examples() {
        assert!(is_converged(100.0, 97.0, 0.05));
        assert!((percent_difference(97.0, 100.0) - 0.0309).abs() < 1e-4);
        assert!(!is_converged(100.0, 90.0, 0.05));
        assert!((percent_difference(90.0, 100.0) - 0.111).abs() < 1e-3);
    }

    #[test]
    fn zero_measurement_is_not_converged() {
        assert!(!is_converged(100.0, 0.0, 0.05));
        assert!(!is_converged(100.0, f64::NAN, 0.05));
    }

    #[test]
    fn secs_to_duration_guards() {
        assert_eq!(secs_to_duration(2.0), Duration::from_secs(2));
        assert_eq!(secs_to_duration(-1.0), Duration::from_millis(1));
        assert_eq!(secs_to_duration(f64::NAN), Duration::from_millis(1));
    }
}
