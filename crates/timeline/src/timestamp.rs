use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Length of one zone cycle in time-units. Zone clocks and replay cursors
/// live in `[0, CYCLE_LENGTH)` and wrap back to zero.
pub const CYCLE_LENGTH: f32 = 120.0;

/// A point on the zone cycle, always inside `[0, CYCLE_LENGTH)`.
///
/// Every constructor is total: out-of-range values are clamped or wrapped and
/// non-finite values collapse to zero. Timestamps originate from internal
/// clock arithmetic, so this single cleanup point is the only sanitization
/// the module performs — no invalid timestamp is representable.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct Timestamp(f32);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0.0);

    /// Build a timestamp by clamping into `[0, CYCLE_LENGTH]`.
    pub fn new(value: f32) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Timestamp(value.clamp(0.0, CYCLE_LENGTH))
    }

    /// Build a timestamp by reducing modulo `CYCLE_LENGTH`.
    pub fn wrap(value: f32) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Timestamp(value.rem_euclid(CYCLE_LENGTH))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Advance by `dt` time-units, wrapping at the cycle boundary.
    #[must_use]
    pub fn advanced(self, dt: f32) -> Self {
        Self::wrap(self.0 + dt)
    }

    /// Forward distance from `self` to `other`, accounting for wraparound.
    /// Always in `[0, CYCLE_LENGTH)`; the distance from a timestamp to
    /// itself is zero.
    pub fn duration_to(self, other: Timestamp) -> f32 {
        (other.0 - self.0).rem_euclid(CYCLE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_into_cycle() {
        assert_eq!(Timestamp::new(-5.0).value(), 0.0);
        assert_eq!(Timestamp::new(60.0).value(), 60.0);
        assert_eq!(Timestamp::new(500.0).value(), CYCLE_LENGTH);
    }

    #[test]
    fn test_wrap_reduces_modulo_cycle() {
        assert_eq!(Timestamp::wrap(CYCLE_LENGTH).value(), 0.0);
        assert_eq!(Timestamp::wrap(CYCLE_LENGTH + 5.0).value(), 5.0);
        assert_eq!(Timestamp::wrap(-1.0).value(), CYCLE_LENGTH - 1.0);
    }

    #[test]
    fn test_non_finite_input_coerces_to_zero() {
        assert_eq!(Timestamp::new(f32::NAN).value(), 0.0);
        assert_eq!(Timestamp::new(f32::INFINITY).value(), 0.0);
        assert_eq!(Timestamp::wrap(f32::NAN).value(), 0.0);
        assert_eq!(Timestamp::wrap(f32::NEG_INFINITY).value(), 0.0);
    }

    #[test]
    fn test_advanced_wraps_at_cycle_boundary() {
        let t = Timestamp::new(CYCLE_LENGTH - 0.5);
        let next = t.advanced(1.0);
        assert!(
            (next.value() - 0.5).abs() < 1e-4,
            "expected wrap to 0.5, got {}",
            next.value()
        );
    }

    #[test]
    fn test_duration_to_accounts_for_wraparound() {
        let a = Timestamp::new(CYCLE_LENGTH - 10.0);
        let b = Timestamp::new(5.0);
        assert!((a.duration_to(b) - 15.0).abs() < 1e-4);
        assert!((b.duration_to(a) - (CYCLE_LENGTH - 15.0)).abs() < 1e-4);
        assert_eq!(a.duration_to(a), 0.0);
    }

    #[test]
    fn test_ordering_within_cycle() {
        assert!(Timestamp::new(3.0) < Timestamp::new(7.0));
        assert!(Timestamp::new(7.0) <= Timestamp::new(7.0));
    }
}
