//! Alarm cooldown policy

use std::time::{Duration, Instant};
use tracing::debug;

/// Default minimum time between two alarms for the same session
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Decides whether a condition that is currently active may raise an alarm.
///
/// The policy itself is stateless; the caller owns the `last_fired`
/// timestamp so one policy can serve many sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmPolicy {
    cooldown: Duration,
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl AlarmPolicy {
    /// Create a policy with the given cooldown
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Create a policy from a cooldown in (fractional) seconds.
    ///
    /// Negative or NaN values mean no cooldown; values too large for a
    /// `Duration` saturate.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if seconds.is_nan() || seconds <= 0.0 {
            return Self::new(Duration::ZERO);
        }
        Self::new(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Check if an alarm may fire at `now`.
    ///
    /// Never having fired always allows it; otherwise strictly more than the
    /// cooldown must have elapsed.
    pub fn should_fire(&self, last_fired: Option<Instant>, now: Instant) -> bool {
        match last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
        }
    }

    /// Fire if allowed, recording `now` as the last firing time
    pub fn try_fire(&self, last_fired: &mut Option<Instant>, now: Instant) -> bool {
        if !self.should_fire(*last_fired, now) {
            debug!("Alarm suppressed: in cooldown period");
            return false;
        }
        *last_fired = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn test_first_alarm_fires_immediately() {
        let policy = AlarmPolicy::default();
        let mut last = None;
        let now = Instant::now();

        assert!(policy.try_fire(&mut last, now));
        assert_eq!(last, Some(now));
    }

    #[test]
    fn test_deduplication() {
        let policy = AlarmPolicy::default();
        let t0 = Instant::now();
        let mut last = None;

        assert!(policy.try_fire(&mut last, t0));
        assert!(!policy.try_fire(&mut last, t0 + Duration::from_secs(2)));
        assert_eq!(last, Some(t0));
    }

    #[test]
    fn test_cooldown_is_exclusive() {
        let policy = AlarmPolicy::default();
        let t0 = Instant::now();

        assert!(!policy.should_fire(Some(t0), t0 + DEFAULT_COOLDOWN));
        assert!(policy.should_fire(Some(t0), t0 + DEFAULT_COOLDOWN + Duration::from_millis(1)));
    }

    #[test]
    fn test_clock_going_backwards_never_fires() {
        let policy = AlarmPolicy::default();
        let t0 = Instant::now() + Duration::from_secs(60);
        assert!(!policy.should_fire(Some(t0), t0 - Duration::from_secs(30)));
    }

    #[test]
    fn test_from_secs_f64() {
        assert_eq!(AlarmPolicy::from_secs_f64(5.0), AlarmPolicy::default());
        assert_eq!(AlarmPolicy::from_secs_f64(-1.0).cooldown(), Duration::ZERO);
        assert_eq!(AlarmPolicy::from_secs_f64(f64::NAN).cooldown(), Duration::ZERO);
    }

    #[test]
    fn test_from_secs_f64_saturates() {
        assert_eq!(AlarmPolicy::from_secs_f64(1e20).cooldown(), Duration::MAX);
        assert_eq!(AlarmPolicy::from_secs_f64(f64::INFINITY).cooldown(), Duration::MAX);

        let policy = AlarmPolicy::from_secs_f64(1e20);
        let t0 = Instant::now();
        let mut last = None;
        assert!(policy.try_fire(&mut last, t0));
        assert!(!policy.try_fire(&mut last, t0 + Duration::from_secs(3600)));
    }

    proptest! {
        #[test]
        fn prop_last_fired_only_moves_forward(steps in vec(0u64..8000, 1..50)) {
            let policy = AlarmPolicy::default();
            let mut now = Instant::now();
            let mut last: Option<Instant> = None;

            for step in steps {
                now += Duration::from_millis(step);
                let before = last;
                policy.try_fire(&mut last, now);
                if let (Some(b), Some(a)) = (before, last) {
                    prop_assert!(a >= b);
                }
            }
        }
    }
}
