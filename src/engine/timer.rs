// src/engine/timer.rs

use chrono::{DateTime, Utc};

/// Countdown for a timed attempt.
///
/// Remaining time is always derived from the wall-clock start
/// timestamp, never accumulated by decrementing a counter. A runtime
/// that pauses ticking (backgrounded tab, suspended process) therefore
/// cannot make the countdown drift: the next derivation reflects the
/// full elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    started_at: DateTime<Utc>,
    time_limit_minutes: Option<i32>,
}

impl Countdown {
    pub fn new(started_at: DateTime<Utc>, time_limit_minutes: Option<i32>) -> Self {
        Self {
            started_at,
            time_limit_minutes,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit_minutes.is_some()
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    /// Seconds left on the clock, clamped at zero. `None` for an
    /// untimed attempt (inert countdown).
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.time_limit_minutes
            .map(|limit| (i64::from(limit) * 60 - self.elapsed_seconds(now)).max(0))
    }

    /// An untimed countdown never expires.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == Some(0)
    }

    /// Seconds the candidate has spent, for the final report: capped at
    /// the time limit when timed, plain wall-clock elapsed otherwise.
    pub fn time_spent_seconds(&self, now: DateTime<Utc>) -> i64 {
        match (self.time_limit_minutes, self.remaining_seconds(now)) {
            (Some(limit), Some(remaining)) => i64::from(limit) * 60 - remaining,
            _ => self.elapsed_seconds(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::{Clock, ManualClock};
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        "2026-01-10T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn untimed_countdown_is_inert() {
        let countdown = Countdown::new(start(), None);
        let later = start() + Duration::hours(5);
        assert_eq!(countdown.remaining_seconds(later), None);
        assert!(!countdown.expired(later));
        assert_eq!(countdown.time_spent_seconds(later), 5 * 3600);
    }

    #[test]
    fn remaining_is_derived_from_wall_clock() {
        let countdown = Countdown::new(start(), Some(10));
        assert_eq!(countdown.remaining_seconds(start()), Some(600));
        assert_eq!(
            countdown.remaining_seconds(start() + Duration::seconds(90)),
            Some(510)
        );
    }

    /// Simulated tab suspension: no ticks are delivered while the
    /// clock advances, yet the next derivation reflects the full delta.
    #[test]
    fn remaining_reflects_suspension() {
        let clock = ManualClock::starting_at(start());
        let countdown = Countdown::new(clock.now(), Some(10));

        assert_eq!(countdown.remaining_seconds(clock.now()), Some(600));

        // 7 minutes pass with no intermediate observation.
        clock.advance(Duration::minutes(7));
        assert_eq!(countdown.remaining_seconds(clock.now()), Some(180));
    }

    #[test]
    fn remaining_clamps_at_zero_after_expiry() {
        let countdown = Countdown::new(start(), Some(10));
        let way_past = start() + Duration::minutes(25);
        assert_eq!(countdown.remaining_seconds(way_past), Some(0));
        assert!(countdown.expired(way_past));
        // Time spent is capped at the limit, not the overshoot.
        assert_eq!(countdown.time_spent_seconds(way_past), 600);
    }

    #[test]
    fn expires_exactly_at_the_limit() {
        let countdown = Countdown::new(start(), Some(10));
        assert!(!countdown.expired(start() + Duration::seconds(599)));
        assert!(countdown.expired(start() + Duration::seconds(600)));
    }
}
