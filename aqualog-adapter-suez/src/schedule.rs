//! Connection scheduling
//!
//! One pass runs at a time; after each terminal pass the next instant is
//! programmed here. A successful pass books tomorrow's early-morning
//! catch-up slot, a failed one retries in an hour. Both carry a 0-59 minute
//! jitter taken from the sub-second part of the clock so a fleet of
//! installations does not hit the portal in step.

use chrono::{DateTime, Duration, Local, Timelike};
use tracing::debug;

/// Next-connection policy.
#[derive(Debug, Clone)]
pub struct Schedule {
    next_connection: DateTime<Local>,
    catchup_hour: u32,
}

impl Schedule {
    /// New schedule, due immediately.
    pub fn new(now: DateTime<Local>, catchup_hour: u32) -> Self {
        Self {
            next_connection: now,
            catchup_hour,
        }
    }

    /// Whether a pass should run now.
    pub fn due(&self, now: DateTime<Local>) -> bool {
        now >= self.next_connection
    }

    pub fn next_connection(&self) -> DateTime<Local> {
        self.next_connection
    }

    /// Program a retry in an hour, used after a failed pass.
    pub fn retry_soon(&mut self, now: DateTime<Local>) -> DateTime<Local> {
        self.program(now + Duration::hours(1), now)
    }

    /// Book tomorrow's slot at the configured catch-up hour.
    pub fn catch_up_tomorrow(&mut self, now: DateTime<Local>) -> DateTime<Local> {
        let tomorrow = now + Duration::days(1);
        let slot = tomorrow
            .with_hour(self.catchup_hour)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(tomorrow);
        self.program(slot, now)
    }

    fn program(&mut self, base: DateTime<Local>, now: DateTime<Local>) -> DateTime<Local> {
        self.next_connection = base + Duration::minutes(jitter_minutes(now));
        debug!(next = %self.next_connection, "next connection scheduled");
        self.next_connection
    }
}

/// 0-59 minutes derived from the hundredths of a second of `now`.
fn jitter_minutes(now: DateTime<Local>) -> i64 {
    i64::from(now.nanosecond() / 10_000_000) % 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_nanos(nanos: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 15, 12, 30, 0)
            .unwrap()
            .with_nanosecond(nanos)
            .unwrap()
    }

    #[test]
    fn test_retry_lands_within_one_to_two_hours() {
        let now = at_nanos(123_456_789);
        let mut schedule = Schedule::new(now, 5);
        let next = schedule.retry_soon(now);

        assert!(next >= now + Duration::hours(1));
        assert!(next < now + Duration::hours(2));
        // 123_456_789 ns is 12 hundredths of a second
        assert_eq!(next, now + Duration::hours(1) + Duration::minutes(12));
    }

    #[test]
    fn test_catchup_lands_tomorrow_morning() {
        let now = at_nanos(987_654_321);
        let mut schedule = Schedule::new(now, 5);
        let next = schedule.catch_up_tomorrow(now);

        assert_eq!(next.hour(), 5);
        // 98 hundredths of a second is 38 minutes of jitter
        assert_eq!(next.minute(), 38);
        assert_eq!(next.date_naive(), now.date_naive() + Duration::days(1));
    }

    #[test]
    fn test_due_gate() {
        let now = at_nanos(0);
        let mut schedule = Schedule::new(now, 5);
        assert!(schedule.due(now));

        schedule.retry_soon(now);
        assert!(!schedule.due(now));
        assert!(schedule.due(now + Duration::hours(2)));
    }
}
