use chrono::{DateTime, Duration, FixedOffset, NaiveTime};

use crate::prayer_times::timing::local_datetime;

/// Next local midnight after `now`, pushed back by `grace` so the day has
/// really turned over when the timer fires.
pub fn next_rollover(now: DateTime<FixedOffset>, grace: Duration) -> DateTime<FixedOffset> {
    let today = now.date_naive();
    let tonight = local_datetime(today, NaiveTime::MIN, *now.offset()) + grace;
    if tonight > now {
        return tonight;
    }
    let tomorrow = today.succ_opt().unwrap_or(today);
    local_datetime(tomorrow, NaiveTime::MIN, *now.offset()) + grace
}

/// Once-a-day timer. The deadline is always recomputed from the wall clock
/// when the timer fires, never by adding a fixed day to the last deadline, so
/// a suspended process that wakes late still lands on the following midnight.
#[derive(Debug, Clone, Copy)]
pub struct RolloverTimer {
    grace: Duration,
    next: DateTime<FixedOffset>,
}

impl RolloverTimer {
    pub fn arm(now: DateTime<FixedOffset>, grace: Duration) -> Self {
        let next = next_rollover(now, grace);
        log::debug!("next rollover at {next}");
        Self { grace, next }
    }

    pub fn deadline(&self) -> DateTime<FixedOffset> {
        self.next
    }

    /// `true` once per deadline; re-arms itself when it fires.
    pub fn poll(&mut self, now: DateTime<FixedOffset>) -> bool {
        if now < self.next {
            return false;
        }
        *self = Self::arm(now, self.grace);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2026, 5, d, h, m, s).unwrap()
    }

    #[test]
    fn targets_next_midnight_plus_grace() {
        assert_eq!(next_rollover(at(10, 21, 30, 0), Duration::seconds(5)), at(11, 0, 0, 5));
    }

    #[test]
    fn inside_grace_still_targets_tonight() {
        assert_eq!(next_rollover(at(10, 0, 0, 2), Duration::seconds(5)), at(10, 0, 0, 5));
        assert_eq!(next_rollover(at(10, 0, 0, 5), Duration::seconds(5)), at(11, 0, 0, 5));
    }

    #[test]
    fn fires_once_then_rearms_for_the_following_day() {
        let mut timer = RolloverTimer::arm(at(10, 23, 59, 0), Duration::seconds(5));
        assert!(!timer.poll(at(11, 0, 0, 4)));
        assert!(timer.poll(at(11, 0, 0, 5)));
        assert!(!timer.poll(at(11, 0, 0, 6)));
        assert_eq!(timer.deadline(), at(12, 0, 0, 5));
    }

    #[test]
    fn late_wakeup_reschedules_from_the_wall_clock() {
        let mut timer = RolloverTimer::arm(at(10, 12, 0, 0), Duration::seconds(5));
        // suspended for two and a half days
        assert!(timer.poll(at(13, 6, 0, 0)));
        assert_eq!(timer.deadline(), at(14, 0, 0, 5));
    }
}
