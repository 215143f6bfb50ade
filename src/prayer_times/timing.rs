//! Pure schedule arithmetic. Nothing in here reads the clock; callers pass
//! "now" in so that results are reproducible.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Alarm, PrayerType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule has no time for {0}")]
    MissingPrayer(PrayerType),
    #[error("bad time '{value}' for {prayer}")]
    BadTime { prayer: PrayerType, value: String },
}

/// One local time-of-day for each of the five prayers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    times: [NaiveTime; 5],
}

impl Schedule {
    pub fn new(fajr: NaiveTime, dhuhr: NaiveTime, asr: NaiveTime, maghrib: NaiveTime, isha: NaiveTime) -> Self {
        Self { times: [fajr, dhuhr, asr, maghrib, isha] }
    }

    /// Build a schedule from provider output (`"Fajr" -> "05:12"`).
    ///
    /// Keys that are not one of the five prayers (Sunrise, Midnight, ...) are
    /// ignored. Values may carry a suffix such as `"05:12 (PKT)"`; only the
    /// leading `HH:MM` is read. A missing prayer is an error, never a default.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Result<Self, ScheduleError> {
        let mut found: [Option<NaiveTime>; 5] = [None; 5];
        for (key, value) in raw {
            let Ok(prayer) = PrayerType::from_str(key) else {
                continue;
            };
            found[prayer as usize] = Some(parse_hhmm(prayer, value)?);
        }

        let pick = |p: PrayerType| found[p as usize].ok_or(ScheduleError::MissingPrayer(p));
        Ok(Self {
            times: [
                pick(PrayerType::Fajr)?,
                pick(PrayerType::Dhuhr)?,
                pick(PrayerType::Asr)?,
                pick(PrayerType::Maghrib)?,
                pick(PrayerType::Isha)?,
            ],
        })
    }

    pub fn time(&self, prayer: PrayerType) -> NaiveTime {
        self.times[prayer as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrayerType, NaiveTime)> + '_ {
        PrayerType::all().into_iter().map(|p| (p, self.time(p)))
    }
}

fn parse_hhmm(prayer: PrayerType, value: &str) -> Result<NaiveTime, ScheduleError> {
    let token = value.split_whitespace().next().unwrap_or("");
    NaiveTime::parse_from_str(token, "%H:%M").map_err(|_| ScheduleError::BadTime {
        prayer,
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPrayer {
    pub prayer: PrayerType,
    pub at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

/// Resolve a wall-clock time on `date` in `tz` to an instant.
pub fn local_datetime(date: NaiveDate, time: NaiveTime, tz: FixedOffset) -> DateTime<FixedOffset> {
    let utc = date.and_time(time) - Duration::seconds(tz.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, tz)
}

/// The first prayer still ahead of `now` today, or tomorrow's Fajr once Isha
/// has passed. A prayer whose time equals `now` counts as passed.
pub fn next_occurrence(schedule: &Schedule, now: DateTime<FixedOffset>) -> NextPrayer {
    let tz = *now.offset();
    let today = now.date_naive();

    for (prayer, time) in schedule.iter() {
        let at = local_datetime(today, time, tz);
        if at > now {
            return NextPrayer { prayer, at };
        }
    }

    let tomorrow = today.succ_opt().unwrap_or(today);
    NextPrayer {
        prayer: PrayerType::Fajr,
        at: local_datetime(tomorrow, schedule.time(PrayerType::Fajr), tz),
    }
}

/// [`next_occurrence`] straight from provider output, reporting an
/// incomplete schedule instead of guessing.
pub fn next_occurrence_raw(
    raw: &BTreeMap<String, String>,
    now: DateTime<FixedOffset>,
) -> Result<NextPrayer, ScheduleError> {
    Schedule::from_raw(raw).map(|schedule| next_occurrence(&schedule, now))
}

/// Whole hours, minutes and seconds left until `target`; zero once it is reached.
pub fn countdown_parts(target: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> Countdown {
    let millis = (target - now).num_milliseconds();
    if millis <= 0 {
        return Countdown::default();
    }
    Countdown {
        hours: millis / 3_600_000,
        minutes: (millis % 3_600_000) / 60_000,
        seconds: (millis % 60_000) / 1000,
    }
}

/// Today's absolute alarm for every prayer on `date`.
pub fn alarms_for_day(schedule: &Schedule, date: NaiveDate, tz: FixedOffset) -> Vec<Alarm> {
    schedule
        .iter()
        .map(|(name, time)| Alarm {
            name,
            time: local_datetime(date, time, tz).timestamp_millis(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn schedule() -> Schedule {
        Schedule::new(hm(5, 0), hm(12, 30), hm(15, 45), hm(18, 10), hm(19, 40))
    }

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn picks_first_prayer_still_ahead() {
        let next = next_occurrence(&schedule(), at(13, 0, 0));
        assert_eq!(next.prayer, PrayerType::Asr);
        assert_eq!(next.at, at(15, 45, 0));
    }

    #[test]
    fn exact_equality_counts_as_passed() {
        let next = next_occurrence(&schedule(), at(12, 30, 0));
        assert_eq!(next.prayer, PrayerType::Asr);
    }

    #[test]
    fn rolls_over_to_tomorrows_fajr_after_isha() {
        let next = next_occurrence(&schedule(), at(21, 0, 0));
        assert_eq!(next.prayer, PrayerType::Fajr);
        assert_eq!(next.at, tz().with_ymd_and_hms(2026, 3, 15, 5, 0, 0).unwrap());
    }

    #[test]
    fn always_yields_a_result_not_in_the_past() {
        let start = at(0, 0, 0);
        for step in 0..(24 * 60 / 7 + 1) {
            let now = start + Duration::minutes(step * 7) + Duration::seconds(step % 60);
            let next = next_occurrence(&schedule(), now);
            assert!(next.at > now, "{next:?} not after {now}");
            if next.at.date_naive() == now.date_naive() {
                assert!(next.at.time() >= now.time());
            } else {
                assert_eq!(next.prayer, PrayerType::Fajr);
            }
        }
    }

    #[test]
    fn countdown_decomposes_hours_minutes_seconds() {
        let now = at(10, 0, 0);
        let parts = countdown_parts(now + Duration::milliseconds(3_661_000), now);
        assert_eq!(parts, Countdown { hours: 1, minutes: 1, seconds: 1 });
    }

    #[test]
    fn countdown_clamps_to_zero_for_past_targets() {
        let now = at(10, 0, 0);
        assert_eq!(countdown_parts(now - Duration::seconds(5), now), Countdown::default());
        assert_eq!(countdown_parts(now, now), Countdown::default());
    }

    #[test]
    fn raw_schedule_ignores_extra_keys_and_suffixes() {
        let schedule = Schedule::from_raw(&raw(&[
            ("Fajr", "05:00 (PKT)"),
            ("Sunrise", "06:20"),
            ("Dhuhr", "12:30"),
            ("Asr", "15:45"),
            ("Maghrib", "18:10"),
            ("Isha", "19:40"),
            ("Midnight", "00:25"),
        ]))
        .unwrap();
        assert_eq!(schedule, self::schedule());
    }

    #[test]
    fn missing_prayer_is_reported_not_skipped() {
        let result = next_occurrence_raw(
            &raw(&[("Fajr", "05:00"), ("Dhuhr", "12:30"), ("Asr", "15:45"), ("Isha", "19:40")]),
            at(9, 0, 0),
        );
        assert_eq!(result, Err(ScheduleError::MissingPrayer(PrayerType::Maghrib)));
    }

    #[test]
    fn unparseable_time_is_reported() {
        let err = Schedule::from_raw(&raw(&[("Fajr", "dawn")])).unwrap_err();
        assert!(matches!(err, ScheduleError::BadTime { prayer: PrayerType::Fajr, .. }));
    }

    #[test]
    fn alarms_use_local_date_and_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let alarms = alarms_for_day(&schedule(), date, tz());
        assert_eq!(alarms.len(), 5);
        assert_eq!(alarms[0].name, PrayerType::Fajr);
        assert_eq!(alarms[0].time, at(5, 0, 0).timestamp_millis());
        assert_eq!(alarms[4].time, at(19, 40, 0).timestamp_millis());
    }
}
