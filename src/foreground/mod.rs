pub mod sound;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use rusqlite::Connection;
use std::collections::BTreeMap;

use crate::background::{ForegroundLink, ToBackground};
use crate::db::repository::MetaRepo;
use crate::models::PrayerType;
use crate::prayer_times::timing::{alarms_for_day, countdown_parts, local_datetime, next_occurrence};
use crate::prayer_times::{RawTimings, Schedule, TimingsProvider};
use crate::utils::format::format_countdown;

const CACHED_TIMINGS_KEY: &str = "cached_timings";
const CACHED_LOCATION_KEY: &str = "cached_location";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Straight from the provider.
    Live,
    /// Provider unavailable; last-known-good times.
    Cached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTimings {
    pub raw: RawTimings,
    pub freshness: Freshness,
}

/// Ask the provider for `date`'s times, remembering them on success and
/// falling back to the last good copy on failure.
pub fn load_timings(
    provider: &dyn TimingsProvider,
    conn: &Connection,
    date: NaiveDate,
) -> Result<LoadedTimings> {
    match provider.timings(date) {
        Ok(raw) => {
            if let Err(e) = remember(conn, &raw) {
                log::warn!("could not cache timings: {e:#}");
            }
            Ok(LoadedTimings {
                raw,
                freshness: Freshness::Live,
            })
        }
        Err(e) => {
            log::warn!("provider failed, using cached times: {e}");
            let raw = cached_timings(conn)?
                .ok_or_else(|| anyhow!("no prayer times available ({e}) and nothing cached"))?;
            Ok(LoadedTimings {
                raw,
                freshness: Freshness::Cached,
            })
        }
    }
}

fn remember(conn: &Connection, raw: &RawTimings) -> Result<()> {
    MetaRepo::set(conn, CACHED_TIMINGS_KEY, &serde_json::to_string(&raw.timings)?)?;
    MetaRepo::set(conn, CACHED_LOCATION_KEY, &raw.location)?;
    Ok(())
}

fn cached_timings(conn: &Connection) -> Result<Option<RawTimings>> {
    let Some(json) = MetaRepo::get(conn, CACHED_TIMINGS_KEY)? else {
        return Ok(None);
    };
    let timings: BTreeMap<String, String> =
        serde_json::from_str(&json).context("Decoding cached timings")?;
    let location = MetaRepo::get(conn, CACHED_LOCATION_KEY)?
        .unwrap_or_else(|| "Your location".to_string());
    Ok(Some(RawTimings { timings, location }))
}

struct Today {
    date: NaiveDate,
    loaded: LoadedTimings,
    schedule: Schedule,
}

/// A foreground view: computes the day's schedule, pushes it to the
/// background context and recomputes whenever the background asks.
pub struct ForegroundView {
    provider: Box<dyn TimingsProvider>,
    conn: Connection,
    link: ForegroundLink,
    today: Option<Today>,
    last_chimed: Option<(NaiveDate, PrayerType)>,
}

impl ForegroundView {
    pub fn new(provider: Box<dyn TimingsProvider>, conn: Connection, link: ForegroundLink) -> Self {
        Self {
            provider,
            conn,
            link,
            today: None,
            last_chimed: None,
        }
    }

    /// Reload the day's times and send them to the background context.
    pub fn refresh(&mut self, now: DateTime<FixedOffset>) -> Result<()> {
        let date = now.date_naive();
        let loaded = load_timings(self.provider.as_ref(), &self.conn, date)?;
        let schedule = Schedule::from_raw(&loaded.raw.timings)
            .with_context(|| format!("Timings for {} are incomplete", loaded.raw.location))?;

        let alarms = alarms_for_day(&schedule, date, *now.offset());
        self.link.post(ToBackground::SetAlarms { alarms })?;
        log::info!("pushed {date} schedule for {}", loaded.raw.location);

        self.today = Some(Today {
            date,
            loaded,
            schedule,
        });
        Ok(())
    }

    /// Act on any refresh notice from the background. Returns whether a
    /// refresh happened.
    pub fn poll(&mut self, now: DateTime<FixedOffset>) -> Result<bool> {
        if !self.link.refresh_requested() {
            return Ok(false);
        }
        self.refresh(now)?;
        Ok(true)
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.today.as_ref().map(|t| &t.schedule)
    }

    pub fn location(&self) -> Option<&str> {
        self.today.as_ref().map(|t| t.loaded.raw.location.as_str())
    }

    pub fn freshness(&self) -> Option<Freshness> {
        self.today.as_ref().map(|t| t.loaded.freshness)
    }

    /// `"Asr in 1h 2m 3s"`, or `None` before the first refresh.
    pub fn countdown_line(&self, now: DateTime<FixedOffset>) -> Option<String> {
        let schedule = self.schedule()?;
        let next = next_occurrence(schedule, now);
        let parts = countdown_parts(next.at, now);
        Some(format!("{} in {}", next.prayer, format_countdown(&parts)))
    }

    /// The prayer whose time is within a second of `now`, reported once per
    /// prayer per day. Drives the in-view adhan cue.
    pub fn chime_due(&mut self, now: DateTime<FixedOffset>) -> Option<PrayerType> {
        let today = self.today.as_ref()?;
        if today.date != now.date_naive() {
            return None;
        }
        let (prayer, _) = today.schedule.iter().find(|(_, time)| {
            let at = local_datetime(today.date, *time, *now.offset());
            (now - at).num_milliseconds().abs() < 1000
        })?;
        if self.last_chimed == Some((today.date, prayer)) {
            return None;
        }
        self.last_chimed = Some((today.date, prayer));
        Some(prayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::Envelope;
    use crate::db::open_in_memory;
    use crate::prayer_times::ProviderError;
    use chrono::{Duration, TimeZone};
    use std::sync::mpsc::{self, Receiver, Sender};

    struct FixedProvider(Option<RawTimings>);

    impl TimingsProvider for FixedProvider {
        fn timings(&self, _date: NaiveDate) -> Result<RawTimings, ProviderError> {
            self.0
                .clone()
                .ok_or_else(|| ProviderError::Http("connection refused".to_string()))
        }
    }

    fn raw() -> RawTimings {
        let timings = [
            ("Fajr", "05:00"),
            ("Sunrise", "06:15"),
            ("Dhuhr", "12:30"),
            ("Asr", "15:45"),
            ("Maghrib", "18:10"),
            ("Isha", "19:40"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        RawTimings {
            timings,
            location: "Asia/Karachi".to_string(),
        }
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 14, 44, 57)
            .unwrap()
    }

    /// A view wired to a bare channel standing in for the background context.
    fn view(
        provider: FixedProvider,
        conn: Connection,
    ) -> (ForegroundView, Receiver<Envelope>, Sender<crate::background::ToForeground>) {
        let (tx, rx) = mpsc::channel();
        let link = ForegroundLink::connect(tx).unwrap();
        let Ok(Envelope::Connect(back)) = rx.try_recv() else {
            panic!("expected connect");
        };
        (ForegroundView::new(Box::new(provider), conn, link), rx, back)
    }

    fn pushed(rx: &Receiver<Envelope>) -> Vec<crate::models::Alarm> {
        match rx.try_recv() {
            Ok(Envelope::Message(ToBackground::SetAlarms { alarms })) => alarms,
            other => panic!("expected SetAlarms, got {other:?}"),
        }
    }

    #[test]
    fn refresh_pushes_todays_alarms() {
        let (mut view, rx, _back) = view(FixedProvider(Some(raw())), open_in_memory().unwrap());
        view.refresh(now()).unwrap();

        let alarms = pushed(&rx);
        assert_eq!(alarms.len(), 5);
        let asr = alarms.iter().find(|a| a.name == PrayerType::Asr).unwrap();
        assert_eq!(asr.time, (now() + Duration::seconds(60 * 60 + 3)).timestamp_millis());
        assert_eq!(view.freshness(), Some(Freshness::Live));
        assert_eq!(view.countdown_line(now()).as_deref(), Some("Asr in 1h 0m 3s"));
    }

    #[test]
    fn provider_failure_falls_back_to_cached_times() {
        let conn = open_in_memory().unwrap();
        load_timings(&FixedProvider(Some(raw())), &conn, now().date_naive()).unwrap();

        let (mut view, rx, _back) = view(FixedProvider(None), conn);
        view.refresh(now()).unwrap();
        assert_eq!(pushed(&rx).len(), 5);
        assert_eq!(view.freshness(), Some(Freshness::Cached));
        assert_eq!(view.location(), Some("Asia/Karachi"));
    }

    #[test]
    fn no_provider_and_no_cache_is_an_error() {
        let (mut view, rx, _back) = view(FixedProvider(None), open_in_memory().unwrap());
        assert!(view.refresh(now()).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn incomplete_timings_are_not_pushed() {
        let mut partial = raw();
        partial.timings.remove("Isha");
        let (mut view, rx, _back) = view(FixedProvider(Some(partial)), open_in_memory().unwrap());
        assert!(view.refresh(now()).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn refresh_notice_triggers_a_new_push() {
        let (mut view, rx, back) = view(FixedProvider(Some(raw())), open_in_memory().unwrap());
        assert!(!view.poll(now()).unwrap());

        back.send(crate::background::ToForeground::RefreshSchedule).unwrap();
        assert!(view.poll(now()).unwrap());
        assert_eq!(pushed(&rx).len(), 5);
    }

    #[test]
    fn chime_sounds_once_per_prayer() {
        let (mut view, _rx, _back) = view(FixedProvider(Some(raw())), open_in_memory().unwrap());
        view.refresh(now()).unwrap();

        let asr = now() + Duration::seconds(3603);
        assert_eq!(view.chime_due(asr - Duration::seconds(5)), None);
        assert_eq!(view.chime_due(asr), Some(PrayerType::Asr));
        assert_eq!(view.chime_due(asr + Duration::milliseconds(500)), None);
    }
}
