//! Heartbeat dispatcher: scans the in-memory alarm set on every tick and
//! delivers whatever is due.
//!
//! Each alarm goes `pending -> fired -> removed` within one tick. An alarm is
//! due while `|now - alarm| <= tolerance`, so a tick period shorter than the
//! window cannot step over it. If no tick lands inside the window (the
//! process was not running, or was suspended) the alarm is simply missed:
//! there is no late delivery.
//!
//! The timestamp of the last delivery per prayer is kept and persisted
//! beside the pending set. A later push of the same alarm (a view
//! refreshing, or the app restarting inside the window) is dropped instead
//! of being armed a second time.

use crate::background::notifier::Notifier;
use crate::background::store::ScheduleStore;
use crate::models::{Alarm, AlarmSet, Notification, PrayerType};

pub struct Dispatcher {
    alarms: AlarmSet,
    delivered: AlarmSet,
    store: Box<dyn ScheduleStore>,
    notifier: Box<dyn Notifier>,
    tolerance_ms: i64,
    // set while the last save failed; the next tick retries
    dirty: bool,
}

impl Dispatcher {
    /// Start from whatever the store holds. An unreadable store counts as empty.
    pub fn hydrate(
        store: Box<dyn ScheduleStore>,
        notifier: Box<dyn Notifier>,
        tolerance_ms: i64,
    ) -> Self {
        let delivered = store.load_delivered().unwrap_or_else(|e| {
            log::warn!("could not read delivery record, starting empty: {e:#}");
            AlarmSet::new()
        });
        let alarms = match store.load() {
            Ok(alarms) => {
                log::info!("restored {} pending alarm(s)", alarms.len());
                alarms
            }
            Err(e) => {
                log::warn!("could not read stored alarms, starting empty: {e:#}");
                AlarmSet::new()
            }
        };

        let mut dispatcher = Self {
            alarms: AlarmSet::new(),
            delivered,
            store,
            notifier,
            tolerance_ms,
            dirty: false,
        };
        // a crash between the two saves can leave a fired alarm pending
        let pending: Vec<Alarm> = alarms.iter().collect();
        let kept: Vec<Alarm> = pending
            .iter()
            .copied()
            .filter(|alarm| !dispatcher.already_delivered(alarm))
            .collect();
        dispatcher.dirty = kept.len() != pending.len();
        dispatcher.alarms.merge(kept);
        dispatcher
    }

    pub fn alarms(&self) -> &AlarmSet {
        &self.alarms
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn within_tolerance(&self, a: i64, b: i64) -> bool {
        a.abs_diff(b) <= self.tolerance_ms.unsigned_abs()
    }

    fn already_delivered(&self, alarm: &Alarm) -> bool {
        self.delivered
            .get(alarm.name)
            .is_some_and(|fired| self.within_tolerance(fired, alarm.time))
    }

    /// Overwrite-by-name merge, persisted right away. Alarms that were already
    /// delivered are dropped.
    pub fn merge(&mut self, alarms: Vec<Alarm>) {
        let total = alarms.len();
        let fresh: Vec<Alarm> = alarms
            .into_iter()
            .filter(|alarm| !self.already_delivered(alarm))
            .collect();
        if fresh.len() < total {
            log::debug!("ignored {} already delivered alarm(s)", total - fresh.len());
        }
        log::debug!("merging {} alarm(s)", fresh.len());
        self.alarms.merge(fresh);
        self.persist();
    }

    /// One scan against a single reading of the clock. Returns the prayers
    /// that fired, in prayer order.
    pub fn tick(&mut self, now_ms: i64) -> Vec<PrayerType> {
        let due: Vec<Alarm> = self
            .alarms
            .iter()
            .filter(|alarm| self.within_tolerance(now_ms, alarm.time))
            .collect();

        for alarm in &due {
            let prayer = alarm.name;
            if let Err(e) = self.notifier.deliver(&Notification::prayer_time(prayer)) {
                log::warn!("delivering {prayer} failed: {e:#}");
            }
            self.alarms.remove(prayer);
            self.delivered.insert(*alarm);
            log::info!("fired {prayer}");
        }

        if !due.is_empty() || self.dirty {
            self.persist();
        }
        due.into_iter().map(|alarm| alarm.name).collect()
    }

    // Delivery record first: if the pending save then fails, a restart still
    // knows the alarm went out.
    fn persist(&mut self) {
        let saved = self
            .store
            .save_delivered(&self.delivered)
            .and_then(|()| self.store.save(&self.alarms));
        match saved {
            Ok(()) => self.dirty = false,
            Err(e) => {
                log::warn!("saving alarms failed, will retry next tick: {e:#}");
                self.dirty = true;
            }
        }
    }
}
