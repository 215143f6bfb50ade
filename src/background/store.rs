use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db::repository::AlarmRepo;
use crate::models::AlarmSet;

/// Key of the single persisted alarm record.
pub const ALARM_KEY: &str = "prayers";
/// Sibling record: the last timestamp delivered for each prayer.
pub const DELIVERED_KEY: &str = "delivered";

/// Durable home of the alarm set. One record, always read and written whole;
/// once `save` returns the record survives a restart. The delivered record
/// lives next to it so a restarted dispatcher can refuse a re-push of an
/// alarm that already went out.
pub trait ScheduleStore: Send {
    fn load(&self) -> Result<AlarmSet>;
    fn save(&self, alarms: &AlarmSet) -> Result<()>;
    fn load_delivered(&self) -> Result<AlarmSet>;
    fn save_delivered(&self, delivered: &AlarmSet) -> Result<()>;
}

pub struct SqliteScheduleStore {
    conn: Connection,
}

impl SqliteScheduleStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn read(&self, key: &str) -> Result<AlarmSet> {
        match AlarmRepo::get(&self.conn, key)? {
            None => Ok(AlarmSet::new()),
            Some(json) => serde_json::from_str(&json)
                .with_context(|| format!("Decoding persisted record '{key}'")),
        }
    }

    fn write(&self, key: &str, alarms: &AlarmSet) -> Result<()> {
        let json = serde_json::to_string(alarms).context("Encoding alarms")?;
        AlarmRepo::put(&self.conn, key, &json)
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn load(&self) -> Result<AlarmSet> {
        self.read(ALARM_KEY)
    }

    fn save(&self, alarms: &AlarmSet) -> Result<()> {
        self.write(ALARM_KEY, alarms)
    }

    fn load_delivered(&self) -> Result<AlarmSet> {
        self.read(DELIVERED_KEY)
    }

    fn save_delivered(&self, delivered: &AlarmSet) -> Result<()> {
        self.write(DELIVERED_KEY, delivered)
    }
}

#[cfg(test)]
pub use memory::MemoryScheduleStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-process store. Clones share the record, so a test can keep one
    /// handle while the dispatcher owns another.
    #[derive(Clone, Default)]
    pub struct MemoryScheduleStore {
        record: Arc<Mutex<Option<AlarmSet>>>,
        delivered: Arc<Mutex<AlarmSet>>,
        fail: Arc<AtomicBool>,
        saves: Arc<Mutex<usize>>,
    }

    impl MemoryScheduleStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn snapshot(&self) -> Option<AlarmSet> {
            self.record.lock().unwrap().clone()
        }

        pub fn delivered(&self) -> AlarmSet {
            self.delivered.lock().unwrap().clone()
        }

        /// Saves of the pending record only.
        pub fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    impl ScheduleStore for MemoryScheduleStore {
        fn load(&self) -> Result<AlarmSet> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store unavailable");
            }
            Ok(self.record.lock().unwrap().clone().unwrap_or_default())
        }

        fn save(&self, alarms: &AlarmSet) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store unavailable");
            }
            *self.record.lock().unwrap() = Some(alarms.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        fn load_delivered(&self) -> Result<AlarmSet> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store unavailable");
            }
            Ok(self.delivered.lock().unwrap().clone())
        }

        fn save_delivered(&self, delivered: &AlarmSet) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("store unavailable");
            }
            *self.delivered.lock().unwrap() = delivered.clone();
            Ok(())
        }
    }
}
