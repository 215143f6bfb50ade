#![allow(dead_code)]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// The five daily prayers, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrayerType {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerType {
    pub fn all() -> [PrayerType; 5] {
        [
            PrayerType::Fajr,
            PrayerType::Dhuhr,
            PrayerType::Asr,
            PrayerType::Maghrib,
            PrayerType::Isha,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerType::Fajr => "Fajr",
            PrayerType::Dhuhr => "Dhuhr",
            PrayerType::Asr => "Asr",
            PrayerType::Maghrib => "Maghrib",
            PrayerType::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for PrayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PrayerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fajr" => Ok(PrayerType::Fajr),
            "dhuhr" | "zuhr" | "dhuhur" => Ok(PrayerType::Dhuhr),
            "asr" => Ok(PrayerType::Asr),
            "maghrib" => Ok(PrayerType::Maghrib),
            "isha" => Ok(PrayerType::Isha),
            _ => Err(anyhow::anyhow!("Unknown prayer type: {}", s)),
        }
    }
}

/// A prayer paired with the absolute time (epoch milliseconds) it is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub name: PrayerType,
    pub time: i64,
}

/// Working set of pending alarms. Holds at most one timestamp per prayer;
/// inserting a prayer that is already present replaces its timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmSet {
    alarms: BTreeMap<PrayerType, i64>,
}

impl AlarmSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alarm: Alarm) {
        self.alarms.insert(alarm.name, alarm.time);
    }

    pub fn merge<I: IntoIterator<Item = Alarm>>(&mut self, alarms: I) {
        for alarm in alarms {
            self.insert(alarm);
        }
    }

    pub fn remove(&mut self, name: PrayerType) -> Option<i64> {
        self.alarms.remove(&name)
    }

    pub fn get(&self, name: PrayerType) -> Option<i64> {
        self.alarms.get(&name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Alarm> + '_ {
        self.alarms
            .iter()
            .map(|(name, time)| Alarm { name: *name, time: *time })
    }
}

impl FromIterator<Alarm> for AlarmSet {
    fn from_iter<I: IntoIterator<Item = Alarm>>(iter: I) -> Self {
        let mut set = AlarmSet::new();
        set.merge(iter);
        set
    }
}
