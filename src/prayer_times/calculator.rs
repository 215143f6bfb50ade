use anyhow::{anyhow, Result};
use chrono::{FixedOffset, NaiveDate};
use salah::prelude::*;
use std::collections::BTreeMap;

use crate::prayer_times::provider::{ProviderError, RawTimings, TimingsProvider};

/// Offline provider: computes the times astronomically with `salah`.
pub struct PrayerCalculator {
    pub lat: f64,
    pub lng: f64,
    pub method_str: String,
    pub madhab_str: String,
    pub tz_offset_minutes: i32,
    pub location_name: String,
}

impl PrayerCalculator {
    pub fn new(
        lat: f64,
        lng: f64,
        method: &str,
        madhab: &str,
        tz_offset_minutes: i32,
        location_name: &str,
    ) -> Result<Self> {
        // Validate method + madhab early
        parse_method(method)?;
        parse_madhab(madhab)?;
        FixedOffset::east_opt(tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", tz_offset_minutes))?;
        Ok(Self {
            lat,
            lng,
            method_str: method.to_string(),
            madhab_str: madhab.to_string(),
            tz_offset_minutes,
            location_name: location_name.to_string(),
        })
    }

    fn compute_times(&self, date: NaiveDate) -> Result<BTreeMap<String, String>> {
        let coords = Coordinates::new(self.lat, self.lng);
        let method = parse_method(&self.method_str)?;
        let madhab = parse_madhab(&self.madhab_str)?;
        let params = Configuration::with(method, madhab);

        let times = PrayerSchedule::new()
            .on(date)
            .for_location(coords)
            .with_configuration(params)
            .calculate()
            .map_err(|e| anyhow!("Prayer calculation failed: {}", e))?;

        let offset = FixedOffset::east_opt(self.tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", self.tz_offset_minutes))?;

        let to_local = |utc: chrono::DateTime<chrono::Utc>| -> String {
            utc.with_timezone(&offset).format("%H:%M").to_string()
        };

        // Same shape as an online provider's response
        let mut timings = BTreeMap::new();
        timings.insert("Fajr".to_string(), to_local(times.time(Prayer::Fajr)));
        timings.insert("Sunrise".to_string(), to_local(times.time(Prayer::Sunrise)));
        timings.insert("Dhuhr".to_string(), to_local(times.time(Prayer::Dhuhr)));
        timings.insert("Asr".to_string(), to_local(times.time(Prayer::Asr)));
        timings.insert("Maghrib".to_string(), to_local(times.time(Prayer::Maghrib)));
        timings.insert("Isha".to_string(), to_local(times.time(Prayer::Isha)));
        Ok(timings)
    }
}

impl TimingsProvider for PrayerCalculator {
    fn timings(&self, date: NaiveDate) -> Result<RawTimings, ProviderError> {
        let timings = self
            .compute_times(date)
            .map_err(|e| ProviderError::Calculation(e.to_string()))?;
        Ok(RawTimings {
            timings,
            location: self.location_name.clone(),
        })
    }
}

fn parse_method(s: &str) -> Result<Method> {
    match s {
        "MuslimWorldLeague" => Ok(Method::MuslimWorldLeague),
        "Egyptian" => Ok(Method::Egyptian),
        "Karachi" => Ok(Method::Karachi),
        "UmmAlQura" => Ok(Method::UmmAlQura),
        "Dubai" => Ok(Method::Dubai),
        "MoonsightingCommittee" => Ok(Method::MoonsightingCommittee),
        "NorthAmerica" => Ok(Method::NorthAmerica),
        "Kuwait" => Ok(Method::Kuwait),
        "Qatar" => Ok(Method::Qatar),
        "Singapore" => Ok(Method::Singapore),
        "Tehran" => Ok(Method::Tehran),
        "Turkey" => Ok(Method::Turkey),
        "Other" => Ok(Method::Other),
        _ => Err(anyhow!("Unknown calculation method: '{}'", s)),
    }
}

fn parse_madhab(s: &str) -> Result<Madhab> {
    match s {
        "Hanafi" => Ok(Madhab::Hanafi),
        "Shafi" | "Shafi'i" => Ok(Madhab::Shafi),
        _ => Err(anyhow!("Unknown madhab: '{}'", s)),
    }
}
