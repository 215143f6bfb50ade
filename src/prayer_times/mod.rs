pub mod calculator;
pub mod provider;
pub mod timing;

use anyhow::Result;

pub use calculator::PrayerCalculator;
pub use provider::{AladhanProvider, ProviderError, RawTimings, TimingsProvider};
pub use timing::{Countdown, NextPrayer, Schedule, ScheduleError};

use crate::config::{AppConfig, ProviderKind};

/// Build the provider selected in the config.
pub fn provider_from_config(config: &AppConfig) -> Result<Box<dyn TimingsProvider>> {
    let salah = &config.salah;
    Ok(match salah.provider {
        ProviderKind::Calculator => Box::new(PrayerCalculator::new(
            salah.latitude,
            salah.longitude,
            &salah.calc_method,
            &salah.madhab,
            salah.timezone_offset,
            &salah.location_name,
        )?),
        ProviderKind::Aladhan => Box::new(AladhanProvider::new(
            &salah.aladhan_url,
            salah.latitude,
            salah.longitude,
            salah.aladhan_method,
        )),
    })
}
