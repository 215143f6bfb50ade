use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::assets::{self, AssetCache, Fetcher, NoOrigin, Served};
use crate::background::{
    BackgroundContext, BackgroundSettings, Clock, DesktopNotifier, FallbackNotifier, InstanceLease,
    LogNotifier, Notifier, ScheduleStore, SqliteScheduleStore, SystemClock,
};
use crate::config::AppConfig;
use crate::foreground::sound::AdhanPlayer;
use crate::foreground::{load_timings, ForegroundView, Freshness};
use crate::prayer_times::timing::{countdown_parts, next_occurrence_raw};
use crate::prayer_times::{provider_from_config, Schedule};
use crate::utils::format::{format_countdown, format_millis, format_time};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

fn open_db(path: &Path) -> Result<rusqlite::Connection> {
    crate::db::open(path)
}

fn asset_cache(config: &AppConfig, db_path: &Path) -> Result<AssetCache> {
    Ok(AssetCache::new(
        open_db(db_path)?,
        &config.assets.cache_name,
        config.assets.manifest.clone(),
    ))
}

fn origin(config: &AppConfig) -> Box<dyn Fetcher> {
    assets::origin_from_config(&config.assets).unwrap_or_else(|| Box::new(NoOrigin))
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub fn handle_times(config: &AppConfig, db_path: &Path) -> Result<()> {
    let conn = open_db(db_path)?;
    let now = SystemClock::new(config.timezone()?).now();
    let provider = provider_from_config(config)?;

    let loaded = load_timings(provider.as_ref(), &conn, now.date_naive())?;
    let schedule = Schedule::from_raw(&loaded.raw.timings)?;

    println!();
    println_colored!(
        GOLD,
        "  Prayer Times — {} ({})",
        loaded.raw.location,
        now.format("%Y-%m-%d")
    );
    if loaded.freshness == Freshness::Cached {
        println_colored!(AMBER, "  (provider unavailable — showing cached times)");
    }
    println!();

    for (prayer, time) in schedule.iter() {
        if time <= now.time() {
            println_colored!(DIM, "  {:<10}  {}", prayer.display_name(), format_time(time));
        } else {
            println_colored!(BOLD, "  {:<10}  {}", prayer.display_name(), format_time(time));
        }
    }

    let next = next_occurrence_raw(&loaded.raw.timings, now)?;
    println!();
    println_colored!(
        AMBER,
        "  Next: {} in {}",
        next.prayer.display_name(),
        format_countdown(&countdown_parts(next.at, now))
    );
    println!();
    Ok(())
}

// ─── Run ─────────────────────────────────────────────────────────────────────

/// Install the asset cache if it is incomplete and an origin can fill it.
/// `None` means the daemon runs without offline assets.
fn ready_asset_cache(config: &AppConfig, db_path: &Path) -> Result<Option<AssetCache>> {
    let mut cache = asset_cache(config, db_path)?;
    if cache.missing()?.is_empty() {
        return Ok(Some(cache));
    }
    match assets::origin_from_config(&config.assets) {
        Some(origin) => {
            cache
                .install(origin.as_ref())
                .context("Installing asset cache")?;
            Ok(Some(cache))
        }
        None => {
            log::warn!("asset cache '{}' is not installed and no origin is configured; running without offline assets", cache.name());
            Ok(None)
        }
    }
}

fn notifier(config: &AppConfig) -> Box<dyn Notifier> {
    if config.alarms.desktop_notifications {
        Box::new(FallbackNotifier::new(DesktopNotifier, LogNotifier))
    } else {
        Box::new(LogNotifier)
    }
}

pub fn handle_run(config: &AppConfig, db_path: &Path, no_sound: bool, quiet: bool) -> Result<()> {
    // held until the process exits
    let _lease = InstanceLease::acquire(&AppConfig::lock_path()?)
        .context("Starting the background context")?;

    let tz = config.timezone()?;
    let clock = SystemClock::new(tz);
    let cache = ready_asset_cache(config, db_path)?;

    let store = SqliteScheduleStore::new(open_db(db_path)?);
    let background = BackgroundContext::activate(
        Box::new(store),
        notifier(config),
        Box::new(SystemClock::new(tz)),
        cache.as_ref(),
        &BackgroundSettings::from(&config.alarms),
    )?
    .spawn()?;

    let player = match (&cache, config.sound.enabled && !no_sound) {
        (Some(cache), true) => {
            let dir = AppConfig::ensure_data_dir()?;
            match AdhanPlayer::prepare(&config.sound, cache, origin(config).as_ref(), &dir) {
                Ok(player) => Some(player),
                Err(e) => {
                    log::warn!("adhan cue unavailable: {e:#}");
                    None
                }
            }
        }
        _ => None,
    };

    let mut view = ForegroundView::new(
        provider_from_config(config)?,
        open_db(db_path)?,
        background.connect()?,
    );
    view.refresh(clock.now())?;
    if view.freshness() == Some(Freshness::Cached) {
        println_colored!(AMBER, "  (provider unavailable — showing cached times)");
    }
    println_colored!(GOLD, "  {}", view.location().unwrap_or("Your location"));

    loop {
        let now = clock.now();
        if let Err(e) = view.poll(now) {
            log::warn!("refresh failed, keeping previous schedule: {e:#}");
        }
        if let Some(prayer) = view.chime_due(now) {
            log::info!("{prayer} — playing adhan");
            if let Some(player) = &player {
                if let Err(e) = player.play() {
                    log::warn!("{e:#}");
                }
            }
        }
        if !quiet {
            if let Some(line) = view.countdown_line(now) {
                print!("\r\x1b[2K  {line}");
                io::stdout().flush()?;
            }
        }
        thread::sleep(Duration::from_secs(1));
    }
}

// ─── Alarms ──────────────────────────────────────────────────────────────────

pub fn handle_alarms(config: &AppConfig, db_path: &Path) -> Result<()> {
    let tz = config.timezone()?;
    let alarms = SqliteScheduleStore::new(open_db(db_path)?).load()?;

    println!();
    if alarms.is_empty() {
        println_colored!(GREEN, "  ✓ No pending alarms");
    } else {
        println_colored!(GOLD, "  Pending alarms");
        println!();
        for alarm in alarms.iter() {
            println!("  {:<10}  {}", alarm.name.display_name(), format_millis(alarm.time, tz));
        }
    }
    println!();
    Ok(())
}

// ─── Assets ──────────────────────────────────────────────────────────────────

pub fn handle_install(config: &AppConfig, db_path: &Path) -> Result<()> {
    let origin = assets::origin_from_config(&config.assets)
        .context("No asset origin configured; set assets.origin_dir or assets.origin_url")?;
    let mut cache = asset_cache(config, db_path)?;
    let count = cache.install(origin.as_ref())?;
    let reclaimed = cache.activate()?;
    println_colored!(GREEN, "  ✓ Cached {} assets in {}", count, cache.name());
    if reclaimed > 0 {
        println_colored!(DIM, "  Removed {} entries from older caches", reclaimed);
    }
    Ok(())
}

pub fn handle_serve(config: &AppConfig, db_path: &Path, path: &str, out: Option<&Path>) -> Result<()> {
    let cache = asset_cache(config, db_path)?;
    let (asset, served) = cache.serve(path, origin(config).as_ref())?;
    eprintln!(
        "{} ({} bytes, {})",
        path,
        asset.body.len(),
        match served {
            Served::Cache => "cache",
            Served::Network => "network",
        }
    );
    match out {
        Some(file) => std::fs::write(file, &asset.body).with_context(|| format!("Writing {:?}", file))?,
        None => io::stdout().write_all(&asset.body)?,
    }
    Ok(())
}

// ─── Config ──────────────────────────────────────────────────────────────────

pub fn handle_config(config: &AppConfig) -> Result<()> {
    let path = AppConfig::config_path()?;
    if !path.exists() {
        config.save()?;
        println_colored!(GREEN, "  ✓ Wrote default config");
    }
    println!("  {}", path.display());
    Ok(())
}
