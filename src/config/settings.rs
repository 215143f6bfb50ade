use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_latitude() -> f64 {
    33.6938
}
fn default_longitude() -> f64 {
    73.0651
}
fn default_location_name() -> String {
    "Islamabad".to_string()
}
fn default_calc_method() -> String {
    "MuslimWorldLeague".to_string()
}
fn default_madhab() -> String {
    "Hanafi".to_string()
}
fn default_timezone_offset() -> i32 {
    300
}
fn default_provider() -> ProviderKind {
    ProviderKind::Calculator
}
fn default_aladhan_url() -> String {
    "https://api.aladhan.com".to_string()
}
fn default_aladhan_method() -> u8 {
    2
}
fn default_heartbeat_secs() -> u64 {
    30
}
fn default_tolerance_ms() -> i64 {
    60_000
}
fn default_rollover_grace_secs() -> u64 {
    5
}
fn default_cache_name() -> String {
    "waqt-cache-v1".to_string()
}
fn default_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/adhan.mp3",
        "/icon-192.png",
        "/icon-512.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_sound_file() -> String {
    "/adhan.mp3".to_string()
}
fn default_volume() -> f32 {
    0.5
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Offline astronomical calculation.
    Calculator,
    /// api.aladhan.com timings endpoint.
    Aladhan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalahConfig {
    #[serde(default = "default_location_name")]
    pub location_name: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default = "default_calc_method")]
    pub calc_method: String,
    #[serde(default = "default_madhab")]
    pub madhab: String,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes from UTC
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_aladhan_url")]
    pub aladhan_url: String,
    /// Aladhan calculation method id (2 = ISNA).
    #[serde(default = "default_aladhan_method")]
    pub aladhan_method: u8,
}

impl Default for SalahConfig {
    fn default() -> Self {
        Self {
            location_name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            calc_method: default_calc_method(),
            madhab: default_madhab(),
            timezone_offset: default_timezone_offset(),
            provider: default_provider(),
            aladhan_url: default_aladhan_url(),
            aladhan_method: default_aladhan_method(),
        }
    }
}

/// Timing knobs for the background context. None of these values is
/// load-bearing; they only trade scan cost against delivery precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// An alarm is due while `|now - alarm| <= tolerance_ms`.
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: i64,
    #[serde(default = "default_rollover_grace_secs")]
    pub rollover_grace_secs: u64,
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,
}

impl AlarmConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn rollover_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.rollover_grace_secs as i64)
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            tolerance_ms: default_tolerance_ms(),
            rollover_grace_secs: default_rollover_grace_secs(),
            desktop_notifications: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Bumping this name is the only way to invalidate the cache.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
    /// Base URL the assets are fetched from (e.g. `https://example.org`).
    #[serde(default)]
    pub origin_url: Option<String>,
    /// Local directory with the packaged static assets. Takes precedence
    /// over `origin_url`.
    #[serde(default)]
    pub origin_dir: Option<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            manifest: default_manifest(),
            origin_url: None,
            origin_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Asset path of the adhan cue, served through the asset cache.
    #[serde(default = "default_sound_file")]
    pub file: String,
    /// Player command; the cue's file path is appended as the last argument.
    /// Defaults to `afplay` on macOS and `paplay` elsewhere.
    #[serde(default)]
    pub player: Option<String>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            muted: false,
            volume: default_volume(),
            file: default_sound_file(),
            player: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub salah: SalahConfig,
    #[serde(default)]
    pub alarms: AlarmConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub sound: SoundConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "waqt").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("waqt.db"))
    }

    /// Lock file that keeps a second daemon from owning the alarm schedule.
    pub fn lock_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("waqt.lock"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(&path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// The configured UTC offset as a chrono timezone.
    pub fn timezone(&self) -> Result<chrono::FixedOffset> {
        chrono::FixedOffset::east_opt(self.salah.timezone_offset * 60).with_context(|| {
            format!("Invalid timezone offset: {}", self.salah.timezone_offset)
        })
    }
}
