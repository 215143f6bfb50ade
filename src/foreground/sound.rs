use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crate::assets::{AssetCache, Fetcher};
use crate::config::settings::SoundConfig;

#[cfg(target_os = "macos")]
const DEFAULT_PLAYER: &str = "afplay";
#[cfg(not(target_os = "macos"))]
const DEFAULT_PLAYER: &str = "paplay";

/// Plays the adhan cue through an external audio player.
#[derive(Debug, Clone)]
pub struct AdhanPlayer {
    player: String,
    file: PathBuf,
    volume: f32,
    muted: bool,
}

impl AdhanPlayer {
    /// Pull the cue out of the asset cache (or its origin) and stage it as a
    /// file in `dir` the player can open.
    pub fn prepare(
        config: &SoundConfig,
        cache: &AssetCache,
        origin: &dyn Fetcher,
        dir: &Path,
    ) -> Result<Self> {
        let (asset, _) = cache
            .serve(&config.file, origin)
            .with_context(|| format!("Loading sound {}", config.file))?;
        let name = Path::new(&config.file)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "adhan.mp3".into());
        let file = dir.join(name);
        std::fs::write(&file, &asset.body).with_context(|| format!("Writing {:?}", file))?;
        Ok(Self::new(config, file))
    }

    pub fn new(config: &SoundConfig, file: PathBuf) -> Self {
        Self {
            player: config
                .player
                .clone()
                .unwrap_or_else(|| DEFAULT_PLAYER.to_string()),
            file,
            volume: config.volume.clamp(0.0, 1.0),
            muted: config.muted,
        }
    }

    /// Player arguments, volume first where the player understands it.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self.player.as_str() {
            "paplay" => args.push(format!("--volume={}", (self.volume * 65536.0) as u32)),
            "afplay" => {
                args.push("-v".to_string());
                args.push(format!("{:.2}", self.volume));
            }
            _ => {}
        }
        args.push(self.file.to_string_lossy().to_string());
        args
    }

    /// Start playback without waiting for it to finish. Silent when muted or
    /// the volume is zero.
    pub fn play(&self) -> Result<()> {
        if self.muted || self.volume <= 0.0 {
            log::debug!("adhan muted");
            return Ok(());
        }
        let child = Command::new(&self.player)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Starting {}", self.player))?;
        reap(child)?;
        Ok(())
    }
}

/// Wait for the player on its own thread so finished players do not linger
/// as zombies.
fn reap(mut child: Child) -> Result<JoinHandle<Option<ExitStatus>>> {
    let handle = thread::Builder::new()
        .name("waqt-adhan".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                log::warn!("waiting for player failed: {e}");
                None
            }
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(player: &str, volume: f32) -> SoundConfig {
        SoundConfig {
            player: Some(player.to_string()),
            volume,
            ..SoundConfig::default()
        }
    }

    #[test]
    fn paplay_gets_scaled_volume() {
        let player = AdhanPlayer::new(&config("paplay", 0.5), PathBuf::from("/tmp/adhan.mp3"));
        assert_eq!(player.args(), vec!["--volume=32768", "/tmp/adhan.mp3"]);
    }

    #[test]
    fn unknown_player_only_gets_the_file() {
        let player = AdhanPlayer::new(&config("mpv", 2.0), PathBuf::from("a.mp3"));
        assert_eq!(player.args(), vec!["a.mp3"]);
        assert_eq!(player.volume, 1.0);
    }

    #[test]
    fn muted_player_does_not_spawn() {
        let mut cfg = config("definitely-not-a-player", 0.5);
        cfg.muted = true;
        AdhanPlayer::new(&cfg, PathBuf::from("a.mp3")).play().unwrap();
    }

    #[test]
    fn cue_is_staged_from_the_cache() {
        use crate::assets::{Asset, AssetError};

        struct Origin;
        impl Fetcher for Origin {
            fn fetch(&self, path: &str) -> Result<Asset, AssetError> {
                Ok(Asset { path: path.to_string(), content_type: None, body: b"ID3".to_vec() })
            }
        }

        let dir = tempfile::TempDir::new().unwrap();
        let mut cache = AssetCache::new(
            crate::db::open_in_memory().unwrap(),
            "v1",
            vec!["/adhan.mp3".to_string()],
        );
        cache.install(&Origin).unwrap();

        let player = AdhanPlayer::prepare(&SoundConfig::default(), &cache, &crate::assets::NoOrigin, dir.path()).unwrap();
        assert_eq!(std::fs::read(&player.file).unwrap(), b"ID3");
    }

    #[cfg(unix)]
    #[test]
    fn finished_player_is_reaped() {
        let child = Command::new("true").spawn().unwrap();
        let status = reap(child).unwrap().join().unwrap();
        assert!(status.unwrap().success());
    }
}
