//! Cache-first static asset serving.
//!
//! `install` stores the whole manifest or nothing; `serve` answers from the
//! cache and falls back to the network on a miss without storing the result.

use rusqlite::Connection;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::db::repository::{AssetRepo, CachedAsset};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("fetching {path} failed: {reason}")]
    Fetch { path: String, reason: String },
    #[error("asset cache '{cache}' is missing {missing:?}")]
    NotInstalled { cache: String, missing: Vec<String> },
    #[error("asset storage: {0}")]
    Storage(String),
}

fn storage(e: anyhow::Error) -> AssetError {
    AssetError::Storage(format!("{e:#}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Cache,
    Network,
}

/// Where assets come from when they are not cached.
pub trait Fetcher {
    fn fetch(&self, path: &str) -> Result<Asset, AssetError>;
}

pub struct AssetCache {
    conn: Connection,
    name: String,
    manifest: Vec<String>,
}

impl AssetCache {
    pub fn new(conn: Connection, name: &str, manifest: Vec<String>) -> Self {
        Self {
            conn,
            name: name.to_string(),
            manifest,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch every manifest entry, then store them in one transaction. A
    /// single failed fetch aborts the install and nothing is written.
    pub fn install(&mut self, fetcher: &dyn Fetcher) -> Result<usize, AssetError> {
        let mut fetched = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let asset = fetcher.fetch(path)?;
            log::debug!("fetched {path} ({} bytes)", asset.body.len());
            fetched.push(CachedAsset {
                path: path.clone(),
                content_type: asset.content_type,
                body: asset.body,
            });
        }
        AssetRepo::put_all(&mut self.conn, &self.name, &fetched).map_err(storage)?;
        log::info!("installed {} assets into {}", fetched.len(), self.name);
        Ok(fetched.len())
    }

    /// Manifest entries the current cache does not hold.
    pub fn missing(&self) -> Result<Vec<String>, AssetError> {
        let present = AssetRepo::paths(&self.conn, &self.name).map_err(storage)?;
        Ok(self
            .manifest
            .iter()
            .filter(|path| !present.contains(path))
            .cloned()
            .collect())
    }

    /// Check the current cache is complete and drop every older cache.
    /// Returns how many stale entries were removed.
    pub fn activate(&self) -> Result<usize, AssetError> {
        let missing = self.missing()?;
        if !missing.is_empty() {
            return Err(AssetError::NotInstalled {
                cache: self.name.clone(),
                missing,
            });
        }
        AssetRepo::delete_other_caches(&self.conn, &self.name).map_err(storage)
    }

    /// Cached copy if there is one, otherwise a live fetch.
    pub fn serve(&self, path: &str, network: &dyn Fetcher) -> Result<(Asset, Served), AssetError> {
        if let Some(hit) = AssetRepo::get(&self.conn, &self.name, path).map_err(storage)? {
            return Ok((
                Asset {
                    path: hit.path,
                    content_type: hit.content_type,
                    body: hit.body,
                },
                Served::Cache,
            ));
        }
        log::debug!("cache miss for {path}, going to network");
        network.fetch(path).map(|asset| (asset, Served::Network))
    }
}

fn content_type_for(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?;
    Some(match ext {
        "html" => "text/html",
        "json" => "application/json",
        "mp3" => "audio/mpeg",
        "png" => "image/png",
        "js" => "text/javascript",
        "css" => "text/css",
        _ => return None,
    })
}

// ─── Fetchers ────────────────────────────────────────────────────────────────

/// Reads packaged assets from a directory; `/` is `index.html`.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = match path.trim_start_matches('/') {
            "" => "index.html",
            rest => rest,
        };
        let relative = Path::new(relative);
        // no escaping the asset root
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl Fetcher for DirFetcher {
    fn fetch(&self, path: &str) -> Result<Asset, AssetError> {
        let file = self.resolve(path).ok_or_else(|| AssetError::Fetch {
            path: path.to_string(),
            reason: "path outside asset root".to_string(),
        })?;
        let body = std::fs::read(&file).map_err(|e| AssetError::Fetch {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let name = file.to_string_lossy().to_string();
        Ok(Asset {
            path: path.to_string(),
            content_type: content_type_for(&name).map(str::to_string),
            body,
        })
    }
}

const MAX_ASSET_BYTES: u64 = 32 * 1024 * 1024;

/// Read at most `limit` bytes. A body longer than that is an error rather
/// than a silently truncated asset.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, String> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| e.to_string())?;
    if body.len() as u64 > limit {
        return Err(format!("body exceeds {limit} bytes"));
    }
    Ok(body)
}

/// Fetches assets over HTTP from an origin base URL.
pub struct HttpFetcher {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, path: &str) -> Result<Asset, AssetError> {
        let fail = |reason: String| AssetError::Fetch {
            path: path.to_string(),
            reason,
        };
        let response = self
            .agent
            .get(&format!("{}{}", self.base_url, path))
            .call()
            .map_err(|e| fail(e.to_string()))?;
        let content_type = Some(response.content_type().to_string());
        let body = read_capped(response.into_reader(), MAX_ASSET_BYTES).map_err(fail)?;
        Ok(Asset {
            path: path.to_string(),
            content_type,
            body,
        })
    }
}
