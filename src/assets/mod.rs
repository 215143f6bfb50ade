pub mod cache;

pub use cache::{Asset, AssetCache, AssetError, DirFetcher, Fetcher, HttpFetcher, Served};

use crate::config::settings::AssetConfig;

/// The origin assets are installed from and misses fall through to, if one
/// is configured. A local directory wins over a URL.
pub fn origin_from_config(config: &AssetConfig) -> Option<Box<dyn Fetcher>> {
    if let Some(dir) = &config.origin_dir {
        return Some(Box::new(DirFetcher::new(dir)));
    }
    config
        .origin_url
        .as_deref()
        .map(|url| Box::new(HttpFetcher::new(url)) as Box<dyn Fetcher>)
}

/// Stand-in origin for when none is configured: every fetch fails.
pub struct NoOrigin;

impl Fetcher for NoOrigin {
    fn fetch(&self, path: &str) -> Result<Asset, AssetError> {
        Err(AssetError::Fetch {
            path: path.to_string(),
            reason: "no asset origin configured".to_string(),
        })
    }
}
