use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Http(String),
    #[error("unexpected provider response: {0}")]
    Response(String),
    #[error("calculation failed: {0}")]
    Calculation(String),
}

/// What a provider hands back: prayer name to local `HH:MM`, plus a label
/// for the location the times were computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTimings {
    pub timings: BTreeMap<String, String>,
    pub location: String,
}

/// Source of the day's prayer times.
pub trait TimingsProvider: Send {
    fn timings(&self, date: NaiveDate) -> Result<RawTimings, ProviderError>;
}

// ─── api.aladhan.com ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AladhanEnvelope {
    data: AladhanData,
}

#[derive(Debug, Deserialize)]
struct AladhanData {
    timings: BTreeMap<String, String>,
    #[serde(default)]
    meta: Option<AladhanMeta>,
}

#[derive(Debug, Deserialize)]
struct AladhanMeta {
    #[serde(default)]
    timezone: Option<String>,
}

pub struct AladhanProvider {
    base_url: String,
    latitude: f64,
    longitude: f64,
    method: u8,
    agent: ureq::Agent,
}

impl AladhanProvider {
    pub fn new(base_url: &str, latitude: f64, longitude: f64, method: u8) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(20))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            latitude,
            longitude,
            method,
            agent,
        }
    }
}

impl TimingsProvider for AladhanProvider {
    fn timings(&self, date: NaiveDate) -> Result<RawTimings, ProviderError> {
        let url = format!("{}/v1/timings/{}", self.base_url, date.format("%d-%m-%Y"));
        log::debug!("fetching timings from {url}");
        let body = self
            .agent
            .get(&url)
            .query("latitude", &self.latitude.to_string())
            .query("longitude", &self.longitude.to_string())
            .query("method", &self.method.to_string())
            .call()
            .map_err(|e| ProviderError::Http(e.to_string()))?
            .into_string()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        parse_aladhan(&body)
    }
}

fn parse_aladhan(body: &str) -> Result<RawTimings, ProviderError> {
    let envelope: AladhanEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Response(e.to_string()))?;
    let location = envelope
        .data
        .meta
        .and_then(|m| m.timezone)
        .map(|tz| tz.replace('_', " "))
        .unwrap_or_else(|| "Your location".to_string());
    Ok(RawTimings {
        timings: envelope.data.timings,
        location,
    })
}
