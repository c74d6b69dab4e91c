//! Cache entries and the persisted snapshot layout

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one offline-cached audio asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub item_id: String,
    /// Remote location the audio was recorded from
    pub source_url: String,
    pub cached_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn size_megabytes(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// On-disk shape of one entry. The item id is the map key.
///
/// `url` and `size` are accepted for snapshots written by the web client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(alias = "url")]
    source_url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    cached_at: DateTime<Utc>,
    #[serde(alias = "size", deserialize_with = "whole_bytes")]
    size_bytes: u64,
}

/// Sizes written by the web client are floating point; round them and
/// clamp negatives to zero.
fn whole_bytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(serde::de::Error::custom(format!("invalid size {}", raw)));
    }
    Ok(raw.round().clamp(0.0, u64::MAX as f64) as u64)
}

/// Serialize the map as a JSON object keyed by item id, in key order.
pub(crate) fn encode_snapshot(entries: &HashMap<String, CacheEntry>) -> serde_json::Result<String> {
    let stored: BTreeMap<&str, StoredEntry> = entries
        .values()
        .map(|entry| {
            (
                entry.item_id.as_str(),
                StoredEntry {
                    source_url: entry.source_url.clone(),
                    cached_at: entry.cached_at,
                    size_bytes: entry.size_bytes,
                },
            )
        })
        .collect();
    serde_json::to_string(&stored)
}

pub(crate) fn decode_snapshot(raw: &str) -> serde_json::Result<HashMap<String, CacheEntry>> {
    let stored: HashMap<String, StoredEntry> = serde_json::from_str(raw)?;
    Ok(stored
        .into_iter()
        .map(|(item_id, stored)| {
            let entry = CacheEntry {
                item_id: item_id.clone(),
                source_url: stored.source_url,
                cached_at: stored.cached_at,
                size_bytes: stored.size_bytes,
            };
            (item_id, entry)
        })
        .collect())
}
