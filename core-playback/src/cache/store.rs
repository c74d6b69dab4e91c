//! The offline audio cache

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bridge_traits::{Clock, SettingsStore, SystemClock};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_url;
use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::config::CacheConfig;
use super::entry::{decode_snapshot, encode_snapshot, CacheEntry};
use super::stats::CacheStats;
use crate::error::{PlaybackError, Result};

/// Item id to cached-audio metadata, mirrored to a [`SettingsStore`].
///
/// Reads are synchronous and served from memory. Mutations update memory and
/// then persist the full map before returning. Persistence failures are
/// logged and swallowed: the in-memory map stays authoritative for the rest
/// of the process.
///
/// Instances are independent; share one through an `Arc`.
pub struct OfflineAudioCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    store: Arc<dyn SettingsStore>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
    /// Serializes mutate-then-persist so snapshots reach the store in
    /// mutation order.
    persist_gate: Mutex<()>,
}

impl OfflineAudioCache {
    /// Load the cache from `store`.
    ///
    /// A missing, unreadable or malformed snapshot yields an empty cache.
    /// Only an invalid `config` is an error.
    pub async fn load(store: Arc<dyn SettingsStore>, config: CacheConfig) -> Result<Self> {
        Self::load_with_clock(store, config, Arc::new(SystemClock)).await
    }

    #[instrument(skip(store, config, clock), fields(key = %config.storage_key))]
    pub async fn load_with_clock(
        store: Arc<dyn SettingsStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let entries = match store.get_string(&config.storage_key).await {
            Ok(Some(raw)) => match decode_snapshot(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, "Offline cache snapshot is malformed; starting empty");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                error!(error = %e, "Failed to read offline cache snapshot; starting empty");
                HashMap::new()
            }
        };

        info!(entries = entries.len(), "Offline cache loaded");

        Ok(Self {
            entries: RwLock::new(entries),
            store,
            config,
            clock,
            events: None,
            persist_gate: Mutex::new(()),
        })
    }

    /// Publish cache mutations on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Record `source_url` as available offline for `item_id`.
    ///
    /// Replaces any existing entry. Nothing is fetched; the size is synthetic.
    #[instrument(skip(self, source_url), fields(source_url = %redact_url(source_url)))]
    pub async fn cache_audio(&self, item_id: &str, source_url: &str) -> CacheEntry {
        let entry = CacheEntry {
            item_id: item_id.to_string(),
            source_url: source_url.to_string(),
            cached_at: self.clock.now(),
            size_bytes: self.synthetic_size(),
        };

        let _gate = self.persist_gate.lock().await;
        let replaced = self
            .entries
            .write()
            .insert(item_id.to_string(), entry.clone())
            .is_some();
        self.persist().await;

        debug!(replaced, size_bytes = entry.size_bytes, "Cached audio");
        self.emit(CacheEvent::AudioCached {
            item_id: item_id.to_string(),
            size_bytes: entry.size_bytes,
        });
        entry
    }

    pub fn has_offline_audio(&self, item_id: &str) -> bool {
        self.entries.read().contains_key(item_id)
    }

    /// Cached source locator for `item_id`, if any.
    pub fn get_offline_audio(&self, item_id: &str) -> Option<String> {
        self.entries
            .read()
            .get(item_id)
            .map(|entry| entry.source_url.clone())
    }

    pub fn entry(&self, item_id: &str) -> Option<CacheEntry> {
        self.entries.read().get(item_id).cloned()
    }

    /// Drop the entry for `item_id`. Absent ids are a no-op, but the map is
    /// still persisted.
    #[instrument(skip(self))]
    pub async fn remove_offline_audio(&self, item_id: &str) {
        let _gate = self.persist_gate.lock().await;
        let removed = self.entries.write().remove(item_id).is_some();
        self.persist().await;

        if removed {
            debug!("Removed offline audio");
            self.emit(CacheEvent::AudioRemoved {
                item_id: item_id.to_string(),
            });
        }
    }

    #[instrument(skip(self))]
    pub async fn clear_all(&self) {
        let _gate = self.persist_gate.lock().await;
        let removed = {
            let mut entries = self.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        self.persist().await;

        info!(removed, "Cleared offline cache");
        self.emit(CacheEvent::Cleared { removed });
    }

    /// Ids of every cached item. Order is unspecified.
    pub fn get_all_cached(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::from_entries(self.entries.read().values())
    }

    fn synthetic_size(&self) -> u64 {
        rand::thread_rng().gen_range(self.config.synthetic_size_bytes.clone())
    }

    /// Write the current map to the store. Must be called with the gate held.
    async fn persist(&self) {
        // Snapshot under the lock, write after releasing it.
        let snapshot = encode_snapshot(&self.entries.read());
        let raw = match snapshot {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to serialize offline cache");
                return;
            }
        };

        if let Err(e) = self.store.set_string(&self.config.storage_key, &raw).await {
            error!(error = %e, "Failed to persist offline cache; keeping in-memory state");
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::OfflineCache(event)).ok();
        }
    }
}

impl fmt::Debug for OfflineAudioCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineAudioCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
