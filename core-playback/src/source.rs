//! # Playback Source Selection
//!
//! Decides which locator the player should load for the current item.
//!
//! | online | cached | effective source | can play |
//! |--------|--------|------------------|----------|
//! | yes    | any    | canonical        | yes      |
//! | no     | yes    | cached           | yes      |
//! | no     | no     | canonical        | no       |
//!
//! The selector recomputes synchronously on every connectivity transition
//! and every request change, and publishes the result on a `watch` channel.
//! [`ConnectivityWatcher`] wires a [`NetworkMonitor`] into a selector and
//! deregisters its listener when dropped or stopped.

use std::fmt;
use std::sync::Arc;

use bridge_traits::NetworkMonitor;
use core_runtime::events::{ConnectivityEvent, CoreEvent, EventBus};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::OfflineAudioCache;
use crate::error::{PlaybackError, Result};

/// Resolved playback state for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSource {
    pub item_id: Option<String>,
    /// Locator the player should load; `None` when nothing is selected or the
    /// item has no audio at all
    pub effective_source: Option<String>,
    pub is_offline: bool,
    pub has_offline_version: bool,
    /// `online || has_offline_version`
    pub can_play: bool,
}

impl PlaybackSource {
    /// True when playback is served from the offline cache.
    pub fn is_from_cache(&self) -> bool {
        self.is_offline && self.has_offline_version
    }
}

#[derive(Debug, Clone)]
struct PlaybackRequest {
    item_id: String,
    canonical_url: Option<String>,
}

#[derive(Debug)]
struct SelectorState {
    online: bool,
    request: Option<PlaybackRequest>,
}

/// Connectivity-aware source selector.
pub struct PlaybackSourceSelector {
    cache: Arc<OfflineAudioCache>,
    state: RwLock<SelectorState>,
    resolved: watch::Sender<PlaybackSource>,
}

impl PlaybackSourceSelector {
    pub fn new(cache: Arc<OfflineAudioCache>, online: bool) -> Self {
        let (resolved, _) = watch::channel(PlaybackSource {
            is_offline: !online,
            can_play: online,
            ..PlaybackSource::default()
        });
        Self {
            cache,
            state: RwLock::new(SelectorState {
                online,
                request: None,
            }),
            resolved,
        }
    }

    /// Switch to a new item. `canonical_url` is the remote audio locator.
    pub fn select(&self, item_id: &str, canonical_url: Option<&str>) -> PlaybackSource {
        let mut state = self.state.write();
        state.request = Some(PlaybackRequest {
            item_id: item_id.to_string(),
            canonical_url: canonical_url.map(str::to_string),
        });
        self.publish(&state)
    }

    /// Forget the current request.
    pub fn clear(&self) -> PlaybackSource {
        let mut state = self.state.write();
        state.request = None;
        self.publish(&state)
    }

    /// Apply a connectivity transition.
    pub fn set_online(&self, online: bool) -> PlaybackSource {
        let mut state = self.state.write();
        state.online = online;
        self.publish(&state)
    }

    /// Recompute after the cache changed underneath the current request.
    pub fn refresh(&self) -> PlaybackSource {
        let state = self.state.write();
        self.publish(&state)
    }

    pub fn is_online(&self) -> bool {
        self.state.read().online
    }

    pub fn state(&self) -> PlaybackSource {
        self.resolved.borrow().clone()
    }

    pub fn effective_source(&self) -> Option<String> {
        self.resolved.borrow().effective_source.clone()
    }

    pub fn can_play(&self) -> bool {
        self.resolved.borrow().can_play
    }

    /// Receiver that observes every recomputed state.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSource> {
        self.resolved.subscribe()
    }

    /// Resolve and publish. Callers hold the write lock so publications
    /// follow mutation order.
    fn publish(&self, state: &SelectorState) -> PlaybackSource {
        let online = state.online;

        let resolved = match &state.request {
            None => PlaybackSource {
                item_id: None,
                effective_source: None,
                is_offline: !online,
                has_offline_version: false,
                can_play: online,
            },
            Some(request) => {
                let cached = self.cache.get_offline_audio(&request.item_id);
                let has_offline_version = cached.is_some();
                let effective_source = match cached {
                    Some(local) if !online => Some(local),
                    _ => request.canonical_url.clone(),
                };
                PlaybackSource {
                    item_id: Some(request.item_id.clone()),
                    effective_source,
                    is_offline: !online,
                    has_offline_version,
                    can_play: online || has_offline_version,
                }
            }
        };

        self.resolved.send_replace(resolved.clone());
        resolved
    }
}

impl fmt::Debug for PlaybackSourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSourceSelector")
            .field("state", &*self.state.read())
            .finish()
    }
}

/// Feeds connectivity transitions from a [`NetworkMonitor`] into a selector.
///
/// The listener is registered on [`spawn`](Self::spawn) and deregistered when
/// the watcher is stopped or dropped.
pub struct ConnectivityWatcher {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ConnectivityWatcher {
    /// Apply the monitor's current state, then follow its changes.
    #[instrument(skip_all)]
    pub async fn spawn(
        monitor: Arc<dyn NetworkMonitor>,
        selector: Arc<PlaybackSourceSelector>,
        events: Option<EventBus>,
    ) -> Result<Self> {
        let mut changes = monitor.subscribe_changes().await?;
        selector.set_online(monitor.is_connected().await);

        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Connectivity watcher cancelled");
                        break;
                    }
                    next = changes.next() => {
                        let Some(info) = next else {
                            warn!("Network change stream closed");
                            break;
                        };
                        let online = info.is_online();
                        if online == selector.is_online() {
                            continue;
                        }
                        info!(online, "Connectivity changed");
                        selector.set_online(online);
                        if let Some(bus) = &events {
                            bus.emit(CoreEvent::Connectivity(ConnectivityEvent::from_online(online)))
                                .ok();
                        }
                    }
                }
            }
            // `changes` is dropped here, which deregisters the listener.
        });

        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Cancel and wait for the listener to be released.
    pub async fn stop(mut self) -> Result<()> {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| PlaybackError::Task(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ConnectivityWatcher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use bridge_desktop::SqliteSettingsStore;

    async fn cache() -> Arc<OfflineAudioCache> {
        let store = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
        Arc::new(
            OfflineAudioCache::load(store, CacheConfig::default())
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_nothing_selected() {
        let selector = PlaybackSourceSelector::new(cache().await, false);
        let state = selector.state();
        assert_eq!(state.item_id, None);
        assert!(state.is_offline);
        assert!(!state.can_play);
    }

    #[tokio::test]
    async fn test_online_prefers_canonical_even_when_cached() {
        let cache = cache().await;
        cache.cache_audio("song-1", "https://x/a.mp3").await;
        let selector = PlaybackSourceSelector::new(cache, true);

        let state = selector.select("song-1", Some("https://cdn/live.mp3"));
        assert_eq!(state.effective_source.as_deref(), Some("https://cdn/live.mp3"));
        assert!(state.has_offline_version);
        assert!(state.can_play);
        assert!(!state.is_from_cache());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let cache = cache().await;
        cache.cache_audio("song-1", "https://x/a.mp3").await;
        let selector = PlaybackSourceSelector::new(cache, true);
        let mut rx = selector.subscribe();

        selector.select("song-1", Some("https://cdn/live.mp3"));
        selector.set_online(false);

        rx.changed().await.unwrap();
        let latest = rx.borrow_and_update().clone();
        assert!(latest.is_from_cache());
        assert_eq!(latest.effective_source.as_deref(), Some("https://x/a.mp3"));
    }

    #[tokio::test]
    async fn test_refresh_after_cache_change() {
        let cache = cache().await;
        let selector = PlaybackSourceSelector::new(cache.clone(), false);
        assert!(!selector.select("song-1", Some("https://cdn/a.mp3")).can_play);

        cache.cache_audio("song-1", "https://x/a.mp3").await;
        let state = selector.refresh();
        assert!(state.can_play);
        assert_eq!(state.effective_source.as_deref(), Some("https://x/a.mp3"));
    }
}
