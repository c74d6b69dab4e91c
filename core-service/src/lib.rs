//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (settings storage,
//! network monitor, inference backend) into the shared Rust core: the offline
//! cache, the playback source selector, the download manager and, with the
//! `ai` feature, the generation services. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) and start from
//! [`bootstrap_desktop`].

#[cfg(feature = "ai")]
pub mod ai;
pub mod downloads;
pub mod error;

pub use downloads::{format_size, DownloadKind, DownloadManager, DownloadRecord, DownloadStatus};
pub use error::{CoreError, Result};

#[cfg(feature = "ai")]
pub use ai::AiService;

use std::sync::Arc;

use core_playback::{
    CacheConfig, ConnectivityWatcher, DownloadConfig, OfflineAudioCache, PlaybackSourceSelector,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
pub struct CoreService {
    events: EventBus,
    cache: Arc<OfflineAudioCache>,
    selector: Arc<PlaybackSourceSelector>,
    downloads: DownloadManager,
    watcher: Mutex<Option<ConnectivityWatcher>>,
    #[cfg(feature = "ai")]
    ai: Option<AiService>,
}

impl CoreService {
    /// Load the offline cache and start the enabled features.
    ///
    /// With network awareness enabled the selector follows the monitor until
    /// [`shutdown`](Self::shutdown) or drop. Without a monitor the core
    /// assumes it is online.
    ///
    /// Fails with [`CoreError::InitializationFailed`] when the monitor
    /// refuses the change subscription.
    #[instrument(skip_all)]
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let cache = Arc::new(
            OfflineAudioCache::load_with_clock(
                Arc::clone(&config.settings_store),
                CacheConfig::from(&config.offline),
                Arc::clone(&config.clock),
            )
            .await?
            .with_event_bus(events.clone()),
        );

        let online = match &config.network_monitor {
            Some(monitor) => monitor.is_connected().await,
            None => true,
        };
        let selector = Arc::new(PlaybackSourceSelector::new(Arc::clone(&cache), online));

        let watcher = match (&config.network_monitor, config.features.enable_network_awareness) {
            (Some(monitor), true) => Some(
                ConnectivityWatcher::spawn(
                    Arc::clone(monitor),
                    Arc::clone(&selector),
                    Some(events.clone()),
                )
                .await
                .map_err(|e| {
                    CoreError::InitializationFailed(format!("network watcher: {}", e))
                })?,
            ),
            _ => None,
        };

        let downloads = DownloadManager::new(
            Arc::clone(&cache),
            DownloadConfig::from(&config.offline),
            events.clone(),
        )
        .with_clock(Arc::clone(&config.clock));

        #[cfg(feature = "ai")]
        let ai = match (&config.inference_client, config.features.enable_ai_features) {
            (Some(client), true) => Some(AiService::new(Arc::clone(client), events.clone())),
            _ => None,
        };

        info!(
            cached = cache.len(),
            online,
            watching = watcher.is_some(),
            "Core service ready"
        );

        Ok(Self {
            events,
            cache,
            selector,
            downloads,
            watcher: Mutex::new(watcher),
            #[cfg(feature = "ai")]
            ai,
        })
    }

    pub fn offline_cache(&self) -> Arc<OfflineAudioCache> {
        Arc::clone(&self.cache)
    }

    pub fn source_selector(&self) -> Arc<PlaybackSourceSelector> {
        Arc::clone(&self.selector)
    }

    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// AI features; `None` unless enabled with an inference client.
    #[cfg(feature = "ai")]
    pub fn ai(&self) -> Option<&AiService> {
        self.ai.as_ref()
    }

    /// Whether the connectivity watcher is still following the monitor.
    pub fn is_watching_network(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .map_or(false, ConnectivityWatcher::is_running)
    }

    /// Stop following the network monitor and release its listener.
    pub async fn shutdown(&self) -> Result<()> {
        let watcher = self.watcher.lock().take();
        if let Some(watcher) = watcher {
            watcher.stop().await?;
        }
        info!("Core service shut down");
        Ok(())
    }
}

/// Handles returned by [`bootstrap_desktop`].
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub struct DesktopCore {
    pub core: CoreService,
    /// Forward the OS connectivity notifications here.
    pub network: Arc<bridge_desktop::HostNetworkMonitor>,
}

/// Convenience bootstrapper for desktop hosts.
///
/// Opens `settings.db` under `data_dir` and starts online with network
/// awareness enabled.
///
/// ```ignore
/// let desktop = core_service::bootstrap_desktop(app_data_dir).await?;
/// desktop.network.set_online(false);
/// let source = desktop.core.source_selector().select("song-1", Some(url));
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(data_dir: impl AsRef<std::path::Path>) -> Result<DesktopCore> {
    use bridge_desktop::{HostNetworkMonitor, SqliteSettingsStore};

    let store = SqliteSettingsStore::new(data_dir.as_ref().join("settings.db")).await?;
    let network = Arc::new(HostNetworkMonitor::new(true));

    let config = CoreConfig::builder()
        .settings_store(Arc::new(store))
        .network_monitor(Arc::clone(&network) as Arc<dyn bridge_traits::NetworkMonitor>)
        .enable_network_awareness(true)
        .build()?;

    Ok(DesktopCore {
        core: CoreService::new(config).await?,
        network,
    })
}
