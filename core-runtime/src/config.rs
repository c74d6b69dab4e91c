//! # Core Configuration Module
//!
//! Builder-based configuration holding the injected host bridges and the
//! tunables of the offline and AI features. Validation fails fast with a
//! descriptive error when a required bridge is missing or a feature is
//! enabled without the bridge it needs.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - durable storage for the offline cache snapshot
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - online/offline signal (required by `enable_network_awareness`)
//! - `InferenceClient` - AI backend (required by `enable_ai_features`)
//! - `Clock` - defaults to [`SystemClock`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .settings_store(Arc::new(store))
//!     .network_monitor(Arc::new(monitor))
//!     .enable_network_awareness(true)
//!     .build()?;
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, InferenceClient, NetworkMonitor, SettingsStore, SystemClock};

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Storage key the offline cache snapshot lives under.
pub const DEFAULT_OFFLINE_CACHE_KEY: &str = "offline_audio_cache";

const MB: u64 = 1024 * 1024;

/// Tunables for the offline cache and the download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineSettings {
    /// Key under which the cache snapshot is persisted
    pub storage_key: String,
    /// Range the simulated cached-payload size is drawn from
    pub synthetic_size_bytes: RangeInclusive<u64>,
    /// Progress increment per download step (percent)
    pub download_step_percent: u8,
    /// Delay before each download step
    pub download_step_delay: Duration,
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_OFFLINE_CACHE_KEY.to_string(),
            synthetic_size_bytes: 5 * MB..=15 * MB,
            download_step_percent: 10,
            download_step_delay: Duration::from_millis(300),
        }
    }
}

impl OfflineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(Error::Config(
                "Offline cache storage key cannot be empty".to_string(),
            ));
        }
        if self.synthetic_size_bytes.is_empty() {
            return Err(Error::Config(format!(
                "Synthetic size range is empty: {:?}",
                self.synthetic_size_bytes
            )));
        }
        if self.download_step_percent == 0 || self.download_step_percent > 100 {
            return Err(Error::Config(format!(
                "Download step must be within 1..=100 percent, got {}",
                self.download_step_percent
            )));
        }
        Ok(())
    }
}

/// Feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Follow connectivity changes (requires NetworkMonitor)
    pub enable_network_awareness: bool,

    /// Song generation, word lookup, translation, recommendations
    /// (requires InferenceClient)
    pub enable_ai_features: bool,
}

/// Core configuration. Construct through [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    pub settings_store: Arc<dyn SettingsStore>,
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,
    pub inference_client: Option<Arc<dyn InferenceClient>>,
    pub clock: Arc<dyn Clock>,
    pub offline: OfflineSettings,
    pub features: FeatureFlags,
    /// Per-subscriber event buffer
    pub event_buffer_size: usize,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "network_monitor",
                &self.network_monitor.as_ref().map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "inference_client",
                &self
                    .inference_client
                    .as_ref()
                    .map(|_| "InferenceClient { ... }"),
            )
            .field("offline", &self.offline)
            .field("features", &self.features)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks tunables and that every enabled feature has its bridge.
    pub fn validate(&self) -> Result<()> {
        self.offline.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_ai_features && self.inference_client.is_none() {
            return Err(Error::Config(
                "AI features enabled but no InferenceClient provided. \
                 Disable the feature or inject an InferenceClient implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for the offline cache. \
                 Desktop: use core_service::bootstrap_desktop or inject SqliteSettingsStore. \
                 Web: inject a localStorage-backed store. \
                 Mobile: inject UserDefaults/SharedPreferences."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    settings_store: Option<Arc<dyn SettingsStore>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    inference_client: Option<Arc<dyn InferenceClient>>,
    clock: Option<Arc<dyn Clock>>,
    offline: Option<OfflineSettings>,
    features: FeatureFlags,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn inference_client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.inference_client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn offline_settings(mut self, settings: OfflineSettings) -> Self {
        self.offline = Some(settings);
        self
    }

    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    pub fn enable_ai_features(mut self, enabled: bool) -> Self {
        self.features.enable_ai_features = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `SettingsStore` was provided
    /// - [`Error::Config`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let settings_store = self.settings_store.ok_or_else(settings_store_missing_error)?;

        let config = CoreConfig {
            settings_store,
            network_monitor: self.network_monitor,
            inference_client: self.inference_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            offline: self.offline.unwrap_or_default(),
            features: self.features,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}
