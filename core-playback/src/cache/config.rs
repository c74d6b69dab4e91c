//! Cache configuration

use std::ops::RangeInclusive;

use core_runtime::config::{OfflineSettings, DEFAULT_OFFLINE_CACHE_KEY};

const MB: u64 = 1024 * 1024;

/// Configuration for [`OfflineAudioCache`](super::OfflineAudioCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Storage key holding the serialized snapshot (default: `offline_audio_cache`)
    pub storage_key: String,

    /// Range the simulated payload size is drawn from (default: 5-15 MB)
    pub synthetic_size_bytes: RangeInclusive<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_OFFLINE_CACHE_KEY.to_string(),
            synthetic_size_bytes: 5 * MB..=15 * MB,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_synthetic_size(mut self, range: RangeInclusive<u64>) -> Self {
        self.synthetic_size_bytes = range;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage_key.trim().is_empty() {
            return Err("storage_key cannot be empty".to_string());
        }

        if self.synthetic_size_bytes.is_empty() {
            return Err(format!(
                "synthetic_size_bytes range is empty: {:?}",
                self.synthetic_size_bytes
            ));
        }

        Ok(())
    }
}

impl From<&OfflineSettings> for CacheConfig {
    fn from(settings: &OfflineSettings) -> Self {
        Self {
            storage_key: settings.storage_key.clone(),
            synthetic_size_bytes: settings.synthetic_size_bytes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.storage_key, "offline_audio_cache");
        assert_eq!(config.synthetic_size_bytes, 5 * MB..=15 * MB);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = CacheConfig::new()
            .with_storage_key("other_cache")
            .with_synthetic_size(1..=1);
        assert_eq!(config.storage_key, "other_cache");
        assert!(config.validate().is_ok());

        assert!(CacheConfig::new().with_storage_key("").validate().is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let empty = 9..=1;
        assert!(CacheConfig::new().with_synthetic_size(empty).validate().is_err());
    }

    #[test]
    fn test_from_offline_settings() {
        let settings = OfflineSettings {
            storage_key: "k".to_string(),
            ..OfflineSettings::default()
        };
        let config = CacheConfig::from(&settings);
        assert_eq!(config.storage_key, "k");
        assert_eq!(config.synthetic_size_bytes, settings.synthetic_size_bytes);
    }
}
