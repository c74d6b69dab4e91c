//! # Offline Cache Module
//!
//! Metadata-only offline audio cache.
//!
//! ## Overview
//!
//! The cache maps an item id to the audio source it was "downloaded" from,
//! when, and how large the payload is. No bytes are fetched: the download
//! flow is simulated and only the metadata is recorded. The whole map is
//! serialized to one key of the host [`SettingsStore`] after every mutation
//! and read back when a cache is loaded.
//!
//! ```text
//! ┌────────────────────────────────┐
//! │       OfflineAudioCache        │
//! │  - cache_audio()               │
//! │  - has/get_offline_audio()     │
//! │  - remove / clear_all()        │
//! └────────┬───────────────────────┘
//!          │ JSON snapshot
//!          ▼
//!   SettingsStore["offline_audio_cache"]
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, OfflineAudioCache};
//!
//! let cache = OfflineAudioCache::load(store, CacheConfig::default()).await?;
//! cache.cache_audio("song-1", "https://cdn.example/a.mp3").await;
//! assert_eq!(cache.get_offline_audio("song-1").as_deref(), Some("https://cdn.example/a.mp3"));
//! ```
//!
//! [`SettingsStore`]: bridge_traits::SettingsStore

pub mod config;
pub mod entry;
pub mod stats;
pub mod store;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::OfflineAudioCache;
