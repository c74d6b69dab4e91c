//! # Offline Playback Module
//!
//! Everything the player needs to keep working without a network:
//!
//! - [`cache::OfflineAudioCache`] - item id to cached-audio metadata, mirrored
//!   to the host `SettingsStore` on every mutation
//! - [`source::PlaybackSourceSelector`] - picks the canonical or the cached
//!   source from the online/offline signal
//! - [`source::ConnectivityWatcher`] - feeds `NetworkMonitor` transitions into
//!   a selector for as long as it lives
//! - [`download::DownloadTask`] - cancellable, progress-reporting
//!   "download for offline" operation

pub mod cache;
pub mod download;
pub mod error;
pub mod source;

pub use cache::{CacheConfig, CacheEntry, CacheStats, OfflineAudioCache};
pub use download::{
    DownloadConfig, DownloadHandle, DownloadProgress, DownloadRequest, DownloadTask,
    NoopReporter, ProgressReporter,
};
pub use error::{PlaybackError, Result};
pub use source::{ConnectivityWatcher, PlaybackSource, PlaybackSourceSelector};
