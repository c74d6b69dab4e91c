//! # Download Manager
//!
//! Keeps one [`DownloadRecord`] per downloaded song or playlist and drives
//! the download tasks behind them.
//!
//! A record follows its task: progress updates while downloading, then
//! `Completed` with a timestamp. Failed and cancelled downloads drop their
//! record, so the item shows up as not downloaded again. Removing a song's
//! record also evicts its audio from the offline cache.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_playback::{
    DownloadConfig, DownloadHandle, DownloadProgress, DownloadRequest, DownloadTask,
    OfflineAudioCache, ProgressReporter,
};
use core_runtime::events::EventBus;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::DropGuard;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{CoreError, Result};

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    Song,
    Playlist,
}

impl fmt::Display for DownloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadKind::Song => write!(f, "song"),
            DownloadKind::Playlist => write!(f, "playlist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadStatus::Pending | DownloadStatus::Downloading)
    }
}

/// One downloaded (or downloading) item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: Uuid,
    pub kind: DownloadKind,
    pub item_id: String,
    pub status: DownloadStatus,
    /// 0-100
    pub progress: u8,
    /// Estimated when the download starts; the cached size once a song completes
    pub file_size: u64,
    pub downloaded_at: Option<DateTime<Utc>>,
}

/// Human readable size: `"0 MB"` for zero, otherwise megabytes with one decimal.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 MB".to_string();
    }
    format!("{:.1} MB", bytes as f64 / MB as f64)
}

struct Slot {
    record: DownloadRecord,
    // Dropping the guard cancels the task if it is still running.
    _cancel: Option<DropGuard>,
}

type Slots = Arc<RwLock<Vec<Slot>>>;

/// Mirrors task progress into the record, after the backend accepted it.
struct RecordReporter {
    slots: Slots,
    id: Uuid,
    backend: Option<Arc<dyn ProgressReporter>>,
}

#[async_trait]
impl ProgressReporter for RecordReporter {
    async fn report(&self, item_id: &str, percent: u8) -> BridgeResult<()> {
        if let Some(backend) = &self.backend {
            backend.report(item_id, percent).await?;
        }

        let mut slots = self.slots.write();
        let slot = slots
            .iter_mut()
            .find(|slot| slot.record.id == self.id)
            .ok_or_else(|| BridgeError::OperationFailed("download record was removed".into()))?;
        slot.record.progress = percent;
        slot.record.status = DownloadStatus::Downloading;
        Ok(())
    }
}

/// Tracks download records and starts download tasks.
pub struct DownloadManager {
    cache: Arc<OfflineAudioCache>,
    config: DownloadConfig,
    events: EventBus,
    clock: Arc<dyn Clock>,
    estimate_bytes: RangeInclusive<u64>,
    backend: Option<Arc<dyn ProgressReporter>>,
    slots: Slots,
}

impl DownloadManager {
    pub fn new(cache: Arc<OfflineAudioCache>, config: DownloadConfig, events: EventBus) -> Self {
        Self {
            cache,
            config,
            events,
            clock: Arc::new(SystemClock),
            estimate_bytes: 10 * MB..=60 * MB,
            backend: None,
            slots: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Forward every progress step to `reporter`, e.g. the backend record
    /// update. A rejected step fails the download.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.backend = Some(reporter);
        self
    }

    /// Range the size estimate of a new record is drawn from (default: 10-60 MB).
    pub fn with_size_estimate(mut self, range: RangeInclusive<u64>) -> Self {
        self.estimate_bytes = range;
        self
    }

    /// Start downloading an item.
    ///
    /// Songs with a `source_url` end up in the offline cache. Refuses items
    /// that are already downloading or downloaded.
    #[instrument(skip(self, source_url))]
    pub fn start(
        &self,
        kind: DownloadKind,
        item_id: &str,
        source_url: Option<&str>,
    ) -> Result<DownloadHandle> {
        let id = Uuid::new_v4();
        {
            let mut slots = self.slots.write();
            if let Some(existing) = slots
                .iter()
                .find(|slot| slot.record.kind == kind && slot.record.item_id == item_id)
            {
                let item_id = item_id.to_string();
                return Err(match existing.record.status {
                    DownloadStatus::Completed => CoreError::AlreadyDownloaded { kind, item_id },
                    _ => CoreError::DownloadInProgress { kind, item_id },
                });
            }

            let file_size = if self.estimate_bytes.is_empty() {
                0
            } else {
                rand::thread_rng().gen_range(self.estimate_bytes.clone())
            };
            slots.push(Slot {
                record: DownloadRecord {
                    id,
                    kind,
                    item_id: item_id.to_string(),
                    status: DownloadStatus::Pending,
                    progress: 0,
                    file_size,
                    downloaded_at: None,
                },
                _cancel: None,
            });
        }

        let request = match (kind, source_url) {
            (DownloadKind::Song, Some(url)) => DownloadRequest::song(item_id, url),
            _ => DownloadRequest::without_audio(item_id),
        };
        let reporter = Arc::new(RecordReporter {
            slots: Arc::clone(&self.slots),
            id,
            backend: self.backend.clone(),
        });
        let handle = DownloadTask::new(Arc::clone(&self.cache), request)
            .with_config(self.config.clone())
            .with_reporter(reporter)
            .with_event_bus(self.events.clone())
            .spawn();

        if let Some(slot) = self.slots.write().iter_mut().find(|s| s.record.id == id) {
            slot._cancel = Some(handle.cancel_on_drop());
        }

        tokio::spawn(follow(
            handle.subscribe(),
            Arc::clone(&self.slots),
            id,
            Arc::clone(&self.clock),
        ));

        info!(%id, "Download record created");
        Ok(handle)
    }

    /// Remove an item's record and, for songs, its cached audio. A running
    /// download is cancelled. Returns false if there was no record.
    #[instrument(skip(self))]
    pub async fn remove(&self, kind: DownloadKind, item_id: &str) -> bool {
        // Dropping the slot cancels its task before the audio is evicted.
        let removed = {
            let mut slots = self.slots.write();
            let before = slots.len();
            slots.retain(|slot| !(slot.record.kind == kind && slot.record.item_id == item_id));
            before != slots.len()
        };

        if removed && kind == DownloadKind::Song {
            self.cache.remove_offline_audio(item_id).await;
        }
        debug!(removed, "Download removed");
        removed
    }

    /// Remove every record and the cached audio of every song. Returns the
    /// number of records removed.
    #[instrument(skip(self))]
    pub async fn remove_all(&self) -> usize {
        let drained: Vec<DownloadRecord> = self
            .slots
            .write()
            .drain(..)
            .map(|slot| slot.record)
            .collect();

        for record in drained.iter().filter(|r| r.kind == DownloadKind::Song) {
            self.cache.remove_offline_audio(&record.item_id).await;
        }
        info!(removed = drained.len(), "All downloads removed");
        drained.len()
    }

    pub fn records(&self) -> Vec<DownloadRecord> {
        self.slots.read().iter().map(|s| s.record.clone()).collect()
    }

    pub fn record(&self, kind: DownloadKind, item_id: &str) -> Option<DownloadRecord> {
        self.slots
            .read()
            .iter()
            .find(|s| s.record.kind == kind && s.record.item_id == item_id)
            .map(|s| s.record.clone())
    }

    /// Records still pending or downloading
    pub fn active(&self) -> Vec<DownloadRecord> {
        self.filtered(|r| r.status.is_active())
    }

    pub fn completed(&self) -> Vec<DownloadRecord> {
        self.filtered(|r| r.status == DownloadStatus::Completed)
    }

    pub fn is_downloaded(&self, kind: DownloadKind, item_id: &str) -> bool {
        self.record(kind, item_id)
            .map_or(false, |r| r.status == DownloadStatus::Completed)
    }

    /// Sum of `file_size` over completed records
    pub fn total_completed_bytes(&self) -> u64 {
        self.slots
            .read()
            .iter()
            .filter(|s| s.record.status == DownloadStatus::Completed)
            .map(|s| s.record.file_size)
            .sum()
    }

    fn filtered(&self, keep: impl Fn(&DownloadRecord) -> bool) -> Vec<DownloadRecord> {
        self.slots
            .read()
            .iter()
            .filter(|s| keep(&s.record))
            .map(|s| s.record.clone())
            .collect()
    }
}

/// Apply the task's final state to its record.
async fn follow(
    mut progress: watch::Receiver<DownloadProgress>,
    slots: Slots,
    id: Uuid,
    clock: Arc<dyn Clock>,
) {
    let last = loop {
        let current = progress.borrow_and_update().clone();
        if current.is_terminal() {
            break current;
        }
        if progress.changed().await.is_err() {
            break progress.borrow().clone();
        }
    };

    let mut slots = slots.write();
    match last {
        DownloadProgress::Completed { entry } => {
            if let Some(slot) = slots.iter_mut().find(|s| s.record.id == id) {
                slot.record.status = DownloadStatus::Completed;
                slot.record.progress = 100;
                slot.record.downloaded_at = Some(clock.now());
                if let Some(entry) = entry {
                    slot.record.file_size = entry.size_bytes;
                }
                slot._cancel = None;
            }
        }
        _ => slots.retain(|s| s.record.id != id),
    }
}
