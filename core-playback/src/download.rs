//! # Download for Offline
//!
//! A download walks its progress from 0 to 100 percent in fixed steps with a
//! delay before each, reports every step, and finally records the audio in
//! the offline cache. It runs as its own Tokio task and can be cancelled at
//! any step.
//!
//! ```rust,ignore
//! let handle = DownloadTask::new(cache.clone(), DownloadRequest::song("song-1", url))
//!     .with_event_bus(bus.clone())
//!     .spawn();
//!
//! let mut progress = handle.subscribe();
//! while progress.changed().await.is_ok() {
//!     render(progress.borrow().percent());
//! }
//! let entry = handle.wait().await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_runtime::config::OfflineSettings;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheEntry, OfflineAudioCache};
use crate::error::{PlaybackError, Result};

/// Step size and pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Progress increment per step, 1-100 (default: 10)
    pub step_percent: u8,
    /// Delay before each step (default: 300ms)
    pub step_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            step_percent: 10,
            step_delay: Duration::from_millis(300),
        }
    }
}

impl DownloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_percent(mut self, step: u8) -> Self {
        self.step_percent = step;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.step_percent == 0 || self.step_percent > 100 {
            return Err(format!(
                "step_percent must be within 1..=100, got {}",
                self.step_percent
            ));
        }
        Ok(())
    }

    /// Progress values a download passes through, strictly increasing and
    /// ending at 100.
    pub fn steps(&self) -> Vec<u8> {
        let step = self.step_percent.clamp(1, 100);
        let mut steps: Vec<u8> = (0..100u8).step_by(step as usize).collect();
        steps.push(100);
        steps
    }
}

impl From<&OfflineSettings> for DownloadConfig {
    fn from(settings: &OfflineSettings) -> Self {
        Self {
            step_percent: settings.download_step_percent,
            step_delay: settings.download_step_delay,
        }
    }
}

/// What to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub item_id: String,
    /// Audio locator to record in the cache. Items without audio (playlists)
    /// only run the progress walk.
    pub source_url: Option<String>,
}

impl DownloadRequest {
    pub fn song(item_id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            source_url: Some(source_url.into()),
        }
    }

    pub fn without_audio(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            source_url: None,
        }
    }
}

/// Observable state of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadProgress {
    Pending,
    InProgress { percent: u8 },
    /// `entry` is `None` for requests without audio.
    Completed { entry: Option<CacheEntry> },
    Failed { message: String },
    Cancelled,
}

impl DownloadProgress {
    pub fn percent(&self) -> u8 {
        match self {
            DownloadProgress::Pending => 0,
            DownloadProgress::InProgress { percent } => *percent,
            DownloadProgress::Completed { .. } => 100,
            DownloadProgress::Failed { .. } | DownloadProgress::Cancelled => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadProgress::Completed { .. }
                | DownloadProgress::Failed { .. }
                | DownloadProgress::Cancelled
        )
    }
}

/// Receives every progress step, typically to update the backend record.
///
/// An error aborts the download.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, item_id: &str, percent: u8) -> bridge_traits::error::Result<()>;
}

/// Reporter that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

#[async_trait]
impl ProgressReporter for NoopReporter {
    async fn report(&self, _item_id: &str, _percent: u8) -> bridge_traits::error::Result<()> {
        Ok(())
    }
}

/// Builder for a download task.
pub struct DownloadTask {
    cache: Arc<OfflineAudioCache>,
    request: DownloadRequest,
    config: DownloadConfig,
    reporter: Arc<dyn ProgressReporter>,
    events: Option<EventBus>,
}

impl DownloadTask {
    pub fn new(cache: Arc<OfflineAudioCache>, request: DownloadRequest) -> Self {
        Self {
            cache,
            request,
            config: DownloadConfig::default(),
            reporter: Arc::new(NoopReporter),
            events: None,
        }
    }

    pub fn with_config(mut self, config: DownloadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Start the task on the current Tokio runtime.
    ///
    /// An invalid config does not panic; the task fails immediately.
    pub fn spawn(self) -> DownloadHandle {
        let item_id = self.request.item_id.clone();
        let token = CancellationToken::new();
        let (progress_tx, progress_rx) = watch::channel(DownloadProgress::Pending);

        let run = DownloadRun {
            task: self,
            token: token.clone(),
            progress: progress_tx,
        };
        let join = tokio::spawn(run.execute());

        DownloadHandle {
            item_id,
            token,
            progress: progress_rx,
            join,
        }
    }
}

struct DownloadRun {
    task: DownloadTask,
    token: CancellationToken,
    progress: watch::Sender<DownloadProgress>,
}

impl DownloadRun {
    #[instrument(skip(self), fields(item_id = %self.task.request.item_id))]
    async fn execute(self) -> Result<Option<CacheEntry>> {
        let item_id = self.task.request.item_id.clone();

        if let Err(message) = self.task.config.validate() {
            return Err(self.fail(&item_id, PlaybackError::InvalidConfig(message)));
        }

        info!("Download started");
        self.emit(DownloadEvent::Started {
            item_id: item_id.clone(),
        });

        for percent in self.task.config.steps() {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(self.cancelled(&item_id)),
                _ = tokio::time::sleep(self.task.config.step_delay) => {}
            }

            let reported = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(self.cancelled(&item_id)),
                reported = self.task.reporter.report(&item_id, percent) => reported,
            };
            if let Err(e) = reported {
                let error = PlaybackError::DownloadFailed {
                    item_id: item_id.clone(),
                    message: e.to_string(),
                };
                return Err(self.fail(&item_id, error));
            }

            debug!(percent, "Download progress");
            self.progress
                .send_replace(DownloadProgress::InProgress { percent });
            self.emit(DownloadEvent::Progress {
                item_id: item_id.clone(),
                percent,
            });
        }

        if self.token.is_cancelled() {
            return Err(self.cancelled(&item_id));
        }

        let entry = match &self.task.request.source_url {
            Some(url) => Some(self.task.cache.cache_audio(&item_id, url).await),
            None => None,
        };

        // Cancelled while recording: an eviction may already have run, so
        // take the entry back out instead of leaving it orphaned.
        if self.token.is_cancelled() {
            if entry.is_some() {
                self.task.cache.remove_offline_audio(&item_id).await;
            }
            return Err(self.cancelled(&item_id));
        }

        info!("Download completed");
        self.emit(DownloadEvent::Completed {
            item_id: item_id.clone(),
            size_bytes: entry.as_ref().map_or(0, |e| e.size_bytes),
        });
        self.progress.send_replace(DownloadProgress::Completed {
            entry: entry.clone(),
        });
        Ok(entry)
    }

    fn cancelled(&self, item_id: &str) -> PlaybackError {
        info!("Download cancelled");
        self.progress.send_replace(DownloadProgress::Cancelled);
        self.emit(DownloadEvent::Cancelled {
            item_id: item_id.to_string(),
        });
        PlaybackError::DownloadCancelled(item_id.to_string())
    }

    fn fail(&self, item_id: &str, error: PlaybackError) -> PlaybackError {
        warn!(error = %error, "Download failed");
        let message = error.to_string();
        self.progress.send_replace(DownloadProgress::Failed {
            message: message.clone(),
        });
        self.emit(DownloadEvent::Failed {
            item_id: item_id.to_string(),
            message,
        });
        error
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(bus) = &self.task.events {
            bus.emit(CoreEvent::Download(event)).ok();
        }
    }
}

/// Handle to a running download.
///
/// Dropping the handle does not stop the task; use [`cancel`](Self::cancel)
/// or hold a [`cancel_on_drop`](Self::cancel_on_drop) guard.
pub struct DownloadHandle {
    item_id: String,
    token: CancellationToken,
    progress: watch::Receiver<DownloadProgress>,
    join: JoinHandle<Result<Option<CacheEntry>>>,
}

impl DownloadHandle {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Stop at the next step boundary. The cache is left untouched.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Guard that cancels the download when dropped, e.g. when the view that
    /// started it goes away.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn progress(&self) -> DownloadProgress {
        self.progress.borrow().clone()
    }

    /// Receiver for progress updates. Intermediate values may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<DownloadProgress> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task to finish.
    ///
    /// Returns the cache entry (if the request carried audio), or the
    /// failure/cancellation error.
    pub async fn wait(self) -> Result<Option<CacheEntry>> {
        self.join
            .await
            .map_err(|e| PlaybackError::Task(e.to_string()))?
    }
}

impl fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("item_id", &self.item_id)
            .field("progress", &*self.progress.borrow())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
