//! # Event Bus System
//!
//! Typed events broadcast over `tokio::sync::broadcast` so the view layer (and
//! any other listener) can react to core state changes without polling.
//!
//! ```text
//! ┌──────────────────┐  emit  ┌───────────┐  subscribe  ┌────────────┐
//! │ OfflineAudioCache├───────>│           ├────────────>│ Offline UI │
//! └──────────────────┘        │ EventBus  │             └────────────┘
//! ┌──────────────────┐  emit  │ (broadcast│  subscribe  ┌────────────┐
//! │ DownloadTask     ├───────>│  channel) ├────────────>│ Toasts     │
//! └──────────────────┘        │           │             └────────────┘
//! ┌──────────────────┐  emit  │           │
//! │ConnectivityWatch ├───────>│           │
//! └──────────────────┘        └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Download(DownloadEvent::Progress {
//!     item_id: "song-1".to_string(),
//!     percent: 40,
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Download progress");
//! # }
//! ```
//!
//! Emitting with no subscribers returns an error that callers ignore with
//! `.ok()`; events are notifications, not a delivery guarantee.
//!
//! Events with [`EventSeverity::Error`] are the ones the view surfaces as a
//! transient notification.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, SendError},
    Receiver,
};

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Connectivity(ConnectivityEvent),
    OfflineCache(CacheEvent),
    Download(DownloadEvent),
    Generation(GenerationEvent),
}

impl CoreEvent {
    /// Human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Connectivity(e) => e.description(),
            CoreEvent::OfflineCache(e) => e.description(),
            CoreEvent::Download(e) => e.description(),
            CoreEvent::Generation(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Generation(GenerationEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Connectivity(ConnectivityEvent::Offline) => EventSeverity::Warning,
            CoreEvent::Connectivity(ConnectivityEvent::Online) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Generation(GenerationEvent::SongGenerated { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Connectivity transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

impl ConnectivityEvent {
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    fn description(&self) -> &str {
        match self {
            ConnectivityEvent::Online => "Back online",
            ConnectivityEvent::Offline => "Went offline",
        }
    }
}

/// Offline cache mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    AudioCached { item_id: String, size_bytes: u64 },
    AudioRemoved { item_id: String },
    /// Bulk clear; `removed` is the number of entries dropped.
    Cleared { removed: usize },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::AudioCached { .. } => "Audio cached for offline playback",
            CacheEvent::AudioRemoved { .. } => "Offline audio removed",
            CacheEvent::Cleared { .. } => "Offline cache cleared",
        }
    }
}

/// Lifecycle of a "download for offline" operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Started { item_id: String },
    Progress { item_id: String, percent: u8 },
    Completed { item_id: String, size_bytes: u64 },
    Failed { item_id: String, message: String },
    Cancelled { item_id: String },
}

impl DownloadEvent {
    pub fn item_id(&self) -> &str {
        match self {
            DownloadEvent::Started { item_id }
            | DownloadEvent::Progress { item_id, .. }
            | DownloadEvent::Completed { item_id, .. }
            | DownloadEvent::Failed { item_id, .. }
            | DownloadEvent::Cancelled { item_id } => item_id,
        }
    }

    fn description(&self) -> &str {
        match self {
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download progress",
            DownloadEvent::Completed { .. } => "Downloaded for offline",
            DownloadEvent::Failed { .. } => "Download failed",
            DownloadEvent::Cancelled { .. } => "Download cancelled",
        }
    }
}

/// Outcomes of AI generation requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum GenerationEvent {
    SongGenerated { title: String },
    PlaylistSuggested { song_count: usize },
    Failed { kind: String, message: String },
}

impl GenerationEvent {
    fn description(&self) -> &str {
        match self {
            GenerationEvent::SongGenerated { .. } => "Song generated",
            GenerationEvent::PlaylistSuggested { .. } => "Playlist suggested",
            GenerationEvent::Failed { .. } => "Generation failed",
        }
    }
}

/// Central event bus.
///
/// Cloning shares the underlying channel. Subscribers that fall more than
/// `capacity` events behind get `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers; returns how many received it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New independent receiver. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::default();
/// let toasts = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() == EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Next event passing the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant; `None` when nothing matching is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(item: &str, percent: u8) -> CoreEvent {
        CoreEvent::Download(DownloadEvent::Progress {
            item_id: item.to_string(),
            percent,
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(8);
        assert!(bus.emit(progress("song-1", 10)).is_err());
    }

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(progress("song-1", 20)).unwrap(), 2);
        assert_eq!(a.recv().await.unwrap(), progress("song-1", 20));
        assert_eq!(b.recv().await.unwrap(), progress("song-1", 20));
    }

    #[tokio::test]
    async fn test_filtered_stream_skips_non_matching() {
        let bus = EventBus::new(16);
        let mut errors = EventStream::new(bus.subscribe())
            .filter(|e| e.severity() == EventSeverity::Error);

        bus.emit(progress("song-1", 10)).ok();
        bus.emit(CoreEvent::Connectivity(ConnectivityEvent::Offline))
            .ok();
        bus.emit(CoreEvent::Download(DownloadEvent::Failed {
            item_id: "song-1".to_string(),
            message: "backend unavailable".to_string(),
        }))
        .ok();

        let event = errors.recv().await.unwrap();
        assert!(matches!(
            event,
            CoreEvent::Download(DownloadEvent::Failed { .. })
        ));
        assert!(errors.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for percent in [10, 20, 30, 40] {
            bus.emit(progress("song-1", percent)).ok();
        }
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            CoreEvent::Generation(GenerationEvent::Failed {
                kind: "song".to_string(),
                message: "bad schema".to_string()
            })
            .severity(),
            EventSeverity::Error
        );
        assert_eq!(
            CoreEvent::Connectivity(ConnectivityEvent::from_online(false)).severity(),
            EventSeverity::Warning
        );
        assert_eq!(
            CoreEvent::OfflineCache(CacheEvent::Cleared { removed: 3 }).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_serialized_shape() {
        let event = CoreEvent::OfflineCache(CacheEvent::AudioRemoved {
            item_id: "song-1".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "OfflineCache",
                "payload": { "event": "AudioRemoved", "item_id": "song-1" }
            })
        );
    }

    #[test]
    fn test_download_event_item_id() {
        let event = DownloadEvent::Cancelled {
            item_id: "song-9".to_string(),
        };
        assert_eq!(event.item_id(), "song-9");
    }
}
