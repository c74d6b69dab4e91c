//! # Playback Error Types

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors raised by the offline playback layer.
///
/// Cache persistence problems never show up here; the cache logs and
/// absorbs them.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Configuration rejected by `validate()`.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A download step could not be recorded.
    #[error("Download of {item_id} failed: {message}")]
    DownloadFailed { item_id: String, message: String },

    /// The download was cancelled before completion.
    #[error("Download of {0} was cancelled")]
    DownloadCancelled(String),

    /// Host capability failure (network monitor subscription, reporter).
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Background task panicked or was aborted.
    #[error("Task error: {0}")]
    Task(String),
}

impl PlaybackError {
    /// `true` for user-initiated cancellation, which the view treats as a
    /// silent revert rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PlaybackError::DownloadCancelled(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
