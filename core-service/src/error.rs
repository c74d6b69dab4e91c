use thiserror::Error;

use crate::downloads::DownloadKind;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("{kind} {item_id} is already being downloaded")]
    DownloadInProgress { kind: DownloadKind, item_id: String },

    #[error("{kind} {item_id} is already downloaded")]
    AlreadyDownloaded { kind: DownloadKind, item_id: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[cfg(feature = "ai")]
    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::MetadataError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
