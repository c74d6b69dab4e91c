//! Download records following their tasks.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use common::{builder, MemoryStore};
use core_playback::{DownloadConfig, ProgressReporter};
use core_runtime::events::{CoreEvent, DownloadEvent};
use core_service::{CoreError, CoreService, DownloadKind, DownloadManager, DownloadStatus};

async fn service() -> CoreService {
    let config = builder(Arc::new(MemoryStore::default())).build().unwrap();
    CoreService::new(config).await.unwrap()
}

/// Backend that stops accepting progress at `fail_at` percent.
struct FlakyBackend {
    fail_at: u8,
}

#[async_trait]
impl ProgressReporter for FlakyBackend {
    async fn report(&self, _item_id: &str, percent: u8) -> BridgeResult<()> {
        if percent >= self.fail_at {
            return Err(BridgeError::OperationFailed("record update rejected".to_string()));
        }
        Ok(())
    }
}

/// Let the record follower observe the task's final state.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_completed_song_download() {
    let core = service().await;
    let downloads = core.downloads();

    let handle = downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap();
    let entry = handle.wait().await.unwrap().unwrap();
    settle().await;

    let record = downloads.record(DownloadKind::Song, "song-1").unwrap();
    assert_eq!(record.status, DownloadStatus::Completed);
    assert_eq!(record.progress, 100);
    assert!(record.downloaded_at.is_some());
    assert_eq!(record.file_size, entry.size_bytes);

    assert!(downloads.is_downloaded(DownloadKind::Song, "song-1"));
    assert!(!downloads.is_downloaded(DownloadKind::Playlist, "song-1"));
    assert_eq!(downloads.completed().len(), 1);
    assert!(downloads.active().is_empty());
    assert_eq!(downloads.total_completed_bytes(), entry.size_bytes);
    assert!(core.offline_cache().has_offline_audio("song-1"));
}

#[tokio::test(start_paused = true)]
async fn test_record_tracks_progress_while_downloading() {
    let core = service().await;
    let downloads = core.downloads();

    let handle = downloads.start(DownloadKind::Playlist, "pl-1", None).unwrap();
    assert_eq!(downloads.active()[0].status, DownloadStatus::Pending);

    // Steps land at 300ms intervals: 0, 10, 20.
    tokio::time::sleep(Duration::from_millis(950)).await;
    let record = downloads.record(DownloadKind::Playlist, "pl-1").unwrap();
    assert_eq!(record.status, DownloadStatus::Downloading);
    assert_eq!(record.progress, 20);
    assert_eq!(downloads.total_completed_bytes(), 0);

    handle.wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_starts_are_refused() {
    let core = service().await;
    let downloads = core.downloads();

    let handle = downloads.start(DownloadKind::Playlist, "pl-1", None).unwrap();
    assert!(matches!(
        downloads.start(DownloadKind::Playlist, "pl-1", None),
        Err(CoreError::DownloadInProgress { .. })
    ));
    // Same id, different kind, is a different item.
    let other = downloads.start(DownloadKind::Song, "pl-1", None).unwrap();

    handle.wait().await.unwrap();
    other.wait().await.unwrap();
    settle().await;
    assert!(matches!(
        downloads.start(DownloadKind::Playlist, "pl-1", None),
        Err(CoreError::AlreadyDownloaded { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_download_leaves_no_record() {
    let core = service().await;
    let downloads = core.downloads();

    let handle = downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.cancel();
    assert!(handle.wait().await.unwrap_err().is_cancellation());
    settle().await;

    assert!(downloads.records().is_empty());
    assert!(!core.offline_cache().has_offline_audio("song-1"));
    // The item can be downloaded again.
    downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_remove_running_download_cancels_it() {
    let core = service().await;
    let downloads = core.downloads();

    let handle = downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(downloads.remove(DownloadKind::Song, "song-1").await);
    assert!(handle.wait().await.unwrap_err().is_cancellation());
    assert!(!core.offline_cache().has_offline_audio("song-1"));
}

#[tokio::test(start_paused = true)]
async fn test_remove_evicts_song_audio() {
    let core = service().await;
    let downloads = core.downloads();

    downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap()
        .wait()
        .await
        .unwrap();
    settle().await;

    assert!(downloads.remove(DownloadKind::Song, "song-1").await);
    assert!(!downloads.remove(DownloadKind::Song, "song-1").await);
    assert!(!core.offline_cache().has_offline_audio("song-1"));
    assert!(!downloads.is_downloaded(DownloadKind::Song, "song-1"));
}

#[tokio::test(start_paused = true)]
async fn test_remove_all() {
    let core = service().await;
    let downloads = core.downloads();

    let song = downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap();
    let playlist = downloads.start(DownloadKind::Playlist, "pl-1", None).unwrap();
    song.wait().await.unwrap();
    playlist.wait().await.unwrap();
    settle().await;
    assert_eq!(downloads.completed().len(), 2);

    assert_eq!(downloads.remove_all().await, 2);
    assert!(downloads.records().is_empty());
    assert!(core.offline_cache().is_empty());
    assert_eq!(downloads.total_completed_bytes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_download_drops_record_and_caches_nothing() {
    let core = service().await;
    let mut events = core.subscribe_events();
    let downloads = DownloadManager::new(
        core.offline_cache(),
        DownloadConfig::default(),
        core.event_bus().clone(),
    )
    .with_reporter(Arc::new(FlakyBackend { fail_at: 50 }));

    let handle = downloads
        .start(DownloadKind::Song, "song-1", Some("https://x/a.mp3"))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(950)).await;
    assert_eq!(
        downloads.record(DownloadKind::Song, "song-1").unwrap().progress,
        20
    );

    let err = handle.wait().await.unwrap_err();
    assert!(!err.is_cancellation());
    settle().await;

    assert!(downloads.records().is_empty());
    assert!(!downloads.is_downloaded(DownloadKind::Song, "song-1"));
    assert!(!core.offline_cache().has_offline_audio("song-1"));

    let mut failed = 0;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Download(DownloadEvent::Failed { item_id, .. }) = event {
            assert_eq!(item_id, "song-1");
            failed += 1;
        }
    }
    assert_eq!(failed, 1);
}
