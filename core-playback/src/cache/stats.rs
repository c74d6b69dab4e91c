//! Cache statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::CacheEntry;

/// Aggregate view over the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_bytes: u64,
    pub oldest_cached_at: Option<DateTime<Utc>>,
    pub newest_cached_at: Option<DateTime<Utc>>,
}

impl CacheStats {
    pub(crate) fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CacheEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut stats, entry| {
            stats.entry_count += 1;
            stats.total_bytes += entry.size_bytes;
            stats.oldest_cached_at = Some(
                stats
                    .oldest_cached_at
                    .map_or(entry.cached_at, |t| t.min(entry.cached_at)),
            );
            stats.newest_cached_at = Some(
                stats
                    .newest_cached_at
                    .map_or(entry.cached_at, |t| t.max(entry.cached_at)),
            );
            stats
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    pub fn average_entry_size(&self) -> u64 {
        if self.entry_count == 0 {
            0
        } else {
            self.total_bytes / self.entry_count as u64
        }
    }
}
