//! Durable Key-Value Storage Abstraction
//!
//! The web client kept everything it owned locally in browser storage. The
//! core models that as a string key-value store; callers serialize their own
//! values (the offline cache stores one JSON snapshot under a single key).

use async_trait::async_trait;

use crate::error::Result;

/// Durable string key-value store
///
/// Writes must be visible to a subsequent `get_string` on the same store,
/// including after the process restarts.
///
/// # Platform Support
///
/// - **Desktop**: SQLite table (`bridge-desktop::SqliteSettingsStore`)
/// - **Web**: `window.localStorage`
/// - **Mobile**: UserDefaults / SharedPreferences
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_language(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("learning_language", "spanish").await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any previous value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Remove every key
    async fn clear_all(&self) -> Result<()>;
}
