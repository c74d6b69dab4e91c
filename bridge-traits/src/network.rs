//! Network Monitoring Abstraction
//!
//! Provides the online/offline signal the playback layer switches on.

use async_trait::async_trait;

use crate::error::Result;

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
}

impl NetworkInfo {
    pub fn online() -> Self {
        Self {
            status: NetworkStatus::Connected,
        }
    }

    pub fn offline() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
        }
    }

    /// Whether playback should treat the device as online.
    ///
    /// An indeterminate status counts as online, matching the browser
    /// `navigator.onLine` behaviour of only reporting offline when certain.
    pub fn is_online(&self) -> bool {
        !matches!(self.status, NetworkStatus::Disconnected)
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: Host-pushed signal or a reachability probe
/// - **Web**: `navigator.onLine` plus the `online`/`offline` window events
/// - **Mobile**: Network framework / ConnectivityManager
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn should_stream(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected().await
/// }
/// ```
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently online. Errors count as online.
    async fn is_connected(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_online())
            .unwrap_or(true)
    }

    /// Subscribe to network status changes
    ///
    /// Each subscription is an independent listener; dropping the returned
    /// stream deregisters it.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of network status changes
#[async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next network info update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NetworkInfo>;
}
