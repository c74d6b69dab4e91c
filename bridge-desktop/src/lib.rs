//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! - [`SqliteSettingsStore`] - `SettingsStore` backed by a SQLite key-value table
//! - [`HostNetworkMonitor`] - `NetworkMonitor` driven by the embedding shell
//!   (it calls [`HostNetworkMonitor::set_online`] on OS connectivity events)
//! - [`ProbeNetworkMonitor`] - `NetworkMonitor` that probes reachability itself
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HostNetworkMonitor, SqliteSettingsStore};
//!
//! let store = SqliteSettingsStore::new(data_dir.join("settings.db")).await?;
//! let network = HostNetworkMonitor::new(true);
//! ```

mod network;
mod settings;

pub use network::{HostNetworkMonitor, ProbeNetworkMonitor};
pub use settings::SqliteSettingsStore;
