//! # Host Bridge Traits
//!
//! Capability traits the host platform provides to the core.
//!
//! ## Overview
//!
//! The core never touches browser storage, OS connectivity APIs or the AI
//! backend directly. Each of those is a trait defined here and implemented per
//! platform (`bridge-desktop` ships the desktop adapters, mobile and web hosts
//! inject their own).
//!
//! ## Traits
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Durable string key-value store
//!   (the offline cache snapshot lives here)
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Online/offline state and change stream
//!
//! ### Backend
//! - [`InferenceClient`](inference::InferenceClient) - Structured AI text generation
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let settings_store = builder.settings_store.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "SettingsStore".to_string(),
//!     message: "No settings store provided. Desktop: enable `desktop-shims`.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Platform
//! implementations convert their native errors into it and keep the message
//! actionable (which key, which endpoint).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! Tokio tasks behind an `Arc`.

pub mod error;
pub mod inference;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use inference::{InferenceClient, InferenceRequest};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus};
pub use storage::SettingsStore;
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
