//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the core crates:
//! - Logging and tracing setup ([`logging`])
//! - Configuration and bridge injection ([`config`])
//! - Event bus ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
