//! Workspace placeholder crate.
//!
//! Exposes feature flags that map onto the individual workspace crates
//! (`core-service`, `core-metadata`, `core-playback`) so a host application
//! can depend on `songlingo-workspace` and pick what it needs without wiring
//! each crate by hand.
