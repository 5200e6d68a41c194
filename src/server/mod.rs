//! Relay server implementation
//!
//! This module provides:
//! - The server entry point binding the control and media listeners
//! - Per-connection control channel handling
//! - The per-class media relay loops
//! - The dispatcher that fans messages out to sessions

pub mod config;
pub mod dispatch;
pub mod listener;

pub(crate) mod control;
pub(crate) mod media;

pub use config::ServerConfig;
pub use control::SessionPhase;
pub use dispatch::Dispatcher;
pub use listener::RelayServer;
