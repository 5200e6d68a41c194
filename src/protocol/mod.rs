//! Wire protocol for the session relay
//!
//! This module provides:
//! - The message envelope and its MessagePack codec
//! - Length-delimited framing for the control channel
//! - Protocol constants (ports, handshake tokens, size limits)

pub mod constants;
pub mod framing;
pub mod message;

pub use message::{CodecError, MediaClass, Message, Request, TrafficClass};
