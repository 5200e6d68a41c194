//! Session registry
//!
//! The single source of truth for "who is present". The registry maps each
//! unique participant name to its session: the exclusive control-connection
//! write handle, the connected flag, and the per-class media endpoints
//! learned from ADD datagrams.
//!
//! Routing never iterates the live map: it takes a copy-on-read snapshot,
//! so broadcast enumeration cannot race with registration or removal.

pub mod error;
pub mod session;
pub mod store;

pub use error::RegistryError;
pub use session::{ControlWriter, ParticipantSession};
pub use store::SessionRegistry;
