//! Session relay server library
//!
//! Accepts many simultaneous participants into a shared real-time session,
//! tracks each participant's reachability, and routes control and media
//! messages among them.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SessionRegistry>
//!                   ┌──────────────────────────┐
//!                   │ name → ParticipantSession│
//!                   │   control writer,        │
//!                   │   media endpoints        │
//!                   └───────────┬──────────────┘
//!                               │ snapshot
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!   [control loop]        [video relay]         [audio relay]
//!   TCP, one task         UDP, one task         UDP, one task
//!   per participant       per class             per class
//!         │                     │                     │
//!         └──────► Dispatcher::dispatch() ◄───────────┘
//!                   router + per-recipient send
//!                   every byte charged to the ThroughputLedger
//! ```
//!
//! A participant joins over the control channel with a raw-string name
//! handshake, is announced to the session, then separately announces a
//! reachable endpoint to each media relay with an ADD datagram. Messages
//! with an empty recipient list are broadcast to all but the sender;
//! otherwise they are multicast to the named, registered recipients.
//!
//! # Example
//!
//! ```no_run
//! use relay_rs::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> relay_rs::Result<()> {
//!     let server = RelayServer::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{MediaClass, Message, Request, TrafficClass};
pub use registry::SessionRegistry;
pub use server::{RelayServer, ServerConfig, SessionPhase};
pub use stats::{RateReport, ThroughputLedger, TrafficLabel};
