//! Control channel connection handling
//!
//! One `ControlConnection` runs per accepted participant: the raw-string
//! name handshake, the two-phase join announcement, the blocking read loop,
//! and the disconnect path. Errors on this connection never terminate
//! another session's loop or the relay itself.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::protocol::constants::{ACK_TOKEN, INVALID_NAME_REJECTION, NAME_TAKEN_REJECTION};
use crate::protocol::{framing, Message, Request};
use crate::registry::{ParticipantSession, RegistryError, SessionRegistry};
use crate::server::dispatch::Dispatcher;
use crate::stats::{ThroughputLedger, TrafficLabel};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connection accepted, name not yet confirmed
    Connecting,
    /// Name accepted and inserted into the registry
    Registered,
    /// Announced to the session; relaying messages
    Active,
    /// Terminal disconnect observed; tearing down
    Disconnecting,
    /// Removed from the registry (terminal)
    Removed,
}

/// Handler for one control connection
pub(crate) struct ControlConnection {
    registry: Arc<SessionRegistry>,
    ledger: Arc<ThroughputLedger>,
    dispatcher: Arc<Dispatcher>,
    max_frame_size: usize,
    peer_addr: SocketAddr,
}

impl ControlConnection {
    pub(crate) fn new(
        registry: Arc<SessionRegistry>,
        ledger: Arc<ThroughputLedger>,
        dispatcher: Arc<Dispatcher>,
        max_frame_size: usize,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            registry,
            ledger,
            dispatcher,
            max_frame_size,
            peer_addr,
        }
    }

    /// Drive the connection from handshake to removal.
    pub(crate) async fn run(self, stream: TcpStream) {
        let (mut reader, mut writer) = stream.into_split();
        let phase = SessionPhase::Connecting;

        // Handshake: the client declares its name as a raw string frame
        let name = match framing::read_frame(&mut reader, self.max_frame_size).await {
            Ok(Some(frame)) => match String::from_utf8(frame.to_vec()) {
                Ok(name) => name,
                Err(_) => {
                    let _ = framing::write_frame(&mut writer, INVALID_NAME_REJECTION.as_bytes())
                        .await;
                    tracing::info!(peer = %self.peer_addr, "Rejected non-UTF-8 name");
                    return;
                }
            },
            Ok(None) => {
                tracing::debug!(peer = %self.peer_addr, phase = ?phase, "Closed before handshake");
                return;
            }
            Err(e) => {
                tracing::debug!(peer = %self.peer_addr, error = %e, "Handshake read failed");
                return;
            }
        };

        // Registration is atomic: the registry's write lock covers the
        // uniqueness check and the insert. A rejected name never enters
        // REGISTERED and leaves no session state behind.
        let session = Arc::new(ParticipantSession::new(name.clone(), writer));
        if let Err(e) = self.registry.register(Arc::clone(&session)).await {
            let rejection = match &e {
                RegistryError::NameConflict(_) => NAME_TAKEN_REJECTION,
                RegistryError::InvalidName(_) => INVALID_NAME_REJECTION,
            };
            let _ = session.send_control(rejection.as_bytes()).await;
            tracing::info!(name = %name, peer = %self.peer_addr, reason = %e, "Registration rejected");
            return;
        }
        let phase = SessionPhase::Registered;
        tracing::debug!(name = %name, peer = %self.peer_addr, phase = ?phase, "Name accepted");

        if session.send_control(ACK_TOKEN.as_bytes()).await.is_err() {
            self.dispatcher.disconnect(&session).await;
            return;
        }

        // Two-phase announce: the newcomer learns every current
        // participant, then everyone else learns the newcomer. Both views
        // converge without a separate list query.
        let snapshot = self.registry.snapshot().await;
        for existing in &snapshot {
            if existing.name() == name {
                continue;
            }
            let add = Message::add(existing.name()).to(vec![name.clone()]);
            if let Err(e) = self.dispatcher.dispatch(&add).await {
                tracing::warn!(name = %name, error = %e, "Announce to newcomer failed");
            }
        }
        if let Err(e) = self.dispatcher.dispatch(&Message::add(&name)).await {
            tracing::warn!(name = %name, error = %e, "Newcomer broadcast failed");
        }
        let phase = SessionPhase::Active;
        tracing::info!(name = %name, peer = %self.peer_addr, phase = ?phase, "Participant active");

        while session.is_connected() {
            let frame = match framing::read_frame(&mut reader, self.max_frame_size).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(name = %name, error = %e, "Control read failed");
                    break;
                }
            };

            // The bytes were received whether or not the payload decodes
            let msg = match Message::decode(&frame) {
                Ok(msg) => {
                    self.ledger
                        .record_received(frame.len() as u64, msg.class.into());
                    msg
                }
                Err(e) => {
                    self.ledger
                        .record_received(frame.len() as u64, TrafficLabel::Control);
                    tracing::warn!(name = %name, error = %e, "Malformed control message dropped");
                    continue;
                }
            };

            if msg.request == Request::Disconnect {
                break;
            }

            // Sender identity comes from the session, not the envelope
            let msg = Message::new(name.clone(), msg.request, msg.class, msg.payload, msg.to_names);
            if let Err(e) = self.dispatcher.dispatch(&msg).await {
                tracing::warn!(name = %name, error = %e, "Dispatch failed");
            }
        }

        let phase = SessionPhase::Disconnecting;
        tracing::debug!(name = %name, phase = ?phase, "Leaving control loop");

        self.dispatcher.disconnect(&session).await;

        let phase = SessionPhase::Removed;
        tracing::debug!(name = %name, peer = %self.peer_addr, phase = ?phase, "Connection closed");
    }
}
