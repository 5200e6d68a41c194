//! Per-participant session state
//!
//! One `ParticipantSession` exists per registered participant. It owns the
//! write side of the participant's control connection exclusively; the read
//! side stays with the connection loop. Media addresses are populated
//! asynchronously by the media relay loops, each only from an ADD the
//! participant itself sent on that relay.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};

use crate::protocol::framing;
use crate::protocol::MediaClass;

/// Boxed write half of a control connection
pub type ControlWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// State for one connected participant
pub struct ParticipantSession {
    name: String,

    /// Exclusive ownership of the outbound control stream
    writer: Mutex<ControlWriter>,

    /// False once a terminal disconnect has been observed or a send failed
    connected: AtomicBool,

    /// Set by the first caller entering the disconnect path
    disconnecting: AtomicBool,

    /// Reachable endpoint per media class, absent until an ADD arrives
    media_addrs: RwLock<[Option<SocketAddr>; 2]>,
}

impl ParticipantSession {
    /// Create a session for a freshly accepted control connection
    pub fn new(name: impl Into<String>, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(Box::new(writer)),
            connected: AtomicBool::new(true),
            disconnecting: AtomicBool::new(false),
            media_addrs: RwLock::new([None, None]),
        }
    }

    /// The participant's unique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the session is still considered connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Mark the session as no longer connected
    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Claim the disconnect path.
    ///
    /// Returns true for the first caller only, so the RM broadcast and
    /// registry removal run exactly once per session.
    pub fn begin_disconnect(&self) -> bool {
        !self.disconnecting.swap(true, Ordering::AcqRel)
    }

    /// The participant's reachable endpoint for a media class, if announced
    pub async fn media_addr(&self, class: MediaClass) -> Option<SocketAddr> {
        self.media_addrs.read().await[class.index()]
    }

    /// Record the participant's reachable endpoint for a media class
    pub async fn set_media_addr(&self, class: MediaClass, addr: SocketAddr) {
        self.media_addrs.write().await[class.index()] = Some(addr);
    }

    /// Forget all media endpoints (disconnect path)
    pub async fn clear_media_addrs(&self) {
        *self.media_addrs.write().await = [None, None];
    }

    /// Write one frame to the participant's control connection.
    ///
    /// A failed write marks the session disconnected; the participant's own
    /// connection loop observes the broken transport independently.
    pub async fn send_control(&self, body: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        match framing::write_frame(&mut *writer, body).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.mark_disconnected();
                Err(e)
            }
        }
    }

    /// Shut down the outbound control stream, signalling EOF to the peer
    pub async fn shutdown_writer(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl std::fmt::Debug for ParticipantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantSession")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
