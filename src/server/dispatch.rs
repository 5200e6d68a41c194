//! Message dispatch
//!
//! Bridges the pure router to the transports: encodes a message once,
//! selects recipients from a registry snapshot, and performs the sends.
//! Media-class traffic rides the class's datagram socket to each
//! recipient's announced endpoint; everything else rides the recipient's
//! control connection. No registry lock is held while sending, so one slow
//! recipient cannot stall delivery to the others.

use std::sync::Arc;

use bytes::Bytes;

use tokio::net::UdpSocket;

use crate::protocol::{CodecError, MediaClass, Message, TrafficClass};
use crate::registry::{ParticipantSession, SessionRegistry};
use crate::router;
use crate::stats::{ThroughputLedger, TrafficLabel};

/// Routes messages to sessions and charges the throughput ledger
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    ledger: Arc<ThroughputLedger>,
    media_sockets: [Arc<UdpSocket>; 2],
}

impl Dispatcher {
    /// Create a dispatcher over the shared registry, ledger and media sockets
    pub fn new(
        registry: Arc<SessionRegistry>,
        ledger: Arc<ThroughputLedger>,
        video_socket: Arc<UdpSocket>,
        audio_socket: Arc<UdpSocket>,
    ) -> Self {
        Self {
            registry,
            ledger,
            media_sockets: [video_socket, audio_socket],
        }
    }

    /// The datagram socket serving a media class
    pub fn socket(&self, class: MediaClass) -> &Arc<UdpSocket> {
        &self.media_sockets[class.index()]
    }

    /// Route a message and send it to every selected recipient.
    ///
    /// An empty `to_names` broadcasts to all but the sender; a non-empty
    /// one multicasts to the named, registered recipients. The forwarded
    /// copy carries no recipient list. Returns the number of deliveries
    /// actually performed; skipped recipients (no media address yet) and
    /// failed sends are not counted.
    pub async fn dispatch(&self, msg: &Message) -> Result<usize, CodecError> {
        let forward = Message::new(
            msg.from_name.clone(),
            msg.request,
            msg.class,
            msg.payload.clone(),
            Vec::new(),
        );
        let bytes = forward.encode()?;
        let label = TrafficLabel::from(msg.class);

        let snapshot = self.registry.snapshot().await;
        let recipients = router::select_recipients(&snapshot, &msg.from_name, &msg.to_names);

        let mut delivered = 0;
        for recipient in recipients {
            if self.deliver(&recipient, &bytes, msg.class, label).await {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Send one encoded message to one session.
    ///
    /// A send failure marks only that session disconnected; its own
    /// connection loop observes the broken transport and runs the
    /// disconnect path. The fan-out continues regardless.
    async fn deliver(
        &self,
        session: &Arc<ParticipantSession>,
        bytes: &Bytes,
        class: Option<TrafficClass>,
        label: TrafficLabel,
    ) -> bool {
        match class.and_then(TrafficClass::media) {
            Some(media) => {
                let Some(addr) = session.media_addr(media).await else {
                    tracing::trace!(
                        to = %session.name(),
                        class = %media,
                        "No media endpoint announced yet, delivery skipped"
                    );
                    return false;
                };
                match self.socket(media).send_to(bytes, addr).await {
                    Ok(sent) => {
                        self.ledger.record_sent(sent as u64, label);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            to = %session.name(),
                            class = %media,
                            error = %e,
                            "Media send failed"
                        );
                        session.mark_disconnected();
                        false
                    }
                }
            }
            None => match session.send_control(bytes).await {
                Ok(()) => {
                    self.ledger.record_sent(bytes.len() as u64, label);
                    true
                }
                Err(e) => {
                    tracing::warn!(to = %session.name(), error = %e, "Control send failed");
                    false
                }
            },
        }
    }

    /// Run the disconnect path for a session.
    ///
    /// Marks the session not connected, forgets its media endpoints,
    /// broadcasts one RM with the departing name as sender, releases the
    /// control connection and removes the session from the registry.
    /// Idempotent: only the first caller per session does any of this.
    pub async fn disconnect(&self, session: &Arc<ParticipantSession>) {
        if !session.begin_disconnect() {
            return;
        }

        session.mark_disconnected();
        session.clear_media_addrs().await;

        let rm = Message::rm(session.name());
        if let Err(e) = self.dispatch(&rm).await {
            tracing::warn!(name = %session.name(), error = %e, "RM broadcast failed");
        }

        session.shutdown_writer().await;

        if self.registry.remove(session.name()).await.is_none() {
            tracing::debug!(name = %session.name(), "Session already removed");
        }
        tracing::info!(name = %session.name(), "Participant disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::framing;
    use tokio::io::DuplexStream;

    async fn test_dispatcher() -> (Arc<SessionRegistry>, Arc<ThroughputLedger>, Dispatcher) {
        let registry = Arc::new(SessionRegistry::new());
        let ledger = Arc::new(ThroughputLedger::new());
        let video = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let audio = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            video,
            audio,
        );
        (registry, ledger, dispatcher)
    }

    async fn join(registry: &SessionRegistry, name: &str) -> DuplexStream {
        let (client, server) = tokio::io::duplex(4096);
        registry
            .register(Arc::new(ParticipantSession::new(name, client)))
            .await
            .unwrap();
        server
    }

    async fn read_message(stream: &mut DuplexStream) -> Message {
        let frame = framing::read_frame(stream, 4096).await.unwrap().unwrap();
        Message::decode(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_but_sender() {
        let (registry, _ledger, dispatcher) = test_dispatcher().await;
        let _alice = join(&registry, "alice").await;
        let mut bob = join(&registry, "bob").await;
        let mut carol = join(&registry, "carol").await;

        let msg = Message::post("alice", TrafficClass::Text, Bytes::from_static(b"hi"));
        let delivered = dispatcher.dispatch(&msg).await.unwrap();

        assert_eq!(delivered, 2);
        for stream in [&mut bob, &mut carol] {
            let received = read_message(stream).await;
            assert_eq!(received.from_name, "alice");
            assert_eq!(received.payload.as_deref(), Some(&b"hi"[..]));
            assert!(received.to_names.is_empty());
        }
    }

    #[tokio::test]
    async fn test_multicast_delivers_only_to_named() {
        let (registry, _ledger, dispatcher) = test_dispatcher().await;
        let _alice = join(&registry, "alice").await;
        let mut bob = join(&registry, "bob").await;
        let _carol = join(&registry, "carol").await;

        let msg = Message::post("alice", TrafficClass::Text, Bytes::from_static(b"psst"))
            .to(vec!["bob".to_string(), "ghost".to_string()]);
        let delivered = dispatcher.dispatch(&msg).await.unwrap();

        assert_eq!(delivered, 1);
        let received = read_message(&mut bob).await;
        assert_eq!(received.from_name, "alice");
    }

    #[tokio::test]
    async fn test_send_failure_marks_only_that_session() {
        let (registry, _ledger, dispatcher) = test_dispatcher().await;
        let _alice = join(&registry, "alice").await;
        let bob_server = join(&registry, "bob").await;
        let mut carol = join(&registry, "carol").await;

        // Bob's transport breaks before the broadcast
        drop(bob_server);

        let msg = Message::post("alice", TrafficClass::Text, Bytes::from_static(b"hi"));
        let delivered = dispatcher.dispatch(&msg).await.unwrap();

        assert_eq!(delivered, 1);
        let received = read_message(&mut carol).await;
        assert_eq!(received.from_name, "alice");

        let bob = registry.lookup("bob").await.unwrap();
        assert!(!bob.is_connected());
        let carol_session = registry.lookup("carol").await.unwrap();
        assert!(carol_session.is_connected());
    }

    #[tokio::test]
    async fn test_media_delivery_skipped_without_endpoint() {
        let (registry, ledger, dispatcher) = test_dispatcher().await;
        let _alice = join(&registry, "alice").await;
        let _bob = join(&registry, "bob").await;

        let msg = Message::post("alice", TrafficClass::Video, Bytes::from_static(b"frame"));
        let delivered = dispatcher.dispatch(&msg).await.unwrap();

        // Bob never announced a video endpoint, so nothing was sent
        assert_eq!(delivered, 0);
        assert_eq!(ledger.total_sent(), 0);
    }

    #[tokio::test]
    async fn test_media_delivery_to_announced_endpoint() {
        let (registry, ledger, dispatcher) = test_dispatcher().await;
        let _alice = join(&registry, "alice").await;
        let _bob = join(&registry, "bob").await;

        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bob = registry.lookup("bob").await.unwrap();
        bob.set_media_addr(MediaClass::Video, receiver.local_addr().unwrap())
            .await;

        let msg = Message::post("alice", TrafficClass::Video, Bytes::from_static(b"frame"));
        let delivered = dispatcher.dispatch(&msg).await.unwrap();
        assert_eq!(delivered, 1);

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        let received = Message::decode(&buf[..len]).unwrap();

        assert_eq!(received.from_name, "alice");
        assert_eq!(received.class, Some(TrafficClass::Video));
        assert!(ledger.total_sent() > 0);
    }

    #[tokio::test]
    async fn test_disconnect_broadcasts_one_rm_and_removes() {
        let (registry, _ledger, dispatcher) = test_dispatcher().await;
        let mut alice = join(&registry, "alice").await;
        let _bob = join(&registry, "bob").await;

        let bob = registry.lookup("bob").await.unwrap();
        dispatcher.disconnect(&bob).await;
        dispatcher.disconnect(&bob).await; // second call must be a no-op

        let received = read_message(&mut alice).await;
        assert_eq!(received.request, crate::protocol::Request::Rm);
        assert_eq!(received.from_name, "bob");

        assert!(registry.lookup("bob").await.is_none());
        assert_eq!(registry.len().await, 1);

        // Exactly one RM: nothing else is waiting on alice's stream
        let extra = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            framing::read_frame(&mut alice, 4096),
        )
        .await;
        assert!(extra.is_err());
    }
}
