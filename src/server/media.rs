//! Media relay loops
//!
//! One `MediaRelay` per media class, each owning a single datagram receive
//! loop. The relay learns participant reachability from ADD datagrams and
//! fans everything else out through the dispatcher. Malformed input is
//! dropped and logged; it must never kill the relay.

use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::protocol::{MediaClass, Message, Request};
use crate::registry::SessionRegistry;
use crate::server::dispatch::Dispatcher;
use crate::stats::ThroughputLedger;

/// Receive loop for one media class
pub(crate) struct MediaRelay {
    class: MediaClass,
    socket: Arc<UdpSocket>,
    registry: Arc<SessionRegistry>,
    ledger: Arc<ThroughputLedger>,
    dispatcher: Arc<Dispatcher>,
    recv_buf_size: usize,
}

impl MediaRelay {
    pub(crate) fn new(
        class: MediaClass,
        socket: Arc<UdpSocket>,
        registry: Arc<SessionRegistry>,
        ledger: Arc<ThroughputLedger>,
        dispatcher: Arc<Dispatcher>,
        recv_buf_size: usize,
    ) -> Self {
        Self {
            class,
            socket,
            registry,
            ledger,
            dispatcher,
            recv_buf_size,
        }
    }

    /// Run the receive loop until the task is aborted.
    pub(crate) async fn run(self) {
        let mut buf = vec![0u8; self.recv_buf_size];

        loop {
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::error!(class = %self.class, error = %e, "Media receive failed");
                    continue;
                }
            };

            // Charged before inspection: the bytes were genuinely received
            // regardless of payload validity
            self.ledger
                .record_received(len as u64, self.class.traffic_class().into());

            let msg = match Message::decode(&buf[..len]) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(
                        class = %self.class,
                        peer = %addr,
                        error = %e,
                        "Malformed datagram dropped"
                    );
                    continue;
                }
            };

            if msg.request == Request::Add {
                // The source endpoint of the ADD becomes the sender's
                // reachable address for this class. No reply is sent.
                match self.registry.lookup(&msg.from_name).await {
                    Some(session) => {
                        session.set_media_addr(self.class, addr).await;
                        tracing::info!(
                            class = %self.class,
                            name = %msg.from_name,
                            peer = %addr,
                            "Media endpoint announced"
                        );
                    }
                    None => {
                        tracing::debug!(
                            class = %self.class,
                            name = %msg.from_name,
                            "ADD from unregistered participant dropped"
                        );
                    }
                }
                continue;
            }

            if let Err(e) = self.dispatcher.dispatch(&msg).await {
                tracing::warn!(class = %self.class, error = %e, "Dispatch failed");
            }
        }
    }
}
