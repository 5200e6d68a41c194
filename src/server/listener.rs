//! Relay server
//!
//! Binds the control listener and both media relay sockets, runs the accept
//! loop, and spawns one handling task per control connection plus one
//! long-lived task per media relay.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::protocol::MediaClass;
use crate::registry::SessionRegistry;
use crate::server::config::ServerConfig;
use crate::server::control::ControlConnection;
use crate::server::dispatch::Dispatcher;
use crate::server::media::MediaRelay;
use crate::stats::ThroughputLedger;

/// Session relay server
pub struct RelayServer {
    config: ServerConfig,
    listener: TcpListener,
    control_addr: SocketAddr,
    media_addrs: [SocketAddr; 2],
    registry: Arc<SessionRegistry>,
    ledger: Arc<ThroughputLedger>,
    dispatcher: Arc<Dispatcher>,
}

impl RelayServer {
    /// Bind all three listeners.
    ///
    /// Failure to bind any of them is fatal and aborts startup; every other
    /// error in this server is handled per connection or per datagram.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.control_addr).await?;
        let control_addr = listener.local_addr()?;

        let video_socket = Arc::new(UdpSocket::bind(config.video_addr).await?);
        let audio_socket = Arc::new(UdpSocket::bind(config.audio_addr).await?);
        let media_addrs = [video_socket.local_addr()?, audio_socket.local_addr()?];

        let registry = Arc::new(SessionRegistry::new());
        let ledger = Arc::new(ThroughputLedger::with_capacity(config.ledger_capacity));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
            video_socket,
            audio_socket,
        ));

        tracing::info!(addr = %control_addr, "Control server listening");
        for class in MediaClass::ALL {
            tracing::info!(class = %class, addr = %media_addrs[class.index()], "Media relay listening");
        }

        Ok(Self {
            config,
            listener,
            control_addr,
            media_addrs,
            registry,
            ledger,
            dispatcher,
        })
    }

    /// The bound control channel address
    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    /// The bound relay address for a media class
    pub fn media_addr(&self, class: MediaClass) -> SocketAddr {
        self.media_addrs[class.index()]
    }

    /// The session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The throughput ledger, for dashboards and rate queries
    pub fn ledger(&self) -> &Arc<ThroughputLedger> {
        &self.ledger
    }

    /// Run the server.
    ///
    /// This method blocks until the process is terminated.
    pub async fn run(&self) -> Result<()> {
        let _relay_handles = self.spawn_media_relays();
        let _stats_handle = self.spawn_stats_task();
        self.accept_loop().await
    }

    /// Run the server with graceful shutdown.
    ///
    /// When `shutdown` resolves, the server stops accepting connections,
    /// stops the media relays and runs the disconnect path for every
    /// remaining session. It does not wait on in-flight blocking reads.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let relay_handles = self.spawn_media_relays();
        let stats_handle = self.spawn_stats_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop() => result,
        };

        for handle in relay_handles {
            handle.abort();
        }
        if let Some(handle) = stats_handle {
            handle.abort();
        }
        self.disconnect_all().await;

        result
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        tracing::debug!(peer = %peer_addr, "New control connection");

        let connection = ControlConnection::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.ledger),
            Arc::clone(&self.dispatcher),
            self.config.max_frame_size,
            peer_addr,
        );

        tokio::spawn(connection.run(socket));
    }

    fn spawn_media_relays(&self) -> Vec<JoinHandle<()>> {
        MediaClass::ALL
            .into_iter()
            .map(|class| {
                let relay = MediaRelay::new(
                    class,
                    Arc::clone(self.dispatcher.socket(class)),
                    Arc::clone(&self.registry),
                    Arc::clone(&self.ledger),
                    Arc::clone(&self.dispatcher),
                    self.config.datagram_size(class),
                );
                tokio::spawn(relay.run())
            })
            .collect()
    }

    /// Spawn the periodic throughput summary task, if enabled
    fn spawn_stats_task(&self) -> Option<JoinHandle<()>> {
        if self.config.stats_interval.is_zero() {
            return None;
        }

        let ledger = Arc::clone(&self.ledger);
        let interval = self.config.stats_interval;
        let window = self.config.stats_window_secs;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                match ledger.summary(window) {
                    Ok(summary) => tracing::info!(stats = %summary, "Server throughput"),
                    Err(e) => {
                        tracing::error!(error = %e, "Stats query failed");
                        break;
                    }
                }
            }
        }))
    }

    async fn disconnect_all(&self) {
        for session in self.registry.snapshot().await {
            self.dispatcher.disconnect(&session).await;
        }
    }
}
