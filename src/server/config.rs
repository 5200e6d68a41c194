//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::*;
use crate::protocol::MediaClass;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Control channel bind address (TCP)
    pub control_addr: SocketAddr,

    /// Video relay bind address (UDP)
    pub video_addr: SocketAddr,

    /// Audio relay bind address (UDP)
    pub audio_addr: SocketAddr,

    /// Enable TCP_NODELAY on control connections (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Maximum control frame body size
    pub max_frame_size: usize,

    /// Receive buffer size for video datagrams
    pub video_datagram_size: usize,

    /// Receive buffer size for audio datagrams
    pub audio_datagram_size: usize,

    /// Number of entries kept in the throughput ledger's ring
    pub ledger_capacity: usize,

    /// Interval between throughput log summaries (zero disables them)
    pub stats_interval: Duration,

    /// Window used by the periodic throughput summary, in seconds
    pub stats_window_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            control_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_CONTROL_PORT)),
            video_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_VIDEO_PORT)),
            audio_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_AUDIO_PORT)),
            tcp_nodelay: true, // Important for low latency
            max_frame_size: MAX_CONTROL_FRAME_SIZE,
            video_datagram_size: MAX_DATAGRAM_SIZE,
            audio_datagram_size: MAX_DATAGRAM_SIZE,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            stats_interval: Duration::from_secs(30),
            stats_window_secs: 30.0,
        }
    }
}

impl ServerConfig {
    /// Create a config with all three listeners on the given IP, using the
    /// default port for each channel
    pub fn with_host(host: std::net::IpAddr) -> Self {
        Self {
            control_addr: SocketAddr::new(host, DEFAULT_CONTROL_PORT),
            video_addr: SocketAddr::new(host, DEFAULT_VIDEO_PORT),
            audio_addr: SocketAddr::new(host, DEFAULT_AUDIO_PORT),
            ..Default::default()
        }
    }

    /// Set the control channel bind address
    pub fn control_bind(mut self, addr: SocketAddr) -> Self {
        self.control_addr = addr;
        self
    }

    /// Set a media relay bind address
    pub fn media_bind(mut self, class: MediaClass, addr: SocketAddr) -> Self {
        match class {
            MediaClass::Video => self.video_addr = addr,
            MediaClass::Audio => self.audio_addr = addr,
        }
        self
    }

    /// Set the maximum control frame body size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the throughput ledger's ring capacity
    pub fn ledger_capacity(mut self, capacity: usize) -> Self {
        self.ledger_capacity = capacity;
        self
    }

    /// Set the throughput summary interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Disable periodic throughput summaries
    pub fn disable_stats(mut self) -> Self {
        self.stats_interval = Duration::ZERO;
        self
    }

    /// The datagram receive buffer size for a media class
    pub fn datagram_size(&self, class: MediaClass) -> usize {
        match class {
            MediaClass::Video => self.video_datagram_size,
            MediaClass::Audio => self.audio_datagram_size,
        }
    }
}
