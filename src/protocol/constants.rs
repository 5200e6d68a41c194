//! Protocol constants

/// Default control channel port (TCP)
pub const DEFAULT_CONTROL_PORT: u16 = 7400;

/// Default video relay port (UDP)
pub const DEFAULT_VIDEO_PORT: u16 = 7401;

/// Default audio relay port (UDP)
pub const DEFAULT_AUDIO_PORT: u16 = 7402;

/// Handshake acknowledgement token sent for an accepted name
pub const ACK_TOKEN: &str = "OK";

/// Handshake rejection sent when the requested name is already registered
pub const NAME_TAKEN_REJECTION: &str = "Username already taken";

/// Handshake rejection sent when the requested name is empty or contains spaces
pub const INVALID_NAME_REJECTION: &str = "Invalid username";

/// Maximum control frame body size (16 MB, generous for file-transfer metadata)
pub const MAX_CONTROL_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Maximum UDP payload size; used as the default media receive buffer
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Default number of entries kept in the throughput ledger's ring
pub const DEFAULT_LEDGER_CAPACITY: usize = 100;
