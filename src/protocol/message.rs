//! Wire message envelope
//!
//! The single unit exchanged between participants and the relay, on both
//! the control channel and the media relays. Serialization is MessagePack
//! via `rmp-serde`: a self-describing binary format, so malformed input is
//! detected at decode time and dropped by the receiving loop.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Protocol verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Announce a participant (control) or a media endpoint (relay)
    Add,
    /// Announce a participant's departure
    Rm,
    /// Carry a payload to other participants
    Post,
    /// Orderly teardown of the sender's session
    Disconnect,
    /// Acknowledgement
    Ok,
}

/// Traffic class carried by a message's payload
///
/// `Video` and `Audio` ride the connectionless media relays; `Text` and
/// `File` ride the control channel. Interpretation of the payload itself
/// is owned entirely by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficClass {
    Video,
    Audio,
    Text,
    File,
}

impl TrafficClass {
    /// The media class this traffic rides on, if any
    pub fn media(self) -> Option<MediaClass> {
        match self {
            TrafficClass::Video => Some(MediaClass::Video),
            TrafficClass::Audio => Some(MediaClass::Audio),
            TrafficClass::Text | TrafficClass::File => None,
        }
    }
}

impl std::fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficClass::Video => write!(f, "VIDEO"),
            TrafficClass::Audio => write!(f, "AUDIO"),
            TrafficClass::Text => write!(f, "TEXT"),
            TrafficClass::File => write!(f, "FILE"),
        }
    }
}

/// The two datagram-based traffic classes, each served by its own relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    Video,
    Audio,
}

impl MediaClass {
    /// All media classes, in relay-index order
    pub const ALL: [MediaClass; 2] = [MediaClass::Video, MediaClass::Audio];

    /// Stable index used for per-class slots (sockets, addresses)
    pub fn index(self) -> usize {
        match self {
            MediaClass::Video => 0,
            MediaClass::Audio => 1,
        }
    }

    /// The traffic class carried on this relay
    pub fn traffic_class(self) -> TrafficClass {
        match self {
            MediaClass::Video => TrafficClass::Video,
            MediaClass::Audio => TrafficClass::Audio,
        }
    }
}

impl std::fmt::Display for MediaClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.traffic_class().fmt(f)
    }
}

/// Transport envelope for one relayed message
///
/// Immutable once constructed: the relay only decodes, re-addresses the
/// sender from server-side context, and forwards. An empty `to_names`
/// means "broadcast to all but the sender".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Sender identity (set by the server from session context on forward)
    pub from_name: String,
    /// Protocol verb
    pub request: Request,
    /// Traffic class, absent for pure control messages
    pub class: Option<TrafficClass>,
    /// Opaque payload, semantics owned by the presentation layer
    pub payload: Option<Bytes>,
    /// Intended recipients; empty means broadcast
    pub to_names: Vec<String>,
}

impl Message {
    /// Create a message with explicit fields
    pub fn new(
        from_name: impl Into<String>,
        request: Request,
        class: Option<TrafficClass>,
        payload: Option<Bytes>,
        to_names: Vec<String>,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            request,
            class,
            payload,
            to_names,
        }
    }

    /// Create an `Add` announcement for a participant
    pub fn add(from_name: impl Into<String>) -> Self {
        Self::new(from_name, Request::Add, None, None, Vec::new())
    }

    /// Create an `Rm` departure announcement
    pub fn rm(from_name: impl Into<String>) -> Self {
        Self::new(from_name, Request::Rm, None, None, Vec::new())
    }

    /// Create a `Disconnect` request
    pub fn disconnect(from_name: impl Into<String>) -> Self {
        Self::new(from_name, Request::Disconnect, None, None, Vec::new())
    }

    /// Create a `Post` carrying a payload of the given class
    pub fn post(from_name: impl Into<String>, class: TrafficClass, payload: Bytes) -> Self {
        Self::new(from_name, Request::Post, Some(class), Some(payload), Vec::new())
    }

    /// Restrict delivery to the given recipients
    pub fn to(mut self, to_names: Vec<String>) -> Self {
        self.to_names = to_names;
        self
    }

    /// Serialize to the wire format
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let buf = rmp_serde::to_vec(self)?;
        Ok(Bytes::from(buf))
    }

    /// Deserialize from the wire format
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Serialization failure on either direction
#[derive(Debug)]
pub enum CodecError {
    /// Failed to serialize an outbound message
    Encode(rmp_serde::encode::Error),
    /// Failed to deserialize an inbound message
    Decode(rmp_serde::decode::Error),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Encode(e) => write!(f, "Encode error: {}", e),
            CodecError::Decode(e) => write!(f, "Decode error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Encode(e) => Some(e),
            CodecError::Decode(e) => Some(e),
        }
    }
}

impl From<rmp_serde::encode::Error> for CodecError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        CodecError::Encode(e)
    }
}

impl From<rmp_serde::decode::Error> for CodecError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        CodecError::Decode(e)
    }
}
