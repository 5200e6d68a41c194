//! Crate-level error type
//!
//! Wraps the per-area errors so server entry points can return a single
//! `Result` type.

use crate::protocol::CodecError;
use crate::registry::RegistryError;
use crate::stats::LedgerError;

/// Convenience result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Transport-level I/O failure
    Io(std::io::Error),
    /// Message serialization/deserialization failure
    Codec(CodecError),
    /// Session registry failure
    Registry(RegistryError),
    /// Throughput ledger failure
    Ledger(LedgerError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Codec(e) => write!(f, "Codec error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Ledger(e) => write!(f, "Ledger error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Codec(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Ledger(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        Error::Ledger(e)
    }
}
