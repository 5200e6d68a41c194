//! Registry error types
//!
//! Error types for session registry operations.

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// The requested name is already registered
    NameConflict(String),
    /// The requested name is empty or contains spaces
    InvalidName(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NameConflict(name) => {
                write!(f, "Name already registered: {}", name)
            }
            RegistryError::InvalidName(name) => write!(f, "Invalid name: {:?}", name),
        }
    }
}

impl std::error::Error for RegistryError {}
