//! Session registry implementation
//!
//! The authoritative mapping from participant name to session, mutated by
//! the control accept path (insert) and the disconnect path (remove), and
//! read as a snapshot by every routing operation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::error::RegistryError;
use super::session::ParticipantSession;

/// Central registry of connected participants
///
/// Thread-safe via `RwLock`. Routing takes a copy-on-read snapshot, so
/// iteration never races with concurrent registration or removal.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ParticipantSession>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session under its name.
    ///
    /// Fails with `NameConflict` if the name is already present and with
    /// `InvalidName` if the name is empty or contains spaces. The check
    /// and insert happen under one write lock, so concurrent registrations
    /// of the same name cannot both succeed.
    pub async fn register(&self, session: Arc<ParticipantSession>) -> Result<(), RegistryError> {
        let name = session.name().to_string();
        if name.is_empty() || name.contains(' ') {
            return Err(RegistryError::InvalidName(name));
        }

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&name) {
            return Err(RegistryError::NameConflict(name));
        }
        sessions.insert(name.clone(), session);

        tracing::info!(name = %name, participants = sessions.len(), "Participant registered");
        Ok(())
    }

    /// Look up a session by name
    pub async fn lookup(&self, name: &str) -> Option<Arc<ParticipantSession>> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Remove a session by name.
    ///
    /// Removing an absent name is a no-op, not an error; the disconnect
    /// path can race with a concurrent removal.
    pub async fn remove(&self, name: &str) -> Option<Arc<ParticipantSession>> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(name);

        if removed.is_some() {
            tracing::info!(name = %name, participants = sessions.len(), "Participant removed");
        }
        removed
    }

    /// Snapshot of all current sessions, safe to iterate without the lock
    pub async fn snapshot(&self) -> Vec<Arc<ParticipantSession>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Number of registered participants
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no participants are registered
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str) -> Arc<ParticipantSession> {
        let (client, _server) = tokio::io::duplex(16);
        Arc::new(ParticipantSession::new(name, client))
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = SessionRegistry::new();

        registry.register(session("alice")).await.unwrap();

        assert!(registry.lookup("alice").await.is_some());
        assert!(registry.lookup("bob").await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let registry = SessionRegistry::new();

        registry.register(session("alice")).await.unwrap();
        let result = registry.register(session("alice")).await;

        assert!(matches!(result, Err(RegistryError::NameConflict(_))));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let registry = SessionRegistry::new();

        let empty = registry.register(session("")).await;
        let spaced = registry.register(session("bad name")).await;

        assert!(matches!(empty, Err(RegistryError::InvalidName(_))));
        assert!(matches!(spaced, Err(RegistryError::InvalidName(_))));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.register(session("alice")).await.unwrap();

        assert!(registry.remove("alice").await.is_some());
        assert!(registry.remove("alice").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let registry = SessionRegistry::new();
        registry.register(session("alice")).await.unwrap();
        registry.register(session("bob")).await.unwrap();

        let snapshot = registry.snapshot().await;
        registry.remove("alice").await;

        // The snapshot still holds both sessions
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_name_reusable_after_removal() {
        let registry = SessionRegistry::new();

        registry.register(session("alice")).await.unwrap();
        registry.remove("alice").await;
        registry.register(session("alice")).await.unwrap();

        assert_eq!(registry.len().await, 1);
    }
}
