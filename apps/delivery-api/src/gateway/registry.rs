//! Node-local registry of live sessions.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::session::ConnectionHandle;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("session {0} is already registered")]
    DuplicateSession(String),
}

/// Maps session IDs to the connection serving them on this node.
///
/// Uses `DashMap` for shard-level concurrency; entries are visible to other
/// threads as soon as `register` returns.
pub struct SessionRegistry {
    node_id: String,
    sessions: DashMap<String, ConnectionHandle>,
}

impl SessionRegistry {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            sessions: DashMap::new(),
        }
    }

    /// The delivery node this registry belongs to.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Register a freshly upgraded connection.
    ///
    /// Fails without touching the existing mapping if the ID is taken.
    pub fn register(
        &self,
        session_id: String,
        handle: ConnectionHandle,
    ) -> Result<(), RegistryError> {
        match self.sessions.entry(session_id) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateSession(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, session_id: &str) -> Option<ConnectionHandle> {
        self.sessions.get(session_id).map(|h| h.value().clone())
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Remove a session only while it is still bound to `handle`, so a late
    /// cleanup never evicts a newer connection that reused the ID.
    pub fn remove_connection(&self, session_id: &str, handle: &ConnectionHandle) -> bool {
        self.sessions
            .remove_if(session_id, |_, current| current.same_connection(handle))
            .is_some()
    }

    /// Best-effort list of registered session IDs. Sessions added or removed
    /// while this runs may or may not appear.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Best-effort copy of every `(session_id, handle)` pair.
    pub fn snapshot(&self) -> Vec<(String, ConnectionHandle)> {
        self.sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
