//! Read-only snapshot of the live connection set.
//!
//! The dispatcher owns the authoritative map of connections and is the
//! only writer here: it mirrors every membership change into
//! [`Registry`] after applying it. Everyone else may take a shared read
//! lock for counts or membership checks. Reads carry no ordering
//! guarantee relative to in-flight dispatch.

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::domain::ConnectionId;

/// Snapshot of which connections are currently registered.
#[derive(Debug, Default)]
pub struct Registry {
    live: RwLock<HashSet<ConnectionId>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as live and returns the new live count.
    pub(crate) async fn insert(&self, id: ConnectionId) -> usize {
        let mut live = self.live.write().await;
        live.insert(id);
        live.len()
    }

    /// Forgets `id` and returns the new live count.
    pub(crate) async fn remove(&self, id: ConnectionId) -> usize {
        let mut live = self.live.write().await;
        live.remove(&id);
        live.len()
    }

    /// Forgets every connection.
    pub(crate) async fn clear(&self) {
        self.live.write().await.clear();
    }

    /// Returns `true` if `id` is currently registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.live.read().await.contains(&id)
    }

    /// Returns the ids of all registered connections, in no particular
    /// order.
    pub async fn snapshot(&self) -> Vec<ConnectionId> {
        self.live.read().await.iter().copied().collect()
    }

    /// Returns the number of registered connections.
    pub async fn len(&self) -> usize {
        self.live.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.live.read().await.is_empty()
    }
}
