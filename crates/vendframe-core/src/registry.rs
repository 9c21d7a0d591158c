//! Client handles and the process-wide client registry.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;

use crate::slots::ReplySlots;

/// Handle to one physical controller transport.
///
/// The handle serialises its own writes: one call to [`Client::write`] puts
/// one complete command frame on the wire, atomically with respect to other
/// frames. The handle also owns the client's correlation table, which lives
/// exactly as long as the client.
#[async_trait]
pub trait Client: Send + Sync {
    /// Write one complete command frame; errors propagate unchanged.
    async fn write(&self, frame: &[u8]) -> io::Result<usize>;

    /// The client's correlation table.
    fn channels(&self) -> &ReplySlots;
}

/// Process-wide map from client id to handle.
///
/// Owned by the surrounding application: clients are added when a device
/// connects and removed when it goes away; operations only look up. An
/// unknown id surfaces as `NoSuchClient` to the caller.
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Arc<dyn Client>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under `id`, replacing any previous handle.
    pub fn insert(&self, id: impl Into<String>, client: Arc<dyn Client>) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), client);
    }

    /// Remove the client registered under `id`.
    pub fn remove(&self, id: &str) -> Option<Arc<dyn Client>> {
        self.clients.write().unwrap_or_else(PoisonError::into_inner).remove(id)
    }

    /// Look up a client by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Client>> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullClient {
        slots: ReplySlots,
    }

    #[async_trait]
    impl Client for NullClient {
        async fn write(&self, frame: &[u8]) -> io::Result<usize> {
            Ok(frame.len())
        }

        fn channels(&self) -> &ReplySlots {
            &self.slots
        }
    }

    #[test]
    fn lookup_by_id() {
        let registry = ClientRegistry::new();
        assert!(registry.is_empty());

        registry.insert("machine-1", Arc::new(NullClient { slots: ReplySlots::new() }));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("machine-1").is_some());
        assert!(registry.get("machine-2").is_none());

        assert!(registry.remove("machine-1").is_some());
        assert!(registry.get("machine-1").is_none());
    }
}
