//! Persistence collaborator boundary.
//!
//! Message storage is outside this core; the publish path only needs to hand
//! a sealed envelope over and get a message id back. The in-memory
//! implementation backs tests and single-process development runs.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use veil_core::ScopeId;
use veil_crypto::CipherEnvelope;

/// A message as the persistence collaborator holds it: sealed, never
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Identifier assigned by the store.
    pub id: u64,
    /// Scope the message belongs to.
    pub scope: ScopeId,
    /// The sealed envelope.
    pub envelope: CipherEnvelope,
}

/// Storage backend failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Stores sealed envelopes and returns message identifiers.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a sealed envelope under its scope, returning the new
    /// message's id.
    async fn store(&self, scope: ScopeId, envelope: CipherEnvelope) -> Result<u64, StoreError>;

    /// Stored messages for a scope, oldest first.
    async fn messages_for(&self, scope: ScopeId) -> Result<Vec<StoredMessage>, StoreError>;
}

/// In-memory message store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    messages: Mutex<Vec<StoredMessage>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn store(&self, scope: ScopeId, envelope: CipherEnvelope) -> Result<u64, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.push(StoredMessage { id, scope, envelope });
        Ok(id)
    }

    async fn messages_for(&self, scope: ScopeId) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(messages.iter().filter(|message| message.scope == scope).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use veil_crypto::{ENVELOPE_VERSION, NONCE_SIZE};

    use super::*;

    fn envelope(fill: u8) -> CipherEnvelope {
        CipherEnvelope {
            version: ENVELOPE_VERSION,
            nonce: [fill; NONCE_SIZE],
            ciphertext: vec![fill; 24],
        }
    }

    #[tokio::test]
    async fn store_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let scope = ScopeId::Channel(1);

        let first = store.store(scope, envelope(1)).await.unwrap();
        let second = store.store(scope, envelope(2)).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn messages_for_filters_by_scope_oldest_first() {
        let store = MemoryStore::new();

        store.store(ScopeId::Channel(1), envelope(1)).await.unwrap();
        store.store(ScopeId::Conversation(1), envelope(2)).await.unwrap();
        store.store(ScopeId::Channel(1), envelope(3)).await.unwrap();

        let messages = store.messages_for(ScopeId::Channel(1)).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].id < messages[1].id);
        assert_eq!(messages[0].envelope, envelope(1));
        assert_eq!(messages[1].envelope, envelope(3));
    }
}
