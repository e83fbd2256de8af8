//! Shared application state and router assembly.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use veil_core::{EncryptionService, Namespace};

use crate::{
    auth::TokenVerifier,
    broadcast::Publisher,
    connection::{channel_socket, dm_socket},
    http::{decrypt, encrypt, health},
    registry::ScopeRegistry,
    store::MessageStore,
};

/// State shared by every handler: the encryption service, the two namespace
/// registries behind the publisher, and the collaborator seams.
#[derive(Clone)]
pub struct AppState {
    /// Per-scope seal/open service.
    pub encryption: Arc<EncryptionService>,
    /// Fan-out executor over the channel and DM registries.
    pub publisher: Arc<Publisher>,
    /// Auth collaborator.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Persistence collaborator.
    pub store: Arc<dyn MessageStore>,
}

impl AppState {
    /// Wire up state with fresh registries for both namespaces.
    #[must_use]
    pub fn new(
        encryption: EncryptionService,
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let channels = Arc::new(ScopeRegistry::new(Namespace::Channel));
        let dms = Arc::new(ScopeRegistry::new(Namespace::DirectMessage));
        Self {
            encryption: Arc::new(encryption),
            publisher: Arc::new(Publisher::new(channels, dms)),
            verifier,
            store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("publisher", &self.publisher).finish_non_exhaustive()
    }
}

/// Assemble the full route table over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/encrypt", post(encrypt))
        .route("/decrypt", post(decrypt))
        .route("/ws/channels/:channel_id", get(channel_socket))
        .route("/ws/dms/:conversation_id", get(dm_socket))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
