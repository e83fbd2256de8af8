//! Veil server.
//!
//! The process boundary of the Veil chat core: an axum HTTP surface for the
//! encrypt/decrypt contract and a WebSocket surface for real-time fan-out.
//!
//! # Architecture
//!
//! ```text
//! Server
//!   ├─ http: /encrypt /decrypt /health  →  EncryptionService (veil-core)
//!   ├─ connection: one task per socket (accept → auth → subscribe → relay)
//!   ├─ registry: ScopeRegistry × 2 (channel namespace, DM namespace)
//!   ├─ broadcast: Publisher (snapshot-then-send, per-scope FIFO)
//!   └─ seams: TokenVerifier (auth collaborator), MessageStore (persistence)
//! ```
//!
//! All state is process-local. Serving one scope from multiple processes
//! concurrently requires an external broadcast transport; this crate does
//! not provide one.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod auth;
mod broadcast;
mod connection;
mod error;
mod http;
mod registry;
mod state;
mod store;

pub use auth::{AuthContext, SharedSecretVerifier, TokenVerifier, Unauthorized};
pub use broadcast::{DEFAULT_DELIVERY_TIMEOUT, Publisher};
pub use connection::AUTH_FAILURE_CLOSE_CODE;
pub use error::ApiError;
pub use http::{DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse};
pub use registry::{
    ConnectionId, DeliveryError, OUTBOUND_QUEUE_DEPTH, ScopeRegistry, Subscriber,
};
pub use state::{AppState, router};
pub use store::{MemoryStore, MessageStore, StoreError, StoredMessage};
