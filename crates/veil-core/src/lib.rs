//! Veil Core
//!
//! Scope model, event frames, and the encryption service of the Veil chat
//! core. This crate is runtime-agnostic: no I/O, no async, no transport.
//! The server crate wraps it with HTTP and WebSocket boundaries.
//!
//! # Components
//!
//! - [`ScopeId`]: tagged channel/conversation identifier; eliminates the
//!   numeric-collision class between the two id spaces at the type level
//! - [`EncryptionService`]: derive-then-seal / derive-then-open, owning the
//!   nonce policy and a bounded key cache
//! - [`EventFrame`] / [`ClientFrame`]: real-time wire shapes
//! - [`MasterSecret`]: the injected root secret, validated at startup

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod event;
mod scope;
mod service;

pub use config::{ConfigError, DEFAULT_KEY_CACHE_CAPACITY, MasterSecret};
pub use event::{ClientFrame, EventFrame};
pub use scope::{DM_KEY_OFFSET, Namespace, ScopeError, ScopeId};
pub use service::EncryptionService;
