//! Scope identifiers.
//!
//! A scope is the unit a distinct encryption key is bound to: either a
//! channel or a direct-message conversation. The two id spaces are disjoint
//! at the type level; the numeric offset trick of the storage format
//! survives only inside [`ScopeId::key_id`].

use serde::{Deserialize, Serialize};

/// Offset added to conversation ids inside the key-derivation input domain.
///
/// Keeps channel and conversation numbers disjoint for derivation, so a
/// channel and a conversation with the same raw id never share a key.
/// Structural assumption: channel ids stay below this value. The type system
/// already prevents mixups; [`ScopeId::channel_checked`] additionally
/// enforces the bound where channel ids enter from untrusted input.
pub const DM_KEY_OFFSET: u64 = 1_000_000;

/// The partition between channel traffic and direct-message traffic.
///
/// Each namespace has its own subscriber registry; a connection belongs to
/// at most one scope per namespace at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Server channel traffic.
    Channel,
    /// Direct-message conversation traffic.
    DirectMessage,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel => f.write_str("channel"),
            Self::DirectMessage => f.write_str("dm"),
        }
    }
}

/// Identifier of a channel or direct-message conversation.
///
/// Serializes as `{"namespace": "channel", "id": 42}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "namespace", content = "id", rename_all = "snake_case")]
pub enum ScopeId {
    /// A server channel, identified by its raw channel id.
    Channel(u64),
    /// A two-party conversation, identified by its raw conversation id.
    Conversation(u64),
}

/// Error constructing a scope id from untrusted input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScopeError {
    /// Channel id collides with the conversation range of the derivation
    /// input domain.
    #[error("channel id {0} exceeds maximum {max}", max = DM_KEY_OFFSET - 1)]
    ChannelIdOutOfRange(u64),
}

impl ScopeId {
    /// Construct a channel scope from untrusted input, enforcing the
    /// derivation-domain bound.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ChannelIdOutOfRange`] if `id >= DM_KEY_OFFSET`.
    pub fn channel_checked(id: u64) -> Result<Self, ScopeError> {
        if id >= DM_KEY_OFFSET {
            return Err(ScopeError::ChannelIdOutOfRange(id));
        }
        Ok(Self::Channel(id))
    }

    /// Re-validate a scope that arrived through deserialization, which
    /// bypasses [`ScopeId::channel_checked`].
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ChannelIdOutOfRange`] for channel scopes whose
    /// id breaks the derivation-domain bound.
    pub fn validated(self) -> Result<Self, ScopeError> {
        match self {
            Self::Channel(id) => Self::channel_checked(id),
            Self::Conversation(_) => Ok(self),
        }
    }

    /// The namespace this scope belongs to.
    #[must_use]
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Channel(_) => Namespace::Channel,
            Self::Conversation(_) => Namespace::DirectMessage,
        }
    }

    /// Raw id within the scope's own namespace.
    #[must_use]
    pub fn raw_id(self) -> u64 {
        match self {
            Self::Channel(id) | Self::Conversation(id) => id,
        }
    }

    /// The key-derivation input id: channels map to their raw id,
    /// conversations to `raw id + DM_KEY_OFFSET`.
    #[must_use]
    pub fn key_id(self) -> u64 {
        match self {
            Self::Channel(id) => id,
            Self::Conversation(id) => id.saturating_add(DM_KEY_OFFSET),
        }
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel/{id}"),
            Self::Conversation(id) => write!(f, "dm/{id}"),
        }
    }
}
