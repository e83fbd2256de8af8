//! Real-time event frames.
//!
//! [`EventFrame`] is the outbound shape pushed to subscribers; [`ClientFrame`]
//! is what a subscriber may send inbound over its socket. Typing and presence
//! frames are ephemeral: they are relayed to the scope's other subscribers and
//! never persisted.

use serde::{Deserialize, Serialize};

use crate::scope::ScopeId;

/// Outbound event delivered to every live subscriber of a scope.
///
/// Tagged JSON on the wire, e.g.
/// `{"type": "message", "scope": {"namespace": "channel", "id": 42}, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventFrame {
    /// A chat message, already persisted in sealed form; the plaintext body
    /// is fanned out to live subscribers only.
    Message {
        /// Scope the message belongs to.
        scope: ScopeId,
        /// Stored message identifier assigned by the persistence collaborator.
        message_id: u64,
        /// Sending user.
        user_id: u64,
        /// Sending user's name, denormalized for display.
        username: String,
        /// Plaintext message body.
        body: String,
    },

    /// A subscriber started or stopped typing. Ephemeral.
    UserTyping {
        /// Scope the indicator belongs to.
        scope: ScopeId,
        /// Typing user.
        user_id: u64,
        /// Typing user's name.
        username: String,
        /// `true` on typing start, `false` on stop.
        started: bool,
    },

    /// A subscriber joined the scope. Ephemeral.
    UserJoined {
        /// Scope that was joined.
        scope: ScopeId,
        /// Joining user.
        user_id: u64,
        /// Joining user's name.
        username: String,
    },

    /// A subscriber left the scope. Ephemeral.
    UserLeft {
        /// Scope that was left.
        scope: ScopeId,
        /// Leaving user.
        user_id: u64,
        /// Leaving user's name.
        username: String,
    },
}

impl EventFrame {
    /// The scope this event targets.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        match self {
            Self::Message { scope, .. }
            | Self::UserTyping { scope, .. }
            | Self::UserJoined { scope, .. }
            | Self::UserLeft { scope, .. } => *scope,
        }
    }

    /// Stable kind label, as it appears in the wire `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::UserTyping { .. } => "user_typing",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
        }
    }
}

/// Inbound frame a subscriber sends over its own socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Send a chat message to the connection's scope.
    Message {
        /// Plaintext message body.
        content: String,
    },
    /// The client started typing.
    TypingStart,
    /// The client stopped typing.
    TypingStop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = EventFrame::UserJoined {
            scope: ScopeId::Channel(42),
            user_id: 7,
            username: "ada".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user_joined");
        assert_eq!(json["scope"]["namespace"], "channel");
        assert_eq!(json["scope"]["id"], 42);
        assert_eq!(json["user_id"], 7);
    }

    #[test]
    fn kind_matches_wire_tag() {
        let frames = [
            EventFrame::Message {
                scope: ScopeId::Channel(1),
                message_id: 1,
                user_id: 1,
                username: "a".to_string(),
                body: "hi".to_string(),
            },
            EventFrame::UserTyping {
                scope: ScopeId::Channel(1),
                user_id: 1,
                username: "a".to_string(),
                started: true,
            },
            EventFrame::UserJoined {
                scope: ScopeId::Channel(1),
                user_id: 1,
                username: "a".to_string(),
            },
            EventFrame::UserLeft {
                scope: ScopeId::Channel(1),
                user_id: 1,
                username: "a".to_string(),
            },
        ];

        for frame in frames {
            let json = serde_json::to_value(&frame).unwrap();
            assert_eq!(json["type"], frame.kind());
        }
    }

    #[test]
    fn client_frame_parses_typing_indicators() {
        let start: ClientFrame = serde_json::from_str(r#"{"type": "typing_start"}"#).unwrap();
        assert_eq!(start, ClientFrame::TypingStart);

        let stop: ClientFrame = serde_json::from_str(r#"{"type": "typing_stop"}"#).unwrap();
        assert_eq!(stop, ClientFrame::TypingStop);
    }

    #[test]
    fn client_frame_parses_message() {
        let msg: ClientFrame =
            serde_json::from_str(r#"{"type": "message", "content": "hello"}"#).unwrap();
        assert_eq!(msg, ClientFrame::Message { content: "hello".to_string() });
    }

    #[test]
    fn unknown_client_frame_rejected() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"type": "shutdown"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn event_roundtrip() {
        let event = EventFrame::UserTyping {
            scope: ScopeId::Conversation(9),
            user_id: 3,
            username: "grace".to_string(),
            started: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: EventFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
