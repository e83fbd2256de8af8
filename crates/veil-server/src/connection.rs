//! Connection manager: lifecycle of one subscriber socket.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────┐ upgrade ┌────────────────┐ verified ┌────────────┐
//! │ Connecting │────────>│ Authenticating │─────────>│ Subscribed │
//! └────────────┘         └────────────────┘          └────────────┘
//!                                │ rejected                │ close/error
//!                                ↓                         ↓
//!                           ┌────────┐              ┌─────────┐
//!                           │ Closed │<─────────────│ Closing │
//!                           └────────┘              └─────────┘
//! ```
//!
//! The bearer credential arrives as a connection parameter and is trusted
//! for nothing until the auth collaborator verifies it; a rejected
//! connection is closed without ever touching the registry. Teardown always
//! unsubscribes before releasing the socket, so no broadcast snapshot taken
//! afterwards can target the dying connection.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use veil_core::{ClientFrame, EventFrame, ScopeId};

use crate::{
    auth::AuthContext,
    error::ApiError,
    registry::{ConnectionId, Subscriber},
    state::AppState,
};

/// WebSocket close code sent on credential rejection.
pub const AUTH_FAILURE_CLOSE_CODE: u16 = 4001;

/// Process-wide connection id allocator.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle states of one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    /// Socket accepted, upgrade in progress.
    Connecting,
    /// Credential handed to the auth collaborator.
    Authenticating,
    /// Registered in the scope registry, relaying events.
    Subscribed,
    /// Teardown started; already removed from the registry.
    Closing,
    /// Socket released.
    Closed,
}

fn transition(connection_id: ConnectionId, state: &mut ConnectionState, next: ConnectionState) {
    tracing::trace!(%connection_id, from = ?*state, to = ?next, "connection transition");
    *state = next;
}

/// Query parameters of a subscription request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer credential, verified by the auth collaborator.
    pub token: String,
}

/// `GET /ws/channels/{channel_id}` — subscribe to a channel scope.
pub async fn channel_socket(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match ScopeId::channel_checked(channel_id) {
        Ok(scope) => {
            ws.on_upgrade(move |socket| handle_connection(state, socket, scope, query.token))
        },
        Err(error) => ApiError::from(error).into_response(),
    }
}

/// `GET /ws/dms/{conversation_id}` — subscribe to a DM conversation scope.
pub async fn dm_socket(
    State(state): State<AppState>,
    Path(conversation_id): Path<u64>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let scope = ScopeId::Conversation(conversation_id);
    ws.on_upgrade(move |socket| handle_connection(state, socket, scope, query.token))
}

/// Drive one connection from accept to teardown.
async fn handle_connection(state: AppState, mut socket: WebSocket, scope: ScopeId, token: String) {
    let connection_id = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let mut lifecycle = ConnectionState::Connecting;

    transition(connection_id, &mut lifecycle, ConnectionState::Authenticating);
    let identity = match state.verifier.verify(&token) {
        Ok(identity) => identity,
        Err(_) => {
            tracing::info!(%connection_id, scope = %scope, "closing unauthenticated connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: AUTH_FAILURE_CLOSE_CODE,
                    reason: "unauthorized".into(),
                })))
                .await;
            transition(connection_id, &mut lifecycle, ConnectionState::Closed);
            return;
        },
    };

    let registry = state.publisher.registry(scope.namespace());
    let (subscriber, mut outbound) =
        Subscriber::new(connection_id, identity.user_id, identity.username.clone(), scope);
    registry.subscribe(subscriber);
    transition(connection_id, &mut lifecycle, ConnectionState::Subscribed);
    tracing::info!(
        %connection_id,
        scope = %scope,
        user_id = identity.user_id,
        "subscriber joined"
    );

    state
        .publisher
        .publish(
            EventFrame::UserJoined {
                scope,
                user_id: identity.user_id,
                username: identity.username.clone(),
            },
            Some(connection_id),
        )
        .await;

    let (mut sink, mut stream) = socket.split();

    // Writer task drains the outbound queue onto the socket. It ends when
    // every sender clone is gone (teardown) or the socket breaks; a late
    // write to a closed socket is dropped silently.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(error) => {
                    tracing::error!(%error, "failed to serialize event frame");
                    continue;
                },
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) else {
                    tracing::debug!(%connection_id, "ignoring malformed client frame");
                    continue;
                };
                handle_client_frame(&state, connection_id, &identity, scope, frame).await;
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}, // ping/pong handled by the protocol layer
            Err(error) => {
                tracing::debug!(%connection_id, %error, "socket error");
                break;
            },
        }
    }

    // Unsubscribe before releasing the socket: no membership snapshot taken
    // from here on can include this connection.
    transition(connection_id, &mut lifecycle, ConnectionState::Closing);
    registry.unsubscribe(scope, connection_id);

    state
        .publisher
        .publish(
            EventFrame::UserLeft {
                scope,
                user_id: identity.user_id,
                username: identity.username.clone(),
            },
            Some(connection_id),
        )
        .await;

    let _ = writer.await;
    transition(connection_id, &mut lifecycle, ConnectionState::Closed);
    tracing::info!(%connection_id, scope = %scope, "connection closed");
}

/// Process one inbound frame from a subscribed connection.
async fn handle_client_frame(
    state: &AppState,
    connection_id: ConnectionId,
    identity: &AuthContext,
    scope: ScopeId,
    frame: ClientFrame,
) {
    match frame {
        ClientFrame::TypingStart | ClientFrame::TypingStop => {
            let started = matches!(frame, ClientFrame::TypingStart);
            // Ephemeral: relayed to the scope's other subscribers, never
            // persisted, sender excluded.
            state
                .publisher
                .publish(
                    EventFrame::UserTyping {
                        scope,
                        user_id: identity.user_id,
                        username: identity.username.clone(),
                        started,
                    },
                    Some(connection_id),
                )
                .await;
        },
        ClientFrame::Message { content } => {
            if content.trim().is_empty() {
                return;
            }

            let envelope = state.encryption.encrypt(scope, content.as_bytes());
            let message_id = match state.store.store(scope, envelope).await {
                Ok(id) => id,
                Err(error) => {
                    // Persist-then-broadcast: a message the store rejected is
                    // not announced to anyone.
                    tracing::error!(%connection_id, scope = %scope, %error, "message persist failed");
                    return;
                },
            };

            state
                .publisher
                .publish(
                    EventFrame::Message {
                        scope,
                        message_id,
                        user_id: identity.user_id,
                        username: identity.username.clone(),
                        body: content,
                    },
                    None,
                )
                .await;
        },
    }
}
