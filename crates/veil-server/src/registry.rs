//! Scope registry: the one piece of genuinely shared mutable state.
//!
//! Maps each scope to the set of live subscriber connections, plus a reverse
//! connection → scope index so a connection can belong to at most one scope
//! per namespace. All mutation goes through the registry's own lock;
//! `members_of` hands back a point-in-time snapshot so broadcast never
//! performs socket writes under the lock.
//!
//! Two registries exist side by side, one per namespace (channel traffic and
//! direct-message traffic). They never share scope ids because the
//! [`ScopeId`] type keeps the id spaces disjoint.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
    time::Instant,
};

use tokio::sync::mpsc;
use veil_core::{EventFrame, Namespace, ScopeId};

/// Depth of each subscriber's outbound event queue.
pub const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Identifier of one live socket connection, unique for the process
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(
    /// Raw id value.
    pub u64,
);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live, authenticated subscriber of exactly one scope.
///
/// The owning connection task holds the receiving half of `outbound`; the
/// registry stores this handle purely for lookup and broadcast. Dropping the
/// receiver (connection teardown) makes every later delivery fail fast, which
/// the broadcast layer swallows.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Connection this subscriber lives on.
    pub connection_id: ConnectionId,
    /// Authenticated user behind the connection.
    pub user_id: u64,
    /// Display name, denormalized at connect time.
    pub username: String,
    /// The one scope this subscriber receives events for.
    pub scope: ScopeId,
    /// When the subscription was established.
    pub joined_at: Instant,
    outbound: mpsc::Sender<EventFrame>,
}

impl Subscriber {
    /// Create a subscriber and the receiving half of its outbound queue.
    #[must_use]
    pub fn new(
        connection_id: ConnectionId,
        user_id: u64,
        username: String,
        scope: ScopeId,
    ) -> (Self, mpsc::Receiver<EventFrame>) {
        let (outbound, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let subscriber =
            Self { connection_id, user_id, username, scope, joined_at: Instant::now(), outbound };
        (subscriber, rx)
    }

    /// Enqueue an event for this subscriber, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the failed frame's kind on a closed queue (connection already
    /// torn down) or on timeout (peer too slow to drain its queue). Callers
    /// swallow and log this; one peer's failure never affects the others.
    pub async fn deliver(
        &self,
        frame: EventFrame,
        timeout: std::time::Duration,
    ) -> Result<(), DeliveryError> {
        self.outbound.send_timeout(frame, timeout).await.map_err(|err| match err {
            mpsc::error::SendTimeoutError::Timeout(frame) => DeliveryError::Timeout {
                connection_id: self.connection_id,
                kind: frame.kind(),
            },
            mpsc::error::SendTimeoutError::Closed(frame) => DeliveryError::Closed {
                connection_id: self.connection_id,
                kind: frame.kind(),
            },
        })
    }
}

/// A single subscriber's delivery failure. Swallowed and logged at the
/// broadcast layer; never propagated to the publish caller.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The subscriber did not drain its queue within the delivery timeout.
    #[error("delivery of {kind} to connection {connection_id} timed out")]
    Timeout {
        /// Slow connection.
        connection_id: ConnectionId,
        /// Event kind that was dropped for this peer.
        kind: &'static str,
    },

    /// The subscriber's connection is already torn down.
    #[error("delivery of {kind} to connection {connection_id} failed: connection closed")]
    Closed {
        /// Closed connection.
        connection_id: ConnectionId,
        /// Event kind that was dropped for this peer.
        kind: &'static str,
    },
}

#[derive(Default)]
struct RegistryInner {
    /// Scope → subscribers keyed by connection. Empty entries are pruned, so
    /// "absent key" and "empty set" are indistinguishable to callers.
    scopes: HashMap<ScopeId, HashMap<ConnectionId, Subscriber>>,
    /// Reverse index enforcing one scope per connection.
    connection_scope: HashMap<ConnectionId, ScopeId>,
}

/// Concurrent map from scope id to the live subscribers of that scope.
pub struct ScopeRegistry {
    namespace: Namespace,
    inner: RwLock<RegistryInner>,
}

impl ScopeRegistry {
    /// Create an empty registry for one namespace.
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace, inner: RwLock::new(RegistryInner::default()) }
    }

    /// The namespace this registry serves.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Register a subscriber under its scope.
    ///
    /// Idempotent for the same connection and scope. If the connection is
    /// currently subscribed to a different scope of this namespace, it is
    /// removed from that scope in the same critical section, so no snapshot
    /// can ever observe the connection in two scopes at once. Returns the
    /// scope the connection was moved away from, if any.
    pub fn subscribe(&self, subscriber: Subscriber) -> Option<ScopeId> {
        debug_assert_eq!(subscriber.scope.namespace(), self.namespace);

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let connection_id = subscriber.connection_id;
        let scope = subscriber.scope;
        let previous = inner.connection_scope.insert(connection_id, scope);

        if let Some(previous_scope) = previous.filter(|previous_scope| *previous_scope != scope) {
            remove_member(&mut inner.scopes, previous_scope, connection_id);
        }

        inner.scopes.entry(scope).or_default().insert(connection_id, subscriber);

        previous.filter(|previous_scope| *previous_scope != scope)
    }

    /// Remove a connection from a scope. Idempotent; absent entries are a
    /// no-op.
    pub fn unsubscribe(&self, scope: ScopeId, connection_id: ConnectionId) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        remove_member(&mut inner.scopes, scope, connection_id);

        // Only clear the reverse index if it still points at this scope;
        // the connection may have already moved elsewhere.
        if inner.connection_scope.get(&connection_id) == Some(&scope) {
            inner.connection_scope.remove(&connection_id);
        }
    }

    /// Point-in-time snapshot of a scope's subscribers.
    ///
    /// Broadcast iterates this copy, so a subscriber disconnecting
    /// mid-broadcast at worst produces a swallowed send failure.
    #[must_use]
    pub fn members_of(&self, scope: ScopeId) -> Vec<Subscriber> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.scopes.get(&scope).map(|members| members.values().cloned().collect()).unwrap_or_default()
    }

    /// Scope a connection is currently subscribed to, if any.
    #[must_use]
    pub fn scope_of(&self, connection_id: ConnectionId) -> Option<ScopeId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.connection_scope.get(&connection_id).copied()
    }

    /// Whether a connection is subscribed to a scope.
    #[must_use]
    pub fn is_subscribed(&self, scope: ScopeId, connection_id: ConnectionId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.scopes.get(&scope).is_some_and(|members| members.contains_key(&connection_id))
    }

    /// Number of subscribers in a scope. Absent and empty are both zero.
    #[must_use]
    pub fn member_count(&self, scope: ScopeId) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.scopes.get(&scope).map_or(0, HashMap::len)
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ScopeRegistry")
            .field("namespace", &self.namespace)
            .field("scope_count", &inner.scopes.len())
            .field("connection_count", &inner.connection_scope.len())
            .finish()
    }
}

fn remove_member(
    scopes: &mut HashMap<ScopeId, HashMap<ConnectionId, Subscriber>>,
    scope: ScopeId,
    connection_id: ConnectionId,
) {
    if let Some(members) = scopes.get_mut(&scope) {
        members.remove(&connection_id);
        if members.is_empty() {
            scopes.remove(&scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(connection: u64, scope: ScopeId) -> (Subscriber, mpsc::Receiver<EventFrame>) {
        Subscriber::new(ConnectionId(connection), connection * 10, format!("user{connection}"), scope)
    }

    #[test]
    fn subscribe_and_lookup() {
        let registry = ScopeRegistry::new(Namespace::Channel);
        let scope = ScopeId::Channel(42);

        let (sub1, _rx1) = subscriber(1, scope);
        let (sub2, _rx2) = subscriber(2, scope);
        registry.subscribe(sub1);
        registry.subscribe(sub2);

        assert!(registry.is_subscribed(scope, ConnectionId(1)));
        assert!(registry.is_subscribed(scope, ConnectionId(2)));
        assert_eq!(registry.member_count(scope), 2);

        let members = registry.members_of(scope);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn subscribe_same_scope_is_idempotent() {
        let registry = ScopeRegistry::new(Namespace::Channel);
        let scope = ScopeId::Channel(1);

        let (sub_a, _rx_a) = subscriber(1, scope);
        let (sub_b, _rx_b) = subscriber(1, scope);

        assert_eq!(registry.subscribe(sub_a), None);
        assert_eq!(registry.subscribe(sub_b), None);
        assert_eq!(registry.member_count(scope), 1);
    }

    #[test]
    fn subscribe_moves_connection_between_scopes() {
        let registry = ScopeRegistry::new(Namespace::Channel);
        let scope_a = ScopeId::Channel(1);
        let scope_b = ScopeId::Channel(2);

        let (sub_a, _rx_a) = subscriber(1, scope_a);
        registry.subscribe(sub_a);
        assert!(registry.is_subscribed(scope_a, ConnectionId(1)));

        let (sub_b, _rx_b) = subscriber(1, scope_b);
        let moved_from = registry.subscribe(sub_b);

        assert_eq!(moved_from, Some(scope_a));
        assert!(!registry.is_subscribed(scope_a, ConnectionId(1)));
        assert!(registry.is_subscribed(scope_b, ConnectionId(1)));
        assert_eq!(registry.member_count(scope_a), 0);
        assert_eq!(registry.scope_of(ConnectionId(1)), Some(scope_b));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = ScopeRegistry::new(Namespace::Channel);
        let scope = ScopeId::Channel(1);

        let (sub, _rx) = subscriber(1, scope);
        registry.subscribe(sub);

        registry.unsubscribe(scope, ConnectionId(1));
        assert!(!registry.is_subscribed(scope, ConnectionId(1)));
        assert_eq!(registry.scope_of(ConnectionId(1)), None);

        // Second unsubscribe and unknown connection are no-ops
        registry.unsubscribe(scope, ConnectionId(1));
        registry.unsubscribe(scope, ConnectionId(99));
    }

    #[test]
    fn absent_and_empty_scopes_are_identical() {
        let registry = ScopeRegistry::new(Namespace::Channel);
        let scope = ScopeId::Channel(7);

        assert_eq!(registry.member_count(scope), 0);
        assert!(registry.members_of(scope).is_empty());

        let (sub, _rx) = subscriber(1, scope);
        registry.subscribe(sub);
        registry.unsubscribe(scope, ConnectionId(1));

        assert_eq!(registry.member_count(scope), 0);
        assert!(registry.members_of(scope).is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutation() {
        let registry = ScopeRegistry::new(Namespace::Channel);
        let scope = ScopeId::Channel(1);

        let (sub1, _rx1) = subscriber(1, scope);
        let (sub2, _rx2) = subscriber(2, scope);
        registry.subscribe(sub1);
        registry.subscribe(sub2);

        let snapshot = registry.members_of(scope);
        registry.unsubscribe(scope, ConnectionId(2));

        assert_eq!(snapshot.len(), 2, "snapshot must be a point-in-time copy");
        assert_eq!(registry.member_count(scope), 1);
    }

    #[test]
    fn dm_registry_tracks_conversations() {
        let registry = ScopeRegistry::new(Namespace::DirectMessage);
        let scope = ScopeId::Conversation(5);

        let (sub, _rx) = subscriber(3, scope);
        registry.subscribe(sub);

        assert!(registry.is_subscribed(scope, ConnectionId(3)));
    }

    #[tokio::test]
    async fn deliver_to_closed_queue_fails_fast() {
        let scope = ScopeId::Channel(1);
        let (sub, rx) = subscriber(1, scope);
        drop(rx);

        let result = sub
            .deliver(
                EventFrame::UserJoined { scope, user_id: 1, username: "a".to_string() },
                std::time::Duration::from_secs(5),
            )
            .await;

        assert!(matches!(result, Err(DeliveryError::Closed { connection_id: ConnectionId(1), .. })));
    }
}
