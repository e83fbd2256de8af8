//! Broadcast executor: fans one event out to a scope's live subscribers.
//!
//! Copy-then-send discipline: the registry lock is only held long enough to
//! snapshot the membership; every enqueue happens outside it. Publishes to
//! the same scope are serialized so all subscribers observe one scope's
//! events in a single order (per-scope FIFO); publishes to different scopes
//! proceed independently.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::Mutex as AsyncMutex;
use veil_core::{EventFrame, Namespace, ScopeId};

use crate::registry::{ConnectionId, ScopeRegistry};

/// How long one slow peer may stall its own delivery before that single
/// delivery is abandoned.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Routes events to the right namespace registry and fans them out.
pub struct Publisher {
    channels: Arc<ScopeRegistry>,
    dms: Arc<ScopeRegistry>,
    delivery_timeout: Duration,
    /// Per-scope publish serialization. Entries are pruned once a scope has
    /// no subscribers left.
    scope_locks: Mutex<HashMap<ScopeId, Arc<AsyncMutex<()>>>>,
}

impl Publisher {
    /// Create a publisher over the two namespace registries.
    #[must_use]
    pub fn new(channels: Arc<ScopeRegistry>, dms: Arc<ScopeRegistry>) -> Self {
        Self::with_delivery_timeout(channels, dms, DEFAULT_DELIVERY_TIMEOUT)
    }

    /// Create a publisher with an explicit per-peer delivery timeout.
    #[must_use]
    pub fn with_delivery_timeout(
        channels: Arc<ScopeRegistry>,
        dms: Arc<ScopeRegistry>,
        delivery_timeout: Duration,
    ) -> Self {
        Self { channels, dms, delivery_timeout, scope_locks: Mutex::new(HashMap::new()) }
    }

    /// The registry serving a namespace.
    #[must_use]
    pub fn registry(&self, namespace: Namespace) -> &Arc<ScopeRegistry> {
        match namespace {
            Namespace::Channel => &self.channels,
            Namespace::DirectMessage => &self.dms,
        }
    }

    /// Deliver an event to every live subscriber of its scope, except the
    /// optionally excluded connection (e.g. the sender of a typing
    /// indicator).
    ///
    /// A single peer's failure or timeout is logged with its connection id
    /// and swallowed; it never aborts delivery to the scope's other peers
    /// and never propagates to the caller. Returns the number of successful
    /// deliveries.
    pub async fn publish(&self, frame: EventFrame, exclude: Option<ConnectionId>) -> usize {
        let scope = frame.scope();
        let registry = self.registry(scope.namespace());

        // Serialize publishes per scope so every subscriber sees this
        // scope's events in the same order. Deliveries still happen outside
        // the registry lock.
        let scope_lock = self.scope_lock(scope);
        let ordering_guard = scope_lock.lock().await;

        let members = registry.members_of(scope);

        // All peers are enqueued concurrently: a slow peer burns its own
        // timeout without delaying the others, and the next publish for this
        // scope cannot start until every peer saw (or dropped) this one.
        let sends = members
            .iter()
            .filter(|member| Some(member.connection_id) != exclude)
            .map(|member| member.deliver(frame.clone(), self.delivery_timeout));

        let mut delivered = 0;
        for result in futures::future::join_all(sends).await {
            match result {
                Ok(()) => delivered += 1,
                Err(error) => {
                    // Transient per-peer failure: the peer is slow or already
                    // gone. Its own connection task handles teardown.
                    tracing::debug!(scope = %scope, %error, "dropped delivery to one subscriber");
                },
            }
        }

        // Release our handle on the lock before deciding whether to prune
        // it, otherwise the entry always looks in use.
        drop(ordering_guard);
        drop(scope_lock);
        if members.is_empty() {
            self.prune_scope_lock(scope);
        }

        delivered
    }

    fn scope_lock(&self, scope: ScopeId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.scope_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(scope).or_default())
    }

    fn prune_scope_lock(&self, scope: ScopeId) {
        let mut locks = self.scope_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Keep the entry if another publish currently holds or awaits it
        if locks.get(&scope).is_some_and(|lock| Arc::strong_count(lock) <= 1) {
            locks.remove(&scope);
        }
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("delivery_timeout", &self.delivery_timeout)
            .finish_non_exhaustive()
    }
}
