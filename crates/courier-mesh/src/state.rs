//! The shared agent state record.

use std::collections::HashSet;
use std::sync::Arc;

use cmn_types::{Coordinate, RequestId};
use tokio::sync::RwLock;

/// Where the agent is in its delivery cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    /// Idle at or near home, able to take new work
    Ready,
    /// Running toward a pickup point
    ToPickup,
    /// Carrying a package to its dropoff
    ToDropoff,
    /// Heading back to the home position
    Returning,
}

/// Mutable record shared by every loop in the agent.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// Last known position
    pub position: Coordinate,
    /// Base position the agent returns to after each delivery
    pub home: Coordinate,
    /// Whether the agent can take new work right now
    pub ready: bool,
    pub phase: AgentPhase,
    pending_bids: HashSet<RequestId>,
}

/// Handle to the one shared agent record.
///
/// All loops read and mutate through these named accessors. Each accessor
/// holds the lock only for its own operation; there is no mutual exclusion
/// across await points, so loops can observe each other's intermediate
/// state mid-delivery.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<AgentState>>,
}

impl SharedState {
    /// Fresh state: positioned at `home`, ready, no tracked bids.
    pub fn new(home: Coordinate) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AgentState {
                position: home,
                home,
                ready: true,
                phase: AgentPhase::Ready,
                pending_bids: HashSet::new(),
            })),
        }
    }

    pub async fn position(&self) -> Coordinate {
        self.inner.read().await.position
    }

    pub async fn set_position(&self, position: Coordinate) {
        self.inner.write().await.position = position;
    }

    pub async fn home(&self) -> Coordinate {
        self.inner.read().await.home
    }

    pub async fn ready(&self) -> bool {
        self.inner.read().await.ready
    }

    pub async fn set_ready(&self, ready: bool) {
        self.inner.write().await.ready = ready;
    }

    pub async fn phase(&self) -> AgentPhase {
        self.inner.read().await.phase
    }

    pub async fn set_phase(&self, phase: AgentPhase) {
        self.inner.write().await.phase = phase;
    }

    /// Mark the agent busy and headed for a pickup, as one update so no
    /// observer can see a half-applied transition.
    pub async fn begin_delivery(&self) {
        let mut inner = self.inner.write().await;
        inner.ready = false;
        inner.phase = AgentPhase::ToPickup;
    }

    /// Mark the agent idle and ready again, as one update.
    pub async fn finish_delivery(&self) {
        let mut inner = self.inner.write().await;
        inner.ready = true;
        inner.phase = AgentPhase::Ready;
    }

    /// Consistent copy of the whole record, for reporting.
    pub async fn snapshot(&self) -> AgentState {
        self.inner.read().await.clone()
    }

    /// Start tracking a submitted bid.
    pub async fn track_bid(&self, id: RequestId) {
        self.inner.write().await.pending_bids.insert(id);
    }

    /// Stop tracking `id`. Returns whether it was tracked, so a caller can
    /// claim the removal exclusively.
    pub async fn untrack_bid(&self, id: RequestId) -> bool {
        self.inner.write().await.pending_bids.remove(&id)
    }

    pub async fn is_tracking(&self, id: RequestId) -> bool {
        self.inner.read().await.pending_bids.contains(&id)
    }

    /// Sorted snapshot of the tracked bid identifiers.
    pub async fn pending_bids(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = self
            .inner
            .read()
            .await
            .pending_bids
            .iter()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }
}
