//! In-memory marketplace ledger.
//!
//! Backs the local simulator and the test suites. Behaves like the real
//! marketplace as far as a single device agent can observe it: bids move
//! requests from open to proposed, acknowledgements walk the assigned
//! request through its delivery statuses, and every status report is
//! recorded as received.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::coord::Coordinate;
use crate::ledger::{LedgerClient, LedgerError, LedgerResult};
use crate::price::TokenAmount;
use crate::request::{AgentId, DeliveryRequest, RequestId, RequestStatus};

/// One position/readiness report as received by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub lat: i64,
    pub lon: i64,
    pub ready: i8,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    next_id: RequestId,
    requests: HashMap<RequestId, DeliveryRequest>,
    reports: Vec<StatusReport>,
    acks: Vec<(RequestId, RequestStatus)>,
}

/// In-memory [`LedgerClient`] bound to one device identity.
///
/// The marketplace-side operations (`create_request`, `accept_proposal`,
/// `cancel_request`) exist so tests and the simulator can play the
/// requester role; a device agent never calls them.
pub struct MemoryLedger {
    device: AgentId,
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    /// New empty ledger submitting bids and acknowledgements as `device`.
    pub fn new(device: AgentId) -> Self {
        Self {
            device,
            inner: RwLock::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Post a new open request and return its ledger index.
    pub async fn create_request(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        base_price: TokenAmount,
        max_price: Option<TokenAmount>,
    ) -> RequestId {
        self.insert_request(pickup, dropoff, base_price, max_price, None, None)
            .await
    }

    /// Post a request with an exclusivity window for `target`.
    pub async fn create_targeted_request(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        base_price: TokenAmount,
        max_price: Option<TokenAmount>,
        target: AgentId,
        window: Duration,
    ) -> RequestId {
        self.insert_request(
            pickup,
            dropoff,
            base_price,
            max_price,
            Some(target),
            Some(Utc::now() + window),
        )
        .await
    }

    async fn insert_request(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        base_price: TokenAmount,
        max_price: Option<TokenAmount>,
        targeted_agent: Option<AgentId>,
        expires_at: Option<DateTime<Utc>>,
    ) -> RequestId {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.requests.insert(
            id,
            DeliveryRequest {
                id,
                requester: AgentId::new(format!("did:cmn:requester-{}", Uuid::new_v4())),
                pickup,
                dropoff,
                base_price,
                proposed_price: None,
                assigned_agent: None,
                status: RequestStatus::Open,
                requested_at: Utc::now(),
                proposed_at: None,
                accepted_at: None,
                targeted_agent,
                expires_at,
                max_price,
            },
        );
        id
    }

    /// Accept the proposal standing on `id`, assigning the delivery to the
    /// proposing agent.
    pub async fn accept_proposal(&self, id: RequestId) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| LedgerError::Rejected(format!("no such request: {}", id)))?;
        if request.status != RequestStatus::Proposed {
            return Err(LedgerError::Rejected(format!(
                "request {} is not proposed ({:?})",
                id, request.status
            )));
        }
        request.status = RequestStatus::Accepted;
        request.accepted_at = Some(Utc::now());
        Ok(())
    }

    /// Withdraw `id` regardless of its current status.
    pub async fn cancel_request(&self, id: RequestId) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| LedgerError::Rejected(format!("no such request: {}", id)))?;
        request.status = RequestStatus::Cancelled;
        Ok(())
    }

    /// Marketplace-side snapshot of every request.
    pub async fn requests(&self) -> Vec<DeliveryRequest> {
        let inner = self.inner.read().await;
        let mut all: Vec<_> = inner.requests.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    /// Every status report received, oldest first.
    pub async fn reports(&self) -> Vec<StatusReport> {
        self.inner.read().await.reports.clone()
    }

    /// Every acknowledgement received, as (request, resulting status).
    pub async fn acks(&self) -> Vec<(RequestId, RequestStatus)> {
        self.inner.read().await.acks.clone()
    }

    /// Record an acknowledgement that moves `id` from `expected` to `next`.
    async fn advance(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        let device = self.device.clone();
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| LedgerError::Rejected(format!("no such request: {}", id)))?;
        if request.assigned_agent.as_ref() != Some(&device) {
            return Err(LedgerError::Rejected(format!(
                "request {} is not assigned to {}",
                id, device
            )));
        }
        if request.status != expected {
            return Err(LedgerError::Rejected(format!(
                "request {} is {:?}, expected {:?}",
                id, request.status, expected
            )));
        }
        request.status = next;
        inner.acks.push((id, next));
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn list_open_requests(&self) -> LedgerResult<Vec<RequestId>> {
        let inner = self.inner.read().await;
        let mut ids: Vec<_> = inner
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Open)
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn list_targeted_requests(&self, agent: &AgentId) -> LedgerResult<Vec<RequestId>> {
        let inner = self.inner.read().await;
        let mut ids: Vec<_> = inner
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Open && r.targeted_agent.as_ref() == Some(agent))
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn get_request(&self, id: RequestId) -> LedgerResult<DeliveryRequest> {
        let inner = self.inner.read().await;
        inner
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("no such request: {}", id)))
    }

    async fn submit_bid(&self, id: RequestId, price: TokenAmount) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        let device = self.device.clone();
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| LedgerError::Rejected(format!("no such request: {}", id)))?;
        if request.status != RequestStatus::Open {
            return Err(LedgerError::Rejected(format!(
                "request {} is not open for proposals ({:?})",
                id, request.status
            )));
        }
        if let Some(max) = request.max_price {
            if price > max {
                return Err(LedgerError::Rejected(format!(
                    "bid {} exceeds maximum price {}",
                    price, max
                )));
            }
        }
        request.status = RequestStatus::Proposed;
        request.proposed_price = Some(price);
        request.assigned_agent = Some(device);
        request.proposed_at = Some(Utc::now());
        Ok(())
    }

    async fn acknowledge_start(&self, id: RequestId) -> LedgerResult<()> {
        self.advance(id, RequestStatus::Accepted, RequestStatus::Started)
            .await
    }

    async fn acknowledge_picked_up(&self, id: RequestId) -> LedgerResult<()> {
        self.advance(id, RequestStatus::Started, RequestStatus::PickedUp)
            .await
    }

    async fn acknowledge_dropped(&self, id: RequestId) -> LedgerResult<()> {
        self.advance(id, RequestStatus::PickedUp, RequestStatus::Dropped)
            .await
    }

    async fn acknowledge_completed(&self, id: RequestId) -> LedgerResult<()> {
        self.advance(id, RequestStatus::Dropped, RequestStatus::Completed)
            .await
    }

    async fn report_status(
        &self,
        lat: i64,
        lon: i64,
        ready: i8,
        at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        inner.reports.push(StatusReport {
            lat,
            lon,
            ready,
            at,
        });
        Ok(())
    }
}
