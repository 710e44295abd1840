//! Marketplace discovery and bidding.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use cmn_types::{AgentId, DeliveryRequest, LedgerClient, RequestId, RequestStatus, TokenAmount};
use log::{debug, info, warn};

use crate::config::AgentConfig;
use crate::geo;
use crate::state::SharedState;

/// Polls the marketplace for open work and bids on every request the agent
/// can serve from its current position.
pub struct RequestScanner {
    agent: AgentId,
    ledger: Arc<dyn LedgerClient>,
    state: SharedState,
    max_trip_km: f64,
    rate_per_km: TokenAmount,
}

impl RequestScanner {
    pub fn new(
        config: &AgentConfig,
        ledger: Arc<dyn LedgerClient>,
        state: SharedState,
    ) -> Self {
        Self {
            agent: config.agent(),
            ledger,
            state,
            max_trip_km: config.max_trip_km,
            rate_per_km: config.rate_per_km,
        }
    }

    /// One poll cycle. A failure on any single request is logged and does
    /// not affect the rest of the cycle.
    pub async fn tick(&self) {
        let mut ids: BTreeSet<RequestId> = BTreeSet::new();

        match self.ledger.list_open_requests().await {
            Ok(open) => ids.extend(open),
            Err(e) => warn!("scanner: listing open requests failed: {}", e),
        }
        match self.ledger.list_targeted_requests(&self.agent).await {
            Ok(targeted) => ids.extend(targeted),
            Err(e) => warn!("scanner: listing targeted requests failed: {}", e),
        }

        for id in ids {
            // Already bid on; the proposal monitor owns it from here.
            if self.state.is_tracking(id).await {
                continue;
            }
            match self.ledger.get_request(id).await {
                Ok(request) => self.consider(request).await,
                Err(e) => warn!("scanner: fetching request {} failed: {}", id, e),
            }
        }
    }

    /// Decide whether to bid on one freshly fetched request.
    async fn consider(&self, request: DeliveryRequest) {
        let id = request.id;

        if request.status != RequestStatus::Open {
            // A proposal of ours the tracker has no record of (e.g. after a
            // restart): adopt it instead of re-bidding.
            if request.status == RequestStatus::Proposed
                && request.assigned_agent.as_ref() == Some(&self.agent)
            {
                debug!("scanner: request {} already carries our proposal, tracking", id);
                self.state.track_bid(id).await;
            }
            return;
        }

        if let Some(target) = &request.targeted_agent {
            if target != &self.agent {
                // No expiry means the window never closes.
                let exclusive = request.expires_at.map(|t| t > Utc::now()).unwrap_or(true);
                if exclusive {
                    debug!("scanner: request {} reserved for {}", id, target);
                    return;
                }
            }
        }

        let position = self.state.position().await;
        let trip_km = geo::trip_distance_km(position, request.pickup, request.dropoff);
        if trip_km > self.max_trip_km {
            debug!(
                "scanner: request {} trip {:.2} km exceeds limit {:.2} km",
                id, trip_km, self.max_trip_km
            );
            return;
        }

        let price = bid_price(trip_km, self.rate_per_km);
        if let Some(max) = request.max_price {
            if price > max {
                debug!(
                    "scanner: request {} priced at {} over its maximum {}",
                    id, price, max
                );
                return;
            }
        }

        match self.ledger.submit_bid(id, price).await {
            Ok(()) => {
                info!(
                    "scanner: bid {} placed on request {} ({:.2} km trip)",
                    price, id, trip_km
                );
                self.state.track_bid(id).await;
            }
            // Still untracked and still open, so the next cycle retries.
            Err(e) => warn!("scanner: bid on request {} failed: {}", id, e),
        }
    }
}

/// Price for a trip at the configured rate, rounded to the atomic unit.
fn bid_price(trip_km: f64, rate_per_km: TokenAmount) -> TokenAmount {
    (trip_km * rate_per_km as f64).round() as TokenAmount
}
