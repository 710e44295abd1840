//! Tracks outstanding proposals and hands accepted work to the executor.

use std::sync::Arc;

use cmn_types::{AgentId, LedgerClient, LedgerResult, RequestId, RequestStatus};
use log::{debug, info, warn};

use crate::config::AgentConfig;
use crate::executor::DeliveryExecutor;
use crate::state::SharedState;

/// Polls the status of every tracked proposal and resolves each one:
/// accepted for us starts a delivery, anything else terminal drops the
/// tracking entry, still-proposed stays for the next cycle.
pub struct ProposalMonitor {
    agent: AgentId,
    ledger: Arc<dyn LedgerClient>,
    state: SharedState,
    executor: DeliveryExecutor,
}

impl ProposalMonitor {
    pub fn new(
        config: &AgentConfig,
        ledger: Arc<dyn LedgerClient>,
        state: SharedState,
        executor: DeliveryExecutor,
    ) -> Self {
        Self {
            agent: config.agent(),
            ledger,
            state,
            executor,
        }
    }

    /// One poll cycle over the tracked proposal set. The executor runs
    /// inline, so an accepted delivery finishes before the next proposal is
    /// examined and at most one delivery is ever in flight.
    pub async fn tick(&self) {
        for id in self.state.pending_bids().await {
            if let Err(e) = self.check(id).await {
                // Left tracked; the next cycle retries.
                warn!("monitor: checking proposal {} failed: {}", id, e);
            }
        }
    }

    async fn check(&self, id: RequestId) -> LedgerResult<()> {
        let request = self.ledger.get_request(id).await?;
        match request.status {
            RequestStatus::Accepted
                if request.assigned_agent.as_ref() == Some(&self.agent) =>
            {
                // Untrack first: whoever wins the removal owns the one and
                // only executor invocation for this request.
                if self.state.untrack_bid(id).await {
                    info!("monitor: proposal {} accepted, starting delivery", id);
                    self.executor.deliver(&request).await;
                }
            }
            RequestStatus::Proposed => {
                debug!("monitor: proposal {} still pending", id);
            }
            status => {
                debug!(
                    "monitor: proposal {} resolved without us ({:?}), dropping",
                    id, status
                );
                self.state.untrack_bid(id).await;
            }
        }
        Ok(())
    }
}
