//! Drives one accepted delivery through its phase cycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cmn_types::{Coordinate, DeliveryRequest, LedgerClient, LedgerResult, RequestId};
use log::{info, warn};
use tokio::time::sleep;

use crate::config::AgentConfig;
use crate::navigator::Navigator;
use crate::state::{AgentPhase, SharedState};

/// Executes accepted requests one at a time: out to the pickup, across to
/// the dropoff, then home again, acknowledging each leg on the ledger.
///
/// Acknowledgements are best-effort. The simulated physical run is
/// authoritative, so a refused or unreachable ledger call is logged and the
/// flow moves on to the next phase.
#[derive(Clone)]
pub struct DeliveryExecutor {
    ledger: Arc<dyn LedgerClient>,
    state: SharedState,
    speed_mph: f64,
    dwell: Duration,
}

impl DeliveryExecutor {
    pub fn new(
        config: &AgentConfig,
        ledger: Arc<dyn LedgerClient>,
        state: SharedState,
    ) -> Self {
        Self {
            ledger,
            state,
            speed_mph: config.speed_mph,
            dwell: config.dwell(),
        }
    }

    /// Run `request` end to end. The proposal monitor guarantees this is
    /// never invoked twice for the same request, nor concurrently with
    /// itself.
    pub async fn deliver(&self, request: &DeliveryRequest) {
        let id = request.id;
        info!("executor: delivery {} accepted, leaving for pickup", id);
        self.state.begin_delivery().await;
        self.acknowledge(id, "start", self.ledger.acknowledge_start(id))
            .await;

        self.travel(request.pickup).await;
        self.acknowledge(id, "pickup", self.ledger.acknowledge_picked_up(id))
            .await;
        // Loading.
        sleep(self.dwell).await;

        self.state.set_phase(AgentPhase::ToDropoff).await;
        self.travel(request.dropoff).await;
        self.acknowledge(id, "drop", self.ledger.acknowledge_dropped(id))
            .await;
        // Unloading.
        sleep(self.dwell).await;

        self.state.set_phase(AgentPhase::Returning).await;
        let home = self.state.home().await;
        self.travel(home).await;
        self.acknowledge(id, "completion", self.ledger.acknowledge_completed(id))
            .await;

        self.state.finish_delivery().await;
        info!("executor: delivery {} complete, ready for new work", id);
    }

    /// Move the shared position to `target` step by step.
    async fn travel(&self, target: Coordinate) {
        let mut nav = Navigator::new(self.state.position().await, self.speed_mph);
        let state = self.state.clone();
        nav.move_to(target, move |pos| {
            let state = state.clone();
            async move { state.set_position(pos).await }
        })
        .await;
    }

    async fn acknowledge(
        &self,
        id: RequestId,
        leg: &str,
        call: impl Future<Output = LedgerResult<()>>,
    ) {
        if let Err(e) = call.await {
            warn!("executor: {} acknowledgement for {} failed: {}", leg, id, e);
        }
    }
}
