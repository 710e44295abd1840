//! The agent node: owns the shared state and runs the operation loops.

use std::sync::Arc;

use cmn_types::{AgentId, LedgerClient};
use log::info;
use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::config::AgentConfig;
use crate::executor::DeliveryExecutor;
use crate::heartbeat::HeartbeatReporter;
use crate::monitor::ProposalMonitor;
use crate::scanner::RequestScanner;
use crate::state::SharedState;

/// A courier device agent.
///
/// `start` spawns three periodic tasks over one shared state record: the
/// request scanner, the proposal monitor (which runs the delivery executor
/// inline when a proposal is accepted), and the heartbeat reporter. Each
/// task reschedules itself until `stop` clears the running flag; a cycle
/// that fails only logs and waits for its next interval.
pub struct CourierAgent {
    agent_id: AgentId,
    config: AgentConfig,
    ledger: Arc<dyn LedgerClient>,
    state: SharedState,
    running: Arc<RwLock<bool>>,
}

impl CourierAgent {
    pub fn new(config: AgentConfig, ledger: Arc<dyn LedgerClient>) -> Self {
        let state = SharedState::new(config.home());
        Self {
            agent_id: config.agent(),
            config,
            ledger,
            state,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Handle to the shared state record, for observers.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Spawn the operation loops. A second `start` on a running agent is a
    /// no-op.
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                return;
            }
            *running = true;
        }
        info!(
            "agent {}: starting at {}",
            self.agent_id,
            self.state.home().await
        );

        let scanner = RequestScanner::new(&self.config, self.ledger.clone(), self.state.clone());
        let running = self.running.clone();
        let interval = self.config.scan_interval();
        tokio::spawn(async move {
            while *running.read().await {
                scanner.tick().await;
                sleep(interval).await;
            }
        });

        let executor = DeliveryExecutor::new(&self.config, self.ledger.clone(), self.state.clone());
        let monitor = ProposalMonitor::new(
            &self.config,
            self.ledger.clone(),
            self.state.clone(),
            executor,
        );
        let running = self.running.clone();
        let interval = self.config.proposal_interval();
        tokio::spawn(async move {
            while *running.read().await {
                monitor.tick().await;
                sleep(interval).await;
            }
        });

        let mut heartbeat = HeartbeatReporter::new(self.ledger.clone(), self.state.clone());
        let running = self.running.clone();
        let interval = self.config.heartbeat_interval();
        tokio::spawn(async move {
            while *running.read().await {
                heartbeat.tick().await;
                sleep(interval).await;
            }
        });
    }

    /// Clear the running flag. Each loop exits after its current cycle, so
    /// shutdown latency is bounded by one poll interval plus any delivery
    /// in flight.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("agent {}: stopping", self.agent_id);
    }
}
