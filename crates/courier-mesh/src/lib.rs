//! courier-mesh
//! The delivery operation engine running on a courier device.
//!
//! Four self-rescheduling loops share one agent state record: the request
//! scanner discovers and bids on marketplace work, the proposal monitor
//! watches outstanding bids and hands accepted ones to the delivery
//! executor, and the heartbeat reporter sends diff-encoded position and
//! readiness updates back to the ledger.

pub mod agent;
pub mod config;
pub mod executor;
pub mod geo;
pub mod heartbeat;
pub mod monitor;
pub mod navigator;
pub mod scanner;
pub mod state;

// Re-export key components
pub use agent::CourierAgent;
pub use config::{AgentConfig, ConfigError};
pub use executor::DeliveryExecutor;
pub use heartbeat::HeartbeatReporter;
pub use monitor::ProposalMonitor;
pub use navigator::Navigator;
pub use scanner::RequestScanner;
pub use state::{AgentPhase, AgentState, SharedState};
