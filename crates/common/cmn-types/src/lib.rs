//! cmn-types
//! Defines the data structures shared across the Courier Mesh Network
//! workspace: fixed-point coordinates, delivery requests, token amounts,
//! and the marketplace ledger interface consumed by device agents.

pub mod coord;
pub mod ledger;
pub mod price;
pub mod request;

// Re-export core types for easier access
pub use coord::{Coordinate, COORD_UNCHANGED, READY_UNCHANGED};
pub use ledger::{LedgerClient, LedgerError, LedgerResult};
pub use price::{TokenAmount, ATTO_PER_TOKEN};
pub use request::{AgentId, DeliveryRequest, RequestId, RequestStatus};
