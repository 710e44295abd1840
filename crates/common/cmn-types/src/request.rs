use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::coord::Coordinate;
use crate::price::TokenAmount;

/// Ledger storage index of a delivery request.
pub type RequestId = u64;

/// Opaque marketplace account reference for an agent or requester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Raised when a wire ordinal does not map to a known status.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown request status ordinal: {0}")]
pub struct UnknownStatus(pub u8);

/// Lifecycle status of a delivery request on the ledger.
///
/// The discriminants are the wire ordinals and must not be reordered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Posted and open for proposals
    Open = 0,
    /// An agent has proposed to serve the request
    Proposed = 1,
    /// The requester accepted a proposal
    Accepted = 2,
    /// The assigned agent is en route to the pickup point
    Started = 3,
    /// Package collected
    PickedUp = 4,
    /// Package delivered to the dropoff point
    Dropped = 5,
    /// Delivery cycle finished
    Completed = 6,
    /// Withdrawn by the requester
    Cancelled = 7,
}

impl RequestStatus {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Whether the request can never progress again.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl TryFrom<u8> for RequestStatus {
    type Error = UnknownStatus;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(RequestStatus::Open),
            1 => Ok(RequestStatus::Proposed),
            2 => Ok(RequestStatus::Accepted),
            3 => Ok(RequestStatus::Started),
            4 => Ok(RequestStatus::PickedUp),
            5 => Ok(RequestStatus::Dropped),
            6 => Ok(RequestStatus::Completed),
            7 => Ok(RequestStatus::Cancelled),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// A delivery job as recorded on the marketplace ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRequest {
    /// Ledger index
    pub id: RequestId,
    /// Account that posted the request
    pub requester: AgentId,
    /// Where the package waits
    pub pickup: Coordinate,
    /// Where the package goes
    pub dropoff: Coordinate,
    /// Price posted by the requester
    pub base_price: TokenAmount,
    /// Price proposed by the bidding agent, if any
    pub proposed_price: Option<TokenAmount>,
    /// Agent currently proposing or assigned
    pub assigned_agent: Option<AgentId>,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub proposed_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    /// Agent given first claim on this request, if any
    pub targeted_agent: Option<AgentId>,
    /// End of the targeted agent's exclusivity window
    pub expires_at: Option<DateTime<Utc>>,
    /// Most the requester will pay for the delivery
    pub max_price: Option<TokenAmount>,
}
