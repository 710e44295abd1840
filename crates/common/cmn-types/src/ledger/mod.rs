//! Marketplace ledger interface.
//!
//! The transport and signing client behind this trait lives outside the
//! workspace; implementations normalize whatever shape the wire returns
//! into [`DeliveryRequest`] at this boundary, so call sites never see raw
//! responses.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::price::TokenAmount;
use crate::request::{AgentId, DeliveryRequest, RequestId};

/// Errors surfaced by marketplace ledger calls.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("call rejected by ledger: {0}")]
    Rejected(String),

    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// Standard result type for ledger operations.
pub type LedgerResult<T = ()> = Result<T, LedgerError>;

/// Marketplace ledger operations consumed by a device agent.
///
/// Bids and acknowledgements are submitted under the identity the client
/// was constructed with; the trait itself carries no signing material.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Identifiers of all requests currently open for proposals.
    async fn list_open_requests(&self) -> LedgerResult<Vec<RequestId>>;

    /// Identifiers of open requests targeted specifically at `agent`.
    async fn list_targeted_requests(&self, agent: &AgentId) -> LedgerResult<Vec<RequestId>>;

    /// Full record of one request.
    async fn get_request(&self, id: RequestId) -> LedgerResult<DeliveryRequest>;

    /// Propose to serve `id` at `price` atomic units.
    async fn submit_bid(&self, id: RequestId, price: TokenAmount) -> LedgerResult<()>;

    /// Confirm departure toward the pickup point.
    async fn acknowledge_start(&self, id: RequestId) -> LedgerResult<()>;

    /// Confirm the package was collected.
    async fn acknowledge_picked_up(&self, id: RequestId) -> LedgerResult<()>;

    /// Confirm the package was delivered.
    async fn acknowledge_dropped(&self, id: RequestId) -> LedgerResult<()>;

    /// Confirm the agent returned home and the cycle is finished.
    async fn acknowledge_completed(&self, id: RequestId) -> LedgerResult<()>;

    /// Report position and readiness. Fields carry either a real value or
    /// the corresponding "unchanged" sentinel
    /// ([`COORD_UNCHANGED`](crate::coord::COORD_UNCHANGED),
    /// [`READY_UNCHANGED`](crate::coord::READY_UNCHANGED)).
    async fn report_status(
        &self,
        lat: i64,
        lon: i64,
        ready: i8,
        at: DateTime<Utc>,
    ) -> LedgerResult<()>;
}
