//! Diff-encoded position/readiness reporting.

use std::sync::Arc;

use chrono::Utc;
use cmn_types::{LedgerClient, COORD_UNCHANGED, READY_UNCHANGED};
use log::{debug, warn};

use crate::state::SharedState;

/// Field values the ledger is known to have received.
#[derive(Debug, Clone, Copy)]
struct LastReported {
    lat: i64,
    lon: i64,
    ready: bool,
}

/// Periodically reports position and readiness, sending each field's real
/// value only when it differs from the last successfully reported one and
/// the reserved "unchanged" sentinel otherwise.
pub struct HeartbeatReporter {
    ledger: Arc<dyn LedgerClient>,
    state: SharedState,
    cache: Option<LastReported>,
}

impl HeartbeatReporter {
    pub fn new(ledger: Arc<dyn LedgerClient>, state: SharedState) -> Self {
        Self {
            ledger,
            state,
            cache: None,
        }
    }

    /// Send one report. The cache advances only on success, so after a
    /// failed send the next tick carries real values again.
    pub async fn tick(&mut self) {
        let snapshot = self.state.snapshot().await;
        let position = snapshot.position;
        let ready = snapshot.ready;

        let (lat, lon, ready_wire) = match self.cache {
            // First report ever carries everything.
            None => (position.lat, position.lon, ready as i8),
            Some(last) => (
                if position.lat != last.lat {
                    position.lat
                } else {
                    COORD_UNCHANGED
                },
                if position.lon != last.lon {
                    position.lon
                } else {
                    COORD_UNCHANGED
                },
                if ready != last.ready {
                    ready as i8
                } else {
                    READY_UNCHANGED
                },
            ),
        };

        match self
            .ledger
            .report_status(lat, lon, ready_wire, Utc::now())
            .await
        {
            Ok(()) => {
                debug!(
                    "heartbeat: reported position {} ready {}",
                    position, ready
                );
                self.cache = Some(LastReported {
                    lat: position.lat,
                    lon: position.lon,
                    ready,
                });
            }
            Err(e) => warn!("heartbeat: report failed, resending next tick: {}", e),
        }
    }
}
