//! Wire-level behavior of the diff-encoded status reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cmn_types::{
    AgentId, Coordinate, DeliveryRequest, LedgerClient, LedgerError, LedgerResult, RequestId,
    TokenAmount, COORD_UNCHANGED, READY_UNCHANGED,
};
use courier_mesh::{HeartbeatReporter, SharedState};

/// Ledger stub that records status reports and can be told to refuse them.
#[derive(Default)]
struct FlakyLedger {
    refuse_reports: AtomicBool,
    reports: Mutex<Vec<(i64, i64, i8)>>,
}

impl FlakyLedger {
    fn reports(&self) -> Vec<(i64, i64, i8)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for FlakyLedger {
    async fn list_open_requests(&self) -> LedgerResult<Vec<RequestId>> {
        Ok(Vec::new())
    }

    async fn list_targeted_requests(&self, _agent: &AgentId) -> LedgerResult<Vec<RequestId>> {
        Ok(Vec::new())
    }

    async fn get_request(&self, _id: RequestId) -> LedgerResult<DeliveryRequest> {
        Err(LedgerError::Rejected("not used".into()))
    }

    async fn submit_bid(&self, _id: RequestId, _price: TokenAmount) -> LedgerResult<()> {
        Ok(())
    }

    async fn acknowledge_start(&self, _id: RequestId) -> LedgerResult<()> {
        Ok(())
    }

    async fn acknowledge_picked_up(&self, _id: RequestId) -> LedgerResult<()> {
        Ok(())
    }

    async fn acknowledge_dropped(&self, _id: RequestId) -> LedgerResult<()> {
        Ok(())
    }

    async fn acknowledge_completed(&self, _id: RequestId) -> LedgerResult<()> {
        Ok(())
    }

    async fn report_status(
        &self,
        lat: i64,
        lon: i64,
        ready: i8,
        _at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if self.refuse_reports.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("radio silence".into()));
        }
        self.reports.lock().unwrap().push((lat, lon, ready));
        Ok(())
    }
}

fn home() -> Coordinate {
    Coordinate::from_degrees(52.5200000, 13.4050000)
}

fn fixture() -> (HeartbeatReporter, Arc<FlakyLedger>, SharedState) {
    let ledger = Arc::new(FlakyLedger::default());
    let state = SharedState::new(home());
    let reporter = HeartbeatReporter::new(ledger.clone(), state.clone());
    (reporter, ledger, state)
}

#[tokio::test]
async fn sentinel_encoding_across_consecutive_ticks() {
    let (mut reporter, ledger, state) = fixture();

    // Tick 1: everything real.
    reporter.tick().await;
    // Tick 2: nothing changed.
    reporter.tick().await;
    // Tick 3: only readiness changed.
    state.set_ready(false).await;
    reporter.tick().await;
    // Tick 4: only position changed.
    state
        .set_position(Coordinate::new(home().lat + 1_000, home().lon - 1_000))
        .await;
    reporter.tick().await;

    assert_eq!(
        ledger.reports(),
        vec![
            (home().lat, home().lon, 1),
            (COORD_UNCHANGED, COORD_UNCHANGED, READY_UNCHANGED),
            (COORD_UNCHANGED, COORD_UNCHANGED, 0),
            (home().lat + 1_000, home().lon - 1_000, READY_UNCHANGED),
        ]
    );
}

#[tokio::test]
async fn failed_send_keeps_the_cache_stale() {
    let (mut reporter, ledger, state) = fixture();

    reporter.tick().await;
    assert_eq!(ledger.reports().len(), 1);

    // The position changes but the report is lost in transit.
    state
        .set_position(Coordinate::new(home().lat + 7, home().lon))
        .await;
    ledger.refuse_reports.store(true, Ordering::SeqCst);
    reporter.tick().await;
    assert_eq!(ledger.reports().len(), 1);

    // Once the link is back, the real value goes out again rather than a
    // sentinel: the ledger never saw the lost report.
    ledger.refuse_reports.store(false, Ordering::SeqCst);
    reporter.tick().await;

    let reports = ledger.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1], (home().lat + 7, COORD_UNCHANGED, READY_UNCHANGED));
}

#[tokio::test]
async fn recovery_after_total_outage_resends_everything_changed() {
    let (mut reporter, ledger, state) = fixture();

    // The very first report already fails: the cache stays empty, so the
    // next successful tick behaves like a first report.
    ledger.refuse_reports.store(true, Ordering::SeqCst);
    reporter.tick().await;
    state.set_ready(false).await;

    ledger.refuse_reports.store(false, Ordering::SeqCst);
    reporter.tick().await;

    assert_eq!(ledger.reports(), vec![(home().lat, home().lon, 0)]);
}
