//! End-to-end delivery flow against the in-memory marketplace.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cmn_types::ledger::memory::MemoryLedger;
use cmn_types::{Coordinate, LedgerClient, RequestId, RequestStatus};
use courier_mesh::{AgentConfig, AgentPhase, CourierAgent, SharedState};
use tokio::time::{sleep, timeout};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_config() -> AgentConfig {
    AgentConfig {
        agent_id: "did:cmn:test-courier".into(),
        home_lat: 52.5200000,
        home_lon: 13.4050000,
        speed_mph: 30.0,
        max_trip_km: 20.0,
        rate_per_km: 1_000,
        scan_interval_secs: 1,
        proposal_interval_secs: 1,
        heartbeat_interval_secs: 2,
        dwell_secs: 1,
    }
}

fn near(home: Coordinate, d_lat: f64, d_lon: f64) -> Coordinate {
    Coordinate::from_degrees(
        home.lat_degrees() + d_lat,
        home.lon_degrees() + d_lon,
    )
}

async fn wait_for_status(
    ledger: &MemoryLedger,
    id: RequestId,
    status: RequestStatus,
    within: Duration,
) {
    timeout(within, async {
        loop {
            if ledger.get_request(id).await.unwrap().status == status {
                return;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("request {} never reached {:?}", id, status));
}

/// Poll the shared state and record every observed (phase, ready) change.
fn spawn_state_observer(state: SharedState) -> Arc<Mutex<Vec<(AgentPhase, bool)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let out = seen.clone();
    tokio::spawn(async move {
        let mut last = None;
        loop {
            let snapshot = state.snapshot().await;
            let current = (snapshot.phase, snapshot.ready);
            if Some(current) != last {
                out.lock().unwrap().push(current);
                last = Some(current);
            }
            sleep(Duration::from_millis(20)).await;
        }
    });
    seen
}

#[tokio::test(start_paused = true)]
async fn accepted_request_runs_the_full_phase_cycle() {
    init_logs();
    let config = test_config();
    let home = config.home();
    let ledger = Arc::new(MemoryLedger::new(config.agent()));
    let id = ledger
        .create_request(
            near(home, 0.004, -0.004),
            near(home, -0.004, 0.004),
            cmn_types::price::tokens(1),
            None,
        )
        .await;

    let agent = CourierAgent::new(config, ledger.clone());
    let observed = spawn_state_observer(agent.state());
    agent.start().await;

    wait_for_status(&ledger, id, RequestStatus::Proposed, Duration::from_secs(30)).await;
    ledger.accept_proposal(id).await.unwrap();
    wait_for_status(&ledger, id, RequestStatus::Completed, Duration::from_secs(3_600)).await;
    agent.stop().await;

    // Exact phase order, with readiness only at the bookending ready states.
    let observed = observed.lock().unwrap().clone();
    let phases: Vec<AgentPhase> = observed.iter().map(|(phase, _)| *phase).collect();
    assert_eq!(
        phases,
        vec![
            AgentPhase::Ready,
            AgentPhase::ToPickup,
            AgentPhase::ToDropoff,
            AgentPhase::Returning,
            AgentPhase::Ready,
        ]
    );
    for (phase, ready) in &observed {
        assert_eq!(*ready, *phase == AgentPhase::Ready, "ready during {:?}", phase);
    }

    // Acknowledgements arrived in leg order.
    assert_eq!(
        ledger.acks().await,
        vec![
            (id, RequestStatus::Started),
            (id, RequestStatus::PickedUp),
            (id, RequestStatus::Dropped),
            (id, RequestStatus::Completed),
        ]
    );

    // The delivery left no local tracking behind, and the agent is home.
    let state = agent.state();
    assert!(state.pending_bids().await.is_empty());
    assert!(state.ready().await);
    assert_eq!(state.position().await, home);

    // The proposed price matched distance at the configured rate and was
    // recorded on the ledger.
    let request = ledger.get_request(id).await.unwrap();
    assert!(request.proposed_price.is_some());
    assert!(request.accepted_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn two_accepted_requests_are_delivered_one_at_a_time() {
    init_logs();
    let config = test_config();
    let home = config.home();
    let ledger = Arc::new(MemoryLedger::new(config.agent()));
    let first = ledger
        .create_request(
            near(home, 0.003, 0.0),
            near(home, 0.003, 0.003),
            cmn_types::price::tokens(1),
            None,
        )
        .await;
    let second = ledger
        .create_request(
            near(home, -0.003, 0.0),
            near(home, -0.003, -0.003),
            cmn_types::price::tokens(1),
            None,
        )
        .await;

    let agent = CourierAgent::new(config, ledger.clone());
    agent.start().await;

    wait_for_status(&ledger, first, RequestStatus::Proposed, Duration::from_secs(30)).await;
    wait_for_status(&ledger, second, RequestStatus::Proposed, Duration::from_secs(30)).await;
    ledger.accept_proposal(first).await.unwrap();
    ledger.accept_proposal(second).await.unwrap();

    wait_for_status(&ledger, first, RequestStatus::Completed, Duration::from_secs(3_600)).await;
    wait_for_status(&ledger, second, RequestStatus::Completed, Duration::from_secs(3_600)).await;
    agent.stop().await;

    // One delivery ran to completion before the other began: the four
    // acknowledgements of each request are contiguous.
    let acks = ledger.acks().await;
    assert_eq!(acks.len(), 8);
    let first_block: Vec<_> = acks[..4].iter().map(|(id, _)| *id).collect();
    let second_block: Vec<_> = acks[4..].iter().map(|(id, _)| *id).collect();
    assert_eq!(first_block, vec![first_block[0]; 4]);
    assert_eq!(second_block, vec![second_block[0]; 4]);
    assert_ne!(first_block[0], second_block[0]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_request_is_forgotten_without_movement() {
    init_logs();
    let config = test_config();
    let home = config.home();
    let ledger = Arc::new(MemoryLedger::new(config.agent()));
    let id = ledger
        .create_request(
            near(home, 0.004, 0.0),
            near(home, 0.004, 0.004),
            cmn_types::price::tokens(1),
            None,
        )
        .await;

    let agent = CourierAgent::new(config, ledger.clone());
    agent.start().await;

    wait_for_status(&ledger, id, RequestStatus::Proposed, Duration::from_secs(30)).await;
    ledger.cancel_request(id).await.unwrap();

    // Give the monitor a few cycles to observe the cancellation.
    let state = agent.state();
    timeout(Duration::from_secs(30), async {
        while state.is_tracking(id).await {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("cancelled proposal never dropped");
    agent.stop().await;

    assert!(ledger.acks().await.is_empty());
    assert_eq!(state.position().await, home);
    assert!(state.ready().await);
}
