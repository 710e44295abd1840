//! cmn: run a courier agent against a local in-memory marketplace.
//!
//! The production ledger transport lives outside this workspace; the
//! `simulate` command stands the whole engine up against the in-memory
//! ledger, playing the requester side itself, so an operator can watch a
//! device work a marketplace end to end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use cmn_types::ledger::memory::MemoryLedger;
use cmn_types::{Coordinate, RequestStatus};
use courier_mesh::{AgentConfig, CourierAgent};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent against a seeded in-memory marketplace until Ctrl-C
    Simulate {
        /// Path to the agent config file (defaults to $COURIER_CONFIG,
        /// then ~/.cmn/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of demo delivery requests to seed around the home
        /// position
        #[arg(short = 'n', long, default_value_t = 3)]
        requests: u32,
    },

    /// Load and validate a config file, printing the resolved settings
    #[command(name = "check-config")]
    CheckConfig {
        /// Path to the agent config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { config, requests } => simulate(config, requests).await,
        Commands::CheckConfig { config } => check_config(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AgentConfig> {
    // Configuration problems are fatal before any loop starts.
    AgentConfig::load(path.as_deref()).context("loading agent configuration")
}

fn check_config(path: Option<PathBuf>) -> Result<()> {
    let config = load_config(path)?;
    println!("{:#?}", config);
    println!("resolved home position: {}", config.home());
    Ok(())
}

async fn simulate(path: Option<PathBuf>, requests: u32) -> Result<()> {
    let config = load_config(path)?;
    let ledger = Arc::new(MemoryLedger::new(config.agent()));

    seed_requests(&ledger, config.home(), requests).await;

    let agent = CourierAgent::new(config, ledger.clone());
    agent.start().await;

    // Play the marketplace: accept whatever the agent proposes.
    let marketplace = ledger.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3)).await;
            for request in marketplace.requests().await {
                if request.status == RequestStatus::Proposed
                    && marketplace.accept_proposal(request.id).await.is_ok()
                {
                    info!(
                        "marketplace: accepted proposal {} from {}",
                        request.id,
                        request.assigned_agent.as_ref().map(|a| a.as_str()).unwrap_or("?")
                    );
                }
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    agent.stop().await;

    for request in ledger.requests().await {
        info!(
            "request {} finished as {:?} (proposed price {:?})",
            request.id, request.status, request.proposed_price
        );
    }
    Ok(())
}

/// Scatter demo requests around `home`, each a short hop away.
async fn seed_requests(ledger: &MemoryLedger, home: Coordinate, count: u32) {
    for i in 0..count {
        let offset = (i as f64 + 1.0) * 0.004;
        let pickup =
            Coordinate::from_degrees(home.lat_degrees() + offset, home.lon_degrees() - offset);
        let dropoff =
            Coordinate::from_degrees(home.lat_degrees() - offset, home.lon_degrees() + offset);
        let id = ledger
            .create_request(pickup, dropoff, cmn_types::price::tokens(1), None)
            .await;
        info!("marketplace: seeded request {} ({} -> {})", id, pickup, dropoff);
    }
}
