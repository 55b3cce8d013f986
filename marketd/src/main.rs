//! Marketplace daemon.
//!
//! Runtime orchestrator for the auction engine and the expiry sweeper.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p marketd
//!
//! # Start with a custom sweep cadence
//! MARKET_ENV=test MARKET_SWEEP_INTERVAL_SECS=10 cargo run -p marketd
//! ```
//!
//! # Environment Variables
//!
//! - `MARKET_ENV`: Environment (test, development, production)
//! - `MARKET_SWEEP_INTERVAL_SECS`: Seconds between sweeps (default: 60)
//! - `MARKET_SWEEP_LISTING_TIMEOUT_SECS`: Per-listing budget (default: 10)
//! - `MARKET_MIN_BID_INCREMENT`: Minimum raise (default: 100)
//! - `MARKET_SNIPE_WINDOW_MINS`: Anti-snipe window (default: 5)
//! - `MARKET_EXTENSION_MINS`: Extension length (default: 5)
//! - `MARKET_MAX_EXTENSIONS`: Extension budget (default: 3)
//! - `MARKET_LISTING_FEE_RATE`: Listing fee fraction (default: 0.03)
//! - `MARKET_TAX_RATE`: Sale tax fraction (default: 0.05)
//! - `MARKET_SEASON_END`: Season end, RFC 3339 (default: 90 days out)

mod clock;
mod config;
mod error;
mod sweeper;

use std::sync::Arc;

use market_engine::{AuctionEngine, StubRoster, StubValuation};
use market_ledger::MemoryLedger;
use market_store::MemoryStore;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::clock::WallClock;
use crate::config::Config;
use crate::sweeper::ExpirySweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("marketd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        sweep_interval_secs = config.sweep.interval_secs,
        season_end = %config.season_end,
        "Marketplace daemon"
    );

    // In-memory storage and stub collaborators; real adapters plug in
    // behind the same ports.
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let roster = Arc::new(StubRoster::new());
    let valuation = Arc::new(StubValuation::new(market_domain::Credits::zero()));
    let wall_clock = Arc::new(WallClock::new(config.season_end));

    let engine = Arc::new(AuctionEngine::new(
        store.clone(),
        ledger,
        roster,
        valuation,
        wall_clock.clone(),
        config.rules.clone(),
    ));

    let sweeper = Arc::new(ExpirySweeper::new(
        engine,
        store,
        wall_clock,
        config.sweep.clone(),
    ));
    let sweep_handle = sweeper.clone().start();

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    sweeper.shutdown();
    sweep_handle.await?;

    info!("Marketplace daemon stopped");
    Ok(())
}
