//! Expiry sweeper: background close-out of finished auctions.
//!
//! A periodic task that finalizes expired listings, converts open
//! auctions when the season ends, and cancels buy-now-only listings past
//! their delist time. Every mutation goes through the engine, so the
//! sweeper shares the per-listing critical section with interactive
//! callers and can never race them.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use market_domain::{Listing, ListingId, ListingStatus};
use market_engine::{AuctionEngine, AuctionError, SeasonClock, SeasonPhase};
use market_store::Store;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SweepConfig;

/// Background sweeper over the auction engine.
pub struct ExpirySweeper {
    engine: Arc<AuctionEngine>,
    store: Arc<dyn Store>,
    clock: Arc<dyn SeasonClock>,
    config: SweepConfig,
    shutdown_token: CancellationToken,
    /// Phase seen on the previous pass, for edge detection. Starts as
    /// Regular so a daemon restarted mid off-season still converts
    /// whatever is left open.
    last_phase: Mutex<SeasonPhase>,
}

impl ExpirySweeper {
    /// Create a sweeper over the given engine and store.
    pub fn new(
        engine: Arc<AuctionEngine>,
        store: Arc<dyn Store>,
        clock: Arc<dyn SeasonClock>,
        config: SweepConfig,
    ) -> Self {
        Self {
            engine,
            store,
            clock,
            config,
            shutdown_token: CancellationToken::new(),
            last_phase: Mutex::new(SeasonPhase::Regular),
        }
    }

    /// Start the sweep loop in the background.
    ///
    /// Returns a JoinHandle that completes after `shutdown`.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(self.config.interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = self.config.interval_secs, "Expiry sweeper started");

            loop {
                tokio::select! {
                    _ = self.shutdown_token.cancelled() => {
                        info!("Expiry sweeper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                }
            }
        })
    }

    /// Request shutdown of the sweep loop.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// One full sweep pass. Public so tests can drive ticks directly.
    pub async fn sweep_once(&self) {
        self.finalize_expired_listings().await;
        self.convert_on_season_edge().await;
        self.auto_delist_due_listings().await;
    }

    fn listing_budget(&self) -> Duration {
        Duration::from_secs(self.config.listing_timeout_secs)
    }

    /// Drive one engine operation under the per-listing budget.
    ///
    /// The work runs as its own task and the budget bounds only how long
    /// this pass waits for it. An over-budget settlement is left running
    /// to completion in the background, never cancelled mid-unit.
    async fn drive(
        &self,
        listing_id: ListingId,
        label: &'static str,
        work: impl Future<Output = Result<Listing, AuctionError>> + Send + 'static,
    ) {
        let handle = tokio::spawn(work);
        match tokio::time::timeout(self.listing_budget(), handle).await {
            Ok(Ok(Ok(listing))) => {
                debug!(%listing_id, status = %listing.status, label, "Sweep operation finished")
            },
            Ok(Ok(Err(err))) => {
                warn!(%listing_id, error = %err, label, "Sweep operation failed")
            },
            Ok(Err(join_err)) => {
                warn!(%listing_id, error = %join_err, label, "Sweep operation panicked")
            },
            Err(_) => {
                warn!(%listing_id, label, "Sweep operation over budget, left to finish in background")
            },
        }
    }

    async fn finalize_expired_listings(&self) {
        let now = self.clock.now();
        let expired = match self.store.listings().find_expired(now).await {
            Ok(expired) => expired,
            Err(err) => {
                warn!(error = %err, "Failed to scan for expired listings");
                return;
            },
        };
        if expired.is_empty() {
            return;
        }
        debug!(count = expired.len(), "Finalizing expired listings");

        for listing in expired {
            let engine = self.engine.clone();
            self.drive(listing.id, "finalize", async move {
                engine.finalize_expired(listing.id).await
            })
            .await;
        }
    }

    async fn convert_on_season_edge(&self) {
        let phase = self.clock.current_phase();
        let previous = {
            let mut last = self.last_phase.lock().unwrap();
            std::mem::replace(&mut *last, phase)
        };
        if !(previous == SeasonPhase::Regular && phase == SeasonPhase::OffSeason) {
            return;
        }

        info!("Season ended, converting open auctions");
        let open = match self.store.listings().find_open().await {
            Ok(open) => open,
            Err(err) => {
                warn!(error = %err, "Failed to scan open listings for conversion");
                return;
            },
        };

        for listing in open.into_iter().filter(|l| l.status == ListingStatus::Active) {
            let engine = self.engine.clone();
            self.drive(listing.id, "convert", async move {
                engine.convert_off_season(listing.id).await
            })
            .await;
        }
    }

    async fn auto_delist_due_listings(&self) {
        let now = self.clock.now();
        let due = match self.store.listings().find_auto_delist_due(now).await {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "Failed to scan for auto-delist candidates");
                return;
            },
        };

        for listing in due {
            let engine = self.engine.clone();
            self.drive(listing.id, "auto_delist", async move {
                engine.auto_delist(listing.id).await
            })
            .await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
