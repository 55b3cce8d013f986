//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use chrono::Utc;
use market_domain::{AuctionRules, Credits, PlayerId, TeamId};
use market_engine::{AuctionEngine, ManualClock, StubRoster, StubValuation};
use market_ledger::{LedgerPort, MemoryLedger, TeamBalances};
use market_store::MemoryStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Default valuation floor for players without an explicit one.
pub const DEFAULT_FLOOR: Decimal = dec!(500);

/// Engine wired over in-memory store, ledger, and stub collaborators.
pub struct Fixture {
    pub engine: Arc<AuctionEngine>,
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<MemoryLedger>,
    pub roster: Arc<StubRoster>,
    pub valuation: Arc<StubValuation>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_rules(AuctionRules::default())
    }

    pub fn with_rules(rules: AuctionRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let roster = Arc::new(StubRoster::new());
        let valuation = Arc::new(StubValuation::new(Credits::new(DEFAULT_FLOOR).unwrap()));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = Arc::new(AuctionEngine::new(
            store.clone(),
            ledger.clone(),
            roster.clone(),
            valuation.clone(),
            clock.clone(),
            rules,
        ));
        Self { engine, store, ledger, roster, valuation, clock }
    }

    /// Create a team with the given starting credits.
    pub async fn seed_team(&self, amount: Decimal) -> TeamId {
        let team = Uuid::now_v7();
        self.ledger.credit(team, Credits::new(amount).unwrap()).await.unwrap();
        team
    }

    /// Register a new player owned by `team`.
    pub fn give_player(&self, team: TeamId) -> PlayerId {
        let player = Uuid::now_v7();
        self.roster.assign(player, team);
        player
    }

    /// Snapshot a team's balances.
    pub async fn balances(&self, team: TeamId) -> TeamBalances {
        self.ledger.balances(team).await.unwrap()
    }

    /// Run the escrow invariant check for every given team.
    pub async fn assert_escrow_consistent(&self, teams: &[TeamId]) {
        for team in teams {
            self.engine.check_escrow_invariant(*team).await.unwrap();
        }
    }
}

/// Credits helper for test literals.
pub fn credits(v: Decimal) -> Credits {
    Credits::new(v).unwrap()
}
