//! Harness for marketplace integration tests.

use chrono::Utc;
use market_domain::{AuctionRules, Credits, Listing, PlayerId, TeamId};
use market_engine::{AuctionEngine, AuctionError, ManualClock, StubRoster, StubValuation};
use market_ledger::{LedgerPort, MemoryLedger, TeamBalances};
use market_store::MemoryStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Credits helper for test literals.
pub fn credits(v: Decimal) -> Credits {
    Credits::new(v).expect("test amount must be non-negative")
}

/// A complete marketplace wired over in-memory components.
///
/// Tracks every seeded team so `assert_escrow_consistent` can sweep them
/// all after each operation under test.
pub struct TestMarket {
    pub engine: Arc<AuctionEngine>,
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<MemoryLedger>,
    pub roster: Arc<StubRoster>,
    pub valuation: Arc<StubValuation>,
    pub clock: Arc<ManualClock>,
    teams: Mutex<Vec<TeamId>>,
}

impl TestMarket {
    /// Market with the default rule set.
    pub fn new() -> Self {
        Self::with_rules(Self::default_rules())
    }

    /// Market with a custom rule set.
    pub fn with_rules(rules: AuctionRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let roster = Arc::new(StubRoster::new());
        let valuation = Arc::new(StubValuation::new(credits(dec!(500))));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = Arc::new(AuctionEngine::new(
            store.clone(),
            ledger.clone(),
            roster.clone(),
            valuation.clone(),
            clock.clone(),
            rules,
        ));
        Self { engine, store, ledger, roster, valuation, clock, teams: Mutex::new(Vec::new()) }
    }

    /// Default test rules: 100 increment, 5 minute snipe window and
    /// extension, 3 extensions, 3% fee, 5% tax.
    pub fn default_rules() -> AuctionRules {
        AuctionRules::default()
    }

    /// Create a team with the given starting credits.
    pub async fn seed_team(&self, amount: Decimal) -> TeamId {
        let team = Uuid::now_v7();
        self.ledger
            .credit(team, credits(amount))
            .await
            .expect("seeding a fresh team cannot fail");
        self.teams.lock().unwrap().push(team);
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
        self.ledger.balances(team).await.expect("seeded team must have an account")
    }

    /// Convenience wrapper: list a player for its owner.
    pub async fn list_player(
        &self,
        player: PlayerId,
        start_bid: Decimal,
        buy_now: Option<Decimal>,
        duration_hours: i64,
    ) -> Result<Listing, AuctionError> {
        let seller = self.roster.owner_of(player).expect("player must be assigned first");
        self.engine
            .create_listing(player, seller, credits(start_bid), buy_now.map(credits), duration_hours)
            .await
    }

    /// Run the escrow invariant check for every seeded team.
    pub async fn assert_escrow_consistent(&self) {
        let teams = self.teams.lock().unwrap().clone();
        for team in teams {
            self.engine
                .check_escrow_invariant(team)
                .await
                .expect("escrow invariant must hold");
        }
    }
}

impl Default for TestMarket {
    fn default() -> Self {
        Self::new()
    }
}
