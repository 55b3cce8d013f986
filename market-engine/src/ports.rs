//! Engine port definitions.
//!
//! Ports define the interfaces for the external collaborators the engine
//! consults: team rosters, player valuation, and the season calendar.
//! Adapters implement these ports for the real game services; the stubs
//! in `stub.rs` implement them for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_domain::{Credits, PlayerId, TeamId};

use crate::error::AuctionError;

// =============================================================================
// Roster Port
// =============================================================================

/// Port for team roster queries and ownership transfer.
///
/// The engine checks ownership before listing, vetoes sales that would
/// leave a roster below its required minimum, and moves the player on
/// settlement.
#[async_trait]
pub trait RosterPort: Send + Sync {
    /// Whether `team` currently owns `player`.
    async fn is_owned_by(&self, player: PlayerId, team: TeamId) -> Result<bool, AuctionError>;

    /// Whether removing `player` would put `team` under a roster minimum
    /// (squad size, position coverage).
    async fn would_violate_minimum(
        &self,
        team: TeamId,
        player: PlayerId,
    ) -> Result<bool, AuctionError>;

    /// Move `player` to `to_team`. Called exactly once per settlement.
    async fn transfer_ownership(
        &self,
        player: PlayerId,
        to_team: TeamId,
    ) -> Result<(), AuctionError>;
}

// =============================================================================
// Valuation Port
// =============================================================================

/// Port for player valuation.
///
/// The floor is server-computed and never client-supplied; it bounds the
/// buy-now price a seller may set.
#[async_trait]
pub trait ValuationPort: Send + Sync {
    /// Minimum acceptable buy-now price for a player.
    async fn min_buy_now(&self, player: PlayerId) -> Result<Credits, AuctionError>;
}

// =============================================================================
// Season Clock
// =============================================================================

/// Phase of the game season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonPhase {
    /// Auctions run normally
    Regular,
    /// Bidding disabled; open auctions get converted
    OffSeason,
}

/// Clock and season calendar.
///
/// The engine never calls `Utc::now()` directly; all time comes through
/// this trait so tests can drive expiry and season transitions.
pub trait SeasonClock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current season phase.
    fn current_phase(&self) -> SeasonPhase;

    /// When the current season ends; converted listings auto-delist here.
    fn season_end(&self) -> DateTime<Utc>;
}
