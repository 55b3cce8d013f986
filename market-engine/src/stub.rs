//! Stub implementations for testing.
//!
//! These implementations simulate the roster service, player valuation,
//! and the season calendar without calling real game services.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use market_domain::{Credits, PlayerId, TeamId};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::AuctionError;
use crate::ports::{RosterPort, SeasonClock, SeasonPhase, ValuationPort};

// =============================================================================
// Stub Roster
// =============================================================================

/// Stub roster service for testing.
///
/// Ownership lives in a plain map; a team can be flagged so that any sale
/// from it trips the roster-minimum veto.
pub struct StubRoster {
    /// Current owner by player
    owners: RwLock<HashMap<PlayerId, TeamId>>,
    /// Teams whose sales violate a roster minimum
    veto_teams: RwLock<HashSet<TeamId>>,
    /// Completed transfers, oldest first
    transfers: RwLock<Vec<(PlayerId, TeamId)>>,
    /// Whether to simulate failures
    fail_next: RwLock<bool>,
    /// Artificial latency for ownership transfers
    transfer_delay: RwLock<Option<std::time::Duration>>,
}

impl StubRoster {
    /// Create an empty stub roster.
    pub fn new() -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
            veto_teams: RwLock::new(HashSet::new()),
            transfers: RwLock::new(Vec::new()),
            fail_next: RwLock::new(false),
            transfer_delay: RwLock::new(None),
        }
    }

    /// Register `team` as the owner of `player`.
    pub fn assign(&self, player: PlayerId, team: TeamId) {
        let mut owners = self.owners.write().unwrap();
        owners.insert(player, team);
    }

    /// Current owner of `player`, if known.
    pub fn owner_of(&self, player: PlayerId) -> Option<TeamId> {
        let owners = self.owners.read().unwrap();
        owners.get(&player).copied()
    }

    /// Make every sale from `team` trip the roster-minimum veto.
    pub fn set_minimum_veto(&self, team: TeamId, veto: bool) {
        let mut veto_teams = self.veto_teams.write().unwrap();
        if veto {
            veto_teams.insert(team);
        } else {
            veto_teams.remove(&team);
        }
    }

    /// Transfers performed so far, oldest first.
    pub fn transfers(&self) -> Vec<(PlayerId, TeamId)> {
        self.transfers.read().unwrap().clone()
    }

    /// Make every ownership transfer sleep for `delay`, simulating a
    /// slow roster service.
    pub fn set_transfer_delay(&self, delay: std::time::Duration) {
        *self.transfer_delay.write().unwrap() = Some(delay);
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        let mut fail_next = self.fail_next.write().unwrap();
        *fail_next = fail;
    }

    /// Check if we should fail the next operation.
    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false; // Reset after check
        fail
    }
}

impl Default for StubRoster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RosterPort for StubRoster {
    async fn is_owned_by(&self, player: PlayerId, team: TeamId) -> Result<bool, AuctionError> {
        if self.should_fail() {
            return Err(AuctionError::Collaborator("Simulated roster failure".to_string()));
        }
        let owners = self.owners.read().unwrap();
        Ok(owners.get(&player) == Some(&team))
    }

    async fn would_violate_minimum(
        &self,
        team: TeamId,
        _player: PlayerId,
    ) -> Result<bool, AuctionError> {
        if self.should_fail() {
            return Err(AuctionError::Collaborator("Simulated roster failure".to_string()));
        }
        let veto_teams = self.veto_teams.read().unwrap();
        Ok(veto_teams.contains(&team))
    }

    async fn transfer_ownership(
        &self,
        player: PlayerId,
        to_team: TeamId,
    ) -> Result<(), AuctionError> {
        if self.should_fail() {
            return Err(AuctionError::Collaborator("Simulated roster failure".to_string()));
        }
        let delay = *self.transfer_delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut owners = self.owners.write().unwrap();
            owners.insert(player, to_team);
        }
        let mut transfers = self.transfers.write().unwrap();
        transfers.push((player, to_team));

        tracing::debug!(%player, %to_team, "Stub: ownership transferred");
        Ok(())
    }
}

// =============================================================================
// Stub Valuation
// =============================================================================

/// Stub valuation service for testing.
///
/// Per-player floors with a configurable default for unknown players.
pub struct StubValuation {
    /// Floors by player
    floors: RwLock<HashMap<PlayerId, Credits>>,
    /// Default floor for unknown players
    default_floor: Credits,
}

impl StubValuation {
    /// Create a stub with a default floor.
    pub fn new(default_floor: Credits) -> Self {
        Self { floors: RwLock::new(HashMap::new()), default_floor }
    }

    /// Set the floor for a specific player.
    pub fn set_floor(&self, player: PlayerId, floor: Credits) {
        let mut floors = self.floors.write().unwrap();
        floors.insert(player, floor);
    }
}

#[async_trait]
impl ValuationPort for StubValuation {
    async fn min_buy_now(&self, player: PlayerId) -> Result<Credits, AuctionError> {
        let floors = self.floors.read().unwrap();
        Ok(floors.get(&player).copied().unwrap_or(self.default_floor))
    }
}

// =============================================================================
// Manual Clock
// =============================================================================

/// Settable clock for testing expiry and season transitions.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
    phase: RwLock<SeasonPhase>,
    season_end: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock at `now`, in the regular season, with the season
    /// ending 90 days out.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
            phase: RwLock::new(SeasonPhase::Regular),
            season_end: RwLock::new(now + Duration::days(90)),
        }
    }

    /// Jump the clock to a specific time.
    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap();
        *now += by;
    }

    /// Switch season phase.
    pub fn set_phase(&self, phase: SeasonPhase) {
        *self.phase.write().unwrap() = phase;
    }

    /// Set the season end time.
    pub fn set_season_end(&self, at: DateTime<Utc>) {
        *self.season_end.write().unwrap() = at;
    }
}

impl SeasonClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }

    fn current_phase(&self) -> SeasonPhase {
        *self.phase.read().unwrap()
    }

    fn season_end(&self) -> DateTime<Utc> {
        *self.season_end.read().unwrap()
    }
}

// =============================================================================
// Tests
// =============================================================================
