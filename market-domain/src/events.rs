//! History events for the marketplace.
//!
//! Append-only audit records created alongside every listing state
//! transition. Events are immutable once recorded and never deleted.

use crate::entities::{ListingId, TeamId};
use crate::value_objects::Credits;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a HistoryEvent
pub type HistoryEventId = Uuid;

/// Lifecycle actions recorded in the listing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Listing created and fee charged
    ListingCreated,
    /// New high bid accepted, escrow locked
    BidPlaced,
    /// Previous high bid superseded and refunded
    BidOutbid,
    /// Anti-snipe extension applied
    AuctionExtended,
    /// Instant purchase at the buy-now price
    BuyNowPurchase,
    /// Listing settled to the buyer or winning bidder
    AuctionWon,
    /// Listing closed with no winning bid
    AuctionExpired,
    /// Seller withdrew the listing
    ListingCancelled,
    /// Off-season sweep downgraded the listing to buy-now only
    OffSeasonConverted,
    /// Auto-delist sweep cancelled a buy-now-only listing
    AutoDelisted,
}

impl HistoryAction {
    /// Action name for display and logging.
    pub fn name(&self) -> &'static str {
        match self {
            HistoryAction::ListingCreated => "listing_created",
            HistoryAction::BidPlaced => "bid_placed",
            HistoryAction::BidOutbid => "bid_outbid",
            HistoryAction::AuctionExtended => "auction_extended",
            HistoryAction::BuyNowPurchase => "buy_now_purchase",
            HistoryAction::AuctionWon => "auction_won",
            HistoryAction::AuctionExpired => "auction_expired",
            HistoryAction::ListingCancelled => "listing_cancelled",
            HistoryAction::OffSeasonConverted => "off_season_converted",
            HistoryAction::AutoDelisted => "auto_delisted",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One audit record in a listing's history.
///
/// `team_id` is `None` for system-triggered actions (sweeper, season
/// transitions). `old_value`/`new_value` carry the changed quantity for
/// actions like extensions (expiry timestamps as epoch seconds) and
/// outbids (bid amounts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Event identifier
    pub id: HistoryEventId,
    /// Listing this event belongs to
    pub listing_id: ListingId,
    /// What happened
    pub action: HistoryAction,
    /// Acting team, `None` when system-triggered
    pub team_id: Option<TeamId>,
    /// Amount involved, if any
    pub amount: Option<Credits>,
    /// Previous value for value-change actions
    pub old_value: Option<Decimal>,
    /// New value for value-change actions
    pub new_value: Option<Decimal>,
    /// Free-form context
    pub description: Option<String>,
    /// When the event was recorded
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEvent {
    /// Create a new event for a listing.
    pub fn new(listing_id: ListingId, action: HistoryAction) -> Self {
        Self {
            id: Uuid::now_v7(),
            listing_id,
            action,
            team_id: None,
            amount: None,
            old_value: None,
            new_value: None,
            description: None,
            recorded_at: Utc::now(),
        }
    }

    /// Attach the acting team.
    pub fn with_team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Attach the amount involved.
    pub fn with_amount(mut self, amount: Credits) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attach an old/new value pair.
    pub fn with_change(mut self, old_value: Decimal, new_value: Decimal) -> Self {
        self.old_value = Some(old_value);
        self.new_value = Some(new_value);
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
