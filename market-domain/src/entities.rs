//! Domain entities for the marketplace.
//!
//! Core business entities with lifecycle management.
//! All entities have identity and state transitions.

use crate::rules::AuctionRules;
use crate::value_objects::{Credits, DomainError, TaxRate};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for a Listing
pub type ListingId = Uuid;

/// Unique identifier for a Bid
pub type BidId = Uuid;

/// Unique identifier for a Team
pub type TeamId = Uuid;

/// Unique identifier for a Player
pub type PlayerId = Uuid;

// =============================================================================
// Listing Status
// =============================================================================

/// Listing lifecycle states.
///
/// Terminal states are `Sold`, `Expired`, and `Cancelled`; no transition
/// leaves them. `BuyNowOnly` is the off-season downgrade: bidding is
/// disabled, only buy-now or the auto-delist sweep can close it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Accepting bids and buy-now
    Active,
    /// Settled to a buyer or winning bidder
    Sold,
    /// Closed with no winning bid
    Expired,
    /// Withdrawn by the seller (or auto-delisted)
    Cancelled,
    /// Off-season: buy-now only, bidding disabled
    BuyNowOnly,
}

impl ListingStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingStatus::Sold | ListingStatus::Expired | ListingStatus::Cancelled)
    }

    /// Whether a legal transition exists from `self` to `next`.
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        use ListingStatus::*;
        matches!(
            (self, next),
            (Active, Sold)
                | (Active, Expired)
                | (Active, Cancelled)
                | (Active, BuyNowOnly)
                | (BuyNowOnly, Sold)
                | (BuyNowOnly, Cancelled)
        )
    }

    /// State name for display and logging.
    pub fn name(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
            ListingStatus::Expired => "expired",
            ListingStatus::Cancelled => "cancelled",
            ListingStatus::BuyNowOnly => "buy_now_only",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Listing
// =============================================================================

/// A player listed for sale on the marketplace.
///
/// Owned by the seller team until sale or cancellation. Mutated only by the
/// auction engine and the expiry sweeper, always inside the per-listing
/// critical section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Listing identifier
    pub id: ListingId,
    /// Player being sold (at most one open listing per player)
    pub player_id: PlayerId,
    /// Selling team
    pub seller_team_id: TeamId,
    /// Minimum first bid
    pub start_bid: Credits,
    /// Optional instant-purchase price
    pub buy_now_price: Option<Credits>,
    /// Server-computed buy-now floor, never client-supplied
    pub min_buy_now_price: Credits,
    /// Highest accepted bid so far
    pub current_bid: Option<Credits>,
    /// Team holding the highest bid
    pub current_high_bidder: Option<TeamId>,
    /// When the auction closes
    pub expires_at: DateTime<Utc>,
    /// Original close time, immutable after creation
    pub original_expires_at: DateTime<Utc>,
    /// Number of anti-snipe extensions applied
    pub extension_count: u32,
    /// Fee charged at creation, non-refundable
    pub listing_fee: Credits,
    /// Tax rate applied at sale
    pub tax_rate: TaxRate,
    /// Funds currently locked against this listing
    pub escrow_amount: Credits,
    /// Lifecycle state
    pub status: ListingStatus,
    /// Whether the off-season sweep converted this listing
    pub off_season_converted: bool,
    /// When a BuyNowOnly listing is force-cancelled
    pub auto_delist_at: Option<DateTime<Utc>>,

    /// Audit timestamps
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Create a new active listing.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` if the start bid is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player_id: PlayerId,
        seller_team_id: TeamId,
        start_bid: Credits,
        buy_now_price: Option<Credits>,
        min_buy_now_price: Credits,
        listing_fee: Credits,
        tax_rate: TaxRate,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if start_bid.is_zero() {
            return Err(DomainError::InvalidAmount("Start bid must be positive".to_string()));
        }
        let expires_at = now + duration;
        Ok(Self {
            id: Uuid::now_v7(),
            player_id,
            seller_team_id,
            start_bid,
            buy_now_price,
            min_buy_now_price,
            current_bid: None,
            current_high_bidder: None,
            expires_at,
            original_expires_at: expires_at,
            extension_count: 0,
            listing_fee,
            tax_rate,
            escrow_amount: Credits::zero(),
            status: ListingStatus::Active,
            off_season_converted: false,
            auto_delist_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether a bid has been recorded on this listing.
    pub fn has_bids(&self) -> bool {
        self.current_bid.is_some()
    }

    /// Whether the listing accepts bids at `now`.
    pub fn is_open_for_bids(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Active && now < self.expires_at
    }

    /// Whether `now` falls inside the anti-sniping window.
    pub fn in_snipe_window(&self, now: DateTime<Utc>, rules: &AuctionRules) -> bool {
        now >= self.expires_at - rules.snipe_window
    }

    /// Record a new high bid.
    ///
    /// Enforces that `current_bid` is monotonically non-decreasing for the
    /// life of the listing.
    pub fn record_high_bid(
        &mut self,
        bidder: TeamId,
        amount: Credits,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if let Some(current) = self.current_bid {
            if amount < current {
                return Err(DomainError::InvalidAmount(format!(
                    "Bid {} would lower the current bid {}",
                    amount, current
                )));
            }
        }
        self.current_bid = Some(amount);
        self.current_high_bidder = Some(bidder);
        self.escrow_amount = amount;
        self.updated_at = now;
        Ok(())
    }

    /// Apply one anti-snipe extension.
    ///
    /// Returns `true` if the extension was applied, `false` if the
    /// extension budget is exhausted. `expires_at` only ever moves forward.
    pub fn extend(&mut self, rules: &AuctionRules, now: DateTime<Utc>) -> bool {
        if self.extension_count >= rules.max_extensions {
            return false;
        }
        self.expires_at += rules.extension_increment;
        self.extension_count += 1;
        self.updated_at = now;
        true
    }

    fn transition_to(
        &mut self,
        next: ListingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition(format!(
                "{} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Settle the listing to a buyer or winning bidder.
    pub fn mark_sold(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.escrow_amount = Credits::zero();
        self.transition_to(ListingStatus::Sold, now)
    }

    /// Close the listing with no winner.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition_to(ListingStatus::Expired, now)
    }

    /// Withdraw the listing.
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition_to(ListingStatus::Cancelled, now)
    }

    /// Off-season downgrade: bidding disabled, buy-now stays available
    /// until `auto_delist_at`.
    pub fn convert_to_buy_now_only(
        &mut self,
        auto_delist_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition_to(ListingStatus::BuyNowOnly, now)?;
        self.off_season_converted = true;
        self.auto_delist_at = Some(auto_delist_at);
        self.current_bid = None;
        self.current_high_bidder = None;
        self.escrow_amount = Credits::zero();
        Ok(())
    }
}

// =============================================================================
// Bid
// =============================================================================

/// A bid with escrowed funds against a listing.
///
/// Bids are never deleted; superseded bids are flagged refunded so the
/// audit trail stays complete. At most one non-refunded bid per listing is
/// winning at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    /// Bid identifier
    pub id: BidId,
    /// Listing this bid targets
    pub listing_id: ListingId,
    /// Bidding team
    pub bidder_team_id: TeamId,
    /// Bid amount
    pub amount: Credits,
    /// Funds locked while the bid is outstanding (== amount)
    pub escrow_amount: Credits,
    /// Currently the highest non-refunded bid
    pub is_winning: bool,
    /// Escrow returned to the bidder
    pub is_refunded: bool,
    /// When the bid was accepted
    pub placed_at: DateTime<Utc>,
}

impl Bid {
    /// Create a new winning bid with its full amount in escrow.
    pub fn new(
        listing_id: ListingId,
        bidder_team_id: TeamId,
        amount: Credits,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            listing_id,
            bidder_team_id,
            amount,
            escrow_amount: amount,
            is_winning: true,
            is_refunded: false,
            placed_at: now,
        }
    }

    /// Mark the bid refunded after an outbid or off-season conversion.
    pub fn mark_refunded(&mut self) {
        self.is_winning = false;
        self.is_refunded = true;
        self.escrow_amount = Credits::zero();
    }

    /// Mark the bid settled: escrow was transferred to the seller.
    pub fn mark_settled(&mut self) {
        self.escrow_amount = Credits::zero();
    }
}

// =============================================================================
// Tests
// =============================================================================
