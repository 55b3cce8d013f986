//! Repository trait definitions (ports).
//!
//! These traits define the storage interface for the marketplace.
//! Implementations can be SQL-backed, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_domain::{Bid, BidId, HistoryEvent, Listing, ListingId, PlayerId, TeamId};

/// A listing paired with the version observed at read time.
///
/// Returned by `get_for_update`; `save` only succeeds while the stored
/// version still matches, so a caller whose read went stale gets
/// `ConcurrentModification` instead of silently overwriting.
#[derive(Debug, Clone)]
pub struct VersionedListing {
    /// The listing snapshot
    pub listing: Listing,
    /// Version at read time
    pub version: u64,
}

/// Repository for Listing records.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Insert a new listing.
    ///
    /// # Errors
    /// `AlreadyListed` if the player already has an ACTIVE or
    /// BUY_NOW_ONLY listing.
    async fn create(&self, listing: &Listing) -> Result<(), StoreError>;

    /// Read a listing without taking a version token.
    async fn get(&self, id: ListingId) -> Result<Option<Listing>, StoreError>;

    /// Read a listing together with its current version for a subsequent
    /// compare-and-swap `save`.
    async fn get_for_update(&self, id: ListingId) -> Result<VersionedListing, StoreError>;

    /// Write back a listing read via `get_for_update`.
    ///
    /// # Errors
    /// `ConcurrentModification` if the stored version moved since the read.
    async fn save(&self, versioned: VersionedListing) -> Result<(), StoreError>;

    /// All ACTIVE listings whose expiry has passed.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, StoreError>;

    /// The open (ACTIVE or BUY_NOW_ONLY) listing for a player, if any.
    async fn find_active_by_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<Listing>, StoreError>;

    /// All open listings (ACTIVE and BUY_NOW_ONLY).
    async fn find_open(&self) -> Result<Vec<Listing>, StoreError>;

    /// BUY_NOW_ONLY listings whose auto-delist time has passed.
    async fn find_auto_delist_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Listing>, StoreError>;
}

/// Repository for Bid records.
///
/// Bids are never deleted; refunds flip flags so the audit trail survives.
#[async_trait]
pub trait BidRepository: Send + Sync {
    /// Insert or update a bid.
    ///
    /// # Errors
    /// `Duplicate` if inserting a winning bid while the listing already
    /// has a different non-refunded winning bid.
    async fn save(&self, bid: &Bid) -> Result<(), StoreError>;

    /// Find a bid by ID.
    async fn find_by_id(&self, id: BidId) -> Result<Option<Bid>, StoreError>;

    /// All bids for a listing, ordered by placement time.
    async fn find_by_listing(&self, listing_id: ListingId) -> Result<Vec<Bid>, StoreError>;

    /// The winning non-refunded bid for a listing, if any.
    async fn find_winning(&self, listing_id: ListingId) -> Result<Option<Bid>, StoreError>;

    /// All winning non-refunded bids placed by a team, across listings.
    /// Used for escrow reconciliation.
    async fn find_winning_by_team(&self, team_id: TeamId) -> Result<Vec<Bid>, StoreError>;
}

/// Repository for history events (append-only).
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append an event, returning its global sequence number.
    async fn append(&self, event: &HistoryEvent) -> Result<i64, StoreError>;

    /// All events for a listing, in append order.
    async fn find_by_listing(
        &self,
        listing_id: ListingId,
    ) -> Result<Vec<HistoryEvent>, StoreError>;

    /// Total number of recorded events.
    async fn count(&self) -> Result<i64, StoreError>;
}

/// Combined store interface.
pub trait Store: Send + Sync {
    /// Get the listing repository.
    fn listings(&self) -> &dyn ListingRepository;

    /// Get the bid repository.
    fn bids(&self) -> &dyn BidRepository;

    /// Get the history repository.
    fn history(&self) -> &dyn HistoryRepository;
}
