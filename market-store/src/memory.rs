//! In-memory store implementation.
//!
//! Used for testing and development without a database.
//! Thread-safe using RwLock for concurrent access; listings carry a
//! version counter so `save` behaves like a row-level compare-and-swap.

use crate::error::StoreError;
use crate::repository::{
    BidRepository, HistoryRepository, ListingRepository, Store, VersionedListing,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_domain::{
    Bid, BidId, HistoryEvent, Listing, ListingId, ListingStatus, PlayerId, TeamId,
};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory store for testing.
pub struct MemoryStore {
    listings: RwLock<HashMap<ListingId, StoredListing>>,
    bids: RwLock<HashMap<BidId, Bid>>,
    history: RwLock<Vec<StoredHistoryEvent>>,
    history_seq: AtomicI64,
}

/// Listing with its optimistic-concurrency version.
struct StoredListing {
    listing: Listing,
    version: u64,
}

/// History event with its global sequence number.
struct StoredHistoryEvent {
    seq: i64,
    event: HistoryEvent,
}

fn is_open(status: ListingStatus) -> bool {
    matches!(status, ListingStatus::Active | ListingStatus::BuyNowOnly)
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
            bids: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            history_seq: AtomicI64::new(0),
        }
    }

    /// Number of listings.
    pub fn listing_count(&self) -> usize {
        self.listings.read().unwrap().len()
    }

    /// Number of bids.
    pub fn bid_count(&self) -> usize {
        self.bids.read().unwrap().len()
    }

    /// Number of history events.
    pub fn history_count(&self) -> usize {
        self.history.read().unwrap().len()
    }

    /// Clear all data (useful for test setup).
    pub fn clear(&self) {
        self.listings.write().unwrap().clear();
        self.bids.write().unwrap().clear();
        self.history.write().unwrap().clear();
        self.history_seq.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Listing Repository Implementation
// =============================================================================

#[async_trait]
impl ListingRepository for MemoryStore {
    async fn create(&self, listing: &Listing) -> Result<(), StoreError> {
        let mut listings = self.listings.write().unwrap();

        if listings.contains_key(&listing.id) {
            return Err(StoreError::duplicate("listing", listing.id.to_string()));
        }

        // Exactly one open listing per player.
        let conflict = listings
            .values()
            .any(|s| s.listing.player_id == listing.player_id && is_open(s.listing.status));
        if conflict {
            return Err(StoreError::AlreadyListed { player_id: listing.player_id });
        }

        listings.insert(listing.id, StoredListing { listing: listing.clone(), version: 1 });
        Ok(())
    }

    async fn get(&self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        let listings = self.listings.read().unwrap();
        Ok(listings.get(&id).map(|s| s.listing.clone()))
    }

    async fn get_for_update(&self, id: ListingId) -> Result<VersionedListing, StoreError> {
        let listings = self.listings.read().unwrap();
        let stored = listings
            .get(&id)
            .ok_or_else(|| StoreError::not_found("listing", id.to_string()))?;
        Ok(VersionedListing { listing: stored.listing.clone(), version: stored.version })
    }

    async fn save(&self, versioned: VersionedListing) -> Result<(), StoreError> {
        let mut listings = self.listings.write().unwrap();
        let id = versioned.listing.id;
        let stored = listings
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("listing", id.to_string()))?;

        if stored.version != versioned.version {
            return Err(StoreError::ConcurrentModification {
                listing_id: id,
                expected_version: versioned.version,
                actual_version: stored.version,
            });
        }

        stored.listing = versioned.listing;
        stored.version += 1;
        Ok(())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().unwrap();
        Ok(listings
            .values()
            .filter(|s| s.listing.status == ListingStatus::Active && s.listing.expires_at <= now)
            .map(|s| s.listing.clone())
            .collect())
    }

    async fn find_active_by_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<Listing>, StoreError> {
        let listings = self.listings.read().unwrap();
        Ok(listings
            .values()
            .find(|s| s.listing.player_id == player_id && is_open(s.listing.status))
            .map(|s| s.listing.clone()))
    }

    async fn find_open(&self) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().unwrap();
        Ok(listings
            .values()
            .filter(|s| is_open(s.listing.status))
            .map(|s| s.listing.clone())
            .collect())
    }

    async fn find_auto_delist_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().unwrap();
        Ok(listings
            .values()
            .filter(|s| {
                s.listing.status == ListingStatus::BuyNowOnly
                    && s.listing.auto_delist_at.map(|at| at <= now).unwrap_or(false)
            })
            .map(|s| s.listing.clone())
            .collect())
    }
}

// =============================================================================
// Bid Repository Implementation
// =============================================================================

#[async_trait]
impl BidRepository for MemoryStore {
    async fn save(&self, bid: &Bid) -> Result<(), StoreError> {
        let mut bids = self.bids.write().unwrap();

        // At most one non-refunded winning bid per listing.
        if bid.is_winning && !bid.is_refunded {
            let other_winner = bids.values().any(|b| {
                b.listing_id == bid.listing_id
                    && b.id != bid.id
                    && b.is_winning
                    && !b.is_refunded
            });
            if other_winner {
                return Err(StoreError::duplicate("winning bid", bid.listing_id.to_string()));
            }
        }

        bids.insert(bid.id, bid.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: BidId) -> Result<Option<Bid>, StoreError> {
        let bids = self.bids.read().unwrap();
        Ok(bids.get(&id).cloned())
    }

    async fn find_by_listing(&self, listing_id: ListingId) -> Result<Vec<Bid>, StoreError> {
        let bids = self.bids.read().unwrap();
        let mut result: Vec<Bid> =
            bids.values().filter(|b| b.listing_id == listing_id).cloned().collect();
        result.sort_by_key(|b| b.placed_at);
        Ok(result)
    }

    async fn find_winning(&self, listing_id: ListingId) -> Result<Option<Bid>, StoreError> {
        let bids = self.bids.read().unwrap();
        Ok(bids
            .values()
            .find(|b| b.listing_id == listing_id && b.is_winning && !b.is_refunded)
            .cloned())
    }

    async fn find_winning_by_team(&self, team_id: TeamId) -> Result<Vec<Bid>, StoreError> {
        let bids = self.bids.read().unwrap();
        Ok(bids
            .values()
            .filter(|b| b.bidder_team_id == team_id && b.is_winning && !b.is_refunded)
            .cloned()
            .collect())
    }
}

// =============================================================================
// History Repository Implementation
// =============================================================================

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn append(&self, event: &HistoryEvent) -> Result<i64, StoreError> {
        let seq = self.history_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut history = self.history.write().unwrap();
        history.push(StoredHistoryEvent { seq, event: event.clone() });
        Ok(seq)
    }

    async fn find_by_listing(
        &self,
        listing_id: ListingId,
    ) -> Result<Vec<HistoryEvent>, StoreError> {
        let history = self.history.read().unwrap();
        // Vec push order can trail the issued sequence when appends race,
        // so order by seq rather than position.
        let mut matching: Vec<&StoredHistoryEvent> =
            history.iter().filter(|s| s.event.listing_id == listing_id).collect();
        matching.sort_by_key(|s| s.seq);
        Ok(matching.into_iter().map(|s| s.event.clone()).collect())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let history = self.history.read().unwrap();
        Ok(history.len() as i64)
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for MemoryStore {
    fn listings(&self) -> &dyn ListingRepository {
        self
    }

    fn bids(&self) -> &dyn BidRepository {
        self
    }

    fn history(&self) -> &dyn HistoryRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
