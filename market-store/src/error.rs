//! Storage layer errors.

use market_domain::{ListingId, PlayerId};
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity} with id {id}")]
    NotFound {
        /// Type of entity (listing, bid)
        entity: String,
        /// Entity ID
        id: String,
    },

    /// The record changed since `get_for_update`
    #[error(
        "Concurrent modification of listing {listing_id}: \
         expected version {expected_version}, found {actual_version}"
    )]
    ConcurrentModification {
        /// Listing whose save was rejected
        listing_id: ListingId,
        /// Version the caller read
        expected_version: u64,
        /// Version currently stored
        actual_version: u64,
    },

    /// The player already has an open listing
    #[error("Player {player_id} already has an open listing")]
    AlreadyListed {
        /// Player with the existing listing
        player_id: PlayerId,
    },

    /// Duplicate entity (uniqueness violation)
    #[error("Duplicate entity: {entity} with id {id}")]
    Duplicate {
        /// Type of entity
        entity: String,
        /// Entity ID
        id: String,
    },
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into(), id: id.into() }
    }

    /// Create a duplicate error.
    pub fn duplicate(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate { entity: entity.into(), id: id.into() }
    }
}
