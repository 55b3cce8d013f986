//! Auction engine errors.
//!
//! Three families: validation errors are expected and carry enough
//! detail for a caller to correct the request; `Contention` is transient
//! and safe to retry; `InvariantViolation` is fatal, logged with full
//! detail but displayed generically.

use market_domain::{Credits, DomainError, ListingStatus};
use market_ledger::LedgerError;
use market_store::StoreError;
use thiserror::Error;

/// Errors surfaced by auction engine operations.
#[derive(Debug, Clone, Error)]
pub enum AuctionError {
    /// The bid does not meet the minimum acceptable amount
    #[error("Bid too low: minimum acceptable bid is {minimum}")]
    BidTooLow {
        /// Smallest bid the listing would accept
        minimum: Credits,
    },

    /// A seller tried to bid on or buy their own listing
    #[error("Sellers cannot bid on their own listing")]
    SelfBid,

    /// The team's available credits do not cover the amount
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needed
        required: Credits,
        /// Credits the team had available
        available: Credits,
    },

    /// The player already has an open listing
    #[error("Player already has an open listing")]
    AlreadyListed,

    /// Selling this player would break a roster requirement
    #[error("Roster constraint: {0}")]
    RosterConstraint(String),

    /// The caller does not own the player or listing
    #[error("Caller does not own this player or listing")]
    NotOwner,

    /// Cancellation blocked because a bid was placed
    #[error("Listing has received bids and cannot be cancelled")]
    BidsAlreadyPlaced,

    /// The buy-now price is under the server-computed floor
    #[error("Buy-now price is below the valuation floor of {floor}")]
    BuyNowBelowFloor {
        /// Minimum acceptable buy-now price
        floor: Credits,
    },

    /// The listing is not in a state that admits the operation
    #[error("Listing is not open: status is {status}")]
    ListingNotActive {
        /// Current listing status
        status: ListingStatus,
    },

    /// The auction has already passed its expiry
    #[error("Listing has expired")]
    ListingExpired,

    /// No listing with the given id
    #[error("Listing not found")]
    ListingNotFound,

    /// Buy-now attempted on a listing without a buy-now price
    #[error("Listing has no buy-now price")]
    NoBuyNowPrice,

    /// Lock timeout or optimistic retries exhausted; safe to retry
    #[error("Operation contended, try again")]
    Contention,

    /// Internal state inconsistency. Details go to the log, not the caller.
    #[error("Internal invariant violation")]
    InvariantViolation(String),

    /// Domain validation failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// External collaborator (roster, valuation) failure
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl AuctionError {
    /// Whether a caller may safely retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuctionError::Contention)
    }
}

impl From<StoreError> for AuctionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrentModification { .. } => AuctionError::Contention,
            StoreError::AlreadyListed { .. } => AuctionError::AlreadyListed,
            StoreError::NotFound { .. } => AuctionError::ListingNotFound,
            StoreError::Duplicate { .. } => AuctionError::InvariantViolation(err.to_string()),
        }
    }
}

impl From<LedgerError> for AuctionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { required, available, .. } => {
                AuctionError::InsufficientFunds { required, available }
            },
            // A team bidding without an account has zero available
            LedgerError::UnknownTeam(_) => AuctionError::InsufficientFunds {
                required: Credits::zero(),
                available: Credits::zero(),
            },
            LedgerError::InsufficientEscrow { .. } => {
                AuctionError::InvariantViolation(err.to_string())
            },
        }
    }
}
