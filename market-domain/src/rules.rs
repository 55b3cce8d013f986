//! Auction rule set.
//!
//! All tunable marketplace parameters live here: bid increments, the
//! anti-sniping window, fee and tax rates, and the engine's concurrency
//! bounds. Constructed once at startup and shared by the engine and the
//! sweeper.

use crate::value_objects::{Credits, DomainError, TaxRate};
use chrono::Duration;
use rust_decimal::Decimal;

/// Marketplace auction rules.
#[derive(Debug, Clone)]
pub struct AuctionRules {
    /// Minimum amount a new bid must exceed the current bid by
    pub min_bid_increment: Credits,
    /// Trailing window before expiry in which a bid triggers an extension
    pub snipe_window: Duration,
    /// How much each anti-snipe extension pushes the expiry out
    pub extension_increment: Duration,
    /// Maximum number of anti-snipe extensions per listing
    pub max_extensions: u32,
    /// Listing fee as a fraction of the fee basis (non-refundable)
    pub listing_fee_rate: Decimal,
    /// Sale tax applied on settlement (burned, not redistributed)
    pub tax_rate: TaxRate,
    /// How long a caller may wait for a listing's critical section
    pub lock_timeout: std::time::Duration,
    /// Bounded retry count for optimistic-concurrency conflicts
    pub max_retries: u32,
}

impl AuctionRules {
    /// Listing fee for a given fee basis.
    ///
    /// The basis is the buy-now price when the listing has one, otherwise
    /// the start bid. Charged once at creation and never refunded.
    pub fn listing_fee(&self, basis: Credits) -> Credits {
        // Credits * non-negative rate cannot go negative
        Credits::new(basis.as_decimal() * self.listing_fee_rate)
            .unwrap_or_else(|_| Credits::zero())
    }

    /// Check that `candidate` is a legal raise over the current state.
    ///
    /// With no current bid, the candidate must meet the start bid.
    /// With a current bid, it must exceed it by at least the minimum
    /// increment.
    pub fn is_valid_raise(
        &self,
        start_bid: Credits,
        current_bid: Option<Credits>,
        candidate: Credits,
    ) -> bool {
        match current_bid {
            None => candidate >= start_bid,
            Some(current) => {
                candidate.as_decimal()
                    >= current.as_decimal() + self.min_bid_increment.as_decimal()
            },
        }
    }

    /// Smallest acceptable next bid, used in `BidTooLow` errors.
    pub fn minimum_raise(&self, start_bid: Credits, current_bid: Option<Credits>) -> Credits {
        match current_bid {
            None => start_bid,
            Some(current) => current.saturating_add(self.min_bid_increment),
        }
    }

    /// Validate a listing duration in hours.
    pub fn validate_duration(&self, duration_hours: i64) -> Result<Duration, DomainError> {
        if duration_hours <= 0 {
            return Err(DomainError::InvalidDuration(
                "Listing duration must be positive".to_string(),
            ));
        }
        Ok(Duration::hours(duration_hours))
    }
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            min_bid_increment: Credits::new(Decimal::new(100, 0)).expect("static value"),
            snipe_window: Duration::minutes(5),
            extension_increment: Duration::minutes(5),
            max_extensions: 3,
            listing_fee_rate: Decimal::new(3, 2), // 3%
            tax_rate: TaxRate::new(Decimal::new(5, 2)).expect("static value"), // 5%
            lock_timeout: std::time::Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
