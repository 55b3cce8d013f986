//! Marketplace Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains listing/bid entities, value objects, history events,
//! and the auction rule set.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entities;
pub mod events;
pub mod rules;
pub mod value_objects;

pub use entities::{Bid, BidId, Listing, ListingId, ListingStatus, PlayerId, TeamId};
pub use events::{HistoryAction, HistoryEvent, HistoryEventId};
pub use rules::AuctionRules;
pub use value_objects::{Credits, DomainError, TaxRate};
