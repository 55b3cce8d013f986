//! Storage layer for the marketplace.
//!
//! Repository traits for listings, bids, and the append-only history log,
//! plus an in-memory implementation with optimistic-concurrency
//! versioning. The store is the only component allowed to mutate listing
//! records; the engine drives it through `get_for_update`/`save`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod repository;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use repository::{
    BidRepository, HistoryRepository, ListingRepository, Store, VersionedListing,
};
