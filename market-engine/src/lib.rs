//! Marketplace auction engine.
//!
//! Orchestrates the full listing lifecycle: creation, bidding with escrow
//! and anti-sniping, buy-now settlement, cancellation, expiry close, and
//! the off-season downgrade. State mutations serialize through a
//! per-listing critical section and an optimistic store write, so the
//! engine stays consistent under concurrent callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod ports;
pub mod recorder;
pub mod stub;

pub use engine::AuctionEngine;
pub use error::AuctionError;
pub use ports::{RosterPort, SeasonClock, SeasonPhase, ValuationPort};
pub use recorder::HistoryRecorder;
pub use stub::{ManualClock, StubRoster, StubValuation};
