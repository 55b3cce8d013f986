//! Escrow ledger for the marketplace.
//!
//! Holds each team's available vs. escrowed balances and exposes the
//! atomic debit/credit/lock/release/transfer primitives everything above
//! it builds on. All escrow math lives here so the "debit available /
//! credit escrow" pairing cannot be performed partially in one place and
//! differently elsewhere.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::{LedgerPort, MemoryLedger, TeamBalances};
