//! Test fixtures and harness helpers for the marketplace.
//!
//! Bundles the engine with in-memory storage, an in-memory ledger, stub
//! collaborators, and a manual clock so integration tests can drive the
//! full auction lifecycle deterministically.

#![warn(clippy::all)]

pub mod helpers;

pub use helpers::{credits, TestMarket};
