//! Ledger layer errors.

use market_domain::{Credits, TeamId};
use thiserror::Error;

/// Errors that can occur in the escrow ledger.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Available balance cannot cover the requested amount
    #[error("Insufficient funds for team {team}: required {required}, available {available}")]
    InsufficientFunds {
        /// Team whose balance was checked
        team: TeamId,
        /// Amount requested
        required: Credits,
        /// Amount available
        available: Credits,
    },

    /// Escrowed balance cannot cover the requested release/transfer
    #[error("Insufficient escrow for team {team}: required {required}, escrowed {escrowed}")]
    InsufficientEscrow {
        /// Team whose escrow was checked
        team: TeamId,
        /// Amount requested
        required: Credits,
        /// Amount currently escrowed
        escrowed: Credits,
    },

    /// No account exists for the team
    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),
}
