//! Ledger port and in-memory implementation.
//!
//! Thread-safe with a mutex per team account: a team may be outbid on one
//! listing while winning another, so refunds and locks for the same team
//! can race. Taking the per-team mutex for every balance mutation rules
//! out lost updates without involving the per-listing critical section.

use crate::error::LedgerError;
use async_trait::async_trait;
use market_domain::{Credits, TaxRate, TeamId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

// =============================================================================
// Balances
// =============================================================================

/// A team's ledger balances.
///
/// Gems mirror the external team ledger shape; the auction engine only
/// moves credits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamBalances {
    /// Spendable credits
    pub credits: Credits,
    /// Credits locked against outstanding bids
    pub escrow_credits: Credits,
    /// Spendable gems
    pub gems: Credits,
    /// Gems locked in escrow
    pub escrow_gems: Credits,
}

impl TeamBalances {
    /// Empty account.
    pub fn zero() -> Self {
        Self {
            credits: Credits::zero(),
            escrow_credits: Credits::zero(),
            gems: Credits::zero(),
            escrow_gems: Credits::zero(),
        }
    }
}

// =============================================================================
// Ledger Port
// =============================================================================

/// Port for team balance mutations.
///
/// Every operation is atomic per team. The `transfer` primitive spans two
/// teams and is atomic across both.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Get a snapshot of a team's balances.
    async fn balances(&self, team: TeamId) -> Result<TeamBalances, LedgerError>;

    /// Move `amount` from available credits to escrow.
    ///
    /// # Errors
    /// `InsufficientFunds` if available < amount.
    async fn lock(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError>;

    /// Reverse a lock: move `amount` from escrow back to available.
    ///
    /// # Errors
    /// `InsufficientEscrow` if escrow < amount.
    async fn release(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError>;

    /// Settle a sale: remove `amount` from the payer's escrow and credit
    /// `amount * (1 - tax_rate)` to the payee's available balance. The tax
    /// remainder is burned, modelling the marketplace sink.
    async fn transfer(
        &self,
        from_escrow: TeamId,
        to_team: TeamId,
        amount: Credits,
        tax_rate: TaxRate,
    ) -> Result<(), LedgerError>;

    /// Burn `amount` from available credits (listing fee sink).
    async fn debit(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError>;

    /// Add `amount` to available credits. Creates the account if missing.
    async fn credit(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError>;
}

// =============================================================================
// In-memory ledger
// =============================================================================

/// In-memory ledger for testing and development.
pub struct MemoryLedger {
    accounts: RwLock<HashMap<TeamId, Arc<Mutex<TeamBalances>>>>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self { accounts: RwLock::new(HashMap::new()) }
    }

    /// Number of known accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.read().unwrap().len()
    }

    fn account(&self, team: TeamId) -> Result<Arc<Mutex<TeamBalances>>, LedgerError> {
        let accounts = self.accounts.read().unwrap();
        accounts.get(&team).cloned().ok_or(LedgerError::UnknownTeam(team))
    }

    fn account_or_create(&self, team: TeamId) -> Arc<Mutex<TeamBalances>> {
        let mut accounts = self.accounts.write().unwrap();
        accounts.entry(team).or_insert_with(|| Arc::new(Mutex::new(TeamBalances::zero()))).clone()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerPort for MemoryLedger {
    async fn balances(&self, team: TeamId) -> Result<TeamBalances, LedgerError> {
        let account = self.account(team)?;
        let balances = account.lock().unwrap();
        Ok(balances.clone())
    }

    async fn lock(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError> {
        let account = self.account(team)?;
        let mut balances = account.lock().unwrap();

        let remaining = balances.credits.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientFunds {
                team,
                required: amount,
                available: balances.credits,
            }
        })?;

        balances.credits = remaining;
        balances.escrow_credits = balances.escrow_credits.saturating_add(amount);

        tracing::debug!(%team, %amount, "Locked credits into escrow");
        Ok(())
    }

    async fn release(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError> {
        let account = self.account(team)?;
        let mut balances = account.lock().unwrap();

        let remaining = balances.escrow_credits.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientEscrow {
                team,
                required: amount,
                escrowed: balances.escrow_credits,
            }
        })?;

        balances.escrow_credits = remaining;
        balances.credits = balances.credits.saturating_add(amount);

        tracing::debug!(%team, %amount, "Released escrow back to available");
        Ok(())
    }

    async fn transfer(
        &self,
        from_escrow: TeamId,
        to_team: TeamId,
        amount: Credits,
        tax_rate: TaxRate,
    ) -> Result<(), LedgerError> {
        let payer = self.account(from_escrow)?;
        let payee = self.account(to_team)?;
        let net = tax_rate.applied_to(amount);

        // Same-team settlement would double-lock the account mutex.
        if from_escrow == to_team {
            let mut balances = payer.lock().unwrap();
            let remaining = balances.escrow_credits.checked_sub(amount).ok_or_else(|| {
                LedgerError::InsufficientEscrow {
                    team: from_escrow,
                    required: amount,
                    escrowed: balances.escrow_credits,
                }
            })?;
            balances.escrow_credits = remaining;
            balances.credits = balances.credits.saturating_add(net);
            return Ok(());
        }

        // Take both account locks ordered by team id to avoid deadlock
        // when two transfers involve the same pair in opposite directions.
        let (mut payer_balances, mut payee_balances) = if from_escrow <= to_team {
            let a = payer.lock().unwrap();
            let b = payee.lock().unwrap();
            (a, b)
        } else {
            let b = payee.lock().unwrap();
            let a = payer.lock().unwrap();
            (a, b)
        };

        let remaining = payer_balances.escrow_credits.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientEscrow {
                team: from_escrow,
                required: amount,
                escrowed: payer_balances.escrow_credits,
            }
        })?;

        payer_balances.escrow_credits = remaining;
        payee_balances.credits = payee_balances.credits.saturating_add(net);

        tracing::debug!(
            payer = %from_escrow,
            payee = %to_team,
            %amount,
            %net,
            "Transferred escrow to seller net of tax"
        );
        Ok(())
    }

    async fn debit(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError> {
        let account = self.account(team)?;
        let mut balances = account.lock().unwrap();

        let remaining = balances.credits.checked_sub(amount).ok_or_else(|| {
            LedgerError::InsufficientFunds {
                team,
                required: amount,
                available: balances.credits,
            }
        })?;

        balances.credits = remaining;

        tracing::debug!(%team, %amount, "Debited credits");
        Ok(())
    }

    async fn credit(&self, team: TeamId, amount: Credits) -> Result<(), LedgerError> {
        let account = self.account_or_create(team);
        let mut balances = account.lock().unwrap();
        balances.credits = balances.credits.saturating_add(amount);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
