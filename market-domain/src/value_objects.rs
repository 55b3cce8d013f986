//! Value objects for the marketplace domain.
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation and entity transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Credit amounts must be non-negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Tax rate must be in [0, 1)
    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(String),

    /// Listing duration must be positive
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Illegal listing state transition
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
}

// =============================================================================
// Credits
// =============================================================================

/// Credits represents a non-negative amount of marketplace currency.
///
/// # Invariants
/// - Must be >= 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Credits(Decimal);

impl Credits {
    /// Create a new Credits amount with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` if value < 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO {
            return Err(DomainError::InvalidAmount("Credits must be non-negative".to_string()));
        }
        Ok(Self(value))
    }

    /// Zero credits.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying Decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Check whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add two amounts, saturating at the maximum representable value.
    pub fn saturating_add(&self, other: Credits) -> Credits {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract, returning `None` on underflow.
    ///
    /// The ledger uses this to detect insufficient funds instead of ever
    /// holding a negative balance.
    pub fn checked_sub(&self, other: Credits) -> Option<Credits> {
        let result = self.0 - other.0;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Self(result))
        }
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TaxRate
// =============================================================================

/// TaxRate represents the marketplace sale tax, as a fraction.
///
/// # Invariants
/// - Must be in [0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Create a new TaxRate with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTaxRate` if value is outside [0, 1)
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO || value >= Decimal::ONE {
            return Err(DomainError::InvalidTaxRate("Tax rate must be in [0, 1)".to_string()));
        }
        Ok(Self(value))
    }

    /// Zero tax.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying Decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Net amount the payee receives after tax.
    ///
    /// The tax remainder is burned by the ledger, not credited anywhere.
    pub fn applied_to(&self, gross: Credits) -> Credits {
        Credits(gross.as_decimal() * (Decimal::ONE - self.0))
    }

    /// The burned portion of a gross amount.
    pub fn burned_from(&self, gross: Credits) -> Credits {
        Credits(gross.as_decimal() * self.0)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
