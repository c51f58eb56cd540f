//! Error types raised by the core operations.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failure to turn a price string into a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Nothing numeric was left after stripping the currency marker.
    #[error("price is empty")]
    Empty,
    /// The text could not be read as a decimal amount.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
}

/// Failure of a funds movement. The balance is untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum LedgerError {
    #[error("amount {0} is negative")]
    NegativeAmount(Decimal),
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
}

/// Failure of a catalog operation. Collections are untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum CatalogError {
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CatalogError {
    /// True when the operation was refused because the ledger could not cover it.
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::InsufficientFunds { .. }))
    }
}
