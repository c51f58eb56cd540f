//! Funds balance used to simulate purchases.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::LedgerError;

/// Running funds balance. Debits never take it below zero.
///
/// The ledger only does arithmetic; [`crate::Catalog`] owns it and persists
/// after every successful movement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    funds: Decimal,
}

impl Ledger {
    /// Start from a known balance, e.g. the one read from disk.
    pub fn new(funds: Decimal) -> Self {
        Self { funds }
    }

    /// Current balance.
    pub fn funds(&self) -> Decimal {
        self.funds
    }

    /// Manual top-up.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        self.funds += amount;
        debug!(%amount, funds = %self.funds, "ledger credited");
        Ok(())
    }

    /// Take `amount` out of the balance, refusing when it is not covered.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        if self.funds < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: self.funds,
            });
        }
        self.funds -= amount;
        debug!(%amount, funds = %self.funds, "ledger debited");
        Ok(())
    }

    /// Give back the amount of an earlier purchase.
    pub fn refund(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        self.funds += amount;
        debug!(%amount, funds = %self.funds, "ledger refunded");
        Ok(())
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(LedgerError::NegativeAmount(amount))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn debit_requires_cover() {
        let mut ledger = Ledger::new(dec(50));
        assert_eq!(ledger.debit(dec(20)), Ok(()));
        assert_eq!(ledger.funds(), dec(30));

        let err = ledger.debit(dec(31)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                needed: dec(31),
                available: dec(30)
            }
        );
        assert_eq!(ledger.funds(), dec(30));

        assert_eq!(ledger.debit(dec(30)), Ok(()));
        assert!(ledger.funds().is_zero());
    }

    #[test]
    fn balance_never_goes_negative() {
        let mut ledger = Ledger::default();
        let steps = [(true, 5), (false, 7), (false, 5), (true, 3), (false, 1), (false, 4)];
        for (is_credit, value) in steps {
            let before = ledger.funds();
            let result = if is_credit {
                ledger.credit(dec(value))
            } else {
                ledger.debit(dec(value))
            };
            match result {
                Ok(()) => assert!(ledger.funds() >= Decimal::ZERO),
                Err(_) => assert_eq!(ledger.funds(), before),
            }
        }
        assert_eq!(ledger.funds(), dec(2));
    }

    #[test]
    fn negative_amounts_are_rejected_everywhere() {
        let mut ledger = Ledger::new(dec(10));
        assert_eq!(ledger.credit(dec(-1)), Err(LedgerError::NegativeAmount(dec(-1))));
        assert_eq!(ledger.debit(dec(-1)), Err(LedgerError::NegativeAmount(dec(-1))));
        assert_eq!(ledger.refund(dec(-1)), Err(LedgerError::NegativeAmount(dec(-1))));
        assert_eq!(ledger.funds(), dec(10));
    }

    #[test]
    fn refund_is_unconditional() {
        let mut ledger = Ledger::default();
        ledger.refund(Decimal::new(1999, 2)).unwrap();
        assert_eq!(ledger.funds(), Decimal::new(1999, 2));
    }
}
