//! Custody conservation invariant checker.
//!
//! Invariant enforced by [`crate::EscrowSettlement::verify_custody`]:
//! ```text
//! custody == Σ(active escrow amounts) + Σ(in-flight payouts) + Σ(unsettled payouts)
//! ```
//!
//! An escrow leaves the active total the moment its state commits, before
//! its payout is attempted. A payout that succeeds leaves custody; one that
//! fails stays in custody as unsettled until reconciled off-ledger.

use acp_types::{AcpError, Result};
use rust_decimal::Decimal;

/// Running totals of value the ledger believes is in custody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustodyConservation {
    /// Σ amounts of ACTIVE escrows.
    locked: Decimal,
    /// Σ amounts committed terminal whose payout has not returned yet.
    in_flight: Decimal,
    /// Σ amounts committed terminal whose payout failed.
    unsettled: Decimal,
}

impl CustodyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An escrow opened with `amount`.
    pub fn record_lock(&mut self, amount: Decimal) {
        self.locked += amount;
    }

    /// An escrow committed to a terminal state; its payout is next.
    pub fn record_commit(&mut self, amount: Decimal) {
        self.locked -= amount;
        self.in_flight += amount;
    }

    /// The payout left custody.
    pub fn record_payout(&mut self, amount: Decimal) {
        self.in_flight -= amount;
    }

    /// The payout failed; the value is stranded in custody.
    pub fn record_unsettled(&mut self, amount: Decimal) {
        self.in_flight -= amount;
        self.unsettled += amount;
    }

    #[must_use]
    pub fn locked(&self) -> Decimal {
        self.locked
    }

    #[must_use]
    pub fn unsettled(&self) -> Decimal {
        self.unsettled
    }

    /// Expected custody: locked + in-flight + unsettled.
    #[must_use]
    pub fn expected_custody(&self) -> Decimal {
        self.locked + self.in_flight + self.unsettled
    }

    /// Verify that the actual custody balance matches the ledger.
    ///
    /// # Errors
    /// Returns [`AcpError::CustodyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_custody: Decimal) -> Result<()> {
        let expected = self.expected_custody();
        if actual_custody != expected {
            return Err(AcpError::CustodyInvariantViolation {
                reason: format!(
                    "actual custody {actual_custody} != expected {expected} \
                     (locked={}, in_flight={}, unsettled={})",
                    self.locked, self.in_flight, self.unsettled
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_conserved() {
        let c = CustodyConservation::new();
        assert!(c.verify(Decimal::ZERO).is_ok());
    }

    #[test]
    fn lock_commit_payout_cycle() {
        let mut c = CustodyConservation::new();
        c.record_lock(Decimal::new(5, 3));
        assert!(c.verify(Decimal::new(5, 3)).is_ok());

        c.record_commit(Decimal::new(5, 3));
        assert_eq!(c.locked(), Decimal::ZERO);
        assert!(c.verify(Decimal::new(5, 3)).is_ok(), "in-flight still in custody");

        c.record_payout(Decimal::new(5, 3));
        assert!(c.verify(Decimal::ZERO).is_ok());
    }

    #[test]
    fn unsettled_stays_in_custody() {
        let mut c = CustodyConservation::new();
        c.record_lock(Decimal::ONE);
        c.record_commit(Decimal::ONE);
        c.record_unsettled(Decimal::ONE);
        assert_eq!(c.unsettled(), Decimal::ONE);
        assert!(c.verify(Decimal::ONE).is_ok());
        assert!(c.verify(Decimal::ZERO).is_err());
    }

    #[test]
    fn violation_detected() {
        let mut c = CustodyConservation::new();
        c.record_lock(Decimal::new(100, 0));

        let err = c.verify(Decimal::new(99, 0)).unwrap_err();
        assert!(
            matches!(err, AcpError::CustodyInvariantViolation { .. }),
            "Expected CustodyInvariantViolation, got: {err:?}"
        );
        assert!(format!("{err}").contains("ACP_ERR_301"));
    }
}
