//! Escrow settlement: open, release, refund.
//!
//! ## Authorization
//!
//! | Operation | Buyer                     | Provider | Anyone else    |
//! |-----------|---------------------------|----------|----------------|
//! | release   | yes                       | NotBuyer | NotBuyer       |
//! | refund    | only after the deadline   | any time | Unauthorized   |
//!
//! ## Settlement order
//!
//! Release and refund commit the terminal state (and the conservation
//! counters) under the state lock, drop the lock, and only then call
//! [`ValueTransfer::pay`]. A recipient that calls back into the ledger from
//! inside `pay` finds the escrow already terminal and hits the re-entrancy
//! guard first. A payout that fails leaves the escrow terminal and lands in
//! the unsettled ledger; it is never retried here.

use std::collections::HashMap;
use std::sync::Arc;

use acp_types::{
    AcpError, Address, CallContext, EscrowConfig, EscrowEvent, EscrowId, EscrowRecord,
    EscrowState, JobHash, ReentrancyGuard, Result,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::conservation::CustodyConservation;
use crate::custody::{TransferError, ValueTransfer};

/// A payout that was committed but did not reach its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsettledTransfer {
    pub escrow_id: EscrowId,
    pub recipient: Address,
    pub amount: Decimal,
    /// The terminal state the escrow was committed to.
    pub state: EscrowState,
    pub reason: String,
}

struct LedgerState {
    escrows: HashMap<EscrowId, EscrowRecord>,
    next_id: EscrowId,
    conservation: CustodyConservation,
    unsettled: Vec<UnsettledTransfer>,
    events: Vec<EscrowEvent>,
}

impl LedgerState {
    fn active_mut(&mut self, id: EscrowId) -> Result<&mut EscrowRecord> {
        let escrow = self
            .escrows
            .get_mut(&id)
            .ok_or(AcpError::EscrowNotFound(id))?;
        if !escrow.is_active() {
            return Err(AcpError::EscrowNotActive {
                id,
                state: escrow.state,
            });
        }
        Ok(escrow)
    }
}

/// Payout scheduled by a committed release or refund.
struct Payout {
    id: EscrowId,
    recipient: Address,
    amount: Decimal,
    state: EscrowState,
    event: EscrowEvent,
}

/// The escrow ledger.
///
/// Shareable behind an `Arc`; all methods take `&self`.
pub struct EscrowSettlement {
    state: Mutex<LedgerState>,
    guard: ReentrancyGuard,
    transfer: Arc<dyn ValueTransfer>,
    max_amount: Decimal,
}

impl EscrowSettlement {
    /// Create an empty ledger over a dedicated custody.
    ///
    /// # Errors
    /// Returns `Configuration` if `max_amount` is not positive.
    pub fn new(config: EscrowConfig, transfer: Arc<dyn ValueTransfer>) -> Result<Self> {
        config.validate()?;
        tracing::info!(max_amount = %config.max_amount, "Escrow settlement initialized");

        Ok(Self {
            state: Mutex::new(LedgerState {
                escrows: HashMap::new(),
                next_id: EscrowId(0),
                conservation: CustodyConservation::new(),
                unsettled: Vec::new(),
                events: Vec::new(),
            }),
            guard: ReentrancyGuard::new(),
            transfer,
            max_amount: config.max_amount,
        })
    }

    // -----------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------

    /// Lock `ctx.value` from `ctx.caller` for `provider` until `deadline`.
    ///
    /// # Errors
    /// - `ReentrantCall` if called from inside another mutating call
    /// - `InvalidCounterparty` if `provider` is zero or the caller
    /// - `InvalidDeadline` unless `deadline > ctx.now`
    /// - `NoValue` if no positive value is attached
    /// - `AmountTooLarge` if the value exceeds `max_amount`
    /// - `InsufficientFunds` if the caller cannot fund the value
    /// - `Internal` once every `u64` escrow id has been allocated
    pub fn open(
        &self,
        ctx: &CallContext,
        provider: Address,
        deadline: DateTime<Utc>,
        job_hash: JobHash,
    ) -> Result<EscrowId> {
        let _entered = self.guard.enter()?;
        let buyer = ctx.caller;
        let amount = ctx.value;

        if provider.is_zero() || provider == buyer {
            return Err(AcpError::InvalidCounterparty { provider });
        }
        if deadline <= ctx.now {
            return Err(AcpError::InvalidDeadline {
                deadline,
                now: ctx.now,
            });
        }
        if amount <= Decimal::ZERO {
            return Err(AcpError::NoValue);
        }
        if amount > self.max_amount {
            return Err(AcpError::AmountTooLarge {
                amount,
                max: self.max_amount,
            });
        }

        let id = self.state.lock().next_id;
        let following = id
            .next()
            .ok_or_else(|| AcpError::Internal("escrow id space exhausted".into()))?;

        self.transfer
            .lock(&buyer, amount)
            .map_err(|e| match e {
                TransferError::InsufficientFunds { needed, available } => {
                    AcpError::InsufficientFunds { needed, available }
                }
                other => AcpError::Internal(format!("value lock failed: {other}")),
            })?;

        // next_id only moves inside the guard, so the id read above still holds.
        let mut state = self.state.lock();
        state.next_id = following;
        state.escrows.insert(
            id,
            EscrowRecord {
                id,
                buyer,
                provider,
                amount,
                deadline,
                job_hash,
                state: EscrowState::Active,
                created_at: ctx.now,
            },
        );
        state.conservation.record_lock(amount);
        state.events.push(EscrowEvent::EscrowOpened {
            escrow_id: id,
            buyer,
            provider,
            amount,
            deadline,
            job_hash,
        });

        tracing::info!(
            escrow = %id,
            buyer = %buyer,
            provider = %provider,
            amount = %amount,
            deadline = %deadline,
            "Escrow opened"
        );
        Ok(id)
    }

    /// Pay the escrowed value to the provider. Buyer only, any time.
    ///
    /// # Errors
    /// - `ReentrantCall`, `EscrowNotFound`, `EscrowNotActive`
    /// - `NotBuyer` if the caller is not the buyer
    /// - `TransferFailed` if the provider refused the payout; the escrow
    ///   stays `Released`
    pub fn release(&self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        let _entered = self.guard.enter()?;
        let payout = {
            let mut state = self.state.lock();
            let escrow = state.active_mut(id)?;
            if ctx.caller != escrow.buyer {
                tracing::warn!(escrow = %id, caller = %ctx.caller, "Release by non-buyer rejected");
                return Err(AcpError::NotBuyer {
                    id,
                    caller: ctx.caller,
                });
            }
            escrow.mark_released()?;
            let payout = Payout {
                id,
                recipient: escrow.provider,
                amount: escrow.amount,
                state: EscrowState::Released,
                event: EscrowEvent::EscrowReleased {
                    escrow_id: id,
                    provider: escrow.provider,
                    amount: escrow.amount,
                },
            };
            state.conservation.record_commit(payout.amount);
            payout
        };
        self.settle(payout)
    }

    /// Return the escrowed value to the buyer.
    ///
    /// The provider may refund at any time; the buyer only once `ctx.now`
    /// is strictly after the deadline.
    ///
    /// # Errors
    /// - `ReentrantCall`, `EscrowNotFound`, `EscrowNotActive`
    /// - `DeadlineNotPassed` for the buyer at or before the deadline
    /// - `Unauthorized` for anyone who is not a party
    /// - `TransferFailed` if the buyer refused the payout; the escrow
    ///   stays `Refunded`
    pub fn refund(&self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        let _entered = self.guard.enter()?;
        let payout = {
            let mut state = self.state.lock();
            let escrow = state.active_mut(id)?;
            if ctx.caller == escrow.buyer {
                if !escrow.deadline_passed(ctx.now) {
                    tracing::warn!(
                        escrow = %id,
                        deadline = %escrow.deadline,
                        now = %ctx.now,
                        "Buyer refund before deadline rejected"
                    );
                    return Err(AcpError::DeadlineNotPassed {
                        deadline: escrow.deadline,
                        now: ctx.now,
                    });
                }
            } else if !escrow.is_party(&ctx.caller) {
                tracing::warn!(escrow = %id, caller = %ctx.caller, "Refund by non-party rejected");
                return Err(AcpError::Unauthorized {
                    id,
                    caller: ctx.caller,
                });
            }
            escrow.mark_refunded()?;
            let payout = Payout {
                id,
                recipient: escrow.buyer,
                amount: escrow.amount,
                state: EscrowState::Refunded,
                event: EscrowEvent::EscrowRefunded {
                    escrow_id: id,
                    buyer: escrow.buyer,
                    amount: escrow.amount,
                },
            };
            state.conservation.record_commit(payout.amount);
            payout
        };
        self.settle(payout)
    }

    /// Perform a committed payout. Must be called without the state lock.
    fn settle(&self, payout: Payout) -> Result<()> {
        let outcome = self.transfer.pay(&payout.recipient, payout.amount);

        let mut state = self.state.lock();
        match outcome {
            Ok(()) => {
                state.conservation.record_payout(payout.amount);
                tracing::info!(
                    escrow = %payout.id,
                    recipient = %payout.recipient,
                    amount = %payout.amount,
                    state = %payout.state,
                    "Escrow settled"
                );
                state.events.push(payout.event);
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                state.conservation.record_unsettled(payout.amount);
                state.unsettled.push(UnsettledTransfer {
                    escrow_id: payout.id,
                    recipient: payout.recipient,
                    amount: payout.amount,
                    state: payout.state,
                    reason: reason.clone(),
                });
                tracing::error!(
                    escrow = %payout.id,
                    recipient = %payout.recipient,
                    amount = %payout.amount,
                    state = %payout.state,
                    reason = %reason,
                    "Payout failed, recorded for reconciliation"
                );
                Err(AcpError::TransferFailed {
                    id: payout.id,
                    recipient: payout.recipient,
                    amount: payout.amount,
                    reason,
                })
            }
        }
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Full record of an escrow.
    ///
    /// # Errors
    /// Returns `EscrowNotFound` for an id that was never allocated.
    pub fn get_escrow(&self, id: EscrowId) -> Result<EscrowRecord> {
        self.state
            .lock()
            .escrows
            .get(&id)
            .cloned()
            .ok_or(AcpError::EscrowNotFound(id))
    }

    /// # Errors
    /// Returns `EscrowNotFound` for an id that was never allocated.
    pub fn is_active(&self, id: EscrowId) -> Result<bool> {
        self.state
            .lock()
            .escrows
            .get(&id)
            .map(EscrowRecord::is_active)
            .ok_or(AcpError::EscrowNotFound(id))
    }

    #[must_use]
    pub fn max_amount(&self) -> Decimal {
        self.max_amount
    }

    /// Number of escrows ever opened. Ids run `0..escrow_count()`.
    #[must_use]
    pub fn escrow_count(&self) -> u64 {
        self.state.lock().next_id.0
    }

    /// Number of escrows still `Active`.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .escrows
            .values()
            .filter(|e| e.is_active())
            .count()
    }

    /// Sum of the amounts of all `Active` escrows.
    #[must_use]
    pub fn custody_balance(&self) -> Decimal {
        self.state.lock().conservation.locked()
    }

    /// Payouts that failed after their escrow committed, oldest first.
    #[must_use]
    pub fn unsettled(&self) -> Vec<UnsettledTransfer> {
        self.state.lock().unsettled.clone()
    }

    /// Check that the custody actually held matches the ledger.
    ///
    /// Waits for any open, release or refund running on another thread, so
    /// a payout is never observed between leaving custody and being booked.
    ///
    /// # Errors
    /// - `CustodyInvariantViolation` on mismatch
    /// - `ReentrantCall` if called from inside a payout
    pub fn verify_custody(&self) -> Result<()> {
        let _entered = self.guard.enter()?;
        let actual = self.transfer.custody_balance();
        self.state.lock().conservation.verify(actual)
    }

    #[must_use]
    pub fn events(&self) -> Vec<EscrowEvent> {
        self.state.lock().events.clone()
    }

    /// Take all journaled events, leaving the journal empty.
    pub fn drain_events(&self) -> Vec<EscrowEvent> {
        std::mem::take(&mut self.state.lock().events)
    }
}
