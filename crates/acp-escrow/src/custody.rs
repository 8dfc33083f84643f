//! Value custody: the runtime primitive that actually moves value.
//!
//! The escrow ledger decides *whether* value moves; a [`ValueTransfer`]
//! moves it. Outbound payments are external interactions: the recipient
//! may refuse them, or call back into the ledger before `pay` returns.
//!
//! [`AccountBook`] is the in-memory implementation: per-address balances
//! plus one custody pot. All mutations are atomic: either the full
//! operation succeeds or the book is unchanged.

use std::collections::{HashMap, HashSet};

use acp_types::Address;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;

/// Why a value movement did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The payer cannot fund the amount.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Custody holds less than the payout.
    #[error("insufficient custody: need {needed}, have {available}")]
    InsufficientCustody { needed: Decimal, available: Decimal },

    /// The recipient refused the incoming value.
    #[error("recipient {recipient} rejected the transfer: {reason}")]
    Rejected { recipient: Address, reason: String },
}

/// Moves value into and out of the custody of one escrow ledger.
///
/// An implementation is dedicated to a single ledger: its custody balance
/// is compared against that ledger's books.
pub trait ValueTransfer: Send + Sync {
    /// Pull `amount` from `from` into custody.
    fn lock(&self, from: &Address, amount: Decimal) -> Result<(), TransferError>;

    /// Push `amount` out of custody to `to`.
    fn pay(&self, to: &Address, amount: Decimal) -> Result<(), TransferError>;

    /// Value currently held in custody.
    fn custody_balance(&self) -> Decimal;
}

struct BookState {
    balances: HashMap<Address, Decimal>,
    custody: Decimal,
    /// Recipients that refuse incoming payments.
    rejecting: HashSet<Address>,
    deposited: Decimal,
}

/// In-memory value book with a single custody pot.
pub struct AccountBook {
    state: Mutex<BookState>,
}

impl AccountBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BookState {
                balances: HashMap::new(),
                custody: Decimal::ZERO,
                rejecting: HashSet::new(),
                deposited: Decimal::ZERO,
            }),
        }
    }

    /// Deposit funds (increases the holder's balance).
    pub fn deposit(&self, who: Address, amount: Decimal) {
        let mut state = self.state.lock();
        *state.balances.entry(who).or_default() += amount;
        state.deposited += amount;
    }

    /// Balance of `who` outside custody.
    #[must_use]
    pub fn balance(&self, who: &Address) -> Decimal {
        self.state
            .lock()
            .balances
            .get(who)
            .copied()
            .unwrap_or_default()
    }

    /// Make `who` refuse every incoming payment, like a recipient
    /// without a way to accept value.
    pub fn reject_payments_to(&self, who: Address) {
        self.state.lock().rejecting.insert(who);
    }

    /// Undo [`Self::reject_payments_to`].
    pub fn accept_payments_to(&self, who: &Address) {
        self.state.lock().rejecting.remove(who);
    }

    /// Sum of all balances plus custody. Equals total deposits.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        let state = self.state.lock();
        state.balances.values().copied().sum::<Decimal>() + state.custody
    }

    /// Total value ever deposited.
    #[must_use]
    pub fn total_deposited(&self) -> Decimal {
        self.state.lock().deposited
    }
}

impl Default for AccountBook {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTransfer for AccountBook {
    fn lock(&self, from: &Address, amount: Decimal) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        let available = state.balances.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        *state.balances.entry(*from).or_default() -= amount;
        state.custody += amount;
        Ok(())
    }

    fn pay(&self, to: &Address, amount: Decimal) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.rejecting.contains(to) {
            return Err(TransferError::Rejected {
                recipient: *to,
                reason: "recipient refuses incoming value".into(),
            });
        }
        if state.custody < amount {
            return Err(TransferError::InsufficientCustody {
                needed: amount,
                available: state.custody,
            });
        }
        state.custody -= amount;
        *state.balances.entry(*to).or_default() += amount;
        Ok(())
    }

    fn custody_balance(&self) -> Decimal {
        self.state.lock().custody
    }
}
