//! # Escrow: deadline-based two-party value custody
//!
//! A buyer locks value referencing a provider, a deadline, and a job. The
//! value later moves to the provider (release) or back to the buyer
//! (refund).
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  release (buyer)  ┌──────────┐
//!   │ ACTIVE ├──────────────────▶│ RELEASED │
//!   └───┬────┘                   └──────────┘
//!       │ refund (provider any time, buyer after deadline)
//!       ▼
//!   ┌──────────┐
//!   │ REFUNDED │
//!   └──────────┘
//! ```
//!
//! Both terminal states are final. A terminated record is retained for
//! audit, but every fund-moving operation on it fails.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AcpError, Address, EscrowId, JobHash, Result};

/// The lifecycle state of an escrow.
///
/// Transitions happen exactly once:
/// - `Active → Released` (value paid to the provider)
/// - `Active → Refunded` (value returned to the buyer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// Value is locked in custody.
    Active,
    /// Value was paid out to the provider. **Terminal.**
    Released,
    /// Value was returned to the buyer. **Terminal.**
    Refunded,
}

impl EscrowState {
    /// Can this escrow transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Active, Self::Released | Self::Refunded))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for EscrowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// A single escrow, keyed by its sequential [`EscrowId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub id: EscrowId,
    /// The party that locked the value.
    pub buyer: Address,
    /// The party that is paid on release. Never equal to `buyer`.
    pub provider: Address,
    /// Locked value, `0 < amount <= max_amount`.
    pub amount: Decimal,
    /// After this instant the buyer may reclaim the value.
    pub deadline: DateTime<Utc>,
    /// Reference to the external job description.
    pub job_hash: JobHash,
    pub state: EscrowState,
    pub created_at: DateTime<Utc>,
}

impl EscrowRecord {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == EscrowState::Active
    }

    /// Strictly after the deadline. At exactly `deadline` the buyer still waits.
    #[must_use]
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Is `who` one of the two parties?
    #[must_use]
    pub fn is_party(&self, who: &Address) -> bool {
        *who == self.buyer || *who == self.provider
    }

    /// Attempt to transition to RELEASED state.
    ///
    /// # Errors
    /// Returns `EscrowNotActive` if current state is not Active.
    pub fn mark_released(&mut self) -> Result<()> {
        self.transition(EscrowState::Released)
    }

    /// Attempt to transition to REFUNDED state.
    ///
    /// # Errors
    /// Returns `EscrowNotActive` if current state is not Active.
    pub fn mark_refunded(&mut self) -> Result<()> {
        self.transition(EscrowState::Refunded)
    }

    fn transition(&mut self, target: EscrowState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(AcpError::EscrowNotActive {
                id: self.id,
                state: self.state,
            });
        }
        self.state = target;
        Ok(())
    }
}

/// Dummy escrow for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl EscrowRecord {
    /// An active escrow of `amount` with a deadline one hour out.
    #[must_use]
    pub fn dummy(id: EscrowId, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            buyer: Address::random(),
            provider: Address::random(),
            amount,
            deadline: now + chrono::Duration::hours(1),
            job_hash: JobHash::of_str("job"),
            state: EscrowState::Active,
            created_at: now,
        }
    }
}
