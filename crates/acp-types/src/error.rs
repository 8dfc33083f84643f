//! Error types for the ACP core.
//!
//! All errors use the `ACP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Anchor registry errors
//! - 2xx: Escrow errors
//! - 3xx: Value transfer / custody errors
//! - 8xx: Security and administration errors
//! - 9xx: General / internal errors
//!
//! Every error aborts the whole call. None of them is retried internally:
//! the caller corrects its input and submits a new call.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, CapsuleId, EscrowId, EscrowState};

/// Central error enum for all ACP core operations.
#[derive(Debug, Error)]
pub enum AcpError {
    // =================================================================
    // Anchor Registry Errors (1xx)
    // =================================================================
    /// The content hash of an anchor was all zero bytes.
    #[error("ACP_ERR_100: Invalid content hash: must be non-zero")]
    InvalidContentHash,

    /// The capsule already has an immutable anchor record.
    #[error("ACP_ERR_101: Capsule already anchored: {0}")]
    CapsuleAlreadyAnchored(CapsuleId),

    /// No anchor record exists for the capsule.
    #[error("ACP_ERR_102: Capsule not found: {0}")]
    CapsuleNotFound(CapsuleId),

    /// A batch anchor call carried zero items.
    #[error("ACP_ERR_103: Empty batch")]
    EmptyBatch,

    /// The parallel arrays of a batch anchor call differ in length.
    #[error(
        "ACP_ERR_104: Array length mismatch: ids={ids}, hashes={hashes}, roots={roots}, types={types}"
    )]
    ArrayLengthMismatch {
        ids: usize,
        hashes: usize,
        roots: usize,
        types: usize,
    },

    /// The batch exceeds the configured per-call item limit.
    #[error("ACP_ERR_105: Batch too large: {size} items, max {max}")]
    BatchTooLarge { size: usize, max: usize },

    // =================================================================
    // Escrow Errors (2xx)
    // =================================================================
    /// The provider is the null identity or the buyer itself.
    #[error("ACP_ERR_200: Invalid counterparty: {provider}")]
    InvalidCounterparty { provider: Address },

    /// The deadline is not strictly in the future.
    #[error("ACP_ERR_201: Invalid deadline {deadline}: must be after {now}")]
    InvalidDeadline {
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// No value was attached to the escrow open call.
    #[error("ACP_ERR_202: No value attached")]
    NoValue,

    /// The attached value exceeds the safety cap.
    #[error("ACP_ERR_203: Amount too large: {amount} exceeds cap {max}")]
    AmountTooLarge { amount: Decimal, max: Decimal },

    /// No escrow exists with this ID.
    #[error("ACP_ERR_204: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// The escrow is already in a terminal state.
    #[error("ACP_ERR_205: Escrow {id} is {state}, not ACTIVE")]
    EscrowNotActive { id: EscrowId, state: EscrowState },

    /// Only the buyer may release an escrow.
    #[error("ACP_ERR_206: Caller {caller} is not the buyer of {id}")]
    NotBuyer { id: EscrowId, caller: Address },

    /// The caller is neither party to the escrow.
    #[error("ACP_ERR_207: Caller {caller} is not a party to {id}")]
    Unauthorized { id: EscrowId, caller: Address },

    /// The buyer tried to reclaim funds before the deadline passed.
    #[error("ACP_ERR_208: Deadline {deadline} not passed (now {now})")]
    DeadlineNotPassed {
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// The buyer could not fund the attached value.
    #[error("ACP_ERR_209: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    // =================================================================
    // Transfer / Custody Errors (3xx)
    // =================================================================
    /// The outbound value transfer was rejected after the state committed.
    /// The escrow stays terminal; the transfer needs manual reconciliation.
    #[error("ACP_ERR_300: Transfer of {amount} to {recipient} for {id} failed: {reason}")]
    TransferFailed {
        id: EscrowId,
        recipient: Address,
        amount: Decimal,
        reason: String,
    },

    /// Custodied value does not match the escrow ledger.
    #[error("ACP_ERR_301: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    // =================================================================
    // Security / Administration Errors (8xx)
    // =================================================================
    /// The caller is not the configured authority.
    #[error("ACP_ERR_800: Caller {caller} is not the authority")]
    NotAuthority { caller: Address },

    /// Writes are suspended.
    #[error("ACP_ERR_801: Paused")]
    Paused,

    /// Unpause was requested while not paused.
    #[error("ACP_ERR_802: Not paused")]
    NotPaused,

    /// A mutating entry point was re-entered before the outer call returned.
    #[error("ACP_ERR_803: Re-entrant call rejected")]
    ReentrantCall,

    /// The proposed authority is the null identity.
    #[error("ACP_ERR_804: Invalid authority: {0}")]
    InvalidAuthority(Address),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("ACP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("ACP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("ACP_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// The failure taxonomy callers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected before any mutation; fix the input.
    Validation,
    /// Wrong or duplicate state.
    Conflict,
    /// Caller lacks the right to perform the operation (now).
    Authorization,
    /// The referenced record does not exist.
    NotFound,
    /// Value movement failed; may need off-ledger reconciliation.
    Transfer,
    /// Configuration or internal fault.
    Internal,
}

impl AcpError {
    /// Which bucket of the failure taxonomy this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidContentHash
            | Self::EmptyBatch
            | Self::ArrayLengthMismatch { .. }
            | Self::BatchTooLarge { .. }
            | Self::InvalidCounterparty { .. }
            | Self::InvalidDeadline { .. }
            | Self::NoValue
            | Self::AmountTooLarge { .. }
            | Self::InvalidAuthority(_) => ErrorCategory::Validation,
            Self::CapsuleAlreadyAnchored(_)
            | Self::EscrowNotActive { .. }
            | Self::Paused
            | Self::NotPaused
            | Self::ReentrantCall => ErrorCategory::Conflict,
            Self::NotAuthority { .. }
            | Self::NotBuyer { .. }
            | Self::Unauthorized { .. }
            | Self::DeadlineNotPassed { .. } => ErrorCategory::Authorization,
            Self::CapsuleNotFound(_) | Self::EscrowNotFound(_) => ErrorCategory::NotFound,
            Self::InsufficientFunds { .. }
            | Self::TransferFailed { .. }
            | Self::CustodyInvariantViolation { .. } => ErrorCategory::Transfer,
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Always `false`: nothing in the core is retried internally.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// `true` when the error was raised after state committed.
    #[must_use]
    pub fn requires_reconciliation(&self) -> bool {
        matches!(self, Self::TransferFailed { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AcpError>;

impl From<serde_json::Error> for AcpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
