//! Events emitted by the registry and the escrow ledger.
//!
//! Events form an append-only audit trail consumed by downstream indexers.
//! They are appended in the same critical section as the state change they
//! describe, so a failed call never emits anything.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, CapsuleId, CapsuleType, ContentHash, EscrowId, JobHash, MerkleRoot};

/// Events of the anchor registry.
///
/// A batch anchor emits one `AnchorRecorded` per item followed by a single
/// `BatchAnchored` summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnchorEvent {
    AnchorRecorded {
        capsule_id: CapsuleId,
        content_hash: ContentHash,
        merkle_root: MerkleRoot,
        capsule_type: CapsuleType,
        authority: Address,
        timestamp: DateTime<Utc>,
    },
    BatchAnchored {
        count: usize,
        authority: Address,
        timestamp: DateTime<Utc>,
    },
    Paused {
        by: Address,
        timestamp: DateTime<Utc>,
    },
    Unpaused {
        by: Address,
        timestamp: DateTime<Utc>,
    },
    AuthorityTransferred {
        previous: Address,
        new: Address,
        timestamp: DateTime<Utc>,
    },
}

impl fmt::Display for AnchorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorRecorded { .. } => write!(f, "ANCHOR_RECORDED"),
            Self::BatchAnchored { .. } => write!(f, "BATCH_ANCHORED"),
            Self::Paused { .. } => write!(f, "PAUSED"),
            Self::Unpaused { .. } => write!(f, "UNPAUSED"),
            Self::AuthorityTransferred { .. } => write!(f, "AUTHORITY_TRANSFERRED"),
        }
    }
}

/// Events of the escrow ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEvent {
    EscrowOpened {
        escrow_id: EscrowId,
        buyer: Address,
        provider: Address,
        amount: Decimal,
        deadline: DateTime<Utc>,
        job_hash: JobHash,
    },
    EscrowReleased {
        escrow_id: EscrowId,
        provider: Address,
        amount: Decimal,
    },
    EscrowRefunded {
        escrow_id: EscrowId,
        buyer: Address,
        amount: Decimal,
    },
}

impl EscrowEvent {
    #[must_use]
    pub fn escrow_id(&self) -> EscrowId {
        match self {
            Self::EscrowOpened { escrow_id, .. }
            | Self::EscrowReleased { escrow_id, .. }
            | Self::EscrowRefunded { escrow_id, .. } => *escrow_id,
        }
    }
}

impl fmt::Display for EscrowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EscrowOpened { .. } => write!(f, "ESCROW_OPENED"),
            Self::EscrowReleased { .. } => write!(f, "ESCROW_RELEASED"),
            Self::EscrowRefunded { .. } => write!(f, "ESCROW_REFUNDED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display() {
        let ev = AnchorEvent::BatchAnchored {
            count: 3,
            authority: Address::random(),
            timestamp: Utc::now(),
        };
        assert_eq!(format!("{ev}"), "BATCH_ANCHORED");

        let ev = EscrowEvent::EscrowRefunded {
            escrow_id: EscrowId(0),
            buyer: Address::random(),
            amount: Decimal::new(5, 3),
        };
        assert_eq!(format!("{ev}"), "ESCROW_REFUNDED");
        assert_eq!(ev.escrow_id(), EscrowId(0));
    }

    #[test]
    fn events_are_tagged_in_json() {
        let ev = EscrowEvent::EscrowReleased {
            escrow_id: EscrowId(7),
            provider: Address::random(),
            amount: Decimal::new(1, 2),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "escrow_released");
        // serde-with-str keeps amounts exact
        assert_eq!(json["amount"], "0.01");
        let back: EscrowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(ev, back);
    }
}
