//! Anchor records: immutable content-integrity attestations.
//!
//! An [`AnchorRecord`] binds a [`CapsuleId`] to the digest of its content
//! and the root of its lineage. It is created exactly once and never
//! updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, CapsuleId, CapsuleType, ContentHash, MerkleRoot};

/// One anchored capsule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub capsule_id: CapsuleId,
    /// Digest of the full capsule content. Never zero.
    pub content_hash: ContentHash,
    /// Lineage root. Zero means "no lineage yet".
    pub merkle_root: MerkleRoot,
    pub capsule_type: CapsuleType,
    pub anchored_at: DateTime<Utc>,
    /// The authority that wrote the record.
    pub anchored_by: Address,
}

impl AnchorRecord {
    /// Does the stored content hash equal `content_hash`?
    #[must_use]
    pub fn matches(&self, content_hash: &ContentHash) -> bool {
        self.content_hash == *content_hash
    }

    #[must_use]
    pub fn has_lineage(&self) -> bool {
        !self.merkle_root.is_zero()
    }
}

/// One item of an anchor request, before it becomes a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub capsule_id: CapsuleId,
    pub content_hash: ContentHash,
    pub merkle_root: MerkleRoot,
    pub capsule_type: CapsuleType,
}

impl AnchorEntry {
    /// Turn the entry into a record written by `authority` at `at`.
    #[must_use]
    pub fn into_record(self, authority: Address, at: DateTime<Utc>) -> AnchorRecord {
        AnchorRecord {
            capsule_id: self.capsule_id,
            content_hash: self.content_hash,
            merkle_root: self.merkle_root,
            capsule_type: self.capsule_type,
            anchored_at: at,
            anchored_by: authority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hash32;

    fn entry() -> AnchorEntry {
        AnchorEntry {
            capsule_id: CapsuleId::from_name("doc1"),
            content_hash: Hash32::of_str("content1"),
            merkle_root: Hash32::ZERO,
            capsule_type: CapsuleType(0),
        }
    }

    #[test]
    fn into_record_copies_fields() {
        let authority = Address::random();
        let at = Utc::now();
        let record = entry().into_record(authority, at);
        assert_eq!(record.capsule_id, CapsuleId::from_name("doc1"));
        assert_eq!(record.anchored_by, authority);
        assert_eq!(record.anchored_at, at);
        assert!(!record.has_lineage());
    }

    #[test]
    fn matches_compares_content_hash() {
        let record = entry().into_record(Address::random(), Utc::now());
        assert!(record.matches(&Hash32::of_str("content1")));
        assert!(!record.matches(&Hash32::of_str("content2")));
    }

    #[test]
    fn serde_roundtrip() {
        let record = entry().into_record(Address::random(), Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        let back: AnchorRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
