//! Anchor batch: the all-or-nothing unit of a batch anchor call.
//!
//! The batch is assembled from the caller's parallel arrays and fully
//! validated on its own (shape, per-item content hash, duplicates within
//! the batch) before the registry looks at its stored records. Nothing is
//! written until every item has passed, so a failing item late in the batch
//! can never leave earlier items persisted.

use std::collections::HashSet;

use acp_types::{
    AcpError, AnchorEntry, CapsuleId, CapsuleType, ContentHash, MerkleRoot, Result,
};

/// A shape-checked, item-checked set of anchor entries.
#[derive(Debug, Clone)]
pub struct AnchorBatch {
    entries: Vec<AnchorEntry>,
}

impl AnchorBatch {
    /// Zip the parallel arrays into a batch.
    ///
    /// # Errors
    /// - `EmptyBatch` if the arrays are empty
    /// - `ArrayLengthMismatch` if the arrays differ in length
    /// - `BatchTooLarge` if there are more than `max_items` entries
    /// - `InvalidContentHash` if any content hash is zero
    /// - `CapsuleAlreadyAnchored` if a capsule id appears twice
    pub fn from_parallel(
        ids: &[CapsuleId],
        hashes: &[ContentHash],
        roots: &[MerkleRoot],
        types: &[CapsuleType],
        max_items: usize,
    ) -> Result<Self> {
        if ids.len() != hashes.len() || ids.len() != roots.len() || ids.len() != types.len() {
            return Err(AcpError::ArrayLengthMismatch {
                ids: ids.len(),
                hashes: hashes.len(),
                roots: roots.len(),
                types: types.len(),
            });
        }
        if ids.is_empty() {
            return Err(AcpError::EmptyBatch);
        }
        if ids.len() > max_items {
            return Err(AcpError::BatchTooLarge {
                size: ids.len(),
                max: max_items,
            });
        }

        let entries = ids
            .iter()
            .zip(hashes)
            .zip(roots)
            .zip(types)
            .map(|(((id, hash), root), kind)| AnchorEntry {
                capsule_id: *id,
                content_hash: *hash,
                merkle_root: *root,
                capsule_type: *kind,
            })
            .collect();

        Self::from_entries(entries)
    }

    /// Build a batch from already-zipped entries.
    ///
    /// # Errors
    /// Same per-item rules as [`AnchorBatch::from_parallel`].
    pub fn from_entries(entries: Vec<AnchorEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(AcpError::EmptyBatch);
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            validate_entry(entry)?;
            if !seen.insert(entry.capsule_id) {
                return Err(AcpError::CapsuleAlreadyAnchored(entry.capsule_id));
            }
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[AnchorEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<AnchorEntry> {
        self.entries
    }
}

/// Item rules shared by single and batch anchoring.
///
/// # Errors
/// Returns `InvalidContentHash` if the content hash is zero.
pub fn validate_entry(entry: &AnchorEntry) -> Result<()> {
    if entry.content_hash.is_zero() {
        return Err(AcpError::InvalidContentHash);
    }
    Ok(())
}
