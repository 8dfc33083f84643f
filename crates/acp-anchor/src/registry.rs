//! Anchor registry: append-only map from capsule id to attestation.
//!
//! Single-writer: only the configured authority may anchor. Records are
//! created exactly once and never updated or deleted; a second anchor for
//! the same capsule is rejected rather than overwriting the first.
//!
//! While paused, writes fail with `Paused`. Reads (`verify`, `get`,
//! `is_anchored`) never consult the pause flag, so integrity audits keep
//! working during an incident response pause.

use std::collections::HashMap;

use acp_types::{
    AcpError, AdminContext, Address, AnchorEntry, AnchorEvent, AnchorRecord, CallContext,
    CapsuleId, CapsuleType, ContentHash, MerkleRoot, ReentrancyGuard, RegistryConfig, Result,
    constants,
};
use parking_lot::Mutex;

use crate::batch::{AnchorBatch, validate_entry};

/// Mutable registry state. Only touched while holding the state lock.
struct RegistryState {
    admin: AdminContext,
    records: HashMap<CapsuleId, AnchorRecord>,
    /// Monotonic; only incremented as part of a committed anchor.
    anchored_count: u64,
    events: Vec<AnchorEvent>,
}

/// The content anchoring registry.
///
/// All methods take `&self` so one registry can be shared behind an `Arc`.
/// Every mutating entry point runs inside the [`ReentrancyGuard`].
pub struct AnchorRegistry {
    state: Mutex<RegistryState>,
    guard: ReentrancyGuard,
    max_batch_size: usize,
}

impl AnchorRegistry {
    /// Create an empty, unpaused registry.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let admin = AdminContext::new(config.authority)?;

        tracing::info!(
            core = constants::CORE_NAME,
            version = constants::VERSION,
            authority = %config.authority,
            max_batch_size = config.max_batch_size,
            "Anchor registry initialized"
        );

        Ok(Self {
            state: Mutex::new(RegistryState {
                admin,
                records: HashMap::new(),
                anchored_count: 0,
                events: Vec::new(),
            }),
            guard: ReentrancyGuard::new(),
            max_batch_size: config.max_batch_size,
        })
    }

    // -----------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------

    /// Anchor a single capsule.
    ///
    /// # Errors
    /// - `ReentrantCall` if called from inside another mutating call
    /// - `Paused` while paused
    /// - `NotAuthority` if the caller is not the authority
    /// - `InvalidContentHash` if `content_hash` is zero
    /// - `CapsuleAlreadyAnchored` if `capsule_id` already has a record
    pub fn anchor_one(
        &self,
        ctx: &CallContext,
        capsule_id: CapsuleId,
        content_hash: ContentHash,
        merkle_root: MerkleRoot,
        capsule_type: CapsuleType,
    ) -> Result<()> {
        let _entered = self.guard.enter()?;
        let mut state = self.state.lock();
        state.admin.ensure_not_paused()?;
        state.admin.ensure_authority(&ctx.caller)?;

        let entry = AnchorEntry {
            capsule_id,
            content_hash,
            merkle_root,
            capsule_type,
        };
        validate_entry(&entry)?;
        if state.records.contains_key(&capsule_id) {
            return Err(AcpError::CapsuleAlreadyAnchored(capsule_id));
        }

        state.commit(entry, ctx);
        tracing::info!(
            capsule = %capsule_id,
            content_hash = %content_hash,
            capsule_type = capsule_type.0,
            "Capsule anchored"
        );
        Ok(())
    }

    /// Anchor many capsules from parallel arrays, all or nothing.
    ///
    /// Returns the number of capsules anchored.
    ///
    /// # Errors
    /// - `ReentrantCall`, `Paused`, `NotAuthority` as for [`Self::anchor_one`]
    /// - `EmptyBatch`, `ArrayLengthMismatch`, `BatchTooLarge` for a malformed batch
    /// - `InvalidContentHash` / `CapsuleAlreadyAnchored` if any single item
    ///   fails; in that case no item of the batch is persisted
    pub fn anchor_batch(
        &self,
        ctx: &CallContext,
        ids: &[CapsuleId],
        hashes: &[ContentHash],
        roots: &[MerkleRoot],
        types: &[CapsuleType],
    ) -> Result<usize> {
        let _entered = self.guard.enter()?;
        let mut state = self.state.lock();
        state.admin.ensure_not_paused()?;
        state.admin.ensure_authority(&ctx.caller)?;

        let batch = AnchorBatch::from_parallel(ids, hashes, roots, types, self.max_batch_size)?;

        // Whole batch checked against stored records before the first write.
        if let Some(existing) = batch
            .entries()
            .iter()
            .find(|entry| state.records.contains_key(&entry.capsule_id))
        {
            return Err(AcpError::CapsuleAlreadyAnchored(existing.capsule_id));
        }

        let count = batch.len();
        for entry in batch.into_entries() {
            tracing::debug!(capsule = %entry.capsule_id, "Batch item anchored");
            state.commit(entry, ctx);
        }
        state.events.push(AnchorEvent::BatchAnchored {
            count,
            authority: ctx.caller,
            timestamp: ctx.now,
        });

        tracing::info!(count, authority = %ctx.caller, "Batch anchored");
        Ok(count)
    }

    /// Suspend writes. Authority only.
    ///
    /// # Errors
    /// `ReentrantCall`, `NotAuthority`, or `Paused` if already paused.
    pub fn pause(&self, ctx: &CallContext) -> Result<()> {
        let _entered = self.guard.enter()?;
        let mut state = self.state.lock();
        state.admin.pause(&ctx.caller)?;
        state.events.push(AnchorEvent::Paused {
            by: ctx.caller,
            timestamp: ctx.now,
        });
        tracing::info!(by = %ctx.caller, "Anchor registry paused");
        Ok(())
    }

    /// Resume writes. Authority only.
    ///
    /// # Errors
    /// `ReentrantCall`, `NotAuthority`, or `NotPaused` if not paused.
    pub fn unpause(&self, ctx: &CallContext) -> Result<()> {
        let _entered = self.guard.enter()?;
        let mut state = self.state.lock();
        state.admin.unpause(&ctx.caller)?;
        state.events.push(AnchorEvent::Unpaused {
            by: ctx.caller,
            timestamp: ctx.now,
        });
        tracing::info!(by = %ctx.caller, "Anchor registry unpaused");
        Ok(())
    }

    /// Hand the write authority to `new_authority`. Authority only.
    ///
    /// Allowed while paused, so a compromised authority can be rotated out
    /// during an incident.
    ///
    /// # Errors
    /// `ReentrantCall`, `NotAuthority`, or `InvalidAuthority` for the null identity.
    pub fn transfer_authority(&self, ctx: &CallContext, new_authority: Address) -> Result<()> {
        let _entered = self.guard.enter()?;
        let mut state = self.state.lock();
        let previous = state.admin.transfer_authority(&ctx.caller, new_authority)?;
        state.events.push(AnchorEvent::AuthorityTransferred {
            previous,
            new: new_authority,
            timestamp: ctx.now,
        });
        tracing::info!(previous = %previous, new = %new_authority, "Authority transferred");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Reads (never blocked by pause)
    // -----------------------------------------------------------------

    /// Does the anchored content hash of `capsule_id` equal `content_hash`?
    ///
    /// # Errors
    /// Returns `CapsuleNotFound` if the capsule was never anchored.
    pub fn verify(&self, capsule_id: &CapsuleId, content_hash: &ContentHash) -> Result<bool> {
        let state = self.state.lock();
        state
            .records
            .get(capsule_id)
            .map(|record| record.matches(content_hash))
            .ok_or(AcpError::CapsuleNotFound(*capsule_id))
    }

    /// Fetch the anchor record of `capsule_id`.
    ///
    /// # Errors
    /// Returns `CapsuleNotFound` if the capsule was never anchored.
    pub fn get(&self, capsule_id: &CapsuleId) -> Result<AnchorRecord> {
        let state = self.state.lock();
        state
            .records
            .get(capsule_id)
            .cloned()
            .ok_or(AcpError::CapsuleNotFound(*capsule_id))
    }

    /// Whether `capsule_id` has a record. Never fails.
    #[must_use]
    pub fn is_anchored(&self, capsule_id: &CapsuleId) -> bool {
        self.state.lock().records.contains_key(capsule_id)
    }

    /// Number of capsules anchored since creation.
    #[must_use]
    pub fn anchored_count(&self) -> u64 {
        self.state.lock().anchored_count
    }

    #[must_use]
    pub fn authority(&self) -> Address {
        self.state.lock().admin.authority()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().admin.is_paused()
    }

    #[must_use]
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Snapshot of every event emitted so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AnchorEvent> {
        self.state.lock().events.clone()
    }

    /// Take all pending events, leaving the journal empty.
    pub fn drain_events(&self) -> Vec<AnchorEvent> {
        std::mem::take(&mut self.state.lock().events)
    }
}

impl RegistryState {
    /// Persist a validated, non-duplicate entry and emit its event.
    fn commit(&mut self, entry: AnchorEntry, ctx: &CallContext) {
        let record = entry.into_record(ctx.caller, ctx.now);
        self.events.push(AnchorEvent::AnchorRecorded {
            capsule_id: record.capsule_id,
            content_hash: record.content_hash,
            merkle_root: record.merkle_root,
            capsule_type: record.capsule_type,
            authority: record.anchored_by,
            timestamp: record.anchored_at,
        });
        self.records.insert(record.capsule_id, record);
        self.anchored_count += 1;
    }
}
