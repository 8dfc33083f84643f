//! Identifiers and digests used throughout the ACP core.
//!
//! Agent identities are raw ed25519 public keys. Capsule identifiers and
//! all content references are 32-byte SHA-256 digests computed upstream.
//! Escrow identifiers are sequential and never reused.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AcpError, Result};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Identity of an agent (buyer, provider, or authority).
/// This is the raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The null identity. Never a valid counterparty or authority.
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// Random non-null address for tests.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = rand::random::<[u8; 32]>();
        bytes[0] |= 1;
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Hash32
// ---------------------------------------------------------------------------

/// A 32-byte digest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Self = Self([0u8; 32]);

    /// SHA-256 of `bytes`.
    #[must_use]
    pub fn digest(bytes: impl AsRef<[u8]>) -> Self {
        let hash = Sha256::digest(bytes.as_ref());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        Self(out)
    }

    #[must_use]
    pub fn of_str(s: &str) -> Self {
        Self::digest(s.as_bytes())
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| AcpError::Serialization(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            AcpError::Serialization(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Digest of the full capsule content.
pub type ContentHash = Hash32;

/// Digest summarizing a capsule's lineage. Zero means "no lineage yet".
pub type MerkleRoot = Hash32;

/// Digest of an external job description.
pub type JobHash = Hash32;

// ---------------------------------------------------------------------------
// CapsuleId
// ---------------------------------------------------------------------------

/// Content-derived identifier of a capsule. Key of the anchor registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CapsuleId(pub Hash32);

impl CapsuleId {
    /// Derive the identifier from a human-readable capsule name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Hash32::of_str(name))
    }

    #[must_use]
    pub fn as_hash(&self) -> &Hash32 {
        &self.0
    }
}

impl From<Hash32> for CapsuleId {
    fn from(hash: Hash32) -> Self {
        Self(hash)
    }
}

impl fmt::Display for CapsuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capsule:{}", hex::encode(&self.0.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// CapsuleType
// ---------------------------------------------------------------------------

/// Small enumerated capsule kind code (0–255). Interpretation is upstream.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct CapsuleType(pub u8);

impl From<u8> for CapsuleType {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl fmt::Display for CapsuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EscrowId
// ---------------------------------------------------------------------------

/// Monotonically increasing escrow identifier. Never reused, so an id stays
/// a stable historical reference after the escrow terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EscrowId(pub u64);

impl EscrowId {
    /// The following id, or `None` once the `u64` space is exhausted.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
