//! # acp-anchor
//!
//! **Content anchoring registry**: an append-only map from a capsule
//! identifier to an immutable attestation record (content hash, lineage
//! root, type, authority, timestamp).
//!
//! ## Architecture
//!
//! 1. **AnchorBatch**: zips and validates a batch as a whole before any write
//! 2. **AnchorRegistry**: anchor-once storage, authority-gated writes,
//!    pause switch, always-available reads, event journal
//!
//! ## Write Flow
//!
//! ```text
//! caller → ReentrancyGuard.enter() → AdminContext (pause, authority)
//!        → AnchorBatch / validate_entry → duplicate check → commit + events
//! ```
//!
//! A failure at any step leaves the registry exactly as it was.

pub mod batch;
pub mod registry;

pub use batch::AnchorBatch;
pub use registry::AnchorRegistry;
