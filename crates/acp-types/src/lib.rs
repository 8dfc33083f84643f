//! # acp-types
//!
//! Shared types, errors, and configuration for the **ACP core**: the content
//! anchoring registry and the deadline escrow ledger of the Agent Commerce
//! Protocol.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`Hash32`], [`CapsuleId`], [`CapsuleType`], [`EscrowId`]
//! - **Anchor model**: [`AnchorRecord`], [`AnchorEntry`]
//! - **Escrow model**: [`EscrowRecord`], [`EscrowState`]
//! - **Events**: [`AnchorEvent`], [`EscrowEvent`]
//! - **Call environment**: [`CallContext`]
//! - **Administration**: [`AdminContext`], [`ReentrancyGuard`]
//! - **Configuration**: [`RegistryConfig`], [`EscrowConfig`], [`AcpConfig`]
//! - **Errors**: [`AcpError`] with `ACP_ERR_` prefix codes
//! - **Lineage**: [`lineage_root`]
//! - **Constants**: system-wide limits and defaults

pub mod admin;
pub mod anchor;
pub mod call;
pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod event;
pub mod guard;
pub mod ids;
pub mod lineage;

pub use admin::*;
pub use anchor::*;
pub use call::*;
pub use config::*;
pub use error::*;
pub use escrow::*;
pub use event::*;
pub use guard::*;
pub use ids::*;
pub use lineage::*;

// Constants are accessed via `acp_types::constants::FOO`
// (not re-exported to avoid name collisions).
