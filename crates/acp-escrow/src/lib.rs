//! # acp-escrow
//!
//! **Deadline escrow settlement**: a buyer locks value for a provider
//! against a job; the buyer releases it to the provider, or it is refunded
//! (by the provider at any time, by the buyer once the deadline passed).
//!
//! ## Architecture
//!
//! 1. **ValueTransfer / AccountBook**: the custody primitive that moves value
//! 2. **EscrowSettlement**: the ledger, authorization rules, event journal
//! 3. **CustodyConservation**: custody == active + in-flight + unsettled
//!
//! ## Settlement Flow
//!
//! ```text
//! caller → ReentrancyGuard.enter() → lookup + authorization
//!        → commit terminal state → release state lock → ValueTransfer::pay
//!        → event (paid) | unsettled ledger + TransferFailed (refused)
//! ```

pub mod conservation;
pub mod custody;
pub mod settlement;

pub use conservation::CustodyConservation;
pub use custody::{AccountBook, TransferError, ValueTransfer};
pub use settlement::{EscrowSettlement, UnsettledTransfer};
