//! System-wide constants for the ACP core.

use rust_decimal::Decimal;

/// Default safety cap on a single escrow (0.01).
pub const DEFAULT_MAX_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Default maximum items in a single batch anchor call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 256;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Component name used in logs.
pub const CORE_NAME: &str = "ACP Core";
