//! Configuration types for the anchor registry and the escrow ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AcpError, Address, Result, constants};

/// Configuration of one anchor registry deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The single identity allowed to write anchors and toggle pause.
    pub authority: Address,
    /// Upper bound on items per batch anchor call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_max_batch_size() -> usize {
    constants::DEFAULT_MAX_BATCH_SIZE
}

impl RegistryConfig {
    #[must_use]
    pub fn new(authority: Address) -> Self {
        Self {
            authority,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// # Errors
    /// Returns `Configuration` for a null authority or a zero batch size.
    pub fn validate(&self) -> Result<()> {
        if self.authority.is_zero() {
            return Err(AcpError::Configuration(
                "registry authority must not be the null identity".into(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(AcpError::Configuration(
                "max_batch_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration of one escrow ledger deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Hard cap on the value of a single escrow.
    pub max_amount: Decimal,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            max_amount: constants::DEFAULT_MAX_AMOUNT,
        }
    }
}

impl EscrowConfig {
    /// # Errors
    /// Returns `Configuration` if `max_amount` is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_amount <= Decimal::ZERO {
            return Err(AcpError::Configuration(format!(
                "max_amount must be > 0, got {}",
                self.max_amount
            )));
        }
        Ok(())
    }
}

/// Configuration for a full deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcpConfig {
    pub registry: RegistryConfig,
    #[serde(default)]
    pub escrow: EscrowConfig,
}

impl AcpConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AcpError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.escrow.validate()
    }
}
