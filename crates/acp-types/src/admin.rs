//! Administrative context: the authority identity and the pause flag.
//!
//! The authority is set at construction and only changes through
//! [`AdminContext::transfer_authority`]. Every authorization check reads
//! it by equality; nothing mutates it implicitly. While paused, writes are
//! rejected but reads stay available.

use serde::{Deserialize, Serialize};

use crate::{AcpError, Address, Result};

/// Authority + pause state owned by a single component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminContext {
    authority: Address,
    paused: bool,
}

impl AdminContext {
    /// Create an unpaused context.
    ///
    /// # Errors
    /// Returns `InvalidAuthority` for the null identity.
    pub fn new(authority: Address) -> Result<Self> {
        if authority.is_zero() {
            return Err(AcpError::InvalidAuthority(authority));
        }
        Ok(Self {
            authority,
            paused: false,
        })
    }

    #[must_use]
    pub fn authority(&self) -> Address {
        self.authority
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Guard an authority-only operation.
    pub fn ensure_authority(&self, caller: &Address) -> Result<()> {
        if *caller == self.authority {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, authority = %self.authority, "Authority check failed");
            Err(AcpError::NotAuthority { caller: *caller })
        }
    }

    /// Guard a write that is suspended while paused.
    pub fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            Err(AcpError::Paused)
        } else {
            Ok(())
        }
    }

    /// Suspend writes.
    ///
    /// # Errors
    /// - `NotAuthority` if `caller` is not the authority
    /// - `Paused` if already paused
    pub fn pause(&mut self, caller: &Address) -> Result<()> {
        self.ensure_authority(caller)?;
        self.ensure_not_paused()?;
        self.paused = true;
        Ok(())
    }

    /// Resume writes.
    ///
    /// # Errors
    /// - `NotAuthority` if `caller` is not the authority
    /// - `NotPaused` if not paused
    pub fn unpause(&mut self, caller: &Address) -> Result<()> {
        self.ensure_authority(caller)?;
        if !self.paused {
            return Err(AcpError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }

    /// Hand the authority to `new_authority`. Returns the previous authority.
    ///
    /// # Errors
    /// - `NotAuthority` if `caller` is not the authority
    /// - `InvalidAuthority` if `new_authority` is the null identity
    pub fn transfer_authority(&mut self, caller: &Address, new_authority: Address) -> Result<Address> {
        self.ensure_authority(caller)?;
        if new_authority.is_zero() {
            return Err(AcpError::InvalidAuthority(new_authority));
        }
        let previous = self.authority;
        self.authority = new_authority;
        Ok(previous)
    }
}
