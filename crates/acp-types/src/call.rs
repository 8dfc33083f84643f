//! The call environment handed to every mutating entry point.
//!
//! The runtime, not the core, knows who is calling, what time it is, and
//! how much value rides along with the call. Passing it explicitly keeps
//! every time comparison evaluated against the caller-observed clock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Address;

/// Sender, current time, and attached value of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub now: DateTime<Utc>,
    /// Value attached to the call. Only payable operations read it.
    pub value: Decimal,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: Address, now: DateTime<Utc>) -> Self {
        Self {
            caller,
            now,
            value: Decimal::ZERO,
        }
    }

    /// A call from `caller` observed at the wall clock.
    #[must_use]
    pub fn at_now(caller: Address) -> Self {
        Self::new(caller, Utc::now())
    }

    #[must_use]
    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_value() {
        let ctx = CallContext::at_now(Address::random());
        assert_eq!(ctx.value, Decimal::ZERO);
    }

    #[test]
    fn with_value_attaches() {
        let ctx = CallContext::at_now(Address::random()).with_value(Decimal::new(5, 3));
        assert_eq!(ctx.value, Decimal::new(5, 3));
    }
}
