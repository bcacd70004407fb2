//! Token amounts and ledger time
//!
//! Amounts are unsigned integers in the asset's smallest unit. Every
//! arithmetic helper is checked; nothing here wraps or saturates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::TypesError;

/// Ledger time in unix seconds.
pub type Timestamp = i64;

/// A token quantity in base units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    /// Used as the "unlimited" allowance.
    pub const MAX: Amount = Amount(u128::MAX);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// `self * numerator / denominator`, rounding down.
    ///
    /// Returns `None` on overflow or a zero denominator.
    pub fn checked_mul_div(self, numerator: u128, denominator: u128) -> Option<Amount> {
        if denominator == 0 {
            return None;
        }
        self.0
            .checked_mul(numerator)
            .map(|product| Amount(product / denominator))
    }

    /// Add, mapping overflow into the shared error type.
    pub fn try_add(self, rhs: Amount) -> Result<Amount, TypesError> {
        self.checked_add(rhs).ok_or(TypesError::Overflow)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
