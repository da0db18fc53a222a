//! ATMOS value holder.
//!
//! A `Coin` is the only way value moves between subsystems. It cannot be
//! cloned, and non-zero coins can only be produced inside this crate (by the
//! treasury or by splitting an existing coin), so supply changes only through
//! treasury mint/burn.

use borsh::BorshSerialize;
use crate::error::{GovernanceError, Rejected};

/// An owned quantity of ATMOS base units.
///
/// Coins serialize for state snapshots but cannot be decoded back, so raw
/// bytes never become value:
///
/// ```compile_fail
/// let coin: atmos_governance::Coin = borsh::from_slice(&5_000u64.to_le_bytes()).unwrap();
/// ```
#[must_use = "dropping a Coin destroys its value"]
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct Coin {
    value: u64,
}

impl Coin {
    /// An empty coin.
    pub fn zero() -> Self {
        Self { value: 0 }
    }

    /// Only the treasury creates value.
    pub(crate) fn from_supply(value: u64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Split `amount` off into a new coin.
    pub fn split(&mut self, amount: u64) -> Result<Coin, GovernanceError> {
        if amount > self.value {
            return Err(GovernanceError::InsufficientBalance {
                available: self.value,
                requested: amount,
            });
        }
        self.value -= amount;
        Ok(Coin { value: amount })
    }

    /// Take the entire balance, leaving this coin empty.
    pub fn take_all(&mut self) -> Coin {
        Coin { value: std::mem::take(&mut self.value) }
    }

    /// Merge another coin into this one. On overflow `other` is handed back
    /// and this coin is unchanged.
    pub fn join(&mut self, other: Coin) -> Result<(), Rejected<Coin>> {
        match self.value.checked_add(other.value) {
            Some(value) => {
                self.value = value;
                Ok(())
            }
            None => Err(Rejected::new(GovernanceError::Overflow, other)),
        }
    }

    /// Destroy an empty coin.
    pub fn destroy_zero(self) -> Result<(), GovernanceError> {
        if self.value != 0 {
            return Err(GovernanceError::InvalidParameter(format!(
                "Cannot destroy coin holding {}",
                self.value
            )));
        }
        Ok(())
    }

    /// Consume the coin, yielding its value. Used only on burn.
    pub(crate) fn into_value(self) -> u64 {
        self.value
    }
}
