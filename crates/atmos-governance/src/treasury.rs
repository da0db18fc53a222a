//! Bounded ATMOS mint/burn ledger.
//!
//! Public minting and burning require the `TreasuryCap` issued at creation.
//! Crate-internal paths (`mint_internal`, `burn_internal`) are the allow-list
//! used by early unlock penalties, agent settlement and reward claims.

use borsh::BorshSerialize;
use atmos_types::{Address, ObjectId, TxContext};
use crate::coin::Coin;
use crate::error::{GovernanceError, Rejected};

/// Base units per ATMOS.
pub const ONE_ATMOS: u64 = 1_000_000_000;

/// Hard supply cap: one billion ATMOS.
pub const MAX_SUPPLY: u64 = 1_000_000_000 * ONE_ATMOS;

/// Treasury ledger. Totals only ever increase.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct Treasury {
    id: ObjectId,
    admin: Address,
    max_supply: u64,
    total_minted: u64,
    total_burned: u64,
}

/// Capability to mint and burn through a specific treasury.
///
/// Only [`Treasury::new`] issues one; it cannot be assembled by hand:
///
/// ```compile_fail
/// use atmos_governance::TreasuryCap;
/// use atmos_types::ObjectId;
/// let cap = TreasuryCap { id: ObjectId::ZERO, treasury_id: ObjectId::ZERO };
/// ```
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct TreasuryCap {
    id: ObjectId,
    treasury_id: ObjectId,
}

impl TreasuryCap {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn treasury_id(&self) -> ObjectId {
        self.treasury_id
    }
}

impl Treasury {
    /// Create a treasury and its capability, owned by the caller.
    /// `max_supply` may not exceed [`MAX_SUPPLY`], which keeps every coin
    /// sum inside u64.
    pub fn new(ctx: &mut TxContext, max_supply: u64) -> Result<(Treasury, TreasuryCap), GovernanceError> {
        if max_supply == 0 || max_supply > MAX_SUPPLY {
            return Err(GovernanceError::InvalidParameter(format!(
                "max_supply {} outside 1..={}",
                max_supply, MAX_SUPPLY
            )));
        }

        let id = ctx.fresh_id();
        let cap = TreasuryCap {
            id: ctx.fresh_id(),
            treasury_id: id,
        };
        let treasury = Treasury {
            id,
            admin: ctx.sender(),
            max_supply,
            total_minted: 0,
            total_burned: 0,
        };
        tracing::info!(treasury = %id, max_supply, "Treasury created");
        Ok((treasury, cap))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Address that received the treasury capability at creation
    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    pub fn total_minted(&self) -> u64 {
        self.total_minted
    }

    pub fn total_burned(&self) -> u64 {
        self.total_burned
    }

    /// Minted minus burned.
    pub fn circulating_supply(&self) -> u64 {
        self.total_minted - self.total_burned
    }

    /// Amount that can still be minted before the cap.
    pub fn remaining_mintable(&self) -> u64 {
        self.max_supply - self.total_minted
    }

    pub fn can_mint(&self, amount: u64) -> bool {
        amount <= self.remaining_mintable()
    }

    /// Mint new ATMOS. Requires the treasury capability.
    pub fn mint(&mut self, cap: &TreasuryCap, amount: u64) -> Result<Coin, GovernanceError> {
        self.check_cap(cap)?;
        self.mint_internal(amount)
    }

    /// Burn ATMOS. Requires the treasury capability.
    pub fn burn(&mut self, cap: &TreasuryCap, coin: Coin) -> Result<u64, Rejected<Coin>> {
        if let Err(e) = self.check_cap(cap) {
            return Err(Rejected::new(e, coin));
        }
        Ok(self.burn_internal(coin))
    }

    pub(crate) fn mint_internal(&mut self, amount: u64) -> Result<Coin, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        if !self.can_mint(amount) {
            return Err(GovernanceError::SupplyCapExceeded {
                requested: amount,
                remaining: self.remaining_mintable(),
            });
        }
        self.total_minted += amount;
        tracing::debug!(amount, total_minted = self.total_minted, "Minted");
        Ok(Coin::from_supply(amount))
    }

    /// Burning an empty coin is a no-op.
    pub(crate) fn burn_internal(&mut self, coin: Coin) -> u64 {
        let amount = coin.into_value();
        self.total_burned += amount;
        if amount > 0 {
            tracing::debug!(amount, total_burned = self.total_burned, "Burned");
        }
        amount
    }

    fn check_cap(&self, cap: &TreasuryCap) -> Result<(), GovernanceError> {
        if cap.treasury_id != self.id {
            return Err(GovernanceError::InvalidTreasuryCap);
        }
        Ok(())
    }
}
