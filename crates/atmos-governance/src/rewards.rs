//! Epoch-based reward distribution.
//!
//! Each epoch (at least 7 days) reserves `available * rate_bps / 10000 + bonus`
//! of the pool. Holders accrue a share proportional to their voting power
//! against the total-voting-power snapshot taken when the epoch opened.
//! Unaccrued remainder is released back to the pool at the next advance.
//!
//! AtmosPay credits flat agent bonuses outside the epoch mechanism; those
//! are minted from the treasury on claim.

use borsh::BorshSerialize;
use atmos_types::{Address, ObjectId, TxContext};
use crate::coin::Coin;
use crate::error::{GovernanceError, Rejected};
use crate::treasury::Treasury;
use crate::ve_lock::VeLock;
use crate::{BPS_DENOMINATOR, MS_PER_DAY};

/// Minimum time between epoch advances.
pub const EPOCH_INTERVAL_MS: u64 = 7 * MS_PER_DAY;

/// Default per-epoch distribution rate (10% of the pool).
pub const DEFAULT_EPOCH_RATE_BPS: u16 = 1_000;

/// Shared reward pool.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct RewardPool {
    id: ObjectId,
    balance: Coin,
    epoch: u64,
    rate_bps: u16,
    last_advance_ms: u64,
    /// Amount reserved for the current epoch
    epoch_distributable: u64,
    /// Portion of the current epoch already accrued to accounts
    epoch_accrued: u64,
    /// Total voting power snapshot for the current epoch
    epoch_total_power: u64,
    /// Accrued to accounts but not yet claimed
    outstanding_accrued: u64,
}

/// Per-holder reward ledger.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct RewardAccount {
    id: ObjectId,
    owner: Address,
    /// Accrued but unclaimed, agent bonuses included
    accrued: u64,
    /// Part of `accrued` that came from agent activity
    agent_accrued: u64,
    total_claimed: u64,
    /// 0 until the first accrual
    last_accrual_epoch: u64,
}

impl RewardAccount {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn accrued(&self) -> u64 {
        self.accrued
    }

    pub fn agent_accrued(&self) -> u64 {
        self.agent_accrued
    }

    pub fn total_claimed(&self) -> u64 {
        self.total_claimed
    }

    pub fn last_accrual_epoch(&self) -> u64 {
        self.last_accrual_epoch
    }
}

impl RewardPool {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn balance(&self) -> u64 {
        self.balance.value()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn rate_bps(&self) -> u16 {
        self.rate_bps
    }

    pub fn last_advance_ms(&self) -> u64 {
        self.last_advance_ms
    }

    pub fn epoch_distributable(&self) -> u64 {
        self.epoch_distributable
    }

    pub fn epoch_accrued(&self) -> u64 {
        self.epoch_accrued
    }

    pub fn epoch_total_power(&self) -> u64 {
        self.epoch_total_power
    }

    pub fn outstanding_accrued(&self) -> u64 {
        self.outstanding_accrued
    }

    /// Funds committed to accounts or to the current epoch.
    pub fn reserved(&self) -> u64 {
        self.outstanding_accrued + (self.epoch_distributable - self.epoch_accrued)
    }

    /// Funds not yet committed.
    pub fn available(&self) -> u64 {
        self.balance.value() - self.reserved()
    }

    pub fn next_epoch_at(&self) -> u64 {
        self.last_advance_ms.saturating_add(EPOCH_INTERVAL_MS)
    }
}

/// Create an empty pool distributing `rate_bps` per epoch.
pub fn create_pool(ctx: &mut TxContext, rate_bps: u16, now_ms: u64) -> Result<RewardPool, GovernanceError> {
    if rate_bps == 0 || rate_bps as u64 > BPS_DENOMINATOR {
        return Err(GovernanceError::InvalidParameter(format!("rate_bps {} out of range", rate_bps)));
    }

    let pool = RewardPool {
        id: ctx.fresh_id(),
        balance: Coin::zero(),
        epoch: 0,
        rate_bps,
        last_advance_ms: now_ms,
        epoch_distributable: 0,
        epoch_accrued: 0,
        epoch_total_power: 0,
        outstanding_accrued: 0,
    };
    tracing::info!(pool = %pool.id, rate_bps, "Reward pool created");
    Ok(pool)
}

/// Zero-initialized account for the caller.
pub fn create_account(ctx: &mut TxContext) -> RewardAccount {
    RewardAccount {
        id: ctx.fresh_id(),
        owner: ctx.sender(),
        accrued: 0,
        agent_accrued: 0,
        total_claimed: 0,
        last_accrual_epoch: 0,
    }
}

/// Add external funding to the pool.
pub fn deposit_rewards(pool: &mut RewardPool, funds: Coin) -> Result<(), Rejected<Coin>> {
    let amount = funds.value();
    pool.balance.join(funds)?;
    tracing::debug!(pool = %pool.id, amount, balance = pool.balance(), "Rewards deposited");
    Ok(())
}

/// Open the next epoch. `total_voting_power` is the snapshot every accrual in
/// this epoch is measured against.
pub fn advance_epoch(
    pool: &mut RewardPool,
    bonus: Coin,
    total_voting_power: u64,
    now_ms: u64,
) -> Result<u64, Rejected<Coin>> {
    if now_ms < pool.next_epoch_at() {
        let next_epoch_ms = pool.next_epoch_at();
        return Err(Rejected::new(GovernanceError::EpochTooSoon { next_epoch_ms }, bonus));
    }

    let bonus_amount = bonus.value();
    pool.balance.join(bonus)?;

    // Release the unaccrued remainder of the previous epoch
    pool.epoch_distributable = 0;
    pool.epoch_accrued = 0;

    let available = pool.available() - bonus_amount;
    let base = (available as u128 * pool.rate_bps as u128 / BPS_DENOMINATOR as u128) as u64;

    pool.epoch += 1;
    pool.epoch_distributable = base + bonus_amount;
    pool.epoch_total_power = total_voting_power;
    pool.last_advance_ms = now_ms;

    tracing::info!(
        pool = %pool.id,
        epoch = pool.epoch,
        distributable = pool.epoch_distributable,
        total_voting_power,
        "Epoch advanced"
    );
    Ok(pool.epoch)
}

/// Credit the holder's share of the current epoch.
///
/// Each lock accrues at most once per epoch, whichever account it is
/// credited to. One account may collect for several locks of its owner.
pub fn accrue(
    pool: &mut RewardPool,
    account: &mut RewardAccount,
    lock: &mut VeLock,
    now_ms: u64,
) -> Result<u64, GovernanceError> {
    if pool.epoch == 0 {
        return Err(GovernanceError::NoActiveEpoch);
    }
    if lock.owner() != account.owner {
        return Err(GovernanceError::NotOwner);
    }
    if lock.last_reward_epoch() >= pool.epoch {
        return Err(GovernanceError::AlreadyAccrued(pool.epoch));
    }

    let share = if pool.epoch_total_power == 0 {
        0
    } else {
        let power = lock.voting_power(now_ms).min(pool.epoch_total_power);
        let share = pool.epoch_distributable as u128 * power as u128 / pool.epoch_total_power as u128;
        (share as u64).min(pool.epoch_distributable - pool.epoch_accrued)
    };

    pool.epoch_accrued += share;
    pool.outstanding_accrued += share;
    account.accrued += share;
    account.last_accrual_epoch = pool.epoch;
    lock.mark_rewarded(pool.epoch);

    tracing::info!(account = %account.id, lock = %lock.id(), epoch = pool.epoch, share, "Rewards accrued");
    Ok(share)
}

/// Flat bonus for agent activity. Only AtmosPay calls this.
pub(crate) fn accrue_agent_reward(account: &mut RewardAccount, reward_amount: u64, agent_id: ObjectId) {
    account.accrued += reward_amount;
    account.agent_accrued += reward_amount;
    tracing::debug!(account = %account.id, agent = %agent_id, reward_amount, "Agent reward accrued");
}

/// Pay out everything accrued. Epoch rewards come from the pool; agent
/// bonuses are minted.
pub fn claim(
    pool: &mut RewardPool,
    account: &mut RewardAccount,
    treasury: &mut Treasury,
) -> Result<Coin, GovernanceError> {
    if account.accrued == 0 {
        return Err(GovernanceError::NothingToClaim);
    }

    let from_pool = account.accrued - account.agent_accrued;
    let minted = account.agent_accrued;
    if from_pool > pool.outstanding_accrued || from_pool > pool.balance() {
        return Err(GovernanceError::InsufficientBalance {
            available: pool.outstanding_accrued.min(pool.balance()),
            requested: from_pool,
        });
    }
    if !treasury.can_mint(minted) {
        return Err(GovernanceError::SupplyCapExceeded {
            requested: minted,
            remaining: treasury.remaining_mintable(),
        });
    }

    let mut payout = pool.balance.split(from_pool)?;
    pool.outstanding_accrued -= from_pool;
    if minted > 0 {
        // Fits: the sum is `account.accrued`
        payout.join(treasury.mint_internal(minted)?)?;
    }

    let amount = account.accrued;
    account.total_claimed += amount;
    account.accrued = 0;
    account.agent_accrued = 0;

    tracing::info!(account = %account.id, amount, from_pool, minted, "Rewards claimed");
    Ok(payout)
}
