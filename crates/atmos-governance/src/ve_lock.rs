//! Vote-escrow locking.
//!
//! Deposited ATMOS becomes a `VeLock` whose voting power decays linearly to
//! zero at the unlock time:
//!
//! `voting_power = amount * (unlock_time - now) / MAX_LOCK_DURATION_MS`

use borsh::BorshSerialize;
use atmos_types::{Address, ObjectId, TxContext};
use crate::coin::Coin;
use crate::error::{GovernanceError, Rejected};
use crate::treasury::Treasury;
use crate::{BPS_DENOMINATOR, MS_PER_DAY};

/// Shortest allowed lock (7 days).
pub const MIN_LOCK_DURATION_MS: u64 = 7 * MS_PER_DAY;

/// Longest allowed lock (2 years).
pub const MAX_LOCK_DURATION_MS: u64 = 730 * MS_PER_DAY;

/// Share of the locked amount burned on early unlock (30%).
pub const EARLY_UNLOCK_PENALTY_BPS: u64 = 3_000;

/// A vote-escrowed ATMOS position.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct VeLock {
    id: ObjectId,
    owner: Address,
    locked: Coin,
    created_at_ms: u64,
    unlock_time_ms: u64,
    /// Cumulative share granted to delegates
    delegated_bps: u16,
    /// Last reward epoch this lock accrued in, 0 if never
    last_reward_epoch: u64,
}

impl VeLock {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn unlock_time_ms(&self) -> u64 {
        self.unlock_time_ms
    }

    pub fn delegated_bps(&self) -> u16 {
        self.delegated_bps
    }

    pub fn last_reward_epoch(&self) -> u64 {
        self.last_reward_epoch
    }

    pub fn amount(&self) -> u64 {
        self.locked.value()
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.unlock_time_ms
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.unlock_time_ms.saturating_sub(now_ms)
    }

    /// Time-decayed voting power. Pure function of stored state and `now_ms`.
    pub fn voting_power(&self, now_ms: u64) -> u64 {
        let remaining = self.remaining_ms(now_ms).min(MAX_LOCK_DURATION_MS);
        (self.amount() as u128 * remaining as u128 / MAX_LOCK_DURATION_MS as u128) as u64
    }

    /// `share_bps` of the voting power at `now_ms`.
    pub fn power_for_share(&self, share_bps: u16, now_ms: u64) -> u64 {
        (self.voting_power(now_ms) as u128 * share_bps as u128 / BPS_DENOMINATOR as u128) as u64
    }

    /// Share the owner still holds after delegations.
    pub fn undelegated_bps(&self) -> u16 {
        (BPS_DENOMINATOR as u16).saturating_sub(self.delegated_bps)
    }

    /// Voting power the owner still holds after delegations.
    pub fn undelegated_power(&self, now_ms: u64) -> u64 {
        self.power_for_share(self.undelegated_bps(), now_ms)
    }

    /// Callers check the 10000 bps ceiling first.
    pub(crate) fn add_delegation(&mut self, share_bps: u16) {
        self.delegated_bps += share_bps;
    }

    pub(crate) fn remove_delegation(&mut self, share_bps: u16) {
        self.delegated_bps = self.delegated_bps.saturating_sub(share_bps);
    }

    pub(crate) fn mark_rewarded(&mut self, epoch: u64) {
        self.last_reward_epoch = epoch;
    }

    /// Push the unlock time out by `extra_duration_ms`.
    pub fn extend_lock(&mut self, extra_duration_ms: u64, now_ms: u64) -> Result<(), GovernanceError> {
        if self.is_expired(now_ms) {
            return Err(GovernanceError::LockExpired);
        }
        if extra_duration_ms == 0 {
            return Err(GovernanceError::InvalidDuration(extra_duration_ms));
        }
        let new_unlock = self
            .unlock_time_ms
            .checked_add(extra_duration_ms)
            .ok_or(GovernanceError::Overflow)?;
        if new_unlock - now_ms > MAX_LOCK_DURATION_MS {
            return Err(GovernanceError::InvalidDuration(new_unlock - now_ms));
        }

        self.unlock_time_ms = new_unlock;
        tracing::info!(lock = %self.id, unlock_time_ms = new_unlock, "Lock extended");
        Ok(())
    }

    /// Add more ATMOS without changing the unlock time.
    pub fn increase_lock(&mut self, deposit: Coin, now_ms: u64) -> Result<(), Rejected<Coin>> {
        if deposit.is_zero() {
            return Err(Rejected::new(GovernanceError::ZeroAmount, deposit));
        }
        if self.is_expired(now_ms) {
            return Err(Rejected::new(GovernanceError::LockExpired, deposit));
        }

        self.locked.join(deposit)?;
        tracing::info!(lock = %self.id, amount = self.amount(), "Lock increased");
        Ok(())
    }
}

/// Lock `deposit` for `duration_ms`.
pub fn lock(ctx: &mut TxContext, deposit: Coin, duration_ms: u64, now_ms: u64) -> Result<VeLock, Rejected<Coin>> {
    if deposit.is_zero() {
        return Err(Rejected::new(GovernanceError::ZeroAmount, deposit));
    }
    if !(MIN_LOCK_DURATION_MS..=MAX_LOCK_DURATION_MS).contains(&duration_ms) {
        return Err(Rejected::new(GovernanceError::InvalidDuration(duration_ms), deposit));
    }
    let Some(unlock_time_ms) = now_ms.checked_add(duration_ms) else {
        return Err(Rejected::new(GovernanceError::Overflow, deposit));
    };

    let lock = VeLock {
        id: ctx.fresh_id(),
        owner: ctx.sender(),
        locked: deposit,
        created_at_ms: now_ms,
        unlock_time_ms,
        delegated_bps: 0,
        last_reward_epoch: 0,
    };
    tracing::info!(
        lock = %lock.id,
        owner = %lock.owner,
        amount = lock.amount(),
        unlock_time_ms,
        "Lock created"
    );
    Ok(lock)
}

/// Fold `src` into `dst`. The merged lock unlocks at the later of the two.
pub fn merge_locks(dst: &mut VeLock, mut src: VeLock) -> Result<(), Rejected<VeLock>> {
    if dst.owner != src.owner {
        return Err(Rejected::new(GovernanceError::NotOwner, src));
    }
    if src.delegated_bps > 0 {
        let bps = src.delegated_bps;
        return Err(Rejected::new(GovernanceError::LockHasDelegations(bps), src));
    }

    let locked = src.locked.take_all();
    if let Err(rejected) = dst.locked.join(locked) {
        let (error, coin) = rejected.into_parts();
        src.locked = coin;
        return Err(Rejected::new(error, src));
    }
    dst.unlock_time_ms = dst.unlock_time_ms.max(src.unlock_time_ms);
    // Power that already accrued this epoch must not accrue again through dst
    dst.last_reward_epoch = dst.last_reward_epoch.max(src.last_reward_epoch);

    tracing::info!(dst = %dst.id, src = %src.id, amount = dst.amount(), "Locks merged");
    Ok(())
}

/// Withdraw the full amount once the lock has matured.
pub fn unlock(lock: VeLock, now_ms: u64) -> Result<Coin, Rejected<VeLock>> {
    if !lock.is_expired(now_ms) {
        let unlock_time_ms = lock.unlock_time_ms;
        return Err(Rejected::new(GovernanceError::NotYetUnlockable { unlock_time_ms }, lock));
    }

    tracing::info!(lock = %lock.id, amount = lock.amount(), "Lock released");
    Ok(lock.locked)
}

/// Withdraw before maturity. 30% is burned, the remaining
/// `floor(amount * 0.7)` is returned.
pub fn early_unlock(lock: VeLock, treasury: &mut Treasury, now_ms: u64) -> Result<Coin, Rejected<VeLock>> {
    if lock.is_expired(now_ms) {
        return Err(Rejected::new(GovernanceError::AlreadyUnlockable, lock));
    }

    let amount = lock.amount();
    let kept = (amount as u128 * (BPS_DENOMINATOR - EARLY_UNLOCK_PENALTY_BPS) as u128
        / BPS_DENOMINATOR as u128) as u64;
    let VeLock { id, mut locked, .. } = lock;
    let returned = locked.split(kept).unwrap_or_else(|_| Coin::zero());
    let burned = treasury.burn_internal(locked);

    tracing::warn!(lock = %id, returned = returned.value(), burned, "Lock released early with penalty");
    Ok(returned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::delegate;
    use crate::params::GovernanceParams;
    use proptest::prelude::*;

    const DAY: u64 = MS_PER_DAY;

    fn ctx() -> TxContext {
        TxContext::for_sender(Address::from_bytes([1u8; 20]))
    }

    fn new_lock(ctx: &mut TxContext, amount: u64, duration_ms: u64, now_ms: u64) -> VeLock {
        lock(ctx, Coin::from_supply(amount), duration_ms, now_ms).unwrap()
    }

    #[test]
    fn test_lock_creation() {
        let mut ctx = ctx();
        let l = new_lock(&mut ctx, 1_000, 30 * DAY, 100);
        assert_eq!(l.amount(), 1_000);
        assert_eq!(l.created_at_ms(), 100);
        assert_eq!(l.unlock_time_ms(), 100 + 30 * DAY);
        assert!(l.unlock_time_ms() > l.created_at_ms());
        assert_eq!(l.owner(), Address::from_bytes([1u8; 20]));
    }

    #[test]
    fn test_lock_rejects_bad_input() {
        let mut ctx = ctx();
        let r = lock(&mut ctx, Coin::zero(), 30 * DAY, 0).unwrap_err();
        assert_eq!(r.error, GovernanceError::ZeroAmount);

        let r = lock(&mut ctx, Coin::from_supply(5), 7 * DAY - 1, 0).unwrap_err();
        assert_eq!(r.error, GovernanceError::InvalidDuration(7 * DAY - 1));
        // Deposit handed back
        assert_eq!(r.value.value(), 5);

        let r = lock(&mut ctx, Coin::from_supply(5), MAX_LOCK_DURATION_MS + 1, 0).unwrap_err();
        assert_eq!(r.error, GovernanceError::InvalidDuration(MAX_LOCK_DURATION_MS + 1));
    }

    #[test]
    fn test_voting_power_full_duration() {
        let mut ctx = ctx();
        let l = new_lock(&mut ctx, 1_000, MAX_LOCK_DURATION_MS, 0);
        assert_eq!(l.voting_power(0), 1_000);
        assert_eq!(l.voting_power(MAX_LOCK_DURATION_MS / 2), 500);
        assert_eq!(l.voting_power(MAX_LOCK_DURATION_MS), 0);
        assert_eq!(l.voting_power(MAX_LOCK_DURATION_MS + 1), 0);
    }

    #[test]
    fn test_voting_power_one_year() {
        let mut ctx = ctx();
        let l = new_lock(&mut ctx, 730, 365 * DAY, 0);
        assert_eq!(l.voting_power(0), 365);
        assert!(l.voting_power(180 * DAY) < l.voting_power(0));
        assert!(l.voting_power(180 * DAY) > 0);
    }

    #[test]
    fn test_extend_lock() {
        let mut ctx = ctx();
        let mut l = new_lock(&mut ctx, 1_000, 30 * DAY, 0);

        l.extend_lock(30 * DAY, 0).unwrap();
        assert_eq!(l.unlock_time_ms(), 60 * DAY);

        assert_eq!(l.extend_lock(0, 0), Err(GovernanceError::InvalidDuration(0)));
        assert!(l.extend_lock(MAX_LOCK_DURATION_MS, 0).is_err());
        assert_eq!(l.unlock_time_ms(), 60 * DAY);

        assert_eq!(l.extend_lock(DAY, 60 * DAY), Err(GovernanceError::LockExpired));
    }

    #[test]
    fn test_increase_lock() {
        let mut ctx = ctx();
        let mut l = new_lock(&mut ctx, 1_000, 30 * DAY, 0);
        l.increase_lock(Coin::from_supply(500), DAY).unwrap();
        assert_eq!(l.amount(), 1_500);
        assert_eq!(l.unlock_time_ms(), 30 * DAY);

        let r = l.increase_lock(Coin::zero(), DAY).unwrap_err();
        assert_eq!(r.error, GovernanceError::ZeroAmount);
    }

    #[test]
    fn test_merge_locks() {
        let mut ctx = ctx();
        let mut dst = new_lock(&mut ctx, 1_000, 30 * DAY, 0);
        let src = new_lock(&mut ctx, 500, 90 * DAY, 0);

        merge_locks(&mut dst, src).unwrap();
        assert_eq!(dst.amount(), 1_500);
        assert_eq!(dst.unlock_time_ms(), 90 * DAY);
    }

    #[test]
    fn test_merge_rejects_foreign_or_delegated() {
        let mut ctx = ctx();
        let mut dst = new_lock(&mut ctx, 1_000, 30 * DAY, 0);

        let mut other = TxContext::for_sender(Address::from_bytes([2u8; 20]));
        let foreign = new_lock(&mut other, 500, 30 * DAY, 0);
        let r = merge_locks(&mut dst, foreign).unwrap_err();
        assert_eq!(r.error, GovernanceError::NotOwner);

        let mut delegated = new_lock(&mut ctx, 500, 30 * DAY, 0);
        let params = GovernanceParams::new(Address::from_bytes([9u8; 20]));
        let _receipt = delegate(&mut ctx, &mut delegated, &params, Address::from_bytes([3u8; 20]), 2_500, 0, 0).unwrap();
        let r = merge_locks(&mut dst, delegated).unwrap_err();
        assert_eq!(r.error, GovernanceError::LockHasDelegations(2_500));
        assert_eq!(dst.amount(), 1_000);
    }

    #[test]
    fn test_unlock() {
        let mut ctx = ctx();
        let l = new_lock(&mut ctx, 1_000, 30 * DAY, 0);

        let r = unlock(l, 30 * DAY - 1).unwrap_err();
        assert_eq!(r.error, GovernanceError::NotYetUnlockable { unlock_time_ms: 30 * DAY });

        let coin = unlock(r.into_inner(), 30 * DAY).unwrap();
        assert_eq!(coin.value(), 1_000);
    }

    #[test]
    fn test_early_unlock_burns_penalty() {
        let mut ctx = ctx();
        let (mut treasury, cap) = Treasury::new(&mut ctx, 10_000).unwrap();
        let deposit = treasury.mint(&cap, 1_000).unwrap();
        let l = lock(&mut ctx, deposit, 30 * DAY, 0).unwrap();

        let coin = early_unlock(l, &mut treasury, DAY).unwrap();
        assert_eq!(coin.value(), 700);
        assert_eq!(treasury.total_burned(), 300);
        assert_eq!(treasury.circulating_supply(), 700);
    }

    #[test]
    fn test_early_unlock_after_maturity_rejected() {
        let mut ctx = ctx();
        let (mut treasury, _cap) = Treasury::new(&mut ctx, 10_000).unwrap();
        let l = new_lock(&mut ctx, 1_000, 7 * DAY, 0);
        let r = early_unlock(l, &mut treasury, 7 * DAY).unwrap_err();
        assert_eq!(r.error, GovernanceError::AlreadyUnlockable);
        assert_eq!(treasury.total_burned(), 0);
    }

    proptest! {
        #[test]
        fn prop_voting_power_non_increasing(
            amount in 1u64..1_000_000_000_000_000,
            duration in MIN_LOCK_DURATION_MS..=MAX_LOCK_DURATION_MS,
            t1 in 0u64..800 * DAY,
            dt in 0u64..800 * DAY,
        ) {
            let mut ctx = ctx();
            let l = new_lock(&mut ctx, amount, duration, 0);
            prop_assert!(l.voting_power(t1 + dt) <= l.voting_power(t1));
            prop_assert!(l.voting_power(0) <= amount);
            prop_assert_eq!(l.voting_power(duration), 0);
        }

        #[test]
        fn prop_early_unlock_returns_seventy_percent(
            amount in 1u64..1_000_000_000_000_000,
            at in 0u64..7 * DAY,
        ) {
            let mut ctx = ctx();
            let (mut treasury, cap) = Treasury::new(&mut ctx, crate::treasury::MAX_SUPPLY).unwrap();
            let deposit = treasury.mint(&cap, amount).unwrap();
            let l = lock(&mut ctx, deposit, 7 * DAY, 0).unwrap();

            let coin = early_unlock(l, &mut treasury, at).unwrap();
            prop_assert_eq!(coin.value() as u128, amount as u128 * 7 / 10);
            prop_assert_eq!(coin.value() + treasury.total_burned(), amount);
        }
    }
}
