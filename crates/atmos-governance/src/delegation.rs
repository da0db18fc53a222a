//! Fee-bearing partial delegation of a lock's voting power.
//!
//! A lock owner grants a basis-point share of the lock's power to a delegate,
//! who receives a `DelegationReceipt`. The fee is a bookkeeping split of the
//! delegated power between delegate and delegator; it is never transferred.

use borsh::BorshSerialize;
use atmos_types::{Address, ObjectId, TxContext};
use crate::error::{GovernanceError, Rejected};
use crate::params::GovernanceParams;
use crate::ve_lock::VeLock;
use crate::BPS_DENOMINATOR;

/// Receipt held by the delegate.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct DelegationReceipt {
    id: ObjectId,
    delegate: Address,
    delegator: Address,
    lock_id: ObjectId,
    share_bps: u16,
    fee_bps: u16,
    created_at_ms: u64,
}

impl DelegationReceipt {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn delegate(&self) -> Address {
        self.delegate
    }

    pub fn delegator(&self) -> Address {
        self.delegator
    }

    pub fn lock_id(&self) -> ObjectId {
        self.lock_id
    }

    pub fn share_bps(&self) -> u16 {
        self.share_bps
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }
}

/// Delegated power at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegatedPower {
    /// `voting_power * share_bps / 10000`
    pub gross: u64,
    /// Delegator's cut, `gross * fee_bps / 10000`
    pub fee: u64,
    /// Power usable by the delegate
    pub net: u64,
}

/// Grant `share_bps` of `lock` to `delegate_addr`.
pub fn delegate(
    ctx: &mut TxContext,
    lock: &mut VeLock,
    params: &GovernanceParams,
    delegate_addr: Address,
    share_bps: u16,
    fee_bps: u16,
    now_ms: u64,
) -> Result<DelegationReceipt, GovernanceError> {
    if share_bps == 0 || share_bps as u64 > BPS_DENOMINATOR {
        return Err(GovernanceError::InvalidShare(share_bps));
    }
    if fee_bps > params.max_delegation_fee_bps() {
        return Err(GovernanceError::FeeTooHigh {
            fee_bps,
            max_bps: params.max_delegation_fee_bps(),
        });
    }
    if delegate_addr == lock.owner() {
        return Err(GovernanceError::SelfDelegation);
    }
    if lock.is_expired(now_ms) {
        return Err(GovernanceError::LockExpired);
    }
    if lock.delegated_bps() as u64 + share_bps as u64 > BPS_DENOMINATOR {
        return Err(GovernanceError::DelegationShareExceeded {
            delegated: lock.delegated_bps(),
            requested: share_bps,
        });
    }

    lock.add_delegation(share_bps);
    let receipt = DelegationReceipt {
        id: ctx.fresh_id(),
        delegate: delegate_addr,
        delegator: lock.owner(),
        lock_id: lock.id(),
        share_bps,
        fee_bps,
        created_at_ms: now_ms,
    };

    tracing::info!(
        lock = %lock.id(),
        delegate = %delegate_addr,
        share_bps,
        fee_bps,
        total_delegated_bps = lock.delegated_bps(),
        "Voting power delegated"
    );
    Ok(receipt)
}

/// Effective power a receipt carries at `now_ms`.
pub fn delegated_power(
    lock: &VeLock,
    receipt: &DelegationReceipt,
    now_ms: u64,
) -> Result<DelegatedPower, GovernanceError> {
    if receipt.lock_id != lock.id() {
        return Err(GovernanceError::ReceiptLockMismatch);
    }
    Ok(DelegatedPower::split(lock.power_for_share(receipt.share_bps, now_ms), receipt.fee_bps))
}

impl DelegatedPower {
    /// Split `gross` power between delegator fee and delegate.
    pub(crate) fn split(gross: u64, fee_bps: u16) -> Self {
        let fee = (gross as u128 * fee_bps as u128 / BPS_DENOMINATOR as u128) as u64;
        DelegatedPower {
            gross,
            fee,
            net: gross - fee,
        }
    }
}

/// Surrender a receipt, returning its share to the lock owner.
pub fn undelegate(lock: &mut VeLock, receipt: DelegationReceipt) -> Result<(), Rejected<DelegationReceipt>> {
    if receipt.lock_id != lock.id() {
        return Err(Rejected::new(GovernanceError::ReceiptLockMismatch, receipt));
    }

    lock.remove_delegation(receipt.share_bps);
    tracing::info!(
        lock = %lock.id(),
        receipt = %receipt.id,
        total_delegated_bps = lock.delegated_bps(),
        "Delegation revoked"
    );
    Ok(())
}
