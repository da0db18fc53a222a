//! AtmosPay autonomous agents.
//!
//! An agent moves value on its owner's behalf. Whoever holds the matching
//! `AgentCap` may transact; spending is bounded by a rolling daily limit and
//! a per-transaction cooldown. Each transaction mints the gross amount, burns
//! the governance burn fee, delivers the rest and credits the owner's reward
//! account with 0.1% of the amount.

use std::fmt;
use std::str::FromStr;
use borsh::{BorshDeserialize, BorshSerialize};
use atmos_types::{Address, ObjectId, TxContext};
use crate::coin::Coin;
use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::rewards::{accrue_agent_reward, RewardAccount};
use crate::treasury::Treasury;
use crate::{BPS_DENOMINATOR, MS_PER_DAY};

/// Minimum gap between transactions of one agent.
pub const COOLDOWN_MS: u64 = 60_000;

/// Length of a spending window.
pub const DAY_WINDOW_MS: u64 = MS_PER_DAY;

/// Reward credited to the owner per transaction (0.1%).
pub const AGENT_REWARD_BPS: u64 = 10;

/// Kinds of transaction an agent may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum AgentAction {
    Onramp,
    Offramp,
    Swap,
    Trade,
}

impl AgentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentAction::Onramp => "onramp",
            AgentAction::Offramp => "offramp",
            AgentAction::Swap => "swap",
            AgentAction::Trade => "trade",
        }
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentAction {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onramp" => Ok(AgentAction::Onramp),
            "offramp" => Ok(AgentAction::Offramp),
            "swap" => Ok(AgentAction::Swap),
            "trade" => Ok(AgentAction::Trade),
            other => Err(GovernanceError::UnsupportedAction(other.to_string())),
        }
    }
}

/// Agent state, owned by its creator.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct Agent {
    id: ObjectId,
    owner: Address,
    active: bool,
    /// 0 = unlimited
    daily_limit: u64,
    spent_today: u64,
    day_start_ms: u64,
    /// 0 = never transacted
    last_tx_ms: u64,
    total_volume: u64,
    tx_count: u64,
}

/// Sole authority to transact for one agent.
///
/// Issued by [`create_agent`] only:
///
/// ```compile_fail
/// use atmos_governance::AgentCap;
/// use atmos_types::ObjectId;
/// let cap = AgentCap { id: ObjectId::ZERO, agent_id: ObjectId::ZERO };
/// ```
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct AgentCap {
    id: ObjectId,
    agent_id: ObjectId,
}

impl AgentCap {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn agent_id(&self) -> ObjectId {
        self.agent_id
    }
}

/// Result of a settled agent transaction.
#[derive(Debug, PartialEq, Eq)]
pub struct Transfer {
    pub recipient: Address,
    /// Net amount for the recipient
    pub coin: Coin,
    pub fee_burned: u64,
    pub reward: u64,
}

/// Spending window after lazy rollover, computed without mutating the agent.
#[derive(Debug, Clone, Copy)]
struct Window {
    day_start_ms: u64,
    spent_today: u64,
}

impl Agent {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    /// Spent in the stored window; see [`Agent::remaining_today`] for the
    /// rolled-over view.
    pub fn spent_today(&self) -> u64 {
        self.spent_today
    }

    pub fn day_start_ms(&self) -> u64 {
        self.day_start_ms
    }

    pub fn last_tx_ms(&self) -> u64 {
        self.last_tx_ms
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), GovernanceError> {
        if caller != self.owner {
            return Err(GovernanceError::NotOwner);
        }
        Ok(())
    }

    pub fn deactivate(&mut self, ctx: &TxContext) -> Result<(), GovernanceError> {
        self.ensure_owner(ctx.sender())?;
        if !self.active {
            return Err(GovernanceError::AgentInactive);
        }
        self.active = false;
        tracing::info!(agent = %self.id, "Agent deactivated");
        Ok(())
    }

    pub fn reactivate(&mut self, ctx: &TxContext) -> Result<(), GovernanceError> {
        self.ensure_owner(ctx.sender())?;
        if self.active {
            return Err(GovernanceError::AgentAlreadyActive);
        }
        self.active = true;
        tracing::info!(agent = %self.id, "Agent reactivated");
        Ok(())
    }

    pub fn update_daily_limit(&mut self, ctx: &TxContext, daily_limit: u64) -> Result<(), GovernanceError> {
        self.ensure_owner(ctx.sender())?;
        self.daily_limit = daily_limit;
        tracing::info!(agent = %self.id, daily_limit, "Agent daily limit updated");
        Ok(())
    }

    /// Spending left in the current window, `None` when unlimited.
    pub fn remaining_today(&self, now_ms: u64) -> Option<u64> {
        if self.daily_limit == 0 {
            return None;
        }
        Some(self.daily_limit.saturating_sub(self.window(now_ms).spent_today))
    }

    /// At most one reset per call, even if several days elapsed.
    fn window(&self, now_ms: u64) -> Window {
        if now_ms >= self.day_start_ms.saturating_add(DAY_WINDOW_MS) {
            Window { day_start_ms: now_ms, spent_today: 0 }
        } else {
            Window { day_start_ms: self.day_start_ms, spent_today: self.spent_today }
        }
    }

    /// Checks shared by single and batch transactions. Returns the rolled
    /// window the spend will land in.
    fn preflight(&self, cap: &AgentCap, amount: u64, now_ms: u64) -> Result<Window, GovernanceError> {
        if cap.agent_id != self.id {
            return Err(GovernanceError::InvalidAgentCap);
        }
        if !self.active {
            return Err(GovernanceError::AgentInactive);
        }
        if amount == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        if self.last_tx_ms != 0 && now_ms < self.last_tx_ms.saturating_add(COOLDOWN_MS) {
            return Err(GovernanceError::CooldownActive {
                ready_at_ms: self.last_tx_ms + COOLDOWN_MS,
            });
        }

        let window = self.window(now_ms);
        if self.daily_limit > 0 {
            let total = window.spent_today.checked_add(amount).ok_or(GovernanceError::Overflow)?;
            if total > self.daily_limit {
                return Err(GovernanceError::DailyLimitExceeded {
                    spent: window.spent_today,
                    amount,
                    limit: self.daily_limit,
                });
            }
        }
        Ok(window)
    }
}

/// Create an agent and its capability for the caller.
pub fn create_agent(ctx: &mut TxContext, daily_limit: u64, now_ms: u64) -> (Agent, AgentCap) {
    let agent = Agent {
        id: ctx.fresh_id(),
        owner: ctx.sender(),
        active: true,
        daily_limit,
        spent_today: 0,
        day_start_ms: now_ms,
        last_tx_ms: 0,
        total_volume: 0,
        tx_count: 0,
    };
    let cap = AgentCap {
        id: ctx.fresh_id(),
        agent_id: agent.id,
    };
    tracing::info!(agent = %agent.id, owner = %agent.owner, daily_limit, "Agent created");
    (agent, cap)
}

fn burn_fee(amount: u64, params: &GovernanceParams) -> u64 {
    (amount as u128 * params.burn_rate_bps() as u128 / BPS_DENOMINATOR as u128) as u64
}

fn agent_reward(amount: u64) -> u64 {
    (amount as u128 * AGENT_REWARD_BPS as u128 / BPS_DENOMINATOR as u128) as u64
}

/// Mint, burn the fee, credit the reward. Callers have already verified the
/// mint fits under the supply cap.
fn settle(
    agent_id: ObjectId,
    treasury: &mut Treasury,
    params: &GovernanceParams,
    reward_account: &mut RewardAccount,
    recipient: Address,
    amount: u64,
) -> Result<Transfer, GovernanceError> {
    let mut coin = treasury.mint_internal(amount)?;
    let fee = coin.split(burn_fee(amount, params))?;
    let fee_burned = treasury.burn_internal(fee);

    let reward = agent_reward(amount);
    if reward > 0 {
        accrue_agent_reward(reward_account, reward, agent_id);
    }

    Ok(Transfer { recipient, coin, fee_burned, reward })
}

/// Execute one agent transaction.
#[allow(clippy::too_many_arguments)]
pub fn transact(
    agent: &mut Agent,
    cap: &AgentCap,
    treasury: &mut Treasury,
    params: &GovernanceParams,
    reward_account: &mut RewardAccount,
    recipient: Address,
    amount: u64,
    action: AgentAction,
    now_ms: u64,
) -> Result<Transfer, GovernanceError> {
    let window = agent.preflight(cap, amount, now_ms)?;
    if reward_account.owner() != agent.owner {
        return Err(GovernanceError::NotOwner);
    }
    if !treasury.can_mint(amount) {
        return Err(GovernanceError::SupplyCapExceeded {
            requested: amount,
            remaining: treasury.remaining_mintable(),
        });
    }

    let transfer = settle(agent.id, treasury, params, reward_account, recipient, amount)?;

    agent.day_start_ms = window.day_start_ms;
    agent.spent_today = window.spent_today + amount;
    agent.last_tx_ms = now_ms;
    agent.total_volume = agent.total_volume.saturating_add(amount);
    agent.tx_count += 1;

    tracing::info!(
        agent = %agent.id,
        action = %action,
        recipient = %recipient,
        amount,
        net = transfer.coin.value(),
        fee_burned = transfer.fee_burned,
        spent_today = agent.spent_today,
        "Agent transaction settled"
    );
    Ok(transfer)
}

/// Pay several recipients in one call.
///
/// The batch is one spend: cooldown is checked once, the daily limit is
/// checked against the batch total, and either every payment settles or
/// none does.
#[allow(clippy::too_many_arguments)]
pub fn batch_transact(
    agent: &mut Agent,
    cap: &AgentCap,
    treasury: &mut Treasury,
    params: &GovernanceParams,
    reward_account: &mut RewardAccount,
    recipients: &[Address],
    amounts: &[u64],
    action: AgentAction,
    now_ms: u64,
) -> Result<Vec<Transfer>, GovernanceError> {
    if recipients.len() != amounts.len() {
        return Err(GovernanceError::BatchLengthMismatch {
            recipients: recipients.len(),
            amounts: amounts.len(),
        });
    }
    if amounts.is_empty() {
        return Err(GovernanceError::InvalidParameter("Empty batch".to_string()));
    }
    if amounts.contains(&0) {
        return Err(GovernanceError::ZeroAmount);
    }
    let total = amounts
        .iter()
        .try_fold(0u64, |acc, a| acc.checked_add(*a))
        .ok_or(GovernanceError::Overflow)?;

    let window = agent.preflight(cap, total, now_ms)?;
    if reward_account.owner() != agent.owner {
        return Err(GovernanceError::NotOwner);
    }
    if !treasury.can_mint(total) {
        return Err(GovernanceError::SupplyCapExceeded {
            requested: total,
            remaining: treasury.remaining_mintable(),
        });
    }

    let transfers = recipients
        .iter()
        .zip(amounts)
        .map(|(recipient, amount)| settle(agent.id, treasury, params, reward_account, *recipient, *amount))
        .collect::<Result<Vec<_>, _>>()?;

    agent.day_start_ms = window.day_start_ms;
    agent.spent_today = window.spent_today + total;
    agent.last_tx_ms = now_ms;
    agent.total_volume = agent.total_volume.saturating_add(total);
    agent.tx_count += amounts.len() as u64;

    tracing::info!(
        agent = %agent.id,
        action = %action,
        payments = transfers.len(),
        total,
        spent_today = agent.spent_today,
        "Agent batch settled"
    );
    Ok(transfers)
}
