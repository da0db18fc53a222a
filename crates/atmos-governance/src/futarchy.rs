//! Binary prediction market attached to a proposal.
//!
//! Markets go through states: Open -> Resolved
//!
//! Winners split the whole losing pool pro rata on top of their own stake,
//! so payouts sum to `yes_pool + no_pool` exactly. The last outstanding
//! winning claim takes whatever remains in escrow, absorbing rounding dust.

use borsh::BorshSerialize;
use atmos_types::{Address, ObjectId, TxContext};
use crate::coin::Coin;
use crate::error::{GovernanceError, Rejected};
use crate::voting::Proposal;

/// Prediction market.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct Market {
    id: ObjectId,
    proposal_id: ObjectId,
    resolver: Address,
    created_at_ms: u64,
    end_time_ms: u64,
    yes_pool: u64,
    no_pool: u64,
    resolved: bool,
    /// Meaningful only once `resolved`
    yes_won: bool,
    /// Winning stake not yet claimed
    winning_outstanding: u64,
    escrow: Coin,
}

/// A stake on one side of a market, held by the bettor.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct Bet {
    id: ObjectId,
    market_id: ObjectId,
    bettor: Address,
    yes: bool,
    amount: u64,
}

impl Bet {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn market_id(&self) -> ObjectId {
        self.market_id
    }

    pub fn bettor(&self) -> Address {
        self.bettor
    }

    /// Side backed by this bet.
    pub fn is_yes(&self) -> bool {
        self.yes
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }
}

impl Market {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn proposal_id(&self) -> ObjectId {
        self.proposal_id
    }

    pub fn resolver(&self) -> Address {
        self.resolver
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn end_time_ms(&self) -> u64 {
        self.end_time_ms
    }

    pub fn yes_pool(&self) -> u64 {
        self.yes_pool
    }

    pub fn no_pool(&self) -> u64 {
        self.no_pool
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Winning side, once resolved.
    pub fn yes_won(&self) -> Option<bool> {
        self.resolved.then_some(self.yes_won)
    }

    pub fn is_open(&self, now_ms: u64) -> bool {
        now_ms < self.end_time_ms
    }

    /// Value still held for claimants.
    pub fn escrow_balance(&self) -> u64 {
        self.escrow.value()
    }

    /// No stake on the winning side; every bet is refunded.
    pub fn is_void(&self) -> bool {
        self.resolved && self.winning_pool() == 0
    }

    pub fn winning_pool(&self) -> u64 {
        if self.yes_won {
            self.yes_pool
        } else {
            self.no_pool
        }
    }

    pub fn losing_pool(&self) -> u64 {
        if self.yes_won {
            self.no_pool
        } else {
            self.yes_pool
        }
    }

    /// Payout a winning bet of `amount` would receive if claimed now.
    pub fn payout_for(&self, amount: u64) -> u64 {
        if amount >= self.winning_outstanding {
            return self.escrow.value();
        }
        let share = amount as u128 * self.losing_pool() as u128 / self.winning_pool() as u128;
        amount + share as u64
    }
}

/// Open a market on `proposal`, closing after `duration_ms`.
pub fn create_market(
    ctx: &mut TxContext,
    proposal: &Proposal,
    resolver: Address,
    duration_ms: u64,
    now_ms: u64,
) -> Result<Market, GovernanceError> {
    if duration_ms == 0 {
        return Err(GovernanceError::InvalidParameter("Market duration cannot be 0".to_string()));
    }
    let end_time_ms = now_ms.checked_add(duration_ms).ok_or(GovernanceError::Overflow)?;

    let market = Market {
        id: ctx.fresh_id(),
        proposal_id: proposal.id(),
        resolver,
        created_at_ms: now_ms,
        end_time_ms,
        yes_pool: 0,
        no_pool: 0,
        resolved: false,
        yes_won: false,
        winning_outstanding: 0,
        escrow: Coin::zero(),
    };

    tracing::info!(market = %market.id, proposal = %proposal.id(), resolver = %resolver, end_time_ms, "Market created");
    Ok(market)
}

/// Stake on one side while the market is open.
pub fn bet(ctx: &mut TxContext, market: &mut Market, stake: Coin, yes: bool, now_ms: u64) -> Result<Bet, Rejected<Coin>> {
    if !market.is_open(now_ms) {
        return Err(Rejected::new(GovernanceError::MarketClosed, stake));
    }
    if stake.is_zero() {
        return Err(Rejected::new(GovernanceError::ZeroAmount, stake));
    }

    let amount = stake.value();
    market.escrow.join(stake)?;
    // Both pools are bounded by the escrow
    if yes {
        market.yes_pool += amount;
    } else {
        market.no_pool += amount;
    }

    let bet = Bet {
        id: ctx.fresh_id(),
        market_id: market.id,
        bettor: ctx.sender(),
        yes,
        amount,
    };
    tracing::info!(market = %market.id, bettor = %bet.bettor, yes, amount, "Bet placed");
    Ok(bet)
}

/// Fix the winning side. Resolver only, once, after the end time.
pub fn resolve(ctx: &TxContext, market: &mut Market, yes_won: bool, now_ms: u64) -> Result<(), GovernanceError> {
    if market.is_open(now_ms) {
        return Err(GovernanceError::MarketStillOpen);
    }
    if ctx.sender() != market.resolver {
        return Err(GovernanceError::NotResolver);
    }
    if market.resolved {
        return Err(GovernanceError::AlreadyResolved);
    }

    market.resolved = true;
    market.yes_won = yes_won;
    market.winning_outstanding = market.winning_pool();

    tracing::info!(
        market = %market.id,
        yes_won,
        yes_pool = market.yes_pool,
        no_pool = market.no_pool,
        void = market.is_void(),
        "Market resolved"
    );
    Ok(())
}

/// Redeem a bet. Losing bets yield an empty coin; the bet is consumed either way.
pub fn claim(market: &mut Market, bet: Bet) -> Result<Coin, Rejected<Bet>> {
    if bet.market_id != market.id {
        return Err(Rejected::new(GovernanceError::WrongMarket, bet));
    }
    if !market.resolved {
        return Err(Rejected::new(GovernanceError::MarketNotResolved, bet));
    }

    let payout = if market.is_void() {
        // Escrow holds exactly the losing stakes
        bet.amount
    } else if bet.yes != market.yes_won {
        tracing::debug!(market = %market.id, bet = %bet.id, "Losing bet claimed");
        return Ok(Coin::zero());
    } else {
        let payout = market.payout_for(bet.amount);
        market.winning_outstanding = market.winning_outstanding.saturating_sub(bet.amount);
        payout
    };

    let coin = match market.escrow.split(payout) {
        Ok(coin) => coin,
        Err(e) => return Err(Rejected::new(e, bet)),
    };
    tracing::info!(market = %market.id, bet = %bet.id, payout, "Bet claimed");
    Ok(coin)
}
