//! Atmos Governance - State transitions for the ATMOS governance and payments protocol.
//!
//! This crate provides:
//! - Vote-escrow locking with linearly decaying voting power
//! - Partial, fee-bearing delegation
//! - Quadratic proposal voting
//! - Futarchy prediction markets
//! - Epoch-based reward distribution
//! - AtmosPay agents with spend limits and cooldowns
//!
//! Every time-gated operation takes the current time in milliseconds as an
//! argument; nothing here reads a wall clock.

pub mod coin;
pub mod treasury;
pub mod params;
pub mod ve_lock;
pub mod delegation;
pub mod voting;
pub mod futarchy;
pub mod rewards;
pub mod agent;
pub mod error;

pub use coin::Coin;
pub use treasury::{Treasury, TreasuryCap, MAX_SUPPLY, ONE_ATMOS};
pub use params::GovernanceParams;
pub use ve_lock::{early_unlock, lock, merge_locks, unlock, VeLock};
pub use delegation::{delegate, delegated_power, undelegate, DelegatedPower, DelegationReceipt};
pub use voting::{create_proposal, execute_proposal, mark_executed, vote, vote_delegated, Proposal, ProposalStatus};
pub use futarchy::{Bet, Market};
pub use rewards::{RewardAccount, RewardPool};
pub use agent::{batch_transact, create_agent, transact, Agent, AgentAction, AgentCap, Transfer};
pub use error::{ErrorKind, GovernanceError, Rejected};

/// Basis-point denominator (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Milliseconds per day.
pub const MS_PER_DAY: u64 = 86_400_000;
