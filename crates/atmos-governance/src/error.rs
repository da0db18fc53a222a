use atmos_types::TypesError;
use thiserror::Error;

/// Errors that can occur in governance operations.
///
/// Every rejection leaves prior state untouched; callers may resubmit with
/// corrected arguments or a later timestamp.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    // Invalid input
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid lock duration: {0} ms")]
    InvalidDuration(u64),

    #[error("Invalid delegation share: {0} bps")]
    InvalidShare(u16),

    #[error("Delegation fee {fee_bps} bps exceeds maximum {max_bps} bps")]
    FeeTooHigh { fee_bps: u16, max_bps: u16 },

    #[error("Self-delegation not allowed")]
    SelfDelegation,

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported agent action: {0}")]
    UnsupportedAction(String),

    #[error("Batch length mismatch: {recipients} recipients, {amounts} amounts")]
    BatchLengthMismatch { recipients: usize, amounts: usize },

    #[error("Zero voting power")]
    ZeroVotingPower,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Types error: {0}")]
    Types(#[from] TypesError),

    // Unauthorized
    #[error("Caller is not the owner")]
    NotOwner,

    #[error("Caller is not the governance admin")]
    NotAdmin,

    #[error("Caller is not the market resolver")]
    NotResolver,

    #[error("Capability does not belong to this agent")]
    InvalidAgentCap,

    #[error("Capability does not belong to this treasury")]
    InvalidTreasuryCap,

    #[error("Bet belongs to a different market")]
    WrongMarket,

    #[error("Receipt was issued against a different lock")]
    ReceiptLockMismatch,

    // State conflict
    #[error("Already voted")]
    AlreadyVoted,

    #[error("Proposal already executed")]
    AlreadyExecuted,

    #[error("Proposal not executable")]
    NotExecutable,

    #[error("Market already resolved")]
    AlreadyResolved,

    #[error("Market not resolved")]
    MarketNotResolved,

    #[error("Agent is inactive")]
    AgentInactive,

    #[error("Agent is already active")]
    AgentAlreadyActive,

    #[error("Cooldown active until {ready_at_ms} ms")]
    CooldownActive { ready_at_ms: u64 },

    #[error("Lock has outstanding delegations ({0} bps)")]
    LockHasDelegations(u16),

    #[error("Lock expired")]
    LockExpired,

    #[error("Epoch {0} already accrued")]
    AlreadyAccrued(u64),

    #[error("No reward epoch has started")]
    NoActiveEpoch,

    #[error("Nothing to claim")]
    NothingToClaim,

    // Limit exceeded
    #[error("Daily limit exceeded: spent {spent} + {amount} > {limit}")]
    DailyLimitExceeded { spent: u64, amount: u64, limit: u64 },

    #[error("Supply cap exceeded: requested {requested}, remaining {remaining}")]
    SupplyCapExceeded { requested: u64, remaining: u64 },

    #[error("Delegation share exceeded: {delegated} + {requested} bps > 10000")]
    DelegationShareExceeded { delegated: u16, requested: u16 },

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    #[error("Arithmetic overflow")]
    Overflow,

    // Temporal gate
    #[error("Voting closed")]
    VotingClosed,

    #[error("Voting window not closed")]
    WindowNotClosed,

    #[error("Lock not unlockable until {unlock_time_ms} ms")]
    NotYetUnlockable { unlock_time_ms: u64 },

    #[error("Lock already unlockable; use unlock")]
    AlreadyUnlockable,

    #[error("Market closed")]
    MarketClosed,

    #[error("Market still open")]
    MarketStillOpen,

    #[error("Epoch advance too soon: next at {next_epoch_ms} ms")]
    EpochTooSoon { next_epoch_ms: u64 },
}

/// Coarse classification of rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    StateConflict,
    LimitExceeded,
    TemporalGate,
}

impl GovernanceError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use GovernanceError::*;
        match self {
            ZeroAmount
            | InvalidDuration(_)
            | InvalidShare(_)
            | FeeTooHigh { .. }
            | SelfDelegation
            | InvalidProposal(_)
            | InvalidParameter(_)
            | UnsupportedAction(_)
            | BatchLengthMismatch { .. }
            | ZeroVotingPower
            | Config(_)
            | Types(_) => ErrorKind::InvalidInput,

            NotOwner
            | NotAdmin
            | NotResolver
            | InvalidAgentCap
            | InvalidTreasuryCap
            | WrongMarket
            | ReceiptLockMismatch => ErrorKind::Unauthorized,

            AlreadyVoted
            | AlreadyExecuted
            | NotExecutable
            | AlreadyResolved
            | MarketNotResolved
            | AgentInactive
            | AgentAlreadyActive
            | CooldownActive { .. }
            | LockHasDelegations(_)
            | LockExpired
            | AlreadyAccrued(_)
            | NoActiveEpoch
            | NothingToClaim => ErrorKind::StateConflict,

            DailyLimitExceeded { .. }
            | SupplyCapExceeded { .. }
            | DelegationShareExceeded { .. }
            | InsufficientBalance { .. }
            | Overflow => ErrorKind::LimitExceeded,

            VotingClosed
            | WindowNotClosed
            | NotYetUnlockable { .. }
            | AlreadyUnlockable
            | MarketClosed
            | MarketStillOpen
            | EpochTooSoon { .. } => ErrorKind::TemporalGate,
        }
    }
}

/// A rejected call that consumed an owned object hands it back untouched.
#[derive(Debug)]
pub struct Rejected<T> {
    pub error: GovernanceError,
    pub value: T,
}

impl<T> Rejected<T> {
    pub fn new(error: GovernanceError, value: T) -> Self {
        Self { error, value }
    }

    pub fn into_parts(self) -> (GovernanceError, T) {
        (self.error, self.value)
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> From<Rejected<T>> for GovernanceError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}

impl<T> std::fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}
