//! Proposal lifecycle with quadratic-weighted ballots.
//!
//! Proposals go through states: Pending -> Passed/Rejected -> Executed
//!
//! Ballot weight = floor(sqrt(voting_power)), dampening large holdings.

use std::collections::{BTreeMap, BTreeSet};
use borsh::{BorshDeserialize, BorshSerialize};
use atmos_types::{Address, ObjectId, TxContext};
use crate::delegation::{DelegatedPower, DelegationReceipt};
use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::ve_lock::VeLock;
use crate::BPS_DENOMINATOR;

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4_096;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ProposalStatus {
    /// Accepting votes
    Pending,
    /// Window closed, quorum met, yes > no
    Passed,
    /// Window closed, quorum unmet or yes <= no
    Rejected,
    /// Passed proposal has been carried out
    Executed,
}

impl ProposalStatus {
    pub fn can_vote(&self) -> bool {
        matches!(self, ProposalStatus::Pending)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, ProposalStatus::Passed)
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

/// On-chain proposal.
#[derive(Debug, PartialEq, Eq, BorshSerialize)]
pub struct Proposal {
    id: ObjectId,
    proposer: Address,
    title: String,
    description: String,
    kpi_target: Option<String>,
    created_at_ms: u64,
    end_time_ms: u64,
    yes_weight: u64,
    no_weight: u64,
    status: ProposalStatus,
    /// Lock owners who voted directly
    voters: BTreeSet<Address>,
    /// Delegation receipts already used
    delegated_ballots: BTreeSet<ObjectId>,
    /// Share of each lock's power already cast, owner and delegates combined
    lock_shares_voted: BTreeMap<ObjectId, u16>,
}

impl Proposal {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn proposer(&self) -> Address {
        self.proposer
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Optional KPI the proposal commits to
    pub fn kpi_target(&self) -> Option<&str> {
        self.kpi_target.as_deref()
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn end_time_ms(&self) -> u64 {
        self.end_time_ms
    }

    pub fn yes_weight(&self) -> u64 {
        self.yes_weight
    }

    pub fn no_weight(&self) -> u64 {
        self.no_weight
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn total_votes(&self) -> u64 {
        self.yes_weight.saturating_add(self.no_weight)
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    pub fn receipt_used(&self, receipt_id: &ObjectId) -> bool {
        self.delegated_ballots.contains(receipt_id)
    }

    /// Basis points of `lock_id`'s power not yet cast on this proposal.
    pub fn unvoted_share_bps(&self, lock_id: &ObjectId) -> u16 {
        let voted = self.lock_shares_voted.get(lock_id).copied().unwrap_or(0);
        (BPS_DENOMINATOR as u16).saturating_sub(voted)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len() + self.delegated_ballots.len()
    }

    fn ensure_open(&self, now_ms: u64) -> Result<(), GovernanceError> {
        if now_ms >= self.end_time_ms || !self.status.can_vote() {
            return Err(GovernanceError::VotingClosed);
        }
        Ok(())
    }

    fn tally(&mut self, lock_id: ObjectId, share_bps: u16, support: bool, weight: u64) {
        if support {
            self.yes_weight = self.yes_weight.saturating_add(weight);
        } else {
            self.no_weight = self.no_weight.saturating_add(weight);
        }
        *self.lock_shares_voted.entry(lock_id).or_insert(0) += share_bps;
    }
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
pub fn integer_sqrt(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }

    let n = n as u128;
    let mut x = n;
    let mut y = (x + 1) / 2;

    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }

    x as u64
}

/// Quadratic ballot weight for a raw voting power.
pub fn quadratic_weight(voting_power: u64) -> u64 {
    integer_sqrt(voting_power)
}

/// Open a proposal. `window_ms` falls back to the governance default.
#[allow(clippy::too_many_arguments)]
pub fn create_proposal(
    ctx: &mut TxContext,
    params: &GovernanceParams,
    lock: &VeLock,
    title: String,
    description: String,
    kpi_target: Option<String>,
    window_ms: Option<u64>,
    now_ms: u64,
) -> Result<Proposal, GovernanceError> {
    if title.trim().is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(GovernanceError::InvalidProposal(format!(
            "Title must be 1..={} bytes",
            MAX_TITLE_LEN
        )));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(GovernanceError::InvalidProposal(format!(
            "Description exceeds {} bytes",
            MAX_DESCRIPTION_LEN
        )));
    }
    let window_ms = window_ms.unwrap_or(params.default_proposal_window_ms());
    if window_ms == 0 {
        return Err(GovernanceError::InvalidProposal("Voting window cannot be 0".to_string()));
    }
    if lock.voting_power(now_ms) == 0 {
        return Err(GovernanceError::ZeroVotingPower);
    }
    let end_time_ms = now_ms.checked_add(window_ms).ok_or(GovernanceError::Overflow)?;

    let proposal = Proposal {
        id: ctx.fresh_id(),
        proposer: lock.owner(),
        title,
        description,
        kpi_target,
        created_at_ms: now_ms,
        end_time_ms,
        yes_weight: 0,
        no_weight: 0,
        status: ProposalStatus::Pending,
        voters: BTreeSet::new(),
        delegated_ballots: BTreeSet::new(),
        lock_shares_voted: BTreeMap::new(),
    };

    tracing::info!(
        proposal = %proposal.id,
        proposer = %proposal.proposer,
        end_time_ms,
        "Proposal created"
    );
    Ok(proposal)
}

/// Cast the lock owner's own (undelegated) power.
///
/// Only the part of the lock not already cast through delegation receipts
/// counts, so one lock never weighs in for more than its full power.
pub fn vote(proposal: &mut Proposal, lock: &VeLock, support: bool, now_ms: u64) -> Result<u64, GovernanceError> {
    proposal.ensure_open(now_ms)?;
    if proposal.has_voted(&lock.owner()) {
        return Err(GovernanceError::AlreadyVoted);
    }
    let share_bps = lock.undelegated_bps().min(proposal.unvoted_share_bps(&lock.id()));
    if share_bps == 0 && lock.undelegated_bps() > 0 {
        return Err(GovernanceError::AlreadyVoted);
    }

    let weight = quadratic_weight(lock.power_for_share(share_bps, now_ms));
    if weight == 0 {
        return Err(GovernanceError::ZeroVotingPower);
    }

    proposal.tally(lock.id(), share_bps, support, weight);
    proposal.voters.insert(lock.owner());

    tracing::info!(
        proposal = %proposal.id,
        voter = %lock.owner(),
        support,
        share_bps,
        weight,
        "Vote cast"
    );
    Ok(weight)
}

/// Cast a delegate's net share of a lock's power.
///
/// A receipt votes once, and never for more of the lock than is still
/// uncast on this proposal.
pub fn vote_delegated(
    proposal: &mut Proposal,
    lock: &VeLock,
    receipt: &DelegationReceipt,
    support: bool,
    now_ms: u64,
) -> Result<u64, GovernanceError> {
    proposal.ensure_open(now_ms)?;
    if receipt.lock_id() != lock.id() {
        return Err(GovernanceError::ReceiptLockMismatch);
    }
    if proposal.receipt_used(&receipt.id()) {
        return Err(GovernanceError::AlreadyVoted);
    }
    let share_bps = receipt.share_bps().min(proposal.unvoted_share_bps(&lock.id()));
    if share_bps == 0 {
        return Err(GovernanceError::AlreadyVoted);
    }

    let power = DelegatedPower::split(lock.power_for_share(share_bps, now_ms), receipt.fee_bps());
    let weight = quadratic_weight(power.net);
    if weight == 0 {
        return Err(GovernanceError::ZeroVotingPower);
    }

    proposal.tally(lock.id(), share_bps, support, weight);
    proposal.delegated_ballots.insert(receipt.id());

    tracing::info!(
        proposal = %proposal.id,
        delegate = %receipt.delegate(),
        receipt = %receipt.id(),
        support,
        share_bps,
        weight,
        "Delegated vote cast"
    );
    Ok(weight)
}

/// Close the window and fix the outcome. A second call fails with
/// `AlreadyExecuted` instead of recomputing.
pub fn execute_proposal(
    proposal: &mut Proposal,
    params: &GovernanceParams,
    now_ms: u64,
) -> Result<ProposalStatus, GovernanceError> {
    if proposal.status.is_final() {
        return Err(GovernanceError::AlreadyExecuted);
    }
    if now_ms < proposal.end_time_ms {
        return Err(GovernanceError::WindowNotClosed);
    }

    let total_votes = proposal.total_votes();
    let quorum = params.quorum_threshold();
    proposal.status = if total_votes < quorum {
        tracing::debug!(proposal = %proposal.id, total_votes, quorum, "Quorum not reached");
        ProposalStatus::Rejected
    } else if proposal.yes_weight > proposal.no_weight {
        ProposalStatus::Passed
    } else {
        ProposalStatus::Rejected
    };

    tracing::info!(
        proposal = %proposal.id,
        status = ?proposal.status,
        yes = proposal.yes_weight,
        no = proposal.no_weight,
        "Proposal resolved"
    );
    Ok(proposal.status)
}

/// Terminal marker for a passed proposal that has been carried out.
pub fn mark_executed(proposal: &mut Proposal) -> Result<(), GovernanceError> {
    match proposal.status {
        ProposalStatus::Passed => {
            proposal.status = ProposalStatus::Executed;
            tracing::info!(proposal = %proposal.id, "Proposal executed");
            Ok(())
        }
        ProposalStatus::Executed => Err(GovernanceError::AlreadyExecuted),
        _ => Err(GovernanceError::NotExecutable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;
    use crate::delegation::{delegate, undelegate};
    use crate::ve_lock::{lock, MAX_LOCK_DURATION_MS};
    use crate::MS_PER_DAY;

    const DAY: u64 = MS_PER_DAY;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn lock_for(n: u8, amount: u64) -> (TxContext, VeLock) {
        let mut ctx = TxContext::for_sender(addr(n));
        let l = lock(&mut ctx, Coin::from_supply(amount), MAX_LOCK_DURATION_MS, 0).unwrap();
        (ctx, l)
    }

    fn params() -> GovernanceParams {
        // Quorum threshold = 400 weight
        GovernanceParams::new(addr(99)).with_quorum_reference_weight(10_000)
    }

    fn proposal(ctx: &mut TxContext, l: &VeLock) -> Proposal {
        create_proposal(
            ctx,
            &params(),
            l,
            "Raise burn rate".to_string(),
            "Burn more".to_string(),
            None,
            Some(7 * DAY),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(0), 0);
        assert_eq!(integer_sqrt(1), 1);
        assert_eq!(integer_sqrt(15), 3);
        assert_eq!(integer_sqrt(16), 4);
        assert_eq!(integer_sqrt(u64::MAX), 4_294_967_295);
    }

    #[test]
    fn test_create_proposal() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let p = proposal(&mut ctx, &l);
        assert_eq!(p.status(), ProposalStatus::Pending);
        assert_eq!(p.end_time_ms(), 7 * DAY);
        assert_eq!(p.proposer(), addr(1));
    }

    #[test]
    fn test_create_proposal_default_window() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let p = create_proposal(&mut ctx, &params(), &l, "T".into(), String::new(), Some("TVL 1M".into()), None, 5)
            .unwrap();
        assert_eq!(p.end_time_ms(), 5 + params().default_proposal_window_ms());
        assert_eq!(p.kpi_target(), Some("TVL 1M"));
    }

    #[test]
    fn test_create_proposal_rejects() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        assert!(matches!(
            create_proposal(&mut ctx, &params(), &l, "  ".into(), String::new(), None, None, 0),
            Err(GovernanceError::InvalidProposal(_))
        ));
        assert_eq!(
            create_proposal(&mut ctx, &params(), &l, "T".into(), String::new(), None, None, MAX_LOCK_DURATION_MS),
            Err(GovernanceError::ZeroVotingPower)
        );
    }

    #[test]
    fn test_vote_quadratic_weight() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let mut p = proposal(&mut ctx, &l);

        let weight = vote(&mut p, &l, true, 0).unwrap();
        assert_eq!(weight, 1_000);
        assert_eq!(p.yes_weight(), 1_000);
        assert!(p.has_voted(&addr(1)));
    }

    #[test]
    fn test_double_vote_rejected() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let mut p = proposal(&mut ctx, &l);
        vote(&mut p, &l, true, 0).unwrap();

        assert_eq!(vote(&mut p, &l, true, 1), Err(GovernanceError::AlreadyVoted));
        assert_eq!(vote(&mut p, &l, false, 1), Err(GovernanceError::AlreadyVoted));
        assert_eq!(p.yes_weight(), 1_000);
        assert_eq!(p.no_weight(), 0);
    }

    #[test]
    fn test_vote_after_window_rejected() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let mut p = proposal(&mut ctx, &l);
        assert_eq!(vote(&mut p, &l, true, 7 * DAY), Err(GovernanceError::VotingClosed));
    }

    #[test]
    fn test_delegated_vote() {
        let (mut ctx, mut l) = lock_for(1, 1_000_000);
        let receipt = delegate(&mut ctx, &mut l, &params(), addr(2), 3_600, 0, 0).unwrap();
        let mut p = proposal(&mut ctx, &l);

        // Owner keeps 64%: sqrt(640_000) = 800
        assert_eq!(vote(&mut p, &l, true, 0).unwrap(), 800);
        // Delegate holds 36%: sqrt(360_000) = 600
        assert_eq!(vote_delegated(&mut p, &l, &receipt, false, 0).unwrap(), 600);
        assert_eq!(vote_delegated(&mut p, &l, &receipt, false, 0), Err(GovernanceError::AlreadyVoted));
        assert_eq!(p.voter_count(), 2);
    }

    #[test]
    fn test_recycled_receipts_cannot_revote_lock() {
        let (mut ctx, mut l) = lock_for(1, 1_000_000);
        let mut p = proposal(&mut ctx, &l);
        assert_eq!(vote(&mut p, &l, true, 0).unwrap(), 1_000);

        for _ in 0..3 {
            let receipt = delegate(&mut ctx, &mut l, &params(), addr(2), 10_000, 0, 0).unwrap();
            assert_eq!(vote_delegated(&mut p, &l, &receipt, true, 0), Err(GovernanceError::AlreadyVoted));
            undelegate(&mut l, receipt).unwrap();
        }
        assert_eq!(p.yes_weight(), 1_000);
        assert_eq!(p.unvoted_share_bps(&l.id()), 0);
    }

    #[test]
    fn test_owner_votes_only_uncast_share() {
        let (mut ctx, mut l) = lock_for(1, 1_000_000);
        let mut p = proposal(&mut ctx, &l);

        // Delegate casts 36%, then hands the share back
        let receipt = delegate(&mut ctx, &mut l, &params(), addr(2), 3_600, 0, 0).unwrap();
        assert_eq!(vote_delegated(&mut p, &l, &receipt, false, 0).unwrap(), 600);
        undelegate(&mut l, receipt).unwrap();
        assert_eq!(l.undelegated_bps(), 10_000);

        // Owner still only casts the remaining 64%: sqrt(640_000) = 800
        assert_eq!(vote(&mut p, &l, true, 0).unwrap(), 800);
        assert_eq!(p.total_votes(), 1_400);

        let again = delegate(&mut ctx, &mut l, &params(), addr(3), 5_000, 0, 0).unwrap();
        assert_eq!(vote_delegated(&mut p, &l, &again, true, 0), Err(GovernanceError::AlreadyVoted));
    }

    #[test]
    fn test_delegated_vote_wrong_lock() {
        let (mut ctx, mut l) = lock_for(1, 1_000_000);
        let (_, other) = lock_for(3, 1_000_000);
        let receipt = delegate(&mut ctx, &mut l, &params(), addr(2), 5_000, 0, 0).unwrap();
        let mut p = proposal(&mut ctx, &l);
        assert_eq!(
            vote_delegated(&mut p, &other, &receipt, true, 0),
            Err(GovernanceError::ReceiptLockMismatch)
        );
    }

    #[test]
    fn test_execute_passes() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let mut p = proposal(&mut ctx, &l);
        vote(&mut p, &l, true, 0).unwrap();

        assert_eq!(execute_proposal(&mut p, &params(), 7 * DAY - 1), Err(GovernanceError::WindowNotClosed));
        assert_eq!(execute_proposal(&mut p, &params(), 7 * DAY + 1), Ok(ProposalStatus::Passed));
        assert_eq!(execute_proposal(&mut p, &params(), 7 * DAY + 2), Err(GovernanceError::AlreadyExecuted));
        assert_eq!(p.status(), ProposalStatus::Passed);

        mark_executed(&mut p).unwrap();
        assert_eq!(p.status(), ProposalStatus::Executed);
        assert_eq!(mark_executed(&mut p), Err(GovernanceError::AlreadyExecuted));
    }

    #[test]
    fn test_execute_quorum_unmet() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let (_, small) = lock_for(2, 10_000);
        let mut p = proposal(&mut ctx, &l);
        // sqrt(10_000) = 100 < 400
        vote(&mut p, &small, true, 0).unwrap();

        assert_eq!(execute_proposal(&mut p, &params(), 7 * DAY), Ok(ProposalStatus::Rejected));
        assert_eq!(mark_executed(&mut p), Err(GovernanceError::NotExecutable));
    }

    #[test]
    fn test_execute_tie_rejected() {
        let (mut ctx, l) = lock_for(1, 1_000_000);
        let (_, other) = lock_for(2, 1_000_000);
        let mut p = proposal(&mut ctx, &l);
        vote(&mut p, &l, true, 0).unwrap();
        vote(&mut p, &other, false, 0).unwrap();

        assert_eq!(execute_proposal(&mut p, &params(), 7 * DAY), Ok(ProposalStatus::Rejected));
    }
}
