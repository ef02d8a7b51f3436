use nata_records::{Proposal, Vote, DEFAULT_VOTING_DURATION_SECS};
use nata_types::{Address, Cid, ProposalId};

use crate::error::GovernanceResult;

/// Input for [`GovernanceLedger::create_proposal`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub proposer: Address,
    pub duration_secs: u64,
    pub cid: Option<Cid>,
}

impl ProposalDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        proposer: impl Into<Address>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            proposer: proposer.into(),
            duration_secs: DEFAULT_VOTING_DURATION_SECS,
            cid: None,
        }
    }

    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_cid(mut self, cid: Cid) -> Self {
        self.cid = Some(cid);
        self
    }
}

/// Result of importing a proposal or vote received from a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    Applied,
    /// Identical data was already present.
    AlreadyKnown,
    /// A different proposal already holds this id; the import was ignored.
    Conflict,
    /// The vote's proposal has not arrived yet; the vote is held until it does.
    Parked,
}

/// Proposal and vote bookkeeping.
///
/// Implementations must make the window check, the duplicate-voter check,
/// and the append a single atomic step per proposal.
pub trait GovernanceLedger: Send + Sync {
    /// Open a proposal whose window starts now and lasts `draft.duration_secs`.
    fn create_proposal(&self, draft: ProposalDraft) -> GovernanceResult<Proposal>;

    /// Record a vote stamped with the current time.
    fn cast_vote(
        &self,
        proposal_id: &ProposalId,
        voter: Address,
        support: bool,
        weight: f64,
    ) -> GovernanceResult<Vote>;

    fn get_proposal(&self, proposal_id: &ProposalId) -> GovernanceResult<Proposal>;

    /// Votes in arrival order; empty for unknown proposals.
    fn get_votes(&self, proposal_id: &ProposalId) -> GovernanceResult<Vec<Vote>>;

    /// All proposals, oldest first.
    fn proposals(&self) -> GovernanceResult<Vec<Proposal>>;

    /// Adopt a proposal created by a peer.
    fn import_proposal(&self, proposal: Proposal) -> GovernanceResult<ImportOutcome>;

    /// Adopt a vote cast on a peer, judged against its own timestamp.
    fn import_vote(&self, vote: Vote) -> GovernanceResult<ImportOutcome>;

    /// Short backend name for status reporting.
    fn backend(&self) -> &'static str;
}
