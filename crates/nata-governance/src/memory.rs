use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use nata_records::{Proposal, Vote};
use nata_types::{Address, Clock, ProposalId};

use crate::error::{GovernanceError, GovernanceResult};
use crate::ledger::{GovernanceLedger, ImportOutcome, ProposalDraft};

/// Most votes held for a single proposal that has not arrived yet.
const MAX_PARKED_PER_PROPOSAL: usize = 1024;

struct ProposalEntry {
    proposal: Proposal,
    votes: Vec<Vote>,
    voters: HashSet<Address>,
}

impl ProposalEntry {
    fn new(proposal: Proposal) -> Self {
        Self {
            proposal,
            votes: Vec::new(),
            voters: HashSet::new(),
        }
    }

    fn check_open(&self, now: u64) -> GovernanceResult<()> {
        if self.proposal.is_open_at(now) {
            return Ok(());
        }
        Err(GovernanceError::VotingClosed {
            proposal_id: self.proposal.id,
            now,
            start_time: self.proposal.start_time,
            end_time: self.proposal.end_time,
        })
    }

    fn check_voter(&self, voter: &Address) -> GovernanceResult<()> {
        if self.voters.contains(voter) {
            return Err(GovernanceError::DuplicateVote {
                proposal_id: self.proposal.id,
                voter: voter.clone(),
            });
        }
        Ok(())
    }

    fn append(&mut self, vote: Vote) {
        self.voters.insert(vote.voter.clone());
        self.votes.push(vote);
    }

    /// Apply a peer's vote. A vote identical to one already held is not a duplicate.
    fn import(&mut self, vote: Vote) -> GovernanceResult<ImportOutcome> {
        if self.votes.iter().any(|existing| *existing == vote) {
            return Ok(ImportOutcome::AlreadyKnown);
        }
        self.check_open(vote.timestamp)?;
        self.check_voter(&vote.voter)?;
        self.append(vote);
        Ok(ImportOutcome::Applied)
    }
}

fn check_weight(weight: f64) -> GovernanceResult<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(GovernanceError::InvalidWeight(weight))
    }
}

/// In-memory governance ledger.
///
/// The proposal map is behind an `RwLock`; each proposal's votes are behind
/// their own `Mutex`, so votes on different proposals never contend.
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    proposals: RwLock<HashMap<ProposalId, Arc<Mutex<ProposalEntry>>>>,
    order: RwLock<Vec<ProposalId>>,
    parked: Mutex<HashMap<ProposalId, Vec<Vote>>>,
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            proposals: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            parked: Mutex::new(HashMap::new()),
        }
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.read().expect("ledger poisoned").len()
    }

    /// Votes waiting for their proposal to arrive.
    pub fn parked_votes(&self) -> usize {
        self.parked
            .lock()
            .expect("parked votes poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    fn entry(&self, proposal_id: &ProposalId) -> Option<Arc<Mutex<ProposalEntry>>> {
        self.proposals
            .read()
            .expect("ledger poisoned")
            .get(proposal_id)
            .cloned()
    }

    fn require(&self, proposal_id: &ProposalId) -> GovernanceResult<Arc<Mutex<ProposalEntry>>> {
        self.entry(proposal_id)
            .ok_or(GovernanceError::NotFound(*proposal_id))
    }

    fn insert(&self, proposal: Proposal) -> Vec<Vote> {
        let id = proposal.id;
        let mut proposals = self.proposals.write().expect("ledger poisoned");
        proposals.insert(id, Arc::new(Mutex::new(ProposalEntry::new(proposal))));
        self.order.write().expect("ledger poisoned").push(id);
        self.parked
            .lock()
            .expect("parked votes poisoned")
            .remove(&id)
            .unwrap_or_default()
    }
}

impl GovernanceLedger for InMemoryLedger {
    fn create_proposal(&self, draft: ProposalDraft) -> GovernanceResult<Proposal> {
        let start_time = self.clock.now_secs();
        let proposal = Proposal {
            id: ProposalId::new(),
            title: draft.title,
            description: draft.description,
            proposer: draft.proposer,
            start_time,
            end_time: start_time.saturating_add(draft.duration_secs),
            cid: draft.cid,
        };
        self.insert(proposal.clone());
        info!(
            proposal = %proposal.id,
            proposer = %proposal.proposer,
            end_time = proposal.end_time,
            "proposal created"
        );
        Ok(proposal)
    }

    fn cast_vote(
        &self,
        proposal_id: &ProposalId,
        voter: Address,
        support: bool,
        weight: f64,
    ) -> GovernanceResult<Vote> {
        check_weight(weight)?;
        let entry = self.require(proposal_id)?;
        let mut entry = entry.lock().expect("proposal entry poisoned");
        let now = self.clock.now_secs();
        entry.check_open(now)?;
        entry.check_voter(&voter)?;

        let vote = Vote {
            proposal_id: *proposal_id,
            voter,
            support,
            weight,
            timestamp: now,
        };
        entry.append(vote.clone());
        debug!(proposal = %proposal_id, voter = %vote.voter, support, "vote recorded");
        Ok(vote)
    }

    fn get_proposal(&self, proposal_id: &ProposalId) -> GovernanceResult<Proposal> {
        let entry = self.require(proposal_id)?;
        let entry = entry.lock().expect("proposal entry poisoned");
        Ok(entry.proposal.clone())
    }

    fn get_votes(&self, proposal_id: &ProposalId) -> GovernanceResult<Vec<Vote>> {
        let Some(entry) = self.entry(proposal_id) else {
            return Ok(Vec::new());
        };
        let votes = entry.lock().expect("proposal entry poisoned").votes.clone();
        Ok(votes)
    }

    fn proposals(&self) -> GovernanceResult<Vec<Proposal>> {
        let order = self.order.read().expect("ledger poisoned").clone();
        let mut proposals = Vec::with_capacity(order.len());
        for id in &order {
            if let Some(entry) = self.entry(id) {
                proposals.push(entry.lock().expect("proposal entry poisoned").proposal.clone());
            }
        }
        Ok(proposals)
    }

    fn import_proposal(&self, proposal: Proposal) -> GovernanceResult<ImportOutcome> {
        if proposal.start_time > proposal.end_time {
            return Err(GovernanceError::InvalidProposal(format!(
                "{} starts after it ends",
                proposal.id
            )));
        }
        if let Some(existing) = self.entry(&proposal.id) {
            let existing = existing.lock().expect("proposal entry poisoned");
            if existing.proposal == proposal {
                return Ok(ImportOutcome::AlreadyKnown);
            }
            warn!(proposal = %proposal.id, "conflicting proposal import ignored");
            return Ok(ImportOutcome::Conflict);
        }

        let id = proposal.id;
        let parked = self.insert(proposal);
        info!(proposal = %id, parked = parked.len(), "proposal imported");

        if let Some(entry) = self.entry(&id) {
            let mut entry = entry.lock().expect("proposal entry poisoned");
            for vote in parked {
                let voter = vote.voter.clone();
                if let Err(e) = entry.import(vote) {
                    warn!(proposal = %id, %voter, error = %e, "parked vote rejected");
                }
            }
        }
        Ok(ImportOutcome::Applied)
    }

    fn import_vote(&self, vote: Vote) -> GovernanceResult<ImportOutcome> {
        check_weight(vote.weight)?;
        // Parking happens under the map read lock; `insert` drains under the write lock.
        let proposals = self.proposals.read().expect("ledger poisoned");
        let existing = proposals.get(&vote.proposal_id).cloned();
        if let Some(entry) = existing {
            drop(proposals);
            let mut entry = entry.lock().expect("proposal entry poisoned");
            return entry.import(vote);
        }

        let mut parked = self.parked.lock().expect("parked votes poisoned");
        let waiting = parked.entry(vote.proposal_id).or_default();
        if waiting.len() >= MAX_PARKED_PER_PROPOSAL {
            warn!(proposal = %vote.proposal_id, "parked vote limit reached; vote dropped");
            return Err(GovernanceError::NotFound(vote.proposal_id));
        }
        if !waiting.contains(&vote) {
            debug!(proposal = %vote.proposal_id, voter = %vote.voter, "vote parked until proposal arrives");
            waiting.push(vote);
        }
        Ok(ImportOutcome::Parked)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("proposal_count", &self.proposal_count())
            .field("parked_votes", &self.parked_votes())
            .finish()
    }
}
