use std::sync::Arc;

use tracing::{debug, warn};

use nata_gossip::{Announcement, GossipNode};
use nata_records::{Proposal, ProposalRecord, Record, RecordCodec, Vote, DEFAULT_VOTING_DURATION_SECS};
use nata_store::ContentStore;
use nata_types::{Address, Clock, ProposalId};

use crate::error::GovernanceResult;
use crate::handlers;
use crate::ledger::{GovernanceLedger, ProposalDraft};
use crate::tally::Tally;

/// Governance operations as exposed to clients.
///
/// Writes go to the local ledger first. When a running gossip node is
/// attached the result is then announced; a failed announcement is logged
/// and the local write stands.
pub struct GovernanceService {
    ledger: Arc<dyn GovernanceLedger>,
    store: Arc<dyn ContentStore>,
    node: Option<Arc<GossipNode>>,
    clock: Arc<dyn Clock>,
    default_duration: u64,
}

impl GovernanceService {
    pub fn new(
        ledger: Arc<dyn GovernanceLedger>,
        store: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            store,
            node: None,
            clock,
            default_duration: DEFAULT_VOTING_DURATION_SECS,
        }
    }

    /// Announce writes through `node` and import peers' announcements from it.
    pub fn with_node(mut self, node: Arc<GossipNode>) -> Self {
        handlers::register(&node, Arc::clone(&self.ledger));
        self.node = Some(node);
        self
    }

    pub fn with_default_duration(mut self, secs: u64) -> Self {
        self.default_duration = secs;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn GovernanceLedger> {
        &self.ledger
    }

    pub fn default_duration(&self) -> u64 {
        self.default_duration
    }

    /// Persist the proposal text, open the proposal, and announce it.
    pub async fn create_proposal(
        &self,
        title: String,
        description: String,
        proposer: Address,
        duration_secs: Option<u64>,
    ) -> GovernanceResult<Proposal> {
        let record = Record::Proposal(ProposalRecord::new(
            title.clone(),
            description.clone(),
            proposer.clone(),
            self.clock.now_secs(),
        ));
        let cid = self.store.put(&RecordCodec::encode(&record)?)?;

        let draft = ProposalDraft::new(title, description, proposer)
            .with_duration(duration_secs.unwrap_or(self.default_duration))
            .with_cid(cid);
        let proposal = self.ledger.create_proposal(draft)?;

        self.announce(Announcement::GovernanceProposal {
            proposal: proposal.clone(),
        })
        .await;
        Ok(proposal)
    }

    pub async fn cast_vote(
        &self,
        proposal_id: &ProposalId,
        voter: Address,
        support: bool,
        weight: f64,
    ) -> GovernanceResult<Vote> {
        let vote = self.ledger.cast_vote(proposal_id, voter, support, weight)?;
        self.announce(Announcement::GovernanceVote { vote: vote.clone() })
            .await;
        Ok(vote)
    }

    pub fn get_proposal(&self, proposal_id: &ProposalId) -> GovernanceResult<Proposal> {
        self.ledger.get_proposal(proposal_id)
    }

    pub fn get_votes(&self, proposal_id: &ProposalId) -> GovernanceResult<Vec<Vote>> {
        self.ledger.get_votes(proposal_id)
    }

    pub fn proposals(&self) -> GovernanceResult<Vec<Proposal>> {
        self.ledger.proposals()
    }

    /// Tally of an existing proposal. `NotFound` for unknown ids.
    pub fn tally(&self, proposal_id: &ProposalId) -> GovernanceResult<Tally> {
        self.ledger.get_proposal(proposal_id)?;
        Ok(Tally::from_votes(&self.ledger.get_votes(proposal_id)?))
    }

    async fn announce(&self, announcement: Announcement) {
        let Some(node) = &self.node else {
            return;
        };
        if !node.is_running() {
            debug!(kind = %announcement.kind(), "gossip node not running; not announced");
            return;
        }
        if let Err(e) = node.publish(&announcement).await {
            warn!(kind = %announcement.kind(), error = %e, "announcement failed after local write");
        }
    }
}

impl std::fmt::Debug for GovernanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceService")
            .field("ledger", &self.ledger.backend())
            .field("store", &self.store.backend())
            .field("node", &self.node.as_ref().map(|n| n.state()))
            .field("default_duration", &self.default_duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use nata_gossip::{GossipConfig, MemoryHub, MemoryTransport};
    use nata_store::InMemoryContentStore;
    use nata_types::ManualClock;

    use crate::error::GovernanceError;
    use crate::memory::InMemoryLedger;

    struct Peer {
        service: GovernanceService,
        store: Arc<InMemoryContentStore>,
        node: Arc<GossipNode>,
    }

    fn peer(hub: &Arc<MemoryHub>, clock: &Arc<ManualClock>) -> Peer {
        let store = Arc::new(InMemoryContentStore::new());
        let node = Arc::new(GossipNode::new(
            GossipConfig::default(),
            Arc::new(MemoryTransport::new(Arc::clone(hub))),
        ));
        let service = GovernanceService::new(
            Arc::new(InMemoryLedger::new(clock.clone())),
            store.clone(),
            clock.clone(),
        )
        .with_node(Arc::clone(&node));
        Peer { service, store, node }
    }

    async fn eventually<F: Fn() -> bool>(check: F) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn proposal_text_is_content_addressed() {
        let clock = Arc::new(ManualClock::new(42));
        let store = Arc::new(InMemoryContentStore::new());
        let service = GovernanceService::new(
            Arc::new(InMemoryLedger::new(clock.clone())),
            store.clone(),
            clock,
        );

        let proposal = service
            .create_proposal("Roof".into(), "Fix the leak".into(), Address::from("0xabc"), None)
            .await
            .unwrap();
        let cid = proposal.cid.expect("proposal carries its record id");
        let stored = RecordCodec::decode_proposal(&store.get(&cid).unwrap().unwrap()).unwrap();
        assert_eq!(stored, ProposalRecord::new("Roof", "Fix the leak", "0xabc", 42));
        assert_eq!(proposal.end_time, 42 + DEFAULT_VOTING_DURATION_SECS);
    }

    #[tokio::test]
    async fn works_without_a_running_node() {
        let hub = MemoryHub::new();
        let clock = Arc::new(ManualClock::new(0));
        let alone = peer(&hub, &clock);
        let proposal = alone
            .service
            .create_proposal("A".into(), "B".into(), Address::from("0x1"), Some(10))
            .await
            .unwrap();
        alone
            .service
            .cast_vote(&proposal.id, Address::from("0x2"), true, 1.0)
            .await
            .unwrap();
        assert_eq!(alone.service.tally(&proposal.id).unwrap().yes_votes, 1);
        assert_eq!(alone.store.len(), 1);
    }

    #[test]
    fn tally_of_unknown_proposal_is_not_found() {
        let clock = Arc::new(ManualClock::new(0));
        let service = GovernanceService::new(
            Arc::new(InMemoryLedger::new(clock.clone())),
            Arc::new(InMemoryContentStore::new()),
            clock,
        );
        assert!(matches!(
            service.tally(&ProposalId::new()),
            Err(GovernanceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn proposals_and_votes_replicate_to_peers() {
        let hub = MemoryHub::new();
        let clock = Arc::new(ManualClock::new(100));
        let origin = peer(&hub, &clock);
        let replica = peer(&hub, &clock);
        origin.node.start().await.unwrap();
        replica.node.start().await.unwrap();

        let proposal = origin
            .service
            .create_proposal("Garden".into(), "Plant trees".into(), Address::from("0xabc"), None)
            .await
            .unwrap();
        let id = proposal.id;
        eventually(|| replica.service.get_proposal(&id).is_ok()).await;
        assert_eq!(replica.service.get_proposal(&id).unwrap(), proposal);

        origin
            .service
            .cast_vote(&id, Address::from("0xVoter"), true, 2.0)
            .await
            .unwrap();
        eventually(|| replica.service.get_votes(&id).unwrap().len() == 1).await;

        // The replica enforces the same duplicate rule on its own writes.
        let err = replica
            .service
            .cast_vote(&id, Address::from("0xvoter"), false, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateVote { .. }));

        origin.node.stop().await;
        replica.node.stop().await;
    }
}
