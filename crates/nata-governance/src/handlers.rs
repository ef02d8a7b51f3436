//! Inbound governance announcements.

use std::sync::Arc;

use tracing::debug;

use nata_gossip::{Announcement, AnnouncementHandler, GossipNode, HandlerResult, MessageKind};
use nata_types::PeerId;

use crate::ledger::GovernanceLedger;

/// Imports `governance_proposal` announcements into a ledger.
pub struct ProposalImportHandler {
    ledger: Arc<dyn GovernanceLedger>,
}

impl ProposalImportHandler {
    pub fn new(ledger: Arc<dyn GovernanceLedger>) -> Self {
        Self { ledger }
    }
}

impl AnnouncementHandler for ProposalImportHandler {
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult {
        let kind = announcement.kind();
        let Announcement::GovernanceProposal { proposal } = announcement else {
            return Err(format!("expected governance_proposal, got {kind}").into());
        };
        let id = proposal.id;
        let outcome = self.ledger.import_proposal(proposal)?;
        debug!(source = %source.short_id(), proposal = %id, ?outcome, "governance proposal imported");
        Ok(())
    }
}

/// Imports `governance_vote` announcements into a ledger.
pub struct VoteImportHandler {
    ledger: Arc<dyn GovernanceLedger>,
}

impl VoteImportHandler {
    pub fn new(ledger: Arc<dyn GovernanceLedger>) -> Self {
        Self { ledger }
    }
}

impl AnnouncementHandler for VoteImportHandler {
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult {
        let kind = announcement.kind();
        let Announcement::GovernanceVote { vote } = announcement else {
            return Err(format!("expected governance_vote, got {kind}").into());
        };
        let id = vote.proposal_id;
        let outcome = self.ledger.import_vote(vote)?;
        debug!(source = %source.short_id(), proposal = %id, ?outcome, "governance vote imported");
        Ok(())
    }
}

/// Route both governance kinds on `node` into `ledger`.
pub fn register(node: &GossipNode, ledger: Arc<dyn GovernanceLedger>) {
    node.register_handler(
        MessageKind::GovernanceProposal,
        Arc::new(ProposalImportHandler::new(Arc::clone(&ledger))),
    );
    node.register_handler(
        MessageKind::GovernanceVote,
        Arc::new(VoteImportHandler::new(ledger)),
    );
}
