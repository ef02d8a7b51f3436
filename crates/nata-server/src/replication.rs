//! Inbound record announcements from peers.

use std::sync::Arc;

use tracing::{debug, info};

use nata_crypto::ContentHasher;
use nata_gossip::{Announcement, AnnouncementHandler, GossipNode, HandlerResult, MessageKind};
use nata_records::{Record, RecordCodec};
use nata_store::ContentStore;
use nata_types::PeerId;

use crate::state::AttestationLog;

/// Replicates announced property records into the local store.
///
/// The announced identifier must match the payload's own hash.
pub struct PropertyRecordHandler {
    store: Arc<dyn ContentStore>,
}

impl PropertyRecordHandler {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

impl AnnouncementHandler for PropertyRecordHandler {
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult {
        let kind = announcement.kind();
        let Announcement::PropertyRecord { data, cid } = announcement else {
            return Err(format!("expected property_record, got {kind}").into());
        };
        let property_id = data.property_id.clone();
        let bytes = RecordCodec::encode(&Record::PropertyRecord(data))?;
        if !ContentHasher::RECORD.verify(&bytes, &cid) {
            return Err(format!("announced cid {cid} does not match payload").into());
        }
        self.store.put(&bytes)?;
        info!(source = %source.short_id(), %cid, property = %property_id, "property record replicated");
        Ok(())
    }
}

/// Keeps attestations heard on the topic.
pub struct AttestationHandler {
    log: Arc<AttestationLog>,
}

impl AttestationHandler {
    pub fn new(log: Arc<AttestationLog>) -> Self {
        Self { log }
    }
}

impl AnnouncementHandler for AttestationHandler {
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult {
        let kind = announcement.kind();
        let Announcement::PropertyAttestation(attestation) = announcement else {
            return Err(format!("expected property_attestation, got {kind}").into());
        };
        info!(
            source = %source.short_id(),
            property = %attestation.property_id,
            attester = %attestation.attester,
            "property attestation received"
        );
        if !self.log.record(attestation) {
            debug!("attestation already known");
        }
        Ok(())
    }
}

/// Logs community messages.
pub struct CommunityHandler;

impl AnnouncementHandler for CommunityHandler {
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult {
        if let Announcement::CommunityMessage(message) = announcement {
            info!(
                source = %source.short_id(),
                sender = message.sender.as_ref().map(|s| s.as_str()),
                text = %message.text,
                "community message"
            );
        }
        Ok(())
    }
}

pub fn register(node: &GossipNode, store: Arc<dyn ContentStore>, log: Arc<AttestationLog>) {
    node.register_handler(
        MessageKind::PropertyRecord,
        Arc::new(PropertyRecordHandler::new(store)),
    );
    node.register_handler(
        MessageKind::PropertyAttestation,
        Arc::new(AttestationHandler::new(log)),
    );
    node.register_handler(MessageKind::CommunityMessage, Arc::new(CommunityHandler));
}
