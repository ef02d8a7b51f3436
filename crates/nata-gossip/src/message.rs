use serde::{Deserialize, Serialize};

use nata_records::{AttestationRecord, PropertyRecord, Proposal, Vote};
use nata_types::{Address, Cid, PeerId};

use crate::error::{GossipError, GossipResult};

/// Discriminator values understood on the topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    PropertyRecord,
    PropertyAttestation,
    CommunityMessage,
    GovernanceProposal,
    GovernanceVote,
}

impl MessageKind {
    pub const ALL: [Self; 5] = [
        Self::PropertyRecord,
        Self::PropertyAttestation,
        Self::CommunityMessage,
        Self::GovernanceProposal,
        Self::GovernanceVote,
    ];

    /// The `type` field value for this kind.
    pub fn discriminator(&self) -> &'static str {
        match self {
            Self::PropertyRecord => "property_record",
            Self::PropertyAttestation => "property_attestation",
            Self::CommunityMessage => "community_message",
            Self::GovernanceProposal => "governance_proposal",
            Self::GovernanceVote => "governance_vote",
        }
    }

    pub fn from_discriminator(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.discriminator() == value)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.discriminator())
    }
}

/// Free-form note shared with the cooperative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl CommunityMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: None,
            timestamp: None,
        }
    }
}

/// A message broadcast on the topic, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Announcement {
    /// A property record was stored under `cid`.
    PropertyRecord { data: PropertyRecord, cid: Cid },
    PropertyAttestation(AttestationRecord),
    CommunityMessage(CommunityMessage),
    GovernanceProposal { proposal: Proposal },
    GovernanceVote { vote: Vote },
}

impl Announcement {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::PropertyRecord { .. } => MessageKind::PropertyRecord,
            Self::PropertyAttestation(_) => MessageKind::PropertyAttestation,
            Self::CommunityMessage(_) => MessageKind::CommunityMessage,
            Self::GovernanceProposal { .. } => MessageKind::GovernanceProposal,
            Self::GovernanceVote { .. } => MessageKind::GovernanceVote,
        }
    }

    /// Serialize to the JSON bytes carried by the transport.
    pub fn to_bytes(&self) -> GossipResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| GossipError::Serialization(e.to_string()))
    }
}

/// Raw payload received from the topic, before decoding.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub source: PeerId,
    pub payload: Vec<u8>,
}
