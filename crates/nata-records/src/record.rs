use serde::{Deserialize, Serialize};

use nata_types::Address;

/// Discriminator of a [`Record`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Proposal,
    PropertyRecord,
    PropertyAttestation,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposal => write!(f, "proposal"),
            Self::PropertyRecord => write!(f, "property_record"),
            Self::PropertyAttestation => write!(f, "property_attestation"),
        }
    }
}

/// A content-addressable record payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Proposal(ProposalRecord),
    PropertyRecord(PropertyRecord),
    PropertyAttestation(AttestationRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Proposal(_) => RecordKind::Proposal,
            Self::PropertyRecord(_) => RecordKind::PropertyRecord,
            Self::PropertyAttestation(_) => RecordKind::PropertyAttestation,
        }
    }

    /// Creation time in seconds since the UNIX epoch.
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Proposal(r) => r.timestamp,
            Self::PropertyRecord(r) => r.timestamp,
            Self::PropertyAttestation(r) => r.timestamp,
        }
    }
}

/// Proposal text submitted by a member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    pub title: String,
    pub description: String,
    pub proposer: Address,
    pub timestamp: u64,
}

impl ProposalRecord {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        proposer: impl Into<Address>,
        timestamp: u64,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            proposer: proposer.into(),
            timestamp,
        }
    }
}

/// Registry entry for a cooperative property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub property_id: String,
    pub address: String,
    pub owner: Address,
    pub value: String,
    pub timestamp: u64,
}

/// A member's claim about a property. Signatures are carried, not checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    pub property_id: String,
    pub attester: Address,
    pub attestation: String,
    #[serde(default)]
    pub signature: Option<String>,
    pub timestamp: u64,
}
