use crate::error::{CodecError, CodecResult};
use crate::record::{PropertyRecord, ProposalRecord, Record, RecordKind};

/// Codec between [`Record`] values and the bytes the content store keeps.
///
/// The byte form is compact JSON with a `type` discriminator. Encoding is
/// deterministic for a given record value, so re-encoding a decoded record
/// yields the same bytes and therefore the same identifier.
pub struct RecordCodec;

impl RecordCodec {
    pub fn encode(record: &Record) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| CodecError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Record> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Deserialization(e.to_string()))
    }

    /// Decode bytes that must hold a proposal record.
    pub fn decode_proposal(bytes: &[u8]) -> CodecResult<ProposalRecord> {
        match Self::decode(bytes)? {
            Record::Proposal(p) => Ok(p),
            other => Err(CodecError::UnexpectedKind {
                expected: RecordKind::Proposal,
                found: other.kind(),
            }),
        }
    }

    /// Decode bytes that must hold a property record.
    pub fn decode_property(bytes: &[u8]) -> CodecResult<PropertyRecord> {
        match Self::decode(bytes)? {
            Record::PropertyRecord(p) => Ok(p),
            other => Err(CodecError::UnexpectedKind {
                expected: RecordKind::PropertyRecord,
                found: other.kind(),
            }),
        }
    }
}
