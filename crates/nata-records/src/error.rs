use crate::record::RecordKind;

/// Errors from encoding or decoding records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("expected {expected} record, found {found}")]
    UnexpectedKind {
        expected: RecordKind,
        found: RecordKind,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;
