use nata_records::CodecError;
use nata_store::StoreError;
use nata_types::{Address, ProposalId};

/// Errors produced by governance operations.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("proposal not found: {0}")]
    NotFound(ProposalId),

    #[error("voting on {proposal_id} is closed at {now} (window {start_time}..={end_time})")]
    VotingClosed {
        proposal_id: ProposalId,
        now: u64,
        start_time: u64,
        end_time: u64,
    },

    #[error("{voter} has already voted on {proposal_id}")]
    DuplicateVote {
        proposal_id: ProposalId,
        voter: Address,
    },

    #[error("vote weight must be a finite, non-negative number, got {0}")]
    InvalidWeight(f64),

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Convenience alias for governance results.
pub type GovernanceResult<T> = std::result::Result<T, GovernanceError>;
