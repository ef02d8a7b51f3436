/// Errors produced by the dissemination layer.
#[derive(Debug, thiserror::Error)]
pub enum GossipError {
    /// Publish attempted while the node is not `Running`.
    #[error("gossip node is not running")]
    NotRunning,

    /// The transport could not be established.
    #[error("transport failed to start: {0}")]
    StartFailure(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The transport session rejected the operation.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Convenience alias used throughout the gossip crate.
pub type GossipResult<T> = std::result::Result<T, GossipError>;
