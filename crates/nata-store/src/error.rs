use nata_types::Cid;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {cid}: stored bytes hash to {computed}")]
    HashMismatch { cid: Cid, computed: Cid },

    /// The identifier is already bound to different bytes.
    #[error("identifier {0} already bound to different content")]
    HashCollision(Cid),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
