use nata_types::Cid;

use crate::error::StoreResult;

/// Content-addressed record store.
///
/// All implementations must satisfy these invariants:
/// - `put` either makes the payload retrievable under the returned [`Cid`] or
///   fails having stored nothing.
/// - The same payload always produces the same identifier, so repeated puts
///   are idempotent.
/// - A returned identifier always resolves to exactly the payload it was
///   derived from; records are never updated or deleted.
/// - Concurrent puts never hand the same identifier to different payloads.
pub trait ContentStore: Send + Sync {
    /// Persist a payload and return its content identifier.
    fn put(&self, payload: &[u8]) -> StoreResult<Cid>;

    /// Read a payload by identifier.
    ///
    /// Returns `Ok(None)` if nothing is stored under `cid`.
    /// Returns `Err` on I/O failure or data corruption.
    fn get(&self, cid: &Cid) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether a payload exists under `cid`.
    fn contains(&self, cid: &Cid) -> StoreResult<bool> {
        Ok(self.get(cid)?.is_some())
    }

    /// Short backend name for status reporting.
    fn backend(&self) -> &'static str;
}
