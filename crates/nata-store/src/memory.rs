use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use nata_crypto::ContentHasher;
use nata_types::Cid;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Payloads are held behind a `RwLock`;
/// identifier allocation and insertion happen under a single write guard.
pub struct InMemoryContentStore {
    records: RwLock<HashMap<Cid, Arc<[u8]>>>,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all stored records.
    pub fn total_bytes(&self) -> u64 {
        self.records
            .read()
            .expect("lock poisoned")
            .values()
            .map(|payload| payload.len() as u64)
            .sum()
    }

    /// Return a sorted list of all identifiers in the store.
    pub fn all_cids(&self) -> Vec<Cid> {
        let map = self.records.read().expect("lock poisoned");
        let mut cids: Vec<Cid> = map.keys().copied().collect();
        cids.sort();
        cids
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, payload: &[u8]) -> StoreResult<Cid> {
        let cid = ContentHasher::RECORD.hash(payload);
        let mut map = self.records.write().expect("lock poisoned");
        match map.get(&cid) {
            Some(existing) if &existing[..] != payload => Err(StoreError::HashCollision(cid)),
            Some(_) => Ok(cid),
            None => {
                map.insert(cid, Arc::from(payload));
                Ok(cid)
            }
        }
    }

    fn get(&self, cid: &Cid) -> StoreResult<Option<Vec<u8>>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(cid).map(|payload| payload.to_vec()))
    }

    fn contains(&self, cid: &Cid) -> StoreResult<bool> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.contains_key(cid))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("record_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const PROPERTY_P1: &[u8] =
        br#"{"type":"property_record","propertyId":"P1","address":"X","owner":"0xabc","value":"100","timestamp":1700000000}"#;

    // -----------------------------------------------------------------------
    // Core put / get
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get_property_record() {
        let store = InMemoryContentStore::new();
        let cid = store.put(PROPERTY_P1).unwrap();
        let read_back = store.get(&cid).unwrap().expect("should exist");
        assert_eq!(read_back, PROPERTY_P1);
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryContentStore::new();
        let cid = Cid::from_bytes(b"never stored");
        assert!(store.get(&cid).unwrap().is_none());
        assert!(!store.contains(&cid).unwrap());
    }

    #[test]
    fn empty_payload_is_storable() {
        let store = InMemoryContentStore::new();
        let cid = store.put(b"").unwrap();
        assert_eq!(store.get(&cid).unwrap(), Some(Vec::new()));
    }

    // -----------------------------------------------------------------------
    // Content-addressing correctness
    // -----------------------------------------------------------------------

    #[test]
    fn same_content_produces_same_cid() {
        let store = InMemoryContentStore::new();
        let id1 = store.put(b"identical content").unwrap();
        let id2 = store.put(b"identical content").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn different_content_produces_different_cids() {
        let store = InMemoryContentStore::new();
        let id1 = store.put(b"aaa").unwrap();
        let id2 = store.put(b"bbb").unwrap();
        assert_ne!(id1, id2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn cid_matches_record_hasher() {
        let store = InMemoryContentStore::new();
        let cid = store.put(b"verify me").unwrap();
        let read_back = store.get(&cid).unwrap().unwrap();
        assert!(ContentHasher::RECORD.verify(&read_back, &cid));
    }

    #[test]
    fn no_collisions_across_ten_thousand_payloads() {
        let store = InMemoryContentStore::new();
        let mut seen = HashSet::new();
        for i in 0u32..10_000 {
            let payload = format!("{{\"propertyId\":\"P{i}\",\"value\":\"{}\"}}", i * 7);
            let cid = store.put(payload.as_bytes()).unwrap();
            assert!(seen.insert(cid), "collision at payload {i}");
        }
        assert_eq!(store.len(), 10_000);
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn len_and_total_bytes() {
        let store = InMemoryContentStore::new();
        assert!(store.is_empty());
        store.put(b"12345").unwrap();
        store.put(b"123456789").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
    }

    #[test]
    fn all_cids_is_sorted() {
        let store = InMemoryContentStore::new();
        for payload in [b"aaa", b"bbb", b"ccc"] {
            store.put(payload).unwrap();
        }
        let cids = store.all_cids();
        assert_eq!(cids.len(), 3);
        for w in cids.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryContentStore::default();
        store.put(b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryContentStore"));
        assert!(debug.contains("record_count"));
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_puts_never_share_a_cid() {
        use std::thread;

        let store = Arc::new(InMemoryContentStore::new());
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..250u32)
                        .map(|i| {
                            let payload = format!("thread-{t}-record-{i}");
                            (store.put(payload.as_bytes()).unwrap(), payload)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for (cid, payload) in h.join().expect("thread should not panic") {
                assert!(seen.insert(cid));
                assert_eq!(store.get(&cid).unwrap().unwrap(), payload.as_bytes());
            }
        }
        assert_eq!(store.len(), 2000);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn get_returns_what_put_stored(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let store = InMemoryContentStore::new();
            let cid = store.put(&payload).unwrap();
            prop_assert_eq!(store.get(&cid).unwrap(), Some(payload));
        }

        #[test]
        fn distinct_payloads_get_distinct_cids(
            a in proptest::collection::vec(any::<u8>(), 0..128),
            b in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            prop_assume!(a != b);
            let store = InMemoryContentStore::new();
            prop_assert_ne!(store.put(&a).unwrap(), store.put(&b).unwrap());
        }
    }
}
