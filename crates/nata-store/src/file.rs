use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nata_crypto::ContentHasher;
use nata_types::Cid;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// Durable content store keeping one file per record.
///
/// Layout: `<root>/<first 2 hex chars>/<remaining 62 hex chars>`.
///
/// Writes go to a temporary file in the destination directory and are
/// renamed into place after `fsync`, so a crash mid-`put` never leaves a
/// partially written record under a valid identifier. Reads re-hash the
/// bytes and report corruption instead of returning them.
#[derive(Debug)]
pub struct FileContentStore {
    root: PathBuf,
}

impl FileContentStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "file content store opened");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, cid: &Cid) -> PathBuf {
        let hex = cid.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn read_verified(&self, cid: &Cid, path: &Path) -> StoreResult<Option<Vec<u8>>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let computed = ContentHasher::RECORD.hash(&bytes);
        if computed != *cid {
            return Err(StoreError::HashMismatch {
                cid: *cid,
                computed,
            });
        }
        Ok(Some(bytes))
    }
}

impl ContentStore for FileContentStore {
    fn put(&self, payload: &[u8]) -> StoreResult<Cid> {
        let cid = ContentHasher::RECORD.hash(payload);
        let path = self.path_for(&cid);

        if let Some(existing) = self.read_verified(&cid, &path)? {
            if existing != payload {
                return Err(StoreError::HashCollision(cid));
            }
            return Ok(cid);
        }

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(cid = %cid.short_hex(), len = payload.len(), "record written");
        Ok(cid)
    }

    fn get(&self, cid: &Cid) -> StoreResult<Option<Vec<u8>>> {
        self.read_verified(cid, &self.path_for(cid))
    }

    fn contains(&self, cid: &Cid) -> StoreResult<bool> {
        Ok(self.path_for(cid).is_file())
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FileContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::open(dir.path().join("records")).unwrap();
        (dir, store)
    }

    #[test]
    fn put_and_get_roundtrip() {
        let (_dir, store) = temp_store();
        let payload = br#"{"title":"Fix the roof","proposer":"0xabc"}"#;
        let cid = store.put(payload).unwrap();
        assert_eq!(store.get(&cid).unwrap().unwrap(), payload);
        assert!(store.contains(&cid).unwrap());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("records");
        let cid = FileContentStore::open(&root).unwrap().put(b"durable").unwrap();

        let reopened = FileContentStore::open(&root).unwrap();
        assert_eq!(reopened.get(&cid).unwrap().unwrap(), b"durable");
    }

    #[test]
    fn layout_shards_by_prefix() {
        let (_dir, store) = temp_store();
        let cid = store.put(b"sharded").unwrap();
        let hex = cid.to_hex();
        let expected = store.root().join(&hex[..2]).join(&hex[2..]);
        assert!(expected.is_file());
    }

    #[test]
    fn put_is_idempotent() {
        let (_dir, store) = temp_store();
        let a = store.put(b"twice").unwrap();
        let b = store.put(b"twice").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_record_is_none() {
        let (_dir, store) = temp_store();
        let cid = Cid::from_bytes(b"absent");
        assert!(store.get(&cid).unwrap().is_none());
        assert!(!store.contains(&cid).unwrap());
    }

    #[test]
    fn corrupted_file_is_reported() {
        let (_dir, store) = temp_store();
        let cid = store.put(b"pristine").unwrap();
        fs::write(store.path_for(&cid), b"tampered").unwrap();

        let err = store.get(&cid).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
        // A corrupt record is never silently replaced.
        assert!(store.put(b"pristine").is_err());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (_dir, store) = temp_store();
        let cid = store.put(b"clean").unwrap();
        let hex = cid.to_hex();
        let entries: Vec<_> = fs::read_dir(store.root().join(&hex[..2]))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
    }
}
