use nata_types::Cid;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"nata-record-v1"`) that is
/// prepended to every hash computation, so its identifiers never coincide
/// with a plain BLAKE3 digest of the same bytes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for record payloads held by the content store.
    pub const RECORD: Self = Self {
        domain: "nata-record-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Cid {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Cid::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected identifier.
    pub fn verify(&self, data: &[u8], expected: &Cid) -> bool {
        self.hash(data) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::RECORD.hash(data), ContentHasher::RECORD.hash(data));
    }

    #[test]
    fn domain_hash_differs_from_plain_digest() {
        assert_ne!(ContentHasher::RECORD.hash(b"x"), Cid::from_bytes(b"x"));
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::RECORD.hash(b"original");
        assert!(ContentHasher::RECORD.verify(b"original", &id));
        assert!(!ContentHasher::RECORD.verify(b"tampered", &id));
    }
}
