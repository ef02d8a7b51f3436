use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use nata_types::Clock;

use crate::error::ServerResult;

/// Locality assumed when a verification request names none.
pub const DEFAULT_LOCALITY: &str = "Lisbon";

/// Record that an address was verified as resident in a locality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidencyProof {
    pub address: String,
    pub verified: bool,
    pub proof: String,
    pub timestamp: u64,
    pub locality: String,
}

/// Residency verification provider.
///
/// Addresses are keyed lowercased; one proof per address, replaced on
/// re-verification.
#[async_trait]
pub trait ResidencyRegistry: Send + Sync {
    async fn verify(&self, address: &str, locality: &str) -> ServerResult<ResidencyProof>;
    async fn get(&self, address: &str) -> ServerResult<Option<ResidencyProof>>;
    /// Returns whether a proof was removed.
    async fn revoke(&self, address: &str) -> ServerResult<bool>;
    fn backend(&self) -> &'static str;
}

/// Registry that accepts every request and issues placeholder proofs.
pub struct InMemoryResidencyRegistry {
    clock: Arc<dyn Clock>,
    proofs: RwLock<HashMap<String, ResidencyProof>>,
}

impl InMemoryResidencyRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            proofs: RwLock::new(HashMap::new()),
        }
    }
}

fn placeholder_proof() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(13)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("zk_proof_{suffix}")
}

#[async_trait]
impl ResidencyRegistry for InMemoryResidencyRegistry {
    async fn verify(&self, address: &str, locality: &str) -> ServerResult<ResidencyProof> {
        let key = address.to_lowercase();
        let proof = ResidencyProof {
            address: key.clone(),
            verified: true,
            proof: placeholder_proof(),
            timestamp: self.clock.now_secs(),
            locality: locality.to_owned(),
        };
        self.proofs
            .write()
            .expect("residency registry poisoned")
            .insert(key, proof.clone());
        info!(address, locality, "residency verified");
        Ok(proof)
    }

    async fn get(&self, address: &str) -> ServerResult<Option<ResidencyProof>> {
        Ok(self
            .proofs
            .read()
            .expect("residency registry poisoned")
            .get(&address.to_lowercase())
            .cloned())
    }

    async fn revoke(&self, address: &str) -> ServerResult<bool> {
        let removed = self
            .proofs
            .write()
            .expect("residency registry poisoned")
            .remove(&address.to_lowercase())
            .is_some();
        info!(address, removed, "residency revoked");
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nata_types::ManualClock;

    fn registry() -> InMemoryResidencyRegistry {
        InMemoryResidencyRegistry::new(Arc::new(ManualClock::new(1_700_000_000)))
    }

    #[tokio::test]
    async fn verify_then_get() {
        let registry = registry();
        let proof = registry.verify("0xAbC", DEFAULT_LOCALITY).await.unwrap();
        assert_eq!(proof.address, "0xabc");
        assert!(proof.verified);
        assert!(proof.proof.starts_with("zk_proof_"));
        assert_eq!(proof.timestamp, 1_700_000_000);
        assert_eq!(registry.get("0XABC").await.unwrap(), Some(proof));
    }

    #[tokio::test]
    async fn reverify_replaces_proof() {
        let registry = registry();
        registry.verify("0xabc", "Lisbon").await.unwrap();
        let second = registry.verify("0xABC", "Porto").await.unwrap();
        assert_eq!(registry.get("0xabc").await.unwrap().unwrap().locality, "Porto");
        assert_eq!(registry.get("0xabc").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn revoke_reports_removal() {
        let registry = registry();
        registry.verify("0xabc", "Lisbon").await.unwrap();
        assert!(registry.revoke("0xABC").await.unwrap());
        assert!(!registry.revoke("0xabc").await.unwrap());
        assert!(registry.get("0xabc").await.unwrap().is_none());
    }
}
