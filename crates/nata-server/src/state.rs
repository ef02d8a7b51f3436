use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use nata_gossip::{
    GossipNode, Libp2pTransport, Libp2pTransportConfig, MemoryHub, MemoryTransport, Multiaddr,
    Transport,
};
use nata_governance::{GovernanceService, InMemoryLedger};
use nata_records::AttestationRecord;
use nata_store::{ContentStore, FileContentStore, InMemoryContentStore};
use nata_types::{Clock, SystemClock};

use crate::config::{ServerConfig, StorageConfig, TransportSettings};
use crate::error::{ServerError, ServerResult};
use crate::replication;
use crate::residency::{InMemoryResidencyRegistry, ResidencyRegistry};

/// Attestations kept per property; the oldest are dropped beyond this.
const MAX_ATTESTATIONS_PER_PROPERTY: usize = 1000;

/// Attestations seen locally or received from peers, by property id.
#[derive(Debug, Default)]
pub struct AttestationLog {
    by_property: RwLock<HashMap<String, VecDeque<AttestationRecord>>>,
}

impl AttestationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an identical attestation was already recorded.
    pub fn record(&self, attestation: AttestationRecord) -> bool {
        let mut by_property = self.by_property.write().expect("attestation log poisoned");
        let entries = by_property.entry(attestation.property_id.clone()).or_default();
        if entries.contains(&attestation) {
            return false;
        }
        if entries.len() >= MAX_ATTESTATIONS_PER_PROPERTY {
            entries.pop_front();
        }
        entries.push_back(attestation);
        true
    }

    pub fn for_property(&self, property_id: &str) -> Vec<AttestationRecord> {
        self.by_property
            .read()
            .expect("attestation log poisoned")
            .get(property_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_property
            .read()
            .expect("attestation log poisoned")
            .values()
            .map(VecDeque::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn ContentStore>,
    pub governance: Arc<GovernanceService>,
    /// `None` when dissemination is disabled.
    pub node: Option<Arc<GossipNode>>,
    pub attestations: Arc<AttestationLog>,
    pub residency: Arc<dyn ResidencyRegistry>,
}

impl AppState {
    /// Build every component the configuration names.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let store: Arc<dyn ContentStore> = match &config.storage {
            StorageConfig::Memory => Arc::new(InMemoryContentStore::new()),
            StorageConfig::File { root } => Arc::new(FileContentStore::open(root)?),
        };
        let node = if config.gossip.enabled {
            let transport = build_transport(&config.gossip.transport)?;
            Some(Arc::new(GossipNode::new(config.gossip_config(), transport)))
        } else {
            None
        };
        Ok(Self::assemble(config, clock, store, node))
    }

    /// Memory store and a memory-transport node on a private hub.
    pub fn in_memory(config: ServerConfig) -> Self {
        let node = GossipNode::new(
            config.gossip_config(),
            Arc::new(MemoryTransport::new(MemoryHub::new())),
        );
        Self::assemble(
            config,
            Arc::new(SystemClock::new()),
            Arc::new(InMemoryContentStore::new()),
            Some(Arc::new(node)),
        )
    }

    /// Wire the ledger, registry, and inbound handlers around the given parts.
    pub fn assemble(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn ContentStore>,
        node: Option<Arc<GossipNode>>,
    ) -> Self {
        let ledger = Arc::new(InMemoryLedger::new(Arc::clone(&clock)));
        let mut governance =
            GovernanceService::new(ledger, Arc::clone(&store), Arc::clone(&clock))
                .with_default_duration(config.governance.default_duration_secs);
        let attestations = Arc::new(AttestationLog::new());

        if let Some(node) = &node {
            governance = governance.with_node(Arc::clone(node));
            replication::register(node, Arc::clone(&store), Arc::clone(&attestations));
        }

        Self {
            config: Arc::new(config),
            residency: Arc::new(InMemoryResidencyRegistry::new(Arc::clone(&clock))),
            clock,
            store,
            governance: Arc::new(governance),
            node,
            attestations,
        }
    }

    /// The node, if it exists and is running.
    pub fn running_node(&self) -> Option<&Arc<GossipNode>> {
        self.node.as_ref().filter(|node| node.is_running())
    }
}

fn build_transport(settings: &TransportSettings) -> ServerResult<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match settings {
        TransportSettings::Memory => Arc::new(MemoryTransport::new(MemoryHub::new())),
        TransportSettings::Libp2p { listen, peers } => {
            let mut config = Libp2pTransportConfig::new(parse_multiaddr(listen)?);
            for peer in peers {
                config = config.with_peer(parse_multiaddr(peer)?);
            }
            Arc::new(Libp2pTransport::new(config))
        }
    };
    Ok(transport)
}

fn parse_multiaddr(text: &str) -> ServerResult<Multiaddr> {
    text.parse()
        .map_err(|e| ServerError::Config(format!("bad multiaddr {text:?}: {e}")))
}
