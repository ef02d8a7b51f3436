use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nata_gossip::{GossipConfig, DEFAULT_TOPIC};
use nata_records::DEFAULT_VOTING_DURATION_SECS;

use crate::error::{ServerError, ServerResult};

/// Server configuration, loaded from TOML and then environment overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Single origin allowed by CORS, with credentials.
    pub cors_origin: String,
    pub storage: StorageConfig,
    pub gossip: GossipSettings,
    pub governance: GovernanceSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            cors_origin: "http://localhost:3000".into(),
            storage: StorageConfig::default(),
            gossip: GossipSettings::default(),
            governance: GovernanceSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    File {
        root: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipSettings {
    pub enabled: bool,
    pub topic: String,
    pub inbound_capacity: usize,
    pub transport: TransportSettings,
}

impl Default for GossipSettings {
    fn default() -> Self {
        let base = GossipConfig::default();
        Self {
            enabled: true,
            topic: base.topic,
            inbound_capacity: base.inbound_capacity,
            transport: TransportSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportSettings {
    /// In-process hub; the node only reaches peers in the same process.
    #[default]
    Memory,
    /// Gossipsub over TCP. Addresses are multiaddrs such as `/ip4/0.0.0.0/tcp/4001`.
    Libp2p {
        listen: String,
        #[serde(default)]
        peers: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceSettings {
    pub default_duration_secs: u64,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_VOTING_DURATION_SECS,
        }
    }
}

impl ServerConfig {
    /// Read `path` if given (defaults otherwise), then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Apply `PORT`, `CORS_ORIGIN`, and `LIBP2P_TOPIC` as looked up by `lookup`.
    ///
    /// `GOSSIP_TOPIC` is read as a fallback when `LIBP2P_TOPIC` is unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| ServerError::Config(format!("PORT={port}: {e}")))?;
            self.bind_addr.set_port(port);
        }
        if let Some(origin) = lookup("CORS_ORIGIN") {
            self.cors_origin = origin;
        }
        if let Some((key, topic)) = ["LIBP2P_TOPIC", "GOSSIP_TOPIC"]
            .into_iter()
            .find_map(|key| lookup(key).map(|topic| (key, topic)))
        {
            if topic.trim().is_empty() {
                return Err(ServerError::Config(format!("{key} must not be empty")));
            }
            self.gossip.topic = topic;
        }
        Ok(())
    }

    pub fn gossip_config(&self) -> GossipConfig {
        GossipConfig {
            topic: self.gossip.topic.clone(),
            inbound_capacity: self.gossip.inbound_capacity,
        }
    }
}
