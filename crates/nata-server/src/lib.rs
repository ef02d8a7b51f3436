//! HTTP server for the NataCoin record engine.
//!
//! Exposes the content-addressed record store, the governance ledger, the
//! dissemination node, and the residency registry over a JSON API. All
//! components are built from a [`ServerConfig`] and shared through
//! [`AppState`]; nothing is global.

pub mod config;
pub mod error;
pub mod governance;
pub mod handler;
pub mod records;
pub mod replication;
pub mod residency;
pub mod router;
pub mod server;
pub mod state;

pub use config::{GossipSettings, GovernanceSettings, ServerConfig, StorageConfig, TransportSettings};
pub use error::{ServerError, ServerResult};
pub use residency::{InMemoryResidencyRegistry, ResidencyProof, ResidencyRegistry};
pub use server::NataServer;
pub use state::{AppState, AttestationLog};
