//! Dissemination layer for the NataCoin record engine.
//!
//! A [`GossipNode`] joins one configured topic through a [`Transport`],
//! broadcasts [`Announcement`]s to every subscriber of that topic, and routes
//! inbound announcements to handlers through a [`Dispatcher`] keyed by the
//! `type` discriminator.
//!
//! # Lifecycle
//!
//! `Stopped → Starting → Running → Stopping → Stopped`. Publishing outside
//! `Running` fails immediately with [`GossipError::NotRunning`]; `stop()` is
//! idempotent.
//!
//! # Transports
//!
//! - [`MemoryTransport`] -- peers sharing a [`MemoryHub`] in one process
//! - [`Libp2pTransport`] -- gossipsub over TCP/noise/yamux between real peers
//!
//! Delivery order across peers is not guaranteed.

pub mod dispatch;
pub mod error;
pub mod memory;
pub mod message;
pub mod node;
pub mod p2p;
pub mod transport;

pub use dispatch::{AnnouncementHandler, DispatchOutcome, Dispatcher, HandlerResult};
pub use error::{GossipError, GossipResult};
pub use memory::{MemoryHub, MemoryTransport};
pub use message::{Announcement, CommunityMessage, InboundMessage, MessageKind};
pub use node::{GossipConfig, GossipNode, NodeInfo, NodeState, DEFAULT_TOPIC};
pub use p2p::{Libp2pTransport, Libp2pTransportConfig, MAX_MESSAGE_SIZE};
pub use transport::{InboundSender, Transport, TransportSession};

pub use libp2p::Multiaddr;
