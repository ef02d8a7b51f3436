use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use nata_types::PeerId;

use crate::error::GossipResult;
use crate::message::InboundMessage;

/// Channel through which a transport hands received payloads to its node.
pub type InboundSender = mpsc::Sender<InboundMessage>;

/// Pub/sub transport capability.
///
/// `open` establishes whatever network state the transport needs and joins
/// `topic`. Received payloads for the topic are pushed into `inbound`; the
/// transport must never block its own I/O on that channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for status reporting.
    fn name(&self) -> &'static str;

    async fn open(
        &self,
        topic: &str,
        inbound: InboundSender,
    ) -> GossipResult<Arc<dyn TransportSession>>;
}

/// A joined topic on an open transport.
#[async_trait]
pub trait TransportSession: Send + Sync {
    fn peer_id(&self) -> &PeerId;

    /// Addresses other peers can reach this session on, if any.
    fn listen_addrs(&self) -> Vec<String>;

    /// Number of currently connected peers, where the transport knows it.
    fn connected_peers(&self) -> usize;

    /// Broadcast a payload to every other subscriber of the topic.
    async fn publish(&self, payload: Vec<u8>) -> GossipResult<()>;

    /// Leave the topic and release transport resources. Idempotent.
    async fn close(&self) -> GossipResult<()>;
}

/// Hand a payload to the node without waiting.
///
/// A full channel drops the payload with a warning. Returns `false` once the
/// node side has gone away.
pub(crate) fn deliver(inbound: &InboundSender, message: InboundMessage) -> bool {
    match inbound.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(message)) => {
            warn!(source = %message.source, "inbound queue full; message dropped");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
