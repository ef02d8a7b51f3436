use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use nata_types::PeerId;

use crate::error::{GossipError, GossipResult};
use crate::message::InboundMessage;
use crate::transport::{deliver, InboundSender, Transport, TransportSession};

const DEFAULT_HUB_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
struct HubFrame {
    origin: PeerId,
    payload: Bytes,
}

/// In-process topic bus shared by every [`MemoryTransport`] built from it.
#[derive(Debug)]
pub struct MemoryHub {
    topics: Mutex<HashMap<String, broadcast::Sender<HubFrame>>>,
    capacity: usize,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_HUB_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may lag before frames are skipped.
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        })
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .expect("hub poisoned")
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn channel(&self, topic: &str) -> broadcast::Sender<HubFrame> {
        self.topics
            .lock()
            .expect("hub poisoned")
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

/// Transport whose peers all live in one process.
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    hub: Arc<MemoryHub>,
}

impl MemoryTransport {
    pub fn new(hub: Arc<MemoryHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn open(
        &self,
        topic: &str,
        inbound: InboundSender,
    ) -> GossipResult<Arc<dyn TransportSession>> {
        let sender = self.hub.channel(topic);
        let mut receiver = sender.subscribe();
        let peer_id = PeerId::random();
        let me = peer_id.clone();

        let forwarder = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(frame) => {
                        if frame.origin == me {
                            continue;
                        }
                        let message = InboundMessage {
                            source: frame.origin,
                            payload: frame.payload.to_vec(),
                        };
                        if !deliver(&inbound, message) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(peer = %me.short_id(), skipped, "subscriber lagged; frames skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(peer = %me.short_id(), "memory forwarder finished");
        });

        debug!(peer = %peer_id.short_id(), topic, "joined memory topic");
        Ok(Arc::new(MemorySession {
            peer_id,
            sender,
            forwarder: Mutex::new(Some(forwarder)),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemorySession {
    peer_id: PeerId,
    sender: broadcast::Sender<HubFrame>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

#[async_trait]
impl TransportSession for MemorySession {
    fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    fn listen_addrs(&self) -> Vec<String> {
        Vec::new()
    }

    fn connected_peers(&self) -> usize {
        self.sender.receiver_count().saturating_sub(1)
    }

    async fn publish(&self, payload: Vec<u8>) -> GossipResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GossipError::Transport("session closed".into()));
        }
        let frame = HubFrame {
            origin: self.peer_id.clone(),
            payload: Bytes::from(payload),
        };
        // No receivers just means nobody else is subscribed yet.
        let _ = self.sender.send(frame);
        Ok(())
    }

    async fn close(&self) -> GossipResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(forwarder) = self.forwarder.lock().expect("session poisoned").take() {
            forwarder.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const TOPIC: &str = "test-topic";

    #[tokio::test]
    async fn peers_receive_each_others_frames() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(Arc::clone(&hub));
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = transport.open(TOPIC, tx_a).await.unwrap();
        let b = transport.open(TOPIC, tx_b).await.unwrap();

        a.publish(b"hello".to_vec()).await.unwrap();
        let got = timeout(Duration::from_secs(1), rx_b.recv()).await.unwrap().unwrap();
        assert_eq!(got.payload, b"hello");
        assert_eq!(&got.source, a.peer_id());

        // A does not hear its own frame.
        assert!(timeout(Duration::from_millis(50), rx_a.recv()).await.is_err());
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(hub);
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = transport.open("one", tx_a).await.unwrap();
        let _b = transport.open("two", tx_b).await.unwrap();

        a.publish(b"x".to_vec()).await.unwrap();
        assert!(timeout(Duration::from_millis(50), rx_b.recv()).await.is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_publish() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(Arc::clone(&hub));
        let (tx, _rx) = mpsc::channel(8);
        let session = transport.open(TOPIC, tx).await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(matches!(
            session.publish(b"late".to_vec()).await,
            Err(GossipError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn subscriber_count_tracks_sessions() {
        let hub = MemoryHub::new();
        let transport = MemoryTransport::new(Arc::clone(&hub));
        assert_eq!(hub.subscriber_count(TOPIC), 0);
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, _rx_b) = mpsc::channel(8);
        let a = transport.open(TOPIC, tx_a).await.unwrap();
        let _b = transport.open(TOPIC, tx_b).await.unwrap();
        assert_eq!(hub.subscriber_count(TOPIC), 2);
        assert_eq!(a.connected_peers(), 1);
    }
}
