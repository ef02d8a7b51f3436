use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use nata_types::PeerId;

use crate::dispatch::{AnnouncementHandler, Dispatcher};
use crate::error::{GossipError, GossipResult};
use crate::message::{Announcement, InboundMessage, MessageKind};
use crate::transport::{Transport, TransportSession};

/// Topic joined when none is configured.
pub const DEFAULT_TOPIC: &str = "natacoin-property-attestations";

/// Lifecycle of a [`GossipNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GossipConfig {
    pub topic: String,
    /// Inbound payloads buffered between the transport and the dispatcher.
    pub inbound_capacity: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_owned(),
            inbound_capacity: 1024,
        }
    }
}

/// Snapshot of a node for status endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub peer_id: Option<PeerId>,
    pub addresses: Vec<String>,
    pub topic: String,
    pub state: NodeState,
    pub running: bool,
    pub connected_peers: usize,
    pub transport: String,
}

/// A participant on the dissemination topic.
///
/// Lifecycle transitions are serialized by an async mutex; `publish` only
/// takes a short read of the current session and never waits on a
/// transition in progress.
pub struct GossipNode {
    config: GossipConfig,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    state: RwLock<NodeState>,
    session: RwLock<Option<Arc<dyn TransportSession>>>,
    lifecycle: Mutex<Option<JoinHandle<()>>>,
}

impl GossipNode {
    pub fn new(config: GossipConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            dispatcher: Arc::new(Dispatcher::new()),
            state: RwLock::new(NodeState::Stopped),
            session: RwLock::new(None),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn state(&self) -> NodeState {
        *self.state.read().expect("node state poisoned")
    }

    pub fn is_running(&self) -> bool {
        self.state() == NodeState::Running
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Route inbound announcements of `kind` to `handler`.
    ///
    /// Registration works in any state and survives restarts.
    pub fn register_handler(&self, kind: MessageKind, handler: Arc<dyn AnnouncementHandler>) {
        self.dispatcher.register(kind, handler);
    }

    /// Join the topic. A no-op when already running.
    ///
    /// On failure the node is left `Stopped` and may be started again.
    pub async fn start(&self) -> GossipResult<()> {
        let mut inbound_task = self.lifecycle.lock().await;
        if self.state() == NodeState::Running {
            debug!(topic = %self.config.topic, "gossip node already running");
            return Ok(());
        }

        self.set_state(NodeState::Starting);
        let (tx, rx) = mpsc::channel(self.config.inbound_capacity.max(1));
        let session = match self.transport.open(&self.config.topic, tx).await {
            Ok(session) => session,
            Err(e) => {
                self.set_state(NodeState::Stopped);
                error!(topic = %self.config.topic, error = %e, "gossip node failed to start");
                return Err(match e {
                    GossipError::StartFailure(reason) => GossipError::StartFailure(reason),
                    other => GossipError::StartFailure(other.to_string()),
                });
            }
        };

        *inbound_task = Some(tokio::spawn(inbound_loop(Arc::clone(&self.dispatcher), rx)));
        *self.session.write().expect("node session poisoned") = Some(Arc::clone(&session));
        self.set_state(NodeState::Running);
        info!(
            peer = %session.peer_id(),
            topic = %self.config.topic,
            transport = self.transport.name(),
            "gossip node started"
        );
        Ok(())
    }

    /// Leave the topic. Idempotent; close errors are logged, not returned.
    pub async fn stop(&self) {
        let mut inbound_task = self.lifecycle.lock().await;
        if self.state() == NodeState::Stopped {
            return;
        }

        self.set_state(NodeState::Stopping);
        let session = self.session.write().expect("node session poisoned").take();
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!(error = %e, "transport did not close cleanly");
            }
        }
        if let Some(task) = inbound_task.take() {
            task.abort();
        }
        self.set_state(NodeState::Stopped);
        info!(topic = %self.config.topic, "gossip node stopped");
    }

    /// Broadcast an announcement to every other subscriber.
    pub async fn publish(&self, announcement: &Announcement) -> GossipResult<()> {
        let session = self.running_session()?;
        session.publish(announcement.to_bytes()?).await?;
        debug!(kind = %announcement.kind(), topic = %self.config.topic, "announcement published");
        Ok(())
    }

    /// Broadcast bytes as-is. Receivers still validate them.
    pub async fn publish_raw(&self, payload: Vec<u8>) -> GossipResult<()> {
        self.running_session()?.publish(payload).await
    }

    pub fn node_info(&self) -> NodeInfo {
        let state = self.state();
        let session = self.session.read().expect("node session poisoned").clone();
        NodeInfo {
            peer_id: session.as_ref().map(|s| s.peer_id().clone()),
            addresses: session.as_ref().map(|s| s.listen_addrs()).unwrap_or_default(),
            topic: self.config.topic.clone(),
            state,
            running: state == NodeState::Running,
            connected_peers: session.as_ref().map_or(0, |s| s.connected_peers()),
            transport: self.transport.name().to_owned(),
        }
    }

    fn running_session(&self) -> GossipResult<Arc<dyn TransportSession>> {
        if !self.is_running() {
            return Err(GossipError::NotRunning);
        }
        self.session
            .read()
            .expect("node session poisoned")
            .clone()
            .ok_or(GossipError::NotRunning)
    }

    fn set_state(&self, next: NodeState) {
        *self.state.write().expect("node state poisoned") = next;
    }
}

impl std::fmt::Debug for GossipNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipNode")
            .field("topic", &self.config.topic)
            .field("state", &self.state())
            .field("transport", &self.transport.name())
            .finish()
    }
}

async fn inbound_loop(dispatcher: Arc<Dispatcher>, mut inbound: mpsc::Receiver<InboundMessage>) {
    while let Some(message) = inbound.recv().await {
        let outcome = dispatcher.dispatch(&message);
        debug!(source = %message.source.short_id(), ?outcome, "inbound message dispatched");
    }
    debug!("inbound stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use crate::dispatch::HandlerResult;
    use crate::memory::{MemoryHub, MemoryTransport};
    use crate::message::CommunityMessage;
    use crate::p2p::{Libp2pTransport, Libp2pTransportConfig};
    use crate::transport::InboundSender;

    fn memory_node(hub: &Arc<MemoryHub>) -> GossipNode {
        GossipNode::new(
            GossipConfig::default(),
            Arc::new(MemoryTransport::new(Arc::clone(hub))),
        )
    }

    /// Forwards every handled announcement into a channel the test can await.
    fn channel_handler() -> (
        Arc<dyn AnnouncementHandler>,
        mpsc::UnboundedReceiver<Announcement>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = move |_: &PeerId, announcement: Announcement| -> HandlerResult {
            tx.send(announcement)?;
            Ok(())
        };
        (Arc::new(handler), rx)
    }

    /// Fails a set number of opens, then delegates.
    struct FlakyTransport {
        failures_left: AtomicUsize,
        inner: MemoryTransport,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn open(
            &self,
            topic: &str,
            inbound: InboundSender,
        ) -> GossipResult<Arc<dyn TransportSession>> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(GossipError::StartFailure("listen address in use".into()));
            }
            self.inner.open(topic, inbound).await
        }
    }

    #[tokio::test]
    async fn publish_when_stopped_fails_fast() {
        let node = memory_node(&MemoryHub::new());
        let result = timeout(
            Duration::from_millis(100),
            node.publish(&Announcement::CommunityMessage(CommunityMessage::new("hi"))),
        )
        .await
        .expect("publish must not wait");
        assert!(matches!(result, Err(GossipError::NotRunning)));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let node = memory_node(&MemoryHub::new());
        assert_eq!(node.state(), NodeState::Stopped);
        node.start().await.unwrap();
        assert_eq!(node.state(), NodeState::Running);
        // Second start is a no-op on the same session.
        let peer = node.node_info().peer_id;
        node.start().await.unwrap();
        assert_eq!(node.node_info().peer_id, peer);

        node.stop().await;
        assert_eq!(node.state(), NodeState::Stopped);
        assert!(node.node_info().peer_id.is_none());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let node = memory_node(&MemoryHub::new());
        node.stop().await;
        node.start().await.unwrap();
        node.stop().await;
        node.stop().await;
        assert_eq!(node.state(), NodeState::Stopped);
    }

    #[tokio::test]
    async fn publish_after_stop_fails() {
        let node = memory_node(&MemoryHub::new());
        node.start().await.unwrap();
        node.stop().await;
        let result = node
            .publish(&Announcement::CommunityMessage(CommunityMessage::new("late")))
            .await;
        assert!(matches!(result, Err(GossipError::NotRunning)));
    }

    #[tokio::test]
    async fn failed_start_can_be_retried() {
        let transport = FlakyTransport {
            failures_left: AtomicUsize::new(1),
            inner: MemoryTransport::new(MemoryHub::new()),
        };
        let node = GossipNode::new(GossipConfig::default(), Arc::new(transport));

        let err = node.start().await.unwrap_err();
        assert!(matches!(err, GossipError::StartFailure(_)));
        assert_eq!(node.state(), NodeState::Stopped);

        node.start().await.unwrap();
        assert!(node.is_running());
    }

    #[tokio::test]
    async fn community_message_reaches_only_its_handler() {
        let hub = MemoryHub::new();
        let sender = memory_node(&hub);
        let receiver = memory_node(&hub);
        let (community, mut community_rx) = channel_handler();
        let (attestation, mut attestation_rx) = channel_handler();
        receiver.register_handler(MessageKind::CommunityMessage, community);
        receiver.register_handler(MessageKind::PropertyAttestation, attestation);
        receiver.start().await.unwrap();
        sender.start().await.unwrap();

        sender
            .publish(&Announcement::CommunityMessage(CommunityMessage::new("hello coop")))
            .await
            .unwrap();

        let got = timeout(Duration::from_secs(1), community_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Announcement::CommunityMessage(CommunityMessage::new("hello coop")));
        assert!(attestation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_type_does_not_end_the_stream() {
        let hub = MemoryHub::new();
        let sender = memory_node(&hub);
        let receiver = memory_node(&hub);
        let (community, mut community_rx) = channel_handler();
        receiver.register_handler(MessageKind::CommunityMessage, community);
        receiver.start().await.unwrap();
        sender.start().await.unwrap();

        sender
            .publish_raw(br#"{"type":"weather_report","temp":21}"#.to_vec())
            .await
            .unwrap();
        sender.publish_raw(b"\x00garbage".to_vec()).await.unwrap();
        sender
            .publish(&Announcement::CommunityMessage(CommunityMessage::new("still here")))
            .await
            .unwrap();

        let got = timeout(Duration::from_secs(1), community_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Announcement::CommunityMessage(CommunityMessage::new("still here")));
    }

    #[tokio::test]
    async fn panicking_handler_does_not_end_the_stream() {
        let hub = MemoryHub::new();
        let sender = memory_node(&hub);
        let receiver = memory_node(&hub);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let calls = AtomicUsize::new(0);
        let handler = move |_: &PeerId, announcement: Announcement| -> HandlerResult {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first community message crashes the handler");
            }
            tx.send(announcement)?;
            Ok(())
        };
        receiver.register_handler(MessageKind::CommunityMessage, Arc::new(handler));
        receiver.start().await.unwrap();
        sender.start().await.unwrap();

        sender
            .publish(&Announcement::CommunityMessage(CommunityMessage::new("first")))
            .await
            .unwrap();
        sender
            .publish(&Announcement::CommunityMessage(CommunityMessage::new("second")))
            .await
            .unwrap();

        let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(got, Announcement::CommunityMessage(CommunityMessage::new("second")));
        assert!(receiver.is_running());
    }

    #[tokio::test]
    async fn node_info_reflects_session() {
        let node = memory_node(&MemoryHub::new());
        let info = node.node_info();
        assert!(!info.running);
        assert_eq!(info.topic, DEFAULT_TOPIC);
        assert_eq!(info.transport, "memory");

        node.start().await.unwrap();
        let info = node.node_info();
        assert!(info.running);
        assert!(info.peer_id.is_some());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["state"], "running");
        assert!(json.get("peerId").is_some());
    }

    #[tokio::test]
    async fn libp2p_nodes_exchange_announcements() {
        let first = GossipNode::new(
            GossipConfig::default(),
            Arc::new(Libp2pTransport::new(Libp2pTransportConfig::loopback())),
        );
        let (community, mut community_rx) = channel_handler();
        first.register_handler(MessageKind::CommunityMessage, community);
        first.start().await.unwrap();
        let first_addr = first.node_info().addresses[0].parse().unwrap();

        let second = GossipNode::new(
            GossipConfig::default(),
            Arc::new(Libp2pTransport::new(
                Libp2pTransportConfig::loopback().with_peer(first_addr),
            )),
        );
        second.start().await.unwrap();
        for _ in 0..400 {
            if second.node_info().connected_peers > 0 && first.node_info().connected_peers > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(second.node_info().transport, "libp2p");

        second
            .publish(&Announcement::CommunityMessage(CommunityMessage::new("over libp2p")))
            .await
            .unwrap();

        let got = timeout(Duration::from_secs(10), community_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Announcement::CommunityMessage(CommunityMessage::new("over libp2p")));

        second.stop().await;
        first.stop().await;
    }
}
