use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::multiaddr::Protocol;
use libp2p::swarm::SwarmEvent;
use libp2p::{gossipsub, noise, tcp, yamux, Multiaddr, Swarm, SwarmBuilder};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};

use nata_types::PeerId;

use crate::error::{GossipError, GossipResult};
use crate::message::InboundMessage;
use crate::transport::{deliver, InboundSender, Transport, TransportSession};

/// Largest announcement gossipsub will carry.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

const LISTEN_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
const COMMAND_QUEUE: usize = 64;

/// Settings for [`Libp2pTransport`].
#[derive(Clone, Debug)]
pub struct Libp2pTransportConfig {
    /// Address to accept peer connections on, e.g. `/ip4/0.0.0.0/tcp/4001`.
    pub listen: Multiaddr,
    /// Bootstrap peers, dialled at start and redialled while disconnected.
    pub peers: Vec<Multiaddr>,
    pub heartbeat: Duration,
    pub redial_interval: Duration,
    pub idle_timeout: Duration,
}

impl Libp2pTransportConfig {
    pub fn new(listen: Multiaddr) -> Self {
        Self {
            listen,
            peers: Vec::new(),
            heartbeat: Duration::from_secs(1),
            redial_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// Listen on a free loopback port.
    pub fn loopback() -> Self {
        Self::new(Multiaddr::from(Ipv4Addr::LOCALHOST).with(Protocol::Tcp(0)))
    }

    pub fn with_peer(mut self, peer: Multiaddr) -> Self {
        self.peers.push(peer);
        self
    }
}

/// Gossipsub over TCP with noise encryption and yamux multiplexing.
///
/// Each `open` draws a fresh identity, subscribes to the topic and hands the
/// swarm to a background task. Gossipsub's message-id cache keeps a frame
/// from being delivered twice.
#[derive(Clone, Debug)]
pub struct Libp2pTransport {
    config: Libp2pTransportConfig,
}

impl Libp2pTransport {
    pub fn new(config: Libp2pTransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for Libp2pTransport {
    fn name(&self) -> &'static str {
        "libp2p"
    }

    async fn open(
        &self,
        topic: &str,
        inbound: InboundSender,
    ) -> GossipResult<Arc<dyn TransportSession>> {
        let mut swarm = build_swarm(&self.config).map_err(GossipError::StartFailure)?;
        let topic = gossipsub::IdentTopic::new(topic);
        swarm
            .behaviour_mut()
            .subscribe(&topic)
            .map_err(|e| GossipError::StartFailure(format!("subscribe {topic}: {e}")))?;
        swarm.listen_on(self.config.listen.clone()).map_err(|e| {
            GossipError::StartFailure(format!("listen on {}: {e}", self.config.listen))
        })?;
        let first_addr = wait_for_listener(&mut swarm).await?;
        let peer_id = PeerId::new(swarm.local_peer_id().to_string());

        let mut targets = Vec::with_capacity(self.config.peers.len());
        for addr in &self.config.peers {
            match swarm.dial(addr.clone()) {
                Ok(()) => debug!(peer = %addr, "dialling peer"),
                Err(e) => warn!(peer = %addr, error = %e, "peer dial failed"),
            }
            targets.push(DialTarget::new(addr.clone()));
        }

        let status = Arc::new(SessionStatus {
            addrs: RwLock::new(vec![first_addr.to_string()]),
            subscribers: AtomicUsize::new(0),
        });
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let driver = SwarmDriver {
            swarm,
            topic,
            inbound,
            status: Arc::clone(&status),
            targets,
            subscribers: HashSet::new(),
        };
        let task = tokio::spawn(driver.run(command_rx, self.config.redial_interval));
        info!(peer = %peer_id.short_id(), listen = %first_addr, "libp2p transport listening");

        Ok(Arc::new(Libp2pSession {
            peer_id,
            status,
            commands,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        }))
    }
}

fn build_swarm(config: &Libp2pTransportConfig) -> Result<Swarm<gossipsub::Behaviour>, String> {
    let heartbeat = config.heartbeat;
    let idle_timeout = config.idle_timeout;
    let swarm = SwarmBuilder::with_new_identity()
        .with_tokio()
        .with_tcp(
            tcp::Config::default().nodelay(true),
            noise::Config::new,
            yamux::Config::default,
        )
        .map_err(|e| format!("tcp transport: {e}"))?
        .with_behaviour(
            |key| -> Result<gossipsub::Behaviour, Box<dyn std::error::Error + Send + Sync>> {
                // Small cooperatives run a handful of nodes; keep the mesh small enough to fill.
                let gossip_config = gossipsub::ConfigBuilder::default()
                    .heartbeat_interval(heartbeat)
                    .validation_mode(gossipsub::ValidationMode::Strict)
                    .max_transmit_size(MAX_MESSAGE_SIZE)
                    .mesh_n_low(1)
                    .mesh_n(2)
                    .mesh_n_high(3)
                    .mesh_outbound_min(1)
                    .build()?;
                let behaviour = gossipsub::Behaviour::new(
                    gossipsub::MessageAuthenticity::Signed(key.clone()),
                    gossip_config,
                )?;
                Ok(behaviour)
            },
        )
        .map_err(|e| format!("gossipsub: {e}"))?
        .with_swarm_config(|c| c.with_idle_connection_timeout(idle_timeout))
        .build();
    Ok(swarm)
}

async fn wait_for_listener(swarm: &mut Swarm<gossipsub::Behaviour>) -> GossipResult<Multiaddr> {
    let waited = timeout(LISTEN_TIMEOUT, async {
        loop {
            match swarm.select_next_some().await {
                SwarmEvent::NewListenAddr { address, .. } => return Ok(address),
                SwarmEvent::ListenerError { error, .. } => {
                    return Err(GossipError::StartFailure(format!("listener failed: {error}")));
                }
                SwarmEvent::ListenerClosed { reason, .. } => {
                    return Err(GossipError::StartFailure(format!(
                        "listener closed: {reason:?}"
                    )));
                }
                _ => {}
            }
        }
    })
    .await;
    waited.unwrap_or_else(|_| {
        Err(GossipError::StartFailure(
            "no listen address within timeout".into(),
        ))
    })
}

/// Strip a trailing `/p2p/<id>` so dialled and observed addresses compare equal.
fn without_peer_id(addr: &Multiaddr) -> Multiaddr {
    let mut addr = addr.clone();
    if let Some(Protocol::P2p(_)) = addr.iter().last() {
        addr.pop();
    }
    addr
}

struct DialTarget {
    addr: Multiaddr,
    key: Multiaddr,
    peer: Option<libp2p::PeerId>,
}

impl DialTarget {
    fn new(addr: Multiaddr) -> Self {
        Self {
            key: without_peer_id(&addr),
            addr,
            peer: None,
        }
    }
}

struct SessionStatus {
    addrs: RwLock<Vec<String>>,
    /// Connected peers subscribed to the topic.
    subscribers: AtomicUsize,
}

enum Command {
    Publish {
        payload: Vec<u8>,
        reply: oneshot::Sender<GossipResult<()>>,
    },
    Shutdown,
}

struct SwarmDriver {
    swarm: Swarm<gossipsub::Behaviour>,
    topic: gossipsub::IdentTopic,
    inbound: InboundSender,
    status: Arc<SessionStatus>,
    targets: Vec<DialTarget>,
    subscribers: HashSet<libp2p::PeerId>,
}

impl SwarmDriver {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, redial_every: Duration) {
        let redial_every = redial_every.max(Duration::from_secs(1));
        let mut redial = interval_at(Instant::now() + redial_every, redial_every);
        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => {
                    if !self.on_event(event) {
                        debug!("node side of inbound channel closed");
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Publish { payload, reply }) => {
                        let _ = reply.send(self.publish(payload));
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = redial.tick() => self.redial(),
            }
        }
        let _ = self.swarm.behaviour_mut().unsubscribe(&self.topic);
        debug!(topic = %self.topic, "libp2p swarm task finished");
    }

    /// Returns `false` once nobody is left to deliver to.
    fn on_event(&mut self, event: SwarmEvent<gossipsub::Event>) -> bool {
        match event {
            SwarmEvent::Behaviour(gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            }) => {
                let source = message.source.unwrap_or(propagation_source);
                return deliver(
                    &self.inbound,
                    InboundMessage {
                        source: PeerId::new(source.to_string()),
                        payload: message.data,
                    },
                );
            }
            SwarmEvent::Behaviour(gossipsub::Event::Subscribed { peer_id, topic })
                if topic == self.topic.hash() =>
            {
                debug!(peer = %peer_id, "peer joined topic");
                self.subscribers.insert(peer_id);
                self.sync_status();
            }
            SwarmEvent::Behaviour(gossipsub::Event::Unsubscribed { peer_id, topic })
                if topic == self.topic.hash() =>
            {
                debug!(peer = %peer_id, "peer left topic");
                self.subscribers.remove(&peer_id);
                self.sync_status();
            }
            SwarmEvent::ConnectionEstablished {
                peer_id, endpoint, ..
            } => {
                if endpoint.is_dialer() {
                    let remote = without_peer_id(endpoint.get_remote_address());
                    for target in self.targets.iter_mut().filter(|t| t.key == remote) {
                        target.peer = Some(peer_id);
                    }
                }
                debug!(peer = %peer_id, "peer connected");
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                num_established,
                ..
            } => {
                if num_established == 0 {
                    self.subscribers.remove(&peer_id);
                    self.sync_status();
                    debug!(peer = %peer_id, "peer disconnected");
                }
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                warn!(peer = ?peer_id, error = %error, "outgoing connection failed");
            }
            SwarmEvent::NewListenAddr { address, .. } => {
                let address = address.to_string();
                let mut addrs = self.status.addrs.write().expect("status poisoned");
                if !addrs.contains(&address) {
                    addrs.push(address);
                }
            }
            SwarmEvent::ListenerError { error, .. } => {
                warn!(error = %error, "listener error");
            }
            _ => {}
        }
        true
    }

    fn publish(&mut self, payload: Vec<u8>) -> GossipResult<()> {
        if self.subscribers.is_empty() {
            debug!(topic = %self.topic, "no subscribed peers; announcement not sent");
            return Ok(());
        }
        self.swarm
            .behaviour_mut()
            .publish(self.topic.clone(), payload)
            .map(|_| ())
            .map_err(|e| GossipError::Transport(e.to_string()))
    }

    fn redial(&mut self) {
        for target in &mut self.targets {
            if target.peer.is_some_and(|p| self.swarm.is_connected(&p)) {
                continue;
            }
            match self.swarm.dial(target.addr.clone()) {
                Ok(()) => debug!(peer = %target.addr, "redialling peer"),
                Err(e) => debug!(peer = %target.addr, error = %e, "redial failed"),
            }
        }
    }

    fn sync_status(&self) {
        self.status
            .subscribers
            .store(self.subscribers.len(), Ordering::Relaxed);
    }
}

struct Libp2pSession {
    peer_id: PeerId,
    status: Arc<SessionStatus>,
    commands: mpsc::Sender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

#[async_trait]
impl TransportSession for Libp2pSession {
    fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    fn listen_addrs(&self) -> Vec<String> {
        self.status.addrs.read().expect("status poisoned").clone()
    }

    /// Connected peers subscribed to the topic.
    fn connected_peers(&self) -> usize {
        self.status.subscribers.load(Ordering::Relaxed)
    }

    async fn publish(&self, payload: Vec<u8>) -> GossipResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GossipError::Transport("session closed".into()));
        }
        let (reply, result) = oneshot::channel();
        self.commands
            .send(Command::Publish { payload, reply })
            .await
            .map_err(|_| GossipError::Transport("swarm task stopped".into()))?;
        result
            .await
            .map_err(|_| GossipError::Transport("swarm task stopped".into()))?
    }

    async fn close(&self) -> GossipResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.commands.try_send(Command::Shutdown);
        let task = self.task.lock().expect("session poisoned").take();
        if let Some(mut task) = task {
            if timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
                warn!(peer = %self.peer_id.short_id(), "swarm task did not stop in time; aborting");
                task.abort();
            }
        }
        debug!(peer = %self.peer_id.short_id(), "libp2p transport closed");
        Ok(())
    }
}
