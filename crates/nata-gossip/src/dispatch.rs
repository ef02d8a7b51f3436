use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use nata_types::PeerId;

use crate::message::{Announcement, InboundMessage, MessageKind};

/// Result type returned by announcement handlers.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives decoded announcements of one kind.
pub trait AnnouncementHandler: Send + Sync {
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult;
}

impl<F> AnnouncementHandler for F
where
    F: Fn(&PeerId, Announcement) -> HandlerResult + Send + Sync,
{
    fn handle(&self, source: &PeerId, announcement: Announcement) -> HandlerResult {
        self(source, announcement)
    }
}

/// What happened to one inbound payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled(MessageKind),
    /// The handler returned an error or panicked.
    HandlerFailed(MessageKind),
    /// Known kind with no registered handler.
    Unrouted(MessageKind),
    /// Discriminator not recognised.
    Unknown(String),
    /// Not JSON, no `type` field, or fields that do not fit the kind.
    Malformed,
}

/// Routes inbound payloads to handlers by discriminator.
///
/// Every failure is logged and reported as an outcome; nothing here returns
/// an error, so one bad message never ends the inbound stream.
#[derive(Default)]
pub struct Dispatcher {
    routes: RwLock<HashMap<MessageKind, Arc<dyn AnnouncementHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `kind`, replacing any earlier one.
    pub fn register(&self, kind: MessageKind, handler: Arc<dyn AnnouncementHandler>) {
        let previous = self
            .routes
            .write()
            .expect("dispatch table poisoned")
            .insert(kind, handler);
        if previous.is_some() {
            debug!(%kind, "replaced announcement handler");
        }
    }

    pub fn unregister(&self, kind: MessageKind) -> bool {
        self.routes
            .write()
            .expect("dispatch table poisoned")
            .remove(&kind)
            .is_some()
    }

    pub fn is_routed(&self, kind: MessageKind) -> bool {
        self.routes
            .read()
            .expect("dispatch table poisoned")
            .contains_key(&kind)
    }

    pub fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        let value: Value = match serde_json::from_slice(&message.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(source = %message.source, error = %e, "undecodable message dropped");
                return DispatchOutcome::Malformed;
            }
        };

        let Some(discriminator) = value.get("type").and_then(Value::as_str) else {
            warn!(source = %message.source, "message without type dropped");
            return DispatchOutcome::Malformed;
        };

        let Some(kind) = MessageKind::from_discriminator(discriminator) else {
            warn!(source = %message.source, discriminator, "unknown message type dropped");
            return DispatchOutcome::Unknown(discriminator.to_owned());
        };

        let announcement: Announcement = match serde_json::from_value(value) {
            Ok(announcement) => announcement,
            Err(e) => {
                warn!(source = %message.source, %kind, error = %e, "malformed announcement dropped");
                return DispatchOutcome::Malformed;
            }
        };

        let handler = self
            .routes
            .read()
            .expect("dispatch table poisoned")
            .get(&kind)
            .cloned();
        let Some(handler) = handler else {
            debug!(%kind, "no handler registered");
            return DispatchOutcome::Unrouted(kind);
        };

        let source = &message.source;
        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(source, announcement))) {
            Ok(Ok(())) => DispatchOutcome::Handled(kind),
            Ok(Err(e)) => {
                warn!(%source, %kind, error = %e, "announcement handler failed");
                DispatchOutcome::HandlerFailed(kind)
            }
            Err(payload) => {
                warn!(%source, %kind, reason = panic_reason(&*payload), "announcement handler panicked");
                DispatchOutcome::HandlerFailed(kind)
            }
        }
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.read().expect("dispatch table poisoned");
        let mut kinds: Vec<_> = routes.keys().map(MessageKind::discriminator).collect();
        kinds.sort_unstable();
        f.debug_struct("Dispatcher").field("routes", &kinds).finish()
    }
}
