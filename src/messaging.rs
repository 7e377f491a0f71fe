//! Typed cross-context messages and the bus that carries them.
//!
//! Every [`MessageBus`] handle belongs to one endpoint. Clones share the
//! endpoint; [`MessageBus::connect`] opens a new one on the same channel.
//! Dispatchers skip what their own endpoint published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::settings::Settings;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Settings pushed to every context. `None` asks for the current settings.
    SyncSettings {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settings: Option<Settings>,
    },
    /// Target language changed in the active context.
    TargetChanged { target: String },
    /// Ask the session holder whether a user token is stored.
    GetLoginStatus,
    /// Reply to [`Message::GetLoginStatus`].
    LoginStatus {
        status: bool,
        #[serde(default)]
        token: Option<String>,
    },
    /// Store a user token; `None` logs out.
    StoreUserToken {
        #[serde(default)]
        token: Option<String>,
    },
}

/// A message plus the endpoint that published it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: u64,
    pub message: Message,
}

/// Receives every message published on a bus.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message);
}

/// Fans one message out to several handlers, in order.
pub struct HandlerChain {
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<Arc<dyn MessageHandler>>) -> Self {
        Self { handlers }
    }
}

impl MessageHandler for HandlerChain {
    fn handle(&self, message: &Message) {
        for handler in &self.handlers {
            handler.handle(message);
        }
    }
}

#[derive(Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Envelope>,
    origin: u64,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A new endpoint on the same channel.
    pub fn connect(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Publish to all current subscribers. Having none is fine.
    pub fn publish(&self, message: Message) {
        let envelope = Envelope {
            origin: self.origin,
            message,
        };
        match self.tx.send(envelope) {
            Ok(receivers) => debug!(receivers, origin = self.origin, "message_published"),
            Err(_) => debug!("message_published_without_subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}

/// Route every message other endpoints publish on `bus` through `handler`
/// until the bus closes. Must be called inside a tokio runtime.
pub fn spawn_dispatch(bus: &MessageBus, handler: Arc<dyn MessageHandler>) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    let own = bus.origin;
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) if envelope.origin == own => {}
                Ok(envelope) => handler.handle(&envelope.message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "message dispatcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("message dispatcher exiting (bus closed)");
                    return;
                }
            }
        }
    })
}
