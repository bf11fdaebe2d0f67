//! # Logic Channel
//!
//! The logic engine is shared by every page of an app, so its channel is
//! multiplexed:
//!
//! ```text
//!   Bridge A ─┐                                   ┌─► LogicSubscription (A)
//!   Bridge B ─┼─► mpsc ──► logic engine ──► broadcast ─┼─► LogicSubscription (B)
//!   Bridge C ─┘                                   └─► LogicSubscription (C)
//! ```
//!
//! Every bridge sees every engine message; its subscription keeps only the
//! ones stamped with its own `bridgeId`.

use log::{debug, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

use super::{Endpoint, LogicEndpoint};
use crate::core::identity::BridgeId;
use crate::core::message::Envelope;

pub const DEFAULT_LOGIC_CHANNEL_CAPACITY: usize = 256;

/// Creates the shared logic channel. `capacity` bounds how far a slow bridge
/// may fall behind the engine before it starts losing messages.
pub fn logic_channel(capacity: usize) -> (LogicHub, LogicEnginePort) {
    let (to_engine, engine_rx) = mpsc::unbounded_channel();
    let (from_engine, _) = broadcast::channel(capacity.max(1));
    let hub = LogicHub {
        to_engine,
        from_engine: from_engine.clone(),
    };
    let port = LogicEnginePort {
        inbound: engine_rx,
        outbound: from_engine,
    };
    (hub, port)
}

/// Bridge-side view of the logic channel. Cheap to clone.
#[derive(Clone)]
pub struct LogicHub {
    to_engine: mpsc::UnboundedSender<Envelope>,
    from_engine: broadcast::Sender<Envelope>,
}

impl LogicHub {
    pub fn endpoint(&self) -> LogicEndpoint {
        Endpoint::new("logic", self.to_engine.clone())
    }

    /// Starts listening for engine messages addressed to `id`. Messages
    /// posted before this call are not seen.
    pub fn subscribe(&self, id: BridgeId) -> LogicSubscription {
        LogicSubscription {
            id,
            rx: self.from_engine.subscribe(),
        }
    }
}

/// Engine messages for one bridge.
pub struct LogicSubscription {
    id: BridgeId,
    rx: broadcast::Receiver<Envelope>,
}

impl LogicSubscription {
    /// Next message for this bridge, or `None` once the engine side is gone.
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.is_for(&self.id) => return Some(envelope),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("[logic] {} lagged, {} messages lost", self.id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Engine-side end of the logic channel.
pub struct LogicEnginePort {
    inbound: mpsc::UnboundedReceiver<Envelope>,
    outbound: broadcast::Sender<Envelope>,
}

impl LogicEnginePort {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.inbound.try_recv().ok()
    }

    /// Broadcasts a message to every subscribed bridge.
    pub fn post(&self, envelope: Envelope) {
        if let Err(e) = self.outbound.send(envelope) {
            debug!("[logic] no bridge listening, dropped {}", e.0.kind);
        }
    }
}
