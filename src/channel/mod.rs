//! # Channels
//!
//! The two duplex message paths a bridge sits between. Sends are
//! fire-and-forget on unbounded queues: they never block and never report
//! delivery. A send on a closed channel is logged and dropped.
//!
//! - [`logic`]: one channel shared by every bridge, fanned out by broadcast
//! - [`render`]: one dedicated channel per bridge
//! - [`surface`]: the host-side capabilities used to create a rendering surface

pub mod logic;
pub mod render;
pub mod surface;

use log::{debug, warn};
use std::marker::PhantomData;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::message::{Envelope, LogicOutbound, Outbound, RenderOutbound};

pub use logic::{LogicEnginePort, LogicHub, LogicSubscription, logic_channel};
pub use render::{RenderEnginePort, RenderLink, render_channel};
pub use surface::{PendingSurface, SurfaceError, SurfaceFactory, SurfaceHandle, SurfaceHost, SurfaceOptions};

/// Sending half of a channel, typed by the messages allowed on it.
pub struct Endpoint<M> {
    name: &'static str,
    tx: UnboundedSender<Envelope>,
    _messages: PhantomData<fn(M)>,
}

pub type LogicEndpoint = Endpoint<LogicOutbound>;
pub type RenderEndpoint = Endpoint<RenderOutbound>;

impl<M> Clone for Endpoint<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            _messages: PhantomData,
        }
    }
}

impl<M: Outbound> Endpoint<M> {
    pub fn new(name: &'static str, tx: UnboundedSender<Envelope>) -> Self {
        Self {
            name,
            tx,
            _messages: PhantomData,
        }
    }

    /// Posts a message. Never blocks, never fails loudly.
    pub fn send(&self, message: M) {
        let kind = message.kind();
        debug!("[{}] send {}", self.name, kind);
        if self.tx.send(message.into_envelope()).is_err() {
            warn!("[{}] channel closed, dropped {}", self.name, kind);
        }
    }
}
