//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::channel::{LogicEnginePort, LogicSubscription, RenderEnginePort, logic_channel, render_channel};
use crate::core::bridge::Bridge;
use crate::core::identity::BridgeId;
use crate::core::message::{Envelope, LogicInbound, RenderInbound};
use crate::core::options::BridgeOptions;
use crate::host::simulated::RecordingContainer;

/// A bridge wired to in-memory engine ports, so tests can read exactly what
/// it sent on each channel.
pub struct TestBridge {
    pub bridge: Bridge,
    pub logic: LogicEnginePort,
    pub render: RenderEnginePort,
    /// What the render engine posted, waiting to be fed to the bridge.
    pub render_inbound: UnboundedReceiver<Envelope>,
    _subscription: LogicSubscription,
}

impl TestBridge {
    /// Takes everything sent so far: `(logic, render)`.
    pub fn drain(&mut self) -> (Vec<Envelope>, Vec<Envelope>) {
        let logic = std::iter::from_fn(|| self.logic.try_recv()).collect();
        let render = std::iter::from_fn(|| self.render.try_recv()).collect();
        (logic, render)
    }

    /// Hands everything the render engine posted to the bridge.
    pub fn pump_render(&mut self) {
        while let Ok(envelope) = self.render_inbound.try_recv() {
            self.bridge.on_render_message(envelope);
        }
    }
}

/// Creates an initialized bridge (render channel installed, not started).
pub fn test_bridge(options: BridgeOptions) -> TestBridge {
    let (hub, logic) = logic_channel(16);
    let (mut bridge, subscription) =
        Bridge::new(options, &hub, Arc::new(RecordingContainer::default()));
    let (link, render) = render_channel();
    let render_inbound = bridge.install_render(link);
    TestBridge {
        bridge,
        logic,
        render,
        render_inbound,
        _subscription: subscription,
    }
}

/// `/home` of `demo-app`, scene 1001, query `tab=news`.
pub fn home_options() -> BridgeOptions {
    let mut options = BridgeOptions::new("demo-app", "/home");
    options.scene = 1001;
    options.query.insert("tab".into(), json!("news"));
    options
}

pub fn kinds(envelopes: &[Envelope]) -> Vec<&str> {
    envelopes.iter().map(|e| e.kind.as_str()).collect()
}

pub fn logic_envelope(message: LogicInbound, id: &BridgeId) -> Envelope {
    message.into_envelope(id)
}

pub fn render_envelope(message: RenderInbound) -> Envelope {
    message.into_envelope()
}
