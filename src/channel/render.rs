//! # Render Channel
//!
//! A dedicated, unshared channel between one bridge and its rendering
//! surface. No id filtering happens here.

use log::warn;
use tokio::sync::mpsc;

use super::{Endpoint, RenderEndpoint};
use crate::core::message::Envelope;

pub fn render_channel() -> (RenderLink, RenderEnginePort) {
    let (to_engine, engine_rx) = mpsc::unbounded_channel();
    let (to_bridge, bridge_rx) = mpsc::unbounded_channel();
    let link = RenderLink {
        endpoint: Endpoint::new("render", to_engine),
        inbound: bridge_rx,
    };
    let port = RenderEnginePort {
        inbound: engine_rx,
        outbound: to_bridge,
    };
    (link, port)
}

/// Bridge-side end: where to send, and where the engine's messages arrive.
pub struct RenderLink {
    pub endpoint: RenderEndpoint,
    pub inbound: mpsc::UnboundedReceiver<Envelope>,
}

/// Engine-side end of a render channel.
pub struct RenderEnginePort {
    inbound: mpsc::UnboundedReceiver<Envelope>,
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl RenderEnginePort {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.inbound.try_recv().ok()
    }

    pub fn post(&self, envelope: Envelope) {
        if let Err(e) = self.outbound.send(envelope) {
            warn!("[render] bridge gone, dropped {}", e.0.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{RenderInbound, RenderOutbound};

    #[test]
    fn test_messages_flow_both_ways() {
        let (mut link, mut port) = render_channel();
        link.endpoint.send(RenderOutbound::ShowToast(Default::default()));
        assert_eq!(port.try_recv().unwrap().kind, "showToast");

        port.post(RenderInbound::UiResourceLoaded.into_envelope());
        assert_eq!(link.inbound.try_recv().unwrap().kind, "uiResourceLoaded");
    }

    #[test]
    fn test_messages_keep_fifo_order() {
        let (mut link, port) = render_channel();
        for id in ["m1", "m2", "m3"] {
            port.post(RenderInbound::ModuleMounted { id: id.into() }.into_envelope());
        }
        let ids: Vec<String> = std::iter::from_fn(|| link.inbound.try_recv().ok())
            .map(|e| e.body["id"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }
}
