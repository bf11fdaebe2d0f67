//! # Bridge Controller
//!
//! One `Bridge` per page. It owns the page's identity and readiness, and is
//! the only thing that talks to both engines.
//!
//! ```text
//! Bridge
//! ├── id: BridgeId                   // stamps/filters logic traffic
//! ├── options: BridgeOptions         // immutable startup parameters
//! ├── readiness: Readiness           // handshake gate
//! ├── logic: LogicEndpoint           // shared logic channel (send half)
//! ├── render: Option<RenderEndpoint> // dedicated render channel, set by init()
//! └── host: Arc<dyn SurfaceHost>     // where the surface gets attached
//! ```
//!
//! Inbound handling never fails toward the caller. Unknown kinds, foreign ids,
//! malformed bodies and out-of-order milestones are logged and dropped.

use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::channel::{
    LogicEndpoint, LogicHub, LogicSubscription, RenderEndpoint, RenderLink, SurfaceError,
    SurfaceFactory, SurfaceHost, SurfaceOptions,
};
use crate::core::identity::BridgeId;
use crate::core::message::{
    Envelope, LogicInbound, LogicOutbound, Outbound, RenderInbound, RenderOutbound,
};
use crate::core::options::BridgeOptions;
use crate::core::readiness::{Milestone, Readiness, Side};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum BridgeError {
    Surface(SurfaceError),
    /// `init` was called on a bridge that already has a render channel.
    AlreadyInitialized,
    /// The bridge task is no longer running.
    Stopped,
    /// The bridge task panicked or was cancelled.
    Task(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Surface(e) => write!(f, "{e}"),
            BridgeError::AlreadyInitialized => write!(f, "bridge already initialized"),
            BridgeError::Stopped => write!(f, "bridge stopped"),
            BridgeError::Task(msg) => write!(f, "bridge task failed: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<SurfaceError> for BridgeError {
    fn from(e: SurfaceError) -> Self {
        BridgeError::Surface(e)
    }
}

// ============================================================================
// Bridge
// ============================================================================

pub struct Bridge {
    id: BridgeId,
    options: BridgeOptions,
    readiness: Readiness,
    logic: LogicEndpoint,
    render: Option<RenderEndpoint>,
    host: Arc<dyn SurfaceHost>,
}

impl Bridge {
    /// Creates a bridge with a fresh id and subscribes it to the logic hub.
    /// The returned subscription yields only this bridge's logic messages.
    pub fn new(
        options: BridgeOptions,
        hub: &LogicHub,
        host: Arc<dyn SurfaceHost>,
    ) -> (Self, LogicSubscription) {
        let id = BridgeId::generate();
        let subscription = hub.subscribe(id.clone());
        info!("Bridge {} created for page {}", id, options.page_path);
        let bridge = Self {
            id,
            options,
            readiness: Readiness::default(),
            logic: hub.endpoint(),
            render: None,
            host,
        };
        (bridge, subscription)
    }

    pub fn id(&self) -> &BridgeId {
        &self.id
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_initialized(&self) -> bool {
        self.render.is_some()
    }

    /// Creates the rendering surface, attaches it to the host, and waits for it
    /// to come up. Returns the receiver of the surface's messages.
    pub async fn init(
        &mut self,
        factory: &dyn SurfaceFactory,
    ) -> Result<UnboundedReceiver<Envelope>, BridgeError> {
        if self.is_initialized() {
            return Err(BridgeError::AlreadyInitialized);
        }
        let options = SurfaceOptions {
            is_root: self.options.is_root,
            config_info: self.options.config_info.clone(),
        };
        let pending = factory.create_surface(options).await?;
        self.host.append_surface(&pending.handle);
        debug!(
            "Bridge {} attached surface {} ({})",
            self.id,
            pending.handle.label,
            factory.name()
        );
        let link = pending.ready.await.map_err(|_| SurfaceError::Aborted)?;
        info!("Bridge {} surface ready", self.id);
        Ok(self.install_render(link))
    }

    pub(crate) fn install_render(&mut self, link: RenderLink) -> UnboundedReceiver<Envelope> {
        self.render = Some(link.endpoint);
        link.inbound
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Asks both engines to load the page resources.
    pub fn start(&self) {
        info!("Bridge {} starting", self.id);
        self.send_render(self.render_load_resource());
        self.logic.send(LogicOutbound::LoadResource {
            app_id: self.options.app_id.clone(),
            bridge_id: self.id.clone(),
            pages: self.options.pages.clone(),
        });
    }

    /// Starts without the logic engine: its side counts as loaded right away
    /// and only the rendering engine is asked to load.
    pub fn start_without_logic(&mut self) {
        info!("Bridge {} starting without logic", self.id);
        if self.advance(Milestone::ResourcesLoaded(Side::Logic)) {
            self.send_render(self.render_load_resource());
        }
    }

    // ------------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------------

    /// Handles one message from the (shared) logic channel.
    pub fn on_logic_message(&mut self, envelope: Envelope) {
        if !envelope.is_for(&self.id) {
            debug!("Bridge {} skipped {} for another bridge", self.id, envelope.kind);
            return;
        }
        match LogicInbound::decode(envelope) {
            Ok(message) => self.handle_logic(message),
            Err(e) => warn!("Bridge {} ignored logic message: {}", self.id, e),
        }
    }

    /// Handles one message from this bridge's rendering surface.
    pub fn on_render_message(&mut self, envelope: Envelope) {
        match RenderInbound::decode(envelope) {
            Ok(message) => self.handle_render(message),
            Err(e) => warn!("Bridge {} ignored render message: {}", self.id, e),
        }
    }

    fn handle_logic(&mut self, message: LogicInbound) {
        debug!("Bridge {} <- logic {:?}", self.id, message);
        match message {
            LogicInbound::LogicResourceLoaded => self.resources_loaded(Side::Logic),
            LogicInbound::AppIsCreated => {
                if self.advance(Milestone::AppCreated) {
                    self.logic.send(LogicOutbound::MarkPageInitialData {
                        bridge_id: self.id.clone(),
                        page_path: self.options.page_path.clone(),
                    });
                }
            }
            LogicInbound::InitialDataIsReady { initial_data } => {
                if self.advance(Milestone::InitialDataReady) {
                    self.send_render(RenderOutbound::SetInitialData {
                        initial_data,
                        bridge_id: self.id.clone(),
                        page_path: self.options.page_path.clone(),
                    });
                }
            }
            LogicInbound::UpdateModule(update) => {
                self.send_render(RenderOutbound::UpdateModule(update));
            }
            LogicInbound::ShowToast { params } => {
                self.send_render(RenderOutbound::ShowToast(params));
            }
        }
    }

    fn handle_render(&mut self, message: RenderInbound) {
        debug!("Bridge {} <- render {:?}", self.id, message);
        match message {
            RenderInbound::UiResourceLoaded => self.resources_loaded(Side::Render),
            RenderInbound::ModuleCreated { id, path } => {
                self.logic.send(LogicOutbound::CreateInstance {
                    id,
                    path,
                    bridge_id: self.id.clone(),
                    query: self.options.query.clone(),
                });
            }
            RenderInbound::ModuleMounted { id } => {
                self.logic.send(LogicOutbound::ModuleMounted {
                    id,
                    bridge_id: self.id.clone(),
                });
            }
            RenderInbound::PageScroll(payload) => {
                self.logic.send(LogicOutbound::PageScroll(self.stamp(payload)));
            }
            RenderInbound::TriggerEvent(payload) => {
                self.logic
                    .send(LogicOutbound::TriggerEvent(self.stamp(payload)));
            }
        }
    }

    fn resources_loaded(&mut self, side: Side) {
        if !self.advance(Milestone::ResourcesLoaded(side)) {
            return;
        }
        if self.readiness == Readiness::BothReady {
            info!("Bridge {} both sides loaded, creating app", self.id);
            self.logic.send(LogicOutbound::CreateApp {
                bridge_id: self.id.clone(),
                scene: self.options.scene,
                page_path: self.options.page_path.clone(),
                query: self.options.query.clone(),
            });
        }
    }

    /// Applies a milestone, logging rejections. True if readiness moved (or
    /// the milestone was otherwise accepted).
    fn advance(&mut self, milestone: Milestone) -> bool {
        match self.readiness.advance(milestone) {
            Ok(state) => {
                debug!("Bridge {} readiness {:?} (rank {})", self.id, state, state.rank());
                true
            }
            Err(rejection) => {
                warn!("Bridge {} rejected milestone: {}", self.id, rejection);
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle (no-ops until both sides are loaded)
    // ------------------------------------------------------------------------

    pub fn app_show(&self) {
        self.lifecycle(LogicOutbound::AppShow {
            bridge_id: self.id.clone(),
        });
    }

    pub fn app_hide(&self) {
        self.lifecycle(LogicOutbound::AppHide {
            bridge_id: self.id.clone(),
        });
    }

    pub fn page_show(&self) {
        self.lifecycle(LogicOutbound::PageShow {
            bridge_id: self.id.clone(),
        });
    }

    pub fn page_hide(&self) {
        self.lifecycle(LogicOutbound::PageHide {
            bridge_id: self.id.clone(),
        });
    }

    /// Teardown. Nothing should be sent for this bridge afterwards.
    pub fn page_unload(&self) {
        self.lifecycle(LogicOutbound::PageUnload {
            bridge_id: self.id.clone(),
        });
    }

    fn lifecycle(&self, message: LogicOutbound) {
        if !self.readiness.is_open() {
            warn!(
                "Bridge {} dropped {} (readiness {:?})",
                self.id,
                message.kind(),
                self.readiness
            );
            return;
        }
        self.logic.send(message);
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn render_load_resource(&self) -> RenderOutbound {
        RenderOutbound::LoadResource {
            app_id: self.options.app_id.clone(),
            pages: self.options.pages.clone(),
        }
    }

    fn send_render(&self, message: RenderOutbound) {
        match &self.render {
            Some(endpoint) => endpoint.send(message),
            None => warn!(
                "Bridge {} has no surface yet, dropped {}",
                self.id,
                message.kind()
            ),
        }
    }

    /// Tags a forwarded payload with this bridge's id for the shared logic channel.
    fn stamp(&self, mut payload: Map<String, Value>) -> Map<String, Value> {
        payload.insert(
            "bridgeId".to_string(),
            Value::String(self.id.as_str().to_string()),
        );
        payload
    }
}
