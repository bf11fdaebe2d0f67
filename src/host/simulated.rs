//! # Simulated Engines
//!
//! Scripted stand-ins for the logic and rendering engines. They answer the
//! handshake the way the real engines do, which is enough to drive bridges
//! end to end in the CLI demo and the integration tests.
//!
//! | engine receives       | engine answers                          |
//! |-----------------------|-----------------------------------------|
//! | logic `loadResource`  | `logicResourceLoaded`                   |
//! | `createApp`           | `appIsCreated`                          |
//! | `markPageInitialData` | `initialDataIsReady`                    |
//! | `createInstance`      | `updateModule`                          |
//! | render `loadResource` | `uiResourceLoaded`                      |
//! | `setInitialData`      | `moduleCreated`, `moduleMounted`, then any scripted interactions |

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::channel::{
    LogicEnginePort, PendingSurface, RenderEnginePort, SurfaceError, SurfaceFactory,
    SurfaceHandle, SurfaceHost, SurfaceOptions, render_channel,
};
use crate::core::identity::BridgeId;
use crate::core::message::{Envelope, LogicInbound, ModuleUpdate, RenderInbound};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ============================================================================
// Trace
// ============================================================================

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Logic,
    Render,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Bridge → engine.
    ToEngine,
    /// Engine → bridge.
    FromEngine,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub channel: ChannelKind,
    pub direction: Direction,
    pub envelope: Envelope,
}

/// Shared, ordered record of everything the simulated engines saw and sent.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<TraceEntry>>>);

impl Trace {
    pub fn record(&self, channel: ChannelKind, direction: Direction, envelope: &Envelope) {
        lock(&self.0).push(TraceEntry {
            channel,
            direction,
            envelope: envelope.clone(),
        });
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        lock(&self.0).clone()
    }

    /// Kinds seen on one channel in one direction, in order.
    pub fn kinds(&self, channel: ChannelKind, direction: Direction) -> Vec<String> {
        lock(&self.0)
            .iter()
            .filter(|e| e.channel == channel && e.direction == direction)
            .map(|e| e.envelope.kind.clone())
            .collect()
    }

    /// Messages of `kind` the bridges sent to the given engine.
    pub fn sent(&self, channel: ChannelKind, kind: &str) -> Vec<Envelope> {
        lock(&self.0)
            .iter()
            .filter(|e| {
                e.channel == channel && e.direction == Direction::ToEngine && e.envelope.kind == kind
            })
            .map(|e| e.envelope.clone())
            .collect()
    }
}

// ============================================================================
// Logic Engine
// ============================================================================

pub struct ScriptedLogicEngine {
    initial_data: Value,
    trace: Trace,
}

impl ScriptedLogicEngine {
    /// `initial_data` is what every page receives in `initialDataIsReady`.
    pub fn new(initial_data: Value, trace: Trace) -> Self {
        Self {
            initial_data,
            trace,
        }
    }

    pub fn spawn(self, mut port: LogicEnginePort) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = port.recv().await {
                self.trace
                    .record(ChannelKind::Logic, Direction::ToEngine, &envelope);
                for reply in self.respond(&envelope) {
                    self.trace
                        .record(ChannelKind::Logic, Direction::FromEngine, &reply);
                    port.post(reply);
                }
            }
            debug!("Scripted logic engine stopped");
        })
    }

    fn respond(&self, envelope: &Envelope) -> Vec<Envelope> {
        let Some(raw_id) = envelope.bridge_id() else {
            warn!("Scripted logic engine got {} without bridgeId", envelope.kind);
            return Vec::new();
        };
        let id = BridgeId::from_wire(raw_id);
        let reply = match envelope.kind.as_str() {
            "loadResource" => LogicInbound::LogicResourceLoaded,
            "createApp" => LogicInbound::AppIsCreated,
            "markPageInitialData" => LogicInbound::InitialDataIsReady {
                initial_data: self.initial_data.clone(),
            },
            "createInstance" => {
                LogicInbound::UpdateModule(ModuleUpdate {
                    id: envelope.body["id"].clone(),
                    data: Some(json!({ "created": true })),
                })
            }
            _ => return Vec::new(),
        };
        vec![reply.into_envelope(&id)]
    }
}

// ============================================================================
// Rendering Engine
// ============================================================================

struct ScriptedRenderEngine {
    label: String,
    interactions: Vec<RenderInbound>,
    trace: Trace,
}

impl ScriptedRenderEngine {
    async fn run(self, mut port: RenderEnginePort) {
        let mut modules = 0usize;
        while let Some(envelope) = port.recv().await {
            self.trace
                .record(ChannelKind::Render, Direction::ToEngine, &envelope);
            let replies = match envelope.kind.as_str() {
                "loadResource" => vec![RenderInbound::UiResourceLoaded],
                "setInitialData" => {
                    modules += 1;
                    let id = json!(format!("{}_module_{}", self.label, modules));
                    let path = envelope.body["pagePath"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    let mut replies = vec![
                        RenderInbound::ModuleCreated {
                            id: id.clone(),
                            path,
                        },
                        RenderInbound::ModuleMounted { id },
                    ];
                    replies.extend(self.interactions.iter().cloned());
                    replies
                }
                _ => Vec::new(),
            };
            for reply in replies {
                let reply = reply.into_envelope();
                self.trace
                    .record(ChannelKind::Render, Direction::FromEngine, &reply);
                port.post(reply);
            }
        }
        debug!("Scripted render engine {} stopped", self.label);
    }
}

/// Creates surfaces backed by a scripted rendering engine.
pub struct SimulatedSurfaceFactory {
    trace: Trace,
    interactions: Vec<RenderInbound>,
    created: AtomicUsize,
}

impl SimulatedSurfaceFactory {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            interactions: Vec::new(),
            created: AtomicUsize::new(0),
        }
    }

    /// User interaction each surface replays after its page is mounted.
    pub fn with_interactions(mut self, interactions: Vec<RenderInbound>) -> Self {
        self.interactions = interactions;
        self
    }
}

#[async_trait]
impl SurfaceFactory for SimulatedSurfaceFactory {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn create_surface(&self, options: SurfaceOptions) -> Result<PendingSurface, SurfaceError> {
        let n = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        let label = format!("surface_{n}");
        debug!("Creating {} with {:?}", label, options);

        let (link, port) = render_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let engine = ScriptedRenderEngine {
            label: label.clone(),
            interactions: self.interactions.clone(),
            trace: self.trace.clone(),
        };
        tokio::spawn(async move {
            if ready_tx.send(link).is_err() {
                warn!("Surface abandoned before ready");
                return;
            }
            engine.run(port).await;
        });

        Ok(PendingSurface {
            handle: SurfaceHandle {
                label,
                is_root: options.is_root,
            },
            ready: ready_rx,
        })
    }
}

// ============================================================================
// Container
// ============================================================================

/// A `SurfaceHost` that just remembers what was attached to it.
#[derive(Default)]
pub struct RecordingContainer {
    surfaces: Mutex<Vec<SurfaceHandle>>,
}

impl RecordingContainer {
    pub fn surfaces(&self) -> Vec<SurfaceHandle> {
        lock(&self.surfaces).clone()
    }
}

impl SurfaceHost for RecordingContainer {
    fn append_surface(&self, surface: &SurfaceHandle) {
        debug!("Container appended {}", surface.label);
        lock(&self.surfaces).push(surface.clone());
    }
}
