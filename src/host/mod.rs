//! # Host Runtime
//!
//! Runs bridges. Each bridge lives in its own tokio task that owns it by
//! value and handles one input at a time, so readiness is never touched by
//! two messages at once:
//!
//! ```text
//!   LogicSubscription ──┐
//!   render inbound    ──┼──► select! ──► Bridge ──► (logic / render sends)
//!   Command queue     ──┘                  │
//!                                          └──► watch<Readiness>
//! ```
//!
//! The task ends after a delivered `pageUnload`, or when every
//! `BridgeHandle` is gone.

pub mod simulated;

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::StartMode;
use crate::channel::{LogicHub, LogicSubscription, SurfaceFactory, SurfaceHost};
use crate::core::bridge::{Bridge, BridgeError};
use crate::core::identity::BridgeId;
use crate::core::message::Envelope;
use crate::core::options::BridgeOptions;
use crate::core::readiness::Readiness;

/// Lifecycle requests from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AppShow,
    AppHide,
    PageShow,
    PageHide,
    PageUnload,
}

/// Creates, initializes, starts and spawns one bridge.
pub async fn launch(
    options: BridgeOptions,
    mode: StartMode,
    hub: &LogicHub,
    host: Arc<dyn SurfaceHost>,
    factory: &dyn SurfaceFactory,
) -> Result<BridgeHandle, BridgeError> {
    let (mut bridge, logic) = Bridge::new(options, hub, host);
    let render = bridge.init(factory).await?;
    match mode {
        StartMode::Full => bridge.start(),
        StartMode::WithoutLogic => bridge.start_without_logic(),
    }

    let id = bridge.id().clone();
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (readiness_tx, readiness) = watch::channel(bridge.readiness());
    let task = tokio::spawn(run(bridge, logic, render, command_rx, readiness_tx));
    info!("Bridge {} launched ({:?})", id, mode);

    Ok(BridgeHandle {
        id,
        commands,
        readiness,
        task,
    })
}

async fn run(
    mut bridge: Bridge,
    mut logic: LogicSubscription,
    mut render: mpsc::UnboundedReceiver<Envelope>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    readiness: watch::Sender<Readiness>,
) -> Bridge {
    let mut logic_open = true;
    let mut render_open = true;

    loop {
        tokio::select! {
            envelope = logic.recv(), if logic_open => match envelope {
                Some(envelope) => bridge.on_logic_message(envelope),
                None => {
                    debug!("Bridge {} logic channel closed", bridge.id());
                    logic_open = false;
                }
            },
            envelope = render.recv(), if render_open => match envelope {
                Some(envelope) => bridge.on_render_message(envelope),
                None => {
                    debug!("Bridge {} render channel closed", bridge.id());
                    render_open = false;
                }
            },
            command = commands.recv() => match command {
                Some(Command::PageUnload) if bridge.readiness().is_open() => {
                    bridge.page_unload();
                    info!("Bridge {} unloaded", bridge.id());
                    break;
                }
                Some(command) => apply(&bridge, command),
                None => {
                    debug!("Bridge {} has no handles left", bridge.id());
                    break;
                }
            },
        }
        readiness.send_if_modified(|current| {
            let next = bridge.readiness();
            let changed = *current != next;
            *current = next;
            changed
        });
    }

    bridge
}

fn apply(bridge: &Bridge, command: Command) {
    match command {
        Command::AppShow => bridge.app_show(),
        Command::AppHide => bridge.app_hide(),
        Command::PageShow => bridge.page_show(),
        Command::PageHide => bridge.page_hide(),
        Command::PageUnload => bridge.page_unload(),
    }
}

/// Host-side control of a running bridge.
pub struct BridgeHandle {
    id: BridgeId,
    commands: mpsc::UnboundedSender<Command>,
    readiness: watch::Receiver<Readiness>,
    task: JoinHandle<Bridge>,
}

impl BridgeHandle {
    pub fn id(&self) -> &BridgeId {
        &self.id
    }

    /// Waits until readiness reaches at least `target`'s rank.
    pub async fn wait_for(&mut self, target: Readiness) -> Result<Readiness, BridgeError> {
        let reached = self
            .readiness
            .wait_for(|current| current.rank() >= target.rank())
            .await
            .map_err(|_| BridgeError::Stopped)?;
        Ok(*reached)
    }

    pub fn app_show(&self) {
        self.command(Command::AppShow);
    }

    pub fn app_hide(&self) {
        self.command(Command::AppHide);
    }

    pub fn page_show(&self) {
        self.command(Command::PageShow);
    }

    pub fn page_hide(&self) {
        self.command(Command::PageHide);
    }

    pub fn page_unload(&self) {
        self.command(Command::PageUnload);
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Bridge {} stopped, dropped {:?}", self.id, command);
        }
    }

    /// Closes the command queue, waits for the task to stop, and returns the
    /// bridge as it was left.
    pub async fn join(self) -> Result<Bridge, BridgeError> {
        let BridgeHandle { commands, task, .. } = self;
        drop(commands);
        task.await.map_err(|e| BridgeError::Task(e.to_string()))
    }
}
