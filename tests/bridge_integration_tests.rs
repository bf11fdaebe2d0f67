use async_trait::async_trait;
use pagebridge::StartMode;
use pagebridge::channel::{
    PendingSurface, SurfaceError, SurfaceFactory, SurfaceHost, SurfaceOptions, logic_channel,
};
use pagebridge::core::bridge::{Bridge, BridgeError};
use pagebridge::core::message::{Envelope, RenderInbound, payload};
use pagebridge::core::options::BridgeOptions;
use pagebridge::core::readiness::{Readiness, Side};
use pagebridge::host::{
    self, BridgeHandle,
    simulated::{
        ChannelKind, Direction, RecordingContainer, ScriptedLogicEngine, SimulatedSurfaceFactory,
        Trace,
    },
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

// ============================================================================
// Helper Functions
// ============================================================================

const TIMEOUT: Duration = Duration::from_secs(5);

fn home_options() -> BridgeOptions {
    let mut options = BridgeOptions::new("demo-app", "/home");
    options.scene = 1001;
    options.query.insert("tab".into(), json!("news"));
    options
}

/// A full simulated runtime: shared logic engine, surface factory, container.
struct Harness {
    hub: pagebridge::channel::LogicHub,
    engine: JoinHandle<()>,
    factory: SimulatedSurfaceFactory,
    container: Arc<RecordingContainer>,
    trace: Trace,
}

impl Harness {
    fn new() -> Self {
        Self::with_interactions(Vec::new())
    }

    fn with_interactions(interactions: Vec<RenderInbound>) -> Self {
        let trace = Trace::default();
        let (hub, port) = logic_channel(64);
        let engine = ScriptedLogicEngine::new(json!({"a": 1}), trace.clone()).spawn(port);
        Self {
            hub,
            engine,
            factory: SimulatedSurfaceFactory::new(trace.clone()).with_interactions(interactions),
            container: Arc::new(RecordingContainer::default()),
            trace,
        }
    }

    async fn launch(&self, options: BridgeOptions, mode: StartMode) -> BridgeHandle {
        let surface_host: Arc<dyn SurfaceHost> = self.container.clone();
        host::launch(options, mode, &self.hub, surface_host, &self.factory)
            .await
            .unwrap()
    }

    /// Stops the logic engine once all bridges are gone, so the trace is complete.
    async fn finish(self) -> Trace {
        let Harness {
            hub, engine, trace, ..
        } = self;
        drop(hub);
        tokio::time::timeout(TIMEOUT, engine).await.unwrap().unwrap();
        trace
    }
}

async fn ready(handle: &mut BridgeHandle, target: Readiness) {
    tokio::time::timeout(TIMEOUT, handle.wait_for(target))
        .await
        .expect("handshake timed out")
        .unwrap();
}

/// Polls the trace until `predicate` holds.
async fn wait_until(trace: &Trace, predicate: impl Fn(&Trace) -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !predicate(trace) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never reached");
}

fn count(kinds: &[String], kind: &str) -> usize {
    kinds.iter().filter(|k| k.as_str() == kind).count()
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_launch_runs_full_handshake() {
    let harness = Harness::new();
    let mut handle = harness.launch(home_options(), StartMode::Full).await;
    let id = handle.id().clone();

    ready(&mut handle, Readiness::InitialDataSet).await;
    wait_until(&harness.trace, |t| {
        !t.sent(ChannelKind::Logic, "moduleMounted").is_empty()
    })
    .await;

    let trace = &harness.trace;
    let to_logic = trace.kinds(ChannelKind::Logic, Direction::ToEngine);
    assert_eq!(
        &to_logic[..5],
        &["loadResource", "createApp", "markPageInitialData", "createInstance", "moduleMounted"]
    );

    let create_app = trace.sent(ChannelKind::Logic, "createApp");
    assert_eq!(create_app.len(), 1);
    assert_eq!(
        create_app[0].body,
        json!({"bridgeId": id, "scene": 1001, "pagePath": "/home", "query": {"tab": "news"}})
    );

    let initial = trace.sent(ChannelKind::Render, "setInitialData");
    assert_eq!(
        initial[0].body,
        json!({"initialData": {"a": 1}, "bridgeId": id, "pagePath": "/home"})
    );

    let surfaces = harness.container.surfaces();
    assert_eq!(surfaces.len(), 1);
    assert!(surfaces[0].is_root);

    let bridge = handle.join().await.unwrap();
    assert_eq!(bridge.readiness(), Readiness::InitialDataSet);
    assert!(bridge.is_initialized());
}

#[tokio::test]
async fn test_create_instance_answer_reaches_render_engine() {
    let harness = Harness::new();
    let mut handle = harness.launch(home_options(), StartMode::Full).await;
    ready(&mut handle, Readiness::InitialDataSet).await;

    wait_until(&harness.trace, |t| {
        !t.sent(ChannelKind::Render, "updateModule").is_empty()
    })
    .await;
    let update = &harness.trace.sent(ChannelKind::Render, "updateModule")[0];
    assert_eq!(update.body["data"], json!({"created": true}));
    assert!(update.body.get("bridgeId").is_none());
}

#[tokio::test]
async fn test_without_logic_mode_skips_logic_load() {
    let harness = Harness::new();
    let mut handle = harness.launch(home_options(), StartMode::WithoutLogic).await;
    ready(&mut handle, Readiness::InitialDataSet).await;
    handle.join().await.unwrap();

    let trace = harness.finish().await;
    let to_logic = trace.kinds(ChannelKind::Logic, Direction::ToEngine);
    assert_eq!(count(&to_logic, "loadResource"), 0);
    assert_eq!(count(&to_logic, "createApp"), 1);
    assert_eq!(
        trace.kinds(ChannelKind::Render, Direction::ToEngine)[0],
        "loadResource"
    );
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_lifecycle_commands_after_handshake() {
    let harness = Harness::new();
    let mut handle = harness.launch(home_options(), StartMode::Full).await;
    let id = handle.id().clone();
    ready(&mut handle, Readiness::InitialDataSet).await;

    handle.app_show();
    handle.page_show();
    handle.page_hide();
    handle.app_hide();
    handle.page_unload();
    let bridge = handle.join().await.unwrap();
    drop(bridge);

    let trace = harness.finish().await;
    let lifecycle: Vec<Envelope> = trace
        .entries()
        .into_iter()
        .filter(|e| e.channel == ChannelKind::Logic && e.direction == Direction::ToEngine)
        .map(|e| e.envelope)
        .filter(|e| {
            matches!(
                e.kind.as_str(),
                "appShow" | "appHide" | "pageShow" | "pageHide" | "pageUnload"
            )
        })
        .collect();
    let kinds: Vec<&str> = lifecycle.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["appShow", "pageShow", "pageHide", "appHide", "pageUnload"]);
    assert!(lifecycle.iter().all(|e| e.is_for(&id)));
}

#[tokio::test]
async fn test_lifecycle_before_ready_is_dropped() {
    // No logic engine answers, so the bridge never gets past one side.
    let (hub, mut port) = logic_channel(16);
    let factory = SimulatedSurfaceFactory::new(Trace::default());
    let surface_host: Arc<dyn SurfaceHost> = Arc::new(RecordingContainer::default());
    let mut handle = host::launch(home_options(), StartMode::Full, &hub, surface_host, &factory)
        .await
        .unwrap();

    ready(&mut handle, Readiness::OneSideReady(Side::Render)).await;
    handle.app_show();
    handle.page_show();
    handle.page_unload();
    let bridge = handle.join().await.unwrap();
    assert_eq!(bridge.readiness(), Readiness::OneSideReady(Side::Render));

    let kinds: Vec<String> = std::iter::from_fn(|| port.try_recv())
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec!["loadResource"]);
}

#[tokio::test]
async fn test_commands_after_unload_are_dropped() {
    let harness = Harness::new();
    let mut handle = harness.launch(home_options(), StartMode::Full).await;
    ready(&mut handle, Readiness::BothReady).await;

    handle.page_unload();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.page_show();
    handle.join().await.unwrap();

    let trace = harness.finish().await;
    let to_logic = trace.kinds(ChannelKind::Logic, Direction::ToEngine);
    assert_eq!(count(&to_logic, "pageUnload"), 1);
    assert_eq!(count(&to_logic, "pageShow"), 0);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_interactions_forwarded_to_logic_with_bridge_id() {
    let harness = Harness::with_interactions(vec![
        RenderInbound::PageScroll(payload(json!({"scrollTop": 300}))),
        RenderInbound::TriggerEvent(payload(json!({"type": "tap", "handler": "onTap"}))),
    ]);
    let mut handle = harness.launch(home_options(), StartMode::Full).await;
    let id = handle.id().clone();
    ready(&mut handle, Readiness::InitialDataSet).await;

    wait_until(&harness.trace, |t| {
        !t.sent(ChannelKind::Logic, "triggerEvent").is_empty()
    })
    .await;
    let scroll = &harness.trace.sent(ChannelKind::Logic, "pageScroll")[0];
    assert_eq!(scroll.body, json!({"scrollTop": 300, "bridgeId": id}));
    let event = &harness.trace.sent(ChannelKind::Logic, "triggerEvent")[0];
    assert_eq!(event.body["handler"], "onTap");
    assert!(event.is_for(&id));
}

#[tokio::test]
async fn test_bridges_sharing_logic_channel_stay_independent() {
    let harness = Harness::new();
    let mut handles = Vec::new();
    for (i, page) in ["/home", "/detail", "/profile"].into_iter().enumerate() {
        let mut options = BridgeOptions::new("demo-app", page);
        options.is_root = i == 0;
        handles.push(harness.launch(options, StartMode::Full).await);
    }
    for handle in &mut handles {
        ready(handle, Readiness::InitialDataSet).await;
    }

    let create_apps = harness.trace.sent(ChannelKind::Logic, "createApp");
    assert_eq!(create_apps.len(), 3);
    for handle in &handles {
        let mine: Vec<&Envelope> = create_apps.iter().filter(|e| e.is_for(handle.id())).collect();
        assert_eq!(mine.len(), 1);
    }

    let initial = harness.trace.sent(ChannelKind::Render, "setInitialData");
    let mut paths: Vec<&str> = initial
        .iter()
        .filter_map(|e| e.body["pagePath"].as_str())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["/detail", "/home", "/profile"]);

    let roots: Vec<bool> = harness.container.surfaces().iter().map(|s| s.is_root).collect();
    assert_eq!(roots.iter().filter(|r| **r).count(), 1);

    for handle in handles {
        assert_eq!(handle.join().await.unwrap().readiness(), Readiness::InitialDataSet);
    }
}

// ============================================================================
// Surface Initialization
// ============================================================================

struct BrokenFactory;

#[async_trait]
impl SurfaceFactory for BrokenFactory {
    fn name(&self) -> &str {
        "broken"
    }

    async fn create_surface(&self, _options: SurfaceOptions) -> Result<PendingSurface, SurfaceError> {
        Err(SurfaceError::Unavailable("no display".to_string()))
    }
}

#[tokio::test]
async fn test_launch_fails_when_surface_unavailable() {
    let (hub, _port) = logic_channel(4);
    let container = Arc::new(RecordingContainer::default());
    let surface_host: Arc<dyn SurfaceHost> = container.clone();
    let result = host::launch(home_options(), StartMode::Full, &hub, surface_host, &BrokenFactory).await;
    assert!(matches!(
        result,
        Err(BridgeError::Surface(SurfaceError::Unavailable(_)))
    ));
    assert!(container.surfaces().is_empty());
}

#[tokio::test]
async fn test_init_twice_is_rejected() {
    let (hub, _port) = logic_channel(4);
    let container = Arc::new(RecordingContainer::default());
    let factory = SimulatedSurfaceFactory::new(Trace::default());
    let (mut bridge, _subscription) = Bridge::new(home_options(), &hub, container.clone());

    let _render = bridge.init(&factory).await.unwrap();
    assert!(bridge.is_initialized());
    assert!(matches!(
        bridge.init(&factory).await,
        Err(BridgeError::AlreadyInitialized)
    ));
    assert_eq!(container.surfaces().len(), 1);
}

#[tokio::test]
async fn test_surface_receives_root_flag_and_config_info() {
    let harness = Harness::new();
    let mut options = home_options();
    options.is_root = false;
    options.config_info = json!({"debug": true});
    let handle = harness.launch(options, StartMode::Full).await;

    let surfaces = harness.container.surfaces();
    assert_eq!(surfaces.len(), 1);
    assert!(!surfaces[0].is_root);
    tokio_test::assert_ok!(handle.join().await);
}
