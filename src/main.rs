use clap::Parser;
use futures::future::{join_all, try_join_all};
use pagebridge::StartMode;
use pagebridge::channel::{SurfaceHost, logic_channel};
use pagebridge::core::config::{self, CliOverrides};
use pagebridge::core::message::{RenderInbound, payload};
use pagebridge::core::options::Query;
use pagebridge::core::readiness::Readiness;
use pagebridge::host::{
    self,
    simulated::{RecordingContainer, ScriptedLogicEngine, SimulatedSurfaceFactory, Trace},
};
use serde_json::{Value, json};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "pagebridge",
    about = "Runs pages through the logic/render bridge handshake against simulated engines"
)]
struct Args {
    /// Page to open (repeatable; the first one is the root page)
    #[arg(short, long)]
    page: Vec<String>,

    /// Query parameter passed to every page, as key=value (repeatable)
    #[arg(short, long, value_parser = parse_query_pair)]
    query: Vec<(String, String)>,

    /// Application id (overrides config and PAGEBRIDGE_APP_ID)
    #[arg(long)]
    app_id: Option<String>,

    /// Navigation scene code (overrides config and PAGEBRIDGE_SCENE)
    #[arg(long)]
    scene: Option<u32>,

    /// Handshake mode
    #[arg(short, long, default_value_t, value_enum)]
    mode: StartMode,

    /// Config file to use instead of ~/.pagebridge/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

/// How long a page may take to finish its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            app_id: args.app_id.clone(),
            scene: args.scene,
        },
    );

    // Initialize file logger - writes to the resolved log file
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!(
        "pagebridge starting: app {} scene {} mode {:?}",
        resolved.app_id,
        resolved.scene,
        args.mode
    );

    let query: Query = args
        .query
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let pages = if args.page.is_empty() {
        vec![resolved.entry_page.clone()]
    } else {
        args.page
    };

    let trace = Trace::default();
    let (hub, engine_port) = logic_channel(resolved.logic_channel_capacity);
    let engine = ScriptedLogicEngine::new(json!({ "greeting": "hello" }), trace.clone())
        .spawn(engine_port);
    let container = Arc::new(RecordingContainer::default());
    let surface_host: Arc<dyn SurfaceHost> = container.clone();
    let factory = SimulatedSurfaceFactory::new(trace.clone()).with_interactions(vec![
        RenderInbound::TriggerEvent(payload(json!({ "type": "tap", "handler": "onTap" }))),
    ]);

    let launches = pages.iter().enumerate().map(|(i, page)| {
        let options = resolved.bridge_options(page, query.clone(), i == 0);
        host::launch(options, args.mode, &hub, surface_host.clone(), &factory)
    });
    let mut handles = try_join_all(launches).await?;

    for handle in &mut handles {
        tokio::time::timeout(HANDSHAKE_TIMEOUT, handle.wait_for(Readiness::InitialDataSet))
            .await??;
        handle.app_show();
        handle.page_show();
        handle.page_hide();
        handle.page_unload();
    }

    let bridges = join_all(handles.into_iter().map(|h| h.join())).await;
    for bridge in bridges {
        let bridge = bridge?;
        log::info!(
            "Bridge {} ({}) finished at {:?}",
            bridge.id(),
            bridge.options().page_path,
            bridge.readiness()
        );
    }

    // Once every sender is gone the engine drains its queue and stops.
    drop(hub);
    engine.await?;

    for entry in trace.entries() {
        println!("{}", serde_json::to_string(&entry)?);
    }
    log::info!(
        "pagebridge done: {} surfaces attached, {} messages traced",
        container.surfaces().len(),
        trace.entries().len()
    );

    Ok(())
}
