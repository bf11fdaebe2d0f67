//! # Configuration
//!
//! Centralizes host settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.pagebridge/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::channel::logic::DEFAULT_LOGIC_CHANNEL_CAPACITY;
use crate::core::options::{BridgeOptions, PageResource, Query};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub pages: Vec<PageResource>,
    /// Static host configuration handed to every surface as `configInfo`.
    pub config_info: Option<toml::Table>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AppConfig {
    pub app_id: Option<String>,
    pub entry_page: Option<String>,
    pub scene: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub logic_channel_capacity: Option<usize>,
    pub log_file: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_APP_ID: &str = "demo-app";
pub const DEFAULT_ENTRY_PAGE: &str = "pages/index/index";
/// Scene code for a normal launch from the app list.
pub const DEFAULT_SCENE: u32 = 1001;
pub const DEFAULT_LOG_FILE: &str = "pagebridge.log";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub app_id: String,
    pub entry_page: String,
    pub scene: u32,
    pub logic_channel_capacity: usize,
    pub log_file: String,
    pub pages: Vec<PageResource>,
    pub config_info: Value,
}

impl ResolvedConfig {
    /// Startup parameters for a bridge showing `page_path`.
    ///
    /// The page list always contains `page_path`, so both engines are asked
    /// to load it even if the config file didn't list it.
    pub fn bridge_options(&self, page_path: &str, query: Query, is_root: bool) -> BridgeOptions {
        let mut pages = self.pages.clone();
        if !pages.iter().any(|p| p.path == page_path) {
            pages.push(PageResource::new(page_path));
        }
        BridgeOptions {
            app_id: self.app_id.clone(),
            page_path: page_path.to_string(),
            scene: self.scene,
            query,
            pages,
            is_root,
            config_info: self.config_info.clone(),
        }
    }
}

/// CLI flags that take part in resolution (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub app_id: Option<String>,
    pub scene: Option<u32>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.pagebridge/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pagebridge").join("config.toml"))
}

/// Load config from `~/.pagebridge/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `HostConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<HostConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(HostConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(HostConfig::default());
    }

    load_config_from(&path)
}

/// Load config from an explicit path. The file must exist.
pub fn load_config_from(path: &Path) -> Result<HostConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: HostConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# pagebridge Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [app]
# app_id = "demo-app"                # Or set PAGEBRIDGE_APP_ID env var
# entry_page = "pages/index/index"
# scene = 1001                       # Or set PAGEBRIDGE_SCENE env var

# [runtime]
# logic_channel_capacity = 256       # Logic messages a slow page may fall behind by
# log_file = "pagebridge.log"        # Or set PAGEBRIDGE_LOG_FILE env var

# [[pages]]
# path = "pages/index/index"

# [[pages]]
# path = "pages/detail/detail"
# template = "detail.wxml"           # Extra keys are passed to the engines as-is

# [config_info]
# debug = false
# navigation_bar_title = "Demo"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &HostConfig, cli: &CliOverrides) -> ResolvedConfig {
    // App id: CLI → env → config → default
    let app_id = cli
        .app_id
        .clone()
        .or_else(|| std::env::var("PAGEBRIDGE_APP_ID").ok())
        .or_else(|| config.app.app_id.clone())
        .unwrap_or_else(|| DEFAULT_APP_ID.to_string());

    // Scene: CLI → env → config → default
    let scene = cli
        .scene
        .or_else(|| {
            std::env::var("PAGEBRIDGE_SCENE")
                .ok()
                .and_then(|s| parse_scene(&s))
        })
        .or(config.app.scene)
        .unwrap_or(DEFAULT_SCENE);

    // Log file: env → config → default
    let log_file = std::env::var("PAGEBRIDGE_LOG_FILE")
        .ok()
        .or_else(|| config.runtime.log_file.clone())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

    let config_info = match &config.config_info {
        Some(table) => toml_to_json(toml::Value::Table(table.clone())),
        None => Value::Object(Default::default()),
    };

    ResolvedConfig {
        app_id,
        entry_page: config
            .app
            .entry_page
            .clone()
            .unwrap_or_else(|| DEFAULT_ENTRY_PAGE.to_string()),
        scene,
        logic_channel_capacity: config
            .runtime
            .logic_channel_capacity
            .unwrap_or(DEFAULT_LOGIC_CHANNEL_CAPACITY),
        log_file,
        pages: config.pages.clone(),
        config_info,
    }
}

fn parse_scene(raw: &str) -> Option<u32> {
    match raw.trim().parse() {
        Ok(scene) => Some(scene),
        Err(e) => {
            warn!("Ignoring PAGEBRIDGE_SCENE={:?}: {}", raw, e);
            None
        }
    }
}

/// Converts TOML into the JSON shape the engines expect.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
