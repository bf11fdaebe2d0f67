//! # Bridge Options
//!
//! Startup parameters of one bridge. Built once (usually from
//! `ResolvedConfig::bridge_options`) and read-only afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query parameters a page was opened with.
pub type Query = Map<String, Value>;

/// Describes one page's resources. The bridge never interprets these; it
/// hands them to both engines in `loadResource`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageResource {
    pub path: String,
    /// Anything else the engines need (template/style locations, component maps).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageResource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOptions {
    pub app_id: String,
    pub page_path: String,
    /// Navigation scene code the app was entered from.
    pub scene: u32,
    pub query: Query,
    pub pages: Vec<PageResource>,
    /// True for the first page of an app (the root surface).
    pub is_root: bool,
    /// Host-provided static configuration, passed to the surface untouched.
    pub config_info: Value,
}

impl BridgeOptions {
    pub fn new(app_id: impl Into<String>, page_path: impl Into<String>) -> Self {
        let page_path = page_path.into();
        Self {
            app_id: app_id.into(),
            pages: vec![PageResource::new(page_path.clone())],
            page_path,
            scene: 0,
            query: Query::new(),
            is_root: true,
            config_info: Value::Object(Map::new()),
        }
    }
}
