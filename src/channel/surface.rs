//! # Surfaces
//!
//! A surface is the host view a rendering engine draws into. Creating one is
//! asynchronous: the factory hands back a handle right away (so the host can
//! attach it) and a `ready` future that yields the render channel once the
//! engine inside can receive messages.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tokio::sync::oneshot;

use super::render::RenderLink;

/// What the factory is told about the surface to create.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceOptions {
    pub is_root: bool,
    pub config_info: Value,
}

/// Host-visible reference to a created surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub label: String,
    pub is_root: bool,
}

pub struct PendingSurface {
    pub handle: SurfaceHandle,
    pub ready: oneshot::Receiver<RenderLink>,
}

#[derive(Debug)]
pub enum SurfaceError {
    /// The factory could not create a surface.
    Unavailable(String),
    /// The surface was dropped before it became ready.
    Aborted,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Unavailable(msg) => write!(f, "surface unavailable: {msg}"),
            SurfaceError::Aborted => write!(f, "surface aborted before ready"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// The container a bridge attaches its surface to.
pub trait SurfaceHost: Send + Sync {
    fn append_surface(&self, surface: &SurfaceHandle);
}

#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    /// Returns the name of the factory.
    fn name(&self) -> &str;

    /// Creates a surface. The returned `ready` receiver resolves once the
    /// rendering engine inside it accepts messages.
    async fn create_surface(&self, options: SurfaceOptions) -> Result<PendingSurface, SurfaceError>;
}
