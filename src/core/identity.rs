//! # Bridge Identity
//!
//! Every bridge gets a `BridgeId` at construction. The logic channel is shared
//! by all live bridges, so this id is what correlates a logic message with the
//! page it belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;

const PREFIX: &str = "bridge_";

/// Opaque, process-unique identifier of one bridge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BridgeId(String);

impl BridgeId {
    /// Generates a fresh id (`bridge_<uuid v4>`).
    pub fn generate() -> Self {
        BridgeId(format!("{PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Wraps an id read off the wire (an engine echoing a bridge id back).
    pub fn from_wire(raw: impl Into<String>) -> Self {
        BridgeId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
