//! # Messages
//!
//! The bridge protocol, one closed enum per direction:
//!
//! ```text
//!                 LogicInbound                 RenderInbound
//!   logic engine ─────────────►  Bridge  ◄───────────── rendering engine
//!                ◄─────────────          ─────────────►
//!                 LogicOutbound                RenderOutbound
//! ```
//!
//! On the channels everything travels as an `Envelope` (`{kind, body}`).
//! The string `kind` is only looked at here, in `decode` and `into_envelope`;
//! the bridge itself matches on the enums.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

use crate::core::identity::BridgeId;
use crate::core::options::{PageResource, Query};

/// Wire form of every message on either channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: String,
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, body: Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }

    /// The `bridgeId` embedded in the body, if any.
    pub fn bridge_id(&self) -> Option<&str> {
        self.body.get("bridgeId").and_then(Value::as_str)
    }

    /// True if this message is addressed to the given bridge.
    pub fn is_for(&self, id: &BridgeId) -> bool {
        self.bridge_id() == Some(id.as_str())
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum MessageError {
    /// The kind is not part of this direction's protocol.
    UnknownKind(String),
    /// The kind is known but the body doesn't have the expected shape.
    Body {
        kind: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::UnknownKind(kind) => write!(f, "unknown message kind: {kind}"),
            MessageError::Body { kind, source } => write!(f, "bad {kind} body: {source}"),
        }
    }
}

impl std::error::Error for MessageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MessageError::UnknownKind(_) => None,
            MessageError::Body { source, .. } => Some(source),
        }
    }
}

fn decode_body<T: DeserializeOwned>(kind: &str, body: Value) -> Result<T, MessageError> {
    serde_json::from_value(body).map_err(|source| MessageError::Body {
        kind: kind.to_string(),
        source,
    })
}

// ============================================================================
// Shared Bodies
// ============================================================================

/// `{id, data}` patch for one mounted component. Forwarded to the rendering
/// engine exactly as the logic engine sent it. Module ids are opaque, and a
/// patch without `data` stays without it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModuleUpdate {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitialDataBody {
    #[serde(default)]
    initial_data: Value,
}

#[derive(Deserialize)]
struct ToastBody {
    #[serde(default)]
    params: Map<String, Value>,
}

#[derive(Deserialize)]
struct ModuleCreatedBody {
    id: Value,
    path: String,
}

#[derive(Deserialize)]
struct ModuleMountedBody {
    id: Value,
}

/// Scroll and event payloads are objects; anything else is kept under
/// `detail` so it can still carry a `bridgeId`. A missing body is empty.
pub fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("detail".to_string(), other);
            map
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Messages the logic engine sends to a bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicInbound {
    LogicResourceLoaded,
    AppIsCreated,
    InitialDataIsReady { initial_data: Value },
    UpdateModule(ModuleUpdate),
    ShowToast { params: Map<String, Value> },
}

impl LogicInbound {
    pub fn decode(envelope: Envelope) -> Result<Self, MessageError> {
        let Envelope { kind, body } = envelope;
        match kind.as_str() {
            "logicResourceLoaded" => Ok(LogicInbound::LogicResourceLoaded),
            "appIsCreated" => Ok(LogicInbound::AppIsCreated),
            "initialDataIsReady" => {
                let body: InitialDataBody = decode_body(&kind, body)?;
                Ok(LogicInbound::InitialDataIsReady {
                    initial_data: body.initial_data,
                })
            }
            "updateModule" => Ok(LogicInbound::UpdateModule(decode_body(&kind, body)?)),
            "showToast" => {
                let body: ToastBody = decode_body(&kind, body)?;
                Ok(LogicInbound::ShowToast {
                    params: body.params,
                })
            }
            _ => Err(MessageError::UnknownKind(kind)),
        }
    }

    /// Encodes the message as the logic engine would send it for `bridge_id`.
    pub fn into_envelope(self, bridge_id: &BridgeId) -> Envelope {
        match self {
            LogicInbound::LogicResourceLoaded => {
                Envelope::new("logicResourceLoaded", json!({ "bridgeId": bridge_id }))
            }
            LogicInbound::AppIsCreated => {
                Envelope::new("appIsCreated", json!({ "bridgeId": bridge_id }))
            }
            LogicInbound::InitialDataIsReady { initial_data } => Envelope::new(
                "initialDataIsReady",
                json!({ "bridgeId": bridge_id, "initialData": initial_data }),
            ),
            LogicInbound::UpdateModule(update) => {
                let mut body = json!(update);
                body["bridgeId"] = json!(bridge_id);
                Envelope::new("updateModule", body)
            }
            LogicInbound::ShowToast { params } => Envelope::new(
                "showToast",
                json!({ "bridgeId": bridge_id, "params": params }),
            ),
        }
    }
}

/// Messages the rendering engine sends to its bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInbound {
    UiResourceLoaded,
    ModuleCreated { id: Value, path: String },
    ModuleMounted { id: Value },
    PageScroll(Map<String, Value>),
    TriggerEvent(Map<String, Value>),
}

impl RenderInbound {
    pub fn decode(envelope: Envelope) -> Result<Self, MessageError> {
        let Envelope { kind, body } = envelope;
        match kind.as_str() {
            "uiResourceLoaded" => Ok(RenderInbound::UiResourceLoaded),
            "moduleCreated" => {
                let body: ModuleCreatedBody = decode_body(&kind, body)?;
                Ok(RenderInbound::ModuleCreated {
                    id: body.id,
                    path: body.path,
                })
            }
            "moduleMounted" => {
                let body: ModuleMountedBody = decode_body(&kind, body)?;
                Ok(RenderInbound::ModuleMounted { id: body.id })
            }
            "pageScroll" => Ok(RenderInbound::PageScroll(payload(body))),
            "triggerEvent" => Ok(RenderInbound::TriggerEvent(payload(body))),
            _ => Err(MessageError::UnknownKind(kind)),
        }
    }

    pub fn into_envelope(self) -> Envelope {
        match self {
            RenderInbound::UiResourceLoaded => Envelope::new("uiResourceLoaded", json!({})),
            RenderInbound::ModuleCreated { id, path } => {
                Envelope::new("moduleCreated", json!({ "id": id, "path": path }))
            }
            RenderInbound::ModuleMounted { id } => {
                Envelope::new("moduleMounted", json!({ "id": id }))
            }
            RenderInbound::PageScroll(payload) => {
                Envelope::new("pageScroll", Value::Object(payload))
            }
            RenderInbound::TriggerEvent(payload) => {
                Envelope::new("triggerEvent", Value::Object(payload))
            }
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// A message the bridge can put on a channel.
pub trait Outbound: fmt::Debug + Send + 'static {
    fn kind(&self) -> &'static str;
    fn into_envelope(self) -> Envelope;
}

/// Messages the bridge sends to the logic engine. Every variant carries the
/// bridge id, since the logic channel is shared by all bridges.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicOutbound {
    LoadResource {
        app_id: String,
        bridge_id: BridgeId,
        pages: Vec<PageResource>,
    },
    CreateApp {
        bridge_id: BridgeId,
        scene: u32,
        page_path: String,
        query: Query,
    },
    MarkPageInitialData {
        bridge_id: BridgeId,
        page_path: String,
    },
    CreateInstance {
        id: Value,
        path: String,
        bridge_id: BridgeId,
        query: Query,
    },
    ModuleMounted {
        id: Value,
        bridge_id: BridgeId,
    },
    /// Scroll payload from the rendering engine, already stamped with `bridgeId`.
    PageScroll(Map<String, Value>),
    /// Event payload from the rendering engine, already stamped with `bridgeId`.
    TriggerEvent(Map<String, Value>),
    AppShow { bridge_id: BridgeId },
    AppHide { bridge_id: BridgeId },
    PageShow { bridge_id: BridgeId },
    PageHide { bridge_id: BridgeId },
    PageUnload { bridge_id: BridgeId },
}

impl Outbound for LogicOutbound {
    fn kind(&self) -> &'static str {
        match self {
            LogicOutbound::LoadResource { .. } => "loadResource",
            LogicOutbound::CreateApp { .. } => "createApp",
            LogicOutbound::MarkPageInitialData { .. } => "markPageInitialData",
            LogicOutbound::CreateInstance { .. } => "createInstance",
            LogicOutbound::ModuleMounted { .. } => "moduleMounted",
            LogicOutbound::PageScroll(_) => "pageScroll",
            LogicOutbound::TriggerEvent(_) => "triggerEvent",
            LogicOutbound::AppShow { .. } => "appShow",
            LogicOutbound::AppHide { .. } => "appHide",
            LogicOutbound::PageShow { .. } => "pageShow",
            LogicOutbound::PageHide { .. } => "pageHide",
            LogicOutbound::PageUnload { .. } => "pageUnload",
        }
    }

    fn into_envelope(self) -> Envelope {
        let kind = self.kind();
        let body = match self {
            LogicOutbound::LoadResource {
                app_id,
                bridge_id,
                pages,
            } => json!({ "appId": app_id, "bridgeId": bridge_id, "pages": pages }),
            LogicOutbound::CreateApp {
                bridge_id,
                scene,
                page_path,
                query,
            } => json!({
                "bridgeId": bridge_id,
                "scene": scene,
                "pagePath": page_path,
                "query": query,
            }),
            LogicOutbound::MarkPageInitialData {
                bridge_id,
                page_path,
            } => json!({ "bridgeId": bridge_id, "pagePath": page_path }),
            LogicOutbound::CreateInstance {
                id,
                path,
                bridge_id,
                query,
            } => json!({ "id": id, "path": path, "bridgeId": bridge_id, "query": query }),
            LogicOutbound::ModuleMounted { id, bridge_id } => {
                json!({ "id": id, "bridgeId": bridge_id })
            }
            LogicOutbound::PageScroll(payload) | LogicOutbound::TriggerEvent(payload) => {
                Value::Object(payload)
            }
            LogicOutbound::AppShow { bridge_id }
            | LogicOutbound::AppHide { bridge_id }
            | LogicOutbound::PageShow { bridge_id }
            | LogicOutbound::PageHide { bridge_id }
            | LogicOutbound::PageUnload { bridge_id } => json!({ "bridgeId": bridge_id }),
        };
        Envelope::new(kind, body)
    }
}

/// Messages the bridge sends to its rendering engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutbound {
    LoadResource {
        app_id: String,
        pages: Vec<PageResource>,
    },
    SetInitialData {
        initial_data: Value,
        bridge_id: BridgeId,
        page_path: String,
    },
    UpdateModule(ModuleUpdate),
    /// Toast parameters, forwarded as the whole body.
    ShowToast(Map<String, Value>),
}

impl Outbound for RenderOutbound {
    fn kind(&self) -> &'static str {
        match self {
            RenderOutbound::LoadResource { .. } => "loadResource",
            RenderOutbound::SetInitialData { .. } => "setInitialData",
            RenderOutbound::UpdateModule(_) => "updateModule",
            RenderOutbound::ShowToast(_) => "showToast",
        }
    }

    fn into_envelope(self) -> Envelope {
        let kind = self.kind();
        let body = match self {
            RenderOutbound::LoadResource { app_id, pages } => {
                json!({ "appId": app_id, "pages": pages })
            }
            RenderOutbound::SetInitialData {
                initial_data,
                bridge_id,
                page_path,
            } => json!({
                "initialData": initial_data,
                "bridgeId": bridge_id,
                "pagePath": page_path,
            }),
            RenderOutbound::UpdateModule(update) => json!(update),
            RenderOutbound::ShowToast(params) => Value::Object(params),
        };
        Envelope::new(kind, body)
    }
}
