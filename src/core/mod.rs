//! # Core Bridge Logic
//!
//! This module contains the page bridge: identity, readiness, the message
//! protocol, and the controller that routes between the two engines.
//! It knows nothing about how engines or surfaces are hosted.
//!
//! ```text
//!     ┌────────────────┐                          ┌────────────────┐
//!     │  Logic engine  │                          │ Render engine  │
//!     │ (shared, many  │                          │ (one surface   │
//!     │    pages)      │                          │   per page)    │
//!     └───────┬────────┘                          └───────┬────────┘
//!             │ LogicInbound / LogicOutbound              │ RenderInbound / RenderOutbound
//!             ▼                                           ▼
//!     ┌────────────────────────────────────────────────────────────┐
//!     │                       Bridge (this module)                 │
//!     │                                                            │
//!     │  • BridgeId   (filters the shared logic channel)           │
//!     │  • Readiness  (gates createApp and lifecycle)              │
//!     │  • routing    (reshape + forward, or drop)                 │
//!     └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`bridge`]: the `Bridge` controller
//! - [`readiness`]: the handshake state machine
//! - [`message`]: `Envelope` and the four per-direction message enums
//! - [`identity`]: `BridgeId` generation
//! - [`options`]: `BridgeOptions`, the immutable startup parameters
//! - [`config`]: host configuration file and resolution

pub mod bridge;
pub mod config;
pub mod identity;
pub mod message;
pub mod options;
pub mod readiness;

// Re-export commonly used types for convenience
pub use bridge::{Bridge, BridgeError};
pub use identity::BridgeId;
pub use message::Envelope;
pub use options::BridgeOptions;
pub use readiness::Readiness;
