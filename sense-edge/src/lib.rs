//! Bridge service between a Sense energy monitor and a local automation hub.
//!
//! The moving parts, wired together in `main`:
//!
//! - [`context::BridgeContext`] — single shared instance owning the device
//!   registry, credential state, the in-flight/data-present flags, and the
//!   refresh task handles;
//! - [`session::SessionManager`] — login/re-auth against the cloud monitor;
//! - [`processor`] — the dispatch loop folding realtime events into the
//!   registry, one frame at a time;
//! - [`scheduler`] — the slow metadata refresh and fast stream-reopen timers;
//! - [`server`] — the hub-facing warp endpoints;
//! - [`version`] — hourly advisory version check.

pub mod context;
pub mod error;
pub mod processor;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod version;

/// Application identity reported to the hub and the version service.
pub const APP_NAME: &str = "senseEdge";

pub use context::BridgeContext;
pub use error::BridgeError;
pub use server::AppState;
pub use session::{Connector, SenseConnector, SessionManager};
