//! Sense cloud monitor client.
//!
//! This crate is the bridge's only window onto the upstream service. It
//! exposes three things:
//!
//! - [`MonitorEvent`], the tagged events the realtime feed produces, consumed
//!   by a single dispatch loop on the bridge side;
//! - [`MonitorSession`], the trait seam the bridge drives (device metadata
//!   refresh, stream open/close) — tests swap in a scripted session;
//! - [`SenseClient`] / [`SenseSession`], the concrete HTTPS + WebSocket
//!   implementation against the Sense cloud API.

mod client;
mod device;
mod error;
mod event;
mod session;

pub use client::{SenseClient, SenseSession};
pub use device::MonitorDevice;
pub use error::{MonitorError, Result};
pub use event::{decode_feed_text, FrameDevice, MonitorEvent, RealtimeFrame};
pub use session::MonitorSession;
