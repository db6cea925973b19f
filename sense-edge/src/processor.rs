//! Streaming event processor: one dispatch loop per session.
//!
//! The loop is the only writer of device state and usage, which is what makes
//! the registry's single-writer discipline hold. Frames are applied at most
//! one at a time: an in-flight flag claimed per frame and released when the
//! stream's close notification arrives. A frame that shows up while the flag
//! is held is dropped outright — under backpressure the bridge prefers losing
//! a frame to queueing unbounded work, and the next frame is never far away.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sense_monitor::{MonitorEvent, MonitorSession, RealtimeFrame};

use crate::context::BridgeContext;

/// Spawn the dispatch loop for a freshly connected session.
pub fn spawn_dispatch(
    context: Arc<BridgeContext>,
    session: Arc<dyn MonitorSession>,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run_dispatch(context, session, events))
}

/// Consume session events until the channel closes.
pub async fn run_dispatch(
    context: Arc<BridgeContext>,
    session: Arc<dyn MonitorSession>,
    mut events: mpsc::UnboundedReceiver<MonitorEvent>,
) {
    debug!("event dispatch loop started");
    while let Some(event) = events.recv().await {
        handle_event(&context, session.as_ref(), event).await;
    }
    debug!("event channel closed, dispatch loop ending");
}

/// Apply a single session event.
pub async fn handle_event(
    context: &BridgeContext,
    session: &dyn MonitorSession,
    event: MonitorEvent,
) {
    match event {
        MonitorEvent::AuthorizationLost => {
            warn!("monitor session no longer authorized, forcing re-login");
            context.clear_credentials().await;
        }
        MonitorEvent::RealtimeUpdate(frame) => apply_frame(context, session, frame).await,
        MonitorEvent::StreamClosed => context.end_frame(),
        MonitorEvent::StreamError(cause) => warn!(%cause, "realtime stream error"),
    }
}

async fn apply_frame(context: &BridgeContext, session: &dyn MonitorSession, frame: RealtimeFrame) {
    if !context.try_begin_frame() {
        debug!("frame already in flight, dropping incoming usage frame");
        return;
    }
    context.mark_data_present();

    // The stream is treated as a per-frame privilege rather than a held-open
    // connection; the reopen timer brings it back for the next frame.
    session.close_stream().await;

    {
        let mut registry = context.registry();
        registry.zero_all_except_aggregate();
        for device in &frame.devices {
            registry.apply_usage(&device.id, device.watts);
        }
        registry.set_aggregate_usage(frame.total_watts);
    }
    context.stamp_frame();
    debug!(
        devices = frame.devices.len(),
        total_watts = frame.total_watts,
        "usage frame applied"
    );
}
