//! The dual-cadence refresh scheduler.
//!
//! Two periodic tasks per session, both started lazily the first time the hub
//! asks for data after a successful login: a slow device-metadata refresh and
//! a fast stream-reopen. The monitor's streaming endpoint does not tolerate
//! indefinitely idle connections, so the stream is simply reopened on a short
//! timer instead of detecting silent disconnects. Failures on either tick are
//! logged and skipped; the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use sense_monitor::MonitorSession;

use crate::context::{BridgeContext, RefreshTasks};

pub(crate) const METADATA_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub(crate) const STREAM_REOPEN_INTERVAL: Duration = Duration::from_secs(60);

/// Start both refresh tasks for the current session, once.
///
/// Idempotent while a session's tasks are running; a session replacement
/// clears them (see [`BridgeContext::reset_scheduler`]) so the next call
/// re-arms against the new session. No session yet means nothing to do.
pub async fn ensure_started(context: &Arc<BridgeContext>) {
    let Some(session) = context.current_session().await else {
        return;
    };

    let mut tasks = context.refresh_tasks().lock().await;
    if tasks.is_some() {
        return;
    }

    info!("scheduling device metadata refresh");
    let metadata = tokio::spawn(metadata_loop(context.clone(), session.clone()));
    info!("scheduling realtime stream reopen");
    let stream = tokio::spawn(stream_loop(session));
    *tasks = Some(RefreshTasks { metadata, stream });
}

async fn metadata_loop(context: Arc<BridgeContext>, session: Arc<dyn MonitorSession>) {
    // First tick fires immediately.
    let mut ticker = tokio::time::interval(METADATA_REFRESH_INTERVAL);
    loop {
        ticker.tick().await;
        refresh_device_metadata(&context, session.as_ref()).await;
    }
}

/// One metadata refresh pass: upsert listable devices, keep the aggregate.
pub async fn refresh_device_metadata(context: &BridgeContext, session: &dyn MonitorSession) {
    match session.refresh_devices().await {
        Ok(devices) => {
            let mut registry = context.registry();
            for device in devices.iter().filter(|d| d.listable()) {
                registry.upsert_metadata(&device.id, &device.name, device.name_is_guess());
            }
            registry.ensure_aggregate();
        }
        Err(e) => warn!(error = %e, "device list refresh failed, keeping last known metadata"),
    }
}

async fn stream_loop(session: Arc<dyn MonitorSession>) {
    let mut ticker = tokio::time::interval(STREAM_REOPEN_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = session.open_stream().await {
            warn!(error = %e, "realtime stream reopen failed");
        }
    }
}
