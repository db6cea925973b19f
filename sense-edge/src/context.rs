//! Shared state for the bridge process.
//!
//! One `BridgeContext` exists for the process lifetime and is handed to every
//! handler. Locking is deliberately coarse and short-lived: the registry sits
//! behind a `parking_lot` mutex that is never held across an await point, the
//! session slot and refresh tasks behind tokio mutexes (their critical
//! sections do await), and the two frame flags are plain atomics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::info;

use sense_monitor::MonitorSession;
use sense_registry::DeviceRegistry;

/// Credential pair and session for the one active login.
#[derive(Default)]
pub(crate) struct SessionSlot {
    pub email: String,
    pub password: String,
    pub session: Option<Arc<dyn MonitorSession>>,
    pub dispatch: Option<JoinHandle<()>>,
}

/// Handles of the two periodic refresh tasks, owned so a session replacement
/// can cancel them instead of leaving them polling a dead session.
pub(crate) struct RefreshTasks {
    pub metadata: JoinHandle<()>,
    pub stream: JoinHandle<()>,
}

/// Process-wide bridge state.
pub struct BridgeContext {
    registry: Mutex<DeviceRegistry>,
    session: tokio::sync::Mutex<SessionSlot>,
    refresh: tokio::sync::Mutex<Option<RefreshTasks>>,
    frame_in_flight: AtomicBool,
    data_present: AtomicBool,
    last_frame: Mutex<Option<DateTime<Utc>>>,
}

impl BridgeContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(DeviceRegistry::new()),
            session: tokio::sync::Mutex::new(SessionSlot::default()),
            refresh: tokio::sync::Mutex::new(None),
            frame_in_flight: AtomicBool::new(false),
            data_present: AtomicBool::new(false),
            last_frame: Mutex::new(None),
        })
    }

    /// Lock the device registry. Guards must not be held across awaits.
    pub fn registry(&self) -> MutexGuard<'_, DeviceRegistry> {
        self.registry.lock()
    }

    pub(crate) fn session_slot(&self) -> &tokio::sync::Mutex<SessionSlot> {
        &self.session
    }

    pub(crate) fn refresh_tasks(&self) -> &tokio::sync::Mutex<Option<RefreshTasks>> {
        &self.refresh
    }

    /// The active session, if a login has succeeded.
    pub async fn current_session(&self) -> Option<Arc<dyn MonitorSession>> {
        self.session.lock().await.session.clone()
    }

    /// Whether any login has succeeded yet.
    pub async fn has_session(&self) -> bool {
        self.session.lock().await.session.is_some()
    }

    /// Forget the stored credential pair so the next login re-authenticates.
    ///
    /// The session object and any open stream are left alone; their own error
    /// paths surface separately.
    pub async fn clear_credentials(&self) {
        info!("resetting auth");
        let mut slot = self.session.lock().await;
        slot.email.clear();
        slot.password.clear();
    }

    /// Try to claim the single in-flight frame slot.
    ///
    /// Returns `false` when a frame is already being applied; the caller
    /// drops its frame rather than queueing it.
    pub fn try_begin_frame(&self) -> bool {
        !self.frame_in_flight.swap(true, Ordering::SeqCst)
    }

    /// Release the in-flight frame slot (on stream close).
    pub fn end_frame(&self) {
        self.frame_in_flight.store(false, Ordering::SeqCst);
    }

    pub fn frame_in_flight(&self) -> bool {
        self.frame_in_flight.load(Ordering::SeqCst)
    }

    /// Latch that at least one real usage frame has arrived.
    pub fn mark_data_present(&self) {
        self.data_present.store(true, Ordering::SeqCst);
    }

    pub fn data_present(&self) -> bool {
        self.data_present.load(Ordering::SeqCst)
    }

    /// Record when the most recent frame was applied.
    pub fn stamp_frame(&self) {
        *self.last_frame.lock() = Some(Utc::now());
    }

    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        *self.last_frame.lock()
    }

    /// Whether the periodic refresh tasks are currently running.
    pub async fn scheduler_started(&self) -> bool {
        self.refresh.lock().await.is_some()
    }

    /// Abort and forget the refresh tasks so the next data fetch restarts
    /// them against the current session.
    pub async fn reset_scheduler(&self) {
        let mut tasks = self.refresh.lock().await;
        if let Some(tasks) = tasks.take() {
            tasks.metadata.abort();
            tasks.stream.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_flag_is_exclusive_until_released() {
        let context = BridgeContext::new();

        assert!(context.try_begin_frame());
        assert!(context.frame_in_flight());
        assert!(!context.try_begin_frame());

        context.end_frame();
        assert!(context.try_begin_frame());
    }

    #[test]
    fn data_present_latches() {
        let context = BridgeContext::new();
        assert!(!context.data_present());
        context.mark_data_present();
        assert!(context.data_present());
    }

    #[tokio::test]
    async fn clear_credentials_keeps_session_object() {
        let context = BridgeContext::new();
        {
            let mut slot = context.session_slot().lock().await;
            slot.email = "user@example.com".to_string();
            slot.password = "secret".to_string();
        }

        context.clear_credentials().await;

        let slot = context.session_slot().lock().await;
        assert!(slot.email.is_empty());
        assert!(slot.password.is_empty());
    }
}
