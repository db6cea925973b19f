//! The session trait seam between the bridge and the cloud client.

use async_trait::async_trait;

use crate::device::MonitorDevice;
use crate::error::Result;

/// An authenticated monitor session.
///
/// Implemented by [`SenseSession`](crate::SenseSession) for the real cloud
/// service; the bridge's tests implement it with scripted responses. Events
/// flow out-of-band on the channel handed over at login time, so this trait
/// only covers the operations the bridge initiates.
#[async_trait]
pub trait MonitorSession: Send + Sync {
    /// Fetch the current device list from the monitor.
    async fn refresh_devices(&self) -> Result<Vec<MonitorDevice>>;

    /// (Re)open the realtime usage feed.
    ///
    /// Reopening an already-open feed replaces it; the periodic stream-reopen
    /// timer calls this unconditionally.
    async fn open_stream(&self) -> Result<()>;

    /// Close the realtime feed. Emits `StreamClosed` on the event channel.
    async fn close_stream(&self);
}
