//! Session manager: login, re-authentication, and session replacement.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use sense_monitor::{MonitorEvent, MonitorSession, SenseClient};

use crate::context::BridgeContext;
use crate::processor;

/// Seam between the session manager and the cloud service, so tests can
/// substitute a scripted connection.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticate and hand back the session plus its event channel.
    async fn connect(
        &self,
        email: &str,
        password: &str,
    ) -> sense_monitor::Result<(
        Arc<dyn MonitorSession>,
        mpsc::UnboundedReceiver<MonitorEvent>,
    )>;
}

/// Production connector backed by [`SenseClient`].
pub struct SenseConnector {
    client: SenseClient,
}

impl SenseConnector {
    pub fn new() -> sense_monitor::Result<Self> {
        Ok(Self {
            client: SenseClient::new()?,
        })
    }
}

#[async_trait]
impl Connector for SenseConnector {
    async fn connect(
        &self,
        email: &str,
        password: &str,
    ) -> sense_monitor::Result<(
        Arc<dyn MonitorSession>,
        mpsc::UnboundedReceiver<MonitorEvent>,
    )> {
        let (session, events) = self.client.login(email, password).await?;
        Ok((Arc::new(session), events))
    }
}

/// Owns credential state; every hub request carrying credentials funnels
/// through [`login`](SessionManager::login).
pub struct SessionManager {
    context: Arc<BridgeContext>,
    connector: Arc<dyn Connector>,
}

impl SessionManager {
    pub fn new(context: Arc<BridgeContext>, connector: Arc<dyn Connector>) -> Self {
        Self { context, connector }
    }

    /// Ensure a session exists for the supplied credential pair.
    ///
    /// - empty email or password: fails immediately, no network traffic;
    /// - pair identical to the active session's: succeeds without
    ///   re-authenticating (the hub re-sends credentials on every poll);
    /// - otherwise: authenticate upstream. Success replaces the session
    ///   wholesale — the old stream, dispatch loop, and refresh timers are
    ///   torn down so nothing keeps polling a dead session. Failure leaves
    ///   the previous credentials and session untouched, so a transient
    ///   upstream error does not wipe a working login.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        if email.is_empty() || password.is_empty() {
            warn!("missing username or password");
            return false;
        }

        let mut slot = self.context.session_slot().lock().await;
        if slot.session.is_some() && slot.email == email && slot.password == password {
            return true;
        }

        info!("got new credentials from hub, initializing monitor connection");
        match self.connector.connect(email, password).await {
            Ok((session, events)) => {
                if let Some(old) = slot.session.take() {
                    old.close_stream().await;
                }
                if let Some(dispatch) = slot.dispatch.take() {
                    dispatch.abort();
                }
                self.context.reset_scheduler().await;

                slot.email = email.to_string();
                slot.password = password.to_string();
                slot.dispatch = Some(processor::spawn_dispatch(
                    self.context.clone(),
                    session.clone(),
                    events,
                ));
                slot.session = Some(session);
                true
            }
            Err(e) => {
                error!(error = %e, "monitor login failed");
                false
            }
        }
    }

    /// Clear stored credentials so the next login starts from scratch.
    pub async fn reset_auth(&self) {
        self.context.clear_credentials().await;
    }
}
