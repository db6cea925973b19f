//! Concrete client for the Sense cloud service.
//!
//! Two halves: [`SenseClient`] performs the credential handshake and hands
//! back a [`SenseSession`], which owns the bearer token and the realtime
//! WebSocket feed. The feed is read by a background task that translates raw
//! messages into [`MonitorEvent`]s on an unbounded channel; the receiving end
//! is returned from [`SenseClient::login`] for the bridge's dispatch loop.

use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::device::MonitorDevice;
use crate::error::{MonitorError, Result};
use crate::event::{decode_feed_text, MonitorEvent};
use crate::session::MonitorSession;

const API_BASE: &str = "https://api.sense.com/apiservice/api/v1";
const REALTIME_BASE: &str = "wss://clientrt.sense.com";

type Feed = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    #[serde(default)]
    monitors: Vec<MonitorInfo>,
}

#[derive(Debug, Deserialize)]
struct MonitorInfo {
    id: u64,
}

/// Unauthenticated entry point to the cloud service.
pub struct SenseClient {
    http: reqwest::Client,
    api_base: String,
    realtime_base: String,
}

impl SenseClient {
    /// Create a client against the production endpoints.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(API_BASE, REALTIME_BASE)
    }

    /// Create a client against custom endpoints (test servers).
    pub fn with_endpoints(
        api_base: impl Into<String>,
        realtime_base: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base: api_base.into(),
            realtime_base: realtime_base.into(),
        })
    }

    /// Authenticate a credential pair.
    ///
    /// On success returns the session plus the receiving end of its event
    /// channel. The feed is not opened yet; the bridge's stream-reopen timer
    /// does that.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(SenseSession, mpsc::UnboundedReceiver<MonitorEvent>)> {
        debug!("authenticating against monitor service");
        let response = self
            .http
            .post(format!("{}/authenticate", self.api_base))
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(MonitorError::AuthenticationFailed);
        }
        if !response.status().is_success() {
            return Err(MonitorError::InvalidResponse(format!(
                "authentication returned {}",
                response.status()
            )));
        }

        let auth: AuthResponse = response.json().await?;
        let monitor_id = auth
            .monitors
            .first()
            .map(|monitor| monitor.id)
            .ok_or(MonitorError::NoMonitors)?;
        info!(monitor = monitor_id, "authenticated with monitor service");

        let (events, receiver) = mpsc::unbounded_channel();
        let session = SenseSession::new(
            self.http.clone(),
            &self.api_base,
            &self.realtime_base,
            auth.access_token,
            monitor_id,
            events,
        )?;
        Ok((session, receiver))
    }
}

/// An authenticated session against one monitor.
pub struct SenseSession {
    http: reqwest::Client,
    access_token: String,
    devices_url: String,
    realtime_url: String,
    events: mpsc::UnboundedSender<MonitorEvent>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SenseSession {
    fn new(
        http: reqwest::Client,
        api_base: &str,
        realtime_base: &str,
        access_token: String,
        monitor_id: u64,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Result<Self> {
        let mut realtime_url =
            Url::parse(&format!("{realtime_base}/monitors/{monitor_id}/realtimefeed"))
                .map_err(|e| MonitorError::InvalidResponse(format!("bad realtime URL: {e}")))?;
        realtime_url
            .query_pairs_mut()
            .append_pair("access_token", &access_token);

        Ok(Self {
            http,
            devices_url: format!("{api_base}/app/monitors/{monitor_id}/devices"),
            realtime_url: realtime_url.into(),
            access_token,
            events,
            reader: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl MonitorSession for SenseSession {
    async fn refresh_devices(&self) -> Result<Vec<MonitorDevice>> {
        let response = self
            .http
            .get(&self.devices_url)
            .header("Authorization", format!("bearer {}", self.access_token))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(MonitorError::AuthenticationFailed);
        }
        let devices: Vec<MonitorDevice> = response.error_for_status()?.json().await?;
        debug!(count = devices.len(), "fetched device list");
        Ok(devices)
    }

    async fn open_stream(&self) -> Result<()> {
        // Replace any previous feed first so its reader cannot interleave
        // events with the new one.
        self.close_stream().await;

        let (feed, _) = connect_async(self.realtime_url.as_str()).await?;
        debug!("realtime feed opened");

        let events = self.events.clone();
        let handle = tokio::spawn(read_feed(feed, events));
        *self.reader.lock().await = Some(handle);
        Ok(())
    }

    async fn close_stream(&self) {
        let mut reader = self.reader.lock().await;
        if let Some(handle) = reader.take() {
            handle.abort();
            // The aborted reader cannot deliver its own close notification.
            let _ = self.events.send(MonitorEvent::StreamClosed);
        }
    }
}

/// Pump the feed until it ends, translating messages into events.
async fn read_feed(mut feed: Feed, events: mpsc::UnboundedSender<MonitorEvent>) {
    while let Some(message) = feed.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Some(event) = decode_feed_text(&text) {
                    if events.send(event).is_err() {
                        // Dispatch loop gone; this session was replaced.
                        return;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                let _ = events.send(MonitorEvent::StreamError(e.to_string()));
                break;
            }
        }
    }
    let _ = events.send(MonitorEvent::StreamClosed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_decodes_token_and_monitor() {
        let json = r#"{
            "authorized": true,
            "access_token": "t0ken",
            "monitors": [{"id": 12345, "serial_number": "N327000000"}]
        }"#;

        let auth: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(auth.access_token, "t0ken");
        assert_eq!(auth.monitors[0].id, 12345);
    }

    #[test]
    fn session_urls_embed_monitor_and_token() {
        let (events, _receiver) = mpsc::unbounded_channel();
        let session = SenseSession::new(
            reqwest::Client::new(),
            "https://api.example.com/v1",
            "wss://rt.example.com",
            "t0ken".to_string(),
            42,
            events,
        )
        .unwrap();

        assert_eq!(
            session.devices_url,
            "https://api.example.com/v1/app/monitors/42/devices"
        );
        assert_eq!(
            session.realtime_url,
            "wss://rt.example.com/monitors/42/realtimefeed?access_token=t0ken"
        );
    }
}
