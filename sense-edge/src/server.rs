//! Hub-facing HTTP endpoints.
//!
//! Three routes, matching what the hub driver expects:
//!
//! - `POST /senseDevices` — credentials in, snapshot out. Returns 401 on a
//!   failed login, an empty JSON object until the stream has produced real
//!   data, and the device array afterwards. Also the trigger that arms the
//!   refresh scheduler.
//! - `GET /status` — human-readable troubleshooting view of the same state.
//! - `GET /details` — identity document the SSDP advertisement points at.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use crate::context::BridgeContext;
use crate::error::BridgeError;
use crate::scheduler;
use crate::session::SessionManager;
use crate::APP_NAME;

/// Everything the handlers need, cheaply cloneable per request.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<BridgeContext>,
    pub manager: Arc<SessionManager>,
    port: Arc<AtomicU16>,
}

impl AppState {
    pub fn new(context: Arc<BridgeContext>, manager: Arc<SessionManager>) -> Self {
        Self {
            context,
            manager,
            port: Arc::new(AtomicU16::new(0)),
        }
    }

    /// The bound HTTP port, once the server has started.
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }
}

/// A running HTTP server.
pub struct HttpServer {
    pub port: u16,
    pub handle: JoinHandle<()>,
}

/// Bind and start serving. `port` 0 asks the OS for a free port; the bound
/// port is stored back into the state for the `/details` document and the
/// discovery advertisement.
pub fn start(state: AppState, port: u16) -> Result<HttpServer, BridgeError> {
    let filter = routes(state.clone());
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let (bound, server) = warp::serve(filter)
        .try_bind_ephemeral(addr)
        .map_err(|e| BridgeError::Server(e.to_string()))?;

    state.port.store(bound.port(), Ordering::SeqCst);
    let handle = tokio::spawn(server);
    Ok(HttpServer {
        port: bound.port(),
        handle,
    })
}

/// The complete route tree.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let devices = warp::path!("senseDevices")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(handle_devices);

    let status = warp::path!("status")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_status);

    let details = warp::path!("details")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_details);

    devices.or(status).or(details)
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

#[derive(Debug, Deserialize)]
struct DevicesRequest {
    #[serde(default)]
    auth: AuthBody,
}

#[derive(Debug, Default, Deserialize)]
struct AuthBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn handle_devices(
    request: DevicesRequest,
    state: AppState,
) -> Result<warp::reply::Response, Infallible> {
    if !state
        .manager
        .login(&request.auth.email, &request.auth.password)
        .await
    {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    scheduler::ensure_started(&state.context).await;

    let data_present = state.context.data_present();
    let registry = state.context.registry();
    // Until a frame has landed (and put a nonzero total on the aggregate),
    // answer with an empty object so the hub just tries again next poll.
    if !data_present || registry.aggregate_usage().unwrap_or(0) == 0 {
        tracing::debug!("data not ready yet, hub should retry next poll");
        return Ok(warp::reply::json(&serde_json::json!({})).into_response());
    }

    Ok(warp::reply::json(&registry.snapshot()).into_response())
}

async fn handle_status(state: AppState) -> Result<warp::reply::Response, Infallible> {
    if !state.context.has_session().await {
        return Ok("Awaiting login".into_response());
    }

    let registry = state.context.registry();
    if registry.is_empty() {
        return Ok("No devices detected".into_response());
    }
    Ok(warp::reply::json(&registry.snapshot()).into_response())
}

async fn handle_details(state: AppState) -> Result<warp::reply::Response, Infallible> {
    let details = serde_json::json!({
        "name": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port(),
        "lastUpdate": state.context.last_frame_at(),
    });
    Ok(warp::reply::json(&details).into_response())
}
