use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sense_discovery::DiscoveryResponder;
use sense_edge::{server, version, AppState, BridgeContext, BridgeError, SenseConnector, SessionManager};

/// Bridge a Sense energy monitor to a local automation hub.
#[derive(Parser, Debug)]
#[command(name = "sense-edge", version, about)]
struct Args {
    /// Port for the hub-facing HTTP server (0 lets the OS choose)
    #[arg(short, long, env = "SENSE_SERVER_PORT", default_value_t = 0)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let context = BridgeContext::new();
    let connector = Arc::new(SenseConnector::new()?);
    let manager = Arc::new(SessionManager::new(context.clone(), connector));
    let state = AppState::new(context, manager);

    let http = server::start(state, args.port)?;
    info!(port = http.port, "Sense HTTP server listening");

    match DiscoveryResponder::bind(http.port).await {
        Ok(responder) => {
            responder.spawn();
        }
        Err(e) => {
            warn!(error = %e, "discovery responder unavailable, hub must be pointed at this address manually");
        }
    }

    version::spawn(reqwest::Client::new());

    http.handle
        .await
        .map_err(|e| BridgeError::Server(e.to_string()))
}
