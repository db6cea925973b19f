//! Advisory version check against the upstream release endpoint.
//!
//! Purely informational: the result is logged and never acted on.

use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::APP_NAME;

const VERSION_URL: &str = "https://version.brbeaird.com/getVersion";
const CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);
const CHECK_TIMEOUT: Duration = Duration::from_secs(15);

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: Option<String>,
}

/// Spawn the hourly check; the first run happens immediately.
pub fn spawn(http: reqwest::Client) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CHECK_INTERVAL);
        loop {
            ticker.tick().await;
            check_version(&http).await;
        }
    })
}

async fn check_version(http: &reqwest::Client) {
    let body = serde_json::json!({
        "app": APP_NAME,
        "currentVersion": CURRENT_VERSION,
    });

    let response = match http
        .post(VERSION_URL)
        .json(&body)
        .timeout(CHECK_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "version check failed");
            return;
        }
    };

    match response.json::<VersionResponse>().await {
        Ok(VersionResponse {
            version: Some(latest),
        }) if latest != CURRENT_VERSION => {
            info!("newer server version is available ({CURRENT_VERSION} => {latest})");
        }
        Ok(_) => debug!("version check: up to date"),
        Err(e) => debug!(error = %e, "version check response unreadable"),
    }
}
