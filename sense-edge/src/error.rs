//! Error types for the sense-edge binary.

/// Top-level errors surfaced by the bridge service.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The HTTP server could not be started
    #[error("HTTP server error: {0}")]
    Server(String),

    /// The discovery responder failed
    #[error("Discovery error: {0}")]
    Discovery(#[from] sense_discovery::DiscoveryError),

    /// The monitor client failed
    #[error("Monitor error: {0}")]
    Monitor(#[from] sense_monitor::MonitorError),
}
