//! Error types for the sense-monitor crate.

/// Errors from the cloud monitor client.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The service rejected the supplied credentials
    #[error("Authentication rejected by the monitor service")]
    AuthenticationFailed,

    /// The account has no monitor attached
    #[error("No monitors associated with this account")]
    NoMonitors,

    /// An HTTP transport error occurred
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A realtime feed transport error occurred
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The service answered with something we could not decode
    #[error("Invalid response from monitor service: {0}")]
    InvalidResponse(String),
}

/// Convenience type alias for Results using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_descriptive() {
        assert_eq!(
            MonitorError::AuthenticationFailed.to_string(),
            "Authentication rejected by the monitor service"
        );
        assert_eq!(
            MonitorError::NoMonitors.to_string(),
            "No monitors associated with this account"
        );
        assert_eq!(
            MonitorError::InvalidResponse("missing access_token".to_string()).to_string(),
            "Invalid response from monitor service: missing access_token"
        );
    }
}
