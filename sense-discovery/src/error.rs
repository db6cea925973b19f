//! Error types for the sense-discovery crate.

/// Errors that can occur while running the discovery responder.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A socket operation failed
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Convenience type alias for Results using DiscoveryError.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
