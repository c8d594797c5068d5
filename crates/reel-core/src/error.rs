use thiserror::Error;

/// Application-wide error types for reel.
#[derive(Error, Debug)]
pub enum AppError {
    /// A single element query or read failed (stale node, script exception, bad selector).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The browser connection is gone; nothing further can be read from the page.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// Opening or navigating a page failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Operation timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A strategy table is malformed.
    #[error("Strategy error: {0}")]
    StrategyError(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the page session can no longer be used.
    ///
    /// Such errors unwind out of the pipeline instead of being folded into
    /// a "not found" outcome.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            AppError::SessionUnavailable(_) | AppError::NavigationFailed(_)
        )
    }
}
