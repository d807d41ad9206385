//! Error types for the binding layer.

use thiserror::Error;

/// Main error type for binding operations.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Provider has been shut down")]
    ProviderShutDown,

    #[error("Watch channel dropped: {0}")]
    WatchDropped(String),
}

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindError>;
