//! Crate-level errors for configuration and client construction

/// Result type for fallible setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring the quiz API client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value was missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be built
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
}
