//! Error types for the reconciler

use thiserror::Error;

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler errors
///
/// Upstream fetch failures are not represented here: they are absorbed by
/// the fetcher into [`crate::FetchOutcome`] and never abort a pass.
#[derive(Error, Debug)]
pub enum Error {
    /// Payment or account-holder store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Payment not found in the store
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
