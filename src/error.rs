//! Unified error types for the arbitrage scanner.

use thiserror::Error;

/// Unified error type for the arbitrage scanner.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Odds or exchange provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Notification delivery error.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
}

/// Upstream data provider errors (odds provider and exchange).
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Request returned a non-success status.
    #[error("failed to fetch {target}: {reason}")]
    FetchFailed {
        /// What was being fetched (sport key, event id, endpoint).
        target: String,
        /// Reason for failure.
        reason: String,
    },

    /// Response body could not be interpreted.
    #[error("failed to parse provider data: {0}")]
    ParseError(String),

    /// Credentials were rejected by the provider.
    #[error("provider rejected credentials: {0}")]
    Unauthorized(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The messaging API refused the message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
