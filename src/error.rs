//! Error types for Smart Relay.
//!
//! The transformation pipeline has no error type: it only ever publishes or
//! skips. Everything here belongs to the collaborators around it.

/// Error on the publish path, which touches both Telegram (media download)
/// and the destination platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Telegram channel errors (listener and log sink).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to download file {file_id}: {reason}")]
    DownloadFailed { file_id: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Destination platform (X/Twitter) errors.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Media file too large ({size} bytes, limit {limit})")]
    MediaTooLarge { size: usize, limit: usize },

    #[error("Request signing failed: {0}")]
    Signing(String),
}

/// Result type alias for the publish path.
pub type Result<T> = std::result::Result<T, Error>;
