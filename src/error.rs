//! Error types for the spellcheck bot.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse rule file {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Chat transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Spelling oracle errors. Never surfaced past the spelling checker.
#[derive(Debug, thiserror::Error)]
pub enum SpellerError {
    #[error("Speller request failed: {0}")]
    RequestFailed(String),

    #[error("Speller returned status {status}")]
    BadStatus { status: u16 },

    #[error("Invalid speller response: {0}")]
    InvalidResponse(String),

    #[error("Speller timed out after {0:?}")]
    Timeout(Duration),
}

/// External rule source errors. A failed fetch keeps the previous rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleSourceError {
    #[error("Rule source {source_name} request failed: {reason}")]
    RequestFailed { source_name: String, reason: String },

    #[error("Rule source {source_name} returned status {status}")]
    BadStatus { source_name: String, status: u16 },

    #[error("Invalid response from rule source {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
