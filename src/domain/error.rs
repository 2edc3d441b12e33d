//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected <number>ms, <number>s, <number>m or a combination (e.g., 500ms, 30s, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when an unknown output format is requested
#[derive(Debug, Clone, Error)]
#[error("Invalid format: \"{input}\". Valid formats are: wav, pcm")]
pub struct InvalidFormatError {
    pub input: String,
}

/// Error when a command word does not name an intent
#[derive(Debug, Clone, Error)]
#[error("Unknown command: \"{input}\". Valid commands are: mic, record, stop, monitor")]
pub struct UnknownIntentError {
    pub input: String,
}

/// Error when capture constraints cannot be satisfied by any device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("Invalid channel count {0}: expected 1 or 2")]
    ChannelCount(u16),
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
