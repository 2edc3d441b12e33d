//! Incremental encoder port interface

use async_trait::async_trait;
use std::fmt;
use std::time::Duration as StdDuration;
use thiserror::Error;

use crate::domain::recording::AudioFormat;

/// Encoder lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncoderState {
    #[default]
    Inactive,
    Recording,
    Paused,
}

impl EncoderState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for EncoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encoder errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    #[error("Encoder cannot {action} while {state}")]
    InvalidState {
        state: EncoderState,
        action: &'static str,
    },

    #[error("Encoding failed: {0}")]
    Failed(String),
}

impl EncoderError {
    pub(crate) fn invalid_state(state: EncoderState, action: &'static str) -> Self {
        Self::InvalidState { state, action }
    }
}

/// Port for an incremental encoder.
///
/// While recording, encoded chunks are pushed to the sink the encoder was
/// created with, at most one per `timeslice`. `stop` flushes the remaining
/// audio before returning, so the sink holds the whole recording afterwards.
#[async_trait]
pub trait AudioEncoder: Send {
    fn state(&self) -> EncoderState;

    fn format(&self) -> AudioFormat;

    async fn start(&mut self, timeslice: StdDuration) -> Result<(), EncoderError>;

    async fn pause(&mut self) -> Result<(), EncoderError>;

    async fn resume(&mut self) -> Result<(), EncoderError>;

    async fn stop(&mut self) -> Result<(), EncoderError>;
}
