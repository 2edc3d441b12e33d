//! Session error types

use thiserror::Error;

use super::ports::{CaptureError, EncoderError, MixingError};

/// Errors surfaced by the session controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0}")]
    Capture(#[from] CaptureError),

    #[error("{0}")]
    Encoder(#[from] EncoderError),

    #[error("Monitoring failed: {0}")]
    Mixing(#[from] MixingError),

    #[error("A microphone is already active")]
    MicrophoneBusy,

    #[error("The microphone is off")]
    NoMicrophone,

    #[error("Session is no longer running")]
    Closed,
}
