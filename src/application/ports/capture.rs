//! Microphone capture port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::CaptureConstraints;
use crate::domain::recording::{AudioFormat, ChunkSink};

use super::encoder::{AudioEncoder, EncoderError};

/// Capture acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("No usable input device: {0}")]
    DeviceUnavailable(String),

    #[error("Expected exactly one audio track, got {0}")]
    UnexpectedTrackShape(usize),
}

/// Port for the platform microphone
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    type Stream: CaptureStream;

    /// Open a live capture stream matching `constraints`.
    ///
    /// Resolves once the device handshake is complete. Unsupported
    /// constraint combinations fail with `DeviceUnavailable`.
    async fn acquire(&self, constraints: &CaptureConstraints)
        -> Result<Self::Stream, CaptureError>;
}

/// A live capture stream held while the microphone is on
pub trait CaptureStream: Send + 'static {
    /// Handle the mixing graph connects to for monitoring
    type Source: Send + 'static;

    /// Encoder reading from this stream
    type Encoder: AudioEncoder;

    /// Number of audio tracks the stream carries
    fn track_count(&self) -> usize;

    /// Create a monitoring tap. Independent of the encoder path.
    fn monitor_source(&self) -> Self::Source;

    /// Create an encoder that appends chunks to `sink`
    fn create_encoder(
        &self,
        format: AudioFormat,
        sink: ChunkSink,
    ) -> Result<Self::Encoder, EncoderError>;

    /// Stop the hardware track. Safe to call more than once.
    fn release(&mut self);
}
