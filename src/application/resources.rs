//! Hardware resource lifecycle for one recording session

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tracing::{debug, info};

use crate::domain::audio::{CaptureConstraints, GainSchedule};
use crate::domain::recording::{AudioFormat, ChunkBuffer, Recording};

use super::error::SessionError;
use super::ports::{
    AudioEncoder, CaptureDevice, CaptureError, CaptureStream, EncoderState, MixingGraph,
};

/// Monitor source type produced by a capture device
pub type SourceOf<D> = <<D as CaptureDevice>::Stream as CaptureStream>::Source;

/// Stream and encoder created together when the microphone turns on
struct ActiveCapture<S: CaptureStream> {
    stream: S,
    encoder: S::Encoder,
}

/// Owns the capture device, the shared mixing graph and the zero-or-one
/// active stream/encoder pair.
///
/// The mixing graph is shared with whoever created it and outlives every
/// microphone cycle. The stream, its encoder and the monitor connection
/// are created together on acquire and torn down together on release.
pub struct SessionResources<D, M>
where
    D: CaptureDevice,
    M: MixingGraph<SourceOf<D>>,
{
    device: D,
    mixer: Arc<M>,
    format: AudioFormat,
    timeslice: StdDuration,
    chunks: ChunkBuffer,
    active: Option<ActiveCapture<D::Stream>>,
}

impl<D, M> SessionResources<D, M>
where
    D: CaptureDevice,
    M: MixingGraph<SourceOf<D>>,
{
    pub fn new(device: D, mixer: Arc<M>, format: AudioFormat, timeslice: StdDuration) -> Self {
        Self {
            device,
            mixer,
            format,
            timeslice,
            chunks: ChunkBuffer::new(),
            active: None,
        }
    }

    /// Open the microphone and wire it into the encoder and monitor paths.
    ///
    /// On any failure everything acquired so far is released again, so the
    /// graph is never left half-built.
    pub async fn acquire_microphone(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::MicrophoneBusy);
        }

        constraints
            .validate()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        let mut stream = self.device.acquire(constraints).await?;

        let tracks = stream.track_count();
        if tracks != 1 {
            stream.release();
            return Err(CaptureError::UnexpectedTrackShape(tracks).into());
        }

        let encoder = match stream.create_encoder(self.format, self.chunks.sink()) {
            Ok(encoder) => encoder,
            Err(e) => {
                stream.release();
                return Err(e.into());
            }
        };

        if let Err(e) = self.mixer.connect(stream.monitor_source()) {
            drop(encoder);
            stream.release();
            return Err(e.into());
        }

        info!(%constraints, format = %self.format, "Microphone acquired");
        self.active = Some(ActiveCapture { stream, encoder });
        Ok(())
    }

    /// Disconnect the monitor, drop the encoder and stop the hardware track.
    /// Buffered chunks are discarded. Does nothing when the microphone is off.
    pub fn release_microphone(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        self.mixer.disconnect();
        drop(active.encoder);
        active.stream.release();

        let discarded = self.chunks.byte_len();
        self.chunks.clear();
        info!(discarded_bytes = discarded, "Microphone released");
    }

    /// Start a fresh recording. Clears anything left in the chunk buffer.
    pub async fn start_encoding(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoMicrophone)?;
        self.chunks.clear();
        active.encoder.start(self.timeslice).await?;
        debug!(timeslice_ms = self.timeslice.as_millis() as u64, "Encoder started");
        Ok(())
    }

    pub async fn pause_encoding(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoMicrophone)?;
        active.encoder.pause().await?;
        debug!(buffered_chunks = self.chunks.len(), "Encoder paused");
        Ok(())
    }

    pub async fn resume_encoding(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NoMicrophone)?;
        active.encoder.resume().await?;
        debug!("Encoder resumed");
        Ok(())
    }

    /// Finalize the running recording.
    ///
    /// Returns the concatenated chunks the first time it is called for a
    /// recording, and `None` on any later call until encoding starts again.
    pub async fn stop_encoding(&mut self) -> Result<Option<Recording>, SessionError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        if active.encoder.state() == EncoderState::Inactive {
            return Ok(None);
        }

        active.encoder.stop().await?;
        let recording = Recording::new(self.chunks.drain(), self.format);
        debug!(size = %recording.human_readable_size(), "Encoder finalized");
        Ok(Some(recording))
    }

    /// Schedule a gain change on the monitoring path
    pub fn apply_gain(&self, schedule: &GainSchedule) {
        self.mixer.apply_gain(schedule);
    }

    pub fn monitoring_gain(&self) -> f32 {
        self.mixer.target_gain()
    }

    pub fn microphone_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn encoder_state(&self) -> EncoderState {
        self.active
            .as_ref()
            .map_or(EncoderState::Inactive, |a| a.encoder.state())
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Bytes buffered for the running recording
    pub fn buffered_bytes(&self) -> usize {
        self.chunks.byte_len()
    }
}

impl<D, M> Drop for SessionResources<D, M>
where
    D: CaptureDevice,
    M: MixingGraph<SourceOf<D>>,
{
    fn drop(&mut self) {
        self.release_microphone();
    }
}
