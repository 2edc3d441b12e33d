//! Incremental WAV/PCM encoder
//!
//! Emits a WAV header as the first chunk (for `wav`) followed by 16-bit
//! little-endian PCM chunks, one per timeslice while recording. The header
//! carries streaming sizes since the total length is unknown up front;
//! [`finalize_wav_sizes`] patches them once the payload is complete.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::application::ports::{AudioEncoder, EncoderError, EncoderState};
use crate::domain::recording::{AudioFormat, ChunkSink};

/// WAV header size in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Bits per sample
const BITS_PER_SAMPLE: u16 = 16;

/// Size placeholder for streamed WAV
const STREAMING_SIZE: u32 = u32::MAX;

/// Shape of the PCM the encoder reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmSpec {
    fn block_align(&self) -> u16 {
        self.channels * (BITS_PER_SAMPLE / 8)
    }

    fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Interleaved 16-bit samples collected from a capture stream
pub trait PcmSource: Send + Sync + 'static {
    fn spec(&self) -> PcmSpec;

    /// Start or stop collecting samples
    fn set_capturing(&self, capturing: bool);

    /// Take every sample collected since the last call
    fn take_samples(&self) -> Vec<i16>;
}

/// Build a WAV header with streaming (unknown) sizes
pub fn wav_header(spec: PcmSpec) -> Vec<u8> {
    let mut header = Vec::with_capacity(WAV_HEADER_LEN);

    // RIFF chunk
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&STREAMING_SIZE.to_le_bytes());
    header.extend_from_slice(b"WAVE");

    // fmt chunk
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // PCM
    header.extend_from_slice(&spec.channels.to_le_bytes());
    header.extend_from_slice(&spec.sample_rate.to_le_bytes());
    header.extend_from_slice(&spec.byte_rate().to_le_bytes());
    header.extend_from_slice(&spec.block_align().to_le_bytes());
    header.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    header.extend_from_slice(b"data");
    header.extend_from_slice(&STREAMING_SIZE.to_le_bytes());

    header
}

/// Replace streaming sizes in a complete WAV payload with the real ones.
/// Returns false if `bytes` does not start with a header from [`wav_header`].
pub fn finalize_wav_sizes(bytes: &mut [u8]) -> bool {
    if bytes.len() < WAV_HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[36..40] != b"data" {
        return false;
    }
    let total = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    let riff_size = total.saturating_sub(8);
    let data_size = total.saturating_sub(WAV_HEADER_LEN as u32);
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
    bytes[40..44].copy_from_slice(&data_size.to_le_bytes());
    true
}

/// Serialize samples as little-endian bytes
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

fn flush<P: PcmSource>(source: &P, sink: &ChunkSink) {
    let samples = source.take_samples();
    if samples.is_empty() {
        return;
    }
    debug!(samples = samples.len(), "Flushing chunk");
    sink.push(pcm_bytes(&samples));
}

/// Encoder reading from a [`PcmSource`] and pushing chunks to a [`ChunkSink`]
pub struct WavChunkEncoder<P: PcmSource> {
    source: Arc<P>,
    format: AudioFormat,
    sink: ChunkSink,
    state: EncoderState,
    timeslice: StdDuration,
    flusher: Option<JoinHandle<()>>,
}

impl<P: PcmSource> WavChunkEncoder<P> {
    pub fn new(source: P, format: AudioFormat, sink: ChunkSink) -> Self {
        Self {
            source: Arc::new(source),
            format,
            sink,
            state: EncoderState::Inactive,
            timeslice: StdDuration::ZERO,
            flusher: None,
        }
    }

    fn spawn_flusher(&mut self) {
        let source = Arc::clone(&self.source);
        let sink = self.sink.clone();
        let timeslice = self.timeslice;

        self.flusher = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + timeslice, timeslice);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                flush(&*source, &sink);
            }
        }));
    }

    /// Stop the periodic flusher and wait until it can no longer run
    async fn halt_flusher(&mut self) {
        if let Some(task) = self.flusher.take() {
            task.abort();
            let _ = task.await;
        }
    }

    fn expect_state(
        &self,
        allowed: &[EncoderState],
        action: &'static str,
    ) -> Result<(), EncoderError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EncoderError::invalid_state(self.state, action))
        }
    }
}

#[async_trait]
impl<P: PcmSource> AudioEncoder for WavChunkEncoder<P> {
    fn state(&self) -> EncoderState {
        self.state
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn start(&mut self, timeslice: StdDuration) -> Result<(), EncoderError> {
        self.expect_state(&[EncoderState::Inactive], "start")?;
        if timeslice.is_zero() {
            return Err(EncoderError::Failed("timeslice must be positive".to_string()));
        }

        // Anything captured before start belongs to no recording
        self.source.take_samples();
        if self.format == AudioFormat::Wav {
            self.sink.push(wav_header(self.source.spec()));
        }

        self.timeslice = timeslice;
        self.source.set_capturing(true);
        self.spawn_flusher();
        self.state = EncoderState::Recording;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), EncoderError> {
        self.expect_state(&[EncoderState::Recording], "pause")?;
        self.source.set_capturing(false);
        self.halt_flusher().await;
        flush(&*self.source, &self.sink);
        self.state = EncoderState::Paused;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), EncoderError> {
        self.expect_state(&[EncoderState::Paused], "resume")?;
        self.source.set_capturing(true);
        self.spawn_flusher();
        self.state = EncoderState::Recording;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EncoderError> {
        self.expect_state(&[EncoderState::Recording, EncoderState::Paused], "stop")?;
        self.source.set_capturing(false);
        self.halt_flusher().await;
        flush(&*self.source, &self.sink);
        self.state = EncoderState::Inactive;
        Ok(())
    }
}

impl<P: PcmSource> Drop for WavChunkEncoder<P> {
    fn drop(&mut self) {
        if let Some(task) = self.flusher.take() {
            task.abort();
        }
        self.source.set_capturing(false);
    }
}
