//! Recording infrastructure module
//!
//! Provides microphone capture using cpal and an incremental WAV/PCM encoder
//! that turns the captured samples into timesliced chunks.

mod cpal_capture;
mod wav_encoder;

pub use cpal_capture::{CpalCapture, CpalStream, MicPcm, MicTap};
pub use wav_encoder::{
    finalize_wav_sizes, pcm_bytes, wav_header, PcmSource, PcmSpec, WavChunkEncoder,
    WAV_HEADER_LEN,
};
