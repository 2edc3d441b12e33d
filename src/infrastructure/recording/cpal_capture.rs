//! Microphone capture using cpal
//!
//! `cpal::Stream` is not `Send`, so each stream lives on its own thread for
//! as long as the microphone is on. The callback downmixes every frame into
//! a mono monitor feed and, while the encoder is recording, into the PCM
//! buffer the encoder drains.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::wav_encoder::{PcmSource, PcmSpec, WavChunkEncoder};
use crate::application::ports::{CaptureDevice, CaptureError, CaptureStream, EncoderError};
use crate::domain::audio::CaptureConstraints;
use crate::domain::recording::{AudioFormat, ChunkSink};
use crate::infrastructure::monitor::MonitorFeed;

/// Longest monitor backlog kept before old samples are dropped
const MONITOR_BACKLOG: StdDuration = StdDuration::from_millis(250);

/// Words in backend error messages that indicate refused access
const PERMISSION_HINTS: [&str; 4] = ["permission", "denied", "not authorized", "access"];

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Map a cpal error message onto the capture error taxonomy
fn classify(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if PERMISSION_HINTS.iter().any(|hint| lower.contains(hint)) {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::DeviceUnavailable(message)
    }
}

/// State shared between the capture callback, the encoder and the monitor
struct CaptureShared {
    out_channels: u16,
    monitor_capacity: usize,
    capturing: AtomicBool,
    pcm: StdMutex<Vec<i16>>,
    monitor: StdMutex<VecDeque<f32>>,
}

impl CaptureShared {
    fn new(out_channels: u16, sample_rate: u32) -> Self {
        let monitor_capacity =
            (sample_rate as u128 * MONITOR_BACKLOG.as_millis() / 1000).max(1) as usize;
        Self {
            out_channels,
            monitor_capacity,
            capturing: AtomicBool::new(false),
            pcm: StdMutex::new(Vec::new()),
            monitor: StdMutex::new(VecDeque::with_capacity(monitor_capacity)),
        }
    }

    /// Accept one callback buffer of interleaved device frames
    fn ingest(&self, data: &[f32], device_channels: u16) {
        let device_channels = device_channels.max(1) as usize;
        let capturing = self.capturing.load(Ordering::Relaxed);

        let mut monitor = lock(&self.monitor);
        let mut pcm = capturing.then(|| lock(&self.pcm));

        for frame in data.chunks(device_channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            if monitor.len() >= self.monitor_capacity {
                monitor.pop_front();
            }
            monitor.push_back(mono);

            if let Some(pcm) = pcm.as_mut() {
                if self.out_channels == 1 {
                    pcm.push(to_i16(mono));
                } else {
                    let left = frame[0];
                    let right = frame.get(1).copied().unwrap_or(left);
                    pcm.push(to_i16(left));
                    pcm.push(to_i16(right));
                }
            }
        }
    }

    fn clear(&self) {
        lock(&self.pcm).clear();
        lock(&self.monitor).clear();
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Capture device backed by the default cpal host
pub struct CpalCapture {
    device_name: Option<String>,
}

impl CpalCapture {
    /// Create a capture for the named input device, or the default one
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    /// cpal exposes raw device input only
    fn check_constraints(constraints: &CaptureConstraints) -> Result<(), CaptureError> {
        let processing = constraints.requested_processing();
        if processing.is_empty() {
            return Ok(());
        }
        Err(CaptureError::DeviceUnavailable(format!(
            "{} not supported by this capture backend",
            processing.join(", ")
        )))
    }

    fn find_device(name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();

        let Some(name) = name else {
            return host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device".to_string())
            });
        };

        let devices = host.input_devices().map_err(|e| classify(e.to_string()))?;
        for device in devices {
            if device.name().map(|n| n == name).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(CaptureError::DeviceUnavailable(format!(
            "no input device named '{}'",
            name
        )))
    }

    /// Open and start the stream. Runs on the capture thread.
    fn open_stream(
        device_name: Option<&str>,
        out_channels: u16,
    ) -> Result<(cpal::Stream, Arc<CaptureShared>, PcmSpec), CaptureError> {
        let device = Self::find_device(device_name)?;
        let supported = device
            .default_input_config()
            .map_err(|e| classify(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config = supported.config();
        let device_channels = config.channels;
        let sample_rate = config.sample_rate.0;

        let shared = Arc::new(CaptureShared::new(out_channels, sample_rate));
        let on_error = |err: cpal::StreamError| warn!(error = %err, "Capture stream error");

        let stream = match sample_format {
            SampleFormat::F32 => {
                let shared = Arc::clone(&shared);
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        shared.ingest(data, device_channels)
                    },
                    on_error,
                    None,
                )
            }
            SampleFormat::I16 => {
                let shared = Arc::clone(&shared);
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let samples: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 32768.0).collect();
                        shared.ingest(&samples, device_channels)
                    },
                    on_error,
                    None,
                )
            }
            other => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| classify(e.to_string()))?;

        stream.play().map_err(|e| classify(e.to_string()))?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            device_channels,
            "Capture stream started"
        );

        let spec = PcmSpec {
            sample_rate,
            channels: out_channels,
        };
        Ok((stream, shared, spec))
    }
}

type Opened = Result<(Arc<CaptureShared>, PcmSpec), CaptureError>;

/// Body of the capture thread: open, report, hold until the stop sender is dropped
fn run_capture(
    device_name: Option<String>,
    out_channels: u16,
    stop: mpsc::Receiver<()>,
    ready: oneshot::Sender<Opened>,
) {
    let (stream, shared, spec) = match CpalCapture::open_stream(device_name.as_deref(), out_channels)
    {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if ready.send(Ok((shared, spec))).is_err() {
        debug!("Acquisition abandoned, closing stream");
        return;
    }

    // Blocks until the sender is dropped
    let _ = stop.recv();
    drop(stream);
    debug!("Capture stream closed");
}

#[async_trait]
impl CaptureDevice for CpalCapture {
    type Stream = CpalStream;

    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<CpalStream, CaptureError> {
        Self::check_constraints(constraints)?;

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = oneshot::channel();
        // Detached: the thread ends on its own once the stop sender is gone
        std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn({
                let device_name = self.device_name.clone();
                let out_channels = constraints.channel_count;
                move || run_capture(device_name, out_channels, stop_rx, ready_tx)
            })
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok((shared, spec))) => Ok(CpalStream {
                shared,
                spec,
                stop: Some(stop_tx),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::DeviceUnavailable(
                "capture thread exited unexpectedly".to_string(),
            )),
        }
    }
}

/// A running cpal capture stream.
///
/// Releasing only signals the capture thread, so it never blocks the
/// async task that turns the microphone off.
pub struct CpalStream {
    shared: Arc<CaptureShared>,
    spec: PcmSpec,
    stop: Option<mpsc::Sender<()>>,
}

impl CaptureStream for CpalStream {
    type Source = MicTap;
    type Encoder = WavChunkEncoder<MicPcm>;

    fn track_count(&self) -> usize {
        // cpal delivers one interleaved track per stream
        1
    }

    fn monitor_source(&self) -> MicTap {
        MicTap {
            shared: Arc::clone(&self.shared),
            sample_rate: self.spec.sample_rate,
        }
    }

    fn create_encoder(
        &self,
        format: AudioFormat,
        sink: ChunkSink,
    ) -> Result<Self::Encoder, EncoderError> {
        let pcm = MicPcm {
            shared: Arc::clone(&self.shared),
            spec: self.spec,
        };
        Ok(WavChunkEncoder::new(pcm, format, sink))
    }

    fn release(&mut self) {
        if let Some(stop) = self.stop.take() {
            drop(stop);
            self.shared.capturing.store(false, Ordering::SeqCst);
            self.shared.clear();
            debug!("Capture stream released");
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Encoder-side view of the capture buffer
pub struct MicPcm {
    shared: Arc<CaptureShared>,
    spec: PcmSpec,
}

impl PcmSource for MicPcm {
    fn spec(&self) -> PcmSpec {
        self.spec
    }

    fn set_capturing(&self, capturing: bool) {
        self.shared.capturing.store(capturing, Ordering::Relaxed);
    }

    fn take_samples(&self) -> Vec<i16> {
        std::mem::take(&mut *lock(&self.shared.pcm))
    }
}

/// Monitor-side view of the capture buffer
pub struct MicTap {
    shared: Arc<CaptureShared>,
    sample_rate: u32,
}

impl MonitorFeed for MicTap {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn take(&mut self, max: usize) -> Vec<f32> {
        let mut monitor = lock(&self.shared.monitor);
        let n = max.min(monitor.len());
        monitor.drain(..n).collect()
    }
}
