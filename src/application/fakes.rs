//! In-memory port implementations for session tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tokio::sync::oneshot;

use crate::domain::audio::{CaptureConstraints, GainAutomation, GainSchedule};
use crate::domain::recording::{AudioFormat, ChunkSink};

use super::ports::{
    AudioEncoder, CaptureDevice, CaptureError, CaptureStream, EncoderError, EncoderState,
    MixingError, MixingGraph,
};

/// Shared record of side effects, in order
#[derive(Debug, Clone, Default)]
pub struct FakeLog(Arc<Mutex<Vec<String>>>);

impl FakeLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

#[derive(Debug, Default)]
struct EmitterState {
    sink: Option<ChunkSink>,
    recording: bool,
}

/// Lets a test push encoded chunks as if the encoder produced them
#[derive(Debug, Clone, Default)]
pub struct FakeEmitter(Arc<Mutex<EmitterState>>);

impl FakeEmitter {
    /// Deliver a chunk. Dropped unless the encoder is recording.
    pub fn emit(&self, bytes: &[u8]) {
        let state = self.0.lock().unwrap();
        if let (true, Some(sink)) = (state.recording, state.sink.as_ref()) {
            sink.push(bytes.to_vec());
        }
    }

    fn attach(&self, sink: ChunkSink) {
        self.0.lock().unwrap().sink = Some(sink);
    }

    fn set_recording(&self, recording: bool) {
        self.0.lock().unwrap().recording = recording;
    }
}

pub struct FakeDevice {
    pub tracks: usize,
    pub fail_with: Option<CaptureError>,
    pub log: FakeLog,
    pub emitter: FakeEmitter,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeDevice {
    pub fn new(log: FakeLog) -> Self {
        Self {
            tracks: 1,
            fail_with: None,
            log,
            emitter: FakeEmitter::default(),
            gate: Mutex::new(None),
        }
    }

    pub fn failing(log: FakeLog, error: CaptureError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::new(log)
        }
    }

    /// Hold the next acquisition until the returned sender fires
    pub fn gated(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    type Stream = FakeStream;

    async fn acquire(&self, _constraints: &CaptureConstraints) -> Result<FakeStream, CaptureError> {
        self.log.push("acquire");
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(FakeStream {
            tracks: self.tracks,
            released: false,
            log: self.log.clone(),
            emitter: self.emitter.clone(),
        })
    }
}

pub struct FakeStream {
    tracks: usize,
    released: bool,
    log: FakeLog,
    emitter: FakeEmitter,
}

/// Identifier of the fake monitor tap
pub const FAKE_SOURCE: u32 = 7;

impl CaptureStream for FakeStream {
    type Source = u32;
    type Encoder = FakeEncoder;

    fn track_count(&self) -> usize {
        self.tracks
    }

    fn monitor_source(&self) -> u32 {
        FAKE_SOURCE
    }

    fn create_encoder(
        &self,
        format: AudioFormat,
        sink: ChunkSink,
    ) -> Result<FakeEncoder, EncoderError> {
        self.emitter.attach(sink);
        self.log.push("create encoder");
        Ok(FakeEncoder {
            state: EncoderState::Inactive,
            format,
            log: self.log.clone(),
            emitter: self.emitter.clone(),
        })
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.push("release");
        }
    }
}

pub struct FakeEncoder {
    state: EncoderState,
    format: AudioFormat,
    log: FakeLog,
    emitter: FakeEmitter,
}

impl FakeEncoder {
    fn transition(
        &mut self,
        from: &[EncoderState],
        to: EncoderState,
        action: &'static str,
    ) -> Result<(), EncoderError> {
        if !from.contains(&self.state) {
            return Err(EncoderError::invalid_state(self.state, action));
        }
        self.state = to;
        self.emitter.set_recording(to == EncoderState::Recording);
        self.log.push(format!("encoder {}", action));
        Ok(())
    }
}

#[async_trait]
impl AudioEncoder for FakeEncoder {
    fn state(&self) -> EncoderState {
        self.state
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    async fn start(&mut self, _timeslice: StdDuration) -> Result<(), EncoderError> {
        self.transition(&[EncoderState::Inactive], EncoderState::Recording, "start")
    }

    async fn pause(&mut self) -> Result<(), EncoderError> {
        self.transition(&[EncoderState::Recording], EncoderState::Paused, "pause")
    }

    async fn resume(&mut self) -> Result<(), EncoderError> {
        self.transition(&[EncoderState::Paused], EncoderState::Recording, "resume")
    }

    async fn stop(&mut self) -> Result<(), EncoderError> {
        self.transition(
            &[EncoderState::Recording, EncoderState::Paused],
            EncoderState::Inactive,
            "stop",
        )
    }
}

/// Mixing graph that settles every gain schedule immediately
pub struct FakeMixer {
    pub gain: Mutex<GainAutomation>,
    pub connected: Mutex<Option<u32>>,
    pub fail_connect: bool,
    log: FakeLog,
}

impl FakeMixer {
    pub fn new(log: FakeLog) -> Self {
        Self {
            gain: Mutex::new(GainAutomation::new(0.0)),
            connected: Mutex::new(None),
            fail_connect: false,
            log,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain.lock().unwrap().value()
    }

    pub fn connected(&self) -> Option<u32> {
        *self.connected.lock().unwrap()
    }
}

impl MixingGraph<u32> for FakeMixer {
    fn connect(&self, source: u32) -> Result<(), MixingError> {
        if self.fail_connect {
            return Err(MixingError::ConnectFailed("fake".to_string()));
        }
        *self.connected.lock().unwrap() = Some(source);
        self.log.push("connect");
        Ok(())
    }

    fn disconnect(&self) {
        if self.connected.lock().unwrap().take().is_some() {
            self.log.push("disconnect");
        }
    }

    fn apply_gain(&self, schedule: &GainSchedule) {
        let mut gain = self.gain.lock().unwrap();
        gain.schedule(schedule);
        gain.settle();
    }

    fn target_gain(&self) -> f32 {
        self.gain.lock().unwrap().target()
    }
}
