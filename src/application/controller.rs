//! Session controller
//!
//! Owns the [`Session`] state machine and the [`SessionResources`], and
//! processes intents and ticks one at a time from a single event queue.
//! An intent that arrives while a microphone acquisition is pending waits
//! in the queue until the acquisition has resolved.

use std::time::Duration as StdDuration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::audio::{CaptureConstraints, GainSchedule};
use crate::domain::recording::{Elapsed, Recording};
use crate::domain::session::{Intent, InvalidTransition, RecordingState, Session, Transition};

use super::error::SessionError;
use super::ports::{CaptureDevice, MixingGraph};
use super::resources::{SessionResources, SourceOf};

/// Period of the elapsed-time ticker
pub const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Identifies one run of the ticker so late ticks from a cancelled run are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

type Reply = oneshot::Sender<Result<Outcome, SessionError>>;

/// Events processed by the controller loop
#[derive(Debug)]
pub enum SessionEvent {
    Intent { intent: Intent, reply: Reply },
    Tick(TickToken),
    Shutdown,
}

/// Result of dispatching an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(Transition),
    /// Precondition was false; state is unchanged
    Ignored(InvalidTransition),
}

/// Read-only view of the session published after every change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub recording_state: RecordingState,
    pub microphone_on: bool,
    pub monitoring: bool,
    pub elapsed_seconds: u64,
    pub last_recording: Option<Recording>,
    /// Number of recordings finalized since the session started
    pub completed_recordings: u64,
}

impl SessionSnapshot {
    pub fn elapsed(&self) -> Elapsed {
        Elapsed(self.elapsed_seconds)
    }
}

struct Ticker {
    token: TickToken,
    task: JoinHandle<()>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct SessionController<D, M>
where
    D: CaptureDevice,
    M: MixingGraph<SourceOf<D>>,
{
    session: Session,
    resources: SessionResources<D, M>,
    constraints: CaptureConstraints,
    last_recording: Option<Recording>,
    completed_recordings: u64,
    ticker: Option<Ticker>,
    tick_runs: u64,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    finished_tx: mpsc::UnboundedSender<Recording>,
    finished_rx: Option<mpsc::UnboundedReceiver<Recording>>,
}

impl<D, M> SessionController<D, M>
where
    D: CaptureDevice,
    M: MixingGraph<SourceOf<D>>,
{
    pub fn new(resources: SessionResources<D, M>, constraints: CaptureConstraints) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(),
            resources,
            constraints,
            last_recording: None,
            completed_recordings: 0,
            ticker: None,
            tick_runs: 0,
            events_tx,
            events_rx,
            snapshot_tx,
            finished_tx,
            finished_rx: Some(finished_rx),
        }
    }

    /// Create a handle for issuing intents and observing snapshots
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
            snapshots: self.snapshot_tx.subscribe(),
        }
    }

    /// Receiver for every finalized recording, in stop order.
    ///
    /// Snapshots only carry the latest recording; consumers that must see
    /// each one read them here. Only the first call returns the receiver.
    pub fn take_finished_recordings(&mut self) -> Option<mpsc::UnboundedReceiver<Recording>> {
        self.finished_rx.take()
    }

    pub fn last_recording(&self) -> Option<&Recording> {
        self.last_recording.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            recording_state: self.session.recording_state(),
            microphone_on: self.session.microphone_on(),
            monitoring: self.session.monitoring(),
            elapsed_seconds: self.session.elapsed_seconds(),
            last_recording: self.last_recording.clone(),
            completed_recordings: self.completed_recordings,
        }
    }

    /// Decide, execute and commit the transition for `intent`.
    ///
    /// Side effects run before the state changes, so a failed effect leaves
    /// the session exactly as it was.
    pub async fn dispatch(&mut self, intent: Intent) -> Result<Outcome, SessionError> {
        let transition = match self.session.plan(intent) {
            Ok(transition) => transition,
            Err(invalid) => {
                warn!(%invalid, "Ignoring intent");
                return Ok(Outcome::Ignored(invalid));
            }
        };

        if let Err(e) = self.execute(transition).await {
            warn!(%transition, error = %e, "Transition failed");
            return Err(e);
        }

        self.session.apply(transition);
        info!(
            %transition,
            state = %self.session.recording_state(),
            microphone_on = self.session.microphone_on(),
            monitoring = self.session.monitoring(),
            "Transition applied"
        );
        self.publish();
        Ok(Outcome::Applied(transition))
    }

    async fn execute(&mut self, transition: Transition) -> Result<(), SessionError> {
        match transition {
            Transition::AcquireMicrophone => {
                self.resources.acquire_microphone(&self.constraints).await?;
            }
            Transition::ReleaseMicrophone => self.resources.release_microphone(),
            Transition::StartRecording => {
                self.resources.start_encoding().await?;
                self.last_recording = None;
                self.start_ticker();
            }
            Transition::PauseRecording => {
                self.resources.pause_encoding().await?;
                self.cancel_ticker();
            }
            Transition::ResumeRecording => {
                self.resources.resume_encoding().await?;
                self.start_ticker();
            }
            Transition::StopRecording => {
                let recording = self.resources.stop_encoding().await?;
                self.cancel_ticker();
                if let Some(recording) = recording {
                    info!(
                        size = %recording.human_readable_size(),
                        mime = recording.mime_type(),
                        "Recording finalized"
                    );
                    if self.finished_tx.send(recording.clone()).is_err() {
                        debug!("No consumer for finished recordings");
                    }
                    self.last_recording = Some(recording);
                    self.completed_recordings += 1;
                }
            }
            Transition::Mute => self.resources.apply_gain(&GainSchedule::mute()),
            Transition::Unmute => self.resources.apply_gain(&GainSchedule::unmute()),
        }
        Ok(())
    }

    /// Count one second if `token` belongs to the running ticker
    pub fn handle_tick(&mut self, token: TickToken) {
        if self.tick_token() != Some(token) {
            debug!(?token, "Dropping stale tick");
            return;
        }
        if self.session.tick() {
            debug!(elapsed = %Elapsed(self.session.elapsed_seconds()), "Tick");
            self.publish();
        }
    }

    fn tick_token(&self) -> Option<TickToken> {
        self.ticker.as_ref().map(|t| t.token)
    }

    fn start_ticker(&mut self) {
        self.tick_runs += 1;
        let token = TickToken(self.tick_runs);
        let events = self.events_tx.clone();

        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if events.send(SessionEvent::Tick(token)).await.is_err() {
                    break;
                }
            }
        });

        self.ticker = Some(Ticker { token, task });
    }

    fn cancel_ticker(&mut self) {
        self.ticker = None;
    }

    /// Finalize a running recording, then release the microphone
    pub async fn shutdown(&mut self) {
        if self.session.recording_state().is_active() {
            if let Err(e) = self.dispatch(Intent::Stop).await {
                warn!(error = %e, "Failed to finalize recording on shutdown");
                self.cancel_ticker();
                self.session.apply(Transition::StopRecording);
            }
        }
        if self.session.microphone_on() {
            self.resources.release_microphone();
            self.session.apply(Transition::ReleaseMicrophone);
        }
        self.publish();
        info!(recordings = self.completed_recordings, "Session shut down");
    }

    /// Process one event. Returns false once the session has shut down.
    pub async fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Intent { intent, reply } => {
                let result = self.dispatch(intent).await;
                let _ = reply.send(result);
                true
            }
            SessionEvent::Tick(token) => {
                self.handle_tick(token);
                true
            }
            SessionEvent::Shutdown => {
                self.shutdown().await;
                false
            }
        }
    }

    /// Run the event loop until a shutdown event. Returns the final snapshot.
    pub async fn run(mut self) -> SessionSnapshot {
        self.publish();
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        self.snapshot()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

/// Cloneable handle to a running controller
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Issue an intent and wait for its outcome
    pub async fn dispatch(&self, intent: Intent) -> Result<Outcome, SessionError> {
        let (reply, outcome) = oneshot::channel();
        self.events
            .send(SessionEvent::Intent { intent, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        outcome.await.map_err(|_| SessionError::Closed)?
    }

    /// Ask the controller to finalize and release everything, then stop
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.events
            .send(SessionEvent::Shutdown)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{FakeDevice, FakeEmitter, FakeLog, FakeMixer, FAKE_SOURCE};
    use crate::application::ports::CaptureError;
    use crate::domain::recording::AudioFormat;
    use std::sync::Arc;

    type Controller = SessionController<FakeDevice, FakeMixer>;

    struct Harness {
        controller: Controller,
        mixer: Arc<FakeMixer>,
        emitter: FakeEmitter,
        log: FakeLog,
    }

    fn harness_with(device: FakeDevice) -> Harness {
        let log = device.log.clone();
        let emitter = device.emitter.clone();
        let mixer = Arc::new(FakeMixer::new(log.clone()));
        let resources = SessionResources::new(
            device,
            Arc::clone(&mixer),
            AudioFormat::Wav,
            StdDuration::from_millis(500),
        );
        Harness {
            controller: SessionController::new(resources, CaptureConstraints::default()),
            mixer,
            emitter,
            log,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeDevice::new(FakeLog::default()))
    }

    fn tick(controller: &mut Controller, times: usize) {
        for _ in 0..times {
            if let Some(token) = controller.tick_token() {
                controller.handle_tick(token);
            }
        }
    }

    async fn applied(controller: &mut Controller, intent: Intent) -> Transition {
        match controller.dispatch(intent).await.unwrap() {
            Outcome::Applied(t) => t,
            Outcome::Ignored(invalid) => panic!("{} was ignored: {}", intent, invalid),
        }
    }

    #[tokio::test]
    async fn scenario_a_mic_on() {
        let mut h = harness();

        let t = applied(&mut h.controller, Intent::ToggleMic).await;

        assert_eq!(t, Transition::AcquireMicrophone);
        let snap = h.controller.snapshot();
        assert!(snap.microphone_on);
        assert_eq!(snap.recording_state, RecordingState::Stopped);
        assert_eq!(h.mixer.connected(), Some(FAKE_SOURCE));
    }

    #[tokio::test]
    async fn scenarios_b_through_e_full_recording() {
        let mut h = harness();
        let c = &mut h.controller;
        applied(c, Intent::ToggleMic).await;

        // B: start, three ticks
        applied(c, Intent::ToggleRecord).await;
        assert_eq!(c.snapshot().recording_state, RecordingState::Recording);
        assert_eq!(c.snapshot().elapsed_seconds, 0);
        h.emitter.emit(b"one-");
        tick(c, 3);
        h.emitter.emit(b"two-");
        assert_eq!(c.snapshot().elapsed_seconds, 3);

        // C: pause, ticks are not counted
        applied(c, Intent::ToggleRecord).await;
        assert_eq!(c.snapshot().recording_state, RecordingState::Paused);
        assert!(c.tick_token().is_none());
        tick(c, 5);
        assert_eq!(c.snapshot().elapsed_seconds, 3);

        // D: resume from 3
        applied(c, Intent::ToggleRecord).await;
        assert_eq!(c.snapshot().recording_state, RecordingState::Recording);
        tick(c, 1);
        assert_eq!(c.snapshot().elapsed_seconds, 4);
        h.emitter.emit(b"three");

        // E: stop
        assert_eq!(applied(c, Intent::Stop).await, Transition::StopRecording);
        let snap = c.snapshot();
        assert_eq!(snap.recording_state, RecordingState::Stopped);
        assert_eq!(snap.completed_recordings, 1);
        let rec = snap.last_recording.unwrap();
        assert_eq!(rec.data(), b"one-two-three");
        assert_eq!(rec.suggested_filename(), "recording.wav");
        assert!(c.tick_token().is_none());
    }

    #[tokio::test]
    async fn scenario_f_permission_denied() {
        let mut h = harness_with(FakeDevice::failing(
            FakeLog::default(),
            CaptureError::PermissionDenied("blocked".to_string()),
        ));

        let err = h.controller.dispatch(Intent::ToggleMic).await.unwrap_err();

        assert_eq!(
            err,
            SessionError::Capture(CaptureError::PermissionDenied("blocked".to_string()))
        );
        assert!(!h.controller.snapshot().microphone_on);
        assert_eq!(h.mixer.connected(), None);
        assert_eq!(h.log.entries(), vec!["acquire"]);
    }

    #[tokio::test]
    async fn invalid_intents_are_ignored() {
        let mut h = harness();

        let outcome = h.controller.dispatch(Intent::ToggleRecord).await.unwrap();
        assert!(matches!(outcome, Outcome::Ignored(ref i) if i.intent == Intent::ToggleRecord));

        let outcome = h.controller.dispatch(Intent::Stop).await.unwrap();
        assert!(matches!(outcome, Outcome::Ignored(_)));
        assert_eq!(h.controller.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn mic_cannot_be_turned_off_mid_recording() {
        let mut h = harness();
        applied(&mut h.controller, Intent::ToggleMic).await;
        applied(&mut h.controller, Intent::ToggleRecord).await;

        let outcome = h.controller.dispatch(Intent::ToggleMic).await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored(_)));
        assert!(h.controller.snapshot().microphone_on);
        assert_eq!(h.log.count("release"), 0);
    }

    #[tokio::test]
    async fn new_recording_clears_last_and_resets_elapsed() {
        let mut h = harness();
        let c = &mut h.controller;
        applied(c, Intent::ToggleMic).await;
        applied(c, Intent::ToggleRecord).await;
        h.emitter.emit(b"first");
        tick(c, 7);
        applied(c, Intent::Stop).await;
        assert!(c.last_recording().is_some());

        applied(c, Intent::ToggleRecord).await;

        assert!(c.last_recording().is_none());
        assert_eq!(c.snapshot().elapsed_seconds, 0);

        h.emitter.emit(b"second");
        applied(c, Intent::Stop).await;
        assert_eq!(c.last_recording().unwrap().data(), b"second");
        assert_eq!(c.snapshot().completed_recordings, 2);
    }

    #[tokio::test]
    async fn second_stop_produces_no_payload() {
        let mut h = harness();
        let c = &mut h.controller;
        applied(c, Intent::ToggleMic).await;
        applied(c, Intent::ToggleRecord).await;
        applied(c, Intent::Stop).await;

        let outcome = c.dispatch(Intent::Stop).await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored(_)));
        assert_eq!(c.snapshot().completed_recordings, 1);
        assert_eq!(h.log.count("encoder stop"), 1);
    }

    #[tokio::test]
    async fn stale_tick_after_pause_is_dropped() {
        let mut h = harness();
        let c = &mut h.controller;
        applied(c, Intent::ToggleMic).await;
        applied(c, Intent::ToggleRecord).await;
        let token = c.tick_token().unwrap();
        applied(c, Intent::ToggleRecord).await;
        applied(c, Intent::ToggleRecord).await;

        // Delivered late from the first ticker run
        c.handle_tick(token);

        assert_eq!(c.snapshot().elapsed_seconds, 0);
    }

    #[tokio::test]
    async fn monitor_toggle_ramps_shared_gain() {
        let mut h = harness();
        assert_eq!(h.mixer.gain(), 0.0);

        applied(&mut h.controller, Intent::ToggleMonitor).await;
        assert!(h.controller.snapshot().monitoring);
        assert_eq!(h.mixer.gain(), 1.0);

        applied(&mut h.controller, Intent::ToggleMonitor).await;
        applied(&mut h.controller, Intent::ToggleMonitor).await;
        assert_eq!(h.mixer.gain(), 1.0);

        applied(&mut h.controller, Intent::ToggleMonitor).await;
        assert!(!h.controller.snapshot().monitoring);
        assert_eq!(h.mixer.gain(), 0.0);
    }

    #[tokio::test]
    async fn monitoring_never_touches_encoder_path() {
        let mut h = harness();
        let c = &mut h.controller;
        applied(c, Intent::ToggleMic).await;
        applied(c, Intent::ToggleRecord).await;
        h.emitter.emit(b"a");
        applied(c, Intent::ToggleMonitor).await;
        h.emitter.emit(b"b");
        applied(c, Intent::ToggleMonitor).await;
        h.emitter.emit(b"c");
        applied(c, Intent::Stop).await;

        assert_eq!(c.last_recording().unwrap().data(), b"abc");
    }

    #[tokio::test]
    async fn shutdown_finalizes_and_releases() {
        let mut h = harness();
        let c = &mut h.controller;
        applied(c, Intent::ToggleMic).await;
        applied(c, Intent::ToggleRecord).await;
        h.emitter.emit(b"tail");

        c.shutdown().await;

        let snap = c.snapshot();
        assert!(!snap.microphone_on);
        assert_eq!(snap.recording_state, RecordingState::Stopped);
        assert_eq!(snap.last_recording.unwrap().data(), b"tail");
        assert_eq!(h.log.count("release"), 1);
    }

    #[tokio::test]
    async fn intents_queue_behind_pending_acquisition() {
        let device = FakeDevice::new(FakeLog::default());
        let gate = device.gated();
        let h = harness_with(device);
        let handle = h.controller.handle();
        let loop_task = tokio::spawn(h.controller.run());

        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.dispatch(Intent::ToggleMic).await }
        });
        tokio::task::yield_now().await;
        let second = tokio::spawn({
            let handle = handle.clone();
            async move { handle.dispatch(Intent::ToggleMic).await }
        });
        tokio::task::yield_now().await;
        assert!(!handle.snapshot().microphone_on);

        gate.send(()).unwrap();

        assert_eq!(
            first.await.unwrap().unwrap(),
            Outcome::Applied(Transition::AcquireMicrophone)
        );
        assert_eq!(
            second.await.unwrap().unwrap(),
            Outcome::Applied(Transition::ReleaseMicrophone)
        );
        assert_eq!(h.log.entries(), vec![
            "acquire",
            "create encoder",
            "connect",
            "disconnect",
            "release",
        ]);

        handle.shutdown().await.unwrap();
        let last = loop_task.await.unwrap();
        assert!(!last.microphone_on);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_real_seconds_only_while_recording() {
        let h = harness();
        let handle = h.controller.handle();
        let loop_task = tokio::spawn(h.controller.run());

        handle.dispatch(Intent::ToggleMic).await.unwrap();
        handle.dispatch(Intent::ToggleRecord).await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(3500)).await;
        assert_eq!(handle.snapshot().elapsed_seconds, 3);

        handle.dispatch(Intent::ToggleRecord).await.unwrap();
        tokio::time::sleep(StdDuration::from_secs(5)).await;
        assert_eq!(handle.snapshot().elapsed_seconds, 3);

        handle.dispatch(Intent::ToggleRecord).await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().elapsed_seconds, 4);

        handle.dispatch(Intent::Stop).await.unwrap();
        tokio::time::sleep(StdDuration::from_secs(3)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.elapsed_seconds, 4);
        assert_eq!(snap.recording_state, RecordingState::Stopped);

        handle.shutdown().await.unwrap();
        assert_eq!(loop_task.await.unwrap().completed_recordings, 1);
    }

    #[tokio::test]
    async fn every_finished_recording_is_delivered_after_a_restart() {
        let mut h = harness();
        let mut finished = h.controller.take_finished_recordings().unwrap();
        assert!(h.controller.take_finished_recordings().is_none());
        let handle = h.controller.handle();
        let loop_task = tokio::spawn(h.controller.run());

        handle.dispatch(Intent::ToggleMic).await.unwrap();
        handle.dispatch(Intent::ToggleRecord).await.unwrap();
        h.emitter.emit(b"take-one");
        handle.dispatch(Intent::Stop).await.unwrap();
        handle.dispatch(Intent::ToggleRecord).await.unwrap();
        h.emitter.emit(b"take-two");
        handle.dispatch(Intent::Stop).await.unwrap();
        handle.dispatch(Intent::ToggleRecord).await.unwrap();

        let snap = handle.snapshot();
        assert_eq!(snap.completed_recordings, 2);
        assert!(snap.last_recording.is_none());
        assert_eq!(finished.recv().await.unwrap().data(), b"take-one");
        assert_eq!(finished.recv().await.unwrap().data(), b"take-two");

        handle.shutdown().await.unwrap();
        loop_task.await.unwrap();
        // Shutdown finalizes the running recording, then the channel closes
        assert!(finished.recv().await.is_some());
        assert!(finished.recv().await.is_none());
    }

    #[tokio::test]
    async fn handle_reports_closed_after_shutdown() {
        let h = harness();
        let handle = h.controller.handle();
        let loop_task = tokio::spawn(h.controller.run());

        handle.shutdown().await.unwrap();
        loop_task.await.unwrap();

        assert_eq!(
            handle.dispatch(Intent::ToggleMic).await.unwrap_err(),
            SessionError::Closed
        );
    }
}
