//! Rodio-based mixing graph
//!
//! One output stream and one monitoring gain for the whole process. The
//! connected monitor source pulls blocks from the microphone tap and scales
//! every sample by the gain automation, so mute and unmute ramps are
//! sample-accurate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use crate::application::ports::{MixingError, MixingGraph};
use crate::domain::audio::{GainAutomation, GainSchedule};

/// Samples pulled from the feed per refill
const BLOCK_LEN: usize = 256;

/// Mono audio the monitor path plays back
pub trait MonitorFeed: Send + 'static {
    fn sample_rate(&self) -> u32;

    /// Take up to `max` samples; fewer (or none) when the capture is behind
    fn take(&mut self, max: usize) -> Vec<f32>;
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Monitoring output built on rodio.
///
/// `OutputStream` is not `Send`, so it is kept alive on a dedicated thread
/// until the mixer is dropped.
pub struct RodioMixer {
    sink: Sink,
    gain: Arc<StdMutex<GainAutomation>>,
    route: StdMutex<Option<Arc<AtomicBool>>>,
    shutdown: Option<mpsc::Sender<()>>,
    output_thread: Option<JoinHandle<()>>,
}

impl RodioMixer {
    /// Open the default output device with monitoring muted
    pub fn new() -> Result<Self, MixingError> {
        let (handle_tx, handle_rx) = mpsc::channel::<Result<OutputStreamHandle, String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let output_thread = std::thread::Builder::new()
            .name("monitor-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if handle_tx.send(Ok(handle)).is_ok() {
                        // Blocks until the sender is dropped
                        let _ = shutdown_rx.recv();
                    }
                    drop(stream);
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| MixingError::OutputUnavailable(e.to_string()))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| MixingError::OutputUnavailable("output thread exited".to_string()))?
            .map_err(MixingError::OutputUnavailable)?;

        let sink =
            Sink::try_new(&handle).map_err(|e| MixingError::OutputUnavailable(e.to_string()))?;
        sink.play();

        Ok(Self {
            sink,
            gain: Arc::new(StdMutex::new(GainAutomation::new(0.0))),
            route: StdMutex::new(None),
            shutdown: Some(shutdown_tx),
            output_thread: Some(output_thread),
        })
    }
}

impl<F: MonitorFeed> MixingGraph<F> for RodioMixer {
    fn connect(&self, source: F) -> Result<(), MixingError> {
        let live = Arc::new(AtomicBool::new(true));
        let previous = lock(&self.route).replace(Arc::clone(&live));
        if let Some(previous) = previous {
            previous.store(false, Ordering::SeqCst);
        }

        debug!(sample_rate = source.sample_rate(), "Monitor source connected");
        self.sink
            .append(MonitorSource::new(source, Arc::clone(&self.gain), live));
        Ok(())
    }

    fn disconnect(&self) {
        if let Some(live) = lock(&self.route).take() {
            live.store(false, Ordering::SeqCst);
            debug!("Monitor source disconnected");
        }
    }

    fn apply_gain(&self, schedule: &GainSchedule) {
        lock(&self.gain).schedule(schedule);
    }

    fn target_gain(&self) -> f32 {
        lock(&self.gain).target()
    }
}

impl Drop for RodioMixer {
    fn drop(&mut self) {
        if let Some(live) = lock(&self.route).take() {
            live.store(false, Ordering::SeqCst);
        }
        self.sink.stop();
        drop(self.shutdown.take());
        if let Some(thread) = self.output_thread.take() {
            if thread.join().is_err() {
                warn!("Monitor output thread panicked");
            }
        }
    }
}

/// Rodio source playing a monitor feed through the shared gain
struct MonitorSource<F: MonitorFeed> {
    feed: F,
    gain: Arc<StdMutex<GainAutomation>>,
    live: Arc<AtomicBool>,
    sample_rate: u32,
    block: Vec<f32>,
    pos: usize,
}

impl<F: MonitorFeed> MonitorSource<F> {
    fn new(feed: F, gain: Arc<StdMutex<GainAutomation>>, live: Arc<AtomicBool>) -> Self {
        let sample_rate = feed.sample_rate().max(1);
        Self {
            feed,
            gain,
            live,
            sample_rate,
            block: Vec::with_capacity(BLOCK_LEN),
            pos: 0,
        }
    }

    fn refill(&mut self) {
        self.block = self.feed.take(BLOCK_LEN);
        // Capture running behind; pad with silence to keep the output clocked
        self.block.resize(BLOCK_LEN, 0.0);

        let dt = 1.0 / self.sample_rate as f64;
        let mut gain = lock(&self.gain);
        for sample in self.block.iter_mut() {
            gain.advance(dt);
            *sample *= gain.value();
        }
        self.pos = 0;
    }
}

impl<F: MonitorFeed> Iterator for MonitorSource<F> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.block.len() {
            if !self.live.load(Ordering::SeqCst) {
                return None;
            }
            self.refill();
        }
        let sample = self.block[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl<F: MonitorFeed> Source for MonitorSource<F> {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<StdDuration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::MUTE_FLOOR;

    struct ConstantFeed {
        rate: u32,
        available: usize,
    }

    impl MonitorFeed for ConstantFeed {
        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn take(&mut self, max: usize) -> Vec<f32> {
            let n = max.min(self.available);
            self.available -= n;
            vec![1.0; n]
        }
    }

    type Fixture = (
        MonitorSource<ConstantFeed>,
        Arc<StdMutex<GainAutomation>>,
        Arc<AtomicBool>,
    );

    fn source(gain: f32, available: usize) -> Fixture {
        let automation = Arc::new(StdMutex::new(GainAutomation::new(gain)));
        let live = Arc::new(AtomicBool::new(true));
        let src = MonitorSource::new(
            ConstantFeed {
                rate: 1000,
                available,
            },
            Arc::clone(&automation),
            Arc::clone(&live),
        );
        (src, automation, live)
    }

    #[test]
    fn muted_source_is_silent() {
        let (mut src, _, _) = source(0.0, 1000);
        assert!(src.by_ref().take(BLOCK_LEN * 2).all(|s| s == 0.0));
    }

    #[test]
    fn unmuted_source_passes_signal() {
        let (mut src, _, _) = source(1.0, 1000);
        assert_eq!(src.next(), Some(1.0));
    }

    #[test]
    fn missing_samples_are_padded_with_silence() {
        let (mut src, _, _) = source(1.0, 10);
        let block: Vec<f32> = src.by_ref().take(BLOCK_LEN).collect();
        assert_eq!(block.len(), BLOCK_LEN);
        assert!(block[..10].iter().all(|&s| s == 1.0));
        assert!(block[10..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unmute_ramps_over_fifty_samples_at_1khz() {
        let (mut src, gain, _) = source(0.0, 10_000);
        lock(&gain).schedule(&GainSchedule::unmute());

        let samples: Vec<f32> = src.by_ref().take(100).collect();

        assert!(samples[0] >= MUTE_FLOOR && samples[0] < 0.05);
        assert!(samples[24] > 0.4 && samples[24] < 0.6);
        assert_eq!(samples[60], 1.0);
        assert!(samples.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn disconnected_source_ends_after_block() {
        let (mut src, _, live) = source(1.0, 10_000);
        src.next();
        live.store(false, Ordering::SeqCst);
        assert_eq!(src.by_ref().count(), BLOCK_LEN - 1);
    }

    #[test]
    fn source_shape() {
        let (src, _, _) = source(1.0, 0);
        assert_eq!(src.channels(), 1);
        assert_eq!(src.sample_rate(), 1000);
        assert_eq!(src.total_duration(), None);
    }

    #[test]
    #[ignore = "Requires audio hardware"]
    fn can_open_default_output() {
        let mixer = RodioMixer::new().unwrap();
        MixingGraph::<ConstantFeed>::apply_gain(&mixer, &GainSchedule::unmute());
        assert_eq!(MixingGraph::<ConstantFeed>::target_gain(&mixer), 1.0);
    }
}
