//! Audio mixing graph port interface

use thiserror::Error;

use crate::domain::audio::GainSchedule;

/// Mixing graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixingError {
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Failed to connect monitor source: {0}")]
    ConnectFailed(String),
}

/// Port for the process-wide output path and its monitoring gain.
///
/// One instance lives for the whole process. Sources of type `S` are
/// connected and disconnected per microphone cycle; the gain survives them.
pub trait MixingGraph<S>: Send + Sync {
    /// Route `source` through the monitoring gain to the output,
    /// replacing any previously connected source
    fn connect(&self, source: S) -> Result<(), MixingError>;

    /// Remove the connected source. Safe to call when nothing is connected.
    fn disconnect(&self);

    /// Replace pending gain automation with `schedule`
    fn apply_gain(&self, schedule: &GainSchedule);

    /// Gain the monitoring path is at or heading to
    fn target_gain(&self) -> f32;
}
