//! Recording session state machine

use std::fmt;
use thiserror::Error;

use super::intent::Intent;

/// Recording states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Stopped,
    Recording,
    Paused,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }

    /// Whether a recording is in progress (running or paused)
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side effect the controller must carry out before a state change is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    AcquireMicrophone,
    ReleaseMicrophone,
    StartRecording,
    PauseRecording,
    ResumeRecording,
    StopRecording,
    Mute,
    Unmute,
}

impl Transition {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AcquireMicrophone => "acquire microphone",
            Self::ReleaseMicrophone => "release microphone",
            Self::StartRecording => "start recording",
            Self::PauseRecording => "pause recording",
            Self::ResumeRecording => "resume recording",
            Self::StopRecording => "stop recording",
            Self::Mute => "mute monitor",
            Self::Unmute => "unmute monitor",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an intent is issued while its precondition is false
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition: cannot {intent} while {current_state} with microphone {}", on_off(.microphone_on))]
pub struct InvalidTransition {
    pub intent: Intent,
    pub current_state: RecordingState,
    pub microphone_on: bool,
}

fn on_off(flag: &bool) -> &'static str {
    if *flag {
        "on"
    } else {
        "off"
    }
}

/// Recording session entity.
///
/// State machine:
///   mic off -> mic on (toggle mic, only while STOPPED)
///   STOPPED -> RECORDING (toggle record, mic on)
///   RECORDING <-> PAUSED (toggle record)
///   RECORDING | PAUSED -> STOPPED (stop)
///
/// `plan` decides the transition for an intent without mutating anything;
/// `apply` commits it once the side effects have succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    recording_state: RecordingState,
    microphone_on: bool,
    monitoring: bool,
    elapsed_seconds: u64,
}

impl Session {
    /// Create a new session: stopped, mic off, not monitoring
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current recording state
    pub fn recording_state(&self) -> RecordingState {
        self.recording_state
    }

    /// Whether a capture stream is held
    pub fn microphone_on(&self) -> bool {
        self.microphone_on
    }

    /// Whether the live signal is audible
    pub fn monitoring(&self) -> bool {
        self.monitoring
    }

    /// Seconds spent in RECORDING since the last start
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Decide which transition an intent maps to in the current state
    pub fn plan(&self, intent: Intent) -> Result<Transition, InvalidTransition> {
        let transition = match intent {
            // Releasing the mic mid-recording would discard buffered audio
            Intent::ToggleMic if self.recording_state.is_active() => None,
            Intent::ToggleMic if self.microphone_on => Some(Transition::ReleaseMicrophone),
            Intent::ToggleMic => Some(Transition::AcquireMicrophone),

            Intent::ToggleRecord if !self.microphone_on => None,
            Intent::ToggleRecord => Some(match self.recording_state {
                RecordingState::Stopped => Transition::StartRecording,
                RecordingState::Recording => Transition::PauseRecording,
                RecordingState::Paused => Transition::ResumeRecording,
            }),

            Intent::Stop if self.recording_state.is_active() => Some(Transition::StopRecording),
            Intent::Stop => None,

            Intent::ToggleMonitor if self.monitoring => Some(Transition::Mute),
            Intent::ToggleMonitor => Some(Transition::Unmute),
        };

        transition.ok_or(InvalidTransition {
            intent,
            current_state: self.recording_state,
            microphone_on: self.microphone_on,
        })
    }

    /// Commit a transition previously returned by `plan`
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::AcquireMicrophone => self.microphone_on = true,
            Transition::ReleaseMicrophone => self.microphone_on = false,
            Transition::StartRecording => {
                self.recording_state = RecordingState::Recording;
                self.elapsed_seconds = 0;
            }
            Transition::PauseRecording => self.recording_state = RecordingState::Paused,
            Transition::ResumeRecording => self.recording_state = RecordingState::Recording,
            Transition::StopRecording => self.recording_state = RecordingState::Stopped,
            Transition::Mute => self.monitoring = false,
            Transition::Unmute => self.monitoring = true,
        }
        debug_assert!(self.invariant_holds());
    }

    /// Count one second of recording. Returns false outside RECORDING.
    pub fn tick(&mut self) -> bool {
        if self.recording_state != RecordingState::Recording {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// A recording in progress always has a microphone behind it
    pub fn invariant_holds(&self) -> bool {
        !self.recording_state.is_active() || self.microphone_on
    }
}
