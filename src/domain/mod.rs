//! Domain layer - Core recording logic
//!
//! Contains the session state machine, value objects and domain errors.
//! This layer has no dependencies on external systems.

pub mod audio;
pub mod config;
pub mod error;
pub mod recording;
pub mod session;

// Re-export common types
pub use audio::{CaptureConstraints, GainAutomation, GainSchedule};
pub use config::AppConfig;
pub use error::*;
pub use recording::{AudioFormat, ChunkBuffer, ChunkSink, Duration, Elapsed, Recording};
pub use session::{Intent, InvalidTransition, RecordingState, Session, Transition};
